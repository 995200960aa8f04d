use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{error, info};

fn validate_config_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    match path.is_file() {
        true => Ok(path),
        false => Err("Config file doesn't exist on file system".to_owned()),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "decoder starting");

    let matches = Command::new("RR12 Decoder Emulator")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bridges an RFID read stream to the RR12 decoder protocol")
        .arg(
            Arg::new("config")
                .help("Path to the decoder TOML config file")
                .short('c')
                .long("config")
                .value_parser(validate_config_path)
                .default_value("decoder.toml"),
        )
        .get_matches();

    let config_path = matches
        .get_one::<PathBuf>("config")
        .expect("config has a default");

    let config = match decoder::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, path = %config_path.display(), "failed to load config");
            std::process::exit(1);
        }
    };

    decoder::run(config).await;
}
