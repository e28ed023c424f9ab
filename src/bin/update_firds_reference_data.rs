use std::{error::Error, path::Path};

use clap::Parser;
use firds::{config::EtlConfig, pipeline};
use log::{error, info};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Register index url to process, overriding FIRDS_INDEX_URL
    #[arg(short, long)]
    url: Option<String>,
}

/// Run this job every day; ESMA publishes delta files daily and full files
/// on Saturdays.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let env_file = format!(".env/{}.env", args.env);
    if Path::new(&env_file).exists() {
        dotenvy::from_path(Path::new(&env_file)).unwrap();
    }

    let mut cfg = EtlConfig::from_env()?;
    if let Some(url) = args.url {
        cfg.index_url = url;
    }

    match pipeline::run(&cfg).await {
        Ok(report) => {
            info!("{}", report);
            Ok(())
        }
        Err(e) => {
            error!("{} failed: {}", e.stage(), e);
            Err(e.into())
        }
    }
}
