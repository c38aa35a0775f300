use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use keystore::cli::{Cli, Command};
use keystore::config::Config;
use keystore::{FileStore, KeyValueStore};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_path = cli.store.unwrap_or(config.store_path);

    info!("keystore starting at {}", store_path.display());
    let mut store = FileStore::open_with_quota(&store_path, config.quota_bytes)
        .context(format!("Failed to open store at {}", store_path.display()))?;

    match cli.command {
        Command::Get { key } => match store.get(&key)? {
            Some(value) => println!("{}", value),
            None => {
                eprintln!("{} Key not found: {}", "✗".red(), key);
                std::process::exit(1);
            }
        },
        Command::Set { key, value } => {
            store.set(&key, &value)?;
            println!("{} Stored {}", "✓".green(), key.cyan());
        }
        Command::Rm { key } => {
            store.remove(&key)?;
            println!("{} Removed {}", "✓".green(), key);
        }
        Command::Keys => {
            let keys = store.keys()?;
            if keys.is_empty() {
                println!("No keys found");
            } else {
                for key in keys {
                    println!("{}", key);
                }
            }
        }
    }

    Ok(())
}
