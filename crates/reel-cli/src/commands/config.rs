//! Config command handler

use std::path::PathBuf;

use anyhow::Result;

use reel_core::Config;

use crate::output::{Output, OutputFormat};

/// Show the effective configuration
pub fn show(config: &Config, config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "collection": config.collection,
                    "log_level": config.log_level,
                    "store_path": config.store_path(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:   {}", config.data_dir.display());
            println!("  collection: {}", config.collection);
            println!("  log_level:  {}", config.log_level);
            println!();
            println!("Store file:  {}", config.store_path().display());
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}
