use serde::Deserialize;
use tokio::fs;
use tracing::{debug, warn};

use super::{NSE_CONFIG, NSE_DIR};
use crate::nse::OptionSide;
use std::{env, path::PathBuf};

/// Run parameters, loadable from `~/.nse/config.toml`. A missing or
/// unreadable file falls back to the defaults.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub symbol: String,
    pub side: OptionSide,
    pub lot_size: u32,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            symbol: "NIFTY".to_string(),
            side: OptionSide::CE,
            lot_size: 1,
        }
    }
}

impl Config {
    pub async fn new() -> Option<Config> {
        let path = nse_config_path();
        debug!("finding config in {path:?}");
        let data = match fs::read_to_string(path).await {
            Ok(data) => data,
            Err(e) => {
                debug!("no run config: {e}");
                return None;
            }
        };

        Self::from_str(data.as_str())
    }

    fn from_str(data: &str) -> Option<Config> {
        match toml::from_str::<Config>(data) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("bad run config: {e}");
                return None;
            }
        }
    }
}

fn nse_config_path() -> PathBuf {
    let home_dir = env::home_dir().unwrap_or(PathBuf::new());

    home_dir.join(PathBuf::from(format!("{NSE_DIR}/{NSE_CONFIG}")))
}
