pub mod config;
pub mod margin;
pub mod nse;

const NSE_DIR: &str = ".nse";
const NSE_CONFIG: &str = "config.toml";
const NSE_SITE: &str = "https://www.nseindia.com";
