use nse_options::{config::Config, margin, nse::NseClient};
use rustls::crypto::CryptoProvider;
use tracing::{Level, error, info};
use tracing_subscriber;

#[tokio::main]
async fn main() {
    CryptoProvider::install_default(rustls::crypto::aws_lc_rs::default_provider())
        .expect("Failed to install default crypto provider");

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_line_number(true)
        .init();

    info!("NSE Option Chain");

    let config = Config::new().await.unwrap_or_default();
    info!(
        "quoting {} {:?} with lot size {}",
        config.symbol, config.side, config.lot_size
    );

    let client = match NseClient::new() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {e:?}");
            return;
        }
    };

    let rows = match client
        .fetch_option_chain(config.symbol.as_str(), config.side)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            error!("Client error: {e:?}");
            return;
        }
    };

    let annotated = margin::annotate(rows, config.lot_size);

    for quote in &annotated {
        info!(
            "{:6} {:?} strike {:>10.2} bid/ask {:>8.2} margin {:>10.2} premium {:>10.2}",
            quote.instrument_name,
            quote.side,
            quote.strike_price,
            quote.bid_ask,
            quote.margin_required,
            quote.premium_earned
        );
    }

    let table = serde_json::to_string(&annotated).unwrap();
    println!("{table}");
}
