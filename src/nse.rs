use super::NSE_SITE;
use reqwest::{
    Client, Response, Url,
    header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderValue, REFERER, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/87.0.4280.88 Safari/537.36";

pub struct NseClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug)]
pub enum NseError {
    HttpError(String),
    ParseError(String),
    InvalidUri,
}

/// Which leg of the chain to quote. NSE labels calls CE and puts PE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[allow(non_camel_case_types)]
pub enum OptionSide {
    CE,
    PE,
}

#[derive(Debug, Deserialize)]
struct OptionChainResponse {
    records: Records,
}

#[derive(Debug, Deserialize)]
struct Records {
    data: Vec<StrikeRecord>,
}

#[derive(Debug, Deserialize)]
struct StrikeRecord {
    #[serde(rename = "CE")]
    ce: Option<OptionLeg>,
    #[serde(rename = "PE")]
    pe: Option<OptionLeg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionLeg {
    strike_price: Option<f64>,
    ask_price: Option<f64>,
    bid_price: Option<f64>,
    last_price: Option<f64>,
}

/// One strike surviving the max-quote filter.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteRow {
    pub instrument_name: String,
    pub strike_price: f64,
    pub side: OptionSide,
    pub bid_ask: f64,
}

impl OptionLeg {
    /// Ask for calls, bid for puts, last traded price when the book side
    /// is absent, 0 when the record carries no price at all.
    fn quoted_price(&self, side: OptionSide) -> f64 {
        let preferred = match side {
            OptionSide::CE => self.ask_price,
            OptionSide::PE => self.bid_price,
        };

        preferred.or(self.last_price).unwrap_or(0.0)
    }
}

macro_rules! response {
    ($res_type:ident, $res:ident) => {
        match $res.json::<$res_type>().await {
            Ok(data) => data,
            Err(e) => {
                return Err(NseError::ParseError(format!(
                    "Couldnt parse json response: {e}"
                )));
            }
        }
    };
}

impl NseClient {
    pub fn new() -> Result<Self, NseError> {
        let client = Client::builder()
            .default_headers(default_headers())
            .cookie_store(true)
            .build()
            .map_err(|e| NseError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: NSE_SITE.parse().unwrap(),
        })
    }

    fn make_uri(&self, path: &str) -> Result<Url, NseError> {
        match self.base_url.join(path) {
            Ok(uri) => Ok(uri),
            Err(_) => return Err(NseError::InvalidUri),
        }
    }

    /// Makes a GET request to the specified endpoint
    async fn get(&self, path: &str, referer: &str) -> Result<Response, NseError> {
        let uri = self.make_uri(path)?;

        let response = self
            .client
            .get(uri)
            .header(REFERER, referer)
            .send()
            .await;

        handle_response(response).await
    }

    /// Quotes the option chain for an index symbol, reduced to the strikes
    /// at the highest bid/ask. Issues a warm-up GET against the site root
    /// first; NSE only serves the API to sessions holding its cookies.
    pub async fn fetch_option_chain(
        &self,
        instrument_name: &str,
        side: OptionSide,
    ) -> Result<Vec<QuoteRow>, NseError> {
        let symbol = instrument_name.to_uppercase();
        let referer = format!("{NSE_SITE}/get-quotes/derivatives?symbol={symbol}");

        self.get("/", referer.as_str()).await?;
        // Short pause between bootstrap and API call to avoid being blocked
        tokio::time::sleep(Duration::from_secs(1)).await;

        let path = format!("/api/option-chain-indices?symbol={symbol}");
        let res = self.get(path.as_str(), referer.as_str()).await?;
        let data = response!(OptionChainResponse, res);

        let rows = extract_rows(instrument_name, side, &data.records.data);
        info!("{} strike(s) at the max quote for {symbol} {side:?}", rows.len());

        Ok(rows)
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    // Accept-Encoding (gzip, deflate, br) is supplied by reqwest's
    // compression features.
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    headers
}

fn extract_rows(
    instrument_name: &str,
    side: OptionSide,
    records: &[StrikeRecord],
) -> Vec<QuoteRow> {
    let mut rows = Vec::new();

    for record in records {
        let leg = match side {
            OptionSide::CE => &record.ce,
            OptionSide::PE => &record.pe,
        };
        let Some(leg) = leg else { continue };
        debug!("record: {record:?}");

        rows.push(QuoteRow {
            instrument_name: instrument_name.to_string(),
            strike_price: leg.strike_price.unwrap_or(0.0),
            side,
            bid_ask: leg.quoted_price(side),
        });
    }

    keep_max_priced(rows)
}

/// Keeps only the rows quoting the table-wide maximum bid/ask; ties all
/// survive. An empty table stays empty.
fn keep_max_priced(rows: Vec<QuoteRow>) -> Vec<QuoteRow> {
    let max_price = rows.iter().map(|r| r.bid_ask).fold(f64::MIN, f64::max);

    rows.into_iter()
        .filter(|r| r.bid_ask == max_price)
        .collect()
}

async fn handle_response(
    response: Result<Response, reqwest::Error>,
) -> Result<Response, NseError> {
    debug!("response: <{response:?}>");

    let response = match response {
        Ok(response) => response,
        Err(e) => return Err(NseError::HttpError(e.to_string())),
    };

    if !response.status().is_success() {
        return Err(NseError::HttpError(format!(
            "status {} from {}",
            response.status(),
            response.url()
        )));
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTION_CHAIN: &str = r#"{"records":{"data":[{"strikePrice":24000,"expiryDate":"26-Mar-2026","CE":{"strikePrice":24000,"askPrice":5.0,"bidPrice":4.5,"lastPrice":4.8},"PE":{"strikePrice":24000,"askPrice":121.0,"bidPrice":118.2,"lastPrice":119.0}},{"strikePrice":24100,"expiryDate":"26-Mar-2026","CE":{"strikePrice":24100,"lastPrice":3.2}},{"strikePrice":24200,"expiryDate":"26-Mar-2026","PE":{"strikePrice":24200,"bidPrice":150.0}}]}}"#;

    fn row(strike: f64, price: f64) -> QuoteRow {
        QuoteRow {
            instrument_name: "NIFTY".to_string(),
            strike_price: strike,
            side: OptionSide::CE,
            bid_ask: price,
        }
    }

    #[test]
    fn test_parse_option_chain() {
        let chain: Result<OptionChainResponse, serde_json::Error> =
            serde_json::from_str(OPTION_CHAIN);

        if let Err(e) = &chain {
            println!("Error {e:?}");
        }

        assert!(chain.is_ok());
        let chain = chain.unwrap();
        assert_eq!(chain.records.data.len(), 3);
        assert!(chain.records.data[1].pe.is_none());
        assert!(chain.records.data[2].ce.is_none());
    }

    #[test]
    fn test_missing_records_key_is_an_error() {
        let chain: Result<OptionChainResponse, serde_json::Error> =
            serde_json::from_str(r#"{"data":[]}"#);

        assert!(chain.is_err());
    }

    #[test]
    fn test_price_prefers_ask_for_calls_bid_for_puts() {
        let leg: OptionLeg = serde_json::from_str(
            r#"{"strikePrice":100,"askPrice":5.0,"bidPrice":4.5,"lastPrice":3.2}"#,
        )
        .unwrap();

        assert_eq!(leg.quoted_price(OptionSide::CE), 5.0);
        assert_eq!(leg.quoted_price(OptionSide::PE), 4.5);
    }

    #[test]
    fn test_price_falls_back_to_last_then_zero() {
        let leg: OptionLeg =
            serde_json::from_str(r#"{"strikePrice":100,"lastPrice":3.2}"#).unwrap();
        assert_eq!(leg.quoted_price(OptionSide::CE), 3.2);

        let leg: OptionLeg = serde_json::from_str(r#"{"strikePrice":100}"#).unwrap();
        assert_eq!(leg.quoted_price(OptionSide::PE), 0.0);
    }

    #[test]
    fn test_max_quote_reduction_keeps_ties() {
        let rows = vec![row(100.0, 5.0), row(200.0, 5.0), row(300.0, 3.0)];

        let kept = keep_max_priced(rows);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].strike_price, 100.0);
        assert_eq!(kept[1].strike_price, 200.0);
        assert!(kept.iter().all(|r| r.bid_ask == 5.0));
    }

    #[test]
    fn test_no_matching_side_yields_empty_table() {
        let chain: OptionChainResponse = serde_json::from_str(
            r#"{"records":{"data":[{"strikePrice":24200,"PE":{"strikePrice":24200,"bidPrice":150.0}}]}}"#,
        )
        .unwrap();

        let rows = extract_rows("NIFTY", OptionSide::CE, &chain.records.data);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_all_prices_missing_keeps_every_row_at_zero() {
        let chain: OptionChainResponse = serde_json::from_str(
            r#"{"records":{"data":[{"CE":{"strikePrice":24000}},{"CE":{"strikePrice":24100}}]}}"#,
        )
        .unwrap();

        let rows = extract_rows("NIFTY", OptionSide::CE, &chain.records.data);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.bid_ask == 0.0));
    }

    #[test]
    fn test_extract_reduces_to_max_quote() {
        let chain: OptionChainResponse = serde_json::from_str(OPTION_CHAIN).unwrap();

        let calls = extract_rows("nifty", OptionSide::CE, &chain.records.data);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].strike_price, 24000.0);
        assert_eq!(calls[0].bid_ask, 5.0);
        assert_eq!(calls[0].instrument_name, "nifty");

        let puts = extract_rows("NIFTY", OptionSide::PE, &chain.records.data);
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].strike_price, 24200.0);
        assert_eq!(puts[0].bid_ask, 150.0);
    }
}
