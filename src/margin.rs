use serde::Serialize;
use tracing::debug;

use crate::nse::{OptionSide, QuoteRow};

/// Simulated margin rate: 20% of the strike. A stand-in for a real
/// exchange margin model, kept deliberately naive.
const MARGIN_RATE: f64 = 0.20;

#[derive(Debug, Serialize)]
pub struct AnnotatedQuote {
    pub instrument_name: String,
    pub strike_price: f64,
    pub side: OptionSide,
    pub bid_ask: f64,
    pub margin_required: f64,
    pub premium_earned: f64,
}

impl AnnotatedQuote {
    fn new(row: QuoteRow, lot_size: u32) -> Self {
        let margin_required = row.strike_price * MARGIN_RATE;
        let premium_earned = row.bid_ask * lot_size as f64;

        Self {
            instrument_name: row.instrument_name,
            strike_price: row.strike_price,
            side: row.side,
            bid_ask: row.bid_ask,
            margin_required,
            premium_earned,
        }
    }
}

/// Appends the margin and premium estimates to each quote row. Keeps the
/// row order and count; an empty table annotates to an empty table.
pub fn annotate(rows: Vec<QuoteRow>, lot_size: u32) -> Vec<AnnotatedQuote> {
    debug!("annotating {} row(s) with lot size {lot_size}", rows.len());

    rows.into_iter()
        .map(|row| AnnotatedQuote::new(row, lot_size))
        .collect()
}
