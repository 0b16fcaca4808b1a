#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Market segment of a symbol; scales the synthetic volatility.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AssetClass {
    #[default]
    Equity,
    Future,
    Crypto,
    Forex,
}

impl AssetClass {
    /// Guesses the asset class from the ticker, e.g. `BTC-USD` is crypto, `ES=F` a future and `EUR-USD` forex.
    pub fn infer(symbol: &str) -> Self {
        if symbol.contains("BTC") || symbol.contains("ETH") {
            Self::Crypto
        } else if symbol.contains("NQ") || symbol.ends_with("=F") {
            Self::Future
        } else if ["USD", "JPY", "EUR", "GBP"].iter().any(|ccy| symbol.contains(ccy)) {
            Self::Forex
        } else {
            Self::Equity
        }
    }

    /// Multiplier applied to the per-step volatility.
    pub fn volatility_scale(&self) -> f64 {
        match self {
            Self::Crypto => 3.0,
            Self::Forex => 0.1,
            Self::Equity | Self::Future => 1.0,
        }
    }
}

const BASE_PRICES: &[(&str, f64)] = &[
    ("AAPL", 150.0),
    ("MSFT", 300.0),
    ("GOOGL", 2800.0),
    ("AMZN", 3300.0),
    ("TSLA", 700.0),
    ("BTC-USD", 40000.0),
    ("ETH-USD", 2500.0),
    ("NQ=F", 15000.0),
    ("NQ", 15000.0),
];

const FALLBACK_PRICE: f64 = 100.0;
const FOREX_PRICE: f64 = 1.0;

/// Starting price of the synthetic path for `symbol`.
pub fn base_price(symbol: &str) -> f64 {
    match BASE_PRICES.iter().find(|(s, _)| *s == symbol) {
        Some((_, price)) => *price,
        None if symbol.contains("USD") => FOREX_PRICE,
        None => FALLBACK_PRICE,
    }
}

const CURRENCIES: &[(&str, &str)] = &[
    ("AAPL", "USD"),
    ("MSFT", "USD"),
    ("GOOGL", "USD"),
    ("AMZN", "USD"),
    ("TSLA", "USD"),
    ("BTC-USD", "USD"),
    ("ETH-USD", "USD"),
    ("EUR-USD", "USD"),
    ("GBP-USD", "USD"),
    ("USD-JPY", "JPY"),
    ("NQ=F", "USD"),
    ("NQ", "USD"),
];

/// Quote currency of a known symbol.
pub fn quote_currency(symbol: &str) -> Option<&'static str> {
    CURRENCIES.iter().find(|(s, _)| *s == symbol).map(|(_, ccy)| *ccy)
}

/// Title of the price axis: index futures are quoted in points, forex as a rate.
pub fn price_axis_title(symbol: &str) -> String {
    let ccy = quote_currency(symbol).unwrap_or("USD");
    match AssetClass::infer(symbol) {
        AssetClass::Future => "Points".to_string(),
        AssetClass::Forex => format!("Rate ({ccy})"),
        AssetClass::Equity | AssetClass::Crypto => format!("Price ({ccy})"),
    }
}
