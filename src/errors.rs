use chrono::NaiveDate;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The timeframe token is not in the timeframe table.
    #[error("Unknown timeframe token: {0}")]
    UnknownTimeframe(String),

    /// The requested date range ends before it starts.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// A candle violates `low <= min(open, close) <= max(open, close) <= high` or holds a non-positive price.
    #[error("Invalid candle: {0}")]
    InvalidCandle(String),

    /// Candle timestamps must be strictly increasing.
    #[error("Timestamps are not strictly increasing at index {index}")]
    UnorderedTimestamps { index: usize },

    /// A chart request is malformed (empty symbol and the like).
    #[error("Invalid chart request: {0}")]
    InvalidRequest(String),

    /// The synthesizer could not establish the candle invariant.
    #[error("Generation fault for {symbol}: {reason}")]
    GenerationFault { symbol: String, reason: String },

    /// A single chart element (overlay, indicator, drawing, trade) could not be rendered.
    #[error("Render fault in {element}: {reason}")]
    RenderFault { element: String, reason: String },

    /// The external market-data fetcher failed.
    #[error("Fetch failed for {symbol}: {reason}")]
    Fetch { symbol: String, reason: String },

    /// Raster or vector output failed.
    #[error("Plotters error: {0}")]
    Plotters(String),

    /// A lock guarding shared state was poisoned.
    #[error("Mutex error: {0}")]
    Mutex(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn render(element: impl ToString, reason: impl ToString) -> Self {
        Self::RenderFault {
            element: element.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Name of the component the error originates from, for user-facing diagnostics.
    pub fn component(&self) -> &'static str {
        match self {
            Self::UnknownTimeframe(_) | Self::InvalidRange { .. } => "calendar",
            Self::InvalidCandle(_) | Self::UnorderedTimestamps { .. } => "series",
            Self::InvalidRequest(_) => "request",
            Self::GenerationFault { .. } => "synthesizer",
            Self::Fetch { .. } => "fetcher",
            Self::RenderFault { .. } | Self::Plotters(_) => "chart",
            Self::Mutex(_) => "cache",
            Self::IoError(_) => "io",
            #[cfg(feature = "serde")]
            Self::JsonError(_) => "json",
        }
    }
}
