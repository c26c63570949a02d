//! Search and evaluation for kestrel.

pub mod config;
pub mod eval;
pub mod search;
pub mod time;

pub use config::{ConfigError, SearchConfig};
pub use eval::evaluate;
pub use search::control::SearchControl;
pub use search::deepening::{format_info, format_score};
pub use search::{SearchResult, Searcher};
pub use time::{GoParams, TimeBudget};
