//! Conviction engine - multi-timeframe conviction scoring for index options

pub mod config;
pub mod error;
pub mod input;
pub mod services;
pub mod types;

pub use config::{Config, ScoringConfig};
pub use error::{EngineError, Result};
pub use input::{load_input, ConvictionInput};
pub use services::ConvictionScorer;
pub use types::*;
