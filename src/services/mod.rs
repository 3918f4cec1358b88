pub mod conviction;
pub mod signals;

pub use conviction::ConvictionScorer;
pub use signals::{
    CandleLayer, IndicatorEngine, OptionsAnalyzer, OptionsLayer, PatternDetector,
    PriceActionAnalyzer,
};
