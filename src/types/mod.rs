mod candle;
mod conviction;
mod options;
mod signals;

pub use candle::*;
pub use conviction::*;
pub use options::*;
pub use signals::*;
