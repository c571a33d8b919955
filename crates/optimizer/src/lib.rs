pub mod analyzer;
pub mod enumerator;
pub mod error;
pub mod sweep;

pub use analyzer::{Analyzer, RankedReport};
pub use enumerator::{axis_values, enumerate, space_size};
pub use error::SweepError;
pub use sweep::{CancelFlag, SweepScheduler};
