//! Per-pixel break analysis and batch runs over a pixel grid.

mod batch;
mod dates;
mod pipeline;
mod qa;
mod stack;

pub use batch::{run_batch, BatchReport, BreakGrid, PixelOutcome};
pub use dates::{parse_modis_date, parse_modis_dates};
pub use pipeline::{analyze_pixel, PixelAnalysis};
pub use qa::{scale_raw, QualityMask};
pub use stack::{FlagRecord, PixelStack, ValueRecord};
