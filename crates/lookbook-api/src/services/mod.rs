pub mod analysis;
pub mod sweeper;
pub mod temp;

pub use analysis::{AnalysisOutcome, AnalysisService};
pub use sweeper::TempFileSweeper;
pub use temp::TempImage;
