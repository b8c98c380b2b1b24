pub mod selector;
pub mod store;
pub mod summary;

pub use store::PracticeStats;
pub use summary::ProgressSummary;
