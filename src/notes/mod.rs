pub mod catalog;
pub mod mode;

pub use catalog::Note;
pub use mode::{Clef, PracticeMode};
