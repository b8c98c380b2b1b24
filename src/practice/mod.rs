pub mod session;

pub use session::{Judgement, PracticeSession, VisualState};
