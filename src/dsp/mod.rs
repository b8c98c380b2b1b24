pub mod peaks;
pub mod spectrum;
