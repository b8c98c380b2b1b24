pub mod kv;
pub mod settings;

pub use kv::SqliteStore;
pub use settings::UserSettings;
