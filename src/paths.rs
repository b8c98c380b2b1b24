use std::path::PathBuf;
use std::sync::OnceLock;

/// XDG-compliant directory layout for note-trainer.
///
///   Config:  $XDG_CONFIG_HOME/note-trainer  (~/.config/note-trainer)
///   Data:    $XDG_DATA_HOME/note-trainer    (~/.local/share/note-trainer)
///
/// The `dirs` crate handles platform differences. Resolved base paths are
/// cached so lookup only happens once.

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

const APP_DIR: &str = "note-trainer";

/// Root data directory: $XDG_DATA_HOME/note-trainer
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    })
}

/// Root config directory: $XDG_CONFIG_HOME/note-trainer
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    })
}

/// Config file path: <config_dir>/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Practice data store: <data_dir>/note-trainer.db
pub fn db_path() -> PathBuf {
    data_dir().join("note-trainer.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_ends_with_app_name() {
        assert!(data_dir().ends_with("note-trainer"));
    }

    #[test]
    fn config_dir_ends_with_app_name() {
        assert!(config_dir().ends_with("note-trainer"));
    }

    #[test]
    fn config_file_structure() {
        assert!(config_file().ends_with("note-trainer/config.toml"));
    }

    #[test]
    fn db_lives_in_data_dir() {
        let db = db_path();
        assert!(db.starts_with(data_dir()));
        assert!(db.ends_with("note-trainer.db"));
    }
}
