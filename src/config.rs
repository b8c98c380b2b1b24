use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::detector::DetectorConfig;
use crate::dsp::spectrum::SpectrumConfig;
use crate::paths;

/// Application configuration, loaded from config.toml.
///
/// Every section uses `#[serde(default)]`, so the file is optional and may
/// set only the values it cares about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub detector: DetectorConfig,
    pub practice: PracticeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name, or "default"
    pub device: String,
    pub fft_size: usize,
    pub hop_size: usize,
    /// Weight of the previous spectrum when smoothing (0.0 - 1.0)
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    /// Pause after a correct answer before the next note appears (ms)
    pub advance_delay_ms: u64,
    /// After a wrong answer, further detections are ignored this long (ms)
    pub wrong_cooldown_ms: u64,
    /// UI refresh / detection tick interval (ms)
    pub tick_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let spectrum = SpectrumConfig::default();
        Self {
            device: "default".into(),
            fft_size: spectrum.fft_size,
            hop_size: spectrum.hop_size,
            smoothing: spectrum.smoothing,
            min_db: spectrum.min_db,
            max_db: spectrum.max_db,
        }
    }
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            advance_delay_ms: 1000,
            wrong_cooldown_ms: 1500,
            tick_ms: 16,
        }
    }
}

impl AudioConfig {
    pub fn spectrum_config(&self) -> SpectrumConfig {
        SpectrumConfig {
            fft_size: self.fft_size,
            hop_size: self.hop_size,
            smoothing: self.smoothing,
            min_db: self.min_db,
            max_db: self.max_db,
        }
    }
}

impl PracticeConfig {
    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    pub fn wrong_cooldown(&self) -> Duration {
        Duration::from_millis(self.wrong_cooldown_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl AppConfig {
    /// Reject settings that would make detection meaningless.
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        if !audio.fft_size.is_power_of_two() || audio.fft_size < 1024 {
            anyhow::bail!("audio.fft_size must be a power of two >= 1024 (got {})", audio.fft_size);
        }
        if audio.hop_size == 0 || audio.hop_size > audio.fft_size {
            anyhow::bail!("audio.hop_size must be between 1 and fft_size (got {})", audio.hop_size);
        }
        if !(0.0..1.0).contains(&audio.smoothing) {
            anyhow::bail!("audio.smoothing must be in [0, 1) (got {})", audio.smoothing);
        }
        if audio.min_db >= audio.max_db {
            anyhow::bail!("audio.min_db must be below audio.max_db");
        }

        let det = &self.detector;
        if det.peaks.min_hz >= det.peaks.max_hz {
            anyhow::bail!("detector.min_hz must be below detector.max_hz");
        }
        if det.peaks.top_k == 0 {
            anyhow::bail!("detector.top_k must be at least 1");
        }
        if det.required_detections < 2 {
            anyhow::bail!(
                "detector.required_detections must be at least 2 (got {})",
                det.required_detections
            );
        }
        let tol = &det.tolerance;
        for pct in [tol.low_pct, tol.mid_pct, tol.high_pct] {
            if !(pct > 0.0 && pct < 50.0) {
                anyhow::bail!("detector.tolerance percentages must be in (0, 50) (got {pct})");
            }
        }
        Ok(())
    }
}

/// Load the config from $XDG_CONFIG_HOME/note-trainer/config.toml.
/// If the file doesn't exist, returns defaults.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&paths::config_file())
}

fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.audio.fft_size, 8192);
        assert_eq!(cfg.detector.required_detections, 2);
        assert_eq!(cfg.detector.min_interval_ms, 200);
        assert_eq!(cfg.detector.peaks.top_k, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[detector]
min_interval_ms = 300
top_k = 1

[detector.tolerance]
low_pct = 4.0
"#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.detector.min_interval_ms, 300);
        assert_eq!(cfg.detector.peaks.top_k, 1);
        assert_eq!(cfg.detector.tolerance.low_pct, 4.0);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.detector.tolerance.mid_pct, 2.0);
        assert_eq!(cfg.detector.peaks.min_hz, 80.0);
        assert_eq!(cfg.audio.device, "default");
        assert_eq!(cfg.practice.wrong_cooldown_ms, 1500);
    }

    #[test]
    fn roundtrip_toml() {
        let cfg = AppConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let loaded: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(loaded.detector.peaks.max_hz, cfg.detector.peaks.max_hz);
        assert_eq!(loaded.audio.smoothing, cfg.audio.smoothing);
    }

    #[test]
    fn spectrum_config_conversion() {
        let audio = AudioConfig {
            fft_size: 4096,
            ..AudioConfig::default()
        };
        let spectrum = audio.spectrum_config();
        assert_eq!(spectrum.fft_size, 4096);
        assert_eq!(spectrum.hop_size, 2048);
    }

    #[test]
    fn single_frame_confirmation_rejected() {
        let mut cfg = AppConfig::default();
        cfg.detector.required_detections = 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_fft_size_rejected() {
        let mut cfg = AppConfig::default();
        cfg.audio.fft_size = 5000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_band_rejected() {
        let mut cfg = AppConfig::default();
        cfg.detector.peaks.min_hz = 2000.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config_from(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(cfg.practice.advance_delay_ms, 1000);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[detector]\nrequired_detections = 0\n").unwrap();
        assert!(load_config_from(&path).is_err());
    }
}
