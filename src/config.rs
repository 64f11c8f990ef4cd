use anyhow::{Context, Result};
use log::{debug, warn};
use serde::*;
use std::path::{Path, PathBuf};

use crate::paper::PaperOptions;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub options: PaperOptions,
}

impl Config {
    pub fn file_name() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "papernet", "papernet")
            .ok_or(anyhow::anyhow!("Unknown configuration directory"))?;
        let dir = dirs.preference_dir();
        Ok(PathBuf::from(dir).join("papernet.json"))
    }
    pub fn load_from(file_name: &Path) -> Result<Config> {
        let f = std::fs::File::open(file_name)?;
        let f = std::io::BufReader::new(f);
        let cfg = serde_json::from_reader(f)
            .with_context(|| format!("Invalid configuration in {}", file_name.display()))?;
        Ok(cfg)
    }
    /// Saves to `file_name`, or to the user configuration file.
    pub fn save(&self, file_name: Option<&Path>) -> Result<PathBuf> {
        let file_name = match file_name {
            Some(f) => f.to_owned(),
            None => Self::file_name()?,
        };
        if let Some(d) = file_name.parent() {
            std::fs::create_dir_all(d)?
        }
        let f = std::fs::File::create(&file_name)
            .with_context(|| format!("Error creating {}", file_name.display()))?;
        let f = std::io::BufWriter::new(f);
        serde_json::to_writer_pretty(f, self)?;
        Ok(file_name)
    }

    /// Never fails, a missing or broken configuration gives the defaults.
    pub fn load_or_default(file_name: Option<&Path>) -> Config {
        let file_name = match file_name {
            Some(f) => f.to_owned(),
            None => match Self::file_name() {
                Ok(f) => f,
                Err(_) => return Config::default(),
            },
        };
        match Self::load_from(&file_name) {
            Ok(c) => {
                debug!("configuration read from {}", file_name.display());
                c
            }
            Err(e) => {
                if file_name.exists() {
                    warn!("{e:#}, using the defaults");
                }
                Config::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("papernet-{}-{name}", std::process::id()))
    }

    #[test]
    fn save_and_load() {
        let file_name = temp_file("config.json");
        let mut cfg = Config::default();
        cfg.options.scale = 25.0;
        cfg.options.create_stickers = false;
        assert_eq!(cfg.save(Some(&file_name)).unwrap(), file_name);

        let loaded = Config::load_or_default(Some(&file_name));
        assert_eq!(loaded, cfg);
        std::fs::remove_file(&file_name).unwrap();
    }

    #[test]
    fn missing_or_broken_gives_defaults() {
        let file_name = temp_file("missing.json");
        assert_eq!(Config::load_or_default(Some(&file_name)), Config::default());

        let file_name = temp_file("broken.json");
        std::fs::write(&file_name, "{ not json").unwrap();
        assert!(Config::load_from(&file_name).is_err());
        assert_eq!(Config::load_or_default(Some(&file_name)), Config::default());
        std::fs::remove_file(&file_name).unwrap();
    }

    #[test]
    fn partial_file() {
        let cfg: Config = serde_json::from_str(r#"{ "options": { "margin": 7.5 } }"#).unwrap();
        assert_eq!(cfg.options.margin, 7.5);
        assert_eq!(cfg.options.sticker_width, PaperOptions::default().sticker_width);
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
    }
}
