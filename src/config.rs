//! Layered configuration: built-in defaults, optionally overridden by a TOML
//! file, further overridden by CLI flags (applied by the caller after
//! `Config::load`). Mirrors the teacher's `Config::load`/merge approach, cut
//! down to the handful of knobs this engine exposes.

use std::path::Path;

use serde::Deserialize;

use crate::errors::EngineResult;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_depth: u32,
    pub max_tries: u32,
    pub max_iter: u32,
    pub constant_recheck: bool,
    pub solver_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config { max_depth: 10, max_tries: 10, max_iter: 10, constant_recheck: true, solver_timeout_ms: None }
    }
}

impl Config {
    /// Load defaults, then merge in `path` if it's provided and exists.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let mut config = Config::default();
        if let Some(path) = path {
            if path.exists() {
                let text = std::fs::read_to_string(path)?;
                let file_config: Config = toml::from_str(&text)?;
                config = file_config;
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_cli_defaults() {
        let config = Config::default();
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.max_tries, 10);
        assert_eq!(config.max_iter, 10);
        assert!(config.constant_recheck);
    }

    #[test]
    fn missing_config_path_falls_back_to_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/sympath.toml"))).unwrap();
        assert_eq!(config.max_depth, 10);
    }

    #[test]
    fn loads_overrides_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sympath.toml");
        std::fs::write(&path, "max_depth = 5\nmax_tries = 2\nmax_iter = 4\nconstant_recheck = false\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_depth, 5);
        assert!(!config.constant_recheck);
    }
}
