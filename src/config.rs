use serde::Deserialize;
use std::time::Duration;
use std::{env, fs, path::Path, path::PathBuf};

use crate::error::{MapError, Result};
use crate::scanner::DEFAULT_EXTENSION;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub web_dir: PathBuf,
    pub state_dir: PathBuf,
    pub region_extension: String,
    pub threads: Option<usize>,
    /// Seconds between scan cycles.
    pub render_interval: u64,
    /// Seconds between marker flush checks.
    pub marker_interval: u64,
    pub log_level: Option<String>,
    pub worlds: Vec<WorldConfig>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct WorldConfig {
    pub name: String,
    pub region_dir: PathBuf,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_dir: PathBuf::from("web"),
            state_dir: PathBuf::from("state"),
            region_extension: DEFAULT_EXTENSION.to_string(),
            threads: None,
            render_interval: 5,
            marker_interval: 5,
            log_level: None,
            worlds: Vec::new(),
        }
    }
}

impl Config {
    /// Reads a JSON config file. Missing keys take their defaults; a file
    /// that exists but does not parse is fatal.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| MapError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| MapError::config(path, e.to_string()))
    }

    /// Environment overrides; unset or unparsable variables leave the field alone.
    pub fn apply_env(&mut self) {
        if let Ok(v) = env::var("MAP_WEB_DIR") { self.web_dir = PathBuf::from(v); }
        if let Ok(v) = env::var("MAP_STATE_DIR") { self.state_dir = PathBuf::from(v); }
        if let Some(n) = env::var("MAP_THREADS").ok().and_then(|s| s.parse::<usize>().ok()) { self.threads = Some(n); }
        if let Some(n) = env::var("MAP_RENDER_INTERVAL").ok().and_then(|s| s.parse::<u64>().ok()) { self.render_interval = n; }
        if let Some(n) = env::var("MAP_MARKER_INTERVAL").ok().and_then(|s| s.parse::<u64>().ok()) { self.marker_interval = n; }
        if let Ok(v) = env::var("MAP_LOG_LEVEL") { self.log_level = Some(v); }
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_secs(self.render_interval.max(1))
    }

    pub fn marker_interval(&self) -> Duration {
        Duration::from_secs(self.marker_interval.max(1))
    }

    pub fn world(&self, name: &str) -> Option<&WorldConfig> {
        self.worlds.iter().find(|w| w.name == name)
    }

    /// Worlds not listed in the config are enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.world(name).map_or(true, |w| w.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write;

    #[test]
    fn file_keys_map_to_fields_with_defaults() {
        let mut f = NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"web-dir": "/srv/map", "threads": 4,
                "worlds": [{{"name": "minecraft:overworld", "region-dir": "world/region"}},
                           {{"name": "minecraft:the_nether", "region-dir": "world/DIM-1/region", "enabled": false}}]}}"#
        )
        .unwrap();
        let cfg = Config::from_file(f.path()).unwrap();
        assert_eq!(cfg.web_dir, PathBuf::from("/srv/map"));
        assert_eq!(cfg.threads, Some(4));
        assert_eq!(cfg.state_dir, PathBuf::from("state"));
        assert_eq!(cfg.region_extension, "mca");
        assert!(cfg.worlds[0].enabled);
        assert!(cfg.is_enabled("minecraft:overworld"));
        assert!(!cfg.is_enabled("minecraft:the_nether"));
        assert!(cfg.is_enabled("minecraft:the_end"));
        assert_eq!(
            cfg.world("minecraft:the_nether").map(|w| w.region_dir.clone()),
            Some(PathBuf::from("world/DIM-1/region"))
        );
    }

    #[test]
    fn malformed_file_is_config_error() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{{ not json").unwrap();
        assert!(matches!(Config::from_file(f.path()), Err(MapError::Config { .. })));
    }

    #[test]
    fn env_overrides_fields() {
        env::set_var("MAP_STATE_DIR", "/tmp/map-state");
        env::set_var("MAP_RENDER_INTERVAL", "30");
        env::set_var("MAP_THREADS", "not-a-number");

        let mut cfg = Config::default();
        cfg.apply_env();
        assert_eq!(cfg.state_dir, PathBuf::from("/tmp/map-state"));
        assert_eq!(cfg.render_interval(), Duration::from_secs(30));
        assert_eq!(cfg.threads, None);

        // cleanup
        env::remove_var("MAP_STATE_DIR");
        env::remove_var("MAP_RENDER_INTERVAL");
        env::remove_var("MAP_THREADS");
    }
}
