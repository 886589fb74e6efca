use std::{
    collections::HashMap,
    env, fmt, fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use directories::BaseDirs;

use crate::error::ConfigError;

/// Environment prefix that overrides a known key, e.g. `CODERUN_DEBUG=true`.
pub const ENV_OVERRIDE_PREFIX: &str = "CODERUN_";

pub const DEFAULT_MAX_RUNTIME_SECONDS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let config_path = default_config_path();
        let mut cfg = Self::from_pairs(Vec::<(String, String)>::new());
        cfg.merge_rc_file(&config_path);
        cfg.config_path = config_path;

        // Overlay CODERUN_* environment variables (take precedence)
        for (k, v) in env::vars() {
            if let Some(key) = config_key(&k) {
                cfg.inner.insert(key.to_string(), v);
            }
        }
        cfg
    }

    /// Defaults overlaid with the given pairs. Does not touch the filesystem.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self {
            inner: map,
            config_path: default_config_path(),
        }
    }

    fn merge_rc_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        let Ok(file) = fs::File::open(path) else {
            tracing::warn!(path = %path.display(), "config file exists but cannot be opened");
            return;
        };
        let reader = BufReader::new(file);
        for line in reader.lines().map_while(Result::ok) {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((k, v)) = line.split_once('=') {
                self.inner.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key)
            .filter(|v| !v.trim().is_empty() && v != "auto")
            .map(PathBuf::from)
    }
}

/// Validated, immutable runtime settings consumed by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub max_runtime_seconds: u64,
    pub debug: bool,
    pub python_interpreter: Option<PathBuf>,
    pub shell_interpreter: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_runtime_seconds: DEFAULT_MAX_RUNTIME_SECONDS,
            debug: false,
            python_interpreter: None,
            shell_interpreter: PathBuf::from("/bin/bash"),
        }
    }
}

impl Settings {
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let raw_timeout = cfg
            .get("MAX_RUNTIME_SECONDS")
            .unwrap_or_else(|| DEFAULT_MAX_RUNTIME_SECONDS.to_string());
        let max_runtime_seconds = parse_timeout(&raw_timeout)?;

        let debug = match cfg.get("DEBUG") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                key: "DEBUG",
                value: raw,
                reason: "expected true or false",
            })?,
            None => false,
        };

        Ok(Self {
            max_runtime_seconds,
            debug,
            python_interpreter: cfg.get_path("PYTHON_INTERPRETER"),
            shell_interpreter: cfg
                .get_path("SHELL_INTERPRETER")
                .unwrap_or_else(|| PathBuf::from("/bin/bash")),
        })
    }

    pub fn with_max_runtime_seconds(mut self, seconds: u64) -> Result<Self, ConfigError> {
        if seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_RUNTIME_SECONDS",
                value: seconds.to_string(),
                reason: "must be a positive integer",
            });
        }
        self.max_runtime_seconds = seconds;
        Ok(self)
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAX_RUNTIME_SECONDS={} DEBUG={}",
            self.max_runtime_seconds, self.debug
        )
    }
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
            key: "MAX_RUNTIME_SECONDS",
            value: raw.to_string(),
            reason: "must be a positive integer",
        }),
        Ok(n) => Ok(n),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

/// `CODERUN_DEBUG` -> `DEBUG`, for known keys only.
fn config_key(env_key: &str) -> Option<&str> {
    const KEYS: &[&str] = &[
        "MAX_RUNTIME_SECONDS",
        "DEBUG",
        "PYTHON_INTERPRETER",
        "SHELL_INTERPRETER",
    ];

    env_key
        .strip_prefix(ENV_OVERRIDE_PREFIX)
        .filter(|k| KEYS.contains(k))
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("coderun").join(".coderunrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert(
        "MAX_RUNTIME_SECONDS".into(),
        DEFAULT_MAX_RUNTIME_SECONDS.to_string(),
    );
    m.insert("DEBUG".into(), "false".into());
    m.insert("PYTHON_INTERPRETER".into(), "auto".into());
    m.insert("SHELL_INTERPRETER".into(), "/bin/bash".into());
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::from_config(&Config::from_pairs(Vec::<(String, String)>::new()))
            .unwrap();
        assert_eq!(settings.max_runtime_seconds, 30);
        assert!(!settings.debug);
        assert_eq!(settings.python_interpreter, None);
        assert_eq!(settings.shell_interpreter, PathBuf::from("/bin/bash"));
    }

    #[test]
    fn explicit_values_are_parsed() {
        let cfg = Config::from_pairs([
            ("MAX_RUNTIME_SECONDS", "5"),
            ("DEBUG", "TRUE"),
            ("PYTHON_INTERPRETER", "/opt/py/bin/python3"),
        ]);
        let settings = Settings::from_config(&cfg).unwrap();
        assert_eq!(settings.max_runtime_seconds, 5);
        assert!(settings.debug);
        assert_eq!(
            settings.python_interpreter,
            Some(PathBuf::from("/opt/py/bin/python3"))
        );
    }

    #[test]
    fn zero_or_garbage_timeout_is_rejected() {
        for bad in ["0", "-3", "ten", ""] {
            let cfg = Config::from_pairs([("MAX_RUNTIME_SECONDS", bad)]);
            assert!(Settings::from_config(&cfg).is_err(), "accepted {bad:?}");
        }
        assert!(Settings::default().with_max_runtime_seconds(0).is_err());
    }

    #[test]
    fn debug_rejects_unknown_words() {
        let cfg = Config::from_pairs([("DEBUG", "maybe")]);
        let err = Settings::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("DEBUG"));
    }

    #[test]
    fn display_lists_both_settings() {
        let s = Settings::default().with_debug(true);
        assert_eq!(s.to_string(), "MAX_RUNTIME_SECONDS=30 DEBUG=true");
    }

    #[test]
    fn rc_file_lines_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".coderunrc");
        fs::write(&path, "# comment\n\nMAX_RUNTIME_SECONDS = 7\nDEBUG=true\n").unwrap();
        let mut cfg = Config::from_pairs(Vec::<(String, String)>::new());
        cfg.merge_rc_file(&path);
        assert_eq!(cfg.inner.get("MAX_RUNTIME_SECONDS").map(String::as_str), Some("7"));
        assert_eq!(cfg.inner.get("DEBUG").map(String::as_str), Some("true"));
    }

    #[test]
    fn only_prefixed_known_keys_come_from_env() {
        assert_eq!(config_key("CODERUN_MAX_RUNTIME_SECONDS"), Some("MAX_RUNTIME_SECONDS"));
        assert_eq!(config_key("CODERUN_DEBUG"), Some("DEBUG"));
        assert_eq!(config_key("DEBUG"), None);
        assert_eq!(config_key("CODERUN_HOME"), None);
    }
}
