use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

/// Group members queried when no list is configured.
const DEFAULT_PEOPLE: &[&str] = &[
    "James O'Shea",
    "Alex Saywell",
    "Philip Moriarty",
    "Peter Beton",
    "James Sharp",
];

pub const DEFAULT_AFFILIATION: &str = "Nottingham";
pub const DEFAULT_BASE_URL: &str = "https://scholar.google.com";
pub const DEFAULT_MIN_YEAR: i32 = 1990;

/// Everything one run needs. Built once at start-up and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub people: Vec<String>,
    pub affiliation: String,
    pub output_dir: PathBuf,
    /// Exclusive: a publication from `min_year` itself is dropped.
    pub min_year: i32,
    pub base_url: String,
    pub proxy: Option<String>,
    pub timeout_secs: Option<u64>,
    pub dedupe: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            people: DEFAULT_PEOPLE.iter().map(|p| p.to_string()).collect(),
            affiliation: DEFAULT_AFFILIATION.to_string(),
            output_dir: PathBuf::from("all_pubs"),
            min_year: DEFAULT_MIN_YEAR,
            base_url: DEFAULT_BASE_URL.to_string(),
            proxy: None,
            timeout_secs: None,
            dedupe: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.people.is_empty() {
            bail!("no people configured");
        }
        if let Some(pos) = self.people.iter().position(|p| p.trim().is_empty()) {
            bail!("person #{} has an empty name", pos + 1);
        }
        if self.affiliation.trim().is_empty() {
            bail!("affiliation must not be empty");
        }
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        Ok(())
    }

    /// The provider query for one configured name.
    pub fn query_for(&self, person: &str) -> String {
        format!("{}, {}", person.trim(), self.affiliation.trim())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().expect("default config validates");
        assert_eq!(cfg.people.len(), 5);
        assert_eq!(cfg.min_year, 1990);
        assert!(cfg.proxy.is_none());
        assert!(cfg.timeout().is_none());
    }

    #[test]
    fn query_appends_affiliation() {
        let cfg = Config::default();
        assert_eq!(cfg.query_for("Peter Beton"), "Peter Beton, Nottingham");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"min_year": 2016, "timeout_secs": 30}}"#).unwrap();
        let cfg = Config::from_file(file.path()).expect("parse");
        assert_eq!(cfg.min_year, 2016);
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.affiliation, DEFAULT_AFFILIATION);
        assert_eq!(cfg.people.len(), 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"min_yaer": 2016}}"#).unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn empty_people_is_invalid() {
        let cfg = Config {
            people: vec![],
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn blank_affiliation_is_invalid() {
        let cfg = Config {
            affiliation: " ".into(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
