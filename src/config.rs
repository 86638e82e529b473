//! Run configuration: an optional TOML file merged with command-line values.

use crate::disposition::Action;
use crate::error::ConfigError;
use crate::policy::{RetentionPolicy, SelectionMode};
use crate::template::{FormatTemplate, DEFAULT_FORMAT};
use crate::time::{local_now, parse_reference_time};

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default policy keeps everything until told otherwise
pub const DEFAULT_RETENTION: &str = "all";

/// Settings read from a config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub directory: Option<PathBuf>,
    pub format: Option<String>,
    pub retention: Option<String>,
    pub selection: Option<SelectionMode>,
    pub action: Option<Action>,
    pub destination: Option<PathBuf>,
    pub verbose: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values given on the command line; these win over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub directory: Option<PathBuf>,
    pub format: Option<String>,
    pub retention: Option<String>,
    pub selection: Option<SelectionMode>,
    pub action: Option<Action>,
    pub destination: Option<PathBuf>,
    pub verbose: bool,
    pub dry_run: bool,
    pub now: Option<String>,
}

/// A validated configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub directory: PathBuf,
    pub template: FormatTemplate,
    pub policy: RetentionPolicy,
    pub selection: SelectionMode,
    pub action: Action,
    pub destination: Option<PathBuf>,
    pub verbose: bool,
    pub dry_run: bool,
    /// Timestamps after this are classified as future
    pub now: NaiveDateTime,
}

impl RunConfig {
    /// Merge overrides over the file config over defaults, then validate
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let format = overrides
            .format
            .or(file.format)
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
        let template = FormatTemplate::parse(&format)?;

        let retention = overrides
            .retention
            .or(file.retention)
            .unwrap_or_else(|| DEFAULT_RETENTION.to_string());
        let policy: RetentionPolicy = retention.parse()?;

        let action = overrides.action.or(file.action).unwrap_or_default();
        let destination = overrides.destination.or(file.destination);
        if action == Action::Move && destination.is_none() {
            return Err(ConfigError::MissingDestination);
        }

        let now = match overrides.now {
            Some(value) => parse_reference_time(&value)?,
            None => local_now(),
        };

        Ok(RunConfig {
            directory: overrides
                .directory
                .or(file.directory)
                .unwrap_or_else(|| PathBuf::from(".")),
            template,
            policy,
            selection: overrides.selection.or(file.selection).unwrap_or_default(),
            action,
            destination,
            verbose: overrides.verbose || file.verbose.unwrap_or(false),
            dry_run: overrides.dry_run,
            now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::TimeUnit;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = RunConfig::resolve(FileConfig::default(), Overrides::default()).unwrap();
        assert_eq!(config.directory, PathBuf::from("."));
        assert_eq!(config.template.as_str(), DEFAULT_FORMAT);
        assert_eq!(config.policy, RetentionPolicy::RetainAll);
        assert_eq!(config.selection, SelectionMode::Progressive);
        assert_eq!(config.action, Action::Report);
        assert!(!config.verbose);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_file_config_parses_all_fields() {
        let contents = r#"
            directory = "/var/backups/db"
            format = "db-{YYYY}{MM}{DD}-{hh}{mm}.sql.gz"
            retention = "last=3 days=7"
            selection = "cumulative"
            action = "move"
            destination = "/var/backups/attic"
            verbose = true
        "#;
        let file = FileConfig::parse(Path::new("test.toml"), contents).unwrap();
        assert_eq!(file.selection, Some(SelectionMode::Cumulative));
        assert_eq!(file.action, Some(Action::Move));

        let config = RunConfig::resolve(file, Overrides::default()).unwrap();
        assert_eq!(config.directory, PathBuf::from("/var/backups/db"));
        assert_eq!(config.destination, Some(PathBuf::from("/var/backups/attic")));
        assert!(config.verbose);
        match config.policy {
            RetentionPolicy::Generations(g) => {
                assert_eq!(g.get(TimeUnit::Latest).map(|n| n.get()), Some(3));
                assert_eq!(g.get(TimeUnit::Day).map(|n| n.get()), Some(7));
            }
            RetentionPolicy::RetainAll => panic!("expected generations"),
        }
    }

    #[test]
    fn test_overrides_win() {
        let file = FileConfig {
            retention: Some("days=7".to_string()),
            selection: Some(SelectionMode::Cumulative),
            directory: Some(PathBuf::from("/from/file")),
            ..FileConfig::default()
        };
        let overrides = Overrides {
            retention: Some("all".to_string()),
            selection: Some(SelectionMode::Progressive),
            ..Overrides::default()
        };
        let config = RunConfig::resolve(file, overrides).unwrap();
        assert_eq!(config.policy, RetentionPolicy::RetainAll);
        assert_eq!(config.selection, SelectionMode::Progressive);
        assert_eq!(config.directory, PathBuf::from("/from/file"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = FileConfig::parse(Path::new("bad.toml"), "retention_policy = \"all\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseConfig { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = FileConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadConfig { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("retention.toml");
        fs::write(&path, "retention = \"weeks=4\"\n").unwrap();
        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.retention.as_deref(), Some("weeks=4"));
    }

    #[test]
    fn test_move_requires_destination() {
        let overrides = Overrides {
            action: Some(Action::Move),
            ..Overrides::default()
        };
        let err = RunConfig::resolve(FileConfig::default(), overrides).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDestination));
    }

    #[test]
    fn test_bad_policy_and_template_are_config_errors() {
        let overrides = Overrides {
            retention: Some("days=0".to_string()),
            ..Overrides::default()
        };
        let err = RunConfig::resolve(FileConfig::default(), overrides).unwrap_err();
        assert!(matches!(err, ConfigError::Policy(_)));
        assert!(err.to_string().contains("days=0"));

        let overrides = Overrides {
            format: Some("{YYYY}".to_string()),
            ..Overrides::default()
        };
        let err = RunConfig::resolve(FileConfig::default(), overrides).unwrap_err();
        assert!(matches!(err, ConfigError::Template(_)));
    }

    #[test]
    fn test_reference_time_override() {
        let overrides = Overrides {
            now: Some("2024-01-02T03:04".to_string()),
            ..Overrides::default()
        };
        let config = RunConfig::resolve(FileConfig::default(), overrides).unwrap();
        assert_eq!(config.now, parse_reference_time("2024-01-02T03:04").unwrap());
    }
}
