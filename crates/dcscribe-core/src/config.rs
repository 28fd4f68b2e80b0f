//! Configuration loading and typed config structures for DCScribe.
//!
//! The configuration lives in `dcscribe.yaml` (or wherever `DCSCRIBE_CONFIG`
//! points) and lists every game server to mirror. Each session names its
//! RPC endpoint, its database and a declarative list of recording tasks:
//!
//! ```yaml
//! sessions:
//!   - name: "Example Server"
//!     short_name: example
//!     rpc: { host: 127.0.0.1, port: 4222 }
//!     database: { host: localhost, name: dcscribe, username: dcscribe, password: secret }
//!     tasks:
//!       - { kind: units, enabled: true, timer: 2, poll_rate: 1 }
//!       - { kind: markpanels, enabled: true }
//!       - { kind: airbases, enabled: true, timer: 60 }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "DCSCRIBE_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "dcscribe.yaml";

/// Prefix of the per-session password override variables.
pub const PASSWORD_ENV_PREFIX: &str = "DATABASE_PASSWORD_";

/// Timer used by a task whose `timer` is unset, in seconds.
pub const DEFAULT_TASK_TIMER_SECS: u64 = 60;

/// Unit stream poll-rate hint used when `poll_rate` is unset.
pub const DEFAULT_POLL_RATE: u32 = 1;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The file parsed but describes an unusable setup.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration: the sessions to mirror.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// One entry per game server.
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `DATABASE_PASSWORD_<SHORT_NAME>` environment variables override the
    /// matching session's database password.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply password overrides using `lookup` to read variables.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for session in &mut self.sessions {
            if let Some(password) = lookup(&session.password_env_var()) {
                session.database.password = password;
            }
        }
    }

    /// Check the session list is non-empty with unique short names, and
    /// every task appears once with a non-zero timer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sessions.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "no sessions configured".to_owned(),
            });
        }
        let mut seen = HashSet::new();
        for session in &self.sessions {
            if session.short_name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    reason: format!("session '{}' has an empty short_name", session.name),
                });
            }
            if !seen.insert(session.short_name.as_str()) {
                return Err(ConfigError::Invalid {
                    reason: format!("duplicate short_name '{}'", session.short_name),
                });
            }
            let mut kinds = HashSet::new();
            for task in &session.tasks {
                if task.timer == Some(0) {
                    return Err(ConfigError::Invalid {
                        reason: format!(
                            "session '{}' task '{}' has a zero timer",
                            session.short_name,
                            task.kind.as_str()
                        ),
                    });
                }
                if !kinds.insert(task.kind) {
                    return Err(ConfigError::Invalid {
                        reason: format!(
                            "session '{}' lists task '{}' more than once",
                            session.short_name,
                            task.kind.as_str()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// One game server to mirror.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionConfig {
    /// Display name.
    pub name: String,
    /// Short identifier used in logs, subjects and env overrides.
    pub short_name: String,
    /// Where the live session is reached.
    pub rpc: RpcConfig,
    /// Where the mirror is written.
    pub database: DatabaseConfig,
    /// Recording tasks; a kind missing from the list is disabled.
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

impl SessionConfig {
    /// Name of the variable overriding this session's database password.
    pub fn password_env_var(&self) -> String {
        let suffix: String = self
            .short_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{PASSWORD_ENV_PREFIX}{suffix}")
    }
}

/// RPC endpoint of the live session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcConfig {
    /// Host name or address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Subject prefix; defaults to `dcs.<short_name>`.
    #[serde(default)]
    pub subject_prefix: Option<String>,
}

impl RpcConfig {
    /// Server URL for the message bus client.
    pub fn url(&self) -> String {
        format!("nats://{}:{}", self.host, self.port)
    }

    /// Subject prefix for a session with this short name.
    pub fn subject_prefix(&self, short_name: &str) -> String {
        self.subject_prefix
            .clone()
            .unwrap_or_else(|| format!("dcs.{short_name}"))
    }
}

/// Database connection parameters.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Host name or address.
    pub host: String,
    /// Port.
    #[serde(default = "default_database_port")]
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Login role.
    pub username: String,
    /// Login password.
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

const fn default_database_port() -> u16 {
    5432
}

/// Recording task kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Live unit stream plus its accumulator.
    Units,
    /// Live mark panel stream, initial snapshot and accumulator.
    #[serde(rename = "markpanels")]
    MarkPanels,
    /// Periodic airbase snapshot.
    Airbases,
}

impl TaskKind {
    /// Config spelling of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Units => "units",
            Self::MarkPanels => "markpanels",
            Self::Airbases => "airbases",
        }
    }
}

/// One entry of a session's task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TaskSpec {
    /// Which task.
    pub kind: TaskKind,
    /// Whether the task runs.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Flush window (units) or poll interval (airbases), in seconds.
    #[serde(default)]
    pub timer: Option<u64>,
    /// Unit stream poll-rate hint.
    #[serde(default)]
    pub poll_rate: Option<u32>,
}

impl TaskSpec {
    /// The timer, falling back to the default.
    pub fn timer(&self) -> Duration {
        Duration::from_secs(self.timer.unwrap_or(DEFAULT_TASK_TIMER_SECS))
    }

    /// The poll-rate hint, falling back to the default.
    pub fn poll_rate(&self) -> u32 {
        self.poll_rate.unwrap_or(DEFAULT_POLL_RATE)
    }
}

const fn default_enabled() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
sessions:
  - name: "Example Server"
    short_name: example
    rpc: { host: 127.0.0.1, port: 4222, subject_prefix: dcs.example }
    database: { host: localhost, port: 5433, name: dcscribe, username: dcscribe, password: secret }
    tasks:
      - { kind: units, enabled: true, timer: 2, poll_rate: 5 }
      - { kind: markpanels, enabled: true }
      - { kind: airbases, enabled: false, timer: 30 }
  - name: "Training"
    short_name: train-2
    rpc: { host: 10.0.0.2, port: 4222 }
    database: { host: db, name: training, username: scribe }
"#;

    #[test]
    fn parse_full_yaml() {
        let config: Config = serde_yml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.sessions.len(), 2);

        let example = &config.sessions[0];
        assert_eq!(example.database.port, 5433);
        assert_eq!(example.rpc.url(), "nats://127.0.0.1:4222");
        assert_eq!(example.rpc.subject_prefix("example"), "dcs.example");

        let [units, markpanels, airbases] = [0, 1, 2].map(|i| example.tasks[i]);
        assert_eq!(units.kind, TaskKind::Units);
        assert_eq!(units.timer(), Duration::from_secs(2));
        assert_eq!(units.poll_rate(), 5);

        assert_eq!(markpanels.timer(), Duration::from_secs(DEFAULT_TASK_TIMER_SECS));
        assert_eq!(markpanels.poll_rate(), DEFAULT_POLL_RATE);

        assert_eq!(airbases.kind, TaskKind::Airbases);
        assert!(!airbases.enabled);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: Config = serde_yml::from_str(SAMPLE).unwrap();
        let training = &config.sessions[1];
        assert_eq!(training.database.port, 5432);
        assert!(training.database.password.is_empty());
        assert!(training.tasks.is_empty());
        assert_eq!(training.rpc.subject_prefix("train-2"), "dcs.train-2");
    }

    #[test]
    fn env_override_replaces_password() {
        let mut config: Config = serde_yml::from_str(SAMPLE).unwrap();
        config.apply_env_overrides(|key| {
            (key == "DATABASE_PASSWORD_TRAIN_2").then(|| "from-env".to_owned())
        });
        assert_eq!(config.sessions[0].database.password, "secret");
        assert_eq!(config.sessions[1].database.password, "from-env");
    }

    #[test]
    fn empty_session_list_is_rejected() {
        let err = Config::parse("sessions: []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn duplicate_short_names_are_rejected() {
        let yaml = r"
sessions:
  - { name: a, short_name: dup, rpc: { host: h, port: 1 }, database: { host: d, name: n, username: u } }
  - { name: b, short_name: dup, rpc: { host: h, port: 2 }, database: { host: d, name: n, username: u } }
";
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate short_name 'dup'"));
    }

    #[test]
    fn duplicate_task_kinds_are_rejected() {
        let yaml = r"
sessions:
  - name: a
    short_name: a
    rpc: { host: h, port: 1 }
    database: { host: d, name: n, username: u }
    tasks:
      - { kind: units }
      - { kind: units, timer: 5 }
";
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn zero_timer_is_rejected() {
        let yaml = r"
sessions:
  - name: a
    short_name: a
    rpc: { host: h, port: 1 }
    database: { host: d, name: n, username: u }
    tasks:
      - { kind: airbases, timer: 0 }
";
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("task 'airbases' has a zero timer"));
    }

    #[test]
    fn unknown_task_kind_is_a_yaml_error() {
        let yaml = r"
sessions:
  - name: a
    short_name: a
    rpc: { host: h, port: 1 }
    database: { host: d, name: n, username: u }
    tasks:
      - { kind: weather }
";
        assert!(matches!(Config::parse(yaml), Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn debug_output_hides_password() {
        let config: Config = serde_yml::from_str(SAMPLE).unwrap();
        let rendered = format!("{:?}", config.sessions[0].database);
        assert!(!rendered.contains("secret"));
    }
}
