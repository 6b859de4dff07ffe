use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::message::MessageFormat;

const DEFAULT_PERSIST_DIR: &str = "messages";
const SHARED_PROFILE_PREFIX: &str = "profile:";

/// Where AWS credentials and region come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Env,
    SharedProfile(String),
}

impl ConfigSource {
    fn parse(value: &str) -> Result<Self, ProfileProblem> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ProfileProblem::ConfigSourceEmpty);
        }
        if value == "env" {
            return Ok(Self::Env);
        }
        if let Some(profile) = value.strip_prefix(SHARED_PROFILE_PREFIX) {
            if profile.trim().is_empty() {
                return Err(ProfileProblem::ConfigSourceEmpty);
            }
            return Ok(Self::SharedProfile(profile.trim().to_string()));
        }
        Err(ProfileProblem::ConfigSourceUnknown(value.to_string()))
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env => write!(f, "env"),
            Self::SharedProfile(name) => write!(f, "{SHARED_PROFILE_PREFIX}{name}"),
        }
    }
}

/// Resolved, validated settings for the queue a session browses.
/// Never changes while a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub profile_name: String,
    pub queue_url: String,
    pub queue_name: String,
    pub aws_config_source: ConfigSource,
    pub format: MessageFormat,
    pub subset_key: Option<String>,
    pub context_key: Option<String>,
}

impl QueueConfig {
    pub fn new(queue_url: impl Into<String>, format: MessageFormat) -> Self {
        let queue_url = queue_url.into();
        let queue_name = queue_name_from_url(&queue_url);
        Self {
            profile_name: queue_name.clone(),
            queue_url,
            queue_name,
            aws_config_source: ConfigSource::Env,
            format,
            subset_key: None,
            context_key: None,
        }
    }

    pub fn with_subset_key(mut self, key: impl Into<String>) -> Self {
        self.subset_key = Some(key.into());
        self
    }

    pub fn with_context_key(mut self, key: impl Into<String>) -> Self {
        self.context_key = Some(key.into());
        self
    }

    pub fn describe(&self) -> String {
        let mut out = format!(
            "- name                    {}\n- queue URL               {}\n- AWS config source       {}\n- format                  {}\n",
            self.profile_name,
            self.queue_url,
            self.aws_config_source,
            self.format.label()
        );
        if self.format == MessageFormat::Json {
            out.push_str(&format!(
                "- context key             {}\n- subset key              {}\n",
                self.context_key.as_deref().unwrap_or("<not provided>"),
                self.subset_key.as_deref().unwrap_or("<not provided>"),
            ));
        }
        out
    }
}

/// Toggles that change what happens to fetched messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Behaviours {
    pub delete_after_read: bool,
    pub persist_to_disk: bool,
    pub skip_population: bool,
    pub poll_message_count: bool,
    pub filter_active: bool,
}

impl Default for Behaviours {
    fn default() -> Self {
        Self {
            delete_after_read: false,
            persist_to_disk: false,
            skip_population: false,
            poll_message_count: true,
            filter_active: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub count_poll_interval: Duration,
    pub hide_help_after: Duration,
    pub receive_wait_secs: i32,
    pub visibility_timeout_secs: i32,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            count_poll_interval: Duration::from_secs(3),
            hide_help_after: Duration::from_secs(60),
            receive_wait_secs: 0,
            visibility_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub persist_dir: Option<String>,
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub queue_url: String,
    #[serde(default)]
    pub aws_config_source: String,
    #[serde(default)]
    pub format: String,
    pub context_key: Option<String>,
    pub subset_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileProblem {
    #[error("profile name is empty")]
    EmptyName,
    #[error("encoding format {0:?} is incorrect; possible values: [json, none]")]
    UnknownFormat(String),
    #[error("queue URL {0:?} is incorrect: needs to be a proper https URL")]
    QueueUrl(String),
    #[error("config source is empty")]
    ConfigSourceEmpty,
    #[error(
        "incorrect config source {0:?}; possible values: \"env\", \"profile:<aws-shared-config-profile-name>\""
    )]
    ConfigSourceUnknown(String),
    #[error("context key can only be used when message format is JSON")]
    ContextKeyRequiresJson,
    #[error("subset key can only be used when message format is JSON")]
    SubsetKeyRequiresJson,
    #[error("context key is empty")]
    ContextKeyEmpty,
    #[error("subset key is empty")]
    SubsetKeyEmpty,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("couldn't parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no profiles defined")]
    NoProfiles,
    #[error("profile {name:?} not found; available profiles: [{}]", .available.join(", "))]
    ProfileNotFound { name: String, available: Vec<String> },
    #[error("profile config at index {index} ({name:?}) is invalid:\n{}", render_problems(.problems))]
    InvalidProfile {
        index: usize,
        name: String,
        problems: Vec<ProfileProblem>,
    },
}

fn render_problems(problems: &[ProfileProblem]) -> String {
    problems
        .iter()
        .map(|problem| format!("  - {problem}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn persist_root(&self) -> PathBuf {
        match self.persist_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => expand_tilde(dir),
            _ => PathBuf::from(DEFAULT_PERSIST_DIR),
        }
    }

    pub fn profile(&self, name: &str) -> Result<QueueConfig, ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }

        let Some((index, profile)) = self
            .profiles
            .iter()
            .enumerate()
            .find(|(_, p)| p.name.trim() == name)
        else {
            return Err(ConfigError::ProfileNotFound {
                name: name.to_string(),
                available: self.profiles.iter().map(|p| p.name.clone()).collect(),
            });
        };

        profile
            .resolve()
            .map_err(|problems| ConfigError::InvalidProfile {
                index,
                name: profile.name.clone(),
                problems,
            })
    }

    /// Every problem in the file; empty when all profiles are usable.
    pub fn validate(&self) -> Vec<ConfigError> {
        if self.profiles.is_empty() {
            return vec![ConfigError::NoProfiles];
        }

        self.profiles
            .iter()
            .enumerate()
            .filter_map(|(index, profile)| {
                profile
                    .resolve()
                    .err()
                    .map(|problems| ConfigError::InvalidProfile {
                        index,
                        name: profile.name.clone(),
                        problems,
                    })
            })
            .collect()
    }
}

impl ProfileConfig {
    /// Validates the whole profile, collecting every problem rather than
    /// stopping at the first.
    pub fn resolve(&self) -> Result<QueueConfig, Vec<ProfileProblem>> {
        let mut problems = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            problems.push(ProfileProblem::EmptyName);
        }

        let format = MessageFormat::parse(self.format.trim());
        if format.is_none() {
            problems.push(ProfileProblem::UnknownFormat(self.format.clone()));
        }
        let is_json = format.is_none_or(|f| f == MessageFormat::Json);

        if !self.queue_url.starts_with("https://") {
            problems.push(ProfileProblem::QueueUrl(self.queue_url.clone()));
        }

        let source = ConfigSource::parse(&self.aws_config_source);
        if let Err(problem) = &source {
            problems.push(problem.clone());
        }

        if let Some(key) = &self.context_key {
            if !is_json {
                problems.push(ProfileProblem::ContextKeyRequiresJson);
            }
            if key.trim().is_empty() {
                problems.push(ProfileProblem::ContextKeyEmpty);
            }
        }
        if let Some(key) = &self.subset_key {
            if !is_json {
                problems.push(ProfileProblem::SubsetKeyRequiresJson);
            }
            if key.trim().is_empty() {
                problems.push(ProfileProblem::SubsetKeyEmpty);
            }
        }

        match (format, source) {
            (Some(format), Ok(aws_config_source)) if problems.is_empty() => Ok(QueueConfig {
                profile_name: name.to_string(),
                queue_url: self.queue_url.clone(),
                queue_name: queue_name_from_url(&self.queue_url),
                aws_config_source,
                format,
                subset_key: self.subset_key.as_deref().map(|k| k.trim().to_string()),
                context_key: self.context_key.as_deref().map(|k| k.trim().to_string()),
            }),
            _ => Err(problems),
        }
    }
}

pub fn queue_name_from_url(queue_url: &str) -> String {
    queue_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = env::var("QUEUE_LENS_CONFIG") {
        let expanded = expand_tilde(path.trim());
        if !expanded.as_os_str().is_empty() {
            return Ok(expanded);
        }
    }

    let config_home = match env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => {
            let home = env::var("HOME").map_err(|_| anyhow::anyhow!("HOME is not set"))?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(config_home.join("queue-lens").join("queue-lens.toml"))
}

pub fn expand_tilde(input: &str) -> PathBuf {
    if input.is_empty() {
        return PathBuf::new();
    }

    if input == "~" {
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home);
        }
    }

    if let Some(rest) = input.strip_prefix("~/") {
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }

    PathBuf::from(input)
}
