//! Configuration loading for the dispatcher

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use agentnn_core::{IdentityGapPolicy, PermissionTable, Role, StaticRoleResolver};
use agentnn_rl::LearningParams;
use anyhow::{bail, Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

/// Configuration for the dispatcher
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub learning: LearningConfig,
    pub policy: PolicyConfig,
    pub access: AccessConfig,
    pub log: LogConfig,
}

/// Which selector the dispatcher drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Single,
    Team,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub mode: SelectionMode,
    pub team_size: usize,
    pub learning_rate: f64,
    pub discount: f64,
    pub epsilon: f64,
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
    /// Fixed exploration seed; entropy-seeded when unset
    pub seed: Option<u64>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        let params = LearningParams::default();
        Self {
            mode: SelectionMode::Single,
            team_size: 2,
            learning_rate: params.learning_rate,
            discount: params.discount,
            epsilon: params.epsilon,
            epsilon_decay: params.epsilon_decay,
            min_epsilon: params.min_epsilon,
            seed: None,
        }
    }
}

impl LearningConfig {
    pub fn params(&self) -> LearningParams {
        LearningParams::new(self.learning_rate, self.discount, self.epsilon)
            .with_epsilon_decay(self.epsilon_decay, self.min_epsilon)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Where the learned table is persisted; in-memory only when unset
    pub path: Option<PathBuf>,
    /// Save after every N learn calls; 0 disables autosave
    pub save_interval: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub identity_gap: IdentityGapPolicy,
    /// Action an actor needs on an agent to dispatch work to it
    pub dispatch_action: String,
    /// actor id -> role names the actor may assume
    pub grants: HashMap<String, Vec<String>>,
    /// role name -> role names it expands to
    pub aliases: HashMap<String, Vec<String>>,
    /// role name -> actions added to the built-in table
    pub extra_actions: HashMap<String, Vec<String>>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            identity_gap: IdentityGapPolicy::Unrestricted,
            dispatch_action: agentnn_core::actions::SUBMIT_TASK.to_string(),
            grants: HashMap::new(),
            aliases: HashMap::new(),
            extra_actions: HashMap::new(),
        }
    }
}

impl AccessConfig {
    pub fn resolver(&self) -> StaticRoleResolver {
        StaticRoleResolver::from_maps(&self.grants, &self.aliases)
    }

    pub fn permissions(&self) -> Result<PermissionTable> {
        let mut table = PermissionTable::builtin();
        for (role, actions) in &self.extra_actions {
            let role = Role::parse(role)
                .with_context(|| format!("Unknown role in access.extra_actions: {role}"))?;
            table.extend(role, actions.iter().cloned());
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file();

        if let Some(path) = &config_path {
            tracing::info!("Loading config from: {:?}", path);
        } else {
            tracing::info!("No config file found, using defaults");
        }

        Self::load_from(config_path.as_deref())
    }

    /// Load configuration from an explicit file (if any) and environment
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        // Environment variables: AGENTNN__LEARNING__EPSILON=0.2
        builder = builder.add_source(
            Environment::with_prefix("AGENTNN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder
            .build()?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the selectors would refuse at construction time
    pub fn validate(&self) -> Result<()> {
        self.learning
            .params()
            .validate()
            .context("Invalid [learning] configuration")?;

        if self.learning.mode == SelectionMode::Team && self.learning.team_size == 0 {
            bail!("learning.team_size must be at least 1 in team mode");
        }
        if self.access.dispatch_action.trim().is_empty() {
            bail!("access.dispatch_action must not be empty");
        }
        self.access.permissions()?;
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Find the configuration file
    fn find_config_file() -> Option<PathBuf> {
        // Check in order: AGENTNN_CONFIG env, ./agentnn.toml, ~/.config/agentnn/agentnn.toml
        if let Ok(path) = std::env::var("AGENTNN_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("agentnn.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("agentnn").join("agentnn.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }
}
