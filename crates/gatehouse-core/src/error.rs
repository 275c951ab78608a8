use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatehouseError {
    #[error("policy file not found: {0}")]
    PolicyNotFound(PathBuf),

    #[error("retry.max_retries must be an integer >= 1 (got {0})")]
    InvalidMaxRetries(u32),

    #[error("defaults.default_profile must exist in profiles (got '{0}')")]
    UnknownDefaultProfile(String),

    #[error("profiles.{profile} references missing gate: {gate}")]
    UnknownGate { profile: String, gate: String },

    #[error("profiles.{profile}.extends references unknown profile: {parent}")]
    UnknownParentProfile { profile: String, parent: String },

    #[error("tags_to_profiles.{tag} references unknown profile: {profile}")]
    UnknownTagProfile { tag: String, profile: String },

    #[error("gates.{0}.command is required")]
    EmptyGateCommand(String),

    #[error("profile extends cycle: {}", .0.join(" -> "))]
    ExtendsCycle(Vec<String>),

    #[error("tasks file not found: {0}")]
    TasksNotFound(PathBuf),

    #[error("invalid task id '{0}': must be alphanumeric with '.', '_' or '-'")]
    InvalidTaskId(String),

    #[error("git: {0}")]
    Git(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GatehouseError {
    /// True for errors raised while loading or validating the policy.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            GatehouseError::PolicyNotFound(_)
                | GatehouseError::InvalidMaxRetries(_)
                | GatehouseError::UnknownDefaultProfile(_)
                | GatehouseError::UnknownGate { .. }
                | GatehouseError::UnknownParentProfile { .. }
                | GatehouseError::UnknownTagProfile { .. }
                | GatehouseError::EmptyGateCommand(_)
                | GatehouseError::ExtendsCycle(_)
                | GatehouseError::Yaml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GatehouseError>;
