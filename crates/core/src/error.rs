use crate::lifecycle::FromStatus;

/// A lifecycle gate rejection.
///
/// Both variants are user-correctable input conditions. The `Display`
/// output is the message surfaced verbatim to end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The requested status is not a member of the lifecycle's status set.
    #[error("Status '{status}' isn't a valid status for this record type.")]
    InvalidStatus { lifecycle: String, status: String },

    /// The status is legal in isolation but unreachable from the current one.
    #[error("{}", illegal_transition_message(.from, .to))]
    IllegalTransition {
        lifecycle: String,
        from: FromStatus,
        to: String,
    },
}

fn illegal_transition_message(from: &FromStatus, to: &str) -> String {
    match from {
        FromStatus::None => format!("New records cannot have status '{}'.", to),
        FromStatus::Status(from) => format!("Can't change status from '{}' to '{}'.", from, to),
    }
}

/// Malformed configuration. Always fatal at load time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("lifecycle '{lifecycle}': {message}")]
    Lifecycle { lifecycle: String, message: String },

    #[error("catalog '{catalog}': {message}")]
    Catalog { catalog: String, message: String },

    #[error("custom field '{field}': {message}")]
    CustomField { field: String, message: String },

    #[error("grant for '{principal}': {message}")]
    Grant { principal: String, message: String },
}

/// Validation failures for asset attributes, role members and custom-field values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("Asset name is required")]
    EmptyName,

    #[error("Asset name '{0}' may not be only digits")]
    NumericName(String),

    #[error("No such role '{0}'")]
    UnknownRole(String),

    #[error("Role '{role}' may only contain users, not group '{group}'")]
    GroupInSingleRole { role: String, group: String },

    #[error("'{principal}' is not a member of role '{role}'")]
    NotARoleMember { role: String, principal: String },

    #[error("Custom field '{field}' does not apply to catalog '{catalog}'")]
    FieldNotApplicable { field: String, catalog: String },

    #[error("No such custom field '{0}'")]
    UnknownField(String),

    #[error("Custom field '{field}' accepts at most {max} value(s), got {got}")]
    TooManyValues { field: String, max: usize, got: usize },

    #[error("'{value}' is not a valid value for custom field '{field}'")]
    InvalidFieldValue { field: String, value: String },
}
