//! Lifecycle configuration and the status/transition predicates.
//!
//! A lifecycle is a named set of legal statuses, split into the ordered
//! categories `initial`, `active` and `inactive`, plus a directed transition
//! table. Creation is modelled as a transition out of [`FromStatus::None`].
//! All comparisons are exact string matches.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LifecycleError};
use crate::right::Right;

/// The origin of a status transition.
///
/// `None` stands for "the record does not exist yet" and is only ever used
/// as the origin of the creation transition. It is distinct from every
/// status string, including the empty string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FromStatus {
    None,
    Status(String),
}

impl FromStatus {
    pub fn as_status(&self) -> Option<&str> {
        match self {
            FromStatus::None => None,
            FromStatus::Status(s) => Some(s.as_str()),
        }
    }
}

impl From<&str> for FromStatus {
    fn from(s: &str) -> Self {
        FromStatus::Status(s.to_string())
    }
}

impl From<String> for FromStatus {
    fn from(s: String) -> Self {
        FromStatus::Status(s)
    }
}

impl fmt::Display for FromStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FromStatus::None => write!(f, "(none)"),
            FromStatus::Status(s) => write!(f, "{}", s),
        }
    }
}

/// Which bucket of the lifecycle a status belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    Initial,
    Active,
    Inactive,
}

/// One side of a transition-right pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusPattern {
    /// `*`: any existing status. Never matches the creation origin.
    Any,
    /// The creation origin, spelled `""` in configuration.
    Creation,
    Exact(String),
}

impl fmt::Display for StatusPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusPattern::Any => write!(f, "*"),
            StatusPattern::Creation => Ok(()),
            StatusPattern::Exact(s) => write!(f, "{}", s),
        }
    }
}

impl StatusPattern {
    fn parse(s: &str) -> Self {
        match s.trim() {
            "*" => StatusPattern::Any,
            "" => StatusPattern::Creation,
            other => StatusPattern::Exact(other.to_string()),
        }
    }

    fn matches_from(&self, from: &FromStatus) -> bool {
        match (self, from) {
            (StatusPattern::Any, FromStatus::Status(_)) => true,
            (StatusPattern::Creation, FromStatus::None) => true,
            (StatusPattern::Exact(p), FromStatus::Status(s)) => p == s,
            _ => false,
        }
    }

    fn matches_to(&self, to: &str) -> bool {
        match self {
            StatusPattern::Any => true,
            StatusPattern::Creation => false,
            StatusPattern::Exact(p) => p == to,
        }
    }

    /// Exact patterns outrank wildcards.
    fn specificity(&self) -> u8 {
        match self {
            StatusPattern::Any => 0,
            StatusPattern::Creation | StatusPattern::Exact(_) => 1,
        }
    }
}

/// A `"from -> to" = "Right"` entry from the lifecycle's rights table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TransitionRight {
    from: StatusPattern,
    to: StatusPattern,
    right: Right,
}

/// A validated lifecycle. Construct through [`Lifecycle::builder`] or
/// from configuration; both paths reject malformed tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    name: String,
    initial: Vec<String>,
    active: Vec<String>,
    inactive: Vec<String>,
    transitions: BTreeMap<FromStatus, BTreeSet<String>>,
    default_on_create: String,
    deleted: Option<String>,
    rights: Vec<TransitionRight>,
}

impl Lifecycle {
    pub fn builder(name: impl Into<String>) -> LifecycleBuilder {
        LifecycleBuilder {
            name: name.into(),
            ..LifecycleBuilder::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All legal statuses: initial, then active, then inactive.
    pub fn statuses(&self) -> impl Iterator<Item = &str> {
        self.initial
            .iter()
            .chain(&self.active)
            .chain(&self.inactive)
            .map(String::as_str)
    }

    pub fn statuses_in(&self, category: StatusCategory) -> &[String] {
        match category {
            StatusCategory::Initial => &self.initial,
            StatusCategory::Active => &self.active,
            StatusCategory::Inactive => &self.inactive,
        }
    }

    pub fn category(&self, status: &str) -> Option<StatusCategory> {
        if self.initial.iter().any(|s| s == status) {
            Some(StatusCategory::Initial)
        } else if self.active.iter().any(|s| s == status) {
            Some(StatusCategory::Active)
        } else if self.inactive.iter().any(|s| s == status) {
            Some(StatusCategory::Inactive)
        } else {
            None
        }
    }

    pub fn is_inactive(&self, status: &str) -> bool {
        self.category(status) == Some(StatusCategory::Inactive)
    }

    /// True iff `status` is a member of the legal status set.
    pub fn is_valid_status(&self, status: &str) -> bool {
        self.category(status).is_some()
    }

    /// True iff the edge `from -> to` exists in the transition table.
    pub fn is_valid_transition(&self, from: &FromStatus, to: &str) -> bool {
        self.transitions
            .get(from)
            .is_some_and(|targets| targets.contains(to))
    }

    pub fn default_status_on_create(&self) -> &str {
        &self.default_on_create
    }

    /// The designated terminal status used for deletion, if any.
    pub fn deleted_status(&self) -> Option<&str> {
        self.deleted.as_deref()
    }

    /// Statuses reachable in one step from `from`, in lexical order.
    pub fn transitions_from(&self, from: &FromStatus) -> impl Iterator<Item = &str> {
        self.transitions
            .get(from)
            .into_iter()
            .flat_map(|targets| targets.iter().map(String::as_str))
    }

    /// The full transition table, creation origin first.
    pub fn transition_table(&self) -> &BTreeMap<FromStatus, BTreeSet<String>> {
        &self.transitions
    }

    /// The right needed to move `from -> to`, if the rights table names one.
    ///
    /// The most specific entry wins: an exact origin beats `*`, and on a tie
    /// an exact destination beats `*`.
    pub fn required_right(&self, from: &FromStatus, to: &str) -> Option<Right> {
        self.rights
            .iter()
            .filter(|r| r.from.matches_from(from) && r.to.matches_to(to))
            .max_by_key(|r| (r.from.specificity(), r.to.specificity()))
            .map(|r| r.right)
    }

    /// The rights table as `(from, to, right)` in configuration spelling.
    pub fn rights(&self) -> impl Iterator<Item = (String, String, Right)> + '_ {
        self.rights
            .iter()
            .map(|r| (r.from.to_string(), r.to.to_string(), r.right))
    }

    /// Resolve the status a new record gets and check it may be created with it.
    pub fn check_create(&self, requested: Option<&str>) -> Result<String, LifecycleError> {
        let status = requested.unwrap_or(&self.default_on_create);
        if !self.is_valid_status(status) {
            return Err(LifecycleError::InvalidStatus {
                lifecycle: self.name.clone(),
                status: status.to_string(),
            });
        }
        if !self.is_valid_transition(&FromStatus::None, status) {
            return Err(LifecycleError::IllegalTransition {
                lifecycle: self.name.clone(),
                from: FromStatus::None,
                to: status.to_string(),
            });
        }
        Ok(status.to_string())
    }

    /// Check that an existing record may move from `from` to `to`.
    pub fn check_change(&self, from: &str, to: &str) -> Result<(), LifecycleError> {
        if !self.is_valid_status(to) {
            return Err(LifecycleError::InvalidStatus {
                lifecycle: self.name.clone(),
                status: to.to_string(),
            });
        }
        let origin = FromStatus::from(from);
        if !self.is_valid_transition(&origin, to) {
            return Err(LifecycleError::IllegalTransition {
                lifecycle: self.name.clone(),
                from: origin,
                to: to.to_string(),
            });
        }
        Ok(())
    }
}

/// Incremental construction of a [`Lifecycle`]. `build` validates.
#[derive(Debug, Clone, Default)]
pub struct LifecycleBuilder {
    name: String,
    initial: Vec<String>,
    active: Vec<String>,
    inactive: Vec<String>,
    transitions: Vec<(FromStatus, String)>,
    default_on_create: Option<String>,
    deleted: Option<String>,
    rights: Vec<(String, String)>,
}

impl LifecycleBuilder {
    pub fn initial<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initial.extend(statuses.into_iter().map(Into::into));
        self
    }

    pub fn active<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active.extend(statuses.into_iter().map(Into::into));
        self
    }

    pub fn inactive<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inactive.extend(statuses.into_iter().map(Into::into));
        self
    }

    pub fn transition(mut self, from: impl Into<FromStatus>, to: impl Into<String>) -> Self {
        self.transitions.push((from.into(), to.into()));
        self
    }

    pub fn default_on_create(mut self, status: impl Into<String>) -> Self {
        self.default_on_create = Some(status.into());
        self
    }

    pub fn deleted(mut self, status: impl Into<String>) -> Self {
        self.deleted = Some(status.into());
        self
    }

    /// Add a rights-table entry such as `("deleted -> *", "CreateAsset")`.
    pub fn right(mut self, pattern: impl Into<String>, right: impl Into<String>) -> Self {
        self.rights.push((pattern.into(), right.into()));
        self
    }

    pub fn build(self) -> Result<Lifecycle, ConfigError> {
        let name = self.name;
        let err = |message: String| ConfigError::Lifecycle {
            lifecycle: name.clone(),
            message,
        };

        let mut seen = BTreeSet::new();
        for status in self.initial.iter().chain(&self.active).chain(&self.inactive) {
            if status.is_empty() {
                return Err(err("the empty string cannot be a status".to_string()));
            }
            if !seen.insert(status.as_str()) {
                return Err(err(format!("status '{}' is declared more than once", status)));
            }
        }
        if seen.is_empty() {
            return Err(err("no statuses declared".to_string()));
        }
        let declared = |s: &str| seen.contains(s);
        let listing = || seen.iter().copied().collect::<Vec<_>>().join(", ");

        let mut transitions: BTreeMap<FromStatus, BTreeSet<String>> = BTreeMap::new();
        for (from, to) in self.transitions {
            if let FromStatus::Status(f) = &from {
                if !declared(f) {
                    return Err(err(format!(
                        "transition origin '{}' is not declared in statuses: [{}]",
                        f,
                        listing()
                    )));
                }
            }
            if !declared(&to) {
                return Err(err(format!(
                    "transition target '{}' is not declared in statuses: [{}]",
                    to,
                    listing()
                )));
            }
            transitions.entry(from).or_default().insert(to);
        }

        let default_on_create = match self.default_on_create {
            Some(d) => d,
            None => self
                .initial
                .first()
                .cloned()
                .ok_or_else(|| err("no on_create default and no initial statuses".to_string()))?,
        };
        if !declared(&default_on_create) {
            return Err(err(format!(
                "default on_create status '{}' is not declared in statuses: [{}]",
                default_on_create,
                listing()
            )));
        }
        if !transitions
            .get(&FromStatus::None)
            .is_some_and(|t| t.contains(&default_on_create))
        {
            return Err(err(format!(
                "default on_create status '{}' is not reachable on creation",
                default_on_create
            )));
        }

        if let Some(deleted) = &self.deleted {
            if !declared(deleted) {
                return Err(err(format!(
                    "deleted status '{}' is not declared in statuses: [{}]",
                    deleted,
                    listing()
                )));
            }
        }

        let mut rights = Vec::with_capacity(self.rights.len());
        for (pattern, right) in self.rights {
            let (from, to) = pattern.split_once("->").ok_or_else(|| {
                err(format!(
                    "rights pattern '{}' must have the form 'from -> to'",
                    pattern
                ))
            })?;
            let from = StatusPattern::parse(from);
            let to = StatusPattern::parse(to);
            for side in [&from, &to] {
                if let StatusPattern::Exact(s) = side {
                    if !declared(s) {
                        return Err(err(format!(
                            "rights pattern '{}' names undeclared status '{}'",
                            pattern, s
                        )));
                    }
                }
            }
            if to == StatusPattern::Creation {
                return Err(err(format!(
                    "rights pattern '{}' has an empty destination",
                    pattern
                )));
            }
            let right = right
                .parse::<Right>()
                .map_err(|_| err(format!("unknown right '{}' in rights table", right)))?;
            rights.push(TransitionRight { from, to, right });
        }

        Ok(Lifecycle {
            name,
            initial: self.initial,
            active: self.active,
            inactive: self.inactive,
            transitions,
            default_on_create,
            deleted: self.deleted,
            rights,
        })
    }
}
