use std::sync::{PoisonError, RwLock};

use ahash::{HashSet, HashSetExt};
use anyhow::{Error, Result};
use od_config::capability::{CapabilityConfig, CapabilityRuleConfig};
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::collection::SubjectType;

#[derive(Deserialize, Serialize, EnumIter, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn from_str(str: &str) -> Result<Self> {
        match str {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(Error::msg(format!("Unknown action '{str}'"))),
        }
    }
}

/// Answers whether the current caller may perform an action on a subject.
///
/// Evaluation must be synchronous and side-effect free. Until
/// [`is_ready`](Self::is_ready) returns `true` the caller's rules are still
/// being fetched and nothing may be assumed about them.
pub trait CapabilityEvaluator: Send + Sync {
    fn is_ready(&self) -> bool;

    fn can(&self, action: Action, subject: SubjectType) -> bool;
}

#[derive(Clone, Debug)]
pub struct CapabilityRule {
    subject: SubjectType,
    actions: HashSet<Action>,
}

impl CapabilityRule {
    pub fn new(subject: &SubjectType, actions: &[Action]) -> Self {
        let mut set = HashSet::with_capacity(actions.len());
        set.extend(actions.iter().copied());
        Self {
            subject: *subject,
            actions: set,
        }
    }

    pub fn from_config(config: &CapabilityRuleConfig) -> Result<Self> {
        let subject = SubjectType::from_str(config.subject())?;
        let mut actions = Vec::with_capacity(config.actions().len());
        for action in config.actions() {
            actions.push(Action::from_str(action)?);
        }
        Ok(Self::new(&subject, &actions))
    }

    pub fn subject(&self) -> &SubjectType {
        &self.subject
    }

    pub fn allows(&self, action: &Action, subject: &SubjectType) -> bool {
        (self.subject == SubjectType::All || &self.subject == subject)
            && self.actions.contains(action)
    }
}

/// Rule-set evaluator for one caller. Starts out loading when the rules
/// arrive asynchronously and becomes ready once [`load`](Self::load) runs.
pub struct AbilityRules {
    rules: RwLock<Option<Vec<CapabilityRule>>>,
}

impl AbilityRules {
    pub fn new(rules: Vec<CapabilityRule>) -> Self {
        Self {
            rules: RwLock::new(Some(rules)),
        }
    }

    pub fn loading() -> Self {
        Self {
            rules: RwLock::new(None),
        }
    }

    /// Rules granted to `role`. A role absent from the configuration gets an
    /// empty, ready rule set: it is known and may do nothing.
    pub fn from_config(config: &CapabilityConfig, role: &str) -> Result<Self> {
        let mut rules = Vec::new();
        if let Some(rule_configs) = config.role(role) {
            rules.reserve(rule_configs.len());
            for rule_config in rule_configs {
                rules.push(CapabilityRule::from_config(rule_config)?);
            }
        }
        Ok(Self::new(rules))
    }

    pub fn load(&self, rules: Vec<CapabilityRule>) {
        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = Some(rules);
    }

    /// Puts the evaluator back into the loading window, e.g. while the rules
    /// of a newly signed-in caller are fetched.
    pub fn unload(&self) {
        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl CapabilityEvaluator for AbilityRules {
    fn is_ready(&self) -> bool {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn can(&self, action: Action, subject: SubjectType) -> bool {
        match &*self.rules.read().unwrap_or_else(PoisonError::into_inner) {
            Some(rules) => rules.iter().any(|rule| rule.allows(&action, &subject)),
            None => false,
        }
    }
}
