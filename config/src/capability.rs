use ahash::HashMap;
use serde::Deserialize;

#[derive(Deserialize, Default)]
pub struct CapabilityConfig {
    #[serde(default)]
    roles: HashMap<String, Vec<CapabilityRuleConfig>>,
}

impl CapabilityConfig {
    pub fn roles(&self) -> &HashMap<String, Vec<CapabilityRuleConfig>> {
        &self.roles
    }

    pub fn role(&self, role: &str) -> Option<&Vec<CapabilityRuleConfig>> {
        self.roles.get(role)
    }
}

#[derive(Deserialize, Clone)]
pub struct CapabilityRuleConfig {
    subject: String,
    actions: Vec<String>,
}

impl CapabilityRuleConfig {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn actions(&self) -> &Vec<String> {
        &self.actions
    }
}
