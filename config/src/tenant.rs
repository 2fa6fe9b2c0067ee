use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct TenantConfig {
    #[serde(default = "default_internal_segment")]
    internal_segment: String,
    #[serde(default = "default_strict")]
    strict: bool,
    #[serde(default = "default_organization_field")]
    organization_field: String,
    #[serde(default = "default_creator_field")]
    creator_field: String,
}

impl TenantConfig {
    pub fn internal_segment(&self) -> &str {
        &self.internal_segment
    }

    /// When set, an external caller without an organization is refused on
    /// organization-scoped collections instead of getting an unscoped read.
    pub fn strict(&self) -> &bool {
        &self.strict
    }

    pub fn organization_field(&self) -> &str {
        &self.organization_field
    }

    pub fn creator_field(&self) -> &str {
        &self.creator_field
    }

    pub fn set_strict(&mut self, strict: &bool) {
        self.strict = *strict;
    }
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            internal_segment: default_internal_segment(),
            strict: default_strict(),
            organization_field: default_organization_field(),
            creator_field: default_creator_field(),
        }
    }
}

fn default_internal_segment() -> String {
    "internal".to_owned()
}

fn default_strict() -> bool {
    true
}

fn default_organization_field() -> String {
    "organization_id".to_owned()
}

fn default_creator_field() -> String {
    "created_by".to_owned()
}
