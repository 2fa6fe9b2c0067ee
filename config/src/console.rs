use serde::Deserialize;

/// The caller the console runner acts on behalf of.
#[derive(Deserialize)]
pub struct ConsoleConfig {
    organization_id: Option<String>,
    user_id: Option<String>,
    segment: String,
    role: String,
}

impl ConsoleConfig {
    pub fn organization_id(&self) -> &Option<String> {
        &self.organization_id
    }

    pub fn user_id(&self) -> &Option<String> {
        &self.user_id
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}
