use serde::Deserialize;

#[derive(Deserialize)]
pub struct DbSqliteConfig {
    path: String,
    #[serde(default = "default_max_connections")]
    max_connections: u32,
}

impl DbSqliteConfig {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn max_connections(&self) -> &u32 {
        &self.max_connections
    }

    /// Connection url understood by the SQLite driver. `:memory:` keeps the
    /// whole store inside a single pooled connection.
    pub fn url(&self) -> String {
        match self.path.as_str() {
            ":memory:" => "sqlite::memory:".to_owned(),
            path => format!("sqlite:{path}?mode=rwc"),
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

fn default_max_connections() -> u32 {
    4
}
