use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_id_field")]
    id_field: String,
    #[serde(default = "default_created_at_field")]
    created_at_field: String,
    #[serde(default = "default_updated_at_field")]
    updated_at_field: String,
    #[serde(default)]
    search_mode: SearchMode,
    #[serde(default = "default_exact_total")]
    exact_total: bool,
    #[serde(default = "default_page_size")]
    default_page_size: u32,
}

impl QueryConfig {
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn created_at_field(&self) -> &str {
        &self.created_at_field
    }

    pub fn updated_at_field(&self) -> &str {
        &self.updated_at_field
    }

    pub fn search_mode(&self) -> &SearchMode {
        &self.search_mode
    }

    /// Whether `total` comes from a separate count query instead of the
    /// length of the returned page.
    pub fn exact_total(&self) -> &bool {
        &self.exact_total
    }

    pub fn default_page_size(&self) -> &u32 {
        &self.default_page_size
    }

    pub fn set_search_mode(&mut self, search_mode: &SearchMode) {
        self.search_mode = *search_mode;
    }

    pub fn set_exact_total(&mut self, exact_total: &bool) {
        self.exact_total = *exact_total;
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            id_field: default_id_field(),
            created_at_field: default_created_at_field(),
            updated_at_field: default_updated_at_field(),
            search_mode: SearchMode::default(),
            exact_total: default_exact_total(),
            default_page_size: default_page_size(),
        }
    }
}

#[derive(Deserialize, Clone, Copy, PartialEq, Debug, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    FirstField,
    AnyField,
}

fn default_id_field() -> String {
    "id".to_owned()
}

fn default_created_at_field() -> String {
    "created_at".to_owned()
}

fn default_updated_at_field() -> String {
    "updated_at".to_owned()
}

fn default_exact_total() -> bool {
    true
}

fn default_page_size() -> u32 {
    20
}
