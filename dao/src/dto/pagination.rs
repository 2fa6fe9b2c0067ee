use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Page request as sent by list screens: `{page, pageSize, sortBy?, sortOrder?}`.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    page: u64,
    page_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_order: Option<SortOrder>,
}

impl Pagination {
    pub fn new(
        page: &u64,
        page_size: &u64,
        sort_by: &Option<String>,
        sort_order: &Option<SortOrder>,
    ) -> Self {
        Self {
            page: *page,
            page_size: *page_size,
            sort_by: sort_by.clone(),
            sort_order: *sort_order,
        }
    }

    pub fn page(&self) -> &u64 {
        &self.page
    }

    pub fn page_size(&self) -> &u64 {
        &self.page_size
    }

    pub fn sort_by(&self) -> &Option<String> {
        &self.sort_by
    }

    pub fn sort_order(&self) -> &Option<SortOrder> {
        &self.sort_order
    }

    /// Zero-based inclusive row window of the requested page.
    pub fn range(&self, default_page_size: &u64) -> (u64, u64) {
        let page = self.page.max(1);
        let size = match self.page_size {
            0 => (*default_page_size).max(1),
            size => size,
        };
        let from = (page - 1).saturating_mul(size);
        (from, from.saturating_add(size - 1))
    }

    /// Sort field and direction, falling back to `default_field` and
    /// descending order.
    pub fn sort<'a>(&'a self, default_field: &'a str) -> (&'a str, bool) {
        let field = self.sort_by.as_deref().unwrap_or(default_field);
        (field, self.sort_order == Some(SortOrder::Asc))
    }
}
