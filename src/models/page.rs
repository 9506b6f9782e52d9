use serde::{Deserialize, Serialize};

fn default_size() -> i64 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_size(),
        }
    }
}

impl PageParams {
    pub fn limit(&self) -> i64 {
        self.size.clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        self.page.max(0) * self.limit()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, params: &PageParams, total: i64) -> Self {
        Self {
            items,
            page: params.page.max(0),
            size: params.limit(),
            total,
        }
    }
}
