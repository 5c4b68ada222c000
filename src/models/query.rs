use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// limit/offset 分页
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// 1-based page number, as the list screens request it.
    pub fn numbered(page: u32, page_size: u32) -> Self {
        let page = page.max(1);
        Self {
            limit: page_size,
            offset: (page - 1).saturating_mul(page_size),
        }
    }

    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Case folding shared by every text predicate. The SQLite store registers
/// the same function as `fold()`, so both stores agree on non-ASCII text.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Substring match after folding both sides.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    fold_case(haystack).contains(&fold_case(needle))
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}
