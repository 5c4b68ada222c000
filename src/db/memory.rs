use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::StoreResult;
use crate::models::news::{NewsItem, NewsQuery};
use crate::models::stock::{StockQuery, StockQuote};
use crate::repository::refresh::{Keyed, LocalStore, RemoteRecord};

/// In-process cache with the same query semantics as the SQLite store.
pub struct MemoryStore<T> {
    records: Mutex<BTreeMap<String, T>>,
}

impl<T: Keyed + Clone> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn find(&self, key: &str) -> StoreResult<Option<T>> {
        let records = self.records.lock()?;
        Ok(records.get(key).cloned())
    }

    pub fn upsert(&self, batch: &[T]) -> StoreResult<()> {
        let mut records = self.records.lock()?;
        for record in batch {
            records.insert(record.key().to_string(), record.clone());
        }
        Ok(())
    }

    /// Merge against the cached record and insert, all under one lock.
    pub fn merge_upsert<I>(&self, incoming: Vec<I>) -> StoreResult<usize>
    where
        I: RemoteRecord<Cached = T>,
    {
        let mut records = self.records.lock()?;
        let mut written = 0;
        for record in incoming {
            let key = record.key().to_string();
            let merged = record.merge(records.get(&key));
            records.insert(key, merged);
            written += 1;
        }
        Ok(written)
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.records.lock()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn update<F>(&self, key: &str, apply: F) -> StoreResult<bool>
    where
        F: FnOnce(&mut T),
    {
        let mut records = self.records.lock()?;
        match records.get_mut(key) {
            Some(record) => {
                apply(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn filtered<P>(&self, keep: P) -> StoreResult<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        let records = self.records.lock()?;
        Ok(records.values().filter(|r| keep(r)).cloned().collect())
    }
}

impl<T: Keyed + Clone> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore<NewsQuery> for MemoryStore<NewsItem> {
    type Record = NewsItem;

    fn find(&self, key: &str) -> StoreResult<Option<NewsItem>> {
        MemoryStore::find(self, key)
    }

    fn merge_upsert<I>(&self, incoming: Vec<I>) -> StoreResult<usize>
    where
        I: RemoteRecord<Cached = NewsItem>,
    {
        MemoryStore::merge_upsert(self, incoming)
    }

    fn query(&self, query: &NewsQuery) -> StoreResult<Vec<NewsItem>> {
        let mut items = self.filtered(|item| query.matches(item))?;
        // newest first, id breaks ties
        items.sort_by(|a, b| {
            b.publish_date
                .cmp(&a.publish_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(match query.page() {
            Some(page) => page.slice(items),
            None => items,
        })
    }

    fn set_flag(&self, key: &str, value: bool) -> StoreResult<bool> {
        self.update(key, |item| item.bookmarked = value)
    }
}

impl LocalStore<StockQuery> for MemoryStore<StockQuote> {
    type Record = StockQuote;

    fn find(&self, key: &str) -> StoreResult<Option<StockQuote>> {
        MemoryStore::find(self, key)
    }

    fn merge_upsert<I>(&self, incoming: Vec<I>) -> StoreResult<usize>
    where
        I: RemoteRecord<Cached = StockQuote>,
    {
        MemoryStore::merge_upsert(self, incoming)
    }

    fn query(&self, query: &StockQuery) -> StoreResult<Vec<StockQuote>> {
        // BTreeMap iteration is already ordered by symbol
        self.filtered(|stock| query.matches(stock))
    }

    fn set_flag(&self, key: &str, value: bool) -> StoreResult<bool> {
        self.update(key, |stock| stock.followed = value)
    }
}
