//! Cache-aside refresh policy.
//!
//! Every read goes through the local store. Before reading, the policy asks
//! the remote source for fresh records and upserts them, carrying the
//! locally-owned fields (bookmark / follow flags) forward from whatever the
//! store already holds. A failed fetch is logged and otherwise ignored; a
//! failed store operation is returned to the caller.

use async_trait::async_trait;

use crate::error::{RemoteError, StoreResult};

/// A cached record addressed by a string primary key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// A record as the remote source delivers it, before local state is merged in.
pub trait RemoteRecord: Send {
    type Cached;

    fn key(&self) -> &str;

    /// Build the record to upsert. `existing` is the cached record with the
    /// same key, if any.
    fn merge(self, existing: Option<&Self::Cached>) -> Self::Cached;
}

#[async_trait]
pub trait RemoteSource<Q: Sync>: Send + Sync {
    type Record: RemoteRecord;

    async fn fetch(&self, query: &Q) -> Result<Vec<Self::Record>, RemoteError>;
}

/// Merge-upsert by key, lookup by key and query by descriptor over cached records.
pub trait LocalStore<Q>: Send + Sync {
    type Record: Keyed + Clone + Send;

    fn find(&self, key: &str) -> StoreResult<Option<Self::Record>>;

    /// Merge each incoming record with the cached record under its key and
    /// insert-or-replace the result. Lookup and write happen under one lock,
    /// so a concurrent `set_flag` is never overwritten by a stale flag.
    /// Returns how many records were written.
    fn merge_upsert<I>(&self, incoming: Vec<I>) -> StoreResult<usize>
    where
        I: RemoteRecord<Cached = Self::Record>;

    fn query(&self, query: &Q) -> StoreResult<Vec<Self::Record>>;

    /// Set the single locally-owned flag of one record. Returns `false`
    /// (and writes nothing) when no record has that key.
    fn set_flag(&self, key: &str, value: bool) -> StoreResult<bool>;
}

impl<Q, T> LocalStore<Q> for std::sync::Arc<T>
where
    T: LocalStore<Q> + ?Sized,
{
    type Record = <T as LocalStore<Q>>::Record;

    fn find(&self, key: &str) -> StoreResult<Option<Self::Record>> {
        <T as LocalStore<Q>>::find(self, key)
    }

    fn merge_upsert<I>(&self, incoming: Vec<I>) -> StoreResult<usize>
    where
        I: RemoteRecord<Cached = Self::Record>,
    {
        <T as LocalStore<Q>>::merge_upsert(self, incoming)
    }

    fn query(&self, query: &Q) -> StoreResult<Vec<Self::Record>> {
        <T as LocalStore<Q>>::query(self, query)
    }

    fn set_flag(&self, key: &str, value: bool) -> StoreResult<bool> {
        <T as LocalStore<Q>>::set_flag(self, key, value)
    }
}

/// Outcome of the refresh leg. Never surfaced by `load`.
#[derive(Debug)]
pub enum Refresh {
    Fresh(usize),
    Stale(RemoteError),
}

impl Refresh {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Refresh::Fresh(_))
    }
}

pub struct CacheAside<R, S> {
    remote: R,
    store: S,
}

impl<R, S> CacheAside<R, S> {
    pub fn new(remote: R, store: S) -> Self {
        Self { remote, store }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<R, S> CacheAside<R, S> {
    /// Fetch from the remote and upsert the merged records.
    ///
    /// Remote failures become `Refresh::Stale`; store failures are errors.
    /// Nothing is written before the remote call has resolved.
    pub async fn refresh<Q>(&self, query: &Q) -> StoreResult<Refresh>
    where
        Q: Sync + std::fmt::Debug,
        R: RemoteSource<Q>,
        S: LocalStore<Q>,
        <R as RemoteSource<Q>>::Record: RemoteRecord<Cached = <S as LocalStore<Q>>::Record>,
    {
        let fetched = match self.remote.fetch(query).await {
            Ok(records) => records,
            Err(e) => {
                if e.is_timeout() {
                    log::warn!("remote timed out for {:?}, serving cache", query);
                } else {
                    log::warn!("remote refresh failed for {:?}, serving cache: {}", query, e);
                }
                return Ok(Refresh::Stale(e));
            }
        };

        let written = if fetched.is_empty() {
            0
        } else {
            self.store.merge_upsert(fetched)?
        };
        log::debug!("refreshed {} records for {:?}", written, query);
        Ok(Refresh::Fresh(written))
    }

    /// Refresh, then always answer from the store.
    pub async fn load<Q>(&self, query: &Q) -> StoreResult<Vec<<S as LocalStore<Q>>::Record>>
    where
        Q: Sync + std::fmt::Debug,
        R: RemoteSource<Q>,
        S: LocalStore<Q>,
        <R as RemoteSource<Q>>::Record: RemoteRecord<Cached = <S as LocalStore<Q>>::Record>,
    {
        self.refresh(query).await?;
        self.store.query(query)
    }
}
