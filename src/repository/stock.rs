use crate::error::StoreResult;
use crate::models::stock::{normalize_symbol, RemoteStock, StockQuery, StockQuote};
use crate::repository::refresh::{CacheAside, Keyed, LocalStore, Refresh, RemoteRecord, RemoteSource};

impl Keyed for StockQuote {
    fn key(&self) -> &str {
        &self.symbol
    }
}

impl RemoteRecord for RemoteStock {
    type Cached = StockQuote;

    fn key(&self) -> &str {
        &self.symbol
    }

    fn merge(self, existing: Option<&StockQuote>) -> StockQuote {
        self.into_stock_quote(existing)
    }
}

/// 股票仓库：关注状态只在本地维护
pub struct StockRepository<R, S> {
    policy: CacheAside<R, S>,
}

impl<R, S> StockRepository<R, S>
where
    R: RemoteSource<StockQuery, Record = RemoteStock>,
    S: LocalStore<StockQuery, Record = StockQuote>,
{
    pub fn new(remote: R, store: S) -> Self {
        Self {
            policy: CacheAside::new(remote, store),
        }
    }

    pub async fn all(&self) -> StoreResult<Vec<StockQuote>> {
        self.policy.load(&StockQuery::All).await
    }

    pub async fn by_symbol(&self, symbol: &str) -> StoreResult<Option<StockQuote>> {
        let query = StockQuery::Symbol(normalize_symbol(symbol));
        Ok(self.policy.load(&query).await?.into_iter().next())
    }

    pub async fn search(&self, text: &str) -> StoreResult<Vec<StockQuote>> {
        let text = text.trim().to_string();
        self.policy.load(&StockQuery::Search(text)).await
    }

    pub fn followed(&self) -> StoreResult<Vec<StockQuote>> {
        self.policy.store().query(&StockQuery::Followed)
    }

    /// Returns `false` when the symbol is not cached; no record is created.
    pub fn set_followed(&self, symbol: &str, follow: bool) -> StoreResult<bool> {
        let symbol = normalize_symbol(symbol);
        let updated = self.policy.store().set_flag(&symbol, follow)?;
        if !updated {
            log::info!("follow ignored, {} is not cached", symbol);
        }
        Ok(updated)
    }

    pub fn is_followed(&self, symbol: &str) -> StoreResult<bool> {
        let stock = self.policy.store().find(&normalize_symbol(symbol))?;
        Ok(stock.map(|s| s.followed).unwrap_or(false))
    }

    /// Re-quote every cached symbol. Returns how many were refreshed; 0 when
    /// nothing is cached or the remote is unreachable.
    pub async fn refresh_prices(&self) -> StoreResult<usize> {
        let symbols: Vec<String> = self
            .policy
            .store()
            .query(&StockQuery::All)?
            .into_iter()
            .map(|s| s.symbol)
            .collect();
        if symbols.is_empty() {
            return Ok(0);
        }

        match self.policy.refresh(&StockQuery::Quotes(symbols)).await? {
            Refresh::Fresh(count) => {
                log::info!("refreshed {} stock prices", count);
                Ok(count)
            }
            Refresh::Stale(_) => Ok(0),
        }
    }
}
