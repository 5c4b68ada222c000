use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::error::RemoteError;
use crate::models::stock::{normalize_symbol, RemoteStock, StockQuery};
use crate::repository::refresh::RemoteSource;
use crate::services::alpha_vantage::AlphaVantageClient;

/// Requests in flight when refreshing a list of symbols.
const MAX_CONCURRENT_SYMBOLS: usize = 4;

/// GLOBAL_QUOTE / OVERVIEW / SYMBOL_SEARCH as a remote source for stock queries.
pub struct StockSource {
    client: Arc<AlphaVantageClient>,
    popular_symbols: Vec<String>,
}

impl StockSource {
    pub fn new(client: Arc<AlphaVantageClient>, popular_symbols: Vec<String>) -> Self {
        Self { client, popular_symbols }
    }

    /// Quote plus company name. The overview is best-effort: without it the
    /// cached name is kept.
    async fn fetch_detailed(&self, symbol: &str) -> Result<RemoteStock, RemoteError> {
        let quote = self.client.global_quote(symbol).await?;
        let snapshot = quote.snapshot()?;
        let name = match self.client.company_overview(symbol).await {
            Ok(overview) => Some(overview.name),
            Err(e) => {
                log::debug!("overview for {} unavailable: {}", symbol, e);
                None
            }
        };
        Ok(RemoteStock {
            symbol: normalize_symbol(&quote.symbol),
            name,
            quote: Some(snapshot),
        })
    }

    async fn fetch_quote_only(&self, symbol: &str) -> Result<RemoteStock, RemoteError> {
        let quote = self.client.global_quote(symbol).await?;
        Ok(RemoteStock {
            symbol: normalize_symbol(&quote.symbol),
            name: None,
            quote: Some(quote.snapshot()?),
        })
    }

    /// Fetch many symbols; individual failures are skipped. Fails only when
    /// every symbol failed.
    async fn fetch_many(&self, symbols: &[String], detailed: bool) -> Result<Vec<RemoteStock>, RemoteError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let results: Vec<(String, Result<RemoteStock, RemoteError>)> = stream::iter(symbols.iter().cloned())
            .map(|symbol| async move {
                let result = if detailed {
                    self.fetch_detailed(&symbol).await
                } else {
                    self.fetch_quote_only(&symbol).await
                };
                (symbol, result)
            })
            .buffer_unordered(MAX_CONCURRENT_SYMBOLS)
            .collect()
            .await;

        let mut stocks = Vec::with_capacity(results.len());
        let mut last_err = None;
        for (symbol, result) in results {
            match result {
                Ok(stock) => stocks.push(stock),
                Err(e) => {
                    log::warn!("quote for {} failed: {}", symbol, e);
                    last_err = Some(e);
                }
            }
        }

        match (stocks.is_empty(), last_err) {
            (true, Some(e)) => Err(RemoteError::AllFailed(e.to_string())),
            _ => Ok(stocks),
        }
    }
}

#[async_trait]
impl RemoteSource<StockQuery> for StockSource {
    type Record = RemoteStock;

    async fn fetch(&self, query: &StockQuery) -> Result<Vec<RemoteStock>, RemoteError> {
        match query {
            StockQuery::All => self.fetch_many(&self.popular_symbols, true).await,
            StockQuery::Symbol(symbol) => Ok(vec![self.fetch_detailed(symbol).await?]),
            StockQuery::Quotes(symbols) => self.fetch_many(symbols, false).await,
            StockQuery::Search(text) => {
                let matches = self.client.symbol_search(text).await?;
                Ok(matches
                    .into_iter()
                    .filter(|m| !m.symbol.trim().is_empty())
                    .map(|m| RemoteStock {
                        symbol: normalize_symbol(&m.symbol),
                        name: Some(m.name),
                        quote: None,
                    })
                    .collect())
            }
            StockQuery::Followed => Ok(Vec::new()),
        }
    }
}
