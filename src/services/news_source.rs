use async_trait::async_trait;
use std::sync::Arc;

use crate::error::RemoteError;
use crate::models::news::{FeedArticle, NewsQuery};
use crate::models::query::contains_folded;
use crate::repository::refresh::RemoteSource;
use crate::services::alpha_vantage::{AlphaVantageClient, FeedEntry, NewsFilter};

/// NEWS_SENTIMENT as a remote source for news queries.
pub struct NewsSource {
    client: Arc<AlphaVantageClient>,
    feed_limit: u32,
}

impl NewsSource {
    pub fn new(client: Arc<AlphaVantageClient>, feed_limit: u32) -> Self {
        Self { client, feed_limit }
    }
}

#[async_trait]
impl RemoteSource<NewsQuery> for NewsSource {
    type Record = FeedArticle;

    async fn fetch(&self, query: &NewsQuery) -> Result<Vec<FeedArticle>, RemoteError> {
        let (filter, category) = match query {
            NewsQuery::Latest { .. } | NewsQuery::Search { .. } => (NewsFilter::None, None),
            NewsQuery::Category { category, .. } => {
                (NewsFilter::Topics(category.request_topics().to_string()), Some(*category))
            }
            NewsQuery::Symbol { symbol, .. } => (NewsFilter::Tickers(symbol.to_uppercase()), None),
            // bookmarks live only in the cache
            NewsQuery::Bookmarked => return Ok(Vec::new()),
        };

        let resp = self.client.news_sentiment(&filter, self.feed_limit).await?;
        log::debug!("NEWS_SENTIMENT returned {} entries", resp.feed.len());
        if resp.feed.is_empty() {
            log::warn!("NEWS_SENTIMENT returned an empty feed for {:?}", query);
        }

        let articles = resp
            .feed
            .into_iter()
            .filter(|entry| keep_for_query(query, entry))
            .filter_map(|entry| entry.into_article(category))
            .collect();
        Ok(articles)
    }
}

/// The API has no news search; search queries filter the latest feed locally.
fn keep_for_query(query: &NewsQuery, entry: &FeedEntry) -> bool {
    match query {
        NewsQuery::Search { text, .. } => {
            contains_folded(&entry.title, text)
                || entry
                    .summary
                    .as_deref()
                    .map(|s| contains_folded(s, text))
                    .unwrap_or(false)
        }
        _ => true,
    }
}
