use crate::error::StoreResult;
use crate::models::news::{FeedArticle, NewsCategory, NewsItem, NewsQuery};
use crate::models::query::Page;
use crate::repository::refresh::{CacheAside, Keyed, LocalStore, RemoteRecord, RemoteSource};

impl Keyed for NewsItem {
    fn key(&self) -> &str {
        &self.id
    }
}

impl RemoteRecord for FeedArticle {
    type Cached = NewsItem;

    fn key(&self) -> &str {
        &self.id
    }

    fn merge(self, existing: Option<&NewsItem>) -> NewsItem {
        let bookmarked = existing.map(|n| n.bookmarked).unwrap_or(false);
        self.into_news_item(bookmarked)
    }
}

/// 新闻仓库：远程刷新后始终从本地缓存读取
pub struct NewsRepository<R, S> {
    policy: CacheAside<R, S>,
}

impl<R, S> NewsRepository<R, S>
where
    R: RemoteSource<NewsQuery, Record = FeedArticle>,
    S: LocalStore<NewsQuery, Record = NewsItem>,
{
    pub fn new(remote: R, store: S) -> Self {
        Self {
            policy: CacheAside::new(remote, store),
        }
    }

    pub async fn latest(&self, page: Page) -> StoreResult<Vec<NewsItem>> {
        self.policy.load(&NewsQuery::Latest { page }).await
    }

    pub async fn by_category(&self, category: NewsCategory, page: Page) -> StoreResult<Vec<NewsItem>> {
        self.policy.load(&NewsQuery::Category { category, page }).await
    }

    pub async fn by_symbol(&self, symbol: &str, page: Page) -> StoreResult<Vec<NewsItem>> {
        let symbol = symbol.trim().to_uppercase();
        self.policy.load(&NewsQuery::Symbol { symbol, page }).await
    }

    pub async fn search(&self, text: &str, page: Page) -> StoreResult<Vec<NewsItem>> {
        let text = text.trim().to_string();
        self.policy.load(&NewsQuery::Search { text, page }).await
    }

    /// Detail lookup, cache only.
    pub fn get(&self, id: &str) -> StoreResult<Option<NewsItem>> {
        self.policy.store().find(id)
    }

    pub fn bookmarked(&self) -> StoreResult<Vec<NewsItem>> {
        self.policy.store().query(&NewsQuery::Bookmarked)
    }

    /// Returns `false` when the id is not cached; no record is created.
    pub fn set_bookmark(&self, id: &str, bookmark: bool) -> StoreResult<bool> {
        let updated = self.policy.store().set_flag(id, bookmark)?;
        if !updated {
            log::info!("bookmark ignored, news {} is not cached", id);
        }
        Ok(updated)
    }

    pub fn is_bookmarked(&self, id: &str) -> StoreResult<bool> {
        Ok(self.get(id)?.map(|n| n.bookmarked).unwrap_or(false))
    }
}
