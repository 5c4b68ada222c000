use crate::models::news::{NewsCategory, NewsItem};
use crate::models::query::Page;
use crate::AppState;

fn page_of(state: &AppState, page: Option<u32>, page_size: Option<u32>) -> Page {
    Page::numbered(page.unwrap_or(1), page_size.unwrap_or(state.page_size))
}

/// 最新新闻
pub async fn get_latest_news(
    state: &AppState,
    page: Option<u32>,
    page_size: Option<u32>,
) -> Result<Vec<NewsItem>, String> {
    state
        .news
        .latest(page_of(state, page, page_size))
        .await
        .map_err(|e| format!("failed to load latest news: {}", e))
}

pub async fn get_news_by_category(
    state: &AppState,
    category: String,
    page: Option<u32>,
    page_size: Option<u32>,
) -> Result<Vec<NewsItem>, String> {
    let category = NewsCategory::parse(&category);
    state
        .news
        .by_category(category, page_of(state, page, page_size))
        .await
        .map_err(|e| format!("failed to load {} news: {}", category.label(), e))
}

/// 个股相关新闻
pub async fn get_news_by_stock(
    state: &AppState,
    symbol: String,
    page: Option<u32>,
    page_size: Option<u32>,
) -> Result<Vec<NewsItem>, String> {
    state
        .news
        .by_symbol(&symbol, page_of(state, page, page_size))
        .await
        .map_err(|e| format!("failed to load news for {}: {}", symbol, e))
}

pub async fn search_news(
    state: &AppState,
    query: String,
    page: Option<u32>,
    page_size: Option<u32>,
) -> Result<Vec<NewsItem>, String> {
    let query = query.trim().to_string();
    if query.is_empty() {
        return Ok(vec![]);
    }
    state
        .news
        .search(&query, page_of(state, page, page_size))
        .await
        .map_err(|e| format!("news search failed: {}", e))
}

pub fn get_news_detail(state: &AppState, id: String) -> Result<Option<NewsItem>, String> {
    state.news.get(&id).map_err(|e| e.to_string())
}

pub fn get_bookmarked_news(state: &AppState) -> Result<Vec<NewsItem>, String> {
    state.news.bookmarked().map_err(|e| e.to_string())
}

/// 收藏/取消收藏。未缓存的新闻返回 false
pub fn bookmark_news(state: &AppState, id: String, bookmark: bool) -> Result<bool, String> {
    state
        .news
        .set_bookmark(&id, bookmark)
        .map_err(|e| format!("failed to update bookmark: {}", e))
}

pub fn is_news_bookmarked(state: &AppState, id: String) -> Result<bool, String> {
    state.news.is_bookmarked(&id).map_err(|e| e.to_string())
}
