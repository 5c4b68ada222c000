use crate::models::stock::StockQuote;
use crate::AppState;

/// 热门股票列表
pub async fn get_all_stocks(state: &AppState) -> Result<Vec<StockQuote>, String> {
    state
        .stocks
        .all()
        .await
        .map_err(|e| format!("failed to load stocks: {}", e))
}

pub async fn get_stock(state: &AppState, symbol: String) -> Result<Option<StockQuote>, String> {
    state
        .stocks
        .by_symbol(&symbol)
        .await
        .map_err(|e| format!("failed to load {}: {}", symbol, e))
}

pub async fn search_stocks(state: &AppState, keyword: String) -> Result<Vec<StockQuote>, String> {
    let keyword = keyword.trim().to_string();
    if keyword.is_empty() {
        return Ok(vec![]);
    }
    state
        .stocks
        .search(&keyword)
        .await
        .map_err(|e| format!("stock search failed: {}", e))
}

pub fn get_followed_stocks(state: &AppState) -> Result<Vec<StockQuote>, String> {
    state.stocks.followed().map_err(|e| e.to_string())
}

/// 关注/取消关注。未缓存的股票返回 false
pub fn follow_stock(state: &AppState, symbol: String, follow: bool) -> Result<bool, String> {
    state
        .stocks
        .set_followed(&symbol, follow)
        .map_err(|e| format!("failed to update follow state: {}", e))
}

pub fn is_stock_followed(state: &AppState, symbol: String) -> Result<bool, String> {
    state.stocks.is_followed(&symbol).map_err(|e| e.to_string())
}

pub async fn refresh_stock_prices(state: &AppState) -> Result<usize, String> {
    state
        .stocks
        .refresh_prices()
        .await
        .map_err(|e| format!("failed to refresh prices: {}", e))
}
