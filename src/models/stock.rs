use serde::{Deserialize, Serialize};

use super::query::{contains_folded, fold_case};

/// 缓存中的股票行情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    /// 仅本地修改，远程刷新不会覆盖
    #[serde(default)]
    pub followed: bool,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    /// UTC 毫秒时间戳
    pub last_updated: i64,
}

/// 单次报价
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub as_of: i64,
}

/// 远程拉取的股票数据。搜索结果只有名称，价格刷新只有报价。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteStock {
    pub symbol: String,
    pub name: Option<String>,
    pub quote: Option<QuoteSnapshot>,
}

impl RemoteStock {
    /// Merge onto the cached record: follow state always comes from the
    /// cache, missing name/quote fall back to what the cache already knows.
    pub fn into_stock_quote(self, existing: Option<&StockQuote>) -> StockQuote {
        let followed = existing.map(|s| s.followed).unwrap_or(false);
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| existing.map(|s| s.name.clone()))
            .unwrap_or_else(|| self.symbol.clone());
        let quote = self.quote.or_else(|| {
            existing.map(|s| QuoteSnapshot {
                price: s.price,
                change: s.change,
                change_percent: s.change_percent,
                as_of: s.last_updated,
            })
        });
        let quote = quote.unwrap_or(QuoteSnapshot {
            price: 0.0,
            change: 0.0,
            change_percent: 0.0,
            as_of: 0,
        });

        StockQuote {
            symbol: self.symbol,
            name,
            followed,
            price: quote.price,
            change: quote.change,
            change_percent: quote.change_percent,
            last_updated: quote.as_of,
        }
    }
}

/// 股票查询描述符
#[derive(Debug, Clone, PartialEq)]
pub enum StockQuery {
    /// 热门股票列表（远程）/ 全部缓存股票（本地）
    All,
    Symbol(String),
    Search(String),
    /// 仅刷新这些代码的报价；本地读取全部缓存
    Quotes(Vec<String>),
    /// 仅本地：已关注
    Followed,
}

impl StockQuery {
    pub fn matches(&self, stock: &StockQuote) -> bool {
        match self {
            StockQuery::All | StockQuery::Quotes(_) => true,
            StockQuery::Symbol(symbol) => fold_case(&stock.symbol) == fold_case(symbol),
            StockQuery::Search(text) => {
                contains_folded(&stock.symbol, text) || contains_folded(&stock.name, text)
            }
            StockQuery::Followed => stock.followed,
        }
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
