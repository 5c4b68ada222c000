use serde::{Deserialize, Serialize};

use super::query::{contains_folded, fold_case, Page};

/// 新闻分类（应用内分类 -> Alpha Vantage topics）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Technology,
    Finance,
    Economy,
    Markets,
    Crypto,
    Ipo,
    Mergers,
    Energy,
    Healthcare,
    Business,
    RealEstate,
    /// 未知分类的兜底
    General,
}

impl NewsCategory {
    /// Table order matters: feed classification picks the first match.
    pub const ALL: [NewsCategory; 12] = [
        NewsCategory::Technology,
        NewsCategory::Finance,
        NewsCategory::Economy,
        NewsCategory::Markets,
        NewsCategory::Crypto,
        NewsCategory::Ipo,
        NewsCategory::Mergers,
        NewsCategory::Energy,
        NewsCategory::Healthcare,
        NewsCategory::Business,
        NewsCategory::RealEstate,
        NewsCategory::General,
    ];

    /// Lenient lookup: unknown labels fall back to `General`.
    pub fn parse(label: &str) -> Self {
        let label = label.trim().to_lowercase().replace('_', " ");
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label() == label)
            .unwrap_or(NewsCategory::General)
    }

    /// 存储在 news.category 列中的标签
    pub fn label(&self) -> &'static str {
        match self {
            NewsCategory::Technology => "technology",
            NewsCategory::Finance => "finance",
            NewsCategory::Economy => "economy",
            NewsCategory::Markets => "markets",
            NewsCategory::Crypto => "crypto",
            NewsCategory::Ipo => "ipo",
            NewsCategory::Mergers => "mergers",
            NewsCategory::Energy => "energy",
            NewsCategory::Healthcare => "healthcare",
            NewsCategory::Business => "business",
            NewsCategory::RealEstate => "real estate",
            NewsCategory::General => "general",
        }
    }

    /// `topics` query parameter sent to NEWS_SENTIMENT
    pub fn request_topics(&self) -> &'static str {
        match self {
            NewsCategory::Technology => "technology",
            NewsCategory::Finance => "finance,financial_markets",
            NewsCategory::Economy => "economy_fiscal,economy_monetary,economy_macro",
            NewsCategory::Markets => "financial_markets",
            NewsCategory::Crypto => "blockchain",
            NewsCategory::Ipo => "ipo",
            NewsCategory::Mergers => "mergers_and_acquisitions",
            NewsCategory::Energy => "energy_transportation",
            NewsCategory::Healthcare => "life_sciences",
            NewsCategory::Business => "manufacturing,retail_wholesale",
            NewsCategory::RealEstate => "real_estate",
            NewsCategory::General => "economy_macro,financial_markets,technology,finance",
        }
    }

    /// Topic labels as they appear in a feed entry's `topics[].topic`
    fn feed_topics(&self) -> &'static [&'static str] {
        match self {
            NewsCategory::Technology => &["technology"],
            NewsCategory::Finance => &["finance"],
            NewsCategory::Economy => &["economy - fiscal", "economy - monetary", "economy - macro"],
            NewsCategory::Markets => &["financial markets"],
            NewsCategory::Crypto => &["blockchain"],
            NewsCategory::Ipo => &["ipo"],
            NewsCategory::Mergers => &["mergers & acquisitions"],
            NewsCategory::Energy => &["energy & transportation"],
            NewsCategory::Healthcare => &["life sciences"],
            NewsCategory::Business => &["manufacturing", "retail & wholesale"],
            NewsCategory::RealEstate => &["real estate & construction"],
            NewsCategory::General => &[],
        }
    }

    /// 根据 feed 中的 topic 标签归类
    pub fn classify<'a, I>(topics: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let topics: Vec<String> = topics
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.feed_topics().iter().any(|ft| topics.iter().any(|t| t == ft)))
            .unwrap_or(NewsCategory::General)
    }
}

/// 缓存中的新闻条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// 唯一标识（原文链接）
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: String,
    pub image_url: String,
    /// 发布时间，UTC 毫秒时间戳；0 表示未知
    pub publish_date: i64,
    pub source: String,
    pub related_symbols: Vec<String>,
    pub category: String,
    /// 仅本地修改，远程刷新不会覆盖
    #[serde(default)]
    pub bookmarked: bool,
}

impl NewsItem {
    /// Display form, e.g. "Jan 15, 2024". Empty when the date is unknown.
    pub fn published_at(&self) -> String {
        if self.publish_date <= 0 {
            return String::new();
        }
        chrono::DateTime::from_timestamp_millis(self.publish_date)
            .map(|dt| dt.format("%b %d, %Y").to_string())
            .unwrap_or_default()
    }
}

/// 远程拉取的新闻（尚未合并本地书签状态）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedArticle {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: String,
    pub image_url: String,
    pub publish_date: i64,
    pub source: String,
    pub related_symbols: Vec<String>,
    pub category: String,
}

impl FeedArticle {
    pub fn into_news_item(self, bookmarked: bool) -> NewsItem {
        NewsItem {
            id: self.id,
            title: self.title,
            summary: self.summary,
            content: self.content,
            url: self.url,
            image_url: self.image_url,
            publish_date: self.publish_date,
            source: self.source,
            related_symbols: self.related_symbols,
            category: self.category,
            bookmarked,
        }
    }
}

/// 新闻查询描述符
#[derive(Debug, Clone, PartialEq)]
pub enum NewsQuery {
    Latest { page: Page },
    Category { category: NewsCategory, page: Page },
    Symbol { symbol: String, page: Page },
    Search { text: String, page: Page },
    /// 仅本地：已收藏
    Bookmarked,
}

impl NewsQuery {
    pub fn page(&self) -> Option<Page> {
        match self {
            NewsQuery::Latest { page }
            | NewsQuery::Category { page, .. }
            | NewsQuery::Symbol { page, .. }
            | NewsQuery::Search { page, .. } => Some(*page),
            NewsQuery::Bookmarked => None,
        }
    }

    /// Filter half of the query, shared by every store implementation.
    pub fn matches(&self, item: &NewsItem) -> bool {
        match self {
            NewsQuery::Latest { .. } => true,
            NewsQuery::Category { category, .. } => item.category == category.label(),
            NewsQuery::Symbol { symbol, .. } => item
                .related_symbols
                .iter()
                .any(|s| fold_case(s) == fold_case(symbol)),
            NewsQuery::Search { text, .. } => {
                contains_folded(&item.title, text) || contains_folded(&item.summary, text)
            }
            NewsQuery::Bookmarked => item.bookmarked,
        }
    }
}
