use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::RemoteError;
use crate::models::news::{FeedArticle, NewsCategory};
use crate::models::stock::QuoteSnapshot;
use crate::utils::http::build_api_client;

const FUNCTION_NEWS_SENTIMENT: &str = "NEWS_SENTIMENT";
const FUNCTION_GLOBAL_QUOTE: &str = "GLOBAL_QUOTE";
const FUNCTION_OVERVIEW: &str = "OVERVIEW";
const FUNCTION_SYMBOL_SEARCH: &str = "SYMBOL_SEARCH";

/// Keys Alpha Vantage uses to report errors and rate limits with a 200 status.
const ERROR_ENVELOPE_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

/// NEWS_SENTIMENT 过滤条件
#[derive(Debug, Clone, PartialEq)]
pub enum NewsFilter {
    None,
    Tickers(String),
    Topics(String),
}

pub struct AlphaVantageClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = build_api_client(config.timeout_secs)?;
        Ok(Self::with_client(client, &config.base_url, &config.api_key))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn get_json(&self, function: &str, params: &[(&str, &str)]) -> Result<Value, RemoteError> {
        let mut url = format!("{}/query?function={}", self.base_url, function);
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
        log::debug!("GET {} ({})", function, params.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join(" "));
        url.push_str(&format!("&apikey={}", urlencoding::encode(&self.api_key)));

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        let text = resp.text().await?;
        let json: Value = serde_json::from_str(&text)
            .map_err(|e| RemoteError::MalformedResponse(format!("{} is not JSON: {}", function, e)))?;
        check_envelope(&json)?;
        Ok(json)
    }

    pub async fn news_sentiment(&self, filter: &NewsFilter, limit: u32) -> Result<NewsSentimentResponse, RemoteError> {
        let limit = limit.to_string();
        let mut params = vec![("limit", limit.as_str()), ("sort", "LATEST")];
        match filter {
            NewsFilter::None => {}
            NewsFilter::Tickers(tickers) => params.push(("tickers", tickers.as_str())),
            NewsFilter::Topics(topics) => params.push(("topics", topics.as_str())),
        }
        let json = self.get_json(FUNCTION_NEWS_SENTIMENT, &params).await?;
        decode(FUNCTION_NEWS_SENTIMENT, json)
    }

    pub async fn global_quote(&self, symbol: &str) -> Result<GlobalQuote, RemoteError> {
        let json = self.get_json(FUNCTION_GLOBAL_QUOTE, &[("symbol", symbol)]).await?;
        let quote = &json["Global Quote"];
        // unknown symbols come back as an empty object
        if quote.as_object().map(|o| o.is_empty()).unwrap_or(true) {
            return Err(RemoteError::MalformedResponse(format!("no quote for {}", symbol)));
        }
        decode(FUNCTION_GLOBAL_QUOTE, quote.clone())
    }

    pub async fn company_overview(&self, symbol: &str) -> Result<CompanyOverview, RemoteError> {
        let json = self.get_json(FUNCTION_OVERVIEW, &[("symbol", symbol)]).await?;
        if json.as_object().map(|o| o.is_empty()).unwrap_or(true) {
            return Err(RemoteError::MalformedResponse(format!("no overview for {}", symbol)));
        }
        decode(FUNCTION_OVERVIEW, json)
    }

    pub async fn symbol_search(&self, keywords: &str) -> Result<Vec<SymbolMatch>, RemoteError> {
        let json = self.get_json(FUNCTION_SYMBOL_SEARCH, &[("keywords", keywords)]).await?;
        let resp: SymbolSearchResponse = decode(FUNCTION_SYMBOL_SEARCH, json)?;
        Ok(resp.best_matches)
    }
}

fn check_envelope(json: &Value) -> Result<(), RemoteError> {
    for key in ERROR_ENVELOPE_KEYS {
        if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
            return Err(RemoteError::Api(msg.to_string()));
        }
    }
    Ok(())
}

fn decode<T: serde::de::DeserializeOwned>(function: &str, json: Value) -> Result<T, RemoteError> {
    serde_json::from_value(json)
        .map_err(|e| RemoteError::MalformedResponse(format!("{}: {}", function, e)))
}

// ============================================================
// NEWS_SENTIMENT
// ============================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewsSentimentResponse {
    pub feed: Vec<FeedEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub time_published: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub topics: Vec<FeedTopic>,
    #[serde(default)]
    pub ticker_sentiment: Vec<TickerSentiment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedTopic {
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerSentiment {
    pub ticker: String,
}

impl FeedEntry {
    /// Entries without a title or URL are dropped. `category` labels the
    /// article when it was fetched for a category; otherwise its topics decide.
    pub fn into_article(self, category: Option<NewsCategory>) -> Option<FeedArticle> {
        let url = self.url.trim().to_string();
        let title = self.title.trim().to_string();
        if url.is_empty() || title.is_empty() {
            return None;
        }

        let category = category
            .unwrap_or_else(|| NewsCategory::classify(self.topics.iter().map(|t| t.topic.as_str())));

        let mut related_symbols: Vec<String> = Vec::new();
        for t in &self.ticker_sentiment {
            let ticker = t.ticker.trim().to_uppercase();
            if !ticker.is_empty() && !related_symbols.contains(&ticker) {
                related_symbols.push(ticker);
            }
        }

        let summary = self.summary.unwrap_or_default();
        Some(FeedArticle {
            id: url.clone(),
            title,
            content: summary.clone(),
            summary,
            url,
            image_url: self.banner_image.unwrap_or_default(),
            publish_date: parse_time_published(&self.time_published),
            source: self.source.unwrap_or_default(),
            related_symbols,
            category: category.label().to_string(),
        })
    }
}

/// `20240115T143000` (UTC) -> epoch millis. Falls back to minute precision,
/// then to 0 so an unparseable date never changes between refreshes.
pub fn parse_time_published(raw: &str) -> i64 {
    let raw = raw.trim();
    for fmt in ["%Y%m%dT%H%M%S", "%Y%m%dT%H%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.and_utc().timestamp_millis();
        }
    }
    if !raw.is_empty() {
        log::warn!("unparseable time_published {:?}", raw);
    }
    0
}

// ============================================================
// GLOBAL_QUOTE / OVERVIEW / SYMBOL_SEARCH
// ============================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    pub symbol: String,
    #[serde(rename = "05. price")]
    pub price: String,
    #[serde(rename = "07. latest trading day", default)]
    pub latest_trading_day: String,
    #[serde(rename = "09. change", default)]
    pub change: String,
    #[serde(rename = "10. change percent", default)]
    pub change_percent: String,
}

impl GlobalQuote {
    /// The price is required; a quote without a usable one is rejected so it
    /// never replaces a cached price. Change fields default to 0.0.
    pub fn snapshot(&self) -> Result<QuoteSnapshot, RemoteError> {
        let price = parse_required_decimal(&self.price).ok_or_else(|| {
            RemoteError::MalformedResponse(format!("{} price {:?} is not a number", self.symbol, self.price))
        })?;
        Ok(QuoteSnapshot {
            price,
            change: parse_decimal(&self.change),
            change_percent: parse_decimal(&self.change_percent),
            as_of: trading_day_millis(&self.latest_trading_day),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyOverview {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolSearchResponse {
    #[serde(rename = "bestMatches")]
    pub best_matches: Vec<SymbolMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolMatch {
    #[serde(rename = "1. symbol")]
    pub symbol: String,
    #[serde(rename = "2. name")]
    pub name: String,
}

/// "187.2000" / "0.6452%" -> f64, 0.0 when unparseable
pub fn parse_decimal(raw: &str) -> f64 {
    parse_required_decimal(raw).unwrap_or(0.0)
}

/// Like `parse_decimal` but `None` for "N/A", "None", "" and non-finite values.
fn parse_required_decimal(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Trading day at 00:00 UTC, in millis. 0 when missing.
pub fn trading_day_millis(raw: &str) -> i64 {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_time_published() {
        assert_eq!(parse_time_published("20240115T143000"), 1_705_329_000_000);
        assert_eq!(parse_time_published("20240115T1430"), 1_705_329_000_000);
        assert_eq!(parse_time_published("yesterday"), 0);
        assert_eq!(parse_time_published(""), 0);
    }

    #[test]
    fn test_parse_decimal_strips_percent() {
        assert_eq!(parse_decimal("187.2000"), 187.2);
        assert_eq!(parse_decimal("-0.6452%"), -0.6452);
        assert_eq!(parse_decimal("None"), 0.0);
    }

    #[test]
    fn test_trading_day_millis() {
        assert_eq!(trading_day_millis("2024-01-15"), 1_705_276_800_000);
        assert_eq!(trading_day_millis(""), 0);
    }

    #[test]
    fn test_error_envelopes_are_api_errors() {
        let note = json!({"Note": "Thank you for using Alpha Vantage! call frequency is 5 calls per minute"});
        assert!(matches!(check_envelope(&note), Err(RemoteError::Api(m)) if m.contains("frequency")));

        let info = json!({"Information": "rate limit"});
        assert!(matches!(check_envelope(&info), Err(RemoteError::Api(_))));

        let bad = json!({"Error Message": "Invalid API call"});
        assert!(matches!(check_envelope(&bad), Err(RemoteError::Api(_))));

        assert!(check_envelope(&json!({"feed": []})).is_ok());
    }

    #[test]
    fn test_search_response_requires_best_matches() {
        let ok: SymbolSearchResponse = decode(
            FUNCTION_SYMBOL_SEARCH,
            json!({"bestMatches": [{"1. symbol": "TSCO.LON", "2. name": "Tesco PLC", "3. type": "Equity"}]}),
        )
        .unwrap();
        assert_eq!(ok.best_matches[0].symbol, "TSCO.LON");
        assert_eq!(ok.best_matches[0].name, "Tesco PLC");

        let missing = decode::<SymbolSearchResponse>(FUNCTION_SYMBOL_SEARCH, json!({"matches": []}));
        assert!(matches!(missing, Err(RemoteError::MalformedResponse(_))));

        let no_name = decode::<SymbolSearchResponse>(
            FUNCTION_SYMBOL_SEARCH,
            json!({"bestMatches": [{"1. symbol": "IBM"}]}),
        );
        assert!(matches!(no_name, Err(RemoteError::MalformedResponse(_))));
    }

    #[test]
    fn test_feed_entry_into_article() {
        let resp: NewsSentimentResponse = decode(
            FUNCTION_NEWS_SENTIMENT,
            json!({
                "items": "2",
                "feed": [
                    {
                        "title": " Nvidia rallies ",
                        "url": "https://example.com/nvda",
                        "time_published": "20240115T143000",
                        "summary": "Chip stocks climbed.",
                        "banner_image": null,
                        "source": "Motley Fool",
                        "topics": [{"topic": "Financial Markets", "relevance_score": "0.5"}],
                        "ticker_sentiment": [
                            {"ticker": "NVDA", "relevance_score": "0.9"},
                            {"ticker": "nvda"},
                            {"ticker": "AMD"}
                        ]
                    },
                    {"title": "", "url": "https://example.com/empty"}
                ]
            }),
        )
        .unwrap();

        let mut entries = resp.feed.into_iter();
        let article = entries.next().unwrap().into_article(None).unwrap();
        assert_eq!(article.id, "https://example.com/nvda");
        assert_eq!(article.title, "Nvidia rallies");
        assert_eq!(article.content, "Chip stocks climbed.");
        assert_eq!(article.image_url, "");
        assert_eq!(article.publish_date, 1_705_329_000_000);
        assert_eq!(article.related_symbols, vec!["NVDA".to_string(), "AMD".to_string()]);
        assert_eq!(article.category, "markets");

        assert!(entries.next().unwrap().into_article(None).is_none());
    }

    #[test]
    fn test_requested_category_overrides_topics() {
        let entry = FeedEntry {
            title: "Bitcoin ETF".to_string(),
            url: "https://example.com/btc".to_string(),
            topics: vec![FeedTopic { topic: "Technology".to_string() }],
            ..Default::default()
        };
        let article = entry.into_article(Some(NewsCategory::Crypto)).unwrap();
        assert_eq!(article.category, "crypto");
    }

    #[test]
    fn test_global_quote_snapshot() {
        let quote: GlobalQuote = decode(
            FUNCTION_GLOBAL_QUOTE,
            json!({
                "01. symbol": "IBM",
                "05. price": "187.2000",
                "07. latest trading day": "2024-01-15",
                "09. change": "1.2000",
                "10. change percent": "0.6452%"
            }),
        )
        .unwrap();
        let snap = quote.snapshot().unwrap();
        assert_eq!(snap.price, 187.2);
        assert_eq!(snap.change, 1.2);
        assert_eq!(snap.change_percent, 0.6452);
        assert_eq!(snap.as_of, 1_705_276_800_000);
    }

    #[test]
    fn test_unusable_price_is_malformed() {
        for raw in ["N/A", "None", "", "NaN"] {
            let quote: GlobalQuote = decode(
                FUNCTION_GLOBAL_QUOTE,
                json!({"01. symbol": "IBM", "05. price": raw, "09. change": "N/A"}),
            )
            .unwrap();
            assert!(
                matches!(quote.snapshot(), Err(RemoteError::MalformedResponse(_))),
                "price {:?}",
                raw
            );
        }

        let quote: GlobalQuote = decode(
            FUNCTION_GLOBAL_QUOTE,
            json!({"01. symbol": "IBM", "05. price": "187.2", "09. change": "N/A"}),
        )
        .unwrap();
        assert_eq!(quote.snapshot().unwrap().change, 0.0);
    }
}
