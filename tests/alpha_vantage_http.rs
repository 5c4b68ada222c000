//! Alpha Vantage 客户端 + 缓存回退，针对本地 mock 服务器
//!
//!   cargo test --test alpha_vantage_http -- --nocapture

use std::sync::Arc;

use mockito::{Matcher, Server};
use serde_json::json;

use equity_pulse::commands::{news_cmd, stock_cmd};
use equity_pulse::config::AppConfig;
use equity_pulse::db::database::Database;
use equity_pulse::error::RemoteError;
use equity_pulse::models::stock::{StockQuery, StockQuote};
use equity_pulse::repository::RemoteSource;
use equity_pulse::services::alpha_vantage::{AlphaVantageClient, NewsFilter};
use equity_pulse::services::stock_source::StockSource;
use equity_pulse::utils::http::build_api_client;
use equity_pulse::AppState;

fn function(name: &str) -> Matcher {
    Matcher::UrlEncoded("function".into(), name.into())
}

fn client_for(server: &Server) -> AlphaVantageClient {
    let http = build_api_client(5).unwrap();
    AlphaVantageClient::with_client(http, &server.url(), "test-key")
}

fn state_with(server: &Server, symbols: &[&str]) -> (AppState, Arc<Database>) {
    let config = AppConfig {
        api_key: "test-key".to_string(),
        base_url: server.url(),
        popular_symbols: symbols.iter().map(|s| s.to_string()).collect(),
        ..AppConfig::default()
    };
    let db = Arc::new(Database::in_memory().unwrap());
    let state = AppState::with_parts(&config, Arc::new(client_for(server)), db.clone());
    (state, db)
}

fn state_for(server: &Server) -> AppState {
    state_with(server, &["AAPL"]).0
}

fn symbol(value: &str) -> Matcher {
    Matcher::UrlEncoded("symbol".into(), value.into())
}

fn cached(symbol: &str, price: f64, followed: bool) -> StockQuote {
    StockQuote {
        symbol: symbol.to_string(),
        name: format!("{} Corp", symbol),
        followed,
        price,
        change: 0.0,
        change_percent: 0.0,
        last_updated: 1_705_190_400_000,
    }
}

fn one_article_feed(url: &str, topic: &str, ticker: &str) -> String {
    json!({
        "feed": [{
            "title": "Quarterly results beat estimates",
            "url": url,
            "time_published": "20240115T143000",
            "summary": "Revenue grew.",
            "source": "Reuters",
            "topics": [{"topic": topic, "relevance_score": "0.9"}],
            "ticker_sentiment": [{"ticker": ticker}]
        }]
    })
    .to_string()
}

fn aapl_quote(price: &str) -> String {
    json!({
        "Global Quote": {
            "01. symbol": "AAPL",
            "02. open": "150.0000",
            "05. price": price,
            "07. latest trading day": "2024-01-15",
            "08. previous close": "150.0000",
            "09. change": "5.0000",
            "10. change percent": "3.3333%"
        }
    })
    .to_string()
}

// ==================== 客户端解析 ====================

#[tokio::test]
async fn test_global_quote_is_parsed() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/query")
        .match_query(Matcher::AllOf(vec![
            function("GLOBAL_QUOTE"),
            Matcher::UrlEncoded("symbol".into(), "AAPL".into()),
            Matcher::UrlEncoded("apikey".into(), "test-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(aapl_quote("155.0000"))
        .create_async()
        .await;

    let quote = client_for(&server).global_quote("AAPL").await.unwrap();
    let snapshot = quote.snapshot().unwrap();
    assert_eq!(quote.symbol, "AAPL");
    assert_eq!(snapshot.price, 155.0);
    assert_eq!(snapshot.change_percent, 3.3333);
    assert_eq!(snapshot.as_of, 1_705_276_800_000);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_note_is_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/query")
        .match_query(function("NEWS_SENTIMENT"))
        .with_status(200)
        .with_body(r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"}"#)
        .create_async()
        .await;

    let err = client_for(&server)
        .news_sentiment(&NewsFilter::None, 50)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Api(ref m) if m.contains("call frequency")));
}

#[tokio::test]
async fn test_server_error_is_status() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/query")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let err = client_for(&server).global_quote("AAPL").await.unwrap_err();
    assert!(matches!(err, RemoteError::Status(500)));
}

#[tokio::test]
async fn test_unknown_symbol_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/query")
        .match_query(function("GLOBAL_QUOTE"))
        .with_status(200)
        .with_body(r#"{"Global Quote": {}}"#)
        .create_async()
        .await;

    let err = client_for(&server).global_quote("NOPE").await.unwrap_err();
    assert!(matches!(err, RemoteError::MalformedResponse(_)));
}

// ==================== 端到端：命令层 + SQLite 缓存 ====================

#[tokio::test]
async fn test_news_feed_is_cached_and_survives_outage() {
    let mut server = Server::new_async().await;
    let feed = server
        .mock("GET", "/query")
        .match_query(function("NEWS_SENTIMENT"))
        .with_status(200)
        .with_body(
            json!({
                "items": "2",
                "feed": [
                    {
                        "title": "Apple unveils new chip",
                        "url": "https://news.example/apple-chip",
                        "time_published": "20240115T143000",
                        "summary": "Apple announced a new processor.",
                        "source": "Reuters",
                        "topics": [{"topic": "Technology", "relevance_score": "0.9"}],
                        "ticker_sentiment": [{"ticker": "AAPL"}]
                    },
                    {
                        "title": "",
                        "url": "https://news.example/untitled"
                    }
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let state = state_for(&server);
    let latest = news_cmd::get_latest_news(&state, None, None).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, "https://news.example/apple-chip");
    assert_eq!(latest[0].category, "technology");
    assert_eq!(latest[0].published_at(), "Jan 15, 2024");
    feed.assert_async().await;

    assert!(news_cmd::bookmark_news(&state, latest[0].id.clone(), true).unwrap());

    feed.remove_async().await;
    server
        .mock("GET", "/query")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let cached = news_cmd::get_latest_news(&state, None, None).await.unwrap();
    assert_eq!(cached.len(), 1);
    assert!(cached[0].bookmarked);

    let by_stock = news_cmd::get_news_by_stock(&state, "aapl".to_string(), None, None)
        .await
        .unwrap();
    assert_eq!(by_stock.len(), 1);
}

#[tokio::test]
async fn test_followed_stock_price_update_end_to_end() {
    let mut server = Server::new_async().await;
    let quote = server
        .mock("GET", "/query")
        .match_query(function("GLOBAL_QUOTE"))
        .with_status(200)
        .with_body(aapl_quote("150.0000"))
        .create_async()
        .await;
    server
        .mock("GET", "/query")
        .match_query(function("OVERVIEW"))
        .with_status(200)
        .with_body(json!({"Symbol": "AAPL", "Name": "Apple Inc", "Exchange": "NASDAQ"}).to_string())
        .create_async()
        .await;

    let state = state_for(&server);
    let stocks = stock_cmd::get_all_stocks(&state).await.unwrap();
    assert_eq!(stocks.len(), 1);
    assert_eq!(stocks[0].name, "Apple Inc");
    assert!(stock_cmd::follow_stock(&state, "AAPL".to_string(), true).unwrap());

    quote.remove_async().await;
    server
        .mock("GET", "/query")
        .match_query(function("GLOBAL_QUOTE"))
        .with_status(200)
        .with_body(aapl_quote("155.0000"))
        .create_async()
        .await;

    assert_eq!(stock_cmd::refresh_stock_prices(&state).await.unwrap(), 1);
    let aapl = stock_cmd::get_stock(&state, "AAPL".to_string()).await.unwrap().unwrap();
    assert_eq!(aapl.price, 155.0);
    assert!(aapl.followed);
    assert_eq!(aapl.name, "Apple Inc");

    let followed = stock_cmd::get_followed_stocks(&state).unwrap();
    assert_eq!(followed.len(), 1);
}

#[tokio::test]
async fn test_unusable_price_keeps_cached_quote() {
    let mut server = Server::new_async().await;
    let quote = server
        .mock("GET", "/query")
        .match_query(Matcher::AllOf(vec![function("GLOBAL_QUOTE"), symbol("AAPL")]))
        .with_status(200)
        .with_body(aapl_quote("N/A"))
        .create_async()
        .await;

    let (state, db) = state_with(&server, &["AAPL"]);
    db.save_stocks(&[cached("AAPL", 150.0, true)]).unwrap();

    assert_eq!(stock_cmd::refresh_stock_prices(&state).await.unwrap(), 0);
    quote.assert_async().await;

    let aapl = db.get_stock("AAPL").unwrap().unwrap();
    assert_eq!(aapl.price, 150.0);
    assert_eq!(aapl.last_updated, 1_705_190_400_000);
    assert!(aapl.followed);
}

// ==================== 批量行情：部分失败 / 全部失败 ====================

#[tokio::test]
async fn test_one_failed_symbol_does_not_block_the_rest() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/query")
        .match_query(Matcher::AllOf(vec![function("GLOBAL_QUOTE"), symbol("AAPL")]))
        .with_status(200)
        .with_body(aapl_quote("155.0000"))
        .create_async()
        .await;
    let msft = server
        .mock("GET", "/query")
        .match_query(Matcher::AllOf(vec![function("GLOBAL_QUOTE"), symbol("MSFT")]))
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("GET", "/query")
        .match_query(Matcher::AllOf(vec![function("OVERVIEW"), symbol("AAPL")]))
        .with_status(200)
        .with_body(json!({"Symbol": "AAPL", "Name": "Apple Inc"}).to_string())
        .create_async()
        .await;

    let (state, db) = state_with(&server, &["AAPL", "MSFT"]);
    let stocks = stock_cmd::get_all_stocks(&state).await.unwrap();
    msft.assert_async().await;

    assert_eq!(stocks.len(), 1);
    assert_eq!(stocks[0].symbol, "AAPL");
    assert_eq!(stocks[0].price, 155.0);
    assert_eq!(db.get_stock("AAPL").unwrap().unwrap().name, "Apple Inc");
    assert!(db.get_stock("MSFT").unwrap().is_none());
}

#[tokio::test]
async fn test_every_symbol_failing_serves_cache() {
    let mut server = Server::new_async().await;
    let quotes = server
        .mock("GET", "/query")
        .match_query(function("GLOBAL_QUOTE"))
        .with_status(500)
        .expect(4)
        .create_async()
        .await;

    let source = StockSource::new(Arc::new(client_for(&server)), vec!["AAPL".to_string(), "MSFT".to_string()]);
    let err = source.fetch(&StockQuery::All).await.unwrap_err();
    assert!(matches!(err, RemoteError::AllFailed(ref m) if m.contains("500")), "{:?}", err);

    let (state, db) = state_with(&server, &["AAPL", "MSFT"]);
    db.save_stocks(&[cached("AAPL", 150.0, true), cached("MSFT", 400.0, false)]).unwrap();
    let before = db.query_stocks(&StockQuery::All).unwrap();

    let stocks = stock_cmd::get_all_stocks(&state).await.unwrap();
    assert_eq!(stocks, before);
    assert_eq!(stocks.iter().map(|s| s.price).collect::<Vec<_>>(), vec![150.0, 400.0]);
    quotes.assert_async().await;
}

// ==================== 新闻请求参数 ====================

#[tokio::test]
async fn test_category_query_sends_topics_and_labels_result() {
    let mut server = Server::new_async().await;
    let feed = server
        .mock("GET", "/query")
        .match_query(Matcher::AllOf(vec![
            function("NEWS_SENTIMENT"),
            Matcher::UrlEncoded("topics".into(), "finance,financial_markets".into()),
        ]))
        .with_status(200)
        .with_body(one_article_feed("https://news.example/bank-results", "Technology", "JPM"))
        .expect(1)
        .create_async()
        .await;

    let state = state_for(&server);
    let finance = news_cmd::get_news_by_category(&state, "finance".to_string(), None, None)
        .await
        .unwrap();
    feed.assert_async().await;

    assert_eq!(finance.len(), 1);
    assert_eq!(finance[0].id, "https://news.example/bank-results");
    // labelled by the requested category, not the feed topic
    assert_eq!(finance[0].category, "finance");
}

#[tokio::test]
async fn test_symbol_query_sends_tickers() {
    let mut server = Server::new_async().await;
    let feed = server
        .mock("GET", "/query")
        .match_query(Matcher::AllOf(vec![
            function("NEWS_SENTIMENT"),
            Matcher::UrlEncoded("tickers".into(), "AAPL".into()),
        ]))
        .with_status(200)
        .with_body(one_article_feed("https://news.example/apple-results", "Technology", "AAPL"))
        .expect(1)
        .create_async()
        .await;

    let state = state_for(&server);
    let news = news_cmd::get_news_by_stock(&state, "aapl".to_string(), None, None)
        .await
        .unwrap();
    feed.assert_async().await;

    assert_eq!(news.len(), 1);
    assert_eq!(news[0].related_symbols, vec!["AAPL".to_string()]);
}
