pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod utils;

use std::sync::Arc;

use config::AppConfig;
use db::database::Database;
use repository::{NewsRepository, StockRepository};
use services::alpha_vantage::AlphaVantageClient;
use services::news_source::NewsSource;
use services::stock_source::StockSource;

pub type AppNewsRepository = NewsRepository<NewsSource, Arc<Database>>;
pub type AppStockRepository = StockRepository<StockSource, Arc<Database>>;

pub struct AppState {
    pub db: Arc<Database>,
    pub news: AppNewsRepository,
    pub stocks: AppStockRepository,
    pub page_size: u32,
}

impl AppState {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let database = Arc::new(Database::new(config.data_dir.clone())?);
        let client = Arc::new(AlphaVantageClient::new(config)?);
        Ok(Self::with_parts(config, client, database))
    }

    pub fn with_parts(config: &AppConfig, client: Arc<AlphaVantageClient>, db: Arc<Database>) -> Self {
        let news = NewsRepository::new(NewsSource::new(client.clone(), config.news_limit), db.clone());
        let stocks = StockRepository::new(
            StockSource::new(client, config.popular_symbols.clone()),
            db.clone(),
        );
        Self {
            db,
            news,
            stocks,
            page_size: config.page_size,
        }
    }
}
