pub mod alpha_vantage;
pub mod news_source;
pub mod stock_source;
