pub mod news_cmd;
pub mod settings_cmd;
pub mod stock_cmd;
