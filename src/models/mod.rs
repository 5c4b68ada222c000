pub mod news;
pub mod query;
pub mod settings;
pub mod stock;
