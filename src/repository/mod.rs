pub mod news;
pub mod refresh;
pub mod stock;

pub use news::NewsRepository;
pub use refresh::{CacheAside, Keyed, LocalStore, Refresh, RemoteRecord, RemoteSource};
pub use stock::StockRepository;
