use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::StoreResult;
use crate::models::news::{NewsItem, NewsQuery};
use crate::models::query::{fold_case, Page};
use crate::models::settings::UserPreferences;
use crate::models::stock::{StockQuery, StockQuote};
use crate::repository::refresh::{LocalStore, RemoteRecord};

const DB_FILE: &str = "equity_pulse.db";

const NEWS_COLUMNS: &str = "id, title, summary, content, url, image_url, publish_date, source, related_symbols, category, is_bookmarked";
const STOCK_COLUMNS: &str = "symbol, name, is_followed, current_price, price_change, price_change_pct, last_updated";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(data_dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join(DB_FILE);
        let conn = Connection::open(db_path)?;
        register_functions(&conn)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        register_functions(&conn)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> StoreResult<()> {
        let conn = self.conn.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS settings (
                id TEXT PRIMARY KEY DEFAULT 'default',
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS news (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                image_url TEXT NOT NULL DEFAULT '',
                publish_date INTEGER NOT NULL DEFAULT 0,
                source TEXT NOT NULL DEFAULT '',
                related_symbols TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT '',
                is_bookmarked INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_news_date ON news(publish_date);
            CREATE INDEX IF NOT EXISTS idx_news_category ON news(category);

            CREATE TABLE IF NOT EXISTS stocks (
                symbol TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                is_followed INTEGER NOT NULL DEFAULT 0,
                current_price REAL NOT NULL DEFAULT 0,
                price_change REAL NOT NULL DEFAULT 0,
                price_change_pct REAL NOT NULL DEFAULT 0,
                last_updated INTEGER NOT NULL DEFAULT 0
            );
            ",
        )?;
        Ok(())
    }

    // ====== Preferences ======

    pub fn save_preferences(&self, prefs: &UserPreferences) -> StoreResult<()> {
        let conn = self.conn.lock()?;
        let data = serde_json::to_string(prefs)?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (id, data, updated_at) VALUES ('default', ?1, datetime('now'))",
            rusqlite::params![data],
        )?;
        Ok(())
    }

    pub fn load_preferences(&self) -> StoreResult<UserPreferences> {
        let conn = self.conn.lock()?;
        let data = conn
            .query_row("SELECT data FROM settings WHERE id = 'default'", [], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        match data {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => {
                let default = UserPreferences::default();
                drop(conn);
                self.save_preferences(&default)?;
                Ok(default)
            }
        }
    }

    // ====== News ======

    pub fn save_news(&self, items: &[NewsItem]) -> StoreResult<()> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        for n in items {
            insert_news(&tx, n)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_news(&self, id: &str) -> StoreResult<Option<NewsItem>> {
        let conn = self.conn.lock()?;
        select_news(&conn, id)
    }

    /// Merge and write a fetched batch under one lock and one transaction.
    pub fn merge_news<I>(&self, incoming: Vec<I>) -> StoreResult<usize>
    where
        I: RemoteRecord<Cached = NewsItem>,
    {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut written = 0;
        for record in incoming {
            let existing = select_news(&tx, record.key())?;
            insert_news(&tx, &record.merge(existing.as_ref()))?;
            written += 1;
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn query_news(&self, query: &NewsQuery) -> StoreResult<Vec<NewsItem>> {
        let conn = self.conn.lock()?;
        let order = "ORDER BY publish_date DESC, id ASC";
        let (filter, arg) = match query {
            NewsQuery::Latest { .. } => ("1 = 1", None),
            NewsQuery::Category { category, .. } => ("category = ?1", Some(category.label().to_string())),
            // related_symbols is comma-joined; wrap it so only whole tickers match
            NewsQuery::Symbol { symbol, .. } => (
                "related_symbols != '' AND instr(',' || fold(related_symbols) || ',', ?1) > 0",
                Some(format!(",{},", fold_case(symbol))),
            ),
            NewsQuery::Search { text, .. } => (
                "(instr(fold(title), ?1) > 0 OR instr(fold(summary), ?1) > 0)",
                Some(fold_case(text)),
            ),
            NewsQuery::Bookmarked => ("is_bookmarked = 1", None),
        };
        let Page { limit, offset } = query.page().unwrap_or(Page::new(u32::MAX, 0));
        let sql = format!(
            "SELECT {} FROM news WHERE {} {} LIMIT {} OFFSET {}",
            NEWS_COLUMNS, filter, order, limit as i64, offset
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = match arg {
            Some(arg) => stmt.query_map(rusqlite::params![arg], news_from_row)?,
            None => stmt.query_map([], news_from_row)?,
        };
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn set_news_bookmarked(&self, id: &str, bookmarked: bool) -> StoreResult<bool> {
        let conn = self.conn.lock()?;
        let changed = conn.execute(
            "UPDATE news SET is_bookmarked = ?1 WHERE id = ?2",
            rusqlite::params![bookmarked as i32, id],
        )?;
        Ok(changed > 0)
    }

    // ====== Stocks ======

    pub fn save_stocks(&self, stocks: &[StockQuote]) -> StoreResult<()> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        for s in stocks {
            insert_stock(&tx, s)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_stock(&self, symbol: &str) -> StoreResult<Option<StockQuote>> {
        let conn = self.conn.lock()?;
        select_stock(&conn, symbol)
    }

    pub fn merge_stocks<I>(&self, incoming: Vec<I>) -> StoreResult<usize>
    where
        I: RemoteRecord<Cached = StockQuote>,
    {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut written = 0;
        for record in incoming {
            let existing = select_stock(&tx, record.key())?;
            insert_stock(&tx, &record.merge(existing.as_ref()))?;
            written += 1;
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn query_stocks(&self, query: &StockQuery) -> StoreResult<Vec<StockQuote>> {
        let conn = self.conn.lock()?;
        let (filter, arg) = match query {
            StockQuery::All | StockQuery::Quotes(_) => ("1 = 1", None),
            StockQuery::Symbol(symbol) => ("fold(symbol) = ?1", Some(fold_case(symbol))),
            StockQuery::Search(text) => (
                "(instr(fold(symbol), ?1) > 0 OR instr(fold(name), ?1) > 0)",
                Some(fold_case(text)),
            ),
            StockQuery::Followed => ("is_followed = 1", None),
        };
        let sql = format!(
            "SELECT {} FROM stocks WHERE {} ORDER BY symbol ASC",
            STOCK_COLUMNS, filter
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = match arg {
            Some(arg) => stmt.query_map(rusqlite::params![arg], stock_from_row)?,
            None => stmt.query_map([], stock_from_row)?,
        };
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn set_stock_followed(&self, symbol: &str, followed: bool) -> StoreResult<bool> {
        let conn = self.conn.lock()?;
        let changed = conn.execute(
            "UPDATE stocks SET is_followed = ?1 WHERE symbol = ?2",
            rusqlite::params![followed as i32, symbol],
        )?;
        Ok(changed > 0)
    }
}

fn news_from_row(row: &Row<'_>) -> rusqlite::Result<NewsItem> {
    let related: String = row.get(8)?;
    Ok(NewsItem {
        id: row.get(0)?,
        title: row.get(1)?,
        summary: row.get(2)?,
        content: row.get(3)?,
        url: row.get(4)?,
        image_url: row.get(5)?,
        publish_date: row.get(6)?,
        source: row.get(7)?,
        related_symbols: related
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
            .collect(),
        category: row.get(9)?,
        bookmarked: row.get::<_, i32>(10)? != 0,
    })
}

fn stock_from_row(row: &Row<'_>) -> rusqlite::Result<StockQuote> {
    Ok(StockQuote {
        symbol: row.get(0)?,
        name: row.get(1)?,
        followed: row.get::<_, i32>(2)? != 0,
        price: row.get(3)?,
        change: row.get(4)?,
        change_percent: row.get(5)?,
        last_updated: row.get(6)?,
    })
}

/// `fold(text)`：与内存缓存相同的大小写折叠，SQLite 自带的 LIKE 只处理 ASCII
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: String = ctx.get(0)?;
            Ok(fold_case(&text))
        },
    )
}

fn insert_news(conn: &Connection, n: &NewsItem) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO news (id, title, summary, content, url, image_url, publish_date, source, related_symbols, category, is_bookmarked) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            n.id,
            n.title,
            n.summary,
            n.content,
            n.url,
            n.image_url,
            n.publish_date,
            n.source,
            n.related_symbols.join(","),
            n.category,
            n.bookmarked as i32
        ],
    )?;
    Ok(())
}

fn select_news(conn: &Connection, id: &str) -> StoreResult<Option<NewsItem>> {
    let sql = format!("SELECT {} FROM news WHERE id = ?1", NEWS_COLUMNS);
    let item = conn
        .query_row(&sql, rusqlite::params![id], news_from_row)
        .optional()?;
    Ok(item)
}

fn insert_stock(conn: &Connection, s: &StockQuote) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO stocks (symbol, name, is_followed, current_price, price_change, price_change_pct, last_updated) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            s.symbol,
            s.name,
            s.followed as i32,
            s.price,
            s.change,
            s.change_percent,
            s.last_updated
        ],
    )?;
    Ok(())
}

fn select_stock(conn: &Connection, symbol: &str) -> StoreResult<Option<StockQuote>> {
    let sql = format!("SELECT {} FROM stocks WHERE symbol = ?1", STOCK_COLUMNS);
    let stock = conn
        .query_row(&sql, rusqlite::params![symbol], stock_from_row)
        .optional()?;
    Ok(stock)
}

impl LocalStore<NewsQuery> for Database {
    type Record = NewsItem;

    fn find(&self, key: &str) -> StoreResult<Option<NewsItem>> {
        self.get_news(key)
    }

    fn merge_upsert<I>(&self, incoming: Vec<I>) -> StoreResult<usize>
    where
        I: RemoteRecord<Cached = NewsItem>,
    {
        self.merge_news(incoming)
    }

    fn query(&self, query: &NewsQuery) -> StoreResult<Vec<NewsItem>> {
        self.query_news(query)
    }

    fn set_flag(&self, key: &str, value: bool) -> StoreResult<bool> {
        self.set_news_bookmarked(key, value)
    }
}

impl LocalStore<StockQuery> for Database {
    type Record = StockQuote;

    fn find(&self, key: &str) -> StoreResult<Option<StockQuote>> {
        self.get_stock(key)
    }

    fn merge_upsert<I>(&self, incoming: Vec<I>) -> StoreResult<usize>
    where
        I: RemoteRecord<Cached = StockQuote>,
    {
        self.merge_stocks(incoming)
    }

    fn query(&self, query: &StockQuery) -> StoreResult<Vec<StockQuote>> {
        self.query_stocks(query)
    }

    fn set_flag(&self, key: &str, value: bool) -> StoreResult<bool> {
        self.set_stock_followed(key, value)
    }
}
