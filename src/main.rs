//! equity-pulse CLI.
//!
//! ```bash
//! equity-pulse news latest --page 2
//! equity-pulse news category technology
//! equity-pulse news bookmark "https://example.com/article"
//! equity-pulse stocks show AAPL
//! equity-pulse stocks follow AAPL
//! equity-pulse prefs set --dark-theme true
//! ```

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use equity_pulse::commands::{news_cmd, settings_cmd, stock_cmd};
use equity_pulse::config::AppConfig;
use equity_pulse::utils::logging::setup_logging;
use equity_pulse::AppState;

#[derive(Parser)]
#[command(name = "equity-pulse")]
#[command(about = "Financial news and stock quotes with an offline cache", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 新闻
    News {
        #[command(subcommand)]
        action: NewsAction,
    },
    /// 股票行情
    Stocks {
        #[command(subcommand)]
        action: StockAction,
    },
    /// 偏好设置
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(clap::Args)]
struct PageArgs {
    /// 页码（从 1 开始）
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// 每页条数，默认取 EQUITY_PULSE_PAGE_SIZE
    #[arg(long)]
    page_size: Option<u32>,
}

#[derive(Subcommand)]
enum NewsAction {
    Latest {
        #[command(flatten)]
        page: PageArgs,
    },
    Category {
        category: String,
        #[command(flatten)]
        page: PageArgs,
    },
    Symbol {
        symbol: String,
        #[command(flatten)]
        page: PageArgs,
    },
    Search {
        query: String,
        #[command(flatten)]
        page: PageArgs,
    },
    Show {
        id: String,
    },
    Bookmarks,
    Bookmark {
        id: String,
    },
    Unbookmark {
        id: String,
    },
}

#[derive(Subcommand)]
enum StockAction {
    All,
    Show { symbol: String },
    Search { keyword: String },
    Followed,
    Follow { symbol: String },
    Unfollow { symbol: String },
    /// 重新拉取所有缓存股票的报价
    Refresh,
}

#[derive(Subcommand)]
enum PrefsAction {
    Show,
    Set {
        #[arg(long)]
        dark_theme: Option<bool>,
        #[arg(long)]
        realtime_analysis: Option<bool>,
        #[arg(long)]
        notifications: Option<bool>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_news(state: &AppState, action: NewsAction) -> Result<(), String> {
    let out = match action {
        NewsAction::Latest { page } => {
            serde_json::to_value(news_cmd::get_latest_news(state, Some(page.page), page.page_size).await?)
        }
        NewsAction::Category { category, page } => serde_json::to_value(
            news_cmd::get_news_by_category(state, category, Some(page.page), page.page_size).await?,
        ),
        NewsAction::Symbol { symbol, page } => serde_json::to_value(
            news_cmd::get_news_by_stock(state, symbol, Some(page.page), page.page_size).await?,
        ),
        NewsAction::Search { query, page } => serde_json::to_value(
            news_cmd::search_news(state, query, Some(page.page), page.page_size).await?,
        ),
        NewsAction::Show { id } => serde_json::to_value(news_cmd::get_news_detail(state, id)?),
        NewsAction::Bookmarks => serde_json::to_value(news_cmd::get_bookmarked_news(state)?),
        NewsAction::Bookmark { id } => serde_json::to_value(news_cmd::bookmark_news(state, id, true)?),
        NewsAction::Unbookmark { id } => serde_json::to_value(news_cmd::bookmark_news(state, id, false)?),
    };
    let out = out.map_err(|e| e.to_string())?;
    print_json(&out).map_err(|e| e.to_string())
}

async fn run_stocks(state: &AppState, action: StockAction) -> Result<(), String> {
    let out = match action {
        StockAction::All => serde_json::to_value(stock_cmd::get_all_stocks(state).await?),
        StockAction::Show { symbol } => serde_json::to_value(stock_cmd::get_stock(state, symbol).await?),
        StockAction::Search { keyword } => serde_json::to_value(stock_cmd::search_stocks(state, keyword).await?),
        StockAction::Followed => serde_json::to_value(stock_cmd::get_followed_stocks(state)?),
        StockAction::Follow { symbol } => serde_json::to_value(stock_cmd::follow_stock(state, symbol, true)?),
        StockAction::Unfollow { symbol } => serde_json::to_value(stock_cmd::follow_stock(state, symbol, false)?),
        StockAction::Refresh => serde_json::to_value(stock_cmd::refresh_stock_prices(state).await?),
    };
    let out = out.map_err(|e| e.to_string())?;
    print_json(&out).map_err(|e| e.to_string())
}

fn run_prefs(state: &AppState, action: PrefsAction) -> Result<(), String> {
    let prefs = match action {
        PrefsAction::Show => settings_cmd::get_preferences(state)?,
        PrefsAction::Set {
            dark_theme,
            realtime_analysis,
            notifications,
        } => settings_cmd::update_preferences(state, dark_theme, realtime_analysis, notifications)?,
    };
    print_json(&prefs).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    log::debug!("data dir {}, base url {}", config.data_dir.display(), config.base_url);
    let state = AppState::new(&config)?;

    let result = match cli.command {
        Commands::News { action } => run_news(&state, action).await,
        Commands::Stocks { action } => run_stocks(&state, action).await,
        Commands::Prefs { action } => run_prefs(&state, action),
    };
    result.map_err(|e| anyhow!(e))
}
