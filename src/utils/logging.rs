use env_logger::{Builder, Env};
use std::io::Write;

/// `info` for the crate, HTTP internals only from `warn` up.
const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn,hyper_util=warn";

fn builder(env: Env) -> Builder {
    let mut builder = Builder::from_env(env.default_filter_or(DEFAULT_FILTER));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}][{}][{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.target(),
            record.args()
        )
    });
    builder
}

/// Install the global logger. A set `RUST_LOG` replaces the default filter
/// entirely, so `RUST_LOG=reqwest=debug` works.
pub fn setup_logging() {
    let _ = builder(Env::default()).try_init();
}
