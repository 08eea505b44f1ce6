//! JSON logging for the server and its helper programs.

use std::sync::Mutex;

use slog::Drain;
use slog::Fuse;
use slog_async::Async;
use slog_json::Json;

pub use slog::{debug, error, info, o, trace, warn, Logger};

/// Builds the root logger. Every line is a JSON object on stderr
/// tagged with the build metadata from `info`.
pub fn initialize_logger() -> Logger {
    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);

    // `RUST_LOG` filtering is opt-in so release builds skip the parsing
    #[cfg(feature = "env_logging")]
    let drain = slog_envlogger::new(drain).fuse();

    let drain = Async::new(drain).build().fuse();

    Logger::root(
        drain,
        o!("version" => info::VERSION, "revision" => info::REVISION, "build_timestamp" => info::BUILD_TIMESTAMP),
    )
}

/// A logger that discards everything, for tests and one-off tools.
pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}
