//! Build metadata shared by the server, its helpers and its logs.

/// The crate version the server was built from.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The source revision, if the build environment provided one.
pub const REVISION: Option<&str> = option_env!("BACKEND_REVISION");

/// When the binary was built, if the build environment recorded it.
pub const BUILD_TIMESTAMP: Option<&str> = option_env!("BUILD_TIMESTAMP");
