pub mod config;
pub mod logging;
pub mod paths;

pub use config::{CacheConfig, Config, FetchConfig, LoggingConfig, StoreConfig};
pub use logging::init_logging;
pub use paths::{base_path, PathManager};
