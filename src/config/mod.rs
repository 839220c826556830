#[cfg(feature = "cli")]
pub mod cli;
pub mod store_config;

#[cfg(feature = "cli")]
pub use cli::{SetupCli, StoreCli, StoreCommand};
pub use store_config::ServerConfig;
