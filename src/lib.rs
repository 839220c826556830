pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{SetupCli, StoreCli, StoreCommand};
pub use config::ServerConfig;

pub use core::dropbox::{DropboxConfig, DropboxStorage};
pub use core::oauth::OAuthClient;
pub use core::registry::Registry;
pub use domain::model::{ListPage, ListRefsItem, Reference, StorageOpts};
pub use domain::ports::{Lister, Storage};
pub use utils::error::{ErrorKind, Result, StoreError};
