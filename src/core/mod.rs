pub mod classify;
pub mod dropbox;
pub mod oauth;
pub mod registry;
pub mod wire;

pub use crate::domain::model::{ListPage, ListRefsItem, Reference, StorageOpts};
pub use crate::domain::ports::{Lister, Storage};
pub use crate::utils::error::Result;
