//! Files domain module.
//!
//! Read-only directory listing confined by an [`AccessPolicy`]. The MCP
//! tool in `domains/tools/definitions/fs/list_files.rs` is a thin wrapper
//! around [`DirectoryLister`].
//!
//! [`AccessPolicy`]: crate::core::security::AccessPolicy

mod error;
mod listing;

pub use error::ListError;
pub use listing::{DirectoryLister, FileEntry};
