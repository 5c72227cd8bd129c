//! Files MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing one tool, `list_files`,
//! which lists directories under a trusted base directory. Only a fixed
//! allow-list of top-level subdirectories is reachable, and every path is
//! resolved through symlinks before it is trusted.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, path security, server and transports
//! - **domains**: business logic organized by bounded contexts
//!   - **files**: directory enumeration, filtering and ordering
//!   - **tools**: MCP tool definitions, router and registry
//!
//! # Example
//!
//! ```rust,no_run
//! use files_mcp_server::domains::files::DirectoryLister;
//! use files_mcp_server::core::AccessPolicy;
//!
//! let policy = AccessPolicy::new("/config", ["www", "themes"]);
//! let lister = DirectoryLister::new(policy, true);
//! for entry in lister.list("www", Some("*.png"))? {
//!     println!("{} ({} bytes)", entry.path, entry.size);
//! }
//! # Ok::<(), files_mcp_server::domains::files::ListError>(())
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
