//! Domains module containing business logic organized by bounded contexts.
//!
//! - **files**: allow-listed, read-only directory listing
//! - **tools**: the MCP tools that expose it to clients

pub mod files;
pub mod tools;
