// Security module for path authorization
//
// Every filesystem read goes through an `AccessPolicy`, which confines
// callers to allow-listed top-level directories of a trusted base directory.

pub mod path_validator;

pub use path_validator::{AccessPolicy, AuthorizedPath, PathSecurityError};
