pub mod list_files;

pub use list_files::{ListFilesParams, ListFilesResponse, ListFilesTool};
