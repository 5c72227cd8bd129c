//! Directory enumeration and name filtering.

use std::fs::{self, Metadata};
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::error::ListError;
use crate::core::config::AccessConfig;
use crate::core::security::{AccessPolicy, AuthorizedPath};

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name without any directory part.
    pub name: String,

    /// Path relative to the base directory, `/` separated.
    pub path: String,

    pub is_dir: bool,

    /// Size in bytes; 0 for anything that is not a plain file.
    pub size: u64,

    /// Last modification time in seconds since the Unix epoch.
    pub modified: f64,
}

impl FileEntry {
    fn new(name: String, parent: &AuthorizedPath, metadata: &Metadata) -> Self {
        Self {
            path: format!("{}/{}", parent.relative(), name),
            name,
            is_dir: metadata.is_dir(),
            size: if metadata.is_file() { metadata.len() } else { 0 },
            modified: metadata.modified().map(epoch_seconds).unwrap_or_default(),
        }
    }
}

/// Lists allow-listed directories.
///
/// Holds no state besides its immutable configuration, so one instance can
/// serve any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct DirectoryLister {
    policy: AccessPolicy,
    case_sensitive: bool,
}

impl DirectoryLister {
    pub fn new(policy: AccessPolicy, case_sensitive: bool) -> Self {
        Self {
            policy,
            case_sensitive,
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(
            AccessPolicy::from_config(config),
            config.pattern_case_sensitive,
        )
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// List the immediate children of `path`, optionally keeping only names
    /// that match the shell-style `pattern`.
    ///
    /// Directories come first, then files; each group is ordered by
    /// case-insensitive name. Any I/O error aborts the whole listing.
    #[instrument(skip(self), fields(base = %self.policy.base_dir().display()))]
    pub fn list(&self, path: &str, pattern: Option<&str>) -> Result<Vec<FileEntry>, ListError> {
        let authorized = self.policy.authorize(path).map_err(|reason| {
            warn!("Attempted to list files in disallowed path {}: {}", path, reason);
            ListError::NotAllowed {
                allowed: self.policy.read_dirs().to_vec(),
                reason,
            }
        })?;

        let matcher = pattern
            .filter(|p| !p.is_empty())
            .map(|p| NameMatcher::new(p, self.case_sensitive))
            .transpose()?;

        let target = authorized.resolved();
        match fs::metadata(target) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(ListError::NotADirectory(path.to_string())),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                return Err(ListError::NotFound(path.to_string()));
            }
            Err(e) => return Err(io_failure(e, path)),
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(target).map_err(|e| io_failure(e, path))? {
            let entry = entry.map_err(|e| io_failure(e, path))?;
            // A lossy name would not exist on disk, so such entries are skipped
            let Ok(name) = entry.file_name().into_string() else {
                debug!("Skipping non UTF-8 name {:?} in {}", entry.file_name(), path);
                continue;
            };

            if let Some(matcher) = &matcher
                && !matcher.matches(&name)
            {
                continue;
            }

            // Follows symlinks, so a dangling link fails the listing
            let metadata = fs::metadata(entry.path()).map_err(|e| io_failure(e, path))?;
            entries.push(FileEntry::new(name, &authorized, &metadata));
        }

        sort_entries(&mut entries);

        info!("Listed {} entries in {}", entries.len(), authorized.relative());
        Ok(entries)
    }
}

/// Shell-style name matcher (`*`, `?`, `[...]`, `[!...]`).
struct NameMatcher {
    pattern: Pattern,
    options: MatchOptions,
}

impl NameMatcher {
    fn new(pattern: &str, case_sensitive: bool) -> Result<Self, ListError> {
        let translated = shell_to_glob(pattern);
        let compiled = Pattern::new(&translated).map_err(|e| ListError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.msg.to_string(),
        })?;
        debug!("Compiled name pattern {:?} as {:?}", pattern, translated);

        Ok(Self {
            pattern: compiled,
            options: MatchOptions {
                case_sensitive,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        })
    }

    fn matches(&self, name: &str) -> bool {
        self.pattern.matches_with(name, self.options)
    }
}

/// Rewrite a shell pattern into the `glob` dialect.
///
/// `glob` reserves `**` for whole path components and rejects a `[` with no
/// closing bracket. In a file name a run of `*` is a single wildcard and an
/// unterminated `[` is a literal character.
fn shell_to_glob(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                out.push('*');
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.extend(&chars[i..=end]);
                    i = end + 1;
                }
                None => {
                    out.push_str(&Pattern::escape("["));
                    i += 1;
                }
            },
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Index of the `]` closing the class opened at `start`. A `]` right after
/// `[` or `[!` is a member of the class.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    chars[j..]
        .iter()
        .position(|&c| c == ']')
        .map(|offset| j + offset)
}

fn io_failure(error: io::Error, path: &str) -> ListError {
    warn!("Error listing files in {}: {}", path, error);
    ListError::from_io(error, path)
}

/// Directories first, then case-insensitive name; the raw name breaks ties
/// so the order never depends on enumeration order.
fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by_cached_key(|e| (!e.is_dir, e.name.to_lowercase(), e.name.clone()));
}

fn epoch_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    }
}
