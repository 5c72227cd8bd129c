use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::config::AccessConfig;

/// Errors that can occur during path authorization
#[derive(Debug, thiserror::Error)]
pub enum PathSecurityError {
    #[error("Path contains a null byte")]
    NullByte,

    #[error("Absolute paths are not allowed: '{path}'")]
    AbsolutePath { path: String },

    #[error("Path '{path}' traverses above the base directory")]
    ParentTraversal { path: String },

    #[error("Path is empty")]
    EmptyPath,

    #[error("Top-level directory '{name}' is not in the allow-list")]
    NotInAllowList { name: String },

    #[error("Path '{path}' resolves outside base directory '{root}'")]
    OutsideRootDirectory { path: PathBuf, root: PathBuf },

    #[error("Cannot resolve path '{path}': {error}")]
    CannotCanonicalize { path: PathBuf, error: io::Error },
}

/// A relative path that passed [`AccessPolicy::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedPath {
    relative: String,
    resolved: PathBuf,
}

impl AuthorizedPath {
    /// Normalized relative form, `/` separated, first segment in the allow-list.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Canonical absolute path under the resolved base directory.
    pub fn resolved(&self) -> &Path {
        &self.resolved
    }
}

/// Immutable read-access policy: a trusted base directory plus the
/// top-level directory names under it that callers may read.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    base_dir: PathBuf,
    read_dirs: Vec<String>,
}

impl AccessPolicy {
    pub fn new<I, S>(base_dir: impl Into<PathBuf>, read_dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_dir: base_dir.into(),
            read_dirs: read_dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the policy from the access section of the server configuration.
    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.base_dir.clone(), config.read_dirs.iter().cloned())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn read_dirs(&self) -> &[String] {
        &self.read_dirs
    }

    /// Shorthand for callers that only need the yes/no answer.
    pub fn is_allowed(&self, candidate: &str) -> bool {
        self.authorize(candidate).is_ok()
    }

    /// Decides whether `candidate` may be read and resolves it.
    ///
    /// The candidate is normalized lexically (`/` and `\` both separate,
    /// `.` is dropped, `..` pops), must stay relative, and its first segment
    /// must literally appear in the allow-list. The joined path is then
    /// resolved through symlinks and must still lie under the resolved base
    /// directory. Trailing components that do not exist yet are kept as-is
    /// so the caller can report them as missing; every other I/O failure
    /// denies access.
    pub fn authorize(&self, candidate: &str) -> Result<AuthorizedPath, PathSecurityError> {
        if candidate.contains('\0') {
            return Err(PathSecurityError::NullByte);
        }

        if is_absolute(candidate) {
            return Err(PathSecurityError::AbsolutePath {
                path: candidate.to_string(),
            });
        }

        let segments = normalize(candidate);
        let Some(&first) = segments.first() else {
            return Err(PathSecurityError::EmptyPath);
        };

        if first == ".." {
            return Err(PathSecurityError::ParentTraversal {
                path: candidate.to_string(),
            });
        }

        if !self.read_dirs.iter().any(|dir| dir == first) {
            return Err(PathSecurityError::NotInAllowList {
                name: first.to_string(),
            });
        }

        let root = self
            .base_dir
            .canonicalize()
            .map_err(|e| PathSecurityError::CannotCanonicalize {
                path: self.base_dir.clone(),
                error: e,
            })?;

        let joined = segments.iter().fold(root.clone(), |path, s| path.join(s));
        let resolved =
            resolve_lenient(&joined).map_err(|e| PathSecurityError::CannotCanonicalize {
                path: joined.clone(),
                error: e,
            })?;

        if !resolved.starts_with(&root) {
            return Err(PathSecurityError::OutsideRootDirectory {
                path: resolved,
                root,
            });
        }

        debug!("Authorized '{}' as {:?}", candidate, resolved);

        Ok(AuthorizedPath {
            relative: segments.join("/"),
            resolved,
        })
    }
}

/// Leading separator, root or drive prefix (`C:`) on any platform.
fn is_absolute(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    candidate.starts_with(['/', '\\'])
        || Path::new(candidate).is_absolute()
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Lexically collapses `.`, `..` and repeated separators.
///
/// A `..` that cannot pop anything is kept, so an escape attempt always
/// surfaces as a leading `..` segment.
fn normalize(candidate: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in candidate.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            s => segments.push(s),
        }
    }
    segments
}

/// Canonicalizes the deepest existing ancestor of `path` and re-appends the
/// missing tail.
fn resolve_lenient(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path;
    let mut missing: Vec<&OsStr> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev().copied());
                return Ok(resolved);
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
                    return Err(e);
                };
                missing.push(name);
                existing = parent;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AccessPolicy) {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir(base.join("www")).unwrap();
        fs::create_dir(base.join("themes")).unwrap();
        fs::create_dir(base.join("secrets")).unwrap();
        fs::write(base.join("secrets").join("token"), "hunter2").unwrap();

        let policy = AccessPolicy::new(base, ["www", "themes", "custom_templates"]);
        (temp_dir, policy)
    }

    #[test]
    fn test_normalize_collapses_segments() {
        assert_eq!(normalize("www/./css//x"), vec!["www", "css", "x"]);
        assert_eq!(normalize("www/css/../js"), vec!["www", "js"]);
        assert_eq!(normalize("www\\css"), vec!["www", "css"]);
        assert_eq!(normalize("../secret"), vec!["..", "secret"]);
        assert_eq!(normalize("www/../../secret"), vec!["..", "secret"]);
        assert!(normalize("").is_empty());
        assert!(normalize("./").is_empty());
    }

    #[test]
    fn test_allowed_directory() {
        let (temp_dir, policy) = setup();

        let authorized = policy.authorize("www").unwrap();

        assert_eq!(authorized.relative(), "www");
        assert_eq!(
            authorized.resolved(),
            temp_dir.path().canonicalize().unwrap().join("www")
        );
    }

    #[test]
    fn test_normalized_into_allow_list() {
        let (_temp_dir, policy) = setup();

        let authorized = policy.authorize("./www//css/../img/").unwrap();
        assert_eq!(authorized.relative(), "www/img");

        let authorized = policy.authorize("secrets/../themes").unwrap();
        assert_eq!(authorized.relative(), "themes");
    }

    #[test]
    fn test_missing_tail_is_still_authorized() {
        let (temp_dir, policy) = setup();

        let authorized = policy.authorize("www/not/there").unwrap();

        assert_eq!(
            authorized.resolved(),
            temp_dir
                .path()
                .canonicalize()
                .unwrap()
                .join("www")
                .join("not")
                .join("there")
        );
        // Allow-listed name that does not exist on disk at all
        assert!(policy.is_allowed("custom_templates"));
    }

    #[test]
    fn test_first_segment_not_in_allow_list() {
        let (_temp_dir, policy) = setup();

        for candidate in ["secrets", "secrets/token", "wwwx", "WWW", "www2/a"] {
            assert!(
                matches!(
                    policy.authorize(candidate),
                    Err(PathSecurityError::NotInAllowList { .. })
                ),
                "{candidate} should be denied"
            );
        }
    }

    #[test]
    fn test_parent_traversal_blocked() {
        let (_temp_dir, policy) = setup();
        let permissive = AccessPolicy::new(policy.base_dir(), ["www", ".."]);

        for candidate in ["..", "../secret", "www/../../secret", "..\\secret"] {
            assert!(matches!(
                policy.authorize(candidate),
                Err(PathSecurityError::ParentTraversal { .. })
            ));
            // Even an allow-list that names ".." does not help
            assert!(!permissive.is_allowed(candidate));
        }
    }

    #[test]
    fn test_absolute_paths_blocked() {
        let (temp_dir, policy) = setup();
        let inside = temp_dir.path().join("www");

        for candidate in ["/etc", "\\www", "C:\\www", "c:www", inside.to_str().unwrap()] {
            assert!(matches!(
                policy.authorize(candidate),
                Err(PathSecurityError::AbsolutePath { .. })
            ));
        }
    }

    #[test]
    fn test_empty_path_blocked() {
        let (_temp_dir, policy) = setup();

        for candidate in ["", ".", "./", "www/.."] {
            assert!(matches!(
                policy.authorize(candidate),
                Err(PathSecurityError::EmptyPath)
            ));
        }
    }

    #[test]
    fn test_null_byte_blocked() {
        let (_temp_dir, policy) = setup();
        assert!(matches!(
            policy.authorize("www/a\0b"),
            Err(PathSecurityError::NullByte)
        ));
    }

    #[test]
    fn test_missing_base_dir_denies() {
        let temp_dir = TempDir::new().unwrap();
        let policy = AccessPolicy::new(temp_dir.path().join("gone"), ["www"]);

        assert!(matches!(
            policy.authorize("www"),
            Err(PathSecurityError::CannotCanonicalize { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_top_level_outside_base_blocked() {
        use std::os::unix::fs::symlink;

        let base_dir = TempDir::new().unwrap();
        let outside_dir = TempDir::new().unwrap();
        symlink(outside_dir.path(), base_dir.path().join("www")).unwrap();

        let policy = AccessPolicy::new(base_dir.path(), ["www"]);

        assert!(matches!(
            policy.authorize("www"),
            Err(PathSecurityError::OutsideRootDirectory { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_allowed_dir_escaping_blocked() {
        use std::os::unix::fs::symlink;

        let (temp_dir, policy) = setup();
        symlink(
            temp_dir.path().join("secrets"),
            temp_dir.path().join("www").join("leak"),
        )
        .unwrap();

        // Resolves inside the base, only the allow-list check guards the rest
        assert!(policy.is_allowed("www/leak"));

        let outside_dir = TempDir::new().unwrap();
        symlink(outside_dir.path(), temp_dir.path().join("www").join("out")).unwrap();

        assert!(matches!(
            policy.authorize("www/out"),
            Err(PathSecurityError::OutsideRootDirectory { .. })
        ));
        assert!(!policy.is_allowed("www/out/anything"));
    }

    #[cfg(unix)]
    #[test]
    fn test_sibling_with_common_prefix_blocked() {
        use std::os::unix::fs::symlink;

        let parent = TempDir::new().unwrap();
        let base = parent.path().join("config");
        let sibling = parent.path().join("config2");
        fs::create_dir(&base).unwrap();
        fs::create_dir_all(sibling.join("www")).unwrap();
        symlink(sibling.join("www"), base.join("www")).unwrap();

        let policy = AccessPolicy::new(&base, ["www"]);

        assert!(!policy.is_allowed("www"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_within_base_allowed() {
        use std::os::unix::fs::symlink;

        let (temp_dir, policy) = setup();
        symlink(
            temp_dir.path().join("themes"),
            temp_dir.path().join("www").join("themes_link"),
        )
        .unwrap();

        let authorized = policy.authorize("www/themes_link").unwrap();

        assert_eq!(authorized.relative(), "www/themes_link");
        assert_eq!(
            authorized.resolved(),
            temp_dir.path().canonicalize().unwrap().join("themes")
        );
    }
}
