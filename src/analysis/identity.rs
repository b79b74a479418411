//! Repository identity parsing and validation
//!
//! A [`RepositoryIdentity`] is the lookup key for every stage of the pipeline:
//! the clone URL, the metadata requests, the cache and the summary store.
//! Both parts are checked against a restricted character set before any I/O
//! happens, because they end up on a `git` command line and inside URLs.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Longest owner or repository name accepted
pub const MAX_NAME_LEN: usize = 255;

/// Characters that are never accepted, even before the charset check
const UNSAFE_CHARS: &[char] = &[
    ';', '|', '&', '$', '`', '(', ')', '{', '}', '[', ']', '<', '>', '"', '\'',
];

static SAFE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("name pattern is a valid regex"));

/// Owner/name pair identifying a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    owner: String,
    name: String,
}

impl RepositoryIdentity {
    /// Validates and builds an identity from its two parts
    ///
    /// Surrounding whitespace is trimmed. Both parts must be non-empty, at most
    /// [`MAX_NAME_LEN`] characters, free of shell metacharacters, limited to
    /// `[A-Za-z0-9._-]`, and neither may be `.` or `..`.
    pub fn new(owner: &str, name: &str) -> Result<Self, ValidationError> {
        let owner = validate_part(owner, "username")?;
        let name = validate_part(name, "repo")?;
        Ok(Self { owner, name })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name` form used as a cache and database key
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Clone URL below the given base, e.g. `https://github.com/owner/name.git`
    pub fn clone_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}.git",
            base_url.trim_end_matches('/'),
            self.owner,
            self.name
        )
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryIdentity {
    type Err = ValidationError;

    /// Parses `owner/name`, `github:owner/name` or `https://github.com/owner/name(.git)`
    fn from_str(reference: &str) -> Result<Self, Self::Err> {
        let trimmed = reference.trim();
        let path = if let Some(rest) = trimmed.strip_prefix("https://github.com/") {
            rest
        } else if let Some(rest) = trimmed.strip_prefix("github:") {
            rest
        } else if trimmed.contains("://") {
            return Err(ValidationError::Unparsable(trimmed.to_string()));
        } else {
            trimmed
        };

        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        match path.split_once('/') {
            Some((owner, name)) if !name.contains('/') => Self::new(owner, name),
            _ => Err(ValidationError::Unparsable(trimmed.to_string())),
        }
    }
}

fn validate_part(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_NAME_LEN,
        });
    }
    if value.contains(UNSAFE_CHARS) || !SAFE_NAME.is_match(value) || value == "." || value == ".." {
        return Err(ValidationError::UnsafeCharacters(field));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        let id = RepositoryIdentity::new("rust-lang", "rust.vim").unwrap();
        assert_eq!(id.owner(), "rust-lang");
        assert_eq!(id.name(), "rust.vim");
        assert_eq!(id.key(), "rust-lang/rust.vim");
    }

    #[test]
    fn test_rejects_shell_metacharacters() {
        for bad in ["foo;rm", "a|b", "$(x)", "a`b`", "a&b", "x>y", "it's"] {
            assert_eq!(
                RepositoryIdentity::new("owner", bad),
                Err(ValidationError::UnsafeCharacters("repo")),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_traversal_and_blank() {
        assert!(RepositoryIdentity::new("..", "repo").is_err());
        assert!(RepositoryIdentity::new("owner", ".").is_err());
        assert!(RepositoryIdentity::new("owner", "a/b").is_err());
        assert_eq!(
            RepositoryIdentity::new("   ", "repo"),
            Err(ValidationError::Missing("username"))
        );
    }

    #[test]
    fn test_rejects_overlong_names() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            RepositoryIdentity::new(&long, "repo"),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parses_reference_formats() {
        for reference in [
            "tokio-rs/tokio",
            "github:tokio-rs/tokio",
            "https://github.com/tokio-rs/tokio",
            "https://github.com/tokio-rs/tokio.git",
            "https://github.com/tokio-rs/tokio/",
        ] {
            let id: RepositoryIdentity = reference.parse().unwrap();
            assert_eq!(id.key(), "tokio-rs/tokio", "{reference}");
        }

        assert!("https://gitlab.com/a/b".parse::<RepositoryIdentity>().is_err());
        assert!("a/b/c".parse::<RepositoryIdentity>().is_err());
        assert!("justone".parse::<RepositoryIdentity>().is_err());
    }

    #[test]
    fn test_clone_url() {
        let id = RepositoryIdentity::new("octo", "cat").unwrap();
        assert_eq!(
            id.clone_url("https://github.com/"),
            "https://github.com/octo/cat.git"
        );
    }
}
