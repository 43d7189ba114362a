//! Parsing of the comma-space separated file lists peers submit to the tracker.

use regex_lite::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::utils::ValidationError;

pub const DELIMITER: &str = ", ";

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
// Whitespace is only allowed directly after a comma.
static STRAY_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^,])\s").unwrap());
static EDGE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s|\s$").unwrap());
static DRIVE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w:").unwrap());

/// A validated, non-empty list of absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileList(Vec<String>);

impl FileList {
    /// Validates a raw file list. `None` models a request that carried no list at all.
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        let raw = raw.ok_or(ValidationError::FilesNil)?;
        if raw.is_empty() {
            return Err(ValidationError::FilesEmpty);
        }
        if is_malformed(raw) {
            return Err(ValidationError::InvalidFormat);
        }

        let paths: Vec<String> = raw.split(DELIMITER).map(str::to_string).collect();
        if paths.iter().any(|p| is_malformed(p)) {
            return Err(ValidationError::InvalidFormat);
        }
        if !paths.iter().all(|p| is_absolute(p)) {
            return Err(ValidationError::NotAbsolute);
        }

        Ok(Self(paths))
    }

    pub fn paths(&self) -> &[String] {
        &self.0
    }

    pub fn into_paths(self) -> Vec<String> {
        self.0
    }
}

impl FromStr for FileList {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(Some(s))
    }
}

impl fmt::Display for FileList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(DELIMITER))
    }
}

fn is_malformed(s: &str) -> bool {
    WHITESPACE_RUN.is_match(s) || STRAY_WHITESPACE.is_match(s) || EDGE_WHITESPACE.is_match(s)
}

/// Unix absolute paths, or Windows paths starting with a drive letter.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || DRIVE_PREFIX.is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_order() {
        let list: FileList = "/a/b.txt, /c/d.txt".parse().unwrap();
        assert_eq!(list.paths(), ["/a/b.txt", "/c/d.txt"]);
        assert_eq!(list.to_string(), "/a/b.txt, /c/d.txt");
    }

    #[test]
    fn test_windows_paths() {
        let list: FileList = r"C:\share\a.txt, /b".parse().unwrap();
        assert_eq!(list.paths().len(), 2);
    }

    #[test]
    fn test_nil_and_empty() {
        assert_eq!(FileList::parse(None), Err(ValidationError::FilesNil));
        assert_eq!(FileList::parse(Some("")), Err(ValidationError::FilesEmpty));
    }

    #[test]
    fn test_irregular_spacing() {
        for raw in [
            "/p1,  /p2 ",
            "/p1,  /p2",
            " /p1",
            "/p1 ",
            "/p1 ,/p2",
            "/my file",
            "/p1, /p2\n",
        ] {
            assert_eq!(
                FileList::parse(Some(raw)),
                Err(ValidationError::InvalidFormat),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn test_relative_paths() {
        assert_eq!(
            FileList::parse(Some("rel/path")),
            Err(ValidationError::NotAbsolute)
        );
        assert_eq!(
            FileList::parse(Some("/ok, rel")),
            Err(ValidationError::NotAbsolute)
        );
        // ", , " leaves an empty element behind
        assert_eq!(
            FileList::parse(Some("/a, , /b")),
            Err(ValidationError::NotAbsolute)
        );
    }

    #[test]
    fn test_format_checked_before_absoluteness() {
        assert_eq!(
            FileList::parse(Some("rel,  other")),
            Err(ValidationError::InvalidFormat)
        );
    }
}
