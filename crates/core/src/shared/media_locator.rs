use std::fmt;
use std::path::{Path, PathBuf};

use crate::shared::constants::TEST_PATTERN_SCHEME;
use crate::shared::error::PlayerError;

/// A resolved media source.
///
/// Local files are checked for existence up front so an unreachable path
/// fails at load time; remote URLs are handed to the media framework as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaLocator {
    File(PathBuf),
    Url(String),
    /// Synthetic source, e.g. `testsrc://bars?duration=10&fps=30`.
    TestPattern { name: String, query: String },
}

impl MediaLocator {
    pub fn parse(raw: &str) -> Result<Self, PlayerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PlayerError::SourceUnavailable(
                "empty source locator".to_string(),
            ));
        }

        let Some((scheme, rest)) = trimmed.split_once("://") else {
            return Self::local_file(PathBuf::from(trimmed));
        };

        if !is_valid_scheme(scheme) {
            return Err(PlayerError::SourceUnavailable(format!(
                "malformed locator: {trimmed}"
            )));
        }

        let scheme = scheme.to_ascii_lowercase();
        match scheme.as_str() {
            "file" => {
                let rest = rest.strip_prefix("localhost").unwrap_or(rest);
                let decoded = urlencoding::decode(rest).map_err(|e| {
                    PlayerError::SourceUnavailable(format!("malformed file URL {trimmed}: {e}"))
                })?;
                Self::local_file(PathBuf::from(decoded.into_owned()))
            }
            TEST_PATTERN_SCHEME => {
                let (name, query) = rest.split_once('?').unwrap_or((rest, ""));
                Ok(MediaLocator::TestPattern {
                    name: name.trim_end_matches('/').to_string(),
                    query: query.to_string(),
                })
            }
            _ if rest.is_empty() => Err(PlayerError::SourceUnavailable(format!(
                "malformed locator: {trimmed}"
            ))),
            _ => Ok(MediaLocator::Url(trimmed.to_string())),
        }
    }

    fn local_file(path: PathBuf) -> Result<Self, PlayerError> {
        if path.as_os_str().is_empty() {
            return Err(PlayerError::SourceUnavailable(
                "empty file path".to_string(),
            ));
        }
        if !path.is_file() {
            return Err(PlayerError::SourceUnavailable(format!(
                "file not found: {}",
                path.display()
            )));
        }
        Ok(MediaLocator::File(path))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            MediaLocator::File(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_test_pattern(&self) -> bool {
        matches!(self, MediaLocator::TestPattern { .. })
    }

    /// Looks up a `key=value` pair in a test pattern query.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        let MediaLocator::TestPattern { query, .. } = self else {
            return None;
        };
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for MediaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaLocator::File(path) => write!(f, "{}", path.display()),
            MediaLocator::Url(url) => write!(f, "{url}"),
            MediaLocator::TestPattern { name, query } if query.is_empty() => {
                write!(f, "{TEST_PATTERN_SCHEME}://{name}")
            }
            MediaLocator::TestPattern { name, query } => {
                write!(f, "{TEST_PATTERN_SCHEME}://{name}?{query}")
            }
        }
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    #[case::bad_scheme("1http://example.com/a.mp4")]
    #[case::empty_scheme("://example.com")]
    #[case::no_body("https://")]
    #[case::missing_file("/definitely/not/here.mp4")]
    #[case::missing_file_url("file:///definitely/not/here.mp4")]
    fn test_rejects_malformed_or_unreachable(#[case] raw: &str) {
        let err = MediaLocator::parse(raw).unwrap_err();
        assert!(matches!(err, PlayerError::SourceUnavailable(_)), "{raw}: {err}");
    }

    #[test]
    fn test_parses_existing_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();
        let locator = MediaLocator::parse(path.to_str().unwrap()).unwrap();
        assert_eq!(locator.as_path(), Some(path.as_path()));
    }

    #[test]
    fn test_file_url_is_percent_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my clip.mp4");
        std::fs::write(&path, b"x").unwrap();
        let url = format!("file://{}", path.to_str().unwrap().replace(' ', "%20"));
        let locator = MediaLocator::parse(&url).unwrap();
        assert_eq!(locator, MediaLocator::File(path));
    }

    #[test]
    fn test_remote_url_is_kept_verbatim() {
        let locator = MediaLocator::parse("https://example.com/video.mp4").unwrap();
        assert_eq!(
            locator,
            MediaLocator::Url("https://example.com/video.mp4".to_string())
        );
        assert!(locator.as_path().is_none());
    }

    #[test]
    fn test_test_pattern_query_params() {
        let locator = MediaLocator::parse("testsrc://bars?duration=10&fps=25").unwrap();
        assert!(locator.is_test_pattern());
        assert_eq!(locator.query_param("duration"), Some("10"));
        assert_eq!(locator.query_param("fps"), Some("25"));
        assert_eq!(locator.query_param("width"), None);
        assert_eq!(locator.to_string(), "testsrc://bars?duration=10&fps=25");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let locator = MediaLocator::parse("TESTSRC://bars").unwrap();
        assert!(locator.is_test_pattern());
    }
}
