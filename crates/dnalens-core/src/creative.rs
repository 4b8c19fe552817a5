use std::fmt;
use std::path::{Path, PathBuf};

/// Where a creative video lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreativeRef {
    /// An `http://` or `https://` URL that must be downloaded first.
    Remote(String),
    /// A file on the local filesystem.
    Local(PathBuf),
}

impl CreativeRef {
    /// Interprets a dataset cell or request field as a creative reference.
    ///
    /// Blank values and the `N/A` placeholder mean "no creative".
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(crate::dataset::NOT_AVAILABLE) {
            return None;
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(Self::Remote(trimmed.to_owned()))
        } else {
            Some(Self::Local(PathBuf::from(trimmed)))
        }
    }

    #[must_use]
    pub fn local(path: impl AsRef<Path>) -> Self {
        Self::Local(path.as_ref().to_path_buf())
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for CreativeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => f.write_str(url),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_url_is_remote() {
        assert_eq!(
            CreativeRef::parse(" https://cdn.example.com/ad.mp4 "),
            Some(CreativeRef::Remote("https://cdn.example.com/ad.mp4".to_owned()))
        );
    }

    #[test]
    fn scheme_match_is_case_insensitive() {
        assert!(CreativeRef::parse("HTTP://cdn.example.com/ad.mp4")
            .is_some_and(|c| c.is_remote()));
    }

    #[test]
    fn plain_path_is_local() {
        assert_eq!(
            CreativeRef::parse("videos/ad.mp4"),
            Some(CreativeRef::local("videos/ad.mp4"))
        );
    }

    #[test]
    fn http_prefixed_filename_is_local() {
        assert!(CreativeRef::parse("httpdocs/ad.mp4").is_some_and(|c| !c.is_remote()));
    }

    #[test]
    fn blank_and_placeholder_are_none() {
        assert_eq!(CreativeRef::parse(""), None);
        assert_eq!(CreativeRef::parse("   "), None);
        assert_eq!(CreativeRef::parse("N/A"), None);
        assert_eq!(CreativeRef::parse("n/a"), None);
    }
}
