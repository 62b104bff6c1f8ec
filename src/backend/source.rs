//! Source locator parsing

use crate::utils::error::{AvMediaError, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

/// A validated media source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Remote or scheme-qualified locator
    Url(Url),

    /// Local file path
    File(PathBuf),
}

impl MediaSource {
    /// Parse a locator string
    ///
    /// Anything containing `://` must be a well-formed URL; everything else is
    /// taken as a filesystem path.
    pub fn parse(locator: &str) -> Result<Self> {
        if locator.trim().is_empty() {
            return Err(AvMediaError::InvalidSource("Empty path".to_string()));
        }

        if locator.contains("://") {
            Url::parse(locator)
                .map(MediaSource::Url)
                .map_err(|e| AvMediaError::InvalidSource(format!("{}: {}", locator, e)))
        } else {
            Ok(MediaSource::File(PathBuf::from(locator)))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, MediaSource::Url(url) if url.scheme() != "file")
    }
}

impl FromStr for MediaSource {
    type Err = AvMediaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Url(url) => write!(f, "{}", url),
            MediaSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}
