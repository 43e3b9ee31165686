//! Shared primitives for the visual check crates: geometry, owned pixel
//! buffers and identifiers.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

pub mod geometry;
pub mod pixels;

pub use geometry::{IgnoreMap, IgnoreStrategy, Rect};
pub use pixels::CapturedImage;

/// Error raised by the shared primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("pixel buffer of {len} bytes does not fit a {width}x{height} RGBA image")]
    InvalidImage { width: u32, height: u32, len: usize },
    #[error("invalid rectangle: {0}")]
    InvalidRect(String),
    #[error("invalid baseline name: {0}")]
    InvalidBaselineKey(String),
    #[error("image codec failure: {0}")]
    Codec(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Name a baseline image is stored under.
///
/// Keys double as file stems for file-backed stores, so path separators and
/// parent references are rejected up front.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BaselineKey(String);

impl BaselineKey {
    pub fn parse(name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidBaselineKey("name is empty".into()));
        }
        if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
            return Err(CoreError::InvalidBaselineKey(format!(
                "'{trimmed}' must not contain path components"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaselineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation id for one check invocation.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CheckId(pub String);

impl CheckId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for CheckId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_key_trims_and_rejects_paths() {
        assert_eq!(BaselineKey::parse("  home ").unwrap().as_str(), "home");
        assert!(BaselineKey::parse("").is_err());
        assert!(BaselineKey::parse("a/b").is_err());
        assert!(BaselineKey::parse("..").is_err());
        assert!(BaselineKey::parse("c:\\x").is_err());
    }

    #[test]
    fn check_ids_are_unique() {
        assert_ne!(CheckId::new(), CheckId::new());
    }
}
