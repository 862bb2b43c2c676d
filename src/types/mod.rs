//! Core value types shared by every layer.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::BucketError;

/// Stable identity of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketId(NonZeroU32);

impl BucketId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }

    /// The id following this one, or `None` at `u32::MAX`.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    pub fn first() -> Self {
        Self(NonZeroU32::MIN)
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A normalized file extension: lower-case with exactly one leading dot.
///
/// `"PDF"`, `".pdf"` and `"*.Pdf"` all normalize to `".pdf"`. Inputs that are
/// empty after normalization, or that contain a separator, whitespace or an
/// inner dot, are rejected because they could never match a file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Extension(Box<str>);

impl Extension {
    pub fn parse(raw: &str) -> Result<Self, BucketError> {
        let trimmed = raw.trim();
        let stripped = trimmed.trim_start_matches('*').trim_start_matches('.');
        let body = stripped.to_lowercase();

        let invalid = body.is_empty()
            || body
                .chars()
                .any(|c| c == '.' || c == '/' || c == '\\' || c.is_whitespace());
        if invalid {
            return Err(BucketError::InvalidExtension(raw.to_string()));
        }

        Ok(Self(format!(".{body}").into_boxed_str()))
    }

    /// Derive the extension of a file name, if it has one.
    ///
    /// Dot-files without a further dot (`.bashrc`) and names ending in a dot
    /// have no extension.
    pub fn of_file_name(name: &str) -> Option<Self> {
        let dot = name.rfind('.')?;
        if dot == 0 || dot + 1 == name.len() {
            return None;
        }
        Self::parse(&name[dot..]).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Extension {
    type Error = BucketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Extension> for String {
    fn from(value: Extension) -> Self {
        value.0.into_string()
    }
}

/// One directory entry seen during a listing pass.
///
/// Observations are transient: they are rebuilt from a fresh listing on every
/// pass and dropped once the pass has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileObservation {
    pub name: String,
    pub extension: Option<Extension>,
    pub is_dir: bool,
}

impl FileObservation {
    pub fn file(name: impl Into<String>) -> Self {
        let name = name.into();
        let extension = Extension::of_file_name(&name);
        Self {
            name,
            extension,
            is_dir: false,
        }
    }

    /// Directories never carry an extension, so they fall to the catch-all
    /// unless an override or a name pattern claims them.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: None,
            is_dir: true,
        }
    }
}
