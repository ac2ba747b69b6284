//! Renameable names.
//!
//! Every bone, mesh, optional-item group and texture carries three names:
//! the name it was loaded with, the committed name it will be written with,
//! and an optional pending candidate produced by a rename rule.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Original / committed / pending name triple.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translatable {
    original: String,
    translated: String,
    translating: Option<String>,
}

impl Translatable {
    /// A name that has not been translated yet.
    pub fn new(name: impl Into<String>) -> Self {
        let original = name.into();
        Self {
            translated: original.clone(),
            original,
            translating: None,
        }
    }

    /// A name loaded together with an existing translation.
    pub fn with_translation(original: impl Into<String>, translated: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            translated: translated.into(),
            translating: None,
        }
    }

    pub fn original_name(&self) -> &str {
        &self.original
    }

    pub fn translated_name(&self) -> &str {
        &self.translated
    }

    pub fn translating_name(&self) -> Option<&str> {
        self.translating.as_deref()
    }

    pub fn set_translated(&mut self, name: impl Into<String>) {
        self.translated = name.into();
    }

    pub fn set_translating(&mut self, name: Option<String>) {
        self.translating = name;
    }

    /// True once the committed name differs from the loaded one.
    pub fn is_translated(&self) -> bool {
        self.original != self.translated
    }

    /// Apply `regex` to the committed name.
    ///
    /// Returns `None` when the pattern does not match. `replacement` uses the
    /// regex crate's `$1` / `${name}` capture syntax. The committed name is
    /// never modified here.
    pub fn regex_candidate(&self, regex: &Regex, replacement: &str) -> Option<String> {
        if !regex.is_match(&self.translated) {
            return None;
        }
        Some(regex.replace_all(&self.translated, replacement).into_owned())
    }

    /// Promote the pending name to the committed name.
    ///
    /// Returns true if there was a pending name.
    pub fn commit(&mut self) -> bool {
        match self.translating.take() {
            Some(name) => {
                self.translated = name;
                true
            }
            None => false,
        }
    }
}
