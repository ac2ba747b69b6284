//! Entity filters.
//!
//! A filter selects which bones, meshes or textures a rename touches. Rename
//! and commit calls take an *exclude* predicate; [`EntityFilter::excludes`]
//! is the usual way to build one.

use serde::{Deserialize, Serialize};

use crate::translatable::Translatable;

/// Name-based selection of entities.
///
/// Empty fields do not restrict anything. Text matches are case-insensitive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityFilter {
    /// Original name must contain this text
    pub original_contains: String,

    /// Committed name must contain this text
    pub translated_contains: String,

    /// Only entities whose committed name still equals the original
    pub only_untranslated: bool,

    /// Only entities whose committed name clashes with another entity's
    pub only_conflicting: bool,
}

impl EntityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` passes the filter.
    ///
    /// `conflicting` tells whether the entity currently shares its committed
    /// name with another entity of the same kind.
    pub fn matches(&self, name: &Translatable, conflicting: bool) -> bool {
        contains(name.original_name(), &self.original_contains)
            && contains(name.translated_name(), &self.translated_contains)
            && (!self.only_untranslated || !name.is_translated())
            && (!self.only_conflicting || conflicting)
    }

    /// Negation of [`EntityFilter::matches`], in the shape rename calls expect.
    pub fn excludes(&self, name: &Translatable, conflicting: bool) -> bool {
        !self.matches(name, conflicting)
    }

    /// True when the filter lets everything through.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}
