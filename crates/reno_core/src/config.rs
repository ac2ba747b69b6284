//! Options for loading, exporting and mirrored renames.

use serde::{Deserialize, Serialize};

use crate::skeleton::BoneId;

/// Options for loading a mesh-ascii file into a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Hang the file's root bones under this resident bone and offset every
    /// loaded position by its position
    pub append_to: Option<BoneId>,
}

/// Options for writing mesh-ascii files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Drop bones no exported mesh is weighted to (ancestors are kept)
    pub prune_unused_bones: bool,

    /// Write `# bones`, `# parent index`, ... trailing comments
    pub annotate: bool,

    /// Texture name written for render-group slots the material leaves empty
    pub placeholder_texture: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            prune_unused_bones: false,
            annotate: true,
            placeholder_texture: "missing.png".to_string(),
        }
    }
}

/// Options for mirrored bone renames.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorOptions {
    /// Per-axis tolerance when comparing bone positions
    pub tolerance: f64,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self { tolerance: 0.001 }
    }
}

/// Options for reading bone dictionaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoneDictOptions {
    /// Keep entries that match no loaded bone as name-only bones
    pub keep_unmatched: bool,
}

impl Default for BoneDictOptions {
    fn default() -> Self {
        Self { keep_unmatched: true }
    }
}
