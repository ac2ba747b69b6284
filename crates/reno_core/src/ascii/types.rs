//! Parsed file contents, before they are merged into a session.
//!
//! Bone references are still file-local indices here; the loader maps them
//! onto session bones.

use reno_math::{DVec2, DVec3, Rgba};

use crate::render_group::RenderGroup;

/// A bone triplet from the bone section.
#[derive(Clone, Debug, PartialEq)]
pub struct AsciiBone {
    /// Cleaned name
    pub name: String,

    /// Index of the parent within the file, `None` for `-1`
    pub parent: Option<usize>,

    pub position: DVec3,
}

/// A texture slot entry of a mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct AsciiTexture {
    /// Cleaned name (underscores kept)
    pub name: String,

    pub uv_layer: u32,
}

/// A vertex with file-local bone indices.
#[derive(Clone, Debug, PartialEq)]
pub struct AsciiVertex {
    pub position: DVec3,
    pub normal: DVec3,
    pub color: Rgba,
    pub uv: Option<DVec2>,
    pub uv2: Option<DVec2>,

    /// (bone index, weight) pairs
    pub bones: Vec<(usize, f64)>,
}

/// A mesh block.
#[derive(Clone, Debug)]
pub struct AsciiMesh {
    /// Catalog entry named by the header id
    pub render_group: &'static RenderGroup,

    /// Cleaned name, optional-item prefix included
    pub name: String,

    /// Parameters from the header, if it had them
    pub render_parameters: Option<[f32; 3]>,

    pub uv_layers: u32,
    pub textures: Vec<AsciiTexture>,
    pub vertices: Vec<AsciiVertex>,
    pub faces: Vec<[u32; 3]>,
}

/// A whole mesh-ascii file.
#[derive(Clone, Debug, Default)]
pub struct AsciiDocument {
    pub bones: Vec<AsciiBone>,
    pub meshes: Vec<AsciiMesh>,
}

/// One line of a pose file.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseEntry {
    pub name: String,
    pub rotation: DVec3,
    pub position: DVec3,
    pub scale: DVec3,
}

/// One `original;translated` line of a bone dictionary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DictEntry {
    pub original: String,
    pub translated: String,
}
