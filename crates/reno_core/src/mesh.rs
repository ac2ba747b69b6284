//! Mesh geometry as stored in mesh-ascii files.
//!
//! Vertices keep every field in the order the format writes them so a mesh
//! that is loaded and saved unchanged produces the same numbers. Bone weights
//! refer to bones by [`BoneId`]; materials are shared through the session's
//! registry and referenced by [`MaterialId`].

use std::collections::BTreeSet;

use reno_math::{DVec2, DVec3, Rgba};

use crate::material::MaterialId;
use crate::skeleton::BoneId;
use crate::translatable::Translatable;

/// One (bone, weight) influence of a vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexBone {
    pub bone: BoneId,
    pub weight: f64,
}

/// A single vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: DVec3,
    pub normal: DVec3,
    pub color: Rgba,

    /// Primary UV (absent in format variants that omit it)
    pub uv: Option<DVec2>,

    /// Second UV layer, only meaningful when the mesh has two layers
    pub uv2: Option<DVec2>,

    /// Bone influences in file order
    pub bones: Vec<VertexBone>,
}

/// Triangle as three indices into the owning mesh's vertex list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Face(pub [u32; 3]);

/// Visibility group encoded in a mesh name as `+group.rest` or `-group.rest`.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionalItem {
    /// `+` (shown by default) or `-` (hidden by default)
    pub visible: bool,

    /// Group name
    pub group: Translatable,
}

impl OptionalItem {
    /// Split `name` into an optional-item prefix and the remaining base name.
    ///
    /// Names without a sign, a dot, or with an empty group or base are
    /// returned whole.
    pub fn split(name: &str) -> (Option<OptionalItem>, &str) {
        let visible = match name.chars().next() {
            Some('+') => true,
            Some('-') => false,
            _ => return (None, name),
        };
        match name[1..].split_once('.') {
            Some((group, rest)) if !group.is_empty() && !rest.is_empty() => (
                Some(OptionalItem {
                    visible,
                    group: Translatable::new(group),
                }),
                rest,
            ),
            _ => (None, name),
        }
    }

    pub fn sign(&self) -> char {
        if self.visible {
            '+'
        } else {
            '-'
        }
    }
}

/// A mesh and its geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    /// Base name (without any optional-item prefix)
    pub name: Translatable,

    /// Optional-item prefix, if the name carried one
    pub optional_item: Option<OptionalItem>,

    /// Shared material
    pub material: MaterialId,

    /// 1 or 2
    pub uv_layers: u32,

    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,

    /// Soft delete: kept in the session but skipped on export
    pub excluded: bool,
}

impl Mesh {
    pub fn new(name: Translatable, material: MaterialId) -> Self {
        Self {
            name,
            optional_item: None,
            material,
            uv_layers: 1,
            vertices: Vec::new(),
            faces: Vec::new(),
            excluded: false,
        }
    }

    /// Name written to mesh-ascii headers, optional-item prefix included.
    pub fn full_translated_name(&self) -> String {
        Self::join(self.optional_item.as_ref(), self.name.translated_name())
    }

    /// Name the mesh was loaded with, optional-item prefix included.
    pub fn full_original_name(&self) -> String {
        match &self.optional_item {
            Some(item) => format!(
                "{}{}.{}",
                item.sign(),
                item.group.original_name(),
                self.name.original_name()
            ),
            None => self.name.original_name().to_string(),
        }
    }

    fn join(item: Option<&OptionalItem>, base: &str) -> String {
        match item {
            Some(item) => format!("{}{}.{}", item.sign(), item.group.translated_name(), base),
            None => base.to_string(),
        }
    }

    /// Paint every vertex with `color`.
    pub fn set_color(&mut self, color: Rgba) {
        for vertex in &mut self.vertices {
            vertex.color = color;
        }
    }

    /// Every bone any vertex of this mesh is weighted to.
    pub fn referenced_bones(&self) -> BTreeSet<BoneId> {
        self.vertices
            .iter()
            .flat_map(|vertex| vertex.bones.iter().map(|influence| influence.bone))
            .collect()
    }
}
