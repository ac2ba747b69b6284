//! Editing session.
//!
//! A [`Session`] owns everything loaded so far: the skeleton, the meshes and
//! the material registry they share. Loading, renaming and exporting are
//! implemented on it in their own modules; this module holds the structural
//! edits a user makes between those steps.

use std::collections::{HashMap, HashSet};

use reno_math::Rgba;
use thiserror::Error;

use crate::filter::EntityFilter;
use crate::material::{Material, MaterialId, MaterialRegistry};
use crate::mesh::{Mesh, OptionalItem};
use crate::render_group::RenderGroup;
use crate::skeleton::{Bone, BoneId, Skeleton, SkeletonError};

/// Errors raised by session edits.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EditError {
    #[error("Unknown bone id {0:?}")]
    UnknownBone(BoneId),

    #[error("No mesh at index {0}")]
    UnknownMesh(usize),

    #[error("Unknown material id {0:?}")]
    UnknownMaterial(MaterialId),

    #[error("Unknown render group {0}")]
    UnknownRenderGroup(u32),

    #[error(transparent)]
    Skeleton(#[from] SkeletonError),
}

/// Result type for session edits.
pub type EditResult<T> = Result<T, EditError>;

/// Loaded skeleton, meshes and materials.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub skeleton: Skeleton,
    pub meshes: Vec<Mesh>,
    pub materials: MaterialRegistry,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every bone, mesh and material.
    pub fn unload(&mut self) {
        self.skeleton.clear();
        self.meshes.clear();
        self.materials.clear();
        log::info!("Session unloaded");
    }

    /// Add a bone named `bone<N>` under `parent`.
    pub fn add_bone(&mut self, parent: Option<BoneId>) -> EditResult<BoneId> {
        let id = self.skeleton.add_bone(parent)?;
        self.skeleton.sort_hierarchy();
        Ok(id)
    }

    /// Make `bone` the single root of the skeleton.
    pub fn make_root(&mut self, bone: BoneId) -> EditResult<()> {
        self.skeleton.make_root(bone)?;
        self.skeleton.sort_hierarchy();
        Ok(())
    }

    /// Move `bone` under `parent` (or to the top level), keeping the hierarchy acyclic.
    pub fn reparent_bone(&mut self, bone: BoneId, parent: Option<BoneId>) -> EditResult<()> {
        self.skeleton.reparent(bone, parent)?;
        self.skeleton.sort_hierarchy();
        Ok(())
    }

    fn mesh(&self, index: usize) -> EditResult<&Mesh> {
        self.meshes.get(index).ok_or(EditError::UnknownMesh(index))
    }

    fn mesh_mut(&mut self, index: usize) -> EditResult<&mut Mesh> {
        self.meshes.get_mut(index).ok_or(EditError::UnknownMesh(index))
    }

    /// Duplicate a mesh. Geometry is copied, the material is shared.
    ///
    /// The copy gets a free name and is appended; its index is returned.
    pub fn clone_mesh(&mut self, index: usize) -> EditResult<usize> {
        let mut copy = self.mesh(index)?.clone();
        let base = self.unique_mesh_base(copy.optional_item.as_ref(), copy.name.translated_name());
        copy.name.set_translated(base);
        copy.name.set_translating(None);
        self.meshes.push(copy);
        Ok(self.meshes.len() - 1)
    }

    /// Remove a mesh, dropping its material if nothing else uses it.
    pub fn delete_mesh(&mut self, index: usize) -> EditResult<Mesh> {
        self.mesh(index)?;
        let mesh = self.meshes.remove(index);
        self.release_material(mesh.material);
        Ok(mesh)
    }

    /// Point a mesh at an existing material.
    pub fn assign_material(&mut self, index: usize, material: MaterialId) -> EditResult<()> {
        if self.materials.get(material).is_none() {
            return Err(EditError::UnknownMaterial(material));
        }
        let mesh = self.mesh_mut(index)?;
        let previous = std::mem::replace(&mut mesh.material, material);
        if previous != material {
            self.release_material(previous);
        }
        Ok(())
    }

    /// Give a mesh its own empty material.
    pub fn detach_material(&mut self, index: usize) -> EditResult<MaterialId> {
        self.mesh(index)?;
        let id = self.materials.insert(Material::default());
        let previous = std::mem::replace(&mut self.meshes[index].material, id);
        self.release_material(previous);
        Ok(id)
    }

    /// Move a material's textures onto the slots of another render group.
    pub fn retarget_material(&mut self, material: MaterialId, render_group_id: u32) -> EditResult<()> {
        let group =
            RenderGroup::by_id(render_group_id).ok_or(EditError::UnknownRenderGroup(render_group_id))?;
        self.materials
            .get_mut(material)
            .ok_or(EditError::UnknownMaterial(material))?
            .retarget(group);
        Ok(())
    }

    /// Paint every vertex of a mesh.
    pub fn set_mesh_color(&mut self, index: usize, color: Rgba) -> EditResult<()> {
        self.mesh_mut(index)?.set_color(color);
        Ok(())
    }

    fn release_material(&mut self, material: MaterialId) {
        if !self.meshes.iter().any(|mesh| mesh.material == material) {
            self.materials.remove(material);
            log::debug!("Released unused material {:?}", material);
        }
    }

    /// Source-file bones whose committed name is shared with another one.
    pub fn bone_conflicts(&self) -> Vec<BoneId> {
        let bones: Vec<(BoneId, &Bone)> = self
            .skeleton
            .iter()
            .filter(|(_, bone)| bone.from_source_file)
            .collect();
        duplicates(bones.iter().map(|(id, bone)| (*id, bone.name.translated_name().to_string())))
    }

    /// Meshes whose full committed name is shared with another mesh.
    pub fn mesh_conflicts(&self) -> Vec<usize> {
        duplicates(
            self.meshes
                .iter()
                .enumerate()
                .map(|(i, mesh)| (i, mesh.full_translated_name())),
        )
    }

    /// Materials in use that resolve to no render group.
    pub fn invalid_materials(&self) -> Vec<MaterialId> {
        self.materials
            .iter()
            .filter(|(id, material)| {
                !material.is_valid() && self.meshes.iter().any(|mesh| mesh.material == *id)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Bones kept by pruning: everything a non-excluded mesh is weighted to,
    /// plus ancestors.
    pub fn retained_bones(&self) -> Vec<BoneId> {
        let referenced = self
            .meshes
            .iter()
            .filter(|mesh| !mesh.excluded)
            .flat_map(|mesh| mesh.referenced_bones());
        self.skeleton.with_ancestors(referenced)
    }

    /// Drop source-file bones no exported mesh needs. Returns the number removed.
    ///
    /// Dictionary-only bones are left alone; they are never exported anyway.
    pub fn prune_unused_bones(&mut self) -> usize {
        let mut keep: HashSet<BoneId> = self.retained_bones().into_iter().collect();
        keep.extend(
            self.skeleton
                .iter()
                .filter(|(_, bone)| !bone.from_source_file)
                .map(|(id, _)| id),
        );
        let removed = self.skeleton.retain(&keep);
        log::info!("Pruned {} unused bones", removed);
        removed
    }

    /// Exclude predicate for bone renames built from a filter.
    pub fn bone_exclusion(&self, filter: &EntityFilter) -> impl Fn(&Bone) -> bool {
        let filter = filter.clone();
        let conflicting: HashSet<String> = self
            .bone_conflicts()
            .into_iter()
            .filter_map(|id| self.skeleton.get(id))
            .map(|bone| bone.name.translated_name().to_string())
            .collect();
        move |bone: &Bone| {
            let clashes = bone.from_source_file && conflicting.contains(bone.name.translated_name());
            filter.excludes(&bone.name, clashes)
        }
    }

    /// Exclude predicate for mesh and optional-item renames built from a filter.
    pub fn mesh_exclusion(&self, filter: &EntityFilter) -> impl Fn(&Mesh) -> bool {
        let filter = filter.clone();
        let conflicting: HashSet<String> = self
            .mesh_conflicts()
            .into_iter()
            .map(|i| self.meshes[i].full_translated_name())
            .collect();
        move |mesh: &Mesh| filter.excludes(&mesh.name, conflicting.contains(&mesh.full_translated_name()))
    }

    /// First free base name for a mesh: `base`, then `base-1`, `base-2`, ...
    ///
    /// Freedom is checked against the full committed names of every mesh.
    pub fn unique_mesh_base(&self, item: Option<&OptionalItem>, base: &str) -> String {
        let taken: HashSet<String> = self.meshes.iter().map(Mesh::full_translated_name).collect();
        let full = |candidate: &str| match item {
            Some(item) => format!("{}{}.{}", item.sign(), item.group.translated_name(), candidate),
            None => candidate.to_string(),
        };
        if !taken.contains(&full(base)) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| !taken.contains(&full(candidate)))
            .unwrap_or_else(|| base.to_string())
    }
}

/// Keys whose name occurs more than once, in input order.
fn duplicates<K: Copy>(entries: impl Iterator<Item = (K, String)>) -> Vec<K> {
    let entries: Vec<(K, String)> = entries.collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, name) in &entries {
        *counts.entry(name.as_str()).or_default() += 1;
    }
    entries
        .iter()
        .filter(|(_, name)| counts[name.as_str()] > 1)
        .map(|(key, _)| *key)
        .collect()
}
