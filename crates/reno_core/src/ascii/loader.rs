//! Loading mesh-ascii files into a session.
//!
//! Files are parsed completely before the session is touched, so a parse
//! error leaves the session as it was. Loading into a session that already
//! has bones merges skeletons: a bone whose name matches a resident bone is
//! replaced by the resident one, and meshes are weighted to it. A merge that
//! would make the hierarchy cyclic is refused before any bone is added.

use std::collections::HashMap;
use std::path::Path;

use reno_math::DVec3;
use thiserror::Error;

use super::parser::{parse_mesh_ascii, ParseError};
use super::types::{AsciiDocument, AsciiMesh};
use crate::config::LoadOptions;
use crate::material::{Material, Texture, DEFAULT_RENDER_PARAMETERS};
use crate::mesh::{Face, Mesh, OptionalItem, Vertex, VertexBone};
use crate::session::Session;
use crate::skeleton::{Bone, BoneId, SkeletonError};
use crate::translatable::Translatable;

/// Errors that can occur while loading a file into a session.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Skeleton error: {0}")]
    Skeleton(#[from] SkeletonError),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// What a load changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Bones new to the session
    pub bones_added: usize,

    /// File bones that resolved to a resident bone
    pub bones_merged: usize,

    pub meshes: usize,
    pub materials_created: usize,
}

/// How a file bone maps onto the session.
#[derive(Clone, Copy, Debug)]
enum Resolved {
    /// Resident source bone; keeps its parent
    Merged(BoneId),

    /// Dictionary-only bone taken over by the file
    Adopted(BoneId),

    New,
}

/// A bone in the merged hierarchy before anything is inserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Node {
    Resident(BoneId),

    /// Bone new to the session, by file index
    File(usize),
}

impl Session {
    /// Load a mesh-ascii file. `progress` is called once per bone and once per mesh.
    pub fn load_ascii<P: AsRef<Path>>(
        &mut self,
        path: P,
        options: &LoadOptions,
        progress: &mut dyn FnMut(),
    ) -> LoadResult<LoadSummary> {
        let path = path.as_ref();
        log::info!("Loading mesh-ascii: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        self.load_ascii_str(&content, options, progress)
    }

    /// Load mesh-ascii text.
    pub fn load_ascii_str(
        &mut self,
        content: &str,
        options: &LoadOptions,
        progress: &mut dyn FnMut(),
    ) -> LoadResult<LoadSummary> {
        let doc = parse_mesh_ascii(content)?;
        self.merge_document(doc, options, progress)
    }

    fn merge_document(
        &mut self,
        doc: AsciiDocument,
        options: &LoadOptions,
        progress: &mut dyn FnMut(),
    ) -> LoadResult<LoadSummary> {
        let offset = match options.append_to {
            Some(target) if self.skeleton.contains(target) => self
                .skeleton
                .get(target)
                .map(|bone| bone.position)
                .unwrap_or(DVec3::ZERO),
            Some(target) => return Err(SkeletonError::UnknownBone(target).into()),
            None => DVec3::ZERO,
        };

        let mut summary = LoadSummary::default();
        let plan = self.resolve_bones(&doc);
        self.check_merge_hierarchy(&doc, &plan, options.append_to)?;

        // File index -> session bone, and whether the file decides its parent
        let mut snapshot: Vec<(BoneId, bool)> = Vec::with_capacity(doc.bones.len());
        for (ascii, resolved) in doc.bones.iter().zip(&plan) {
            let position = ascii.position + offset;
            match *resolved {
                Resolved::Merged(id) => {
                    summary.bones_merged += 1;
                    snapshot.push((id, false));
                }
                Resolved::Adopted(id) => {
                    if let Some(bone) = self.skeleton.get_mut(id) {
                        bone.from_source_file = true;
                        bone.position = position;
                    }
                    summary.bones_merged += 1;
                    snapshot.push((id, true));
                }
                Resolved::New => {
                    let id = self.skeleton.insert(Bone::from_source(ascii.name.clone(), position));
                    summary.bones_added += 1;
                    snapshot.push((id, true));
                }
            }
            progress();
        }

        for (ascii, &(id, owns_parent)) in doc.bones.iter().zip(&snapshot) {
            if !owns_parent {
                continue;
            }
            let parent = match ascii.parent {
                Some(index) => Some(snapshot[index].0),
                None => options.append_to,
            };
            self.skeleton.reparent(id, parent)?;
        }

        for ascii in doc.meshes {
            let created = self.add_ascii_mesh(ascii, &snapshot);
            if created {
                summary.materials_created += 1;
            }
            summary.meshes += 1;
            progress();
        }

        self.skeleton.sort_hierarchy();

        log::info!(
            "Loaded {} bones ({} merged), {} meshes, {} new materials",
            summary.bones_added,
            summary.bones_merged,
            summary.meshes,
            summary.materials_created
        );
        Ok(summary)
    }

    /// Match every file bone against the session without changing it.
    ///
    /// Source bones match by committed name, dictionary-only bones by original
    /// name; each dictionary bone is adopted at most once.
    fn resolve_bones(&self, doc: &AsciiDocument) -> Vec<Resolved> {
        let mut by_translated: HashMap<&str, BoneId> = HashMap::new();
        let mut by_original: HashMap<&str, BoneId> = HashMap::new();
        for (id, bone) in self.skeleton.iter() {
            if bone.from_source_file {
                by_translated.entry(bone.name.translated_name()).or_insert(id);
            } else {
                by_original.entry(bone.name.original_name()).or_insert(id);
            }
        }

        doc.bones
            .iter()
            .map(|ascii| {
                if let Some(&id) = by_translated.get(ascii.name.as_str()) {
                    Resolved::Merged(id)
                } else if let Some(id) = by_original.remove(ascii.name.as_str()) {
                    Resolved::Adopted(id)
                } else {
                    Resolved::New
                }
            })
            .collect()
    }

    /// Refuse a merge whose parents would form a cycle.
    ///
    /// Only an adopted bone can close one: it takes its parent from the file
    /// while resident bones keep theirs, so an adopted bone that was edited
    /// above a merged bone would end up below it.
    fn check_merge_hierarchy(
        &self,
        doc: &AsciiDocument,
        plan: &[Resolved],
        append_to: Option<BoneId>,
    ) -> LoadResult<()> {
        let adopted: HashMap<BoneId, usize> = plan
            .iter()
            .enumerate()
            .filter_map(|(index, resolved)| match resolved {
                Resolved::Adopted(id) => Some((*id, index)),
                _ => None,
            })
            .collect();

        let node = |index: usize| match plan[index] {
            Resolved::Merged(id) | Resolved::Adopted(id) => Node::Resident(id),
            Resolved::New => Node::File(index),
        };
        let file_parent = |index: usize| match doc.bones[index].parent {
            Some(parent) => Some(node(parent)),
            None => append_to.map(Node::Resident),
        };
        let parent_of = |current: Node| match current {
            Node::File(index) => file_parent(index),
            Node::Resident(id) => match adopted.get(&id) {
                Some(&index) => file_parent(index),
                None => self.skeleton.get(id).and_then(|bone| bone.parent).map(Node::Resident),
            },
        };

        let limit = self.skeleton.iter().count() + doc.bones.len();
        for resolved in plan {
            let Resolved::Adopted(bone) = *resolved else {
                continue;
            };
            let mut current = parent_of(Node::Resident(bone));
            let mut exit = None;
            for _ in 0..limit {
                match current {
                    Some(Node::Resident(id)) if id == bone => {
                        return Err(SkeletonError::Cycle {
                            bone,
                            parent: exit.unwrap_or(bone),
                        }
                        .into());
                    }
                    Some(Node::Resident(id)) => {
                        exit.get_or_insert(id);
                    }
                    Some(Node::File(_)) => {}
                    None => break,
                }
                current = current.and_then(&parent_of);
            }
        }
        Ok(())
    }

    /// Convert one parsed mesh and register its material. Returns true if the
    /// material was new.
    fn add_ascii_mesh(&mut self, ascii: AsciiMesh, snapshot: &[(BoneId, bool)]) -> bool {
        let material = Material::from_group(
            ascii.render_group,
            ascii
                .textures
                .into_iter()
                .map(|texture| Texture::new(texture.name, texture.uv_layer)),
            ascii.render_parameters.unwrap_or(DEFAULT_RENDER_PARAMETERS),
        );
        let (material, created) = self.materials.find_or_insert(material);

        let (optional_item, base) = OptionalItem::split(&ascii.name);
        let unique = self.unique_mesh_base(optional_item.as_ref(), base);
        let mut mesh = Mesh::new(Translatable::with_translation(base, unique), material);
        mesh.optional_item = optional_item;
        mesh.uv_layers = ascii.uv_layers;

        mesh.vertices = ascii
            .vertices
            .into_iter()
            .map(|vertex| Vertex {
                position: vertex.position,
                normal: vertex.normal,
                color: vertex.color,
                uv: vertex.uv,
                uv2: vertex.uv2,
                bones: vertex
                    .bones
                    .into_iter()
                    .map(|(index, weight)| VertexBone {
                        bone: snapshot[index].0,
                        weight,
                    })
                    .collect(),
            })
            .collect();
        mesh.faces = ascii.faces.into_iter().map(Face).collect();

        log::debug!(
            "Added mesh '{}' ({} vertices) with material {:?}",
            mesh.full_translated_name(),
            mesh.vertices.len(),
            material
        );
        self.meshes.push(mesh);
        created
    }
}
