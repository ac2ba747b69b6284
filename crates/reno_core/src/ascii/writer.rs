//! Validated mesh-ascii export.
//!
//! Export is refused when the output would be ambiguous: two exported bones
//! or two exported meshes with the same name, a material that maps to no
//! render group, or a vertex weighted to a bone outside the exported set.
//! Validation runs before the file is created, so a refused export leaves
//! nothing behind.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::config::ExportOptions;
use crate::mesh::Mesh;
use crate::session::Session;
use crate::skeleton::{BoneId, Skeleton};

/// Errors that can occur while writing files.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for write operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Everything that keeps a session from being exported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportConflicts {
    /// Bone names used by more than one exported bone
    pub bones: Vec<String>,

    /// Mesh names used by more than one exported mesh
    pub meshes: Vec<String>,

    /// Meshes whose material resolves to no render group
    pub invalid_materials: Vec<String>,

    /// Meshes weighted to bones that are not exported
    pub missing_bones: Vec<String>,
}

impl ExportConflicts {
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
            && self.meshes.is_empty()
            && self.invalid_materials.is_empty()
            && self.missing_bones.is_empty()
    }
}

/// Outcome of an export call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportReport {
    /// The file was written
    Written { bones: usize, meshes: usize },

    /// Nothing was written
    Blocked(ExportConflicts),
}

impl ExportReport {
    pub fn is_written(&self) -> bool {
        matches!(self, ExportReport::Written { .. })
    }
}

/// Names that occur more than once, each reported once, in first-seen order.
fn repeated<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        if !seen.insert(name) && reported.insert(name) {
            out.push(name.to_string());
        }
    }
    out
}

impl Session {
    /// Bones written to mesh-ascii and pose files, in write order.
    pub fn export_bones(&self, options: &ExportOptions) -> Vec<BoneId> {
        let retained: Option<HashSet<BoneId>> = options
            .prune_unused_bones
            .then(|| self.retained_bones().into_iter().collect());
        self.skeleton
            .iter()
            .filter(|(_, bone)| bone.from_source_file)
            .filter(|(id, _)| retained.as_ref().map_or(true, |keep| keep.contains(id)))
            .map(|(id, _)| id)
            .collect()
    }

    /// Meshes written to mesh-ascii files.
    pub fn export_meshes(&self) -> impl Iterator<Item = &Mesh> + '_ {
        self.meshes.iter().filter(|mesh| !mesh.excluded)
    }

    /// Check whether the session can be exported with `options`.
    pub fn validate_export(&self, options: &ExportOptions) -> ExportConflicts {
        let bones = self.export_bones(options);
        let exported: HashSet<BoneId> = bones.iter().copied().collect();

        let bone_names = bones
            .iter()
            .filter_map(|&id| self.skeleton.get(id))
            .map(|bone| bone.name.translated_name());
        let mesh_names: Vec<String> = self.export_meshes().map(Mesh::full_translated_name).collect();

        let mut conflicts = ExportConflicts {
            bones: repeated(bone_names),
            meshes: repeated(mesh_names.iter().map(String::as_str)),
            ..Default::default()
        };

        for (mesh, name) in self.export_meshes().zip(mesh_names) {
            let valid = self.materials.get(mesh.material).map_or(false, |m| m.is_valid());
            if !valid {
                conflicts.invalid_materials.push(name.clone());
            }
            if mesh.referenced_bones().iter().any(|id| !exported.contains(id)) {
                conflicts.missing_bones.push(name);
            }
        }
        conflicts
    }

    /// Write mesh-ascii to `path`, unless validation fails.
    pub fn export_ascii<P: AsRef<Path>>(
        &self,
        path: P,
        options: &ExportOptions,
        progress: &mut dyn FnMut(),
    ) -> WriteResult<ExportReport> {
        let conflicts = self.validate_export(options);
        if !conflicts.is_empty() {
            log::warn!("Export blocked: {:?}", conflicts);
            return Ok(ExportReport::Blocked(conflicts));
        }

        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        let report = self.write_ascii(&mut out, options, progress)?;
        out.flush()?;
        log::info!("Exported mesh-ascii: {}", path.display());
        Ok(report)
    }

    /// Write mesh-ascii to any writer, unless validation fails.
    ///
    /// `progress` is called once per bone and once per mesh.
    pub fn write_ascii<W: Write>(
        &self,
        out: &mut W,
        options: &ExportOptions,
        progress: &mut dyn FnMut(),
    ) -> WriteResult<ExportReport> {
        let conflicts = self.validate_export(options);
        if !conflicts.is_empty() {
            return Ok(ExportReport::Blocked(conflicts));
        }

        let note = |comment: &str| {
            if options.annotate {
                format!(" # {}", comment)
            } else {
                String::new()
            }
        };

        let bones = self.export_bones(options);
        let index = Skeleton::index_map(&bones);

        writeln!(out, "{}{}", bones.len(), note("bones"))?;
        for &id in &bones {
            let Some(bone) = self.skeleton.get(id) else {
                continue;
            };
            let parent = bone
                .parent
                .and_then(|parent| index.get(&parent))
                .map_or(-1, |&i| i as i64);
            writeln!(out, "{}", bone.name.translated_name())?;
            writeln!(out, "{}{}", parent, note("parent index"))?;
            writeln!(out, "{} {} {}", bone.position.x, bone.position.y, bone.position.z)?;
            progress();
        }

        let meshes: Vec<&Mesh> = self.export_meshes().collect();
        writeln!(out, "{}{}", meshes.len(), note("meshes"))?;
        for mesh in &meshes {
            // Validation guarantees both lookups succeed
            let Some(material) = self.materials.get(mesh.material) else {
                continue;
            };
            let Some(group) = material.render_group() else {
                continue;
            };
            let [p1, p2, p3] = material.render_parameters;

            writeln!(out, "{}_{}_{}_{}_{}", group.id, mesh.full_translated_name(), p1, p2, p3)?;
            writeln!(out, "{}{}", mesh.uv_layers, note("uv layers"))?;
            writeln!(out, "{}{}", group.slots.len(), note("textures"))?;
            for slot in group.slots {
                match material.textures.get(slot).filter(|texture| texture.is_active()) {
                    Some(texture) => {
                        writeln!(out, "{}", texture.name.translated_name())?;
                        writeln!(out, "{}{}", texture.uv_layer, note("uv layer index"))?;
                    }
                    None => {
                        writeln!(out, "{}", options.placeholder_texture)?;
                        writeln!(out, "0{}", note("uv layer index"))?;
                    }
                }
            }

            writeln!(out, "{}{}", mesh.vertices.len(), note("vertices"))?;
            for vertex in &mesh.vertices {
                let p = vertex.position;
                let n = vertex.normal;
                writeln!(out, "{} {} {}", p.x, p.y, p.z)?;
                writeln!(out, "{} {} {}", n.x, n.y, n.z)?;
                writeln!(out, "{}", vertex.color)?;
                if let Some(uv) = vertex.uv {
                    writeln!(out, "{} {}", uv.x, uv.y)?;
                    if mesh.uv_layers == 2 {
                        let uv2 = vertex.uv2.unwrap_or_default();
                        writeln!(out, "{} {}", uv2.x, uv2.y)?;
                    }
                }
                let indices: Vec<String> = vertex
                    .bones
                    .iter()
                    .filter_map(|influence| index.get(&influence.bone))
                    .map(|i| i.to_string())
                    .collect();
                let weights: Vec<String> =
                    vertex.bones.iter().map(|influence| influence.weight.to_string()).collect();
                writeln!(out, "{}", indices.join(" "))?;
                writeln!(out, "{}", weights.join(" "))?;
            }

            writeln!(out, "{}{}", mesh.faces.len(), note("faces"))?;
            for face in &mesh.faces {
                let [a, b, c] = face.0;
                writeln!(out, "{} {} {}", a, b, c)?;
            }
            progress();
        }

        Ok(ExportReport::Written {
            bones: bones.len(),
            meshes: meshes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadOptions;
    use crate::material::Texture;
    use crate::render_group::TextureType;

    const SOURCE: &str = "\
2 # bones
root
-1 # parent index
0 0 0
spine
0 # parent index
0 1.25 -0.5
1 # meshes
4_body_1_0.5_0
2 # uv layers
2 # textures
body_d.png
0 # uv layer index
body_n.png
1 # uv layer index
2 # vertices
0.1 0.2 0.3
0 0 1
255 128 0 255
0.25 0.75
0.5 0.5
0 1
0.4 0.6
1 1 1
0 -1 0
1 2 3 4
1 0
0 0
1
1
0 # faces
";

    fn loaded() -> Session {
        let mut session = Session::new();
        session
            .load_ascii_str(SOURCE, &LoadOptions::default(), &mut || {})
            .unwrap();
        session
    }

    fn write(session: &Session, options: &ExportOptions) -> (ExportReport, String) {
        let mut out = Vec::new();
        let report = session.write_ascii(&mut out, options, &mut || {}).unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_unchanged_session_round_trips() {
        let session = loaded();
        let (report, text) = write(&session, &ExportOptions::default());
        assert_eq!(report, ExportReport::Written { bones: 2, meshes: 1 });
        assert_eq!(text, SOURCE);
    }

    #[test]
    fn test_annotations_are_optional() {
        let session = loaded();
        let options = ExportOptions {
            annotate: false,
            ..Default::default()
        };
        let (_, text) = write(&session, &options);
        assert!(!text.contains('#'));
        assert!(text.starts_with("2\nroot\n-1\n0 0 0\n"));
    }

    #[test]
    fn test_empty_slot_gets_placeholder() {
        let mut session = loaded();
        let id = session.meshes[0].material;
        let material = session.materials.get_mut(id).unwrap();
        material.textures.insert(TextureType::Bump, Texture::new("", 0));

        let (_, text) = write(&session, &ExportOptions::default());
        assert!(text.contains("body_d.png\n0 # uv layer index\nmissing.png\n0 # uv layer index\n"));
    }

    #[test]
    fn test_duplicate_bone_names_block_export() {
        let mut session = loaded();
        let spine = session.skeleton.find_by_original("spine").unwrap();
        session.skeleton.get_mut(spine).unwrap().name.set_translated("root");

        let mut out = Vec::new();
        let report = session
            .write_ascii(&mut out, &ExportOptions::default(), &mut || {})
            .unwrap();
        match report {
            ExportReport::Blocked(conflicts) => assert_eq!(conflicts.bones, vec!["root".to_string()]),
            other => panic!("expected a blocked export, got {:?}", other),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn test_excluded_meshes_are_skipped() {
        let mut session = loaded();
        session.meshes[0].excluded = true;
        let (report, text) = write(&session, &ExportOptions::default());
        assert_eq!(report, ExportReport::Written { bones: 2, meshes: 0 });
        assert!(text.ends_with("0 # meshes\n"));
    }

    #[test]
    fn test_emptied_slot_changes_written_group() {
        let mut session = Session::new();
        session
            .load_ascii_str(&SOURCE.replace("4_body", "3_body"), &LoadOptions::default(), &mut || {})
            .unwrap();
        let id = session.meshes[0].material;
        let material = session.materials.get_mut(id).unwrap();
        material
            .textures
            .get_mut(&TextureType::Lightmap)
            .unwrap()
            .name
            .set_translated("");

        let (_, text) = write(&session, &ExportOptions::default());
        assert!(text.contains("5_body_1_0.5_0\n2 # uv layers\n1 # textures\nbody_d.png\n0 # uv layer index\n2 # vertices\n"));
    }

    #[test]
    fn test_pruning_keeps_weighted_chain() {
        let mut session = loaded();
        let spine = session.skeleton.find_by_original("spine").unwrap();
        session.add_bone(Some(spine)).unwrap();

        let options = ExportOptions {
            prune_unused_bones: true,
            ..Default::default()
        };
        let (report, _) = write(&session, &options);
        assert_eq!(report, ExportReport::Written { bones: 2, meshes: 1 });

        let (report, _) = write(&session, &ExportOptions::default());
        assert_eq!(report, ExportReport::Written { bones: 3, meshes: 1 });
    }
}
