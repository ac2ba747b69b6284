//! mesh-ascii file parser.
//!
//! The format is strictly line oriented: every value group sits on its own
//! line, so blank lines are meaningful (a vertex without bone influences has
//! two empty lines). Count lines may carry a trailing `# comment`.
//!
//! # Layout
//!
//! - `<N> # bones`, then N triplets of name / parent index / position
//! - `<M> # meshes`, then per mesh:
//!   - header `<group id>_<name>[_<p1>_<p2>_<p3>]`
//!   - uv layer count, texture count, texture name / uv layer pairs
//!   - vertex count, then per vertex: position, normal, RGBA colour,
//!     UV, second UV (two-layer meshes), bone indices, bone weights
//!   - face count, then one `i0 i1 i2` line per face
//!
//! A file that ends right after the bone section has no meshes.

use std::collections::VecDeque;

use reno_math::{DVec2, DVec3, Rgba};
use thiserror::Error;

use super::tokenizer::{clean_name, is_float, parse_array, parse_fixed, parse_scalar, probe_pair};
use super::types::*;
use crate::render_group::RenderGroup;

/// Errors that can occur while parsing mesh-ascii, pose or bone-dictionary text.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unexpected end of file")]
    UnexpectedEof,

    #[error("Invalid number at line {line}: {token:?}")]
    InvalidNumber { line: usize, token: String },

    #[error("Line {line}: expected {expected} values, found {found}")]
    WrongArity {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: parent index {index} is out of range for {bone_count} bones")]
    ParentIndexOutOfRange {
        line: usize,
        index: i64,
        bone_count: usize,
    },

    #[error("Line {line}: bone index {index} is out of range for {bone_count} bones")]
    BoneIndexOutOfRange {
        line: usize,
        index: usize,
        bone_count: usize,
    },

    #[error("Line {line}: face index {index} is out of range for {vertex_count} vertices")]
    FaceIndexOutOfRange {
        line: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Line {line}: unknown render group {id}")]
    UnknownRenderGroup { line: usize, id: u32 },

    #[error("Line {line}: unsupported uv layer count {count} (expected 1 or 2)")]
    UnsupportedUvLayers { line: usize, count: u32 },

    #[error("Bone {0:?} is its own ancestor")]
    CyclicHierarchy(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Fields of a mesh header line.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshHeader {
    pub render_group_id: u32,
    pub name: String,
    pub render_parameters: Option<[f32; 3]>,
}

impl MeshHeader {
    /// Split `<group id>_<name>[_<p1>_<p2>_<p3>]`.
    ///
    /// The trailing three tokens are parameters only when there are at least
    /// five tokens and all three are numbers; otherwise they belong to the name.
    pub fn parse(line_num: usize, line: &str) -> ParseResult<Self> {
        let parts: Vec<&str> = line.trim().split('_').collect();
        let render_group_id = parse_scalar::<u32>(line_num, parts[0])?;

        let params_present = parts.len() >= 5 && parts[parts.len() - 3..].iter().all(|p| is_float(p));

        let raw_name = if params_present {
            parts[1..parts.len() - 3].join("_")
        } else if parts.len() > 2 {
            parts[1..].join("_")
        } else if let Some(name) = parts.get(1) {
            name.to_string()
        } else {
            return Err(ParseError::Parse {
                line: line_num,
                message: format!("mesh header {:?} has no name", line.trim()),
            });
        };

        let render_parameters = if params_present {
            let tail = &parts[parts.len() - 3..];
            let mut params = [0.0f32; 3];
            for (param, token) in params.iter_mut().zip(tail) {
                *param = parse_scalar(line_num, token)?;
            }
            Some(params)
        } else {
            None
        };

        Ok(Self {
            render_group_id,
            name: clean_name(&raw_name, false),
            render_parameters,
        })
    }
}

/// mesh-ascii parser.
pub struct MeshAsciiParser {
    lines: VecDeque<(usize, String)>,
    current_line: usize,
}

impl MeshAsciiParser {
    /// Create a new parser from file contents.
    pub fn new(content: &str) -> Self {
        let lines: VecDeque<_> = content
            .lines()
            .enumerate()
            .map(|(i, s)| (i + 1, s.to_string()))
            .collect();

        Self {
            lines,
            current_line: 0,
        }
    }

    /// Parse the whole file.
    pub fn parse(&mut self) -> ParseResult<AsciiDocument> {
        let bone_count: usize = self.next_scalar()?;
        let mut bones = self.reserve(bone_count);
        for _ in 0..bone_count {
            bones.push(self.parse_bone(bone_count)?);
        }
        check_hierarchy(&bones)?;

        // Skeleton-only files stop after the bone section
        let mesh_count: usize = if self.lines.iter().all(|(_, line)| line.trim().is_empty()) {
            0
        } else {
            self.next_scalar()?
        };

        let mut meshes = self.reserve(mesh_count);
        for _ in 0..mesh_count {
            meshes.push(self.parse_mesh(bone_count)?);
        }

        Ok(AsciiDocument { bones, meshes })
    }

    /// Room for `count` items, capped by the lines left since every item takes at least one.
    fn reserve<T>(&self, count: usize) -> Vec<T> {
        Vec::with_capacity(count.min(self.lines.len()))
    }

    fn next_line(&mut self) -> ParseResult<String> {
        let (num, line) = self.lines.pop_front().ok_or(ParseError::UnexpectedEof)?;
        self.current_line = num;
        Ok(line)
    }

    fn next_scalar<T: std::str::FromStr>(&mut self) -> ParseResult<T> {
        let line = self.next_line()?;
        parse_scalar(self.current_line, &line)
    }

    fn next_fixed<T: std::str::FromStr + Copy + Default, const N: usize>(&mut self) -> ParseResult<[T; N]> {
        let line = self.next_line()?;
        parse_fixed(self.current_line, &line)
    }

    fn next_vec3(&mut self) -> ParseResult<DVec3> {
        Ok(DVec3::from_array(self.next_fixed::<f64, 3>()?))
    }

    fn parse_bone(&mut self, bone_count: usize) -> ParseResult<AsciiBone> {
        let name = clean_name(&self.next_line()?, false);

        let index: i64 = self.next_scalar()?;
        let parent = match index {
            -1 => None,
            i if i >= 0 && (i as usize) < bone_count => Some(i as usize),
            _ => {
                return Err(ParseError::ParentIndexOutOfRange {
                    line: self.current_line,
                    index,
                    bone_count,
                })
            }
        };

        let position = self.next_vec3()?;
        Ok(AsciiBone { name, parent, position })
    }

    fn parse_mesh(&mut self, bone_count: usize) -> ParseResult<AsciiMesh> {
        let header_line = self.next_line()?;
        let header = MeshHeader::parse(self.current_line, &header_line)?;
        let render_group =
            RenderGroup::by_id(header.render_group_id).ok_or(ParseError::UnknownRenderGroup {
                line: self.current_line,
                id: header.render_group_id,
            })?;

        let uv_layers: u32 = self.next_scalar()?;
        if !(1..=2).contains(&uv_layers) {
            return Err(ParseError::UnsupportedUvLayers {
                line: self.current_line,
                count: uv_layers,
            });
        }

        let texture_count: usize = self.next_scalar()?;
        let mut textures = self.reserve(texture_count);
        for _ in 0..texture_count {
            let name = clean_name(&self.next_line()?, true);
            let uv_layer: u32 = self.next_scalar()?;
            textures.push(AsciiTexture { name, uv_layer });
        }

        let vertex_count: usize = self.next_scalar()?;
        let mut vertices = self.reserve(vertex_count);
        for _ in 0..vertex_count {
            vertices.push(self.parse_vertex(uv_layers, bone_count)?);
        }

        let face_count: usize = self.next_scalar()?;
        let mut faces = self.reserve(face_count);
        for _ in 0..face_count {
            let face: [u32; 3] = self.next_fixed()?;
            if let Some(&index) = face.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(ParseError::FaceIndexOutOfRange {
                    line: self.current_line,
                    index,
                    vertex_count,
                });
            }
            faces.push(face);
        }

        log::debug!(
            "Parsed mesh '{}': {} vertices, {} faces, group {}",
            header.name,
            vertices.len(),
            faces.len(),
            render_group.id
        );

        Ok(AsciiMesh {
            render_group,
            name: header.name,
            render_parameters: header.render_parameters,
            uv_layers,
            textures,
            vertices,
            faces,
        })
    }

    fn parse_vertex(&mut self, uv_layers: u32, bone_count: usize) -> ParseResult<AsciiVertex> {
        let position = self.next_vec3()?;
        let normal = self.next_vec3()?;
        let [r, g, b, a] = self.next_fixed::<u8, 4>()?;

        // Some exporters omit the UV line entirely
        let uv = match self.lines.front().and_then(|(_, line)| probe_pair(line)) {
            Some(pair) => {
                self.next_line()?;
                Some(DVec2::from_array(pair))
            }
            None => None,
        };
        let uv2 = if uv.is_some() && uv_layers == 2 {
            Some(DVec2::from_array(self.next_fixed::<f64, 2>()?))
        } else {
            None
        };

        let index_line = self.next_line()?;
        let index_line_num = self.current_line;
        let indices: Vec<usize> = parse_array(index_line_num, &index_line)?;
        let weight_line = self.next_line()?;
        let weights: Vec<f64> = parse_array(self.current_line, &weight_line)?;

        if indices.len() != weights.len() {
            return Err(ParseError::Parse {
                line: self.current_line,
                message: format!("{} bone indices but {} weights", indices.len(), weights.len()),
            });
        }
        if let Some(&index) = indices.iter().find(|&&i| i >= bone_count) {
            return Err(ParseError::BoneIndexOutOfRange {
                line: index_line_num,
                index,
                bone_count,
            });
        }

        Ok(AsciiVertex {
            position,
            normal,
            color: Rgba::new(r, g, b, a),
            uv,
            uv2,
            bones: indices.into_iter().zip(weights).collect(),
        })
    }
}

/// Reject parent indices that loop back on themselves.
fn check_hierarchy(bones: &[AsciiBone]) -> ParseResult<()> {
    for (i, bone) in bones.iter().enumerate() {
        let mut current = bone.parent;
        let mut steps = 0;
        while let Some(parent) = current {
            steps += 1;
            if parent == i || steps > bones.len() {
                return Err(ParseError::CyclicHierarchy(bone.name.clone()));
            }
            current = bones[parent].parent;
        }
    }
    Ok(())
}

/// Parse mesh-ascii text.
pub fn parse_mesh_ascii(content: &str) -> ParseResult<AsciiDocument> {
    let mut parser = MeshAsciiParser::new(content);
    parser.parse()
}
