//! Reno Core - Format engine for mesh-ascii skeleton/mesh files.
//!
//! This crate provides:
//!
//! - **Data model**: `Session`, `Skeleton`/`Bone`, `Mesh`, `Material`, `Texture`
//! - **Render groups**: the fixed shader-permutation catalog materials resolve against
//! - **mesh-ascii support**: parsing, merging/appending skeletons, validated export,
//!   plus the pose and bone-dictionary sidecar formats
//! - **Batch renames**: regex rules with hierarchical counters and mirrored bone names
//!
//! # Example
//!
//! ```ignore
//! use reno_core::{ExportOptions, LoadOptions, Session};
//!
//! let mut session = Session::new();
//! session.load_ascii("model.mesh.ascii", &LoadOptions::default(), &mut || {})?;
//! session.apply_bone_regex("^bip01 ", "", |_| false);
//! session.commit_bone_renames(|_| false);
//! let report = session.export_ascii("renamed.mesh.ascii", &ExportOptions::default(), &mut || {})?;
//! ```

pub mod ascii;
pub mod config;
pub mod filter;
pub mod material;
pub mod mesh;
pub mod mirror;
pub mod rename;
pub mod render_group;
pub mod session;
pub mod skeleton;
pub mod translatable;

// Re-export commonly used types
pub use ascii::{
    BoneDictSummary, ExportConflicts, ExportReport, LoadError, LoadResult, LoadSummary, ParseError, WriteError,
    WriteResult,
};
pub use config::{BoneDictOptions, ExportOptions, LoadOptions, MirrorOptions};
pub use filter::EntityFilter;
pub use material::{Material, MaterialId, MaterialRegistry, Texture};
pub use mesh::{Face, Mesh, OptionalItem, Vertex, VertexBone};
pub use mirror::{has_side_marker, swap_side};
pub use rename::{RenameError, RenameResult, RenameRule, RenameTarget};
pub use render_group::{RenderGroup, TextureType};
pub use session::{EditError, EditResult, Session};
pub use skeleton::{Bone, BoneId, Skeleton, SkeletonError};
pub use translatable::Translatable;
