//! mesh-ascii support.
//!
//! This module reads and writes the engine's plain-text interchange formats:
//!
//! - **mesh-ascii**: bone hierarchy, meshes, textures and geometry
//! - **pose**: one `name: rx ry rz px py pz sx sy sz` line per bone
//! - **bone dictionary**: one `original;translated` line per renamed bone
//!
//! Parsing produces the plain types in [`types`]; the loader merges them
//! into a [`Session`](crate::Session). Writers validate the session first and
//! refuse to create a file when names clash or a material has no render group.
//!
//! # Example
//!
//! ```ignore
//! use reno_core::ascii::parse_mesh_ascii;
//!
//! let doc = parse_mesh_ascii(&std::fs::read_to_string("model.mesh.ascii")?)?;
//! println!("{} bones, {} meshes", doc.bones.len(), doc.meshes.len());
//! ```

mod tokenizer;
pub mod types;
mod parser;
mod loader;
mod writer;
mod pose;
mod bonedict;

pub use tokenizer::{clean_name, strip_comment};
pub use types::*;
pub use parser::*;
pub use loader::*;
pub use writer::*;
pub use pose::*;
pub use bonedict::*;
