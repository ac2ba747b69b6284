//! Example: Load and inspect a mesh-ascii file.
//!
//! Run with: cargo run --example inspect_ascii -- model.mesh.ascii [bones.bonedict]

use std::env;

use reno_core::{BoneDictOptions, LoadOptions, Session};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: inspect_ascii <path-to-mesh-ascii> [path-to-bone-dictionary]");
        println!("\nExamples:");
        println!("  cargo run --example inspect_ascii -- crates/reno_core/tests/data/arm.mesh.ascii");
        return;
    }

    let path = &args[1];
    println!("Loading mesh-ascii file: {}", path);

    let mut session = Session::new();
    let summary = match session.load_ascii(path, &LoadOptions::default(), &mut || {}) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error loading mesh-ascii file: {}", e);
            return;
        }
    };

    if let Some(dict) = args.get(2) {
        match session.load_bone_dict(dict, &BoneDictOptions::default()) {
            Ok(dict_summary) => println!(
                "Bone dictionary: {} renamed, {} added",
                dict_summary.renamed, dict_summary.added
            ),
            Err(e) => eprintln!("Error loading bone dictionary: {}", e),
        }
    }

    println!("\n=== {} ===", path);
    println!("Bones: {}", session.skeleton.len());
    println!("Meshes: {}", summary.meshes);
    println!("Materials: {}", session.materials.len());

    println!("\n--- Skeleton ---");
    for (id, bone) in session.skeleton.iter() {
        let depth = session.skeleton.ancestors(id).count();
        let renamed = if bone.name.is_translated() {
            format!(" -> {}", bone.name.translated_name())
        } else {
            String::new()
        };
        println!(
            "  {}{}{} ({:.3}, {:.3}, {:.3})",
            "  ".repeat(depth),
            bone.name.original_name(),
            renamed,
            bone.position.x,
            bone.position.y,
            bone.position.z
        );
    }

    println!("\n--- Meshes ---");
    for (i, mesh) in session.meshes.iter().enumerate() {
        let group = session
            .materials
            .get(mesh.material)
            .and_then(|material| material.render_group())
            .map_or_else(|| "invalid material".to_string(), |group| group.to_string());
        println!(
            "  [{}] {} - {} vertices, {} faces, {} uv layers",
            i,
            mesh.full_translated_name(),
            mesh.vertices.len(),
            mesh.faces.len(),
            mesh.uv_layers
        );
        println!("       Render group: {}", group);
        println!("       Bones: {}", mesh.referenced_bones().len());
    }

    let conflicts = session.validate_export(&Default::default());
    if !conflicts.is_empty() {
        println!("\n--- Export conflicts ---");
        println!("  {:?}", conflicts);
    }
}
