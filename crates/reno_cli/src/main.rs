use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reno_core::{
    BoneDictOptions, EntityFilter, ExportConflicts, ExportOptions, ExportReport, LoadOptions, MirrorOptions,
    RenameRule, RenameTarget, Session,
};
use serde::Deserialize;

/// One rename applied and committed in sequence.
#[derive(Debug, Deserialize)]
struct RenameStep {
    target: RenameTarget,
    pattern: String,
    #[serde(default)]
    template: String,
    #[serde(default)]
    filter: EntityFilter,
}

/// Batch job read from JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RenameJob {
    /// Bone dictionary applied right after loading
    bone_dict: Option<PathBuf>,
    bone_dict_options: BoneDictOptions,

    steps: Vec<RenameStep>,

    /// Bones (committed or original name) whose names are mirrored to the other side
    mirror: Vec<String>,
    mirror_options: MirrorOptions,

    /// Remove unused bones from the session before exporting
    prune: bool,

    export: ExportOptions,
    output: Option<PathBuf>,
    pose_output: Option<PathBuf>,
    bone_dict_output: Option<PathBuf>,
}

fn load_job(path: &Path) -> Result<RenameJob> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read job {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid job {}", path.display()))
}

fn print_usage() {
    println!("Usage: reno <model.mesh.ascii> [job.json]");
    println!("\nWithout a job, the model is loaded and checked for export conflicts.");
    println!("\nExample job:");
    println!(
        r#"  {{ "steps": [{{ "target": "bones", "pattern": "^bip01 ", "template": "" }}],
    "mirror": ["left clavicle"], "output": "renamed.mesh.ascii" }}"#
    );
}

fn print_conflicts(conflicts: &ExportConflicts) {
    let sections = [
        ("Duplicate bone names", &conflicts.bones),
        ("Duplicate mesh names", &conflicts.meshes),
        ("Meshes without a valid render group", &conflicts.invalid_materials),
        ("Meshes weighted to unexported bones", &conflicts.missing_bones),
    ];
    for (title, names) in sections {
        if !names.is_empty() {
            println!("  {}: {}", title, names.join(", "));
        }
    }
}

fn run_steps(session: &mut Session, steps: &[RenameStep]) -> Result<()> {
    for (i, step) in steps.iter().enumerate() {
        // Surface bad patterns instead of silently renaming nothing
        RenameRule::new(&step.pattern, &step.template)
            .with_context(|| format!("Step {} has an invalid rule", i + 1))?;

        let matched = session.apply_rename(step.target, &step.pattern, &step.template, &step.filter);
        let renamed = session.commit_renames(step.target, &step.filter);
        println!(
            "Step {} ({:?} {:?} -> {:?}): {} matched, {} renamed",
            i + 1,
            step.target,
            step.pattern,
            step.template,
            matched,
            renamed
        );
    }
    Ok(())
}

fn run_mirrors(session: &mut Session, names: &[String], options: &MirrorOptions) -> Result<()> {
    for name in names {
        let bone = session
            .skeleton
            .find_by_translated(name)
            .or_else(|| session.skeleton.find_by_original(name))
            .with_context(|| format!("No bone named {:?}", name))?;
        let renamed = session.mirror_bone_translation(bone, options);
        println!("Mirrored {:?}: {} bones renamed", name, renamed.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let input = PathBuf::from(&args[1]);
    let job = match args.get(2) {
        Some(path) => load_job(Path::new(path))?,
        None => RenameJob::default(),
    };

    let mut session = Session::new();
    let mut loaded = 0;
    let summary = session
        .load_ascii(&input, &LoadOptions::default(), &mut || loaded += 1)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    println!(
        "Loaded {}: {} bones, {} meshes, {} materials",
        input.display(),
        summary.bones_added,
        summary.meshes,
        summary.materials_created
    );

    if let Some(dict) = &job.bone_dict {
        let dict_summary = session
            .load_bone_dict(dict, &job.bone_dict_options)
            .with_context(|| format!("Failed to load bone dictionary {}", dict.display()))?;
        println!(
            "Bone dictionary: {} renamed, {} added, {} skipped",
            dict_summary.renamed, dict_summary.added, dict_summary.skipped
        );
    }

    run_steps(&mut session, &job.steps)?;
    run_mirrors(&mut session, &job.mirror, &job.mirror_options)?;

    if job.prune {
        let removed = session.prune_unused_bones();
        println!("Pruned {} unused bones", removed);
    }

    match &job.output {
        Some(output) => {
            let report = session
                .export_ascii(output, &job.export, &mut || {})
                .with_context(|| format!("Failed to write {}", output.display()))?;
            match report {
                ExportReport::Written { bones, meshes } => {
                    println!("Wrote {}: {} bones, {} meshes", output.display(), bones, meshes)
                }
                ExportReport::Blocked(conflicts) => {
                    println!("Export blocked:");
                    print_conflicts(&conflicts);
                    anyhow::bail!("Nothing was written to {}", output.display());
                }
            }
        }
        None => {
            let conflicts = session.validate_export(&job.export);
            if conflicts.is_empty() {
                println!("No export conflicts");
            } else {
                println!("Export conflicts:");
                print_conflicts(&conflicts);
            }
        }
    }

    if let Some(path) = &job.pose_output {
        let count = session
            .export_pose(path, &mut || {})
            .with_context(|| format!("Failed to write pose {}", path.display()))?;
        println!("Wrote pose {}: {} bones", path.display(), count);
    }

    if let Some(path) = &job.bone_dict_output {
        let count = session
            .export_bone_dict(path, &mut || {})
            .with_context(|| format!("Failed to write bone dictionary {}", path.display()))?;
        println!("Wrote bone dictionary {}: {} entries", path.display(), count);
    }

    log::info!("Processed {} bones and meshes", loaded);
    Ok(())
}
