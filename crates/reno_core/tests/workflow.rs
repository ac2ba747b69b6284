//! End-to-end tests over the fixture rig in `tests/data`.

use std::path::PathBuf;

use reno_core::{
    BoneDictOptions, BoneId, EditError, EntityFilter, ExportOptions, ExportReport, LoadOptions, MirrorOptions,
    RenameTarget, Session, SkeletonError,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn load_rig() -> Session {
    let mut session = Session::new();
    session
        .load_ascii(fixture("rig.mesh.ascii"), &LoadOptions::default(), &mut || {})
        .unwrap();
    session
}

fn bone(session: &Session, original: &str) -> BoneId {
    session.skeleton.find_by_original(original).unwrap()
}

fn translated(session: &Session, original: &str) -> String {
    let id = bone(session, original);
    session.skeleton.get(id).unwrap().name.translated_name().to_string()
}

fn bone_names(session: &Session) -> Vec<String> {
    session
        .skeleton
        .iter()
        .map(|(_, bone)| bone.name.translated_name().to_string())
        .collect()
}

#[test]
fn test_load_rig_fixture() {
    let session = load_rig();
    assert_eq!(session.skeleton.len(), 10);
    assert_eq!(session.meshes.len(), 2);
    assert_eq!(session.materials.len(), 2);

    let hat = &session.meshes[1];
    assert_eq!(hat.full_translated_name(), "+hat.brim");
    assert_eq!(hat.name.translated_name(), "brim");

    let material = session.materials.get(hat.material).unwrap();
    assert_eq!(material.render_group().unwrap().id, 4);
    assert_eq!(material.render_parameters, [1.0, 0.5, 0.0]);
    assert!(session.skeleton.find_cycle().is_none());
}

#[test]
fn test_export_and_reload() {
    let session = load_rig();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.mesh.ascii");

    let report = session
        .export_ascii(&path, &ExportOptions::default(), &mut || {})
        .unwrap();
    assert_eq!(report, ExportReport::Written { bones: 10, meshes: 2 });

    let mut reloaded = Session::new();
    reloaded
        .load_ascii(&path, &LoadOptions::default(), &mut || {})
        .unwrap();
    assert_eq!(bone_names(&session), bone_names(&reloaded));
    for (before, after) in session.meshes.iter().zip(&reloaded.meshes) {
        assert_eq!(before.full_translated_name(), after.full_translated_name());
        assert_eq!(before.vertices, after.vertices);
        assert_eq!(before.faces, after.faces);
    }
}

#[test]
fn test_committed_renames_are_exported() {
    let mut session = load_rig();
    let count = session.apply_rename(RenameTarget::Bones, "^(left|right) (.*)$", "$2 $1", &EntityFilter::default());
    assert_eq!(count, 6);
    session.commit_renames(RenameTarget::Bones, &EntityFilter::default());
    assert_eq!(translated(&session, "left hand"), "hand left");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("renamed.mesh.ascii");
    let report = session
        .export_ascii(&path, &ExportOptions::default(), &mut || {})
        .unwrap();
    assert!(report.is_written());

    let mut reloaded = Session::new();
    reloaded
        .load_ascii(&path, &LoadOptions::default(), &mut || {})
        .unwrap();
    // Vertex weights follow the bones they were bound to
    let weighted = reloaded.meshes[0].vertices[1].bones[0].bone;
    assert_eq!(
        reloaded.skeleton.get(weighted).unwrap().name.original_name(),
        "hand left"
    );
}

#[test]
fn test_pruned_export_drops_unused_bones() {
    let session = load_rig();
    let options = ExportOptions {
        prune_unused_bones: true,
        ..Default::default()
    };
    assert_eq!(session.export_bones(&options).len(), 9);

    let mut out = Vec::new();
    let report = session.write_ascii(&mut out, &options, &mut || {}).unwrap();
    assert_eq!(report, ExportReport::Written { bones: 9, meshes: 2 });

    let mut reloaded = Session::new();
    reloaded
        .load_ascii_str(&String::from_utf8(out).unwrap(), &LoadOptions::default(), &mut || {})
        .unwrap();
    assert!(reloaded.skeleton.find_by_original("tail").is_none());
    assert!(reloaded.skeleton.find_by_original("root").is_some());

    let mut session = session;
    assert_eq!(session.prune_unused_bones(), 1);
    assert_eq!(session.skeleton.len(), 9);
}

#[test]
fn test_excluded_mesh_releases_its_bones_when_pruning() {
    let mut session = load_rig();
    // The hat is the only mesh weighted to the head
    session.meshes[1].excluded = true;
    let options = ExportOptions {
        prune_unused_bones: true,
        ..Default::default()
    };

    let exported = session.export_bones(&options);
    assert_eq!(exported.len(), 8);
    assert!(!exported.contains(&bone(&session, "head")));
    assert!(!exported.contains(&bone(&session, "tail")));
    assert!(exported.contains(&bone(&session, "spine")));

    let mut calls = 0;
    let mut out = Vec::new();
    let report = session.write_ascii(&mut out, &options, &mut || calls += 1).unwrap();
    assert_eq!(report, ExportReport::Written { bones: 8, meshes: 1 });
    assert_eq!(calls, 9);
}

#[test]
fn test_export_progress_counts_bones_and_meshes() {
    let session = load_rig();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.mesh.ascii");

    let mut calls = 0;
    let report = session
        .export_ascii(&path, &ExportOptions::default(), &mut || calls += 1)
        .unwrap();
    assert_eq!(report, ExportReport::Written { bones: 10, meshes: 2 });
    assert_eq!(calls, 12);

    // A blocked export reports no progress
    let mut session = session;
    session.meshes[1].name.set_translated("body");
    session.meshes[1].optional_item = None;
    let mut calls = 0;
    let report = session
        .export_ascii(&path, &ExportOptions::default(), &mut || calls += 1)
        .unwrap();
    assert!(!report.is_written());
    assert_eq!(calls, 0);
}

#[test]
fn test_duplicate_names_block_export() {
    let mut session = load_rig();
    session.apply_bone_regex("^spine$", "head", |_| false);
    session.commit_bone_renames(|_| false);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocked.mesh.ascii");
    let report = session
        .export_ascii(&path, &ExportOptions::default(), &mut || {})
        .unwrap();

    match report {
        ExportReport::Blocked(conflicts) => assert_eq!(conflicts.bones, vec!["head".to_string()]),
        other => panic!("expected a blocked export, got {:?}", other),
    }
    assert!(!path.exists());
    assert_eq!(session.bone_conflicts().len(), 2);
}

#[test]
fn test_group_counters_on_rig() {
    let mut session = load_rig();
    session.apply_bone_regex("^(left|right) .*$", r"arm\g_\gi", |_| false);
    session.commit_bone_renames(|_| false);

    assert_eq!(translated(&session, "left shoulder"), "arm1_0");
    assert_eq!(translated(&session, "left elbow"), "arm1_1");
    assert_eq!(translated(&session, "left hand"), "arm1_2");
    assert_eq!(translated(&session, "right shoulder"), "arm2_0");
    assert_eq!(translated(&session, "right hand"), "arm2_2");
    assert_eq!(translated(&session, "spine"), "spine");
}

#[test]
fn test_filtered_rename_only_touches_selected_bones() {
    let mut session = load_rig();
    let filter = EntityFilter {
        original_contains: "right".to_string(),
        ..Default::default()
    };
    session.apply_rename(RenameTarget::Bones, "^right ", "r_", &filter);
    session.commit_renames(RenameTarget::Bones, &EntityFilter::default());
    assert_eq!(translated(&session, "right elbow"), "r_elbow");
    assert_eq!(translated(&session, "left elbow"), "left elbow");
}

#[test]
fn test_mirror_propagation_on_rig() {
    let mut session = load_rig();
    let shoulder = bone(&session, "left shoulder");
    let elbow = bone(&session, "left elbow");
    session.skeleton.get_mut(shoulder).unwrap().name.set_translated("clavicle_L");
    session.skeleton.get_mut(elbow).unwrap().name.set_translated("forearm l");

    let renamed = session.mirror_bone_translation(shoulder, &MirrorOptions::default());
    assert_eq!(renamed.len(), 3);
    assert_eq!(translated(&session, "right shoulder"), "clavicle_R");
    assert_eq!(translated(&session, "right elbow"), "forearm r");
    assert_eq!(translated(&session, "right hand"), "right hand");
}

#[test]
fn test_bone_dictionary_and_pose_sidecars() {
    let mut session = load_rig();
    let summary = session
        .load_bone_dict(fixture("rig.bonedict"), &BoneDictOptions::default())
        .unwrap();
    assert_eq!(summary.renamed, 3);
    assert_eq!(summary.added, 0);
    assert_eq!(translated(&session, "left shoulder"), "clavicle l");

    let dir = tempfile::tempdir().unwrap();
    let dict_path = dir.path().join("out.bonedict");
    assert_eq!(session.export_bone_dict(&dict_path, &mut || {}).unwrap(), 3);

    let pose_path = dir.path().join("out.pose");
    assert_eq!(session.export_pose(&pose_path, &mut || {}).unwrap(), 10);

    let mut posed = Session::new();
    assert_eq!(posed.load_pose(&pose_path, &mut || {}).unwrap(), 10);
    // Poses carry the committed names
    assert!(posed.skeleton.find_by_original("left shoulder").is_none());
    let clavicle = posed.skeleton.find_by_original("clavicle l").unwrap();
    assert_eq!(posed.skeleton.get(clavicle).unwrap().position.x, 0.2);
    assert!(posed.skeleton.get(clavicle).unwrap().is_root());

    // Dictionary names from the export apply to a fresh load
    let mut fresh = load_rig();
    let summary = fresh
        .load_bone_dict(&dict_path, &BoneDictOptions::default())
        .unwrap();
    assert_eq!(summary.renamed, 3);
    assert_eq!(translated(&fresh, "head"), "head main");
}

#[test]
fn test_hierarchy_edits_stay_acyclic() {
    let mut session = load_rig();
    let spine = bone(&session, "spine");
    let hand = bone(&session, "left hand");

    assert_eq!(
        session.reparent_bone(spine, Some(hand)),
        Err(EditError::Skeleton(SkeletonError::Cycle { bone: spine, parent: hand }))
    );
    assert!(session.skeleton.find_cycle().is_none());

    let tail = bone(&session, "tail");
    session.reparent_bone(tail, Some(hand)).unwrap();
    let position = |id| session.skeleton.position_of(id).unwrap();
    assert!(position(hand) < position(tail));
}

#[test]
fn test_retarget_material_render_group() {
    let mut session = load_rig();
    let hat = session.meshes[1].material;
    session.retarget_material(hat, 9).unwrap();

    let group = session.materials.get(hat).unwrap().render_group().unwrap();
    assert_eq!(group.id, 9);
    assert!(group.alpha);
    assert!(session.invalid_materials().is_empty());

    let body = session.meshes[0].material;
    assert_eq!(session.retarget_material(body, 99), Err(EditError::UnknownRenderGroup(99)));
}
