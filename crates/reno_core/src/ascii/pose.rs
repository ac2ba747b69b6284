//! Pose files.
//!
//! One line per bone, `name: rx ry rz px py pz sx sy sz`, rotation in
//! degrees. There is no header and no hierarchy; loading a pose replaces
//! the session's skeleton with flat root bones.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use reno_math::DVec3;

use super::loader::LoadResult;
use super::parser::{ParseError, ParseResult};
use super::tokenizer::{clean_name, parse_fixed};
use super::types::PoseEntry;
use super::writer::WriteResult;
use crate::session::Session;
use crate::skeleton::Bone;

/// Parse pose text. Blank lines are skipped.
pub fn parse_pose(content: &str) -> ParseResult<Vec<PoseEntry>> {
    let mut entries = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line_num = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let (name, values) = line.rsplit_once(':').ok_or_else(|| ParseError::Parse {
            line: line_num,
            message: "expected `name: values`".to_string(),
        })?;
        let values: [f64; 9] = parse_fixed(line_num, values)?;
        entries.push(PoseEntry {
            name: clean_name(name, false),
            rotation: DVec3::new(values[0], values[1], values[2]),
            position: DVec3::new(values[3], values[4], values[5]),
            scale: DVec3::new(values[6], values[7], values[8]),
        });
    }
    Ok(entries)
}

impl Session {
    /// Load a pose file, replacing the skeleton and dropping meshes and materials.
    pub fn load_pose<P: AsRef<Path>>(&mut self, path: P, progress: &mut dyn FnMut()) -> LoadResult<usize> {
        let path = path.as_ref();
        log::info!("Loading pose: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        self.load_pose_str(&content, progress)
    }

    /// Load pose text. Returns the number of bones read.
    pub fn load_pose_str(&mut self, content: &str, progress: &mut dyn FnMut()) -> LoadResult<usize> {
        let entries = parse_pose(content)?;
        self.unload();
        for entry in &entries {
            let mut bone = Bone::from_source(entry.name.clone(), entry.position);
            bone.rotation = entry.rotation;
            bone.scale = entry.scale;
            self.skeleton.insert(bone);
            progress();
        }
        log::info!("Loaded pose with {} bones", entries.len());
        Ok(entries.len())
    }

    /// Write the source-file bones as a pose file.
    pub fn export_pose<P: AsRef<Path>>(&self, path: P, progress: &mut dyn FnMut()) -> WriteResult<usize> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        let count = self.write_pose(&mut out, progress)?;
        out.flush()?;
        log::info!("Exported pose ({} bones): {}", count, path.display());
        Ok(count)
    }

    /// Write pose lines. `progress` is called once per line.
    pub fn write_pose<W: Write>(&self, out: &mut W, progress: &mut dyn FnMut()) -> WriteResult<usize> {
        let mut count = 0;
        for (_, bone) in self.skeleton.iter().filter(|(_, bone)| bone.from_source_file) {
            let (r, p, s) = (bone.rotation, bone.position, bone.scale);
            writeln!(
                out,
                "{}: {} {} {} {} {} {} {} {} {}",
                bone.name.translated_name(),
                r.x,
                r.y,
                r.z,
                p.x,
                p.y,
                p.z,
                s.x,
                s.y,
                s.z
            )?;
            count += 1;
            progress();
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSE: &str = "\
hips: 0 0 0 0 1 0 1 1 1

left_forearm: 10 -5 0 0.5 1.2 0 1 1 1
";

    #[test]
    fn test_parse_pose() {
        let entries = parse_pose(POSE).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name, "left forearm");
        assert_eq!(entries[1].rotation, DVec3::new(10.0, -5.0, 0.0));
        assert_eq!(entries[1].position, DVec3::new(0.5, 1.2, 0.0));
        assert_eq!(entries[1].scale, DVec3::ONE);
    }

    #[test]
    fn test_pose_line_errors() {
        assert!(matches!(parse_pose("hips 0 0 0"), Err(ParseError::Parse { line: 1, .. })));
        assert!(matches!(
            parse_pose("hips: 0 0 0"),
            Err(ParseError::WrongArity { expected: 9, found: 3, .. })
        ));
    }

    #[test]
    fn test_load_pose_replaces_session() {
        let mut session = Session::new();
        session.skeleton.insert(Bone::from_source("old", DVec3::ZERO));

        let mut lines = 0;
        let count = session.load_pose_str(POSE, &mut || lines += 1).unwrap();
        assert_eq!(count, 2);
        assert_eq!(lines, 2);
        assert!(session.skeleton.find_by_original("old").is_none());
        assert!(session.meshes.is_empty());

        let mut out = Vec::new();
        session.write_pose(&mut out, &mut || {}).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "hips: 0 0 0 0 1 0 1 1 1\nleft forearm: 10 -5 0 0.5 1.2 0 1 1 1\n"
        );
    }
}
