//! Bone dictionaries.
//!
//! A bone dictionary maps original bone names to translations, one
//! `original;translated` pair per line. Lines starting with `#` and blank
//! lines are ignored. Only renamed bones are written.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::loader::LoadResult;
use super::tokenizer::clean_name;
use super::types::DictEntry;
use super::writer::WriteResult;
use crate::config::BoneDictOptions;
use crate::session::Session;
use crate::skeleton::Bone;

/// What a dictionary load changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoneDictSummary {
    /// Loaded bones that received a translation
    pub renamed: usize,

    /// Name-only bones added for unmatched entries
    pub added: usize,

    /// Malformed lines
    pub skipped: usize,
}

/// Parse dictionary text. Malformed lines are logged and skipped.
pub fn parse_bone_dict(content: &str) -> (Vec<DictEntry>, usize) {
    let mut entries = Vec::new();
    let mut skipped = 0;
    for (i, line) in content.lines().enumerate() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(';').map(str::trim).collect();
        match parts.as_slice() {
            [original, translated] => entries.push(DictEntry {
                original: clean_name(original, false),
                translated: clean_name(translated, false),
            }),
            _ => {
                log::warn!("Skipping bone dictionary line {}: {:?}", i + 1, line);
                skipped += 1;
            }
        }
    }
    (entries, skipped)
}

impl Session {
    /// Apply a bone dictionary file to the loaded bones.
    pub fn load_bone_dict<P: AsRef<Path>>(
        &mut self,
        path: P,
        options: &BoneDictOptions,
    ) -> LoadResult<BoneDictSummary> {
        let path = path.as_ref();
        log::info!("Loading bone dictionary: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(self.load_bone_dict_str(&content, options))
    }

    /// Apply dictionary text to the loaded bones.
    ///
    /// Each entry renames the first bone with that original name. Entries
    /// matching nothing become name-only bones when `keep_unmatched` is set.
    pub fn load_bone_dict_str(&mut self, content: &str, options: &BoneDictOptions) -> BoneDictSummary {
        let (entries, skipped) = parse_bone_dict(content);
        let mut summary = BoneDictSummary {
            skipped,
            ..Default::default()
        };

        for entry in entries {
            match self.skeleton.find_by_original(&entry.original) {
                Some(id) => {
                    if let Some(bone) = self.skeleton.get_mut(id) {
                        bone.name.set_translated(entry.translated);
                        summary.renamed += 1;
                    }
                }
                None if options.keep_unmatched => {
                    self.skeleton
                        .insert(Bone::dictionary_only(entry.original, entry.translated));
                    summary.added += 1;
                }
                None => {}
            }
        }

        log::info!(
            "Bone dictionary: {} renamed, {} added, {} skipped",
            summary.renamed,
            summary.added,
            summary.skipped
        );
        summary
    }

    /// Write every renamed bone as a dictionary file.
    pub fn export_bone_dict<P: AsRef<Path>>(&self, path: P, progress: &mut dyn FnMut()) -> WriteResult<usize> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        let count = self.write_bone_dict(&mut out, progress)?;
        out.flush()?;
        log::info!("Exported bone dictionary ({} entries): {}", count, path.display());
        Ok(count)
    }

    /// Write dictionary lines. `progress` is called once per line.
    pub fn write_bone_dict<W: Write>(&self, out: &mut W, progress: &mut dyn FnMut()) -> WriteResult<usize> {
        let mut count = 0;
        for (_, bone) in self.skeleton.iter().filter(|(_, bone)| bone.name.is_translated()) {
            writeln!(out, "{};{}", bone.name.original_name(), bone.name.translated_name())?;
            count += 1;
            progress();
        }
        Ok(count)
    }
}
