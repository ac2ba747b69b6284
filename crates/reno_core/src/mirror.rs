//! Mirrored bone names.
//!
//! Renaming one side of a symmetric rig carries over to the other side: the
//! mirror of a bone is the bone whose position reflects it across a single
//! world axis.

use std::collections::HashSet;

use reno_math::mirror_axis;

use crate::config::MirrorOptions;
use crate::session::Session;
use crate::skeleton::{BoneId, Skeleton};

/// True if a name says which side of the body it is on.
///
/// Matches `left` / `right` anywhere (any case) and standalone `l` / `r`
/// tokens such as the one in `clavicle_L`.
pub fn has_side_marker(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("left")
        || lower.contains("right")
        || name
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token.eq_ignore_ascii_case("l") || token.eq_ignore_ascii_case("r"))
}

/// Swap every side marker in a name, keeping its case.
pub fn swap_side(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    let mut word = String::new();
    for c in name.chars() {
        if c.is_alphanumeric() {
            word.push(c);
        } else {
            out.push_str(&swap_word(&word));
            word.clear();
            out.push(c);
        }
    }
    out.push_str(&swap_word(&word));
    out
}

fn swap_word(word: &str) -> String {
    match word {
        "l" => return "r".to_string(),
        "L" => return "R".to_string(),
        "r" => return "l".to_string(),
        "R" => return "L".to_string(),
        _ => {}
    }

    let lower = word.to_ascii_lowercase();
    let mut out = String::with_capacity(word.len() + 1);
    let mut i = 0;
    while i < word.len() {
        let rest = &lower[i..];
        let (len, replacement) = if rest.starts_with("left") {
            (4, "right")
        } else if rest.starts_with("right") {
            (5, "left")
        } else {
            let Some(c) = word[i..].chars().next() else {
                break;
            };
            out.push(c);
            i += c.len_utf8();
            continue;
        };
        out.push_str(&match_case(&word[i..i + len], replacement));
        i += len;
    }
    out
}

fn match_case(sample: &str, word: &str) -> String {
    if sample.chars().all(|c| c.is_ascii_uppercase()) {
        word.to_ascii_uppercase()
    } else if sample.starts_with(|c: char| c.is_ascii_uppercase()) {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    } else {
        word.to_string()
    }
}

fn is_sided(skeleton: &Skeleton, id: BoneId) -> bool {
    skeleton.get(id).is_some_and(|bone| {
        has_side_marker(bone.name.original_name()) || has_side_marker(bone.name.translated_name())
    })
}

impl Session {
    /// The first other source bone whose position mirrors `id`.
    pub fn mirror_of(&self, id: BoneId, options: &MirrorOptions) -> Option<BoneId> {
        let position = self.skeleton.get(id)?.position;
        self.skeleton
            .iter()
            .filter(|(other, bone)| *other != id && bone.from_source_file)
            .find(|(_, bone)| mirror_axis(position, bone.position, options.tolerance).is_some())
            .map(|(other, _)| other)
    }

    /// Give the mirror of `source`, and the mirrors of its descendants, the
    /// side-swapped committed names of their counterparts.
    ///
    /// `source` must carry a side marker in its original or committed name;
    /// its descendants need not, and an unmarked name is copied as is.
    /// Returns the bones that were renamed; a bone without a mirror is left
    /// alone.
    pub fn mirror_bone_translation(&mut self, source: BoneId, options: &MirrorOptions) -> Vec<BoneId> {
        if !is_sided(&self.skeleton, source) {
            log::debug!("Bone {:?} has no side marker, nothing to mirror", source);
            return Vec::new();
        }

        let mut renamed = Vec::new();
        let mut visited: HashSet<BoneId> = HashSet::new();
        let mut pending = vec![source];

        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let children: Vec<BoneId> = self.skeleton.children(id).collect();
            pending.extend(children.into_iter().rev());

            let Some(target) = self.mirror_of(id, options) else {
                log::debug!("No mirror found for bone {:?}", id);
                continue;
            };
            if visited.contains(&target) {
                continue;
            }
            let Some(name) = self.skeleton.get(id).map(|bone| swap_side(bone.name.translated_name())) else {
                continue;
            };
            if let Some(bone) = self.skeleton.get_mut(target) {
                bone.name.set_translated(name);
                // The mirror side takes its names from this side, never the reverse
                visited.insert(target);
                renamed.push(target);
            }
        }

        log::info!("Mirrored {} bone names", renamed.len());
        renamed
    }
}
