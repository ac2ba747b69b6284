//! Regex batch renames.
//!
//! A [`RenameRule`] pairs a regex with a replacement template. Applying a
//! rule only fills in pending names; the committed names change when the
//! caller commits. Failures never abort a batch: a bad pattern or template
//! simply produces no pending names.
//!
//! # Templates
//!
//! Besides the regex crate's `$1` / `${name}` capture references, templates
//! accept counter placeholders:
//!
//! - `\d`: running number for meshes, optional items and textures, counted
//!   separately for each distinct set of captured groups
//! - `\g`: number of a bone's group among the sibling groups under the same
//!   parent group
//! - `\gi`: position of a bone within its group (the group's top bone is 0)
//! - `\gd`: dotted path of group numbers from the outermost group down
//! - `\\`: a literal backslash
//!
//! Repeating a placeholder zero-pads it: `\d\d` gives `01`, `\g\g\g` gives `001`.
//!
//! A bone group is a connected run of matching bones; its top bone is the one
//! whose parent does not match.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::EntityFilter;
use crate::material::Texture;
use crate::mesh::Mesh;
use crate::session::Session;
use crate::skeleton::{Bone, BoneId, Skeleton};
use crate::translatable::Translatable;

/// Errors raised while building a rename rule.
#[derive(Error, Debug)]
pub enum RenameError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid replacement template: {0}")]
    Template(String),
}

/// Result type for rename rules.
pub type RenameResult<T> = Result<T, RenameError>;

/// Which kind of entity a rename applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameTarget {
    Bones,
    Meshes,
    OptionalItems,
    Textures,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Counter {
    Flat,
    Group,
    GroupIndex,
    GroupPath,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Literal(String),
    Counter { kind: Counter, width: usize },
}

/// Counter values for one entity.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Position {
    Flat(usize),
    Hierarchical {
        ordinal: usize,
        index: usize,
        path: Vec<usize>,
    },
}

fn pad(value: usize, width: usize) -> String {
    format!("{:0width$}", value, width = width)
}

/// Parsed replacement template.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Template(Vec<Token>);

impl Template {
    fn parse(template: &str) -> RenameResult<Self> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '\\' {
                literal.push(c);
                continue;
            }
            let kind = match chars.next() {
                Some('\\') => {
                    literal.push('\\');
                    continue;
                }
                Some('d') => Counter::Flat,
                Some('g') => match chars.peek() {
                    Some('i') => {
                        chars.next();
                        Counter::GroupIndex
                    }
                    Some('d') => {
                        chars.next();
                        Counter::GroupPath
                    }
                    _ => Counter::Group,
                },
                Some(other) => return Err(RenameError::Template(format!("unknown placeholder \\{}", other))),
                None => return Err(RenameError::Template("trailing backslash".to_string())),
            };

            // A repeated placeholder widens the previous one
            if literal.is_empty() {
                if let Some(Token::Counter { kind: last, width }) = tokens.last_mut() {
                    if *last == kind && *width < 3 {
                        *width += 1;
                        continue;
                    }
                }
            } else {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(Token::Counter { kind, width: 1 });
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }
        Ok(Self(tokens))
    }

    /// Expand counters. `None` when the template asks for a counter the
    /// entity kind does not have.
    fn render(&self, position: &Position) -> Option<String> {
        let mut out = String::new();
        for token in &self.0 {
            match (token, position) {
                (Token::Literal(text), _) => out.push_str(text),
                (Token::Counter { kind: Counter::Flat, width }, Position::Flat(n)) => {
                    out.push_str(&pad(*n, *width))
                }
                (Token::Counter { kind: Counter::Group, width }, Position::Hierarchical { ordinal, .. }) => {
                    out.push_str(&pad(*ordinal, *width))
                }
                (Token::Counter { kind: Counter::GroupIndex, width }, Position::Hierarchical { index, .. }) => {
                    out.push_str(&pad(*index, *width))
                }
                (Token::Counter { kind: Counter::GroupPath, width }, Position::Hierarchical { path, .. }) => {
                    let parts: Vec<String> = path.iter().map(|n| pad(*n, *width)).collect();
                    out.push_str(&parts.join("."));
                }
                _ => return None,
            }
        }
        Some(out)
    }
}

/// A compiled pattern and replacement template.
#[derive(Clone, Debug)]
pub struct RenameRule {
    regex: Regex,
    template: Template,
}

impl RenameRule {
    pub fn new(pattern: &str, template: &str) -> RenameResult<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            template: Template::parse(template)?,
        })
    }

    /// Whether the pattern matches a committed name.
    pub fn is_match(&self, name: &Translatable) -> bool {
        self.regex.is_match(name.translated_name())
    }

    fn candidate(&self, name: &Translatable, position: &Position) -> Option<String> {
        let replacement = self.template.render(position)?;
        name.regex_candidate(&self.regex, &replacement)
    }

    /// Pending names for a flat list of entities, in order.
    ///
    /// `None` entries are excluded entities; they get no pending name and do
    /// not advance any counter.
    pub fn flat_candidates<'a, I>(&self, names: I) -> Vec<Option<String>>
    where
        I: IntoIterator<Item = Option<&'a Translatable>>,
    {
        let mut counters: HashMap<Vec<Option<String>>, usize> = HashMap::new();
        names
            .into_iter()
            .map(|name| {
                let name = name?;
                let captures = self.regex.captures(name.translated_name())?;
                let key: Vec<Option<String>> = captures
                    .iter()
                    .skip(1)
                    .map(|group| group.map(|m| m.as_str().to_string()))
                    .collect();
                let counter = counters.entry(key).or_insert(0);
                *counter += 1;
                self.candidate(name, &Position::Flat(*counter))
            })
            .collect()
    }

    /// Pending names for the bones of a skeleton, with group counters.
    ///
    /// The result depends only on the skeleton's order and hierarchy.
    pub fn bone_candidates(
        &self,
        skeleton: &Skeleton,
        exclude: impl Fn(&Bone) -> bool,
    ) -> HashMap<BoneId, String> {
        let included: HashSet<BoneId> = skeleton
            .iter()
            .filter(|(_, bone)| !exclude(bone) && self.is_match(&bone.name))
            .map(|(id, _)| id)
            .collect();

        let head_of = |id: BoneId| {
            skeleton
                .ancestors(id)
                .take_while(|ancestor| included.contains(ancestor))
                .last()
                .unwrap_or(id)
        };
        let parent_group = |head: BoneId| {
            skeleton
                .ancestors(head)
                .find(|ancestor| included.contains(ancestor))
                .map(head_of)
        };

        let mut ordinals: HashMap<BoneId, usize> = HashMap::new();
        let mut parents: HashMap<BoneId, Option<BoneId>> = HashMap::new();
        let mut next_ordinal: HashMap<Option<BoneId>, usize> = HashMap::new();
        let mut next_index: HashMap<BoneId, usize> = HashMap::new();
        let mut members: Vec<(BoneId, BoneId, usize)> = Vec::new();

        for &id in skeleton.ids() {
            if !included.contains(&id) {
                continue;
            }
            let head = head_of(id);
            if head == id {
                let parent = parent_group(id);
                let ordinal = next_ordinal.entry(parent).or_insert(0);
                *ordinal += 1;
                ordinals.insert(id, *ordinal);
                parents.insert(id, parent);
                members.push((id, id, 0));
            } else {
                let index = next_index.entry(head).or_insert(0);
                *index += 1;
                members.push((id, head, *index));
            }
        }

        let path_of = |head: BoneId| {
            let mut path = Vec::new();
            let mut current = Some(head);
            while let Some(group) = current {
                let Some(&ordinal) = ordinals.get(&group) else {
                    break;
                };
                path.push(ordinal);
                current = parents.get(&group).copied().flatten();
                if path.len() > included.len() {
                    break;
                }
            }
            path.reverse();
            path
        };

        members
            .into_iter()
            .filter_map(|(id, head, index)| {
                let position = Position::Hierarchical {
                    ordinal: ordinals.get(&head).copied().unwrap_or(0),
                    index,
                    path: path_of(head),
                };
                let bone = skeleton.get(id)?;
                self.candidate(&bone.name, &position).map(|name| (id, name))
            })
            .collect()
    }
}

fn compile(pattern: &str, template: &str) -> Option<RenameRule> {
    match RenameRule::new(pattern, template) {
        Ok(rule) => Some(rule),
        Err(err) => {
            log::debug!("Rename rule {:?} -> {:?} ignored: {}", pattern, template, err);
            None
        }
    }
}

impl Session {
    /// Fill pending bone names. Returns how many bones received one.
    pub fn apply_bone_regex(&mut self, pattern: &str, template: &str, exclude: impl Fn(&Bone) -> bool) -> usize {
        let candidates = compile(pattern, template)
            .map(|rule| rule.bone_candidates(&self.skeleton, exclude))
            .unwrap_or_default();
        let ids = self.skeleton.ids().to_vec();
        for id in ids {
            if let Some(bone) = self.skeleton.get_mut(id) {
                bone.name.set_translating(candidates.get(&id).cloned());
            }
        }
        log::debug!("Bone rename produced {} candidates", candidates.len());
        candidates.len()
    }

    /// Fill pending mesh names (the part after any optional-item prefix).
    pub fn apply_mesh_regex(&mut self, pattern: &str, template: &str, exclude: impl Fn(&Mesh) -> bool) -> usize {
        let candidates = match compile(pattern, template) {
            Some(rule) => rule.flat_candidates(self.meshes.iter().map(|mesh| (!exclude(mesh)).then_some(&mesh.name))),
            None => vec![None; self.meshes.len()],
        };
        let count = candidates.iter().flatten().count();
        for (mesh, candidate) in self.meshes.iter_mut().zip(candidates) {
            mesh.name.set_translating(candidate);
        }
        count
    }

    /// Fill pending optional-item group names.
    pub fn apply_optional_item_regex(
        &mut self,
        pattern: &str,
        template: &str,
        exclude: impl Fn(&Mesh) -> bool,
    ) -> usize {
        let candidates = match compile(pattern, template) {
            Some(rule) => rule.flat_candidates(self.meshes.iter().map(|mesh| {
                mesh.optional_item
                    .as_ref()
                    .filter(|_| !exclude(mesh))
                    .map(|item| &item.group)
            })),
            None => vec![None; self.meshes.len()],
        };
        let count = candidates.iter().flatten().count();
        for (mesh, candidate) in self.meshes.iter_mut().zip(candidates) {
            if let Some(item) = mesh.optional_item.as_mut() {
                item.group.set_translating(candidate);
            }
        }
        count
    }

    /// Fill pending texture names across every material.
    pub fn apply_texture_regex(
        &mut self,
        pattern: &str,
        template: &str,
        exclude: impl Fn(&Texture) -> bool,
    ) -> usize {
        let total = self.materials.iter().map(|(_, m)| m.textures.len()).sum();
        let candidates = match compile(pattern, template) {
            Some(rule) => rule.flat_candidates(
                self.materials
                    .iter()
                    .flat_map(|(_, material)| material.textures.values())
                    .map(|texture| (texture.is_active() && !exclude(texture)).then_some(&texture.name)),
            ),
            None => vec![None; total],
        };
        let count = candidates.iter().flatten().count();
        let textures = self
            .materials
            .iter_mut()
            .flat_map(|(_, material)| material.textures_mut());
        for (texture, candidate) in textures.zip(candidates) {
            texture.name.set_translating(candidate);
        }
        count
    }

    /// Promote pending bone names for bones not excluded. Returns how many changed.
    pub fn commit_bone_renames(&mut self, exclude: impl Fn(&Bone) -> bool) -> usize {
        let ids = self.skeleton.ids().to_vec();
        let mut count = 0;
        for id in ids {
            if let Some(bone) = self.skeleton.get_mut(id) {
                if !exclude(bone) && bone.name.commit() {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn commit_mesh_renames(&mut self, exclude: impl Fn(&Mesh) -> bool) -> usize {
        let mut count = 0;
        for mesh in &mut self.meshes {
            if !exclude(mesh) && mesh.name.commit() {
                count += 1;
            }
        }
        count
    }

    pub fn commit_optional_item_renames(&mut self, exclude: impl Fn(&Mesh) -> bool) -> usize {
        let mut count = 0;
        for mesh in &mut self.meshes {
            if exclude(mesh) {
                continue;
            }
            if let Some(item) = mesh.optional_item.as_mut() {
                if item.group.commit() {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn commit_texture_renames(&mut self, exclude: impl Fn(&Texture) -> bool) -> usize {
        let mut count = 0;
        for (_, material) in self.materials.iter_mut() {
            for texture in material.textures_mut() {
                if !exclude(texture) && texture.name.commit() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Apply a rule to one kind of entity, selecting entities with `filter`.
    pub fn apply_rename(
        &mut self,
        target: RenameTarget,
        pattern: &str,
        template: &str,
        filter: &EntityFilter,
    ) -> usize {
        match target {
            RenameTarget::Bones => {
                let exclude = self.bone_exclusion(filter);
                self.apply_bone_regex(pattern, template, exclude)
            }
            RenameTarget::Meshes => {
                let exclude = self.mesh_exclusion(filter);
                self.apply_mesh_regex(pattern, template, exclude)
            }
            RenameTarget::OptionalItems => {
                let filter = filter.clone();
                self.apply_optional_item_regex(pattern, template, move |mesh: &Mesh| {
                    optional_item_excluded(&filter, mesh)
                })
            }
            RenameTarget::Textures => {
                let filter = filter.clone();
                self.apply_texture_regex(pattern, template, move |texture: &Texture| {
                    filter.excludes(&texture.name, false)
                })
            }
        }
    }

    /// Commit pending names of one kind of entity, selecting entities with `filter`.
    pub fn commit_renames(&mut self, target: RenameTarget, filter: &EntityFilter) -> usize {
        match target {
            RenameTarget::Bones => {
                let exclude = self.bone_exclusion(filter);
                self.commit_bone_renames(exclude)
            }
            RenameTarget::Meshes => {
                let exclude = self.mesh_exclusion(filter);
                self.commit_mesh_renames(exclude)
            }
            RenameTarget::OptionalItems => {
                let filter = filter.clone();
                self.commit_optional_item_renames(move |mesh: &Mesh| optional_item_excluded(&filter, mesh))
            }
            RenameTarget::Textures => {
                let filter = filter.clone();
                self.commit_texture_renames(move |texture: &Texture| filter.excludes(&texture.name, false))
            }
        }
    }
}

fn optional_item_excluded(filter: &EntityFilter, mesh: &Mesh) -> bool {
    mesh.optional_item
        .as_ref()
        .map_or(true, |item| filter.excludes(&item.group, false))
}
