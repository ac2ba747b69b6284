//! Bone hierarchy.
//!
//! Bones live in an append-only arena and refer to their parent by
//! [`BoneId`]. A separate ordering lists the bones that are part of the
//! skeleton, ancestors first, which is the order they are written in.
//! Pruning drops bones from that ordering; arena slots are never reused, so a
//! `BoneId` held by a vertex or a caller never silently changes meaning.

use std::collections::{HashMap, HashSet};

use reno_math::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::translatable::Translatable;

/// Errors raised by skeleton edits.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SkeletonError {
    #[error("Unknown bone id {0:?}")]
    UnknownBone(BoneId),

    #[error("Parenting {bone:?} under {parent:?} would create a cycle")]
    Cycle { bone: BoneId, parent: BoneId },
}

/// Handle to a bone in a [`Skeleton`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoneId(usize);

impl BoneId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single bone.
#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
    /// Original / committed / pending names
    pub name: Translatable,

    /// Parent bone, `None` for roots
    pub parent: Option<BoneId>,

    /// Position (absolute, as stored in mesh-ascii files)
    pub position: DVec3,

    /// Rotation in degrees (pose files only)
    pub rotation: DVec3,

    /// Scale (pose files only)
    pub scale: DVec3,

    /// False for bones that only exist because a bone dictionary named them
    pub from_source_file: bool,
}

impl Bone {
    /// A bone read from a skeleton file.
    pub fn from_source(name: impl Into<String>, position: DVec3) -> Self {
        Self {
            name: Translatable::new(name),
            parent: None,
            position,
            rotation: DVec3::ZERO,
            scale: DVec3::ONE,
            from_source_file: true,
        }
    }

    /// A bone known only by name, introduced by a bone dictionary.
    pub fn dictionary_only(original: impl Into<String>, translated: impl Into<String>) -> Self {
        Self {
            name: Translatable::with_translation(original, translated),
            parent: None,
            position: DVec3::ZERO,
            rotation: DVec3::ZERO,
            scale: DVec3::ONE,
            from_source_file: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Forest of bones with ancestor-first ordering.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    arena: Vec<Bone>,
    order: Vec<BoneId>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bone at the end of the ordering.
    ///
    /// The parent is taken as-is; use [`Skeleton::reparent`] for checked edits.
    pub fn insert(&mut self, bone: Bone) -> BoneId {
        let id = BoneId(self.arena.len());
        self.arena.push(bone);
        self.order.push(id);
        id
    }

    pub fn get(&self, id: BoneId) -> Option<&Bone> {
        self.arena.get(id.0)
    }

    pub fn get_mut(&mut self, id: BoneId) -> Option<&mut Bone> {
        self.arena.get_mut(id.0)
    }

    /// Whether `id` is part of the skeleton (not pruned).
    pub fn contains(&self, id: BoneId) -> bool {
        self.order.contains(&id)
    }

    /// Number of bones in the skeleton.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Bone ids in write order.
    pub fn ids(&self) -> &[BoneId] {
        &self.order
    }

    /// Bones in write order.
    pub fn iter(&self) -> impl Iterator<Item = (BoneId, &Bone)> + '_ {
        self.order.iter().map(move |&id| (id, &self.arena[id.0]))
    }

    /// Position of `id` in write order.
    pub fn position_of(&self, id: BoneId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    /// First bone whose committed name equals `name`.
    pub fn find_by_translated(&self, name: &str) -> Option<BoneId> {
        self.iter()
            .find(|(_, bone)| bone.name.translated_name() == name)
            .map(|(id, _)| id)
    }

    /// First bone whose loaded name equals `name`.
    pub fn find_by_original(&self, name: &str) -> Option<BoneId> {
        self.iter()
            .find(|(_, bone)| bone.name.original_name() == name)
            .map(|(id, _)| id)
    }

    /// Direct children of `id`, in write order.
    pub fn children(&self, id: BoneId) -> impl Iterator<Item = BoneId> + '_ {
        self.iter()
            .filter(move |(_, bone)| bone.parent == Some(id))
            .map(|(child, _)| child)
    }

    /// Ancestors of `id`, nearest first.
    ///
    /// The walk is bounded by the arena size so a corrupted parent chain
    /// cannot loop forever.
    pub fn ancestors(&self, id: BoneId) -> impl Iterator<Item = BoneId> + '_ {
        let mut current = self.get(id).and_then(|bone| bone.parent);
        let mut remaining = self.arena.len();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let id = current?;
            current = self.get(id).and_then(|bone| bone.parent);
            Some(id)
        })
    }

    /// Whether `ancestor` appears on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: BoneId, id: BoneId) -> bool {
        self.ancestors(id).any(|other| other == ancestor)
    }

    /// Set the parent of `id`, refusing edits that would create a cycle.
    pub fn reparent(&mut self, id: BoneId, parent: Option<BoneId>) -> Result<(), SkeletonError> {
        if self.get(id).is_none() {
            return Err(SkeletonError::UnknownBone(id));
        }
        if let Some(parent) = parent {
            if self.get(parent).is_none() {
                return Err(SkeletonError::UnknownBone(parent));
            }
            if parent == id || self.is_ancestor(id, parent) {
                return Err(SkeletonError::Cycle { bone: id, parent });
            }
        }
        self.arena[id.0].parent = parent;
        Ok(())
    }

    /// Add a new bone named `bone<N>` under `parent`, at the parent's position.
    pub fn add_bone(&mut self, parent: Option<BoneId>) -> Result<BoneId, SkeletonError> {
        let position = match parent {
            Some(parent) => self.get(parent).ok_or(SkeletonError::UnknownBone(parent))?.position,
            None => DVec3::ZERO,
        };
        let mut bone = Bone::from_source(format!("bone{}", self.len()), position);
        bone.parent = parent;
        Ok(self.insert(bone))
    }

    /// Turn `id` into the single root of the skeleton.
    ///
    /// The bone is moved to the origin, renamed `root ground` and placed first;
    /// every other root is reparented under it.
    pub fn make_root(&mut self, id: BoneId) -> Result<(), SkeletonError> {
        let bone = self.get_mut(id).ok_or(SkeletonError::UnknownBone(id))?;
        bone.position = DVec3::ZERO;
        bone.name.set_translated("root ground");
        bone.parent = None;
        bone.from_source_file = true;

        self.order.retain(|&other| other != id);
        for &other in &self.order {
            if self.arena[other.0].parent.is_none() {
                self.arena[other.0].parent = Some(id);
            }
        }
        self.order.insert(0, id);
        Ok(())
    }

    /// Check every parent chain for cycles. Returns the first bone caught in one.
    pub fn find_cycle(&self) -> Option<BoneId> {
        self.order.iter().copied().find(|&id| {
            let mut steps = 0;
            let mut current = self.arena[id.0].parent;
            while let Some(parent) = current {
                steps += 1;
                if parent == id || steps > self.arena.len() {
                    return true;
                }
                current = self.arena[parent.0].parent;
            }
            false
        })
    }

    /// Reorder so every ancestor precedes its descendants.
    ///
    /// The pass is stable: bones already in a valid position keep their
    /// relative order, and a bone that precedes its parent is moved just after
    /// the parent chain is emitted. Indices written as parent references stay
    /// valid after this.
    pub fn sort_hierarchy(&mut self) {
        let members: HashSet<BoneId> = self.order.iter().copied().collect();
        let mut emitted = HashSet::with_capacity(self.order.len());
        let mut sorted = Vec::with_capacity(self.order.len());

        for &id in &self.order {
            if emitted.contains(&id) {
                continue;
            }
            let mut chain = vec![id];
            chain.extend(
                self.ancestors(id)
                    .take_while(|ancestor| members.contains(ancestor) && !emitted.contains(ancestor)),
            );
            for bone in chain.into_iter().rev() {
                if emitted.insert(bone) {
                    sorted.push(bone);
                }
            }
        }
        self.order = sorted;
    }

    /// Bones to keep for a set of referenced bones: each one plus its full ancestor chain.
    ///
    /// The result is in write order.
    pub fn with_ancestors(&self, referenced: impl IntoIterator<Item = BoneId>) -> Vec<BoneId> {
        let mut keep = HashSet::new();
        for id in referenced {
            if keep.insert(id) {
                keep.extend(self.ancestors(id));
            }
        }
        self.order.iter().copied().filter(|id| keep.contains(id)).collect()
    }

    /// Drop every bone not in `keep` from the skeleton.
    ///
    /// Returns the number of bones removed.
    pub fn retain(&mut self, keep: &HashSet<BoneId>) -> usize {
        let before = self.order.len();
        self.order.retain(|id| keep.contains(id));
        before - self.order.len()
    }

    /// Replace the whole skeleton.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.order.clear();
    }

    /// Map from bone id to its index within `ids`.
    pub fn index_map(ids: &[BoneId]) -> HashMap<BoneId, usize> {
        ids.iter().enumerate().map(|(i, &id)| (id, i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Skeleton, BoneId, BoneId, BoneId) {
        let mut skeleton = Skeleton::new();
        let root = skeleton.insert(Bone::from_source("root", DVec3::ZERO));
        let mut spine = Bone::from_source("spine", DVec3::Y);
        spine.parent = Some(root);
        let spine = skeleton.insert(spine);
        let mut head = Bone::from_source("head", DVec3::Y * 2.0);
        head.parent = Some(spine);
        let head = skeleton.insert(head);
        (skeleton, root, spine, head)
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let (skeleton, root, spine, head) = chain();
        let ancestors: Vec<_> = skeleton.ancestors(head).collect();
        assert_eq!(ancestors, vec![spine, root]);
        assert!(skeleton.is_ancestor(root, head));
        assert!(!skeleton.is_ancestor(head, root));
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let (mut skeleton, root, _, head) = chain();
        assert_eq!(
            skeleton.reparent(root, Some(head)),
            Err(SkeletonError::Cycle { bone: root, parent: head })
        );
        assert_eq!(
            skeleton.reparent(head, Some(head)),
            Err(SkeletonError::Cycle { bone: head, parent: head })
        );
        assert!(skeleton.reparent(head, Some(root)).is_ok());
        assert_eq!(skeleton.get(head).unwrap().parent, Some(root));
        assert!(skeleton.find_cycle().is_none());
    }

    #[test]
    fn test_add_bone_copies_parent_position() {
        let (mut skeleton, _, spine, _) = chain();
        let id = skeleton.add_bone(Some(spine)).unwrap();
        let bone = skeleton.get(id).unwrap();
        assert_eq!(bone.name.translated_name(), "bone3");
        assert_eq!(bone.position, DVec3::Y);
        assert_eq!(bone.parent, Some(spine));
        assert!(bone.from_source_file);
    }

    #[test]
    fn test_make_root_adopts_other_roots() {
        let (mut skeleton, root, spine, _) = chain();
        let extra = skeleton.insert(Bone::from_source("prop", DVec3::X));

        skeleton.make_root(spine).unwrap();

        assert_eq!(skeleton.ids()[0], spine);
        let new_root = skeleton.get(spine).unwrap();
        assert!(new_root.is_root());
        assert_eq!(new_root.name.translated_name(), "root ground");
        assert_eq!(new_root.position, DVec3::ZERO);
        assert_eq!(skeleton.get(root).unwrap().parent, Some(spine));
        assert_eq!(skeleton.get(extra).unwrap().parent, Some(spine));
        assert!(skeleton.find_cycle().is_none());
    }

    #[test]
    fn test_sort_moves_children_after_parents() {
        let mut skeleton = Skeleton::new();
        let hand = skeleton.insert(Bone::from_source("hand", DVec3::ZERO));
        let other = skeleton.insert(Bone::from_source("other", DVec3::ZERO));
        let arm = skeleton.insert(Bone::from_source("arm", DVec3::ZERO));
        skeleton.reparent(hand, Some(arm)).unwrap();

        skeleton.sort_hierarchy();

        assert_eq!(skeleton.ids(), &[arm, hand, other]);
    }

    #[test]
    fn test_sort_is_stable_for_valid_order() {
        let (mut skeleton, root, spine, head) = chain();
        skeleton.sort_hierarchy();
        assert_eq!(skeleton.ids(), &[root, spine, head]);
    }

    #[test]
    fn test_with_ancestors_and_retain() {
        let (mut skeleton, root, spine, head) = chain();
        let leaf = skeleton.insert(Bone::from_source("leaf", DVec3::ZERO));

        let keep = skeleton.with_ancestors([spine]);
        assert_eq!(keep, vec![root, spine]);

        let removed = skeleton.retain(&keep.into_iter().collect());
        assert_eq!(removed, 2);
        assert!(!skeleton.contains(head));
        assert!(!skeleton.contains(leaf));
        // Arena entries survive pruning
        assert!(skeleton.get(head).is_some());
    }
}
