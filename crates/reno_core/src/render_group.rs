//! Render group catalog.
//!
//! The consuming engine ships a fixed set of shader permutations. Each one is
//! identified by a numeric id, takes an ordered list of texture slots and is
//! either opaque or alpha-blended. Materials never store their group; it is
//! resolved from the slots they actually fill.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A texture slot a render group can sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TextureType {
    Diffuse,
    Lightmap,
    Bump,
    Mask,
    MiniBump1,
    MiniBump2,
    Specular,
    Environment,
    Emission,
}

impl TextureType {
    pub const ALL: [TextureType; 9] = [
        TextureType::Diffuse,
        TextureType::Lightmap,
        TextureType::Bump,
        TextureType::Mask,
        TextureType::MiniBump1,
        TextureType::MiniBump2,
        TextureType::Specular,
        TextureType::Environment,
        TextureType::Emission,
    ];

    /// Display name of the slot.
    pub fn code(self) -> &'static str {
        match self {
            TextureType::Diffuse => "Diffuse",
            TextureType::Lightmap => "Lightmap",
            TextureType::Bump => "Bump",
            TextureType::Mask => "Mask",
            TextureType::MiniBump1 => "MiniBump1",
            TextureType::MiniBump2 => "MiniBump2",
            TextureType::Specular => "Specular",
            TextureType::Environment => "Environment",
            TextureType::Emission => "Emission",
        }
    }
}

impl fmt::Display for TextureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One shader permutation of the target engine.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderGroup {
    /// Numeric id written in mesh headers
    pub id: u32,

    /// Whether the permutation is alpha-blended
    pub alpha: bool,

    /// Texture slots in the order they are written
    pub slots: &'static [TextureType],
}

use TextureType::*;

const DIFFUSE: &[TextureType] = &[Diffuse];
const DIFFUSE_LIGHTMAP: &[TextureType] = &[Diffuse, Lightmap];
const DIFFUSE_BUMP: &[TextureType] = &[Diffuse, Bump];
const DIFFUSE_LIGHTMAP_BUMP: &[TextureType] = &[Diffuse, Lightmap, Bump];
const DIFFUSE_LIGHTMAP_BUMP_MASK: &[TextureType] =
    &[Diffuse, Lightmap, Bump, Mask, MiniBump1, MiniBump2];
const DIFFUSE_LIGHTMAP_BUMP_MASK_SPECULAR: &[TextureType] =
    &[Diffuse, Lightmap, Bump, Mask, MiniBump1, MiniBump2, Specular];
const DIFFUSE_LIGHTMAP_BUMP_SPECULAR: &[TextureType] = &[Diffuse, Lightmap, Bump, Specular];
const DIFFUSE_BUMP_ENVIRONMENT: &[TextureType] = &[Diffuse, Bump, Environment, Mask];
const DIFFUSE_LIGHTMAP_BUMP_MASK_ENVIRONMENT: &[TextureType] =
    &[Diffuse, Lightmap, Bump, Mask, MiniBump1, MiniBump2, Environment];
const DIFFUSE_BUMP_EMISSION: &[TextureType] = &[Diffuse, Bump, Emission];
const DIFFUSE_BUMP_SPECULAR_EMISSION: &[TextureType] = &[Diffuse, Bump, Specular, Emission];
const DIFFUSE_BUMP_SPECULAR: &[TextureType] = &[Diffuse, Bump, Specular];

const fn opaque(id: u32, slots: &'static [TextureType]) -> RenderGroup {
    RenderGroup { id, alpha: false, slots }
}

const fn blended(id: u32, slots: &'static [TextureType]) -> RenderGroup {
    RenderGroup { id, alpha: true, slots }
}

/// Every permutation the engine knows, opaque entries followed by their alpha twin.
///
/// Resolution ties are broken by position in this table.
pub static CATALOG: [RenderGroup; 28] = [
    opaque(5, DIFFUSE),
    blended(7, DIFFUSE),
    opaque(3, DIFFUSE_LIGHTMAP),
    blended(9, DIFFUSE_LIGHTMAP),
    opaque(4, DIFFUSE_BUMP),
    blended(6, DIFFUSE_BUMP),
    opaque(2, DIFFUSE_LIGHTMAP_BUMP),
    blended(8, DIFFUSE_LIGHTMAP_BUMP),
    opaque(1, DIFFUSE_LIGHTMAP_BUMP_MASK),
    blended(20, DIFFUSE_LIGHTMAP_BUMP_MASK),
    opaque(22, DIFFUSE_LIGHTMAP_BUMP_MASK_SPECULAR),
    blended(23, DIFFUSE_LIGHTMAP_BUMP_MASK_SPECULAR),
    opaque(24, DIFFUSE_LIGHTMAP_BUMP_SPECULAR),
    blended(25, DIFFUSE_LIGHTMAP_BUMP_SPECULAR),
    opaque(26, DIFFUSE_BUMP_ENVIRONMENT),
    blended(27, DIFFUSE_BUMP_ENVIRONMENT),
    opaque(28, DIFFUSE_LIGHTMAP_BUMP_MASK_ENVIRONMENT),
    blended(29, DIFFUSE_LIGHTMAP_BUMP_MASK_ENVIRONMENT),
    opaque(30, DIFFUSE_BUMP_EMISSION),
    blended(31, DIFFUSE_BUMP_EMISSION),
    // Diffuse with highlights
    opaque(32, DIFFUSE),
    blended(33, DIFFUSE),
    // Diffuse, bump and mini emission
    opaque(36, DIFFUSE_BUMP_EMISSION),
    blended(37, DIFFUSE_BUMP_EMISSION),
    opaque(38, DIFFUSE_BUMP_SPECULAR_EMISSION),
    blended(39, DIFFUSE_BUMP_SPECULAR_EMISSION),
    opaque(40, DIFFUSE_BUMP_SPECULAR),
    blended(41, DIFFUSE_BUMP_SPECULAR),
];

impl RenderGroup {
    /// All catalog entries.
    pub fn catalog() -> &'static [RenderGroup] {
        &CATALOG
    }

    /// Look up an entry by the id written in mesh headers.
    pub fn by_id(id: u32) -> Option<&'static RenderGroup> {
        CATALOG.iter().find(|group| group.id == id)
    }

    /// Most specific entry with the given alpha flag that supports every active slot.
    ///
    /// Returns `None` when no entry covers the slots; such a material cannot be exported.
    pub fn resolve(active: &[TextureType], alpha: bool) -> Option<&'static RenderGroup> {
        CATALOG
            .iter()
            .filter(|group| group.alpha == alpha && group.covers(active))
            .min_by_key(|group| group.slots.len())
    }

    /// Whether this entry has a slot of the given type.
    pub fn supports(&self, slot: TextureType) -> bool {
        self.slots.contains(&slot)
    }

    /// Whether every slot in `active` is supported.
    pub fn covers(&self, active: &[TextureType]) -> bool {
        active.iter().all(|slot| self.supports(*slot))
    }
}

impl fmt::Display for RenderGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<&str> = self.slots.iter().map(|slot| slot.code()).collect();
        write!(
            f,
            "{} - {} {}",
            self.id,
            slots.join(", "),
            if self.alpha { "with Transparency" } else { "without Transparency" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::TextureType::*;
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_diffuse_only_resolves_to_minimal_group() {
        let group = RenderGroup::resolve(&[Diffuse], false).unwrap();
        assert_eq!(group.id, 5);
    }

    #[test]
    fn test_adding_lightmap_picks_diffuse_lightmap() {
        let group = RenderGroup::resolve(&[Diffuse, Lightmap], false).unwrap();
        assert_eq!(group.id, 3);
        assert_eq!(group.slots, &[Diffuse, Lightmap]);
    }

    #[test]
    fn test_alpha_selects_twin() {
        assert_eq!(RenderGroup::resolve(&[Diffuse], true).unwrap().id, 7);
        assert_eq!(RenderGroup::resolve(&[Diffuse, Bump], true).unwrap().id, 6);
    }

    #[test]
    fn test_slot_order_does_not_matter() {
        let group = RenderGroup::resolve(&[Emission, Bump], false).unwrap();
        assert_eq!(group.id, 30);
    }

    #[test]
    fn test_unsatisfiable_slots() {
        // Nothing pairs environment with emission
        assert!(RenderGroup::resolve(&[Environment, Emission], false).is_none());
    }

    #[test]
    fn test_empty_material_resolves_to_diffuse() {
        assert_eq!(RenderGroup::resolve(&[], false).unwrap().id, 5);
    }

    #[test]
    fn test_display() {
        let group = RenderGroup::by_id(3).unwrap();
        assert_eq!(group.to_string(), "3 - Diffuse, Lightmap without Transparency");
    }
}
