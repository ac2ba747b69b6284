//! Materials and the session-wide material registry.
//!
//! Meshes with the same textures, render parameters and transparency share a
//! single [`Material`]. The registry hands out [`MaterialId`] handles; freed
//! slots are left empty so handles held elsewhere never alias a different
//! material.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::render_group::{RenderGroup, TextureType};
use crate::translatable::Translatable;

/// Render parameters used when a mesh header carries none.
pub const DEFAULT_RENDER_PARAMETERS: [f32; 3] = [1.0, 0.0, 0.0];

/// Handle to a material in a [`MaterialRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(usize);

impl MaterialId {
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A texture file bound to a slot.
#[derive(Clone, Debug)]
pub struct Texture {
    pub name: Translatable,

    /// UV layer the texture samples
    pub uv_layer: u32,
}

impl Texture {
    pub fn new(name: impl Into<String>, uv_layer: u32) -> Self {
        Self {
            name: Translatable::new(name),
            uv_layer,
        }
    }

    /// A texture counts as filled when its committed name is non-empty.
    pub fn is_active(&self) -> bool {
        !self.name.translated_name().is_empty()
    }
}

// Two textures are the same when they would be written identically.
impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.name.translated_name() == other.name.translated_name() && self.uv_layer == other.uv_layer
    }
}

/// Texture slots, render parameters and transparency shared by meshes.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Slot assignments; entries with an empty name are inactive
    pub textures: BTreeMap<TextureType, Texture>,

    /// Three shader parameters written after the mesh name
    pub render_parameters: [f32; 3],

    pub alpha_enabled: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            textures: BTreeMap::new(),
            render_parameters: DEFAULT_RENDER_PARAMETERS,
            alpha_enabled: false,
        }
    }
}

impl Material {
    /// Bind `textures` positionally to the slots of `group`.
    ///
    /// Textures beyond the group's slot count are dropped.
    pub fn from_group(
        group: &RenderGroup,
        textures: impl IntoIterator<Item = Texture>,
        render_parameters: [f32; 3],
    ) -> Self {
        Self {
            textures: group.slots.iter().copied().zip(textures).collect(),
            render_parameters,
            alpha_enabled: group.alpha,
        }
    }

    /// Slots holding an active texture, in slot order.
    pub fn active_slots(&self) -> Vec<TextureType> {
        self.textures
            .iter()
            .filter(|(_, texture)| texture.is_active())
            .map(|(slot, _)| *slot)
            .collect()
    }

    /// Render group this material is written with, derived from the active
    /// slots and the alpha flag. `None` blocks export.
    pub fn render_group(&self) -> Option<&'static RenderGroup> {
        RenderGroup::resolve(&self.active_slots(), self.alpha_enabled)
    }

    /// Whether a render group can be resolved.
    pub fn is_valid(&self) -> bool {
        self.render_group().is_some()
    }

    /// Whether `other` would serialize identically and can be shared.
    pub fn same_signature(&self, other: &Material) -> bool {
        let active = |material: &Material| -> Vec<(TextureType, Texture)> {
            material
                .textures
                .iter()
                .filter(|(_, texture)| texture.is_active())
                .map(|(slot, texture)| (*slot, texture.clone()))
                .collect()
        };
        self.alpha_enabled == other.alpha_enabled
            && self.render_parameters == other.render_parameters
            && active(self) == active(other)
    }

    /// Move the textures onto the slots of `group`, in their current slot order.
    ///
    /// Only slots and transparency change; the group written afterwards is
    /// whatever those resolve to, which is `group` unless a smaller entry
    /// covers the same slots.
    pub fn retarget(&mut self, group: &RenderGroup) {
        let order: Vec<TextureType> = match self.render_group() {
            Some(current) => current.slots.to_vec(),
            None => self.textures.keys().copied().collect(),
        };
        let mut textures = std::mem::take(&mut self.textures);
        let ordered = order.iter().filter_map(|slot| textures.remove(slot));
        self.textures = group.slots.iter().copied().zip(ordered).collect();
        self.alpha_enabled = group.alpha;
    }

    /// Textures in slot order, for renaming.
    pub fn textures_mut(&mut self) -> impl Iterator<Item = &mut Texture> {
        self.textures.values_mut()
    }
}

/// Registry of materials shared by the meshes of a session.
#[derive(Clone, Debug, Default)]
pub struct MaterialRegistry {
    slots: Vec<Option<Material>>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return an existing material with the same signature, or register `material`.
    ///
    /// The flag is true when a new material was created.
    pub fn find_or_insert(&mut self, material: Material) -> (MaterialId, bool) {
        if let Some((id, _)) = self.iter().find(|(_, existing)| existing.same_signature(&material)) {
            return (id, false);
        }
        (self.insert(material), true)
    }

    pub fn insert(&mut self, material: Material) -> MaterialId {
        self.slots.push(Some(material));
        MaterialId(self.slots.len() - 1)
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, id: MaterialId) -> Option<Material> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|material| (MaterialId(i), material)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MaterialId, &mut Material)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|material| (MaterialId(i), material)))
    }

    /// Number of live materials.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::TextureType::*;
    use super::*;

    fn diffuse_lightmap(diffuse: &str, lightmap: &str) -> Material {
        let group = RenderGroup::by_id(3).unwrap();
        Material::from_group(
            group,
            [Texture::new(diffuse, 0), Texture::new(lightmap, 1)],
            DEFAULT_RENDER_PARAMETERS,
        )
    }

    #[test]
    fn test_texture_equality_ignores_original_name() {
        let mut a = Texture::new("skin.png", 0);
        let b = Texture::new("body.png", 0);
        assert_ne!(a, b);
        a.name.set_translated("body.png");
        assert_eq!(a, b);
        assert_ne!(a, Texture::new("body.png", 1));
    }

    #[test]
    fn test_full_slots_keep_their_group() {
        let material = diffuse_lightmap("skin.png", "skin_lm.png");
        assert_eq!(material.render_group().unwrap().id, 3);
    }

    #[test]
    fn test_group_follows_active_slots() {
        let mut material = diffuse_lightmap("skin.png", "skin_lm.png");
        material.textures.get_mut(&Lightmap).unwrap().name.set_translated("");
        assert_eq!(material.render_group().unwrap().id, 5);

        material.alpha_enabled = true;
        assert_eq!(material.render_group().unwrap().id, 7);
        material.alpha_enabled = false;

        material.textures.insert(Emission, Texture::new("glow.png", 0));
        material.textures.insert(Environment, Texture::new("env.png", 0));
        assert!(material.render_group().is_none());
        assert!(!material.is_valid());
    }

    #[test]
    fn test_diffuse_variant_resolves_to_minimal_group() {
        let highlights = RenderGroup::by_id(32).unwrap();
        let material = Material::from_group(
            highlights,
            [Texture::new("skin.png", 0)],
            DEFAULT_RENDER_PARAMETERS,
        );
        assert_eq!(material.render_group().unwrap().id, 5);

        // Read with either id, the two are the same material
        let plain = Material::from_group(
            RenderGroup::by_id(5).unwrap(),
            [Texture::new("skin.png", 0)],
            DEFAULT_RENDER_PARAMETERS,
        );
        assert!(material.same_signature(&plain));
    }

    #[test]
    fn test_find_or_insert_shares_identical_materials() {
        let mut registry = MaterialRegistry::new();
        let (first, created) = registry.find_or_insert(diffuse_lightmap("a.png", "b.png"));
        assert!(created);
        let (second, created) = registry.find_or_insert(diffuse_lightmap("a.png", "b.png"));
        assert!(!created);
        assert_eq!(first, second);

        let (third, created) = registry.find_or_insert(diffuse_lightmap("a.png", "c.png"));
        assert!(created);
        assert_ne!(first, third);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_keeps_other_handles() {
        let mut registry = MaterialRegistry::new();
        let a = registry.insert(Material::default());
        let b = registry.insert(diffuse_lightmap("x.png", "y.png"));
        assert!(registry.remove(a).is_some());
        assert!(registry.get(a).is_none());
        assert_eq!(registry.get(b).unwrap().active_slots(), vec![Diffuse, Lightmap]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_retarget_remaps_positionally() {
        let mut material = diffuse_lightmap("skin.png", "skin_bump.png");
        let bump_alpha = RenderGroup::by_id(6).unwrap();

        material.retarget(bump_alpha);

        assert!(material.alpha_enabled);
        assert_eq!(material.active_slots(), vec![Diffuse, Bump]);
        assert_eq!(material.textures[&Bump].name.translated_name(), "skin_bump.png");
        assert_eq!(material.render_group().unwrap().id, 6);
    }
}
