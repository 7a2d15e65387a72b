use std::collections::HashSet;

use tracing::debug;

use crate::layer::{Layer, LayerId, LayerPatch, NewLayer, StickerLayer, TextLayer};

/// Offset applied to a duplicate so it does not sit exactly on its source.
const DUPLICATE_OFFSET: f32 = 20.0;

/// Ordered layer sequence. Index 0 is drawn first (bottom).
///
/// Ids are unique across the stack. Operations on an unknown id are no-ops.
#[derive(Clone, Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: Option<LayerId>,
    next_id: u64,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt layers from a saved document, renaming any id that collides.
    pub fn from_layers(layers: impl IntoIterator<Item = Layer>) -> Self {
        let mut stack = Self::new();
        let mut seen = HashSet::new();
        for mut layer in layers {
            if let Some(n) = id_number(layer.id()) {
                stack.next_id = stack.next_id.max(n.saturating_add(1));
            }
            if !seen.insert(layer.id().clone()) {
                let id = stack.fresh_id(layer.kind());
                debug!(old = %layer.id(), new = %id, "renamed duplicate layer id");
                seen.insert(id.clone());
                layer.set_id(id);
            }
            stack.layers.push(layer);
        }
        stack
    }

    fn fresh_id(&mut self, kind: &str) -> LayerId {
        loop {
            let id = LayerId(format!("{kind}-{}", self.next_id));
            // Wraps past u64::MAX; the collision check keeps ids unique
            self.next_id = self.next_id.wrapping_add(1);
            if self.index_of(&id).is_none() {
                return id;
            }
        }
    }

    fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    /// Add a layer on top, built from the kind's defaults with `overrides`
    /// merged in. The new layer becomes active.
    pub fn create(&mut self, kind: NewLayer, overrides: LayerPatch) -> LayerId {
        let mut layer = match kind {
            NewLayer::Text => Layer::Text(TextLayer::default()),
            NewLayer::Sticker { src } => Layer::Sticker(StickerLayer {
                src,
                ..Default::default()
            }),
        };
        overrides.apply_to(&mut layer);

        let id = self.fresh_id(layer.kind());
        layer.set_id(id.clone());
        debug!(layer = %id, "created layer");
        self.layers.push(layer);
        self.active = Some(id.clone());
        id
    }

    /// Merge `patch` into the layer. Returns false when `id` is unknown.
    pub fn update(&mut self, id: &LayerId, patch: &LayerPatch) -> bool {
        match self.layers.iter_mut().find(|l| l.id() == id) {
            Some(layer) => {
                patch.apply_to(layer);
                true
            }
            None => false,
        }
    }

    /// Remove the layer, clearing the selection if it pointed there.
    pub fn delete(&mut self, id: &LayerId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.layers.remove(index);
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        true
    }

    /// Clone a layer 20px right and down under a new id, placed on top and
    /// selected.
    pub fn duplicate(&mut self, id: &LayerId) -> Option<LayerId> {
        let mut copy = self.get(id)?.clone();
        copy.offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
        let new_id = self.fresh_id(copy.kind());
        copy.set_id(new_id.clone());
        self.layers.push(copy);
        self.active = Some(new_id.clone());
        Some(new_id)
    }

    pub fn select(&mut self, id: &LayerId) -> bool {
        if self.index_of(id).is_some() {
            self.active = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&LayerId> {
        self.active.as_ref()
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn as_slice(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Move a layer to `to_index` (clamped to the top).
    pub fn move_layer(&mut self, id: &LayerId, to_index: usize) -> bool {
        let Some(from) = self.index_of(id) else {
            return false;
        };
        let layer = self.layers.remove(from);
        let to = to_index.min(self.layers.len());
        self.layers.insert(to, layer);
        true
    }

    pub fn bring_forward(&mut self, id: &LayerId) -> bool {
        match self.index_of(id) {
            Some(i) if i + 1 < self.layers.len() => {
                self.layers.swap(i, i + 1);
                true
            }
            _ => false,
        }
    }

    pub fn send_backward(&mut self, id: &LayerId) -> bool {
        match self.index_of(id) {
            Some(i) if i > 0 => {
                self.layers.swap(i, i - 1);
                true
            }
            _ => false,
        }
    }
}

impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn id_number(id: &LayerId) -> Option<u64> {
    id.as_str().rsplit('-').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(stack: &LayerStack) -> Vec<String> {
        stack.iter().map(|l| l.id().to_string()).collect()
    }

    fn sticker(src: &str) -> NewLayer {
        NewLayer::Sticker {
            src: src.to_string(),
        }
    }

    #[test]
    fn create_yields_unique_ids() {
        let mut stack = LayerStack::new();
        let mut seen = HashSet::new();
        for i in 0..25 {
            let kind = if i % 2 == 0 { NewLayer::Text } else { sticker("a.png") };
            let id = stack.create(kind, LayerPatch::default());
            assert!(seen.insert(id.clone()), "duplicate id {id}");
        }
        assert_eq!(stack.len(), 25);
    }

    #[test]
    fn create_merges_overrides_and_selects() {
        let mut stack = LayerStack::new();
        let id = stack.create(NewLayer::Text, LayerPatch::content("Hi"));
        assert_eq!(stack.active(), Some(&id));
        let Some(Layer::Text(t)) = stack.get(&id) else {
            panic!("expected text layer");
        };
        assert_eq!(t.content, "Hi");
        assert_eq!(t.font_size, 24.0);
        assert!(id.as_str().starts_with("text-"));
    }

    #[test]
    fn delete_keeps_relative_order() {
        let mut stack = LayerStack::new();
        let a = stack.create(NewLayer::Text, LayerPatch::default());
        let b = stack.create(sticker("b"), LayerPatch::default());
        let c = stack.create(NewLayer::Text, LayerPatch::default());
        assert!(stack.delete(&b));
        assert_eq!(stack.len(), 2);
        assert_eq!(ids(&stack), vec![a.to_string(), c.to_string()]);
    }

    #[test]
    fn delete_clears_matching_selection_only() {
        let mut stack = LayerStack::new();
        let a = stack.create(NewLayer::Text, LayerPatch::default());
        let b = stack.create(NewLayer::Text, LayerPatch::default());
        stack.select(&a);
        stack.delete(&b);
        assert_eq!(stack.active(), Some(&a));
        stack.delete(&a);
        assert_eq!(stack.active(), None);
    }

    #[test]
    fn unknown_ids_are_noops() {
        let mut stack = LayerStack::new();
        stack.create(NewLayer::Text, LayerPatch::default());
        let ghost = LayerId::from("text-999");
        assert!(!stack.update(&ghost, &LayerPatch::position(1.0, 1.0)));
        assert!(!stack.delete(&ghost));
        assert!(stack.duplicate(&ghost).is_none());
        assert!(!stack.select(&ghost));
        assert!(!stack.move_layer(&ghost, 0));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn duplicate_offsets_both_kinds() {
        let mut stack = LayerStack::new();
        for kind in [NewLayer::Text, sticker("s.png")] {
            let id = stack.create(kind, LayerPatch::position(10.0, 30.0));
            let copy = stack.duplicate(&id).unwrap();
            assert_ne!(copy, id);
            let bounds = stack.get(&copy).unwrap().bounds();
            assert_eq!((bounds.x, bounds.y), (30.0, 50.0));
            assert_eq!(stack.iter().last().unwrap().id(), &copy);
            assert_eq!(stack.active(), Some(&copy));
        }
    }

    #[test]
    fn reorder() {
        let mut stack = LayerStack::new();
        let a = stack.create(NewLayer::Text, LayerPatch::default());
        let b = stack.create(NewLayer::Text, LayerPatch::default());
        let c = stack.create(NewLayer::Text, LayerPatch::default());

        assert!(stack.bring_forward(&a));
        assert_eq!(ids(&stack), vec![b.to_string(), a.to_string(), c.to_string()]);
        assert!(!stack.bring_forward(&c));
        assert!(stack.send_backward(&c));
        assert_eq!(ids(&stack), vec![b.to_string(), c.to_string(), a.to_string()]);
        assert!(!stack.send_backward(&b));
        assert!(stack.move_layer(&b, 99));
        assert_eq!(ids(&stack), vec![c.to_string(), a.to_string(), b.to_string()]);
    }

    #[test]
    fn from_layers_renames_collisions() {
        let layers = vec![
            Layer::Text(TextLayer::default()),
            Layer::Text(TextLayer::default()),
            Layer::Sticker(StickerLayer {
                id: LayerId::from("sticker-5"),
                ..Default::default()
            }),
        ];
        let mut stack = LayerStack::from_layers(layers);
        let all = ids(&stack);
        assert_eq!(all.len(), 3);
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 3, "{all:?}");

        let fresh = stack.create(NewLayer::Text, LayerPatch::default());
        assert!(!all.contains(&fresh.to_string()), "{fresh} reused");
    }

    #[test]
    fn saved_ids_at_the_numeric_limit() {
        let max = u64::MAX;
        let layers = vec![
            Layer::Text(TextLayer {
                id: LayerId::from(format!("text-{max}").as_str()),
                ..Default::default()
            }),
            Layer::Text(TextLayer {
                id: LayerId::from(format!("text-{max}").as_str()),
                ..Default::default()
            }),
        ];
        let mut stack = LayerStack::from_layers(layers);
        let first = stack.create(NewLayer::Text, LayerPatch::default());
        let second = stack.create(NewLayer::Text, LayerPatch::default());

        let all = ids(&stack);
        assert_eq!(all.len(), 4);
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 4, "{all:?}");
        assert_ne!(first, second);
    }
}
