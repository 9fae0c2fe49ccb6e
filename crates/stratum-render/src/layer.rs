#![forbid(unsafe_code)]

//! Layers and the layer manager.
//!
//! A [`Layer`] is one stacking context: a cell grid positioned on screen by
//! its `bounds`, drawn at a z-index with a visibility flag and an opacity.
//! Grid coordinates are local to the layer; `bounds.x/y` is the screen
//! position of local `(0, 0)`.
//!
//! The [`LayerManager`] owns every layer of a session. The root layer
//! (`LayerId::ROOT`, z 0, full screen) always exists. Sort order is computed
//! lazily and cached until something that affects it changes.

use stratum_core::geometry::Rect;
use stratum_core::ids::{LayerId, NodeId};

use crate::cell::Cell;
use crate::grid::CellGrid;

#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    z_index: i32,
    bounds: Rect,
    node_id: Option<NodeId>,
    pub grid: CellGrid,
    visible: bool,
    opacity: f32,
    /// Creation sequence; breaks z ties.
    seq: u64,
}

impl Layer {
    pub fn new(id: LayerId, z_index: i32, bounds: Rect, node_id: Option<NodeId>) -> Self {
        Self {
            id,
            z_index,
            bounds,
            node_id,
            grid: CellGrid::new(bounds.width, bounds.height),
            visible: true,
            opacity: 1.0,
            seq: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> LayerId {
        self.id
    }

    #[inline]
    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    pub fn node_id(&self) -> Option<NodeId> {
        self.node_id
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Whether this layer contributes anything when compositing.
    #[inline]
    pub fn is_drawn(&self) -> bool {
        self.visible && self.opacity > 0.0 && !self.bounds.is_empty()
    }

    /// Move and/or resize. Content keeps its screen position where the old
    /// and new bounds overlap; everything else is blank.
    pub fn set_bounds(&mut self, bounds: Rect) {
        if bounds == self.bounds {
            return;
        }
        let mut grid = CellGrid::new(bounds.width, bounds.height);
        if let Some(overlap) = self.bounds.intersection_opt(&bounds) {
            let local = Rect::new(
                overlap.x - self.bounds.x,
                overlap.y - self.bounds.y,
                overlap.width,
                overlap.height,
            );
            let piece = self.grid.copy_region(local);
            grid.paste_buffer(&piece, overlap.x - bounds.x, overlap.y - bounds.y);
            grid.mark_all_dirty();
        }
        self.bounds = bounds;
        self.grid = grid;
    }

    /// Clamped to `[0, 1]`; NaN becomes 0.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() {
            0.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
    }

    /// The cell covering screen position `(x, y)`, if inside the bounds.
    #[inline]
    pub fn cell_at(&self, x: u16, y: u16) -> Option<&Cell> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        self.grid.get_cell(x - self.bounds.x, y - self.bounds.y)
    }

    /// Dirty regions translated to screen coordinates.
    pub fn screen_dirty_regions(&self) -> impl Iterator<Item = Rect> + '_ {
        let (ox, oy) = (self.bounds.x as i32, self.bounds.y as i32);
        self.grid
            .dirty_regions()
            .iter()
            .map(move |r| r.translate(ox, oy))
    }
}

#[derive(Debug, Clone)]
pub struct LayerManager {
    width: u16,
    height: u16,
    layers: Vec<Layer>,
    /// Indices into `layers`, bottom first. `None` when stale.
    sort_order: Option<Vec<usize>>,
    next_seq: u64,
    structure_changed: bool,
}

impl LayerManager {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            layers: vec![Layer::new(
                LayerId::ROOT,
                0,
                Rect::from_size(width, height),
                None,
            )],
            sort_order: None,
            next_seq: 1,
            structure_changed: true,
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    pub fn screen(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Never true: the root layer always exists.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn root(&self) -> &Layer {
        &self.layers[0]
    }

    pub fn root_mut(&mut self) -> &mut Layer {
        &mut self.layers[0]
    }

    fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.position(id).map(|i| &self.layers[i])
    }

    /// Mutable access to a layer's grid and bounds. Use the manager's
    /// setters for z-index, visibility, and opacity so the sort cache and
    /// structure flag stay correct.
    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.position(id).map(|i| &mut self.layers[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.layers.iter()
    }

    /// Create a layer, or update an existing one in place (z, bounds, node).
    /// Bounds are clipped to the screen.
    pub fn create_layer(
        &mut self,
        id: LayerId,
        z_index: i32,
        bounds: Rect,
        node_id: Option<NodeId>,
    ) -> &mut Layer {
        let bounds = bounds.intersection(&self.screen());
        if let Some(i) = self.position(id) {
            let layer = &mut self.layers[i];
            if layer.z_index != z_index {
                layer.z_index = z_index;
                self.sort_order = None;
                self.structure_changed = true;
            }
            if layer.bounds != bounds {
                layer.set_bounds(bounds);
                self.structure_changed = true;
            }
            layer.node_id = node_id;
            return &mut self.layers[i];
        }

        stratum_core::debug!(layer = %id, z_index, "layer created");
        let mut layer = Layer::new(id, z_index, bounds, node_id);
        layer.seq = self.next_seq;
        self.next_seq += 1;
        self.layers.push(layer);
        self.sort_order = None;
        self.structure_changed = true;
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }

    /// Remove a layer. The root layer cannot be removed.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        if id.is_root() {
            return false;
        }
        let Some(i) = self.position(id) else {
            return false;
        };
        self.layers.remove(i);
        self.sort_order = None;
        self.structure_changed = true;
        stratum_core::debug!(layer = %id, "layer removed");
        true
    }

    /// Remove every layer except root.
    pub fn reset_layers(&mut self) {
        if self.layers.len() > 1 {
            self.layers.truncate(1);
            self.sort_order = None;
            self.structure_changed = true;
        }
    }

    pub fn set_z_index(&mut self, id: LayerId, z_index: i32) -> bool {
        match self.get_mut(id) {
            Some(layer) => {
                if layer.z_index != z_index {
                    layer.z_index = z_index;
                    self.invalidate_sort_order();
                }
                true
            }
            None => false,
        }
    }

    pub fn set_bounds(&mut self, id: LayerId, bounds: Rect) -> bool {
        let screen = self.screen();
        match self.get_mut(id) {
            Some(layer) => {
                let bounds = bounds.intersection(&screen);
                if layer.bounds != bounds {
                    layer.set_bounds(bounds);
                    self.structure_changed = true;
                }
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> bool {
        match self.get_mut(id) {
            Some(layer) => {
                if layer.visible != visible {
                    layer.visible = visible;
                    self.structure_changed = true;
                }
                true
            }
            None => false,
        }
    }

    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) -> bool {
        match self.get_mut(id) {
            Some(layer) => {
                let before = layer.opacity;
                layer.set_opacity(opacity);
                if layer.opacity != before {
                    self.structure_changed = true;
                }
                true
            }
            None => false,
        }
    }

    /// Drop the cached sort order (and force the next dirty composite to be
    /// full, since stacking changed).
    pub fn invalidate_sort_order(&mut self) {
        self.sort_order = None;
        self.structure_changed = true;
    }

    fn ensure_sort_order(&mut self) {
        if self.sort_order.is_some() {
            return;
        }
        let mut order: Vec<usize> = (0..self.layers.len()).collect();
        order.sort_by_key(|&i| (self.layers[i].z_index, self.layers[i].seq));
        self.sort_order = Some(order);
        self.structure_changed = true;
    }

    /// All layers, ascending z (ties in creation order).
    pub fn get_sorted_layers(&mut self) -> Vec<&Layer> {
        self.ensure_sort_order();
        self.sorted().collect()
    }

    pub(crate) fn sorted(&self) -> impl DoubleEndedIterator<Item = &Layer> + '_ {
        self.sort_order
            .iter()
            .flatten()
            .map(move |&i| &self.layers[i])
    }

    /// Visible layers whose bounds contain the point, top-most first.
    pub fn get_layers_at_point(&mut self, x: u16, y: u16) -> Vec<&Layer> {
        self.ensure_sort_order();
        self.sorted()
            .rev()
            .filter(|l| l.visible && l.bounds.contains(x, y))
            .collect()
    }

    /// Resize the screen. The root layer follows it; other layers are
    /// clipped to it.
    pub fn resize(&mut self, width: u16, height: u16) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        let screen = self.screen();
        for layer in &mut self.layers {
            let bounds = if layer.id.is_root() {
                screen
            } else {
                layer.bounds.intersection(&screen)
            };
            layer.set_bounds(bounds);
            layer.grid.mark_all_dirty();
        }
        self.structure_changed = true;
    }

    /// Something other than cell content changed since the last
    /// [`Self::mark_clean`].
    #[inline]
    pub fn structure_changed(&self) -> bool {
        self.structure_changed
    }

    /// Whether any layer has dirty cells.
    pub fn any_dirty(&self) -> bool {
        self.layers.iter().any(|l| l.grid.is_dirty())
    }

    /// Clear every layer's dirty regions and the structure flag.
    pub fn mark_clean(&mut self) {
        for layer in &mut self.layers {
            layer.grid.mark_clean();
        }
        self.structure_changed = false;
    }
}
