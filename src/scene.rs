// ── Scene state buffers ───────────────────────────────────────────────────────
//
// The three grid-shaped buffers the compositor reads each frame:
//
// - layer references, 4 floats per cell: (front_col, front_row, back_col, back_row)
// - front modifiers, 4 bytes per cell: (tint_r, tint_g, tint_b, flip)
// - back modifiers, same layout
//
// Writes are tracked as a dirty rectangle so a GPU copy can upload only the
// part that changed since the last frame.

use glam::{IVec2, UVec2, Vec2, Vec4};

use crate::compose::layer::LayerRef;
use crate::compose::modifier::{Flip, Modifier};

// ── TileLayer ─────────────────────────────────────────────────────────────────

/// Contents of one layer of one cell, as written by the scene manager.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TileLayer {
    pub tile: LayerRef,
    pub tint: [u8; 3],
    pub flip: Flip,
}

impl TileLayer {
    /// Transparent layer with a black tint.
    pub const EMPTY: Self = Self { tile: LayerRef::None, tint: [0, 0, 0], flip: Flip::None };

    pub fn new(tile: LayerRef, tint: [u8; 3], flip: Flip) -> Self {
        Self { tile, tint, flip }
    }

    /// Solid colour, no atlas lookup.
    pub fn fill(tint: [u8; 3]) -> Self {
        Self { tile: LayerRef::Fill, tint, flip: Flip::None }
    }
}

// ── CellState ─────────────────────────────────────────────────────────────────

/// Everything the compositor needs for one cell, decoded from the buffers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellState {
    pub front: LayerRef,
    pub back: LayerRef,
    pub front_modifier: Modifier,
    pub back_modifier: Modifier,
}

impl CellState {
    /// What a cell outside the grid reads as: nothing on either layer.
    pub const EMPTY: Self = Self {
        front: LayerRef::None,
        back: LayerRef::None,
        front_modifier: Modifier { tint: Vec4::ONE, flip: Flip::None },
        back_modifier: Modifier { tint: Vec4::ONE, flip: Flip::None },
    };
}

// ── DirtyRegion ───────────────────────────────────────────────────────────────

/// Rectangle of cells written since the last upload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DirtyRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DirtyRegion {
    /// Copy this rectangle out of a grid-shaped buffer, row-major.
    pub fn extract<T: Copy>(&self, buffer: &[T], stride: u32) -> Vec<T> {
        let mut out = Vec::with_capacity((self.width * self.height) as usize);
        for row in self.y..self.y + self.height {
            let start = (row * stride + self.x) as usize;
            out.extend_from_slice(&buffer[start..start + self.width as usize]);
        }
        out
    }
}

// ── Scene ─────────────────────────────────────────────────────────────────────

pub struct Scene {
    /// Visible grid.
    size: UVec2,
    /// Allocated grid; only ever grows, so cells hidden by a smaller
    /// viewport survive until it grows again.
    capacity: UVec2,
    layer_refs: Vec<[f32; 4]>,
    front_modifiers: Vec<[u8; 4]>,
    back_modifiers: Vec<[u8; 4]>,
    /// Inclusive bounds of the pending upload, `None` when clean.
    dirty: Option<(UVec2, UVec2)>,
}

impl Scene {
    /// New scene with every front layer `None` and every back layer a white
    /// `Fill`, so an untouched scene shows as white.
    pub fn new(size: UVec2) -> Self {
        let count = (size.x * size.y) as usize;
        let none = LayerRef::None.encode();
        let fill = LayerRef::Fill.encode();
        let blank = Modifier::encode([255, 255, 255], Flip::None);
        Self {
            size,
            capacity: size,
            layer_refs: vec![[none[0], none[1], fill[0], fill[1]]; count],
            front_modifiers: vec![blank; count],
            back_modifiers: vec![blank; count],
            dirty: Self::full_region(size),
        }
    }

    fn full_region(size: UVec2) -> Option<(UVec2, UVec2)> {
        if size.x == 0 || size.y == 0 {
            None
        } else {
            Some((UVec2::ZERO, size - UVec2::ONE))
        }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn contains(&self, position: IVec2) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.size.x
            && (position.y as u32) < self.size.y
    }

    fn index_of(&self, position: IVec2) -> Option<usize> {
        self.contains(position)
            .then(|| (position.y as u32 * self.capacity.x + position.x as u32) as usize)
    }

    /// Row length of the raw buffers, in cells. At least `size().x`.
    pub fn stride(&self) -> u32 {
        self.capacity.x
    }

    /// Raw buffers are `stride()` cells wide; rows past `size()` hold hidden
    /// cells.
    pub fn layer_refs(&self) -> &[[f32; 4]] {
        &self.layer_refs
    }

    pub fn front_modifiers(&self) -> &[[u8; 4]] {
        &self.front_modifiers
    }

    pub fn back_modifiers(&self) -> &[[u8; 4]] {
        &self.back_modifiers
    }

    /// Write both layers of one cell.
    ///
    /// Positions outside the grid are ignored. Returns `true` only when the
    /// stored content actually changed.
    pub fn set_tile(&mut self, position: IVec2, front: TileLayer, back: TileLayer) -> bool {
        let Some(index) = self.index_of(position) else {
            return false;
        };

        let f = front.tile.encode();
        let b = back.tile.encode();
        let refs = [f[0], f[1], b[0], b[1]];
        let front_mod = Modifier::encode(front.tint, front.flip);
        let back_mod = Modifier::encode(back.tint, back.flip);

        if self.layer_refs[index] == refs
            && self.front_modifiers[index] == front_mod
            && self.back_modifiers[index] == back_mod
        {
            return false;
        }

        self.layer_refs[index] = refs;
        self.front_modifiers[index] = front_mod;
        self.back_modifiers[index] = back_mod;
        self.mark_dirty(position.as_uvec2());
        true
    }

    /// Set every cell to `None` on both layers with a black tint. Returns
    /// whether any cell changed.
    pub fn clear(&mut self) -> bool {
        let empty = TileLayer::EMPTY;
        let mut changed = false;
        for y in 0..self.size.y as i32 {
            for x in 0..self.size.x as i32 {
                changed |= self.set_tile(IVec2::new(x, y), empty, empty);
            }
        }
        changed
    }

    /// Change the visible grid size.
    ///
    /// Cells outside the new size are hidden, not discarded: growing again
    /// shows them as they were. Cells never allocated before start out like
    /// those of `Scene::new`.
    pub fn resize(&mut self, size: UVec2) {
        if size == self.size {
            return;
        }
        if size.x > self.capacity.x || size.y > self.capacity.y {
            self.grow(self.capacity.max(size));
        }
        self.size = size;
        self.dirty = Self::full_region(size);
    }

    fn grow(&mut self, capacity: UVec2) {
        let mut next = Scene::new(capacity);
        for y in 0..self.capacity.y {
            for x in 0..self.capacity.x {
                let src = (y * self.capacity.x + x) as usize;
                let dst = (y * capacity.x + x) as usize;
                next.layer_refs[dst] = self.layer_refs[src];
                next.front_modifiers[dst] = self.front_modifiers[src];
                next.back_modifiers[dst] = self.back_modifiers[src];
            }
        }
        self.capacity = capacity;
        self.layer_refs = next.layer_refs;
        self.front_modifiers = next.front_modifiers;
        self.back_modifiers = next.back_modifiers;
    }

    fn mark_dirty(&mut self, cell: UVec2) {
        self.dirty = Some(match self.dirty {
            Some((min, max)) => (min.min(cell), max.max(cell)),
            None => (cell, cell),
        });
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Return the pending upload rectangle and mark the scene clean.
    pub fn take_dirty_region(&mut self) -> Option<DirtyRegion> {
        self.dirty.take().map(|(min, max)| DirtyRegion {
            x: min.x,
            y: min.y,
            width: max.x - min.x + 1,
            height: max.y - min.y + 1,
        })
    }

    /// Point-sample all three buffers at `cell`.
    ///
    /// Never averages neighbours. Cells outside the grid read as
    /// `CellState::EMPTY`.
    pub fn fetch(&self, cell: IVec2) -> CellState {
        let Some(index) = self.index_of(cell) else {
            return CellState::EMPTY;
        };
        let [fx, fy, bx, by] = self.layer_refs[index];
        CellState {
            front: LayerRef::decode(Vec2::new(fx, fy)),
            back: LayerRef::decode(Vec2::new(bx, by)),
            front_modifier: Modifier::decode_bytes(self.front_modifiers[index]),
            back_modifier: Modifier::decode_bytes(self.back_modifiers[index]),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
