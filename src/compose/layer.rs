use glam::{IVec2, Vec2};

// ── LayerRef ──────────────────────────────────────────────────────────────────

/// What one of a cell's two stacked layers shows.
///
/// The state buffer stores this as a pair of floats where negative x values
/// are sentinels. It is decoded exactly once, when the cell is fetched, so
/// nothing downstream compares against magic numbers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LayerRef {
    /// Atlas tile at (column, row).
    Index(IVec2),
    /// Contributes nothing; the layer is fully transparent.
    None,
    /// Opaque white, tinted later. The atlas is not sampled.
    Fill,
}

impl LayerRef {
    /// x at or below this is `Fill`.
    pub const FILL_THRESHOLD: f32 = -2.0;
    /// x at or below this (and above `FILL_THRESHOLD`) is `None`.
    pub const NONE_THRESHOLD: f32 = -1.0;

    pub const fn index(col: i32, row: i32) -> Self {
        LayerRef::Index(IVec2::new(col, row))
    }

    /// Decode a raw reference. Only x selects the sentinel class; checks run
    /// Fill, then None, then index.
    ///
    /// A non-sentinel x is truncated toward negative infinity, and a negative
    /// y on an otherwise valid index is clamped to row 0.
    pub fn decode(raw: Vec2) -> Self {
        if raw.x <= Self::FILL_THRESHOLD {
            LayerRef::Fill
        } else if raw.x <= Self::NONE_THRESHOLD {
            LayerRef::None
        } else {
            let col = raw.x.floor().max(0.0) as i32;
            let row = raw.y.floor().max(0.0) as i32;
            LayerRef::Index(IVec2::new(col, row))
        }
    }

    /// Raw form written into the layer-reference buffer.
    pub fn encode(self) -> [f32; 2] {
        match self {
            LayerRef::Index(idx) => [idx.x as f32, idx.y as f32],
            LayerRef::None => [Self::NONE_THRESHOLD, 0.0],
            LayerRef::Fill => [Self::FILL_THRESHOLD, 0.0],
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
