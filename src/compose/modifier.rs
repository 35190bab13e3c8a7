use glam::{Vec2, Vec4};

// ── Flip ──────────────────────────────────────────────────────────────────────

/// Mirroring applied to a layer's intra-tile UV.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Flip {
    #[default]
    None,
    X,
    Y,
    Both,
}

impl Flip {
    /// Decode a packed flip code. All comparisons are strict, so a code that
    /// lands exactly on 0.1, 0.3 or 0.5 falls into the lower band.
    ///
    /// ```text
    /// (.., 0.1]   none
    /// (0.1, 0.3]  x
    /// (0.3, 0.5]  y
    /// (0.5, ..)   both
    /// ```
    pub fn decode(code: f32) -> Self {
        if code > 0.5 {
            Flip::Both
        } else if code > 0.3 {
            Flip::Y
        } else if code > 0.1 {
            Flip::X
        } else {
            Flip::None
        }
    }

    /// `(flip_x, flip_y)`
    pub fn axes(self) -> (bool, bool) {
        match self {
            Flip::None => (false, false),
            Flip::X => (true, false),
            Flip::Y => (false, true),
            Flip::Both => (true, true),
        }
    }

    /// Byte written into a modifier buffer; reads back as 0.0, 0.2, 0.4 or 0.6.
    pub fn encode(self) -> u8 {
        match self {
            Flip::None => 0,
            Flip::X => 51,
            Flip::Y => 102,
            Flip::Both => 153,
        }
    }

    /// Mirror `uv` within the tile. Flips touch the UV only, never the cell.
    pub fn apply(self, uv: Vec2) -> Vec2 {
        let (flip_x, flip_y) = self.axes();
        Vec2::new(
            if flip_x { 1.0 - uv.x } else { uv.x },
            if flip_y { 1.0 - uv.y } else { uv.y },
        )
    }
}

// ── Modifier ──────────────────────────────────────────────────────────────────

/// A decoded modifier record: tint plus flip for one layer of one cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Modifier {
    /// Opaque tint; alpha is always 1. Components are not clamped.
    pub tint: Vec4,
    pub flip: Flip,
}

impl Default for Modifier {
    fn default() -> Self {
        Self { tint: Vec4::ONE, flip: Flip::None }
    }
}

impl Modifier {
    /// Decode a normalised record `(tint_r, tint_g, tint_b, flip_code)`.
    pub fn decode(record: Vec4) -> Self {
        Self {
            tint: record.truncate().extend(1.0),
            flip: Flip::decode(record.w),
        }
    }

    /// Decode a record straight from its buffer bytes, normalising by 255 the
    /// way an `Rgba8Unorm` texture read does.
    pub fn decode_bytes(record: [u8; 4]) -> Self {
        Self::decode(Vec4::from_array(record.map(|c| c as f32 / 255.0)))
    }

    /// Pack a tint and flip into buffer bytes.
    pub fn encode(tint: [u8; 3], flip: Flip) -> [u8; 4] {
        [tint[0], tint[1], tint[2], flip.encode()]
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
