use glam::{Vec3, Vec4};

/// Written when neither layer is visible.
pub const DEFAULT_COLOR: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// How a sampled front texel is judged visible.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OpacityTest {
    /// Visible when any RGBA channel is non-zero. Catches atlases whose alpha
    /// was stripped while colour survived.
    #[default]
    Magnitude,
    /// Visible when alpha is non-zero.
    Alpha,
}

impl OpacityTest {
    pub fn is_visible(self, texel: Vec4) -> bool {
        match self {
            OpacityTest::Magnitude => texel.length() > 0.0,
            OpacityTest::Alpha => texel.w > 0.0,
        }
    }
}

/// One sampled layer with the tint it will be multiplied by.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TintedTexel {
    pub texel: Vec4,
    pub tint: Vec4,
}

impl TintedTexel {
    pub fn composited(&self) -> Vec3 {
        self.texel.truncate() * self.tint.truncate()
    }
}

/// Pick the final opaque colour of a pixel.
///
/// The front layer wins outright when visible. Otherwise the back layer is
/// used when visible, and `DEFAULT_COLOR` when neither is. The two layers
/// are never blended and the result always has alpha 1.
///
/// `back` is only evaluated when the front layer is hidden.
pub fn resolve(test: OpacityTest, front: TintedTexel, back: impl FnOnce() -> TintedTexel) -> Vec4 {
    if test.is_visible(front.texel) {
        return front.composited().extend(1.0);
    }
    let back = back();
    if test.is_visible(back.texel) {
        back.composited().extend(1.0)
    } else {
        DEFAULT_COLOR
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(texel: Vec4, tint: Vec4) -> TintedTexel {
        TintedTexel { texel, tint }
    }

    #[test]
    fn front_wins_when_visible() {
        let front = layer(Vec4::new(0.5, 1.0, 0.25, 1.0), Vec4::new(1.0, 0.5, 2.0, 1.0));
        let out = resolve(OpacityTest::Magnitude, front, || panic!("back sampled"));
        assert_eq!(out, Vec4::new(0.5, 0.5, 0.5, 1.0));
    }

    #[test]
    fn translucent_front_is_not_blended() {
        let front = layer(Vec4::new(1.0, 0.0, 0.0, 0.1), Vec4::ONE);
        let out = resolve(OpacityTest::Magnitude, front, || layer(Vec4::ONE, Vec4::ONE));
        assert_eq!(out, Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn transparent_front_falls_back() {
        let back = layer(Vec4::new(0.0, 0.0, 1.0, 1.0), Vec4::new(1.0, 1.0, 0.5, 1.0));
        let out = resolve(OpacityTest::Magnitude, layer(Vec4::ZERO, Vec4::ONE), || back);
        assert_eq!(out, Vec4::new(0.0, 0.0, 0.5, 1.0));
    }

    #[test]
    fn nothing_visible_is_default() {
        let out = resolve(OpacityTest::Magnitude, layer(Vec4::ZERO, Vec4::ONE), || {
            layer(Vec4::ZERO, Vec4::ONE)
        });
        assert_eq!(out, DEFAULT_COLOR);
    }

    #[test]
    fn magnitude_sees_colour_with_stripped_alpha() {
        let texel = Vec4::new(0.2, 0.0, 0.0, 0.0);
        assert!(OpacityTest::Magnitude.is_visible(texel));
        assert!(!OpacityTest::Alpha.is_visible(texel));
    }
}
