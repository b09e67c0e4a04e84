/// Drawable size in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f32, height as f32)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Value of the `vRes` uniform: `(W, H)`.
    #[inline]
    pub fn resolution(self) -> [f32; 2] {
        [self.width, self.height]
    }

    /// Value of the `vRatio` uniform: `(W / H, 1)`.
    ///
    /// `None` while the height is zero (minimized window).
    pub fn ratio(self) -> Option<[f32; 2]> {
        if self.height > 0.0 {
            Some([self.width / self.height, 1.0])
        } else {
            None
        }
    }

    /// Whole-pixel extent clamped to `max`, for `set_viewport` on a target.
    pub fn clamped_to(self, max_width: u32, max_height: u32) -> (u32, u32) {
        let w = (self.width.max(0.0) as u32).min(max_width);
        let h = (self.height.max(0.0) as u32).min(max_height);
        (w, h)
    }
}
