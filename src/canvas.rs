//! Frame buffers and the renderer collaborator.

use std::collections::HashSet;

use crate::color::Color;
use crate::content::ContentUnit;
use crate::error::RenderError;
use crate::num::Float;

/// Premultiplied RGBA pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };

    pub fn new(color: Color, alpha: f64) -> Self {
        let a = alpha.clamp01();
        let c = color.clamped() * a;
        Self { r: c.r as f32, g: c.g as f32, b: c.b as f32, a: a as f32 }
    }

    pub fn opaque(color: Color) -> Self {
        Self::new(color, 1.0)
    }

    /// Source-over: `self` drawn on top of `below`.
    pub fn over(self, below: Rgba) -> Rgba {
        let k = 1.0 - self.a;
        Rgba {
            r: self.r + below.r * k,
            g: self.g + below.g * k,
            b: self.b + below.b * k,
            a: self.a + below.a * k,
        }
    }

    /// Additive: light from `self` added to `below`, coverage as source-over.
    pub fn add(self, below: Rgba) -> Rgba {
        let a = self.a + below.a * (1.0 - self.a);
        Rgba {
            r: (self.r + below.r).min(a),
            g: (self.g + below.g).min(a),
            b: (self.b + below.b).min(a),
            a,
        }
    }

    /// Multiply: `self` darkens `below`. Where either side is uncovered the
    /// other shows through.
    pub fn multiply(self, below: Rgba) -> Rgba {
        let (ks, kb) = (1.0 - self.a, 1.0 - below.a);
        let mix = |s: f32, b: f32| s * b + s * kb + b * ks;
        Rgba {
            r: mix(self.r, below.r),
            g: mix(self.g, below.g),
            b: mix(self.b, below.b),
            a: self.a + below.a - self.a * below.a,
        }
    }

    /// Scale color only, keeping coverage.
    pub fn brightness(self, fr: f32) -> Rgba {
        let fr = fr.clamp(0.0, 1.0);
        Rgba { r: self.r * fr, g: self.g * fr, b: self.b * fr, a: self.a }
    }

    /// Scale color and coverage together.
    pub fn fade(self, fr: f32) -> Rgba {
        let fr = fr.clamp(0.0, 1.0);
        Rgba { r: self.r * fr, g: self.g * fr, b: self.b * fr, a: self.a * fr }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Multiply,
}

/// How one layer lands on the layers below it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Blend {
    pub mode: BlendMode,
    pub opacity: f32,
}

impl Blend {
    pub const NORMAL: Self = Self { mode: BlendMode::Normal, opacity: 1.0 };

    pub fn new(mode: BlendMode, opacity: f64) -> Self {
        Self { mode, opacity: opacity.clamp01() as f32 }
    }

    pub fn apply(self, top: Rgba, below: Rgba) -> Rgba {
        let top = if self.opacity < 1.0 { top.fade(self.opacity) } else { top };
        match self.mode {
            BlendMode::Normal => top.over(below),
            BlendMode::Add => top.add(below),
            BlendMode::Multiply => top.multiply(below),
        }
    }
}

impl Default for Blend {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// FrameBuffer
///
/// A `width * height` image of premultiplied pixels, row major.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, px: Rgba) -> Self {
        Self { width, height, pixels: vec![px; width as usize * height as usize] }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn fill(&mut self, px: Rgba) {
        self.pixels.iter_mut().for_each(|p| *p = px);
    }

    pub fn map(&mut self, mut f: impl FnMut(Rgba) -> Rgba) {
        self.pixels.iter_mut().for_each(|p| *p = f(*p));
    }

    /// Visit each pixel with its normalized `(x, y)` position.
    pub fn for_each_xy(&mut self, mut f: impl FnMut(&mut Rgba, f64, f64)) {
        let (w, h) = (self.width.max(1) as f64, self.height.max(1) as f64);
        let width = self.width as usize;
        for (i, px) in self.pixels.iter_mut().enumerate() {
            let (x, y) = ((i % width.max(1)) as f64, (i / width.max(1)) as f64);
            f(px, x / w, y / h);
        }
    }

    /// Draw `top` over this buffer.
    pub fn overlay(&mut self, top: &FrameBuffer) -> Result<(), RenderError> {
        self.blend(top, Blend::NORMAL)
    }

    /// Draw `top` onto this buffer with `blend`.
    pub fn blend(&mut self, top: &FrameBuffer, blend: Blend) -> Result<(), RenderError> {
        if top.size() != self.size() {
            return Err(RenderError::SizeMismatch { expected: self.size(), got: top.size() });
        }
        for (below, above) in self.pixels.iter_mut().zip(top.pixels.iter()) {
            *below = blend.apply(*above, *below);
        }
        Ok(())
    }

    pub fn is_opaque(&self) -> bool {
        self.pixels.iter().all(|p| p.a >= 1.0)
    }
}

///////////////////////// RENDERER /////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    pub in_use: usize,
    pub free: usize,
    pub capacity: usize,
}

/// The renderer collaborator handed to visual nodes for one tick. Nodes borrow
/// it and never keep it.
pub trait RenderContext {
    fn size(&self) -> (u32, u32);

    /// A cleared (transparent) target from the pool.
    fn acquire(&mut self) -> Result<FrameBuffer, RenderError>;

    /// Return a target to the pool.
    fn release(&mut self, buffer: FrameBuffer);

    /// Draw `unit` at `offset` seconds into playback.
    fn draw_content(&mut self, unit: &ContentUnit, offset: f64, target: &mut FrameBuffer) -> Result<(), RenderError>;
}

/// SoftwareRenderer
///
/// CPU render target pool with a hard capacity. Content is drawn as a moving
/// color field derived from the unit's name, which is enough to tell clips
/// apart on a preview.
#[derive(Debug)]
pub struct SoftwareRenderer {
    width: u32,
    height: u32,
    capacity: usize,
    in_use: usize,
    free: Vec<FrameBuffer>,
    unavailable: HashSet<String>,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32, capacity: usize) -> Self {
        Self { width, height, capacity, in_use: 0, free: vec![], unavailable: HashSet::new() }
    }

    /// Make `draw_content` fail for a unit, as a missing file would.
    pub fn mark_unavailable(&mut self, name: impl Into<String>) {
        self.unavailable.insert(name.into());
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats { in_use: self.in_use, free: self.free.len(), capacity: self.capacity }
    }
}

impl RenderContext for SoftwareRenderer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn acquire(&mut self) -> Result<FrameBuffer, RenderError> {
        if self.in_use >= self.capacity {
            return Err(RenderError::PoolExhausted(self.in_use));
        }
        self.in_use += 1;
        let buffer = match self.free.pop() {
            Some(mut buffer) => {
                buffer.fill(Rgba::TRANSPARENT);
                buffer
            }
            None => FrameBuffer::new(self.width, self.height),
        };
        Ok(buffer)
    }

    fn release(&mut self, buffer: FrameBuffer) {
        self.in_use = self.in_use.saturating_sub(1);
        if buffer.size() == self.size() {
            self.free.push(buffer);
        }
    }

    fn draw_content(&mut self, unit: &ContentUnit, offset: f64, target: &mut FrameBuffer) -> Result<(), RenderError> {
        if self.unavailable.contains(&unit.name) {
            return Err(RenderError::ContentUnavailable(unit.name.clone()));
        }
        if target.size() != self.size() {
            return Err(RenderError::SizeMismatch { expected: self.size(), got: target.size() });
        }
        let hue = name_hue(&unit.name);
        target.for_each_xy(|px, x, y| {
            let h = (hue + x * 0.2 + offset * 0.1).fmod(1.0);
            let v = (y + offset * 0.5).tri(1.0).lerp(0.3..1.0);
            *px = Rgba::opaque(Color::hsv(h, 0.8, v));
        });
        Ok(())
    }
}

/// Stable hue for a name.
fn name_hue(name: &str) -> f64 {
    // FNV-1a
    let hash = name.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3));
    (hash % 3600) as f64 / 3600.0
}
