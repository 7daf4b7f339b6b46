//! # Drawing Surfaces
//!
//! The overlay the effect paints on. Hosts hand out something implementing
//! [`Surface`]; the render loop only ever clears it and fills squares.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Surface                                      │
//! │   size / resize   viewport-sized, no margin  │
//! │   clear           full transparent wipe      │
//! │   fill_rect       one particle square        │
//! ├──────────────────────────────────────────────┤
//! │ PixelCanvas       software RGBA8, blended    │
//! │ CommandSurface    recorded draw list         │
//! └──────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use powerburst_core::Rgb;
use thiserror::Error;

/// Errors raised by host surface management.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The host could not create the overlay.
    #[error("failed to create drawing surface: {0}")]
    Creation(String),

    /// The overlay was created but could not be attached to the terminal.
    #[error("failed to attach drawing surface: {0}")]
    Attach(String),

    /// The viewport has no area to draw on.
    #[error("surface would be zero-sized ({width}x{height})")]
    ZeroSized {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// What the effect asks the host for when it attaches.
///
/// The overlay covers the viewport, sits above the terminal contents and
/// never takes pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSpec {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Layered above terminal contents.
    pub overlay: bool,
    /// Pointer events pass through.
    pub pass_through_input: bool,
}

impl SurfaceSpec {
    /// A full-viewport, non-interactive overlay.
    #[must_use]
    pub const fn overlay(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            overlay: true,
            pass_through_input: true,
        }
    }
}

/// A color with straight (non-premultiplied) alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    /// Color channels.
    pub color: Rgb,
    /// Opacity.
    pub alpha: f64,
}

impl Rgba {
    /// Pairs a color with an opacity. `alpha` is clamped to `[0, 1]`.
    #[must_use]
    pub fn new(color: Rgb, alpha: f64) -> Self {
        Self {
            color,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// The CSS form, `rgba(r, g, b, a)`.
    #[must_use]
    pub fn css(&self) -> String {
        self.to_string()
    }

    /// Alpha quantized to a byte.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn alpha_u8(&self) -> u8 {
        (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Rgb { r, g, b } = self.color;
        write!(f, "rgba({r}, {g}, {b}, {})", self.alpha)
    }
}

/// An axis-aligned pixel rectangle. The origin may lie off-surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl PixelRect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A `size`-by-`size` square.
    #[must_use]
    pub const fn square(x: i32, y: i32, size: u32) -> Self {
        Self::new(x, y, size, size)
    }

    /// The part of this rectangle inside a `width`x`height` surface, as
    /// half-open column and row ranges. `None` if nothing is visible.
    #[must_use]
    pub fn clip(&self, width: u32, height: u32) -> Option<(std::ops::Range<u32>, std::ops::Range<u32>)> {
        let span = |start: i32, len: u32, limit: u32| {
            let lo = i64::from(start).clamp(0, i64::from(limit));
            let hi = (i64::from(start) + i64::from(len)).clamp(0, i64::from(limit));
            // Both ends were clamped into u32 range.
            let lo = u32::try_from(lo).unwrap_or(limit);
            let hi = u32::try_from(hi).unwrap_or(limit);
            (lo < hi).then_some(lo..hi)
        };
        Some((span(self.x, self.width, width)?, span(self.y, self.height, height)?))
    }
}

/// A 2D surface the render loop draws particles on.
pub trait Surface {
    /// Current size in pixels.
    fn size(&self) -> (u32, u32);

    /// Resizes to `width`x`height`. Contents are discarded.
    fn resize(&mut self, width: u32, height: u32);

    /// Wipes the whole surface to transparent.
    fn clear(&mut self);

    /// Fills `rect` with `color`, blended over what is already there.
    fn fill_rect(&mut self, rect: PixelRect, color: Rgba);
}

// =============================================================================
// PixelCanvas
// =============================================================================

/// One RGBA8 pixel, straight alpha.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Pixel {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Pixel {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// Source-over blend of `src` onto `self`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn blend(self, src: Rgba) -> Self {
        let sa = src.alpha.clamp(0.0, 1.0);
        if sa <= 0.0 {
            return self;
        }
        let da = f64::from(self.a) / 255.0;
        let out_a = sa + da * (1.0 - sa);
        let channel = |s: u8, d: u8| {
            let c = (f64::from(s) * sa + f64::from(d) * da * (1.0 - sa)) / out_a;
            c.round().clamp(0.0, 255.0) as u8
        };
        Self {
            r: channel(src.color.r, self.r),
            g: channel(src.color.g, self.g),
            b: channel(src.color.b, self.b),
            a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
        }
    }
}

/// Software RGBA8 surface.
///
/// Used by the headless host, by tests and for snapshot output. Resizing
/// clears, matching what a real canvas does when its backing store changes.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
    fills: u64,
}

impl PixelCanvas {
    /// Creates a transparent canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::TRANSPARENT; width as usize * height as usize],
            fills: 0,
        }
    }

    /// The pixel at `(x, y)`, or `None` outside the canvas.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// All pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Raw RGBA8 bytes, row-major. Suitable for texture upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Number of pixels with any opacity.
    #[must_use]
    pub fn painted_pixels(&self) -> usize {
        self.pixels.iter().filter(|p| p.a > 0).count()
    }

    /// True if every pixel is transparent.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| p.a == 0)
    }

    /// `fill_rect` calls since creation.
    #[must_use]
    pub const fn fill_count(&self) -> u64 {
        self.fills
    }

    /// Writes a binary PPM (P6), compositing onto black.
    ///
    /// # Errors
    ///
    /// Propagates any write error.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn write_ppm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        let mut row = Vec::with_capacity(self.width as usize * 3);
        for line in self.pixels.chunks(self.width.max(1) as usize) {
            row.clear();
            for p in line {
                let a = f64::from(p.a) / 255.0;
                for c in [p.r, p.g, p.b] {
                    row.push((f64::from(c) * a).round() as u8);
                }
            }
            out.write_all(&row)?;
        }
        out.flush()
    }

    /// Writes a PPM snapshot to `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be created or written.
    pub fn save_ppm(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_ppm(io::BufWriter::new(file))
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl Surface for PixelCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize(width as usize * height as usize, Pixel::TRANSPARENT);
    }

    fn clear(&mut self) {
        self.pixels.fill(Pixel::TRANSPARENT);
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        self.fills += 1;
        let Some((cols, rows)) = rect.clip(self.width, self.height) else {
            return;
        };
        for y in rows {
            let start = self.index(cols.start, y);
            let end = self.index(cols.end, y);
            for pixel in &mut self.pixels[start..end] {
                *pixel = pixel.blend(color);
            }
        }
    }
}

// =============================================================================
// CommandSurface
// =============================================================================

/// A recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Full transparent wipe.
    Clear,
    /// Filled square.
    FillRect {
        /// Bounds.
        rect: PixelRect,
        /// Fill color.
        color: Rgba,
    },
}

/// GPU-ready per-particle instance data.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct QuadInstance {
    /// x, y, width, height in pixels.
    pub rect: [f32; 4],
    /// Normalized RGBA.
    pub color: [f32; 4],
}

/// Records draw calls instead of rasterizing them.
///
/// Hosts with their own renderer replay [`CommandSurface::commands`] or
/// upload [`CommandSurface::instance_bytes`] directly.
#[derive(Debug, Clone, Default)]
pub struct CommandSurface {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl CommandSurface {
    /// Creates an empty recorder of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::with_capacity(512),
        }
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Takes the recorded commands, leaving the list empty.
    pub fn drain(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Fill commands since the last clear, as instance data.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn instances(&self) -> Vec<QuadInstance> {
        let since_clear = self
            .commands
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Clear))
            .map_or(0, |i| i + 1);
        self.commands[since_clear..]
            .iter()
            .filter_map(|command| match command {
                DrawCommand::FillRect { rect, color } => Some(QuadInstance {
                    rect: [
                        rect.x as f32,
                        rect.y as f32,
                        rect.width as f32,
                        rect.height as f32,
                    ],
                    color: [
                        f32::from(color.color.r) / 255.0,
                        f32::from(color.color.g) / 255.0,
                        f32::from(color.color.b) / 255.0,
                        color.alpha as f32,
                    ],
                }),
                DrawCommand::Clear => None,
            })
            .collect()
    }

    /// [`CommandSurface::instances`] as raw bytes.
    #[must_use]
    pub fn instance_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.instances()).to_vec()
    }
}

impl Surface for CommandSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.clear();
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);

    #[test]
    fn test_rgba_css() {
        let c = Rgba::new(Rgb::new(168, 0, 255), 0.5);
        assert_eq!(c.css(), "rgba(168, 0, 255, 0.5)");
        assert_eq!(Rgba::new(RED, 3.0).alpha, 1.0);
    }

    #[test]
    fn test_clip() {
        let rect = PixelRect::square(-1, -1, 3);
        assert_eq!(rect.clip(10, 10), Some((0..2, 0..2)));
        assert_eq!(PixelRect::square(10, 0, 3).clip(10, 10), None);
        assert_eq!(PixelRect::square(-5, 0, 3).clip(10, 10), None);
        assert_eq!(PixelRect::square(8, 8, 3).clip(10, 10), Some((8..10, 8..10)));
    }

    #[test]
    fn test_fill_and_clear() {
        let mut canvas = PixelCanvas::new(8, 8);
        canvas.fill_rect(PixelRect::square(2, 2, 3), Rgba::new(RED, 1.0));
        assert_eq!(canvas.painted_pixels(), 9);
        assert_eq!(canvas.pixel(3, 3), Some(Pixel { r: 255, g: 0, b: 0, a: 255 }));
        assert_eq!(canvas.pixel(5, 5), Some(Pixel::TRANSPARENT));

        canvas.clear();
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_blend_half_over_transparent() {
        let p = Pixel::TRANSPARENT.blend(Rgba::new(RED, 0.5));
        assert_eq!(p, Pixel { r: 255, g: 0, b: 0, a: 128 });
    }

    #[test]
    fn test_blend_over_opaque() {
        let blue = Pixel { r: 0, g: 0, b: 255, a: 255 };
        let p = blue.blend(Rgba::new(RED, 0.5));
        assert_eq!(p.a, 255);
        assert_eq!(p.r, 128);
        assert_eq!(p.b, 128);
    }

    #[test]
    fn test_resize_discards() {
        let mut canvas = PixelCanvas::new(4, 4);
        canvas.fill_rect(PixelRect::square(0, 0, 4), Rgba::new(RED, 1.0));
        canvas.resize(6, 2);
        assert_eq!(canvas.size(), (6, 2));
        assert_eq!(canvas.pixels().len(), 12);
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_bytes_and_ppm() {
        let mut canvas = PixelCanvas::new(2, 1);
        canvas.fill_rect(PixelRect::square(0, 0, 1), Rgba::new(RED, 1.0));
        assert_eq!(canvas.as_bytes(), &[255, 0, 0, 255, 0, 0, 0, 0]);

        let mut ppm = Vec::new();
        canvas.write_ppm(&mut ppm).unwrap();
        let header = b"P6\n2 1\n255\n";
        assert_eq!(&ppm[..header.len()], header);
        assert_eq!(&ppm[header.len()..], &[255, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_command_surface_instances() {
        let mut surface = CommandSurface::new(100, 100);
        surface.fill_rect(PixelRect::square(1, 1, 3), Rgba::new(RED, 1.0));
        surface.clear();
        surface.fill_rect(PixelRect::square(5, 6, 3), Rgba::new(RED, 0.5));

        let instances = surface.instances();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].rect, [5.0, 6.0, 3.0, 3.0]);
        assert_eq!(instances[0].color, [1.0, 0.0, 0.0, 0.5]);
        assert_eq!(surface.instance_bytes().len(), 32);
        assert_eq!(surface.drain().len(), 3);
        assert!(surface.commands().is_empty());
    }
}
