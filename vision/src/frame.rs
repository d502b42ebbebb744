//! Frame and pixel primitives.
//!
//! The detector works on a lightweight owned RGB frame type (`Frame`) built
//! from the RGBA bytes a capture backend produces. Frames are ephemeral: one
//! is built per cycle, analyzed, and dropped.
//!
//! Color classification happens in HSV space (hue in degrees, saturation and
//! value in 0..=255), which is far more robust to in-game lighting than raw
//! RGB thresholds.

use anyhow::{Context, Result};

/// Owned RGB frame (no alpha).
#[derive(Clone, Debug)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl Frame {
    /// Build a `Frame` from RGBA bytes (alpha is discarded).
    ///
    /// The buffer is expected to be tightly packed: `width * height * 4` bytes.
    pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
        let height = bytes.len() / width / 4;
        let data = bytes
            .chunks_exact(4)
            .map(|v| Color::new(v[0], v[1], v[2]))
            .collect::<Vec<_>>();

        Self {
            width: width as u32,
            height: height as u32,
            data,
        }
    }

    /// Build a single-color frame. Mostly useful as a canvas for tests and
    /// for synthesizing reference images.
    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            data: vec![color; (width * height) as usize],
        }
    }

    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline(always)]
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.data[(x + y * self.width) as usize]
    }

    /// Overwrite the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            self.data[(x + y * self.width) as usize] = color;
        }
    }

    /// Fill an axis-aligned rectangle, clipped to the frame bounds.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let x2 = rect.right().min(self.width);
        let y2 = rect.bottom().min(self.height);
        for y in rect.y.min(self.height)..y2 {
            for x in rect.x.min(self.width)..x2 {
                self.data[(x + y * self.width) as usize] = color;
            }
        }
    }

    /// Copy out a sub-rectangle, clipped to the frame bounds.
    pub fn crop(&self, rect: Rect) -> Self {
        let x1 = rect.x.min(self.width);
        let y1 = rect.y.min(self.height);
        let x2 = rect.right().min(self.width);
        let y2 = rect.bottom().min(self.height);

        let mut data = Vec::with_capacity(((x2 - x1) * (y2 - y1)) as usize);
        for y in y1..y2 {
            for x in x1..x2 {
                data.push(self.pixel(x, y));
            }
        }

        Self {
            width: x2 - x1,
            height: y2 - y1,
            data,
        }
    }

    /// Downscale so the frame is at most `max_height` tall (preserving aspect
    /// ratio). Frames already within the cap are left untouched.
    ///
    /// Uses `fast_image_resize` (SIMD-optimized) and keeps output in `Vec<Color>`.
    pub fn resize_max_height(&mut self, max_height: u32) {
        if self.height <= max_height {
            return;
        }

        let height = max_height.max(1);
        let width = (self.width as u64 * height as u64 / self.height.max(1) as u64).max(1) as u32;

        // SAFETY: `Color` is `#[repr(C)]` with 3 x `u8`, so it is layout-compatible
        // with `fast_image_resize::pixels::U8x3` (alignment 1).
        let src_pixels = unsafe {
            std::slice::from_raw_parts(
                self.data.as_ptr() as *const fast_image_resize::pixels::U8x3,
                self.data.len(),
            )
        };

        let src = fast_image_resize::images::ImageRef::from_pixels(self.width, self.height, src_pixels)
            .expect("fast_image_resize: ImageRef::from_pixels failed");

        let mut dst = fast_image_resize::images::Image::new(width, height, fast_image_resize::PixelType::U8x3);

        let mut resizer = fast_image_resize::Resizer::new();
        let options = fast_image_resize::ResizeOptions::new().resize_alg(
            fast_image_resize::ResizeAlg::Interpolation(fast_image_resize::FilterType::CatmullRom),
        );

        resizer
            .resize(&src, &mut dst, &Some(options))
            .expect("fast_image_resize: resize failed");

        let bytes: Vec<u8> = dst.into_vec();
        let mut data = Vec::with_capacity((width * height) as usize);
        for px in bytes.chunks_exact(3) {
            data.push(Color::new(px[0], px[1], px[2]));
        }

        self.width = width;
        self.height = height;
        self.data = data;
    }

    /// Convert to a grayscale `GrayImage` (luma).
    pub fn to_gray_image(&self) -> image::GrayImage {
        use image::{GrayImage, Luma};
        let mut out = GrayImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.data[(x + y * self.width) as usize];
                out.put_pixel(x, y, Luma([c.luma()]));
            }
        }
        out
    }

    /// Fraction of pixels whose luma falls below `threshold`.
    pub fn dark_fraction(&self, threshold: u8) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let dark = self.data.iter().filter(|c| c.luma() < threshold).count();
        dark as f32 / self.data.len() as f32
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; (self.width * self.height * 3) as usize];
        for (i, clr) in self.data.iter().enumerate() {
            bytes[i * 3] = clr.r;
            bytes[i * 3 + 1] = clr.g;
            bytes[i * 3 + 2] = clr.b;
        }
        bytes
    }

    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let img = image::RgbImage::from_raw(self.width, self.height, self.get_bytes())
            .context("RgbImage::from_raw failed")?;
        img.save_with_format(path, image::ImageFormat::Png)
            .context("save png")?;
        Ok(())
    }
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Compute luma (grayscale intensity).
    pub fn luma(&self) -> u8 {
        let r = self.r as u32;
        let g = self.g as u32;
        let b = self.b as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }

    /// Convert to HSV: hue in degrees `[0, 360)`, saturation and value scaled
    /// to `[0, 255]`.
    pub fn to_hsv(&self) -> Hsv {
        let r = self.r as f32 / 255.0;
        let g = self.g as f32 / 255.0;
        let b = self.b as f32 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };

        let s = if max == 0.0 { 0.0 } else { delta / max * 255.0 };
        let v = max * 255.0;

        Hsv { h, s, v }
    }
}

/// A pixel in HSV space. Hue is degrees `[0, 360)`; saturation and value keep
/// the byte scale `[0, 255]` so thresholds read the same as RGB ones.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

/// Inclusive lower/upper HSV bounds for one semantic color class.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, px: Hsv) -> bool {
        px.h >= self.lower.h
            && px.h <= self.upper.h
            && px.s >= self.lower.s
            && px.s <= self.upper.s
            && px.v >= self.lower.v
            && px.v <= self.upper.v
    }
}

// ----------

/// Axis-aligned bounding rectangle in frame-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Intersection-over-union overlap with another rectangle.
    pub fn iou(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let inter = (x2 - x1) as f32 * (y2 - y1) as f32;
        let a1 = self.area() as f32;
        let a2 = other.area() as f32;
        inter / (a1 + a2 - inter)
    }

    /// Euclidean distance between the top-left corners of two rectangles.
    /// Used for duplicate suppression across color-range passes.
    pub fn corner_distance(&self, other: &Rect) -> f32 {
        let dx = self.x as f32 - other.x as f32;
        let dy = self.y as f32 - other.y as f32;
        (dx * dx + dy * dy).sqrt()
    }
}
