//! Shared geometric primitives and the mapping between displayed (on-screen)
//! and natural (real pixel) coordinate spaces.
//!
//! Displayed coordinates are fractional pixels relative to a layout origin.
//! Natural coordinates are integer pixels of the decoded image.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle in displayed coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Builds a rectangle from its four edges. Inverted edges collapse to zero size.
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            top,
            left,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn size(&self) -> DisplaySize {
        DisplaySize::new(self.width, self.height)
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// True when `inner` lies entirely within `self`.
    pub fn contains_rect(&self, inner: &Rect) -> bool {
        self.left <= inner.left
            && self.top <= inner.top
            && self.right() >= inner.right()
            && self.bottom() >= inner.bottom()
    }
}

/// Rendered size of an image element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Natural pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Rectangle in natural pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBounds {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Uniform displayed-to-natural scale. The image is rendered with its
/// intrinsic aspect ratio, so the horizontal ratio stands for both axes.
pub fn scale_factor(natural: Size, displayed: DisplaySize) -> f64 {
    if !(displayed.width.is_finite() && displayed.width > 0.0) {
        return 1.0;
    }
    f64::from(natural.width) / displayed.width
}

/// Scales a displayed selection's width and height into natural pixels.
pub fn displayed_rect_to_natural(rect: Rect, scale: f64) -> Size {
    Size::new(
        round_to_u32(rect.width * scale),
        round_to_u32(rect.height * scale),
    )
}

/// Scales a displayed point (for example the image's offset inside an
/// expanded frame) into natural pixels.
pub fn displayed_offset_to_natural(offset: Point, scale: f64) -> PixelPoint {
    PixelPoint::new(round_to_i32(offset.x * scale), round_to_i32(offset.y * scale))
}

/// Inverse of [`displayed_rect_to_natural`]; the result is anchored at the origin.
pub fn natural_size_to_displayed(size: Size, scale: f64) -> Rect {
    if !(scale.is_finite() && scale > 0.0) {
        return Rect::new(0.0, 0.0, f64::from(size.width), f64::from(size.height));
    }
    Rect::new(
        0.0,
        0.0,
        f64::from(size.width) / scale,
        f64::from(size.height) / scale,
    )
}

pub(crate) fn round_to_u32(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round().min(f64::from(u32::MAX)) as u32
}

pub(crate) fn round_to_i32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    value
        .round()
        .clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}
