use image::{imageops, DynamicImage, RgbaImage};

use crate::geometry::{round_to_u32, DisplaySize, PixelBounds, Point, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropPreset {
    #[default]
    Free,
    Ratio1x1,
    Ratio16x9,
}

impl CropPreset {
    pub const ALL: [CropPreset; 3] = [Self::Free, Self::Ratio1x1, Self::Ratio16x9];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Ratio1x1 => "1:1",
            Self::Ratio16x9 => "16:9",
        }
    }

    pub const fn ratio(self) -> Option<(u32, u32)> {
        match self {
            Self::Free => None,
            Self::Ratio1x1 => Some((1, 1)),
            Self::Ratio16x9 => Some((16, 9)),
        }
    }
}

/// Crop rectangle being dragged out over the displayed image.
///
/// Coordinates are relative to the top-left corner of the rendered image and
/// never leave its displayed bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct CropSelection {
    bounds: DisplaySize,
    preset: CropPreset,
    anchor: Option<Point>,
    rect: Option<Rect>,
}

impl CropSelection {
    pub fn new(bounds: DisplaySize) -> Self {
        Self {
            bounds,
            preset: CropPreset::Free,
            anchor: None,
            rect: None,
        }
    }

    pub fn bounds(&self) -> DisplaySize {
        self.bounds
    }

    /// Adopts new display bounds, dropping any selection made against the old ones.
    pub fn set_bounds(&mut self, bounds: DisplaySize) {
        self.bounds = bounds;
        self.clear();
    }

    pub fn preset(&self) -> CropPreset {
        self.preset
    }

    pub fn set_preset(&mut self, preset: CropPreset) {
        self.preset = preset;
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn pointer_down(&mut self, point: Point) {
        let anchor = self.clamp_point(point);
        self.anchor = Some(anchor);
        self.rect = Some(Rect::new(anchor.y, anchor.x, 0.0, 0.0));
    }

    pub fn pointer_move(&mut self, point: Point) -> Option<Rect> {
        let anchor = self.anchor?;
        let mut end = self.clamp_point(point);
        if let Some(ratio) = self.preset.ratio() {
            end = constrain_to_ratio(anchor, end, self.bounds, ratio);
        }
        let rect = Rect::from_edges(
            anchor.x.min(end.x),
            anchor.y.min(end.y),
            anchor.x.max(end.x),
            anchor.y.max(end.y),
        );
        self.rect = Some(rect);
        Some(rect)
    }

    pub fn pointer_up(&mut self) -> bool {
        self.anchor.take().is_some()
    }

    /// Replaces the selection with `rect`, clipped to the display bounds.
    pub fn set(&mut self, rect: Rect) {
        let left = rect.left.clamp(0.0, self.bounds.width);
        let top = rect.top.clamp(0.0, self.bounds.height);
        let right = rect.right().clamp(0.0, self.bounds.width);
        let bottom = rect.bottom().clamp(0.0, self.bounds.height);
        self.anchor = None;
        self.rect = Some(Rect::from_edges(left, top, right, bottom));
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.rect = None;
    }

    /// The finished selection, if it covers a positive area. `None` while a
    /// drag is still in progress.
    pub fn selection(&self) -> Option<Rect> {
        if self.is_dragging() {
            return None;
        }
        self.rect.filter(Rect::has_area)
    }

    fn clamp_point(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(0.0, self.bounds.width.max(0.0)),
            point.y.clamp(0.0, self.bounds.height.max(0.0)),
        )
    }
}

fn constrain_to_ratio(anchor: Point, end: Point, bounds: DisplaySize, ratio: (u32, u32)) -> Point {
    let ratio_w = f64::from(ratio.0.max(1));
    let ratio_h = f64::from(ratio.1.max(1));
    let sign_x = if end.x < anchor.x { -1.0 } else { 1.0 };
    let sign_y = if end.y < anchor.y { -1.0 } else { 1.0 };
    let max_w = if sign_x > 0.0 {
        bounds.width - anchor.x
    } else {
        anchor.x
    };
    let max_h = if sign_y > 0.0 {
        bounds.height - anchor.y
    } else {
        anchor.y
    };

    let mut width = (end.x - anchor.x).abs();
    let mut height = width * ratio_h / ratio_w;
    if height > max_h {
        height = max_h;
        width = height * ratio_w / ratio_h;
    }
    if width > max_w {
        width = max_w;
        height = width * ratio_h / ratio_w;
    }
    Point::new(anchor.x + sign_x * width, anchor.y + sign_y * height)
}

/// Maps a displayed crop selection onto the natural image, using separate
/// horizontal and vertical ratios and clipping to the image.
pub fn crop_source_bounds(
    selection: Rect,
    natural: Size,
    displayed: DisplaySize,
) -> Option<PixelBounds> {
    if natural.is_empty() || displayed.width <= 0.0 || displayed.height <= 0.0 {
        return None;
    }
    let scale_x = f64::from(natural.width) / displayed.width;
    let scale_y = f64::from(natural.height) / displayed.height;

    let x = round_to_u32(selection.left * scale_x).min(natural.width - 1);
    let y = round_to_u32(selection.top * scale_y).min(natural.height - 1);
    let width = round_to_u32(selection.width * scale_x).min(natural.width - x);
    let height = round_to_u32(selection.height * scale_y).min(natural.height - y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(PixelBounds::new(x, y, width, height))
}

/// Copies the selected region into a new surface sized to the crop's natural
/// pixels times `device_pixel_ratio`.
pub fn extract_crop(
    image: &DynamicImage,
    selection: Rect,
    displayed: DisplaySize,
    device_pixel_ratio: f64,
) -> Option<RgbaImage> {
    let natural = Size::new(image.width(), image.height());
    let source = crop_source_bounds(selection, natural, displayed)?;
    let rgba = image.to_rgba8();
    let region = imageops::crop_imm(&rgba, source.x, source.y, source.width, source.height)
        .to_image();

    let ratio = sanitize_pixel_ratio(device_pixel_ratio);
    if (ratio - 1.0).abs() < f64::EPSILON {
        return Some(region);
    }
    let out_width = round_to_u32(f64::from(source.width) * ratio).max(1);
    let out_height = round_to_u32(f64::from(source.height) * ratio).max(1);
    Some(imageops::resize(
        &region,
        out_width,
        out_height,
        imageops::FilterType::Triangle,
    ))
}

pub(crate) fn sanitize_pixel_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(width: f64, height: f64) -> CropSelection {
        CropSelection::new(DisplaySize::new(width, height))
    }

    fn quadrant_image() -> DynamicImage {
        let mut image = RgbaImage::new(100, 80);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let red = if x < 50 { 255 } else { 0 };
            let blue = if y < 40 { 255 } else { 0 };
            *pixel = image::Rgba([red, 0, blue, 255]);
        }
        DynamicImage::ImageRgba8(image)
    }

    #[test]
    fn crop_preset_labels_and_ratios() {
        assert_eq!(CropPreset::Free.label(), "Free");
        assert_eq!(CropPreset::Ratio1x1.ratio(), Some((1, 1)));
        assert_eq!(CropPreset::Ratio16x9.ratio(), Some((16, 9)));
        assert_eq!(CropPreset::Free.ratio(), None);
        assert_eq!(CropPreset::ALL.len(), 3);
    }

    #[test]
    fn drag_normalizes_reverse_direction() {
        let mut crop = selection(200.0, 100.0);
        crop.pointer_down(Point::new(150.0, 80.0));
        let rect = crop.pointer_move(Point::new(50.0, 20.0)).unwrap();
        assert_eq!(rect, Rect::new(20.0, 50.0, 100.0, 60.0));
        assert!(crop.pointer_up());
        assert_eq!(crop.selection(), Some(rect));
    }

    #[test]
    fn drag_is_clamped_to_display_bounds() {
        let mut crop = selection(200.0, 100.0);
        crop.pointer_down(Point::new(-30.0, 50.0));
        let rect = crop.pointer_move(Point::new(500.0, 400.0)).unwrap();
        assert_eq!(rect, Rect::new(50.0, 0.0, 200.0, 50.0));
    }

    #[test]
    fn selection_is_withheld_until_pointer_up() {
        let mut crop = selection(200.0, 100.0);
        crop.pointer_down(Point::new(10.0, 10.0));
        let rect = crop.pointer_move(Point::new(30.0, 30.0)).unwrap();
        assert!(rect.has_area());
        assert_eq!(crop.selection(), None);

        crop.pointer_up();
        assert_eq!(crop.selection(), Some(rect));
    }

    #[test]
    fn click_without_drag_is_not_a_selection() {
        let mut crop = selection(200.0, 100.0);
        crop.pointer_down(Point::new(10.0, 10.0));
        crop.pointer_up();
        assert_eq!(crop.selection(), None);
    }

    #[test]
    fn square_preset_limits_to_available_height() {
        let mut crop = selection(200.0, 100.0);
        crop.set_preset(CropPreset::Ratio1x1);
        crop.pointer_down(Point::new(10.0, 40.0));
        let rect = crop.pointer_move(Point::new(190.0, 45.0)).unwrap();
        assert_eq!(rect, Rect::new(40.0, 10.0, 60.0, 60.0));
    }

    #[test]
    fn wide_preset_keeps_sixteen_by_nine() {
        let mut crop = selection(400.0, 300.0);
        crop.set_preset(CropPreset::Ratio16x9);
        crop.pointer_down(Point::new(300.0, 200.0));
        let rect = crop.pointer_move(Point::new(140.0, 0.0)).unwrap();
        assert_eq!(rect.width, 160.0);
        assert_eq!(rect.height, 90.0);
        assert_eq!(rect.right(), 300.0);
        assert_eq!(rect.top, 110.0);
    }

    #[test]
    fn set_clips_and_set_bounds_clears() {
        let mut crop = selection(100.0, 100.0);
        crop.set(Rect::new(-10.0, 90.0, 50.0, 50.0));
        assert_eq!(crop.selection(), Some(Rect::new(0.0, 90.0, 10.0, 40.0)));

        crop.set_bounds(DisplaySize::new(50.0, 50.0));
        assert_eq!(crop.selection(), None);
    }

    #[test]
    fn crop_source_bounds_scales_each_axis() {
        let bounds = crop_source_bounds(
            Rect::new(10.0, 25.0, 50.0, 20.0),
            Size::new(1000, 800),
            DisplaySize::new(500.0, 400.0),
        )
        .unwrap();
        assert_eq!(bounds, PixelBounds::new(50, 20, 100, 40));
    }

    #[test]
    fn crop_source_bounds_clips_to_image_and_rejects_empty() {
        let bounds = crop_source_bounds(
            Rect::new(350.0, 450.0, 100.0, 100.0),
            Size::new(1000, 800),
            DisplaySize::new(500.0, 400.0),
        )
        .unwrap();
        assert_eq!(bounds, PixelBounds::new(900, 700, 100, 100));

        assert!(crop_source_bounds(
            Rect::new(0.0, 0.0, 0.1, 10.0),
            Size::new(1000, 800),
            DisplaySize::new(500.0, 400.0),
        )
        .is_none());
    }

    #[test]
    fn extract_crop_copies_the_selected_quadrant() {
        let image = quadrant_image();
        let region = extract_crop(
            &image,
            Rect::new(0.0, 25.0, 25.0, 20.0),
            DisplaySize::new(50.0, 40.0),
            1.0,
        )
        .unwrap();
        assert_eq!(region.dimensions(), (50, 40));
        assert_eq!(region.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(region.get_pixel(49, 39).0, [0, 0, 255, 255]);
    }

    #[test]
    fn extract_crop_scales_output_by_device_pixel_ratio() {
        let image = quadrant_image();
        let region = extract_crop(
            &image,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            DisplaySize::new(100.0, 80.0),
            2.0,
        )
        .unwrap();
        assert_eq!(region.dimensions(), (20, 20));

        let fallback = extract_crop(
            &image,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            DisplaySize::new(100.0, 80.0),
            f64::NAN,
        )
        .unwrap();
        assert_eq!(fallback.dimensions(), (10, 10));
    }
}
