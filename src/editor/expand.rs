use image::{imageops, DynamicImage, RgbaImage};

use crate::geometry::{
    displayed_offset_to_natural, displayed_rect_to_natural, scale_factor, PixelPoint, Point, Rect,
    Size,
};

/// Natural-pixel layout of an out-painting request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandPlan {
    /// Size of the new canvas.
    pub target: Size,
    /// Where the current image's top-left corner lands on the canvas.
    pub offset: PixelPoint,
    /// Size of the current image.
    pub source: Size,
}

impl ExpandPlan {
    /// Derives the plan from the frame and the displayed image box, both in
    /// container coordinates. The offset follows the user's drag exactly and
    /// is not re-centered.
    pub fn from_frame(frame: Rect, image_box: Rect, natural: Size) -> Self {
        let scale = scale_factor(natural, image_box.size());
        let offset = displayed_offset_to_natural(
            Point::new(image_box.left - frame.left, image_box.top - frame.top),
            scale,
        );
        let offset = PixelPoint::new(offset.x.max(0), offset.y.max(0));
        let mut target = displayed_rect_to_natural(frame, scale);

        // rounding must never crop the original out of the canvas
        let min_width = natural.width.saturating_add(offset.x.unsigned_abs());
        let min_height = natural.height.saturating_add(offset.y.unsigned_abs());
        target.width = target.width.max(min_width);
        target.height = target.height.max(min_height);

        Self {
            target,
            offset,
            source: natural,
        }
    }

    pub fn enlarges(&self) -> bool {
        self.target.width > self.source.width || self.target.height > self.source.height
    }
}

/// Places `image` on a transparent canvas of the planned size.
pub fn compose_expand_canvas(image: &DynamicImage, plan: &ExpandPlan) -> RgbaImage {
    let mut canvas = RgbaImage::new(plan.target.width.max(1), plan.target.height.max(1));
    imageops::overlay(
        &mut canvas,
        &image.to_rgba8(),
        i64::from(plan.offset.x),
        i64::from(plan.offset.y),
    );
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn east_only_drag_keeps_height_and_zero_offset() {
        let image_box = Rect::new(0.0, 0.0, 500.0, 400.0);
        let frame = Rect::new(0.0, 0.0, 550.0, 400.0);
        let plan = ExpandPlan::from_frame(frame, image_box, Size::new(1000, 800));
        assert_eq!(plan.target, Size::new(1100, 800));
        assert_eq!(plan.offset, PixelPoint::new(0, 0));
        assert!(plan.enlarges());
    }

    #[test]
    fn offset_tracks_asymmetric_drag() {
        let image_box = Rect::new(60.0, 40.0, 500.0, 400.0);
        let frame = Rect::new(50.0, 10.0, 560.0, 420.0);
        let plan = ExpandPlan::from_frame(frame, image_box, Size::new(1000, 800));
        assert_eq!(plan.offset, PixelPoint::new(60, 20));
        assert_eq!(plan.target, Size::new(1120, 840));
    }

    #[test]
    fn unchanged_frame_does_not_enlarge() {
        let image_box = Rect::new(12.0, 8.0, 333.0, 250.0);
        let plan = ExpandPlan::from_frame(image_box, image_box, Size::new(1332, 1000));
        assert_eq!(plan.target, Size::new(1332, 1000));
        assert!(!plan.enlarges());
    }

    #[test]
    fn target_always_fits_offset_plus_source() {
        let image_box = Rect::new(0.3, 0.7, 300.0, 200.0);
        let frame = Rect::new(0.0, 0.0, 300.9, 200.4);
        let plan = ExpandPlan::from_frame(frame, image_box, Size::new(997, 665));
        let offset_x = u32::try_from(plan.offset.x).unwrap();
        let offset_y = u32::try_from(plan.offset.y).unwrap();
        assert!(plan.target.width >= offset_x + plan.source.width);
        assert!(plan.target.height >= offset_y + plan.source.height);
    }

    #[test]
    fn compose_places_image_at_offset_on_transparent_canvas() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            4,
            3,
            image::Rgba([255, 0, 0, 255]),
        ));
        let plan = ExpandPlan {
            target: Size::new(10, 8),
            offset: PixelPoint::new(5, 2),
            source: Size::new(4, 3),
        };
        let canvas = compose_expand_canvas(&source, &plan);
        assert_eq!(canvas.dimensions(), (10, 8));
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(canvas.get_pixel(5, 2).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(8, 4).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(9, 5).0, [0, 0, 0, 0]);
    }
}
