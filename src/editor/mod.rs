//! Interactive tool state layered over the current snapshot.

pub mod crop;
pub mod expand;
pub mod frame;

use crate::geometry::{
    displayed_offset_to_natural, round_to_i32, DisplaySize, PixelPoint, Point, Rect,
};
use crate::history::Snapshot;

pub use crop::{crop_source_bounds, extract_crop, CropPreset, CropSelection};
pub use expand::{compose_expand_canvas, ExpandPlan};
pub use frame::{DragPhase, DragState, ExpandFrame, ResizeHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolKind {
    #[default]
    Retouch,
    Adjust,
    Filter,
    Expand,
    Crop,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        Self::Retouch,
        Self::Adjust,
        Self::Filter,
        Self::Expand,
        Self::Crop,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Retouch => "Retouch",
            Self::Adjust => "Adjust",
            Self::Filter => "Filters",
            Self::Expand => "Expand",
            Self::Crop => "Crop",
        }
    }
}

/// Retouch target: where the user clicked on screen and the matching natural pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotspot {
    pub displayed: PixelPoint,
    pub natural: PixelPoint,
}

/// Pending per-tool input that belongs to the currently displayed snapshot.
#[derive(Debug, Clone)]
pub struct EditorTools {
    active_tool: ToolKind,
    image_box: Option<Rect>,
    hotspot: Option<Hotspot>,
    crop: CropSelection,
    expand: ExpandFrame,
    reference: Option<Snapshot>,
}

impl Default for EditorTools {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorTools {
    pub fn new() -> Self {
        let empty = Rect::new(0.0, 0.0, 0.0, 0.0);
        Self {
            active_tool: ToolKind::default(),
            image_box: None,
            hotspot: None,
            crop: CropSelection::new(DisplaySize::new(0.0, 0.0)),
            expand: ExpandFrame::new(empty),
            reference: None,
        }
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active_tool
    }

    /// Switches tools. Leaving retouch drops the hotspot.
    pub fn select_tool(&mut self, tool: ToolKind) {
        if self.active_tool == ToolKind::Retouch && tool != ToolKind::Retouch {
            self.hotspot = None;
        }
        self.active_tool = tool;
    }

    /// Displayed image rectangle relative to its container, as laid out by the view.
    pub fn image_box(&self) -> Option<Rect> {
        self.image_box
    }

    /// Records the view's layout of the current image and re-fits the crop
    /// and expand tools to it. The hotspot keeps its natural position; its
    /// displayed marker follows the new size.
    pub fn fit_to_display(&mut self, image_box: Rect) {
        let previous = self.image_box.replace(image_box);
        if previous == Some(image_box) {
            return;
        }
        self.crop.set_bounds(image_box.size());
        self.expand.reset(image_box);
        self.hotspot = match (self.hotspot, previous) {
            (Some(hotspot), Some(previous)) if previous.width > 0.0 => {
                let ratio = image_box.width / previous.width;
                Some(Hotspot {
                    displayed: PixelPoint::new(
                        round_to_i32(f64::from(hotspot.displayed.x) * ratio),
                        round_to_i32(f64::from(hotspot.displayed.y) * ratio),
                    ),
                    natural: hotspot.natural,
                })
            }
            _ => None,
        };
    }

    /// Drops everything tied to the previous base image.
    pub fn clear_pending(&mut self) {
        self.hotspot = None;
        self.crop.clear();
        if let Some(image_box) = self.image_box {
            self.expand.reset(image_box);
        }
    }

    /// Forgets the layout as well, used when the session empties.
    pub fn reset(&mut self) {
        let active_tool = self.active_tool;
        *self = Self::new();
        self.active_tool = active_tool;
    }

    pub fn hotspot(&self) -> Option<Hotspot> {
        self.hotspot
    }

    /// Places the retouch hotspot from an image-relative click, given the
    /// displayed-to-natural scale.
    pub fn set_hotspot(&mut self, click: Point, scale: f64) {
        self.hotspot = Some(Hotspot {
            displayed: displayed_offset_to_natural(click, 1.0),
            natural: displayed_offset_to_natural(click, scale),
        });
    }

    pub fn clear_hotspot(&mut self) {
        self.hotspot = None;
    }

    pub fn crop(&self) -> &CropSelection {
        &self.crop
    }

    pub fn crop_mut(&mut self) -> &mut CropSelection {
        &mut self.crop
    }

    pub fn expand(&self) -> &ExpandFrame {
        &self.expand
    }

    pub fn expand_mut(&mut self) -> &mut ExpandFrame {
        &mut self.expand
    }

    /// Global pointer release: ends whichever drag is active.
    pub fn pointer_up(&mut self) {
        self.crop.pointer_up();
        self.expand.pointer_up();
    }

    pub fn reference(&self) -> Option<&Snapshot> {
        self.reference.as_ref()
    }

    pub fn set_reference(&mut self, reference: Option<Snapshot>) {
        self.reference = reference;
    }

    pub(crate) fn take_reference(&mut self) -> Option<Snapshot> {
        self.reference.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted() -> EditorTools {
        let mut tools = EditorTools::new();
        tools.fit_to_display(Rect::new(10.0, 20.0, 200.0, 100.0));
        tools
    }

    #[test]
    fn tool_labels_cover_every_tool() {
        let labels = ToolKind::ALL.map(ToolKind::label);
        assert_eq!(labels, ["Retouch", "Adjust", "Filters", "Expand", "Crop"]);
    }

    #[test]
    fn fit_to_display_sizes_crop_and_expand() {
        let tools = fitted();
        assert_eq!(tools.crop().bounds(), DisplaySize::new(200.0, 100.0));
        assert_eq!(tools.expand().rect(), Rect::new(10.0, 20.0, 200.0, 100.0));
    }

    #[test]
    fn hotspot_is_scaled_and_dropped_when_leaving_retouch() {
        let mut tools = fitted();
        tools.set_hotspot(Point::new(50.4, 20.0), 4.0);
        assert_eq!(
            tools.hotspot(),
            Some(Hotspot {
                displayed: PixelPoint::new(50, 20),
                natural: PixelPoint::new(202, 80),
            })
        );

        tools.select_tool(ToolKind::Retouch);
        assert!(tools.hotspot().is_some());
        tools.select_tool(ToolKind::Filter);
        assert!(tools.hotspot().is_none());
    }

    #[test]
    fn relayout_keeps_hotspot_and_rescales_its_marker() {
        let mut tools = fitted();
        tools.set_hotspot(Point::new(50.0, 20.0), 4.0);

        tools.fit_to_display(Rect::new(0.0, 0.0, 100.0, 50.0));

        assert_eq!(
            tools.hotspot(),
            Some(Hotspot {
                displayed: PixelPoint::new(25, 10),
                natural: PixelPoint::new(200, 80),
            })
        );
    }

    #[test]
    fn clear_pending_drops_selection_frame_and_hotspot_but_keeps_reference() {
        let mut tools = fitted();
        tools.set_hotspot(Point::new(1.0, 1.0), 1.0);
        tools.crop_mut().set(Rect::new(0.0, 0.0, 50.0, 50.0));
        tools
            .expand_mut()
            .pointer_down(ResizeHandle::E, Point::new(0.0, 0.0));
        tools.expand_mut().pointer_move(Point::new(40.0, 0.0));
        tools.set_reference(Some(Snapshot::new(vec![1], "image/png", "ref.png")));

        tools.clear_pending();

        assert!(tools.hotspot().is_none());
        assert!(tools.crop().selection().is_none());
        assert!(!tools.expand().is_enlarged());
        assert!(!tools.expand().is_dragging());
        assert!(tools.reference().is_some());
    }

    #[test]
    fn pointer_up_ends_both_drags() {
        let mut tools = fitted();
        tools.crop_mut().pointer_down(Point::new(5.0, 5.0));
        tools
            .expand_mut()
            .pointer_down(ResizeHandle::S, Point::new(0.0, 0.0));
        tools.pointer_up();
        assert!(!tools.crop().is_dragging());
        assert!(!tools.expand().is_dragging());
    }

    #[test]
    fn reset_keeps_active_tool_only() {
        let mut tools = fitted();
        tools.select_tool(ToolKind::Crop);
        tools.set_reference(Some(Snapshot::new(vec![1], "image/png", "ref.png")));
        tools.reset();
        assert_eq!(tools.active_tool(), ToolKind::Crop);
        assert!(tools.image_box().is_none());
        assert!(tools.reference().is_none());
    }
}
