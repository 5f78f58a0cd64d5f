use crate::geometry::{Point, Rect};

/// One of the eight resize grips around a frame, named after the compass
/// edges it moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        Self::N,
        Self::S,
        Self::E,
        Self::W,
        Self::Ne,
        Self::Nw,
        Self::Se,
        Self::Sw,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::N => "n",
            Self::S => "s",
            Self::E => "e",
            Self::W => "w",
            Self::Ne => "ne",
            Self::Nw => "nw",
            Self::Se => "se",
            Self::Sw => "sw",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|handle| handle.name().eq_ignore_ascii_case(value))
    }

    pub const fn moves_north(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    pub const fn moves_south(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }

    pub const fn moves_east(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    pub const fn moves_west(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub handle: ResizeHandle,
    pub initial_rect: Rect,
    pub initial_pointer: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging(DragState),
}

/// Resizable out-painting frame around the displayed image.
///
/// Coordinates are relative to the container that holds the image, so the
/// image box need not start at the origin. The frame always contains the
/// image box captured when the frame was fitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandFrame {
    rect: Rect,
    image_box: Rect,
    phase: DragPhase,
}

impl ExpandFrame {
    pub fn new(image_box: Rect) -> Self {
        Self {
            rect: image_box,
            image_box,
            phase: DragPhase::Idle,
        }
    }

    /// Re-fits the frame to a freshly displayed image, cancelling any drag.
    pub fn reset(&mut self, image_box: Rect) {
        self.rect = image_box;
        self.image_box = image_box;
        self.phase = DragPhase::Idle;
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn image_box(&self) -> Rect {
        self.image_box
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging(_))
    }

    /// True once any edge sits outside the image box.
    pub fn is_enlarged(&self) -> bool {
        self.rect.width > self.image_box.width || self.rect.height > self.image_box.height
    }

    pub fn pointer_down(&mut self, handle: ResizeHandle, pointer: Point) {
        self.phase = DragPhase::Dragging(DragState {
            handle,
            initial_rect: self.rect,
            initial_pointer: pointer,
        });
    }

    /// Applies the pointer position to the active drag. Returns the updated
    /// frame, or `None` when no drag is in progress.
    pub fn pointer_move(&mut self, pointer: Point) -> Option<Rect> {
        let DragPhase::Dragging(drag) = self.phase else {
            return None;
        };
        self.rect = dragged_rect(&drag, pointer, self.image_box);
        Some(self.rect)
    }

    /// Ends the drag wherever the pointer was released.
    pub fn pointer_up(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        self.phase = DragPhase::Idle;
        was_dragging
    }
}

fn dragged_rect(drag: &DragState, pointer: Point, image_box: Rect) -> Rect {
    let delta_x = pointer.x - drag.initial_pointer.x;
    let delta_y = pointer.y - drag.initial_pointer.y;
    let initial = drag.initial_rect;

    let mut left = initial.left;
    let mut top = initial.top;
    let mut right = initial.right();
    let mut bottom = initial.bottom();

    if drag.handle.moves_west() {
        left = (left + delta_x).min(image_box.left);
    }
    if drag.handle.moves_east() {
        right = (right + delta_x).max(image_box.right());
    }
    if drag.handle.moves_north() {
        top = (top + delta_y).min(image_box.top);
    }
    if drag.handle.moves_south() {
        bottom = (bottom + delta_y).max(image_box.bottom());
    }

    Rect::from_edges(left, top, right, bottom)
}
