//! Selected element and its transient grip.

use crate::element::{Element, ElementId};
use crate::geometry::offsets_from;
use crate::hit_test::{HitPosition, resize};
use kurbo::{Point, Vec2};

/// How the pointer holds the selected element during a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum Grip {
    /// Whole-element drag: pointer minus the element anchor.
    Offset(Vec2),
    /// Freehand drag: pointer minus each sample, parallel to the samples.
    PointOffsets(Vec<Vec2>),
    /// Active resize handle.
    Handle(HitPosition),
}

/// The element a gesture operates on.
#[derive(Debug, Clone)]
pub struct Selection {
    /// The selected element.
    pub id: ElementId,
    pub grip: Grip,
    /// Pointer position (world) when the gesture began.
    pub start_point: Point,
    /// Element state when the gesture began.
    pub original: Element,
}

impl Selection {
    /// Grab the body of `element` at `pointer`.
    pub fn for_move(element: &Element, pointer: Point) -> Self {
        let grip = match element.points() {
            Some(points) => Grip::PointOffsets(offsets_from(pointer, points)),
            None => Grip::Offset(pointer - element.anchor()),
        };
        Self::new(element, grip, pointer)
    }

    /// Grab `handle` of `element` at `pointer`.
    pub fn for_resize(element: &Element, handle: HitPosition, pointer: Point) -> Self {
        Self::new(element, Grip::Handle(handle), pointer)
    }

    /// Select a freshly created element; its anchor sits under the pointer.
    pub fn for_draw(element: &Element, pointer: Point) -> Self {
        Self::new(element, Grip::Offset(Vec2::ZERO), pointer)
    }

    fn new(element: &Element, grip: Grip, start_point: Point) -> Self {
        Self {
            id: element.id,
            grip,
            start_point,
            original: element.clone(),
        }
    }

    /// The original element dragged so that the grip sits under `pointer`.
    ///
    /// Size and payload are preserved. A handle grip leaves it unchanged.
    pub fn moved(&self, pointer: Point) -> Element {
        let mut element = self.original.clone();
        match &self.grip {
            Grip::Offset(offset) => {
                let delta = (pointer - *offset) - element.anchor();
                element.set_coords(element.coords().translate(delta));
            }
            Grip::PointOffsets(offsets) => {
                let points = offsets.iter().map(|o| pointer - *o).collect();
                element.set_points(points);
            }
            Grip::Handle(_) => {}
        }
        element
    }

    /// The original element with the gripped handle dragged to `pointer`.
    pub fn resized(&self, pointer: Point) -> Element {
        let mut element = self.original.clone();
        if let Grip::Handle(handle) = self.grip {
            element.set_coords(resize(handle, pointer, element.coords()));
        }
        element
    }

    /// Whether the pointer is back where the gesture started.
    pub fn is_unmoved(&self, pointer: Point) -> bool {
        pointer == self.start_point
    }
}
