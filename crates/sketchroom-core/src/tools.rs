//! Tool selection and cursor hints.

use crate::element::{Coords, Element, ElementId, ElementKind};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Selection,
    Pan,
    Line,
    Rectangle,
    Circle,
    Pencil,
    Text,
}

impl ToolKind {
    pub const ALL: [ToolKind; 7] = [
        ToolKind::Selection,
        ToolKind::Pan,
        ToolKind::Line,
        ToolKind::Rectangle,
        ToolKind::Circle,
        ToolKind::Pencil,
        ToolKind::Text,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Selection => "Selection",
            ToolKind::Pan => "Pan",
            ToolKind::Line => "Line",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Circle => "Circle",
            ToolKind::Pencil => "Pencil",
            ToolKind::Text => "Text",
        }
    }

    /// Whether pointer-down with this tool starts a new drawn element.
    pub fn is_drawing(self) -> bool {
        matches!(
            self,
            ToolKind::Line | ToolKind::Rectangle | ToolKind::Circle | ToolKind::Pencil
        )
    }

    /// A zero-extent element of this tool's kind at `at`.
    pub fn start_element(self, id: ElementId, at: Point) -> Option<Element> {
        let zero = Coords::from_points(at, at);
        match self {
            ToolKind::Line => Some(Element::new(id, ElementKind::Line, zero)),
            ToolKind::Rectangle => Some(Element::new(id, ElementKind::Rectangle, zero)),
            ToolKind::Circle => Some(Element::new(id, ElementKind::Circle, zero)),
            ToolKind::Pencil => Some(Element::pencil(id, at)),
            ToolKind::Selection | ToolKind::Pan | ToolKind::Text => None,
        }
    }

    pub fn cursor(self) -> CursorHint {
        match self {
            ToolKind::Selection => CursorHint::Default,
            ToolKind::Pan => CursorHint::Grab,
            ToolKind::Text => CursorHint::Text,
            ToolKind::Line | ToolKind::Rectangle | ToolKind::Circle | ToolKind::Pencil => {
                CursorHint::Crosshair
            }
        }
    }
}

/// Pointer cursor the host should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorHint {
    #[default]
    Default,
    Move,
    NwseResize,
    NeswResize,
    Crosshair,
    Grab,
    Grabbing,
    Text,
}

impl CursorHint {
    /// CSS cursor keyword.
    pub fn css(self) -> &'static str {
        match self {
            CursorHint::Default => "default",
            CursorHint::Move => "move",
            CursorHint::NwseResize => "nwse-resize",
            CursorHint::NeswResize => "nesw-resize",
            CursorHint::Crosshair => "crosshair",
            CursorHint::Grab => "grab",
            CursorHint::Grabbing => "grabbing",
            CursorHint::Text => "text",
        }
    }
}
