//! Rendering seam.
//!
//! The core never draws pixels itself. It derives a [`ShapeDescriptor`] per
//! element and hands it to whatever [`Renderer`] the host provides.

use crate::element::{Element, ElementId, ElementKind};
use crate::error::{Error, Result};
use kurbo::{Affine, BezPath, Circle, Point, Rect, Shape};
use peniko::Color;

/// Renderer-consumable outline of an element.
pub type ShapeDescriptor = BezPath;

/// Font size used for text elements.
pub const FONT_SIZE: f64 = 24.0;

/// Stroke width used for every outline.
pub const STROKE_WIDTH: f64 = 1.0;

const PATH_TOLERANCE: f64 = 0.1;

/// Build the outline for an element from its current geometry.
pub fn build_descriptor(element: &Element) -> ShapeDescriptor {
    let coords = element.coords();
    match &element.kind {
        ElementKind::Line => {
            let mut path = BezPath::new();
            path.move_to(coords.start());
            path.line_to(coords.end());
            path
        }
        ElementKind::Rectangle | ElementKind::Text { .. } => coords.to_rect().to_path(PATH_TOLERANCE),
        ElementKind::Circle => {
            let rect = coords.to_rect();
            let radius = (rect.width().hypot(rect.height())) / 2.0;
            Circle::new(rect.center(), radius).to_path(PATH_TOLERANCE)
        }
        ElementKind::Pencil { points } => {
            let mut path = BezPath::new();
            if let Some((first, rest)) = points.split_first() {
                path.move_to(*first);
                for p in rest {
                    path.line_to(*p);
                }
            }
            path
        }
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Called once before any element is drawn, with the world-to-screen transform.
    fn begin_frame(&mut self, _transform: Affine) {}

    fn stroke(&mut self, path: &ShapeDescriptor, color: Color, width: f64);

    fn text(&mut self, text: &str, anchor: Point, font_size: f64, color: Color);

    fn end_frame(&mut self) {}
}

/// Draw `elements` in order, skipping the one currently being written.
pub fn render_elements(
    renderer: &mut dyn Renderer,
    elements: &[Element],
    transform: Affine,
    editing: Option<ElementId>,
) {
    renderer.begin_frame(transform);
    for element in elements {
        if Some(element.id) == editing {
            continue;
        }
        let color: Color = element.color.into();
        match &element.kind {
            ElementKind::Text { text } => {
                renderer.text(text, element.anchor(), FONT_SIZE, color);
            }
            _ => renderer.stroke(&element.descriptor(), color, STROKE_WIDTH),
        }
    }
    renderer.end_frame();
}

/// Measures rendered text width.
pub trait TextMeasure {
    /// Width in world units of `text` at `font_size`.
    fn measure_width(&self, text: &str, font_size: f64) -> Result<f64>;
}

/// Width estimate from character count, for hosts without a font engine.
#[derive(Debug, Clone, Copy)]
pub struct ApproximateTextMeasure {
    pub char_width_factor: f64,
}

impl Default for ApproximateTextMeasure {
    fn default() -> Self {
        Self { char_width_factor: 0.55 }
    }
}

impl TextMeasure for ApproximateTextMeasure {
    fn measure_width(&self, text: &str, font_size: f64) -> Result<f64> {
        let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        Ok(longest as f64 * font_size * self.char_width_factor)
    }
}

/// Measurement backend for a host that has no drawing context.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmeasured;

impl TextMeasure for Unmeasured {
    fn measure_width(&self, _text: &str, _font_size: f64) -> Result<f64> {
        Err(Error::MissingContext("no text measurement backend".to_string()))
    }
}

/// Bounding box of a descriptor.
pub fn descriptor_bounds(path: &ShapeDescriptor) -> Rect {
    path.bounding_box()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Coords, ElementId};
    use kurbo::Vec2;

    #[derive(Default)]
    struct Recorder {
        strokes: usize,
        texts: Vec<String>,
        frames: usize,
    }

    impl Renderer for Recorder {
        fn begin_frame(&mut self, _transform: Affine) {
            self.frames += 1;
        }

        fn stroke(&mut self, _path: &ShapeDescriptor, _color: Color, _width: f64) {
            self.strokes += 1;
        }

        fn text(&mut self, text: &str, _anchor: Point, _font_size: f64, _color: Color) {
            self.texts.push(text.to_string());
        }
    }

    fn id(seq: u64) -> ElementId {
        ElementId::new(1, seq)
    }

    #[test]
    fn test_line_descriptor() {
        let el = Element::new(id(0), ElementKind::Line, Coords::new(0.0, 0.0, 10.0, 5.0));
        let bounds = descriptor_bounds(&el.descriptor());
        assert_eq!(bounds, Rect::new(0.0, 0.0, 10.0, 5.0));
    }

    #[test]
    fn test_circle_descriptor_circumscribes_box() {
        let el = Element::new(id(0), ElementKind::Circle, Coords::new(0.0, 0.0, 6.0, 8.0));
        let bounds = descriptor_bounds(&el.descriptor());
        // radius 5 around (3, 4)
        assert!((bounds.width() - 10.0).abs() < 0.5);
        assert!((bounds.center().x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_render_skips_editing_element() {
        let elements = vec![
            Element::new(id(0), ElementKind::Rectangle, Coords::new(0.0, 0.0, 5.0, 5.0)),
            Element::text(id(1), Point::new(1.0, 1.0), Vec2::new(100.0, 24.0), "note"),
            Element::text(id(2), Point::new(1.0, 40.0), Vec2::new(100.0, 24.0), "draft"),
        ];
        let mut recorder = Recorder::default();
        render_elements(&mut recorder, &elements, Affine::IDENTITY, Some(id(2)));
        assert_eq!(recorder.frames, 1);
        assert_eq!(recorder.strokes, 1);
        assert_eq!(recorder.texts, vec!["note".to_string()]);
    }

    #[test]
    fn test_approximate_measure() {
        let m = ApproximateTextMeasure::default();
        let w = m.measure_width("abcd\nab", 20.0).unwrap();
        assert!((w - 4.0 * 20.0 * 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_unmeasured_reports_missing_context() {
        assert!(matches!(
            Unmeasured.measure_width("x", FONT_SIZE),
            Err(Error::MissingContext(_))
        ));
    }
}
