//! Drawable elements.

use crate::geometry::bounding_fold;
use crate::render::{ShapeDescriptor, build_descriptor};
use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;
use uuid::Uuid;

/// Radius of the dot a single-sample pencil stroke collapses into.
pub const DOT_RADIUS: f64 = 2.0;

/// Stable element identity, independent of its position in the element list.
///
/// `site` is drawn at random once per session and `seq` increases
/// monotonically within it, so ids minted by concurrent participants never
/// collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId {
    pub site: u64,
    pub seq: u64,
}

impl ElementId {
    pub fn new(site: u64, seq: u64) -> Self {
        Self { site, seq }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}:{}", self.site, self.seq)
    }
}

/// Mints [`ElementId`]s for one session.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    site: u64,
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Allocator with a random site.
    pub fn new() -> Self {
        Self::with_site(Uuid::new_v4().as_u64_pair().0)
    }

    pub fn with_site(site: u64) -> Self {
        Self { site, next: 0 }
    }

    pub fn site(&self) -> u64 {
        self.site
    }

    pub fn next_id(&mut self) -> ElementId {
        let id = ElementId::new(self.site, self.next);
        self.next += 1;
        id
    }
}

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// The two corners every element carries.
///
/// For lines these are the endpoints, for everything else the bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Coords {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_points(start: Point, end: Point) -> Self {
        Self::new(start.x, start.y, end.x, end.y)
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    /// Both axes ordered so that `x1 <= x2` and `y1 <= y2`.
    pub fn ordered(&self) -> Self {
        Self::new(
            self.x1.min(self.x2),
            self.y1.min(self.y2),
            self.x1.max(self.x2),
            self.y1.max(self.y2),
        )
    }

    pub fn is_ordered(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    pub fn to_rect(&self) -> Rect {
        Rect::from_points(self.start(), self.end())
    }

    pub fn translate(&self, delta: Vec2) -> Self {
        Self::new(
            self.x1 + delta.x,
            self.y1 + delta.y,
            self.x2 + delta.x,
            self.y2 + delta.y,
        )
    }
}

impl From<Rect> for Coords {
    fn from(rect: Rect) -> Self {
        Self::new(rect.x0, rect.y0, rect.x1, rect.y1)
    }
}

/// Per-kind payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Line,
    Rectangle,
    Circle,
    Pencil { points: Vec<Point> },
    Text { text: String },
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Line => "line",
            ElementKind::Rectangle => "rectangle",
            ElementKind::Circle => "circle",
            ElementKind::Pencil { .. } => "pencil",
            ElementKind::Text { .. } => "text",
        }
    }
}

/// One drawable object on the surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default)]
    pub color: SerializableColor,
    pub kind: ElementKind,
    /// Renderer-ready outline, derived from the fields above.
    #[serde(skip)]
    descriptor: RwLock<Option<ShapeDescriptor>>,
}

impl Clone for Element {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            x1: self.x1,
            y1: self.y1,
            x2: self.x2,
            y2: self.y2,
            color: self.color,
            kind: self.kind.clone(),
            descriptor: RwLock::new(self.descriptor.read().ok().and_then(|g| g.clone())),
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.coords() == other.coords()
            && self.color == other.color
            && self.kind == other.kind
    }
}

impl Element {
    pub fn new(id: ElementId, kind: ElementKind, coords: Coords) -> Self {
        Self {
            id,
            x1: coords.x1,
            y1: coords.y1,
            x2: coords.x2,
            y2: coords.y2,
            color: SerializableColor::black(),
            kind,
            descriptor: RwLock::new(None),
        }
    }

    pub fn with_color(mut self, color: SerializableColor) -> Self {
        self.color = color;
        self
    }

    /// A freehand stroke starting with a single sample.
    pub fn pencil(id: ElementId, start: Point) -> Self {
        Self::new(
            id,
            ElementKind::Pencil { points: vec![start] },
            Coords::from_points(start, start),
        )
    }

    /// A text element anchored at `anchor` with a box of `size`.
    pub fn text(id: ElementId, anchor: Point, size: Vec2, text: impl Into<String>) -> Self {
        Self::new(
            id,
            ElementKind::Text { text: text.into() },
            Coords::from_points(anchor, anchor + size),
        )
    }

    /// A small filled circle centered on `center`.
    pub fn dot(id: ElementId, center: Point) -> Self {
        let r = Vec2::new(DOT_RADIUS, DOT_RADIUS);
        Self::new(id, ElementKind::Circle, Coords::from_points(center - r, center + r))
    }

    pub fn coords(&self) -> Coords {
        Coords::new(self.x1, self.y1, self.x2, self.y2)
    }

    pub fn set_coords(&mut self, coords: Coords) {
        self.x1 = coords.x1;
        self.y1 = coords.y1;
        self.x2 = coords.x2;
        self.y2 = coords.y2;
        self.invalidate_descriptor();
    }

    pub fn anchor(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn bounds(&self) -> Rect {
        self.coords().to_rect()
    }

    pub fn is_pencil(&self) -> bool {
        matches!(self.kind, ElementKind::Pencil { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ElementKind::Text { .. })
    }

    pub fn points(&self) -> Option<&[Point]> {
        match &self.kind {
            ElementKind::Pencil { points } => Some(points),
            _ => None,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Append a sample to a pencil stroke and grow its bounds.
    pub fn push_point(&mut self, point: Point) {
        if let ElementKind::Pencil { points } = &mut self.kind {
            points.push(point);
            self.refold();
        }
    }

    /// Replace the samples of a pencil stroke.
    pub fn set_points(&mut self, new_points: Vec<Point>) {
        if let ElementKind::Pencil { points } = &mut self.kind {
            *points = new_points;
            self.refold();
        }
    }

    pub fn set_text(&mut self, new_text: impl Into<String>) {
        if let ElementKind::Text { text } = &mut self.kind {
            *text = new_text.into();
            self.invalidate_descriptor();
        }
    }

    /// Recompute the bounds of a pencil stroke as the min/max fold of its samples.
    pub fn refold(&mut self) {
        let fold = self.points().and_then(bounding_fold);
        if let Some(rect) = fold {
            self.set_coords(rect.into());
        }
    }

    /// The cached outline, building it if necessary.
    pub fn descriptor(&self) -> ShapeDescriptor {
        if let Some(path) = self.descriptor.read().ok().and_then(|g| g.clone()) {
            return path;
        }
        let path = build_descriptor(self);
        if let Ok(mut cache) = self.descriptor.write() {
            *cache = Some(path.clone());
        }
        path
    }

    pub fn has_descriptor(&self) -> bool {
        self.descriptor.read().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Build the outline now if it is not cached yet.
    pub fn refresh_descriptor(&self) {
        if !self.has_descriptor() {
            self.descriptor();
        }
    }

    pub fn invalidate_descriptor(&self) {
        if let Ok(mut cache) = self.descriptor.write() {
            *cache = None;
        }
    }
}
