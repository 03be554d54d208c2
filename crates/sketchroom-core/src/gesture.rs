//! Gesture state machine.
//!
//! Turns pointer and keyboard events into element edits. Every frame of a
//! gesture overwrites one history entry; the entry is opened on the first
//! change, so a gesture undoes in a single step. Finished gestures yield the
//! [`DrawAction`] peers need to converge.

use crate::camera::Camera;
use crate::element::{Coords, Element, ElementId};
use crate::error::Result;
use crate::hit_test::{locate, normalize};
use crate::input::{InputState, KeyEvent, MouseButton, PointerEvent};
use crate::render::{FONT_SIZE, TextMeasure};
use crate::selection::Selection;
use crate::store::{ElementStore, Record};
use crate::sync::DrawAction;
use crate::tools::{CursorHint, ToolKind};
use kurbo::{Point, Vec2};

/// Box of a text element before its content is measured.
pub const TEXT_PLACEHOLDER_SIZE: Vec2 = Vec2::new(100.0, 24.0);
/// Narrowest committed text box.
pub const MIN_TEXT_WIDTH: f64 = 20.0;
/// Height of a committed text box.
pub const TEXT_HEIGHT: f64 = 32.0;

/// What the pointer is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Drawing,
    Moving,
    Resizing,
    Panning,
    Writing,
}

/// Everything a gesture reads or mutates, lent by the owning session.
pub struct GestureContext<'a> {
    pub store: &'a mut ElementStore,
    pub camera: &'a mut Camera,
    pub input: &'a InputState,
}

#[derive(Debug, Clone, Default)]
pub struct GestureMachine {
    state: GestureState,
    cursor: CursorHint,
    /// Last pointer position (screen) while panning.
    pan_anchor: Point,
    /// The selected element was created by this gesture.
    created: bool,
    /// This gesture already owns the current history entry.
    entry_open: bool,
    /// Element under the pointer while idle.
    hovered: Option<ElementId>,
}

impl GestureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    pub fn cursor(&self) -> CursorHint {
        self.cursor
    }

    pub fn hovered(&self) -> Option<ElementId> {
        self.hovered
    }

    /// The text element awaiting input, if any.
    pub fn writing_target(&self, store: &ElementStore) -> Option<ElementId> {
        match self.state {
            GestureState::Writing => store.selection().map(|s| s.id),
            _ => None,
        }
    }

    /// Feed a pointer event (screen coordinates).
    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        ctx: &mut GestureContext<'_>,
    ) -> Option<DrawAction> {
        match *event {
            PointerEvent::Down { position, button } => {
                self.pointer_down(position, button, ctx);
                None
            }
            PointerEvent::Move { position } => {
                self.pointer_move(position, ctx);
                None
            }
            PointerEvent::Up { position, .. } => self.pointer_up(position, ctx),
            PointerEvent::Scroll { delta, .. } => {
                if ctx.input.modifiers.command() {
                    ctx.camera.zoom_wheel(delta.y);
                } else {
                    ctx.camera.pan_by_screen(-delta);
                }
                None
            }
        }
    }

    fn pointer_down(&mut self, screen: Point, button: MouseButton, ctx: &mut GestureContext<'_>) {
        if self.state != GestureState::Idle {
            return;
        }

        let tool = ctx.store.tool();
        if tool == ToolKind::Pan || button == MouseButton::Middle || ctx.input.is_space_held() {
            self.state = GestureState::Panning;
            self.pan_anchor = screen;
            self.cursor = CursorHint::Grabbing;
            return;
        }
        if button != MouseButton::Left {
            return;
        }

        let world = ctx.camera.screen_to_world(screen);
        match tool {
            ToolKind::Selection => match locate(world, ctx.store.elements()) {
                Some(hit) => {
                    let element = &ctx.store.elements()[hit.index];
                    let (selection, state) = if hit.position.is_body() {
                        (Selection::for_move(element, world), GestureState::Moving)
                    } else {
                        (Selection::for_resize(element, hit.position, world), GestureState::Resizing)
                    };
                    ctx.store.select(selection);
                    self.begin(state, false);
                    self.cursor = hit.position.cursor();
                }
                None => ctx.store.clear_selection(),
            },
            ToolKind::Text => {
                let id = ctx.store.next_id();
                let element = Element::text(id, world, TEXT_PLACEHOLDER_SIZE, "");
                self.start_new(element, world, GestureState::Writing, ctx.store);
                self.cursor = CursorHint::Text;
            }
            ToolKind::Line | ToolKind::Rectangle | ToolKind::Circle | ToolKind::Pencil => {
                let id = ctx.store.next_id();
                if let Some(element) = tool.start_element(id, world) {
                    self.start_new(element, world, GestureState::Drawing, ctx.store);
                }
            }
            ToolKind::Pan => {}
        }
    }

    fn start_new(&mut self, element: Element, world: Point, state: GestureState, store: &mut ElementStore) {
        log::debug!("Creating {} {}", element.kind.name(), element.id);
        store.select(Selection::for_draw(&element, world));
        store.apply_local(Record::Commit, move |elements| elements.push(element));
        self.begin(state, true);
        self.entry_open = true;
    }

    fn begin(&mut self, state: GestureState, created: bool) {
        self.state = state;
        self.created = created;
        self.entry_open = false;
        self.hovered = None;
    }

    fn pointer_move(&mut self, screen: Point, ctx: &mut GestureContext<'_>) {
        let world = ctx.camera.screen_to_world(screen);
        match self.state {
            GestureState::Panning => {
                ctx.camera.pan_by_screen(screen - self.pan_anchor);
                self.pan_anchor = screen;
            }
            GestureState::Idle => {
                if ctx.store.tool() == ToolKind::Selection {
                    let hit = locate(world, ctx.store.elements());
                    self.hovered = hit.map(|h| h.id);
                    self.cursor = hit.map(|h| h.position.cursor()).unwrap_or_default();
                }
            }
            GestureState::Writing => {}
            GestureState::Drawing | GestureState::Moving | GestureState::Resizing => {
                let Some((selection, mut element)) = self.target(ctx.store) else {
                    return;
                };
                match self.state {
                    GestureState::Drawing if element.is_pencil() => element.push_point(world),
                    GestureState::Drawing => {
                        element.set_coords(Coords::from_points(selection.original.anchor(), world));
                    }
                    GestureState::Moving => element = selection.moved(world),
                    _ => element = selection.resized(world),
                }
                self.write(ctx.store, element);
            }
        }
    }

    fn pointer_up(&mut self, screen: Point, ctx: &mut GestureContext<'_>) -> Option<DrawAction> {
        match self.state {
            GestureState::Idle | GestureState::Writing => None,
            GestureState::Panning => {
                self.finish(ctx.store);
                None
            }
            GestureState::Drawing | GestureState::Moving | GestureState::Resizing => {
                let world = ctx.camera.screen_to_world(screen);
                let (selection, current) = self.target(ctx.store)?;
                let finished = self.finalize(current.clone());
                if finished != current {
                    self.write(ctx.store, finished.clone());
                }

                let action = if self.created {
                    Some(DrawAction::Add { element: finished.clone() })
                } else if self.entry_open && finished != selection.original {
                    Some(DrawAction::Update { element: finished.clone() })
                } else {
                    None
                };

                if finished.is_text() && selection.is_unmoved(world) {
                    self.state = GestureState::Writing;
                    self.cursor = CursorHint::Text;
                } else {
                    self.finish(ctx.store);
                }
                action
            }
        }
    }

    fn finalize(&self, mut element: Element) -> Element {
        if !matches!(self.state, GestureState::Drawing | GestureState::Resizing) {
            return element;
        }
        let single_sample = match element.points() {
            Some([only]) => Some(*only),
            _ => None,
        };
        if let Some(center) = single_sample {
            return Element::dot(element.id, center).with_color(element.color);
        }
        let coords = normalize(&element);
        element.set_coords(coords);
        element
    }

    /// Write the measured text into the element being written.
    ///
    /// Empty input is stored as a single space. If measurement fails nothing
    /// is changed and the machine stays in `Writing`.
    pub fn commit_text(
        &mut self,
        text: &str,
        measure: &dyn TextMeasure,
        store: &mut ElementStore,
    ) -> Result<Option<DrawAction>> {
        if self.state != GestureState::Writing {
            return Ok(None);
        }
        let Some((_, mut element)) = self.target(store) else {
            return Ok(None);
        };

        let content = if text.is_empty() { " " } else { text };
        let width = measure.measure_width(content, FONT_SIZE)?.max(MIN_TEXT_WIDTH);
        let anchor = element.anchor();
        element.set_text(content);
        element.set_coords(Coords::new(anchor.x, anchor.y, anchor.x + width, anchor.y + TEXT_HEIGHT));
        self.write(store, element.clone());

        let action = if self.created {
            DrawAction::Add { element }
        } else {
            DrawAction::Update { element }
        };
        self.finish(store);
        Ok(Some(action))
    }

    /// Feed a key event. Input modifiers must already reflect the event.
    ///
    /// Undo and redo can move several elements at once, hence the list.
    pub fn handle_key(&mut self, event: &KeyEvent, ctx: &mut GestureContext<'_>) -> Vec<DrawAction> {
        let KeyEvent::Pressed(key) = event else {
            return Vec::new();
        };
        if key == "Escape" {
            self.cancel(ctx.store);
            return Vec::new();
        }
        if self.state == GestureState::Writing {
            return Vec::new();
        }

        let modifiers = ctx.input.modifiers;
        match key.as_str() {
            "z" | "Z" if modifiers.command() && modifiers.shift => self.redo(ctx.store),
            "z" | "Z" if modifiers.command() => self.undo(ctx.store),
            "y" | "Y" if modifiers.command() => self.redo(ctx.store),
            "Delete" | "Backspace" => self.delete_hovered(ctx.store).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Step back in history, only while idle.
    pub fn undo(&mut self, store: &mut ElementStore) -> Vec<DrawAction> {
        if !self.is_idle() {
            return Vec::new();
        }
        store.undo().unwrap_or_default()
    }

    pub fn redo(&mut self, store: &mut ElementStore) -> Vec<DrawAction> {
        if !self.is_idle() {
            return Vec::new();
        }
        store.redo().unwrap_or_default()
    }

    /// Remove the element under the pointer.
    pub fn delete_hovered(&mut self, store: &mut ElementStore) -> Option<DrawAction> {
        let id = self.hovered?;
        self.hovered = None;
        self.delete(id, store)
    }

    /// Remove an element as a committed edit.
    pub fn delete(&mut self, id: ElementId, store: &mut ElementStore) -> Option<DrawAction> {
        if !self.is_idle() || !store.contains(id) {
            return None;
        }
        store.apply_local(Record::Commit, |elements| elements.retain(|e| e.id != id));
        Some(DrawAction::Delete { element_id: id })
    }

    /// Abandon the gesture in progress.
    ///
    /// A newly created element is removed and a transformed one restored.
    /// Nothing is broadcast since peers never saw the gesture.
    pub fn cancel(&mut self, store: &mut ElementStore) {
        if let Some(selection) = store.selection().cloned() {
            if self.entry_open && store.contains(selection.id) {
                if self.created {
                    store.apply_local(Record::Overwrite, |elements| {
                        elements.retain(|e| e.id != selection.id)
                    });
                } else {
                    store.replace_element(selection.original, Record::Overwrite);
                }
            }
        }
        self.finish(store);
    }

    /// The selection and the current state of its element, or abort the
    /// gesture if the element has been removed underneath it.
    fn target(&mut self, store: &mut ElementStore) -> Option<(Selection, Element)> {
        let found = store
            .selection()
            .cloned()
            .and_then(|s| store.get(s.id).cloned().map(|e| (s, e)));
        if found.is_none() {
            log::debug!("Selected element vanished, aborting {:?}", self.state);
            self.finish(store);
        }
        found
    }

    fn write(&mut self, store: &mut ElementStore, element: Element) {
        let record = if self.entry_open { Record::Overwrite } else { Record::Commit };
        if store.replace_element(element, record) {
            self.entry_open = true;
        }
    }

    fn finish(&mut self, store: &mut ElementStore) {
        self.state = GestureState::Idle;
        self.created = false;
        self.entry_open = false;
        self.cursor = store.tool().cursor();
        store.clear_selection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, IdAllocator};
    use crate::history::DEFAULT_MAX_ENTRIES;
    use crate::input::{KEY_SPACE, Modifiers};
    use crate::render::{ApproximateTextMeasure, Unmeasured};
    use crate::error::Error;

    struct Harness {
        store: ElementStore,
        camera: Camera,
        input: InputState,
        machine: GestureMachine,
    }

    impl Harness {
        fn new(tool: ToolKind) -> Self {
            let mut store = ElementStore::with_ids(IdAllocator::with_site(1), DEFAULT_MAX_ENTRIES);
            store.set_tool(tool);
            Self {
                store,
                camera: Camera::new(),
                input: InputState::new(),
                machine: GestureMachine::new(),
            }
        }

        fn pointer(&mut self, event: PointerEvent) -> Option<DrawAction> {
            self.input.handle_pointer_event(&event);
            let mut ctx = GestureContext {
                store: &mut self.store,
                camera: &mut self.camera,
                input: &self.input,
            };
            self.machine.handle_pointer(&event, &mut ctx)
        }

        fn down(&mut self, x: f64, y: f64) -> Option<DrawAction> {
            self.pointer(PointerEvent::Down { position: Point::new(x, y), button: MouseButton::Left })
        }

        fn drag(&mut self, x: f64, y: f64) -> Option<DrawAction> {
            self.pointer(PointerEvent::Move { position: Point::new(x, y) })
        }

        fn up(&mut self, x: f64, y: f64) -> Option<DrawAction> {
            self.pointer(PointerEvent::Up { position: Point::new(x, y), button: MouseButton::Left })
        }

        fn key(&mut self, key: &str, modifiers: Modifiers) -> Vec<DrawAction> {
            let event = KeyEvent::Pressed(key.to_string());
            self.input.set_modifiers(modifiers);
            self.input.handle_key_event(&event);
            let mut ctx = GestureContext {
                store: &mut self.store,
                camera: &mut self.camera,
                input: &self.input,
            };
            let action = self.machine.handle_key(&event, &mut ctx);
            self.input.handle_key_event(&KeyEvent::Released(key.to_string()));
            action
        }

        fn draw_rect(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Option<DrawAction> {
            self.store.set_tool(ToolKind::Rectangle);
            self.down(x1, y1);
            self.drag(x2, y2);
            let action = self.up(x2, y2);
            self.store.set_tool(ToolKind::Selection);
            action
        }
    }

    fn ctrl() -> Modifiers {
        Modifiers { ctrl: true, ..Default::default() }
    }

    #[test]
    fn test_draw_rectangle_is_one_entry() {
        let mut h = Harness::new(ToolKind::Rectangle);
        assert!(h.down(10.0, 10.0).is_none());
        assert_eq!(h.machine.state(), GestureState::Drawing);
        h.drag(30.0, 20.0);
        h.drag(50.0, 40.0);
        let action = h.up(50.0, 40.0);

        assert_eq!(h.machine.state(), GestureState::Idle);
        assert_eq!(h.store.history().len(), 2);
        let el = &h.store.elements()[0];
        assert_eq!(el.coords(), Coords::new(10.0, 10.0, 50.0, 40.0));
        assert_eq!(action, Some(DrawAction::Add { element: el.clone() }));
        assert!(h.store.selection().is_none());
    }

    #[test]
    fn test_reverse_drag_is_normalized() {
        let mut h = Harness::new(ToolKind::Rectangle);
        h.down(50.0, 50.0);
        h.drag(10.0, 20.0);
        h.up(10.0, 20.0);
        assert_eq!(h.store.elements()[0].coords(), Coords::new(10.0, 20.0, 50.0, 50.0));
    }

    #[test]
    fn test_single_sample_pencil_becomes_dot() {
        let mut h = Harness::new(ToolKind::Pencil);
        h.down(50.0, 50.0);
        let action = h.up(50.0, 50.0);
        let el = &h.store.elements()[0];
        assert_eq!(el.kind, ElementKind::Circle);
        assert_eq!(el.coords(), Coords::new(48.0, 48.0, 52.0, 52.0));
        assert!(matches!(action, Some(DrawAction::Add { element }) if element.kind == ElementKind::Circle));
    }

    #[test]
    fn test_pencil_stroke_bounds() {
        let mut h = Harness::new(ToolKind::Pencil);
        h.down(10.0, 10.0);
        h.drag(30.0, 5.0);
        h.drag(20.0, 40.0);
        h.up(20.0, 40.0);
        let el = &h.store.elements()[0];
        assert_eq!(el.points().unwrap().len(), 3);
        assert_eq!(el.coords(), Coords::new(10.0, 5.0, 30.0, 40.0));
        assert_eq!(h.store.history().len(), 2);
    }

    #[test]
    fn test_move_commits_once_and_undoes() {
        let mut h = Harness::new(ToolKind::Selection);
        h.draw_rect(10.0, 10.0, 110.0, 110.0);
        assert_eq!(h.store.history().len(), 2);

        h.down(50.0, 50.0);
        assert_eq!(h.machine.state(), GestureState::Moving);
        h.drag(60.0, 55.0);
        h.drag(70.0, 60.0);
        let action = h.up(70.0, 60.0);

        assert_eq!(h.store.history().len(), 3);
        let moved = h.store.elements()[0].clone();
        assert_eq!(moved.coords(), Coords::new(30.0, 20.0, 130.0, 120.0));
        assert_eq!(action, Some(DrawAction::Update { element: moved }));

        let undo = h.key("z", ctrl());
        assert_eq!(
            undo,
            vec![DrawAction::Update { element: h.store.elements()[0].clone() }]
        );
        assert_eq!(h.store.elements()[0].coords(), Coords::new(10.0, 10.0, 110.0, 110.0));
    }

    #[test]
    fn test_click_without_travel_records_nothing() {
        let mut h = Harness::new(ToolKind::Selection);
        h.draw_rect(10.0, 10.0, 110.0, 110.0);
        h.down(50.0, 50.0);
        assert!(h.up(50.0, 50.0).is_none());
        assert_eq!(h.store.history().len(), 2);
    }

    #[test]
    fn test_resize_past_opposite_corner() {
        let mut h = Harness::new(ToolKind::Selection);
        h.draw_rect(10.0, 10.0, 110.0, 110.0);
        h.down(10.0, 10.0);
        assert_eq!(h.machine.state(), GestureState::Resizing);
        h.drag(200.0, 150.0);
        let action = h.up(200.0, 150.0);
        let el = &h.store.elements()[0];
        assert_eq!(el.coords(), Coords::new(110.0, 110.0, 200.0, 150.0));
        assert!(matches!(action, Some(DrawAction::Update { .. })));
    }

    #[test]
    fn test_click_on_empty_space_clears_selection() {
        let mut h = Harness::new(ToolKind::Selection);
        h.draw_rect(10.0, 10.0, 20.0, 20.0);
        h.down(500.0, 500.0);
        assert_eq!(h.machine.state(), GestureState::Idle);
        assert!(h.store.selection().is_none());
    }

    #[test]
    fn test_text_flow() {
        let mut h = Harness::new(ToolKind::Text);
        h.down(10.0, 10.0);
        assert_eq!(h.machine.state(), GestureState::Writing);
        assert_eq!(h.store.elements()[0].coords(), Coords::new(10.0, 10.0, 110.0, 34.0));
        h.up(10.0, 10.0);
        assert_eq!(h.machine.state(), GestureState::Writing);
        // ignored while writing
        h.down(300.0, 300.0);
        assert_eq!(h.store.len(), 1);

        let target = h.machine.writing_target(&h.store);
        assert_eq!(target, Some(h.store.elements()[0].id));

        let action = h
            .machine
            .commit_text("hello", &ApproximateTextMeasure::default(), &mut h.store)
            .unwrap();
        let el = h.store.elements()[0].clone();
        assert_eq!(el.text_content(), Some("hello"));
        assert!((el.x2 - (10.0 + 5.0 * FONT_SIZE * 0.55)).abs() < 1e-9);
        assert_eq!(el.y2, 10.0 + TEXT_HEIGHT);
        assert_eq!(action, Some(DrawAction::Add { element: el }));
        assert_eq!(h.machine.state(), GestureState::Idle);
        assert_eq!(h.store.history().len(), 2);
    }

    #[test]
    fn test_empty_text_is_space_with_min_width() {
        let mut h = Harness::new(ToolKind::Text);
        h.down(0.0, 0.0);
        h.machine
            .commit_text("", &ApproximateTextMeasure::default(), &mut h.store)
            .unwrap();
        let el = &h.store.elements()[0];
        assert_eq!(el.text_content(), Some(" "));
        assert_eq!(el.x2, MIN_TEXT_WIDTH);
    }

    #[test]
    fn test_missing_measure_context_changes_nothing() {
        let mut h = Harness::new(ToolKind::Text);
        h.down(0.0, 0.0);
        let before = h.store.elements()[0].clone();
        let result = h.machine.commit_text("hi", &Unmeasured, &mut h.store);
        assert!(matches!(result, Err(Error::MissingContext(_))));
        assert_eq!(h.store.elements()[0], before);
        assert_eq!(h.machine.state(), GestureState::Writing);
    }

    #[test]
    fn test_click_on_text_reenters_writing() {
        let mut h = Harness::new(ToolKind::Text);
        h.down(0.0, 0.0);
        h.machine
            .commit_text("note", &ApproximateTextMeasure::default(), &mut h.store)
            .unwrap();
        h.store.set_tool(ToolKind::Selection);

        h.down(5.0, 5.0);
        assert_eq!(h.machine.state(), GestureState::Moving);
        assert!(h.up(5.0, 5.0).is_none());
        assert_eq!(h.machine.state(), GestureState::Writing);

        let action = h
            .machine
            .commit_text("edited", &ApproximateTextMeasure::default(), &mut h.store)
            .unwrap();
        assert!(matches!(action, Some(DrawAction::Update { .. })));
        assert_eq!(h.store.elements()[0].text_content(), Some("edited"));
        assert_eq!(h.store.history().len(), 3);
    }

    #[test]
    fn test_remote_delete_aborts_gesture() {
        let mut h = Harness::new(ToolKind::Selection);
        h.draw_rect(10.0, 10.0, 110.0, 110.0);
        let id = h.store.elements()[0].id;
        h.down(50.0, 50.0);
        h.store.apply_remote(&DrawAction::Delete { element_id: id });
        h.drag(60.0, 60.0);
        assert_eq!(h.machine.state(), GestureState::Idle);
        assert!(h.store.selection().is_none());
        assert!(h.store.is_empty());
        assert!(h.up(60.0, 60.0).is_none());
    }

    #[test]
    fn test_remote_update_mid_gesture_keeps_grip() {
        let mut h = Harness::new(ToolKind::Selection);
        h.draw_rect(10.0, 10.0, 110.0, 110.0);
        let mut remote = h.store.elements()[0].clone();
        h.down(50.0, 50.0);
        remote.color = crate::element::SerializableColor::new(255, 0, 0, 255);
        h.store.apply_remote(&DrawAction::Update { element: remote });
        assert!(matches!(h.store.selection().map(|s| &s.grip), Some(crate::selection::Grip::Offset(_))));
        h.drag(60.0, 50.0);
        assert_eq!(h.store.elements()[0].x1, 20.0);
    }

    #[test]
    fn test_space_drag_pans() {
        let mut h = Harness::new(ToolKind::Rectangle);
        h.input.handle_key_event(&KeyEvent::Pressed(KEY_SPACE.to_string()));
        h.down(100.0, 100.0);
        assert_eq!(h.machine.state(), GestureState::Panning);
        h.drag(130.0, 90.0);
        h.up(130.0, 90.0);
        assert_eq!(h.camera.pan, Vec2::new(30.0, -10.0));
        assert!(h.store.is_empty());
        assert_eq!(h.store.history().len(), 1);
    }

    #[test]
    fn test_wheel_zoom_and_pan() {
        let mut h = Harness::new(ToolKind::Selection);
        h.input.set_modifiers(ctrl());
        h.pointer(PointerEvent::Scroll { position: Point::ZERO, delta: Vec2::new(0.0, -50.0) });
        assert!((h.camera.scale - 1.5).abs() < 1e-9);

        h.input.set_modifiers(Modifiers::default());
        h.camera.scale = 1.0;
        h.pointer(PointerEvent::Scroll { position: Point::ZERO, delta: Vec2::new(5.0, 10.0) });
        assert_eq!(h.camera.pan, Vec2::new(-5.0, -10.0));
    }

    #[test]
    fn test_redo_shortcuts() {
        let mut h = Harness::new(ToolKind::Selection);
        h.draw_rect(0.0, 0.0, 10.0, 10.0);
        let id = h.store.elements()[0].id;
        assert_eq!(h.key("z", ctrl()), vec![DrawAction::Delete { element_id: id }]);
        assert!(h.store.is_empty());
        assert!(h.key("z", ctrl()).is_empty());

        let redo = h.key("z", Modifiers { ctrl: true, shift: true, ..Default::default() });
        assert!(matches!(&redo[..], [DrawAction::Add { element }] if element.id == id));
        h.key("z", ctrl());
        assert_eq!(h.key("y", Modifiers { meta: true, ..Default::default() }).len(), 1);
        assert_eq!(h.store.len(), 1);
        assert!(h.key("y", ctrl()).is_empty());
        // plain z does nothing
        assert!(h.key("z", Modifiers::default()).is_empty());
    }

    #[test]
    fn test_undo_waits_for_idle() {
        let mut h = Harness::new(ToolKind::Selection);
        h.draw_rect(0.0, 0.0, 100.0, 100.0);
        h.down(50.0, 50.0);
        h.drag(60.0, 60.0);
        assert!(h.machine.undo(&mut h.store).is_empty());
        assert_eq!(h.machine.state(), GestureState::Moving);
    }

    #[test]
    fn test_delete_hovered() {
        let mut h = Harness::new(ToolKind::Selection);
        h.draw_rect(10.0, 10.0, 110.0, 110.0);
        let id = h.store.elements()[0].id;
        h.drag(50.0, 50.0);
        assert_eq!(h.machine.hovered(), Some(id));
        assert_eq!(h.machine.cursor(), CursorHint::Move);
        let action = h.key("Delete", Modifiers::default());
        assert_eq!(action, vec![DrawAction::Delete { element_id: id }]);
        assert!(h.store.is_empty());
        assert!(h.store.can_undo());
    }

    #[test]
    fn test_escape_discards_new_element() {
        let mut h = Harness::new(ToolKind::Line);
        h.down(0.0, 0.0);
        h.drag(40.0, 40.0);
        h.key("Escape", Modifiers::default());
        assert_eq!(h.machine.state(), GestureState::Idle);
        assert!(h.store.is_empty());
    }

    #[test]
    fn test_escape_restores_moved_element() {
        let mut h = Harness::new(ToolKind::Selection);
        h.draw_rect(10.0, 10.0, 20.0, 20.0);
        h.down(15.0, 15.0);
        h.drag(100.0, 100.0);
        h.key("Escape", Modifiers::default());
        assert_eq!(h.store.elements()[0].coords(), Coords::new(10.0, 10.0, 20.0, 20.0));
        assert!(h.up(100.0, 100.0).is_none());
    }
}
