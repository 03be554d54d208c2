//! Top-level controller owning all client-side state.
//!
//! The host feeds raw input and polls the connection; the session routes
//! events through the gesture machine and publishes whatever it commits.

use kurbo::Size;

use crate::camera::Camera;
use crate::collaboration::SyncClient;
use crate::element::ElementId;
use crate::error::Result;
use crate::gesture::{GestureContext, GestureMachine, GestureState};
use crate::input::{InputState, KeyEvent, Modifiers, PointerEvent};
use crate::render::{Renderer, TextMeasure, render_elements};
use crate::store::ElementStore;
use crate::sync::{DrawAction, NativeWebSocket, SyncEvent, Transport};
use crate::tools::{CursorHint, ToolKind};

pub struct Session<T: Transport = NativeWebSocket> {
    store: ElementStore,
    camera: Camera,
    input: InputState,
    gesture: GestureMachine,
    sync: Option<SyncClient<T>>,
}

impl Session {
    /// A session that is not connected to any room.
    pub fn new() -> Self {
        Self::offline()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Session<T> {
    pub fn offline() -> Self {
        Self {
            store: ElementStore::new(),
            camera: Camera::new(),
            input: InputState::new(),
            gesture: GestureMachine::new(),
            sync: None,
        }
    }

    pub fn with_sync(client: SyncClient<T>) -> Self {
        Self {
            sync: Some(client),
            ..Self::offline()
        }
    }

    pub fn with_store(mut self, store: ElementStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gesture.state()
    }

    pub fn cursor(&self) -> CursorHint {
        self.gesture.cursor()
    }

    pub fn sync(&self) -> Option<&SyncClient<T>> {
        self.sync.as_ref()
    }

    pub fn sync_mut(&mut self) -> Option<&mut SyncClient<T>> {
        self.sync.as_mut()
    }

    /// The text element awaiting input; hosts overlay an editor on it.
    pub fn writing_target(&self) -> Option<ElementId> {
        self.gesture.writing_target(&self.store)
    }

    pub fn set_viewport(&mut self, size: Size) {
        self.camera.set_viewport(size);
    }

    /// Switch tools, abandoning any gesture in progress.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if !self.gesture.is_idle() {
            self.gesture.cancel(&mut self.store);
        }
        self.store.set_tool(tool);
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.input.set_modifiers(modifiers);
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<DrawAction> {
        self.input.handle_pointer_event(&event);
        let mut ctx = GestureContext {
            store: &mut self.store,
            camera: &mut self.camera,
            input: &self.input,
        };
        let action = self.gesture.handle_pointer(&event, &mut ctx);
        self.publish(action.as_slice());
        action
    }

    pub fn handle_key(&mut self, event: KeyEvent) -> Vec<DrawAction> {
        self.input.handle_key_event(&event);
        let mut ctx = GestureContext {
            store: &mut self.store,
            camera: &mut self.camera,
            input: &self.input,
        };
        let actions = self.gesture.handle_key(&event, &mut ctx);
        self.publish(&actions);
        actions
    }

    /// Finish the text element being written.
    pub fn commit_text(&mut self, text: &str, measure: &dyn TextMeasure) -> Result<Option<DrawAction>> {
        let action = self.gesture.commit_text(text, measure, &mut self.store)?;
        self.publish(action.as_slice());
        Ok(action)
    }

    /// Step back in history and publish the elements that moved.
    pub fn undo(&mut self) -> Vec<DrawAction> {
        let actions = self.gesture.undo(&mut self.store);
        self.publish(&actions);
        actions
    }

    pub fn redo(&mut self) -> Vec<DrawAction> {
        let actions = self.gesture.redo(&mut self.store);
        self.publish(&actions);
        actions
    }

    pub fn delete(&mut self, id: ElementId) -> Option<DrawAction> {
        let action = self.gesture.delete(id, &mut self.store);
        self.publish(action.as_slice());
        action
    }

    /// Back to the unpanned, unzoomed view.
    pub fn reset_view(&mut self) {
        self.camera.reset();
    }

    /// Open the room connection, if this session has one.
    pub fn connect(&mut self) -> Result<()> {
        match self.sync.as_mut() {
            Some(sync) => sync.connect(),
            None => Ok(()),
        }
    }

    /// Process pending room traffic. Call between input events.
    pub fn poll(&mut self) -> Vec<SyncEvent> {
        let Some(sync) = self.sync.as_mut() else {
            return Vec::new();
        };
        let events = sync.poll(&mut self.store);
        // A remote delete may have removed what the gesture holds.
        if self.gesture.state() == GestureState::Writing && self.store.selected_element().is_none() {
            self.gesture.cancel(&mut self.store);
        }
        events
    }

    /// Ask the server for a fresh copy of the room.
    pub fn resync(&mut self) -> Result<()> {
        match self.sync.as_mut() {
            Some(sync) => sync.request_state(),
            None => Ok(()),
        }
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        render_elements(
            renderer,
            self.store.elements(),
            self.camera.transform(),
            self.writing_target(),
        );
    }

    fn publish(&mut self, actions: &[DrawAction]) {
        let Some(sync) = self.sync.as_mut() else {
            return;
        };
        if actions.is_empty() {
            return;
        }
        if !sync.is_joined() {
            log::debug!("Not in a room, keeping {} action(s) local", actions.len());
            return;
        }
        for action in actions {
            if let Err(e) = sync.send_action(action.clone()) {
                log::warn!("Failed to publish {} action: {}", action.kind(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaboration::SyncConfig;
    use crate::element::{Coords, Element, ElementKind};
    use crate::input::MouseButton;
    use crate::render::ApproximateTextMeasure;
    use crate::sync::{ClientMessage, MemoryTransport, ServerMessage};
    use kurbo::{Affine, Point};
    use peniko::Color;

    fn connected_session() -> Session<MemoryTransport> {
        let client = SyncClient::new(MemoryTransport::new(), SyncConfig::new("room", "ada"));
        let mut session = Session::with_sync(client);
        session.connect().unwrap();
        session.poll();
        let sync = session.sync_mut().unwrap();
        sync.transport_mut().push_server_message(ServerMessage::Joined {
            room: "room".to_string(),
            users: vec!["ada".to_string()],
        });
        session.poll();
        session.sync_mut().unwrap().transport_mut().take_sent();
        session
    }

    fn click_drag(session: &mut Session<impl Transport>, from: Point, to: Point) -> Option<DrawAction> {
        session.handle_pointer(PointerEvent::Down { position: from, button: MouseButton::Left });
        session.handle_pointer(PointerEvent::Move { position: to });
        session.handle_pointer(PointerEvent::Up { position: to, button: MouseButton::Left })
    }

    fn sent(session: &mut Session<MemoryTransport>) -> Vec<ClientMessage> {
        session.sync_mut().unwrap().transport_mut().take_sent_messages().unwrap()
    }

    #[test]
    fn test_offline_session_draws() {
        let mut session = Session::new();
        session.set_tool(ToolKind::Circle);
        let action = click_drag(&mut session, Point::new(0.0, 0.0), Point::new(20.0, 20.0));
        assert!(matches!(action, Some(DrawAction::Add { .. })));
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn test_commits_are_published() {
        let mut session = connected_session();
        session.set_tool(ToolKind::Line);
        click_drag(&mut session, Point::new(0.0, 0.0), Point::new(20.0, 10.0));
        let messages = sent(&mut session);
        assert_eq!(messages.len(), 1);
        assert!(matches!(
            &messages[0],
            ClientMessage::DrawAction { room, action: DrawAction::Add { .. } } if room == "room"
        ));

        session.undo();
        assert!(matches!(
            sent(&mut session).as_slice(),
            [ClientMessage::DrawAction { action: DrawAction::Delete { .. }, .. }]
        ));
    }

    #[test]
    fn test_undo_spares_peer_elements() {
        let mut session = connected_session();
        session.set_tool(ToolKind::Rectangle);
        click_drag(&mut session, Point::new(0.0, 0.0), Point::new(20.0, 20.0));
        let mine = session.store().elements()[0].clone();
        sent(&mut session);

        let theirs = Element::new(ElementId::new(77, 0), ElementKind::Circle, Coords::new(50.0, 50.0, 70.0, 70.0));
        session
            .sync_mut()
            .unwrap()
            .transport_mut()
            .push_server_message(ServerMessage::DrawAction { action: DrawAction::Add { element: theirs.clone() } });
        session.poll();

        assert_eq!(session.undo(), vec![DrawAction::Delete { element_id: mine.id }]);
        assert_eq!(
            sent(&mut session),
            vec![ClientMessage::DrawAction {
                room: "room".to_string(),
                action: DrawAction::Delete { element_id: mine.id },
            }]
        );
        assert_eq!(session.store().elements(), std::slice::from_ref(&theirs));

        session.redo();
        assert_eq!(
            sent(&mut session),
            vec![ClientMessage::DrawAction {
                room: "room".to_string(),
                action: DrawAction::Add { element: mine.clone() },
            }]
        );
        assert_eq!(session.store().elements(), &[mine, theirs]);
    }

    #[test]
    fn test_reset_view() {
        let mut session = Session::new();
        session.set_viewport(Size::new(800.0, 600.0));
        session.camera_mut().pan = kurbo::Vec2::new(40.0, -10.0);
        session.camera_mut().zoom_by(1.5);
        session.reset_view();
        assert_eq!(session.camera().transform(), Affine::IDENTITY);
    }

    #[test]
    fn test_in_progress_frames_are_not_published() {
        let mut session = connected_session();
        session.set_tool(ToolKind::Rectangle);
        session.handle_pointer(PointerEvent::Down { position: Point::ZERO, button: MouseButton::Left });
        session.handle_pointer(PointerEvent::Move { position: Point::new(5.0, 5.0) });
        assert!(sent(&mut session).is_empty());
    }

    #[test]
    fn test_text_commit_is_published() {
        let mut session = connected_session();
        session.set_tool(ToolKind::Text);
        session.handle_pointer(PointerEvent::Down { position: Point::new(3.0, 3.0), button: MouseButton::Left });
        assert!(session.writing_target().is_some());
        session.commit_text("hi", &ApproximateTextMeasure::default()).unwrap();
        assert!(session.writing_target().is_none());
        assert_eq!(sent(&mut session).len(), 1);
    }

    #[test]
    fn test_tool_switch_cancels_gesture() {
        let mut session = Session::new();
        session.set_tool(ToolKind::Rectangle);
        session.handle_pointer(PointerEvent::Down { position: Point::ZERO, button: MouseButton::Left });
        session.set_tool(ToolKind::Selection);
        assert_eq!(session.gesture_state(), GestureState::Idle);
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_remote_delete_ends_writing() {
        let mut session = connected_session();
        session.set_tool(ToolKind::Text);
        session.handle_pointer(PointerEvent::Down { position: Point::ZERO, button: MouseButton::Left });
        let id = session.writing_target().unwrap();
        session
            .sync_mut()
            .unwrap()
            .transport_mut()
            .push_server_message(ServerMessage::DrawAction { action: DrawAction::Delete { element_id: id } });
        session.poll();
        assert_eq!(session.gesture_state(), GestureState::Idle);
    }

    #[derive(Default)]
    struct Counter(usize);

    impl Renderer for Counter {
        fn stroke(&mut self, _path: &crate::render::ShapeDescriptor, _color: Color, _width: f64) {
            self.0 += 1;
        }

        fn text(&mut self, _text: &str, _anchor: Point, _font_size: f64, _color: Color) {
            self.0 += 1;
        }

        fn begin_frame(&mut self, transform: Affine) {
            assert_eq!(transform, Affine::IDENTITY);
        }
    }

    #[test]
    fn test_render_skips_text_being_written() {
        let mut session = Session::new();
        session.set_tool(ToolKind::Rectangle);
        click_drag(&mut session, Point::ZERO, Point::new(5.0, 5.0));
        session.set_tool(ToolKind::Text);
        session.handle_pointer(PointerEvent::Down { position: Point::new(50.0, 50.0), button: MouseButton::Left });

        let mut counter = Counter::default();
        session.render(&mut counter);
        assert_eq!(counter.0, 1);
    }
}
