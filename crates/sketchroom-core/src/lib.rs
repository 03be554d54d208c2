//! SketchRoom Core Library
//!
//! Element model, interaction engine, undo history and sync client for the
//! SketchRoom collaborative drawing surface.

pub mod camera;
pub mod collaboration;
pub mod element;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod history;
pub mod input;
pub mod render;
pub mod selection;
pub mod session;
pub mod store;
pub mod sync;
pub mod tools;

pub use camera::Camera;
pub use collaboration::{SyncClient, SyncConfig};
pub use element::{Coords, Element, ElementId, ElementKind, IdAllocator, SerializableColor};
pub use error::{Error, Result};
pub use gesture::{GestureMachine, GestureState};
pub use history::{Change, History};
pub use hit_test::{Hit, HitPosition};
pub use input::{InputState, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use render::{Renderer, TextMeasure};
pub use selection::{Grip, Selection};
pub use session::Session;
pub use store::{ElementStore, Record};
pub use sync::{
    ClientMessage, ConnectionState, DrawAction, MemoryTransport, NativeWebSocket, ServerMessage,
    SyncEvent, Transport,
};
pub use tools::{CursorHint, ToolKind};
