//! Layered raster drawing engine: pixel surfaces, a layer stack with a
//! compositor, per-layer snapshot undo/redo, a pointer-gesture stroke engine
//! and PNG export.  Headless; a UI shell feeds it pointer and key events and
//! displays [`Project::frame`].

// Logger must be declared first so its macros are visible to every module.
#[macro_use]
pub mod logger;

pub mod canvas;
pub mod components;
pub mod io;
pub mod keybindings;
pub mod ops;
pub mod project;
pub mod settings;

pub use canvas::{Layer, LayerId, LayerStack, PixelSurface, Point};
pub use components::history::{HistoryManager, HistoryOp, HistoryRequest};
pub use components::tools::{PenVariant, StrokeEngine, Tool, ToolProperties};
pub use io::{EncodedImage, ExportedImage, SnapshotError};
pub use keybindings::{BindableAction, KeyBindings, KeyCombo};
pub use ops::shapes::ShapeKind;
pub use project::{Axis, Project, ResizeSource};
pub use settings::{EngineSettings, ThemeMode};
