pub mod commands;
pub mod controller;
pub mod editor;
pub mod error;

pub use commands::CommandStack;
pub use controller::{Align, Controller, Properties};
pub use editor::Editor;
pub use error::{EditorError, EditorResult};
