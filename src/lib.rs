//! Photobooth: capture or upload up to four photos, decorate them on a
//! coloured strip with emoji stickers, freehand ink and a note, then export
//! the composed strip as a PNG to save or share.
//!
//! [`app::Booth`] owns one [`session::Session`] and routes user actions to
//! the components. The compositing pipeline lives in [`ops::export`].

pub mod logger;

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod design;
pub mod io;
pub mod ops;
pub mod session;
pub mod settings;

pub use app::{Booth, Notice, Notifier, ShareOutcome};
pub use ops::export::{ExportError, ExportOptions, ExportRequest, ExportedImage, NotesState, export_strip};
pub use session::{Photo, Session, Step};
pub use settings::BoothSettings;
