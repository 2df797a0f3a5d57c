pub mod compose;
pub mod export;
pub mod layout;
pub mod share;
pub mod strokes;
pub mod text;
pub mod transform;
