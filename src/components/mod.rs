pub mod capture;
pub mod colors;
pub mod drawing;
pub mod stickers;
