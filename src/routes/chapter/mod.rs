pub mod handler;
pub mod model;

pub use handler::{get_chapter_by_id, get_chapters, upload_chapters};
