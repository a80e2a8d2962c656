pub mod chapter;
pub mod user;
