pub mod handler;
pub mod model;

pub use handler::{get_me, login, signup};
