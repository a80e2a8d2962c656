mod auth;
mod error_handler;
mod rate_limit;

pub use auth::{auth_middleware, authorize_admin};
pub use error_handler::log_errors;
pub use rate_limit::{Admission, RateLimiter, rate_limit};
