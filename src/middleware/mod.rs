pub mod auth;
pub mod error_handling;
pub mod request_log;

pub use auth::{auth_middleware, system_manager_middleware, Claims, JwtService};
pub use error_handling::*;
pub use request_log::request_log_middleware;
