//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, outermost, added in `main`)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is not a layer. Protected handlers take the
//! [`RequireAuth`] extractor.

pub mod auth;
pub mod request_id;

pub use auth::{AuthRejection, RequireAuth};
pub use request_id::request_id_middleware;
