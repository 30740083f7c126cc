//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is not a layer: guarded handlers take the [`RequireAuth`]
//! extractor.

pub mod auth;
pub mod request_id;

pub use auth::{GuardDecision, OptionalAuth, RequireAuth, decide, is_local_path, safe_next};
pub use request_id::request_id_middleware;
