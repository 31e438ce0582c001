//! Middleware wrapped around the whole storefront application.
//!
//! [`Trace`] runs outermost so the trace id it scopes is visible to the
//! session layer and to every error body rendered below it.

pub mod trace;

pub use trace::Trace;
