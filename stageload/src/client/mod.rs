//! HTTP collaborator for virtual users
//!
//! This module provides:
//! - `RequestExecutor` trait abstracting "perform one unit of work"
//! - `HttpExecutor` issuing GET requests with reqwest
//! - `TransportError` for requests that never produced a response

mod http;
mod service;
mod types;

pub use http::HttpExecutor;
pub use service::RequestExecutor;
pub use types::TransportError;
