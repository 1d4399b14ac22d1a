//! API client module for PersonaMem.
//!
//! Provides the authenticated request executor, the transport seam it sends
//! through, the typed route helpers and request/response types matching the
//! PersonaMem backend API.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod transport;
pub mod types;


pub use client::ApiClient;
pub use error::ApiError;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use types::{ApiResult, Method, OutgoingRequest};
