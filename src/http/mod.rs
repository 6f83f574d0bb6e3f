//! HTTP value types exchanged between the browser, the relay and the backend.

mod request;
mod response;

pub use hyper::StatusCode;
pub use request::{Method, RelayRequest};
pub use response::RelayResponse;
