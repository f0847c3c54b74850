//! tokenkeeper-http - reqwest-backed transport.

mod transport;

pub use transport::ReqwestTransport;
