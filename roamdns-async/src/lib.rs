//! Async version of the `roamdns` server, built on `async-io`.
//!
//! The wire codec and request handling are shared with the synchronous server; only the socket
//! loop differs.

pub mod server;

pub use roamdns::{config, packet, resolver, Error};
