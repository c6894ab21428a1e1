//! A small authoritative DNS server that answers `A` queries from a table of known systems.
//!
//! The interesting part is the [`packet`] module, a strict codec for the subset of the DNS wire
//! format this server speaks. [`server`] wires it up to a UDP socket and an [`AddressResolver`].
//!
//! [`AddressResolver`]: resolver::AddressResolver

mod hex;
mod num;

pub mod config;
pub mod packet;
pub mod resolver;
pub mod server;

pub use packet::Error;

/// Size of unicast DNS message buffers.
///
/// Unicast DNS messages are limited to 512 Bytes.
pub const DNS_BUFFER_SIZE: usize = 512;

/// The well-known DNS port.
pub const DNS_PORT: u16 = 53;
