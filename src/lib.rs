//! dohrelay - relays classic DNS queries to a DNS-over-HTTPS JSON API.
//!
//! The library exposes the translation core and transports for testing and
//! benchmarking.

pub mod bootstrap;
pub mod config;
pub mod doh;
pub mod error;
pub mod handler;
pub mod proxy;
pub mod stats;
pub mod transport;
pub mod upstream;
pub mod validate;
