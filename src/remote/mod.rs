// Remote API module.
// Record types, the remote-fetch interface, and an HTTP implementation of it.

pub mod client;
pub mod endpoints;
pub mod fetch;
pub mod types;

pub use client::HttpRemote;
pub use fetch::{BinaryBody, ByteStream, MetadataRequest, RemoteFetch};
pub use types::*;
