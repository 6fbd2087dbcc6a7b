//! Local resource cache and download orchestration for mod profiles, modfile
//! binaries, images, and authenticated-user state.
//!
//! [`cache::ResourceCache`] owns the on-disk layout under a configurable root and
//! turns any unusable cached data into a miss. [`download::DownloadOrchestrator`]
//! fetches through a [`remote::RemoteFetch`] implementation, streams binaries to a
//! temporary file, and commits them into the cache with a single rename.

pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod remote;

pub use cache::{EntityKey, ResourceCache};
pub use config::{ApiConfig, CacheConfig};
pub use download::{DownloadHandle, DownloadOrchestrator, DownloadStatus, ImageRequest, ImageTarget};
pub use error::{CacheError, DownloadError, Result, TransportError};
pub use remote::{HttpRemote, MetadataRequest, RemoteFetch};
