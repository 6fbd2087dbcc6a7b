// Cache module for local filesystem caching.
// Stores mod profiles, modfiles, binaries, images, and user state for reuse without re-fetching.

pub mod object;
pub mod paths;
pub mod resource;
pub mod store;

pub use object::{JsonSerializer, ObjectCache, Serializer};
pub use paths::{CachePaths, DOWNLOAD_SUFFIX, EntityKey};
pub use resource::{LogoVersionIndex, ResourceCache};
