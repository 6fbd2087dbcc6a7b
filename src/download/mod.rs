// Download module.
// Asynchronous fetches of binaries, images, and metadata with exactly-once result delivery.

pub mod handle;
pub mod orchestrator;

pub use handle::{DownloadHandle, DownloadStatus, Outcome};
pub use orchestrator::{DownloadOrchestrator, ImageRequest, ImageTarget};
