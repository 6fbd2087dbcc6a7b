// Download orchestration.
// Starts remote fetches on the Tokio runtime, streams binaries to disk, and commits results into the cache.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::cache::paths::download_path;
use crate::cache::{JsonSerializer, ResourceCache, Serializer, store};
use crate::error::{CacheError, DownloadError, TransportError};
use crate::remote::{
    AvatarSize, BinaryBody, GalleryImageSize, LogoSize, MetadataRequest, ModId, ModProfile,
    ModfileId, RemoteFetch, UserId,
};

use super::handle::{Completion, DownloadHandle, DownloadStatus};

/// Where a fetched image is written once it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget {
    /// Logo rendition; the URL's file name becomes its version in the logo index.
    Logo { mod_id: ModId, size: LogoSize },
    GalleryImage {
        mod_id: ModId,
        file_name_stem: String,
        size: GalleryImageSize,
    },
    UserAvatar { user_id: UserId, size: AvatarSize },
    /// Deliver the bytes without caching them.
    Uncached,
}

/// Describes an image to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub url: String,
    pub target: ImageTarget,
}

impl ImageRequest {
    pub fn new(url: impl Into<String>, target: ImageTarget) -> Self {
        Self {
            url: url.into(),
            target,
        }
    }
}

type BinaryKey = (ModId, ModfileId);

const MAX_PREALLOCATION: u64 = 1 << 20;

/// Issues downloads and delivers their results through [`DownloadHandle`]s.
///
/// Every `begin_*` call returns immediately and must be made from within a Tokio
/// runtime; the work runs as one spawned task per download. Downloads share nothing
/// but the cache directory tree. The one exception is a binary download requested
/// while the same modfile is already in flight, which joins the existing download
/// instead of racing it on the same temporary file.
pub struct DownloadOrchestrator<S = JsonSerializer> {
    remote: Arc<dyn RemoteFetch>,
    cache: Arc<ResourceCache<S>>,
    in_flight: Arc<Mutex<HashMap<BinaryKey, DownloadHandle<PathBuf>>>>,
}

impl<S> Clone for DownloadOrchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            cache: Arc::clone(&self.cache),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<S: Serializer> fmt::Debug for DownloadOrchestrator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOrchestrator")
            .field("cache_root", &self.cache.paths().root())
            .finish_non_exhaustive()
    }
}

impl<S: Serializer + 'static> DownloadOrchestrator<S> {
    pub fn new(remote: Arc<dyn RemoteFetch>, cache: Arc<ResourceCache<S>>) -> Self {
        Self {
            remote,
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &Arc<ResourceCache<S>> {
        &self.cache
    }

    /// Download a modfile's payload into the cache.
    ///
    /// The modfile record is resolved and saved first, then the payload streams to
    /// `<binary>.zip.download` and is renamed over the final path only once complete.
    /// A failed or interrupted download never touches a previously committed payload.
    /// On success the handle yields the committed path.
    pub fn begin_binary_download(
        &self,
        mod_id: ModId,
        modfile_id: ModfileId,
    ) -> DownloadHandle<PathBuf> {
        let key = (mod_id, modfile_id);
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = in_flight.get(&key)
            && !existing.is_done()
        {
            tracing::debug!(%mod_id, %modfile_id, "Joining in-flight binary download");
            return existing.clone();
        }

        let (handle, completion) = DownloadHandle::pending();
        in_flight.insert(key, handle.clone());
        drop(in_flight);

        let remote = Arc::clone(&self.remote);
        let cache = Arc::clone(&self.cache);
        let registry = Arc::clone(&self.in_flight);
        tokio::spawn(async move {
            let result =
                run_binary_download(remote.as_ref(), &cache, mod_id, modfile_id, &completion)
                    .await;
            match &result {
                Ok(path) => {
                    tracing::info!(%mod_id, %modfile_id, path = %path.display(), "Binary download committed")
                }
                Err(e) => {
                    tracing::error!(%mod_id, %modfile_id, error = %e, "Binary download failed")
                }
            }
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
            completion.complete(result);
        });

        handle
    }

    /// Fetch an image into memory, writing it through to the cache when it has a target.
    ///
    /// A failed cache write is logged but does not fail the handle; the bytes are
    /// still delivered.
    pub fn begin_image_download(&self, request: ImageRequest) -> DownloadHandle<Vec<u8>> {
        let (handle, completion) = DownloadHandle::pending();
        let remote = Arc::clone(&self.remote);
        let cache = Arc::clone(&self.cache);

        tokio::spawn(async move {
            let result = fetch_to_memory(remote.as_ref(), &request.url).await;
            match &result {
                Ok(bytes) => store_image(&cache, &request, bytes),
                Err(e) => tracing::error!(url = %request.url, error = %e, "Image download failed"),
            }
            completion.complete(result);
        });

        handle
    }

    /// Fetch and decode a metadata record.
    pub fn begin_metadata_fetch<T>(&self, request: MetadataRequest) -> DownloadHandle<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let (handle, completion) = DownloadHandle::pending();
        let remote = Arc::clone(&self.remote);

        tokio::spawn(async move {
            let result = fetch_record(remote.as_ref(), &request).await;
            if let Err(e) = &result {
                tracing::error!(endpoint = %request.endpoint, error = %e, "Metadata fetch failed");
            }
            completion.complete(result);
        });

        handle
    }

    /// Fetch a mod profile and save it to the cache before notifying observers.
    pub fn begin_mod_profile_fetch(&self, request: MetadataRequest) -> DownloadHandle<ModProfile> {
        let (handle, completion) = DownloadHandle::pending();
        let remote = Arc::clone(&self.remote);
        let cache = Arc::clone(&self.cache);

        tokio::spawn(async move {
            let result = fetch_record::<ModProfile>(remote.as_ref(), &request).await;
            match &result {
                Ok(profile) => {
                    // Logged inside the cache; the fetched profile is still good.
                    let _ = cache.save_mod_profile(profile);
                }
                Err(e) => {
                    tracing::error!(endpoint = %request.endpoint, error = %e, "Mod profile fetch failed")
                }
            }
            completion.complete(result);
        });

        handle
    }
}

async fn run_binary_download<S: Serializer>(
    remote: &dyn RemoteFetch,
    cache: &ResourceCache<S>,
    mod_id: ModId,
    modfile_id: ModfileId,
    completion: &Completion<PathBuf>,
) -> Result<PathBuf, DownloadError> {
    let modfile = remote.resolve_modfile(mod_id, modfile_id).await?;

    // Metadata and payload are separate artifacts; a metadata-only entry still tells
    // callers which version a re-download would fetch.
    if let Err(e) = cache.save_modfile(&modfile) {
        tracing::warn!(%mod_id, %modfile_id, error = %e, "Modfile metadata not cached");
    }

    let final_path = cache.binary_path(mod_id, modfile_id);
    let temp_path = download_path(&final_path);

    let body = remote.fetch_binary(&modfile.download.binary_url).await?;
    completion.set_status(DownloadStatus::Fetching {
        temp_path: temp_path.clone(),
        bytes_received: 0,
        total_bytes: body.content_length.or(Some(modfile.filesize)),
    });
    tracing::debug!(%mod_id, %modfile_id, path = %temp_path.display(), "Streaming binary");

    if let Err(e) = stream_to_file(&temp_path, body, completion).await {
        discard(&temp_path);
        return Err(e);
    }

    completion.set_status(DownloadStatus::Committing);
    if let Err(e) = store::replace(&temp_path, &final_path) {
        discard(&temp_path);
        return Err(local_io(e, &final_path));
    }

    Ok(final_path)
}

/// Write every chunk of `body` to `path`, reporting progress as it goes.
async fn stream_to_file(
    path: &Path,
    mut body: BinaryBody,
    completion: &Completion<PathBuf>,
) -> Result<(), DownloadError> {
    store::ensure_parent(path).map_err(|e| local_io(e, path))?;
    let mut file = File::create(path)
        .await
        .map_err(|e| DownloadError::local_io(path, e))?;

    let mut received: u64 = 0;
    while let Some(chunk) = body.stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::local_io(path, e))?;
        received += chunk.len() as u64;
        completion.record_progress(received);
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::local_io(path, e))?;
    file.sync_all()
        .await
        .map_err(|e| DownloadError::local_io(path, e))?;
    Ok(())
}

async fn fetch_to_memory(remote: &dyn RemoteFetch, url: &str) -> Result<Vec<u8>, DownloadError> {
    let mut body = remote.fetch_binary(url).await?;
    // The declared length is untrusted; reserve at most MAX_PREALLOCATION and grow from there.
    let hint = body.content_length.unwrap_or(0).min(MAX_PREALLOCATION);
    let mut bytes = Vec::with_capacity(usize::try_from(hint).unwrap_or(0));
    while let Some(chunk) = body.stream.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    Ok(bytes)
}

async fn fetch_record<T: DeserializeOwned>(
    remote: &dyn RemoteFetch,
    request: &MetadataRequest,
) -> Result<T, DownloadError> {
    let value = remote.fetch_metadata(request).await?;
    serde_json::from_value(value).map_err(|e| {
        DownloadError::Transport(TransportError::new(
            None,
            format!("Invalid response from {}: {}", request.endpoint, e),
        ))
    })
}

fn store_image<S: Serializer>(cache: &ResourceCache<S>, request: &ImageRequest, bytes: &[u8]) {
    let saved = match &request.target {
        ImageTarget::Logo { mod_id, size } => {
            cache.save_logo(*mod_id, *size, source_file_name(&request.url), bytes)
        }
        ImageTarget::GalleryImage {
            mod_id,
            file_name_stem,
            size,
        } => cache.save_gallery_image(*mod_id, file_name_stem, *size, bytes),
        ImageTarget::UserAvatar { user_id, size } => cache.save_avatar(*user_id, *size, bytes),
        ImageTarget::Uncached => Ok(()),
    };
    if let Err(e) = saved {
        tracing::warn!(url = %request.url, error = %e, "Downloaded image not cached");
    }
}

/// Last path segment of a URL, without query string or fragment.
fn source_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// Remove a leftover temporary file, logging rather than failing.
fn discard(path: &Path) {
    if let Err(e) = store::delete(path) {
        tracing::warn!(error = %e, "Failed to remove partial download");
    }
}

fn local_io(error: CacheError, path: &Path) -> DownloadError {
    match error {
        CacheError::Io { path, source } => DownloadError::LocalIo { path, source },
        other => DownloadError::local_io(path, io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use futures::stream;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    use super::*;
    use crate::config::CacheConfig;
    use crate::remote::{Modfile, ModfileDownload};

    const BINARY_URL: &str = "https://cdn.example.invalid/mods/7/files/42/build.zip";

    /// Scripted remote: serves fixed bodies per URL and fixed JSON per endpoint.
    #[derive(Default)]
    struct MockRemote {
        binaries: Mutex<HashMap<String, Vec<Result<Bytes, TransportError>>>>,
        metadata: HashMap<String, serde_json::Value>,
        resolve_error: Option<TransportError>,
        resolve_calls: AtomicUsize,
        /// Length the server claims for every binary body.
        content_length: Option<u64>,
        /// When set, binary fetches wait for a notification before answering.
        gate: Option<Arc<Notify>>,
    }

    impl MockRemote {
        fn serve(&self, url: &str, chunks: Vec<Result<Bytes, TransportError>>) {
            self.binaries.lock().unwrap().insert(url.to_string(), chunks);
        }
    }

    #[async_trait]
    impl RemoteFetch for MockRemote {
        async fn fetch_metadata(
            &self,
            request: &MetadataRequest,
        ) -> Result<serde_json::Value, TransportError> {
            self.metadata
                .get(&request.endpoint)
                .cloned()
                .ok_or_else(|| TransportError::new(Some(404), "Not found"))
        }

        async fn fetch_binary(&self, url: &str) -> Result<BinaryBody, TransportError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let chunks = self
                .binaries
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| TransportError::new(Some(404), "No such file"))?;
            Ok(BinaryBody {
                content_length: self.content_length,
                stream: stream::iter(chunks).boxed(),
            })
        }

        async fn resolve_modfile(
            &self,
            mod_id: ModId,
            modfile_id: ModfileId,
        ) -> Result<Modfile, TransportError> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = &self.resolve_error {
                return Err(e.clone());
            }
            Ok(modfile(mod_id, modfile_id))
        }
    }

    fn modfile(mod_id: ModId, modfile_id: ModfileId) -> Modfile {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        Modfile {
            id: modfile_id,
            mod_id,
            date_added: at,
            filename: "build.zip".to_string(),
            filesize: 9,
            version: None,
            changelog: None,
            filehash: None,
            download: ModfileDownload {
                binary_url: BINARY_URL.to_string(),
                date_expires: at,
            },
        }
    }

    fn ids() -> (ModId, ModfileId) {
        (ModId::new(7).unwrap(), ModfileId::new(42).unwrap())
    }

    fn chunks(parts: &[&'static [u8]]) -> Vec<Result<Bytes, TransportError>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p))).collect()
    }

    fn setup(remote: MockRemote) -> (TempDir, Arc<MockRemote>, DownloadOrchestrator) {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResourceCache::open(&CacheConfig::under(temp_dir.path())).unwrap();
        let remote = Arc::new(remote);
        let orchestrator = DownloadOrchestrator::new(remote.clone(), Arc::new(cache));
        (temp_dir, remote, orchestrator)
    }

    #[tokio::test]
    async fn test_binary_download_commits_payload_and_metadata() {
        let remote = MockRemote::default();
        remote.serve(BINARY_URL, chunks(&[b"PK\x03", b"\x04rest"]));
        let (_dir, _remote, orchestrator) = setup(remote);
        let (m, f) = ids();

        let successes = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&successes);
        let handle = orchestrator.begin_binary_download(m, f);
        handle
            .on_success(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .on_failure(|e| panic!("unexpected failure: {e}"));

        let outcome = handle.wait().await;
        let path = outcome.as_ref().as_ref().unwrap();

        let cache = orchestrator.cache();
        assert_eq!(path, &cache.binary_path(m, f));
        assert_eq!(std::fs::read(path).unwrap(), b"PK\x03\x04rest");
        assert!(!download_path(path).exists());
        assert_eq!(cache.load_modfile(m, f), Some(modfile(m, f)));
        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(handle.status(), DownloadStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_resolve_failure_reports_transport_error() {
        let remote = MockRemote {
            resolve_error: Some(TransportError::new(Some(403), "Forbidden")),
            ..Default::default()
        };
        let (_dir, _remote, orchestrator) = setup(remote);
        let (m, f) = ids();

        let outcome = orchestrator.begin_binary_download(m, f).wait().await;

        match outcome.as_ref() {
            Err(DownloadError::Transport(e)) => assert_eq!(e.status, Some(403)),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(orchestrator.cache().load_modfile(m, f), None);
    }

    #[tokio::test]
    async fn test_interrupted_download_keeps_committed_artifact() {
        let remote = MockRemote::default();
        let (_dir, remote, orchestrator) = setup(remote);
        let (m, f) = ids();
        let cache = orchestrator.cache();
        cache.save_binary_zip(m, f, b"previous").unwrap();

        // Every byte arrives, then the transport fails before the commit.
        let mut broken = chunks(&[b"new ", b"payload"]);
        broken.push(Err(TransportError::new(None, "connection reset")));
        remote.serve(BINARY_URL, broken);

        let failures = Arc::new(AtomicUsize::new(0));
        let fl = Arc::clone(&failures);
        let handle = orchestrator.begin_binary_download(m, f);
        handle.on_failure(move |_| {
            fl.fetch_add(1, Ordering::SeqCst);
        });
        let outcome = handle.wait().await;

        assert!(matches!(outcome.as_ref(), Err(DownloadError::Transport(_))));
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert_eq!(cache.load_binary_zip(m, f), Some(b"previous".to_vec()));
        assert!(!cache.paths().binary_download_path(m, f).exists());
        // Metadata was persisted even though the payload never committed.
        assert!(cache.load_modfile(m, f).is_some());

        remote.serve(BINARY_URL, chunks(&[b"fresh"]));
        let outcome = orchestrator.begin_binary_download(m, f).wait().await;
        assert!(outcome.is_ok());
        assert_eq!(cache.load_binary_zip(m, f), Some(b"fresh".to_vec()));
    }

    #[tokio::test]
    async fn test_unwritable_destination_reports_local_io() {
        let remote = MockRemote::default();
        remote.serve(BINARY_URL, chunks(&[b"data"]));
        let (_dir, _remote, orchestrator) = setup(remote);
        let (m, f) = ids();

        // A file where the binaries directory should be blocks every write under it.
        let binaries = orchestrator.cache().paths().binaries_dir(m);
        std::fs::create_dir_all(binaries.parent().unwrap()).unwrap();
        std::fs::write(&binaries, b"in the way").unwrap();

        let outcome = orchestrator.begin_binary_download(m, f).wait().await;

        assert!(matches!(outcome.as_ref(), Err(DownloadError::LocalIo { .. })));
    }

    #[tokio::test]
    async fn test_failed_commit_reports_local_io_and_cleans_up() {
        let remote = MockRemote::default();
        remote.serve(BINARY_URL, chunks(&[b"complete ", b"payload"]));
        let (_dir, _remote, orchestrator) = setup(remote);
        let (m, f) = ids();
        let cache = orchestrator.cache();

        // A non-empty directory at the final path makes the rename fail after streaming.
        let final_path = cache.binary_path(m, f);
        std::fs::create_dir_all(&final_path).unwrap();
        std::fs::write(final_path.join("keep"), b"occupied").unwrap();

        let outcome = orchestrator.begin_binary_download(m, f).wait().await;

        match outcome.as_ref() {
            Err(DownloadError::LocalIo { path, .. }) => assert_eq!(path, &final_path),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!cache.paths().binary_download_path(m, f).exists());
        assert_eq!(std::fs::read(final_path.join("keep")).unwrap(), b"occupied");

        std::fs::remove_dir_all(&final_path).unwrap();
        let outcome = orchestrator.begin_binary_download(m, f).wait().await;
        assert_eq!(outcome.as_ref().as_ref().unwrap(), &final_path);
        assert_eq!(
            cache.load_binary_zip(m, f),
            Some(b"complete payload".to_vec())
        );
    }

    #[tokio::test]
    async fn test_image_download_ignores_oversized_length_hint() {
        let url = "https://cdn.example.invalid/mods/7/images/shot.png";
        for declared in [1u64 << 46, u64::MAX] {
            let remote = MockRemote {
                content_length: Some(declared),
                ..Default::default()
            };
            remote.serve(url, chunks(&[b"abc"]));
            let (_dir, _remote, orchestrator) = setup(remote);

            let outcome = orchestrator
                .begin_image_download(ImageRequest::new(url, ImageTarget::Uncached))
                .wait()
                .await;

            assert_eq!(outcome.as_ref().as_ref().unwrap(), b"abc");
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_download() {
        let gate = Arc::new(Notify::new());
        let remote = MockRemote {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        remote.serve(BINARY_URL, chunks(&[b"payload"]));
        let (_dir, remote, orchestrator) = setup(remote);
        let (m, f) = ids();

        let first = orchestrator.begin_binary_download(m, f);
        let second = orchestrator.begin_binary_download(m, f);
        gate.notify_one();

        let (a, b) = tokio::join!(first.wait(), second.wait());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(remote.resolve_calls.load(Ordering::SeqCst), 1);

        // Once finished, a new request starts a fresh download.
        gate.notify_one();
        let third = orchestrator.begin_binary_download(m, f).wait().await;
        assert!(third.is_ok());
        assert_eq!(remote.resolve_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_logo_download_writes_through_with_version() {
        let url = "https://cdn.example.invalid/mods/7/logo/thumb_320x180/logo_v3.png?sig=abc";
        let remote = MockRemote::default();
        remote.serve(url, chunks(&[b"\x89PNG", b"data"]));
        let (_dir, _remote, orchestrator) = setup(remote);
        let m = ModId::new(7).unwrap();

        let handle = orchestrator.begin_image_download(ImageRequest::new(
            url,
            ImageTarget::Logo {
                mod_id: m,
                size: LogoSize::Thumbnail320x180,
            },
        ));
        let outcome = handle.wait().await;

        assert_eq!(outcome.as_ref().as_ref().unwrap(), b"\x89PNGdata");
        let cache = orchestrator.cache();
        assert_eq!(
            cache.load_logo(m, LogoSize::Thumbnail320x180),
            Some(b"\x89PNGdata".to_vec())
        );
        assert_eq!(
            cache.logo_version(m, LogoSize::Thumbnail320x180).as_deref(),
            Some("logo_v3.png")
        );
    }

    #[tokio::test]
    async fn test_image_failure_reaches_failure_observer() {
        let (_dir, _remote, orchestrator) = setup(MockRemote::default());

        let handle = orchestrator.begin_image_download(ImageRequest::new(
            "https://cdn.example.invalid/missing.png",
            ImageTarget::Uncached,
        ));
        let outcome = handle.wait().await;

        match outcome.as_ref() {
            Err(DownloadError::Transport(e)) => assert_eq!(e.status, Some(404)),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mod_profile_fetch_saves_profile() {
        let endpoint = "/games/34/mods/7";
        let mut remote = MockRemote::default();
        remote.metadata.insert(
            endpoint.to_string(),
            serde_json::json!({
                "id": 7,
                "name": "Mod 7",
                "name_id": "mod-7",
                "submitted_by": 3,
                "date_added": "2024-05-01T00:00:00Z",
                "date_updated": "2024-05-02T00:00:00Z"
            }),
        );
        remote
            .metadata
            .insert("/broken".to_string(), serde_json::json!({ "id": 0 }));
        let (_dir, _remote, orchestrator) = setup(remote);

        let outcome = orchestrator
            .begin_mod_profile_fetch(MetadataRequest::new(endpoint))
            .wait()
            .await;
        let profile = outcome.as_ref().as_ref().unwrap();

        let m = ModId::new(7).unwrap();
        assert_eq!(orchestrator.cache().load_mod_profile(m).as_ref(), Some(profile));

        let broken = orchestrator
            .begin_metadata_fetch::<ModProfile>(MetadataRequest::new("/broken"))
            .wait()
            .await;
        assert!(matches!(broken.as_ref(), Err(DownloadError::Transport(_))));
    }

    #[test]
    fn test_source_file_name() {
        assert_eq!(source_file_name("https://x/a/b/logo.png"), "logo.png");
        assert_eq!(source_file_name("https://x/a/logo.png?v=2#top"), "logo.png");
        assert_eq!(source_file_name("logo.png"), "logo.png");
    }
}
