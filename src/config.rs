// Configuration for the cache and the remote API.
// Resolves cache directories from the platform layout or environment overrides.

use std::env;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

const DEFAULT_API_URL: &str = "https://api.mod.io/v1";

/// Locations of the durable cache and the volatile image cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Durable cache root: profiles, modfiles, binaries, logos, users, auth state.
    pub root: PathBuf,
    /// Purgeable root for gallery images.
    pub image_root: PathBuf,
}

impl CacheConfig {
    pub fn new(root: impl Into<PathBuf>, image_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            image_root: image_root.into(),
        }
    }

    /// Platform cache directory (~/.cache/modcache on Linux) with images under the OS temp dir.
    pub fn from_project_dirs() -> Option<Self> {
        let dirs = ProjectDirs::from("", "", "modcache")?;
        Some(Self::new(dirs.cache_dir(), default_image_root()))
    }

    /// Like [`from_project_dirs`](Self::from_project_dirs), honouring
    /// `MODCACHE_DIR` and `MODCACHE_IMAGE_DIR` when set.
    pub fn from_env() -> Option<Self> {
        let root = match env::var_os("MODCACHE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("", "", "modcache")?.cache_dir().to_path_buf(),
        };
        let image_root = env::var_os("MODCACHE_IMAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_image_root);
        Some(Self::new(root, image_root))
    }

    /// Config with both roots placed under a single directory.
    pub fn under(base: &Path) -> Self {
        Self::new(base.join("cache"), base.join("images"))
    }
}

fn default_image_root() -> PathBuf {
    env::temp_dir().join("modcache").join("images")
}

/// Settings for the bundled HTTP remote.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub game_id: u32,
    pub api_key: String,
    /// Bearer token of the authenticated user, if any.
    pub oauth_token: Option<String>,
}

impl ApiConfig {
    pub fn new(game_id: u32, api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            game_id,
            api_key: api_key.into(),
            oauth_token: None,
        }
    }

    /// Read `MODCACHE_GAME_ID`, `MODCACHE_API_KEY`, and the optional
    /// `MODCACHE_API_URL` / `MODCACHE_OAUTH_TOKEN`.
    pub fn from_env() -> Option<Self> {
        let game_id = env::var("MODCACHE_GAME_ID").ok()?.parse().ok()?;
        let api_key = env::var("MODCACHE_API_KEY").ok()?;
        let mut config = Self::new(game_id, api_key);
        if let Ok(url) = env::var("MODCACHE_API_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        config.oauth_token = env::var("MODCACHE_OAUTH_TOKEN").ok();
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_places_roots_side_by_side() {
        let config = CacheConfig::under(Path::new("/tmp/base"));
        assert_eq!(config.root, PathBuf::from("/tmp/base/cache"));
        assert_eq!(config.image_root, PathBuf::from("/tmp/base/images"));
    }

    #[test]
    fn test_api_config_defaults() {
        let config = ApiConfig::new(34, "key");
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert!(config.oauth_token.is_none());
    }
}
