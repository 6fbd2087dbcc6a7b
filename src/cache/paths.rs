// Cache path utilities.
// Maps entity keys to their canonical location under the durable or volatile cache root.

use std::path::{Path, PathBuf};

use crate::config::CacheConfig;
use crate::remote::{AvatarSize, GalleryImageSize, LogoSize, ModId, ModfileId, UserId};

/// Suffix appended to a binary path while its payload is still streaming.
pub const DOWNLOAD_SUFFIX: &str = ".download";

/// Identifies a single cached entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// Directory holding everything cached for a mod.
    Mod { mod_id: ModId },
    ModProfile { mod_id: ModId },
    /// Modfile metadata record.
    Modfile { mod_id: ModId, modfile_id: ModfileId },
    /// Modfile zip payload.
    ModBinary { mod_id: ModId, modfile_id: ModfileId },
    Logo { mod_id: ModId, size: LogoSize },
    LogoVersionIndex { mod_id: ModId },
    GalleryImage {
        mod_id: ModId,
        file_name_stem: String,
        size: GalleryImageSize,
    },
    Team { mod_id: ModId },
    User { user_id: UserId },
    UserAvatar { user_id: UserId, size: AvatarSize },
    GameProfile,
    AuthState,
}

/// Path construction rooted at a [`CacheConfig`].
///
/// Every function here is pure; nothing touches the file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    root: PathBuf,
    image_root: PathBuf,
}

impl CachePaths {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            root: config.root.clone(),
            image_root: config.image_root.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image_root(&self) -> &Path {
        &self.image_root
    }

    pub(crate) fn set_root(&mut self, root: PathBuf) {
        self.root = root;
    }

    pub(crate) fn set_image_root(&mut self, image_root: PathBuf) {
        self.image_root = image_root;
    }

    /// Canonical path of an entity.
    pub fn resolve(&self, key: &EntityKey) -> PathBuf {
        match key {
            EntityKey::Mod { mod_id } => self.mod_dir(*mod_id),
            EntityKey::ModProfile { mod_id } => self.mod_profile_path(*mod_id),
            EntityKey::Modfile { mod_id, modfile_id } => self.modfile_path(*mod_id, *modfile_id),
            EntityKey::ModBinary { mod_id, modfile_id } => self.binary_path(*mod_id, *modfile_id),
            EntityKey::Logo { mod_id, size } => self.logo_path(*mod_id, *size),
            EntityKey::LogoVersionIndex { mod_id } => self.logo_version_path(*mod_id),
            EntityKey::GalleryImage {
                mod_id,
                file_name_stem,
                size,
            } => self.gallery_image_path(*mod_id, file_name_stem, *size),
            EntityKey::Team { mod_id } => self.team_path(*mod_id),
            EntityKey::User { user_id } => self.user_path(*user_id),
            EntityKey::UserAvatar { user_id, size } => self.avatar_path(*user_id, *size),
            EntityKey::GameProfile => self.game_profile_path(),
            EntityKey::AuthState => self.auth_state_path(),
        }
    }

    /// Path to the game profile.
    pub fn game_profile_path(&self) -> PathBuf {
        self.root.join("game_profile.data")
    }

    /// Path to the authenticated user's state.
    pub fn auth_state_path(&self) -> PathBuf {
        self.root.join("user.data")
    }

    /// Directory containing one subdirectory per cached mod.
    pub fn mods_dir(&self) -> PathBuf {
        self.root.join("mods")
    }

    /// Path to a mod's directory.
    pub fn mod_dir(&self, mod_id: ModId) -> PathBuf {
        self.mods_dir().join(mod_id.to_string())
    }

    /// Path to a mod's profile.
    pub fn mod_profile_path(&self, mod_id: ModId) -> PathBuf {
        self.mod_dir(mod_id).join("profile.data")
    }

    /// Path to a mod's team list.
    pub fn team_path(&self, mod_id: ModId) -> PathBuf {
        self.mod_dir(mod_id).join("team.data")
    }

    /// Directory holding modfile metadata and payloads for a mod.
    pub fn binaries_dir(&self, mod_id: ModId) -> PathBuf {
        self.mod_dir(mod_id).join("binaries")
    }

    /// Path to a modfile's metadata.
    pub fn modfile_path(&self, mod_id: ModId, modfile_id: ModfileId) -> PathBuf {
        self.binaries_dir(mod_id).join(format!("{}.data", modfile_id))
    }

    /// Path to a modfile's zip payload.
    pub fn binary_path(&self, mod_id: ModId, modfile_id: ModfileId) -> PathBuf {
        self.binaries_dir(mod_id).join(format!("{}.zip", modfile_id))
    }

    /// Path of the in-progress download for a modfile payload.
    pub fn binary_download_path(&self, mod_id: ModId, modfile_id: ModfileId) -> PathBuf {
        download_path(&self.binary_path(mod_id, modfile_id))
    }

    /// Directory of a mod's logo renditions.
    pub fn logo_dir(&self, mod_id: ModId) -> PathBuf {
        self.mod_dir(mod_id).join("logo")
    }

    /// Path to one logo rendition.
    pub fn logo_path(&self, mod_id: ModId, size: LogoSize) -> PathBuf {
        self.logo_dir(mod_id).join(format!("{}.png", size.as_str()))
    }

    /// Path to the size -> source file name index of a mod's logo.
    pub fn logo_version_path(&self, mod_id: ModId) -> PathBuf {
        self.logo_dir(mod_id).join("versionInfo.data")
    }

    /// Path to a gallery image, under the volatile image root.
    pub fn gallery_image_path(
        &self,
        mod_id: ModId,
        file_name_stem: &str,
        size: GalleryImageSize,
    ) -> PathBuf {
        self.image_root
            .join("mod_images")
            .join(mod_id.to_string())
            .join(size.as_str())
            .join(format!("{}.png", escape_segment(file_name_stem)))
    }

    /// Directory containing one subdirectory per cached user.
    pub fn users_dir(&self) -> PathBuf {
        self.root.join("users")
    }

    /// Path to a user's directory.
    pub fn user_dir(&self, user_id: UserId) -> PathBuf {
        self.users_dir().join(user_id.to_string())
    }

    /// Path to a user's profile.
    pub fn user_path(&self, user_id: UserId) -> PathBuf {
        self.user_dir(user_id).join("profile.data")
    }

    /// Path to one avatar rendition of a user.
    pub fn avatar_path(&self, user_id: UserId, size: AvatarSize) -> PathBuf {
        self.user_dir(user_id)
            .join("avatar")
            .join(format!("{}.png", size.as_str()))
    }
}

/// Temporary sibling of `path` used while a download streams.
pub fn download_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(DOWNLOAD_SUFFIX);
    PathBuf::from(name)
}

/// Escape a name for use as a single path segment.
/// Reserved characters and `%` itself become `%XX`, so distinct names stay distinct.
fn escape_segment(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%' => {
                escaped.push_str(&format!("%{:02X}", c as u32));
            }
            _ => escaped.push(c),
        }
    }
    if escaped.is_empty() {
        "%00".to_string()
    } else if escaped == "." || escaped == ".." {
        escaped.replace('.', "%2E")
    } else {
        escaped
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn paths() -> CachePaths {
        CachePaths::new(&CacheConfig::new("/cache", "/images"))
    }

    fn mod_id(v: i64) -> ModId {
        ModId::new(v).unwrap()
    }

    fn modfile_id(v: i64) -> ModfileId {
        ModfileId::new(v).unwrap()
    }

    #[test]
    fn test_escape_segment() {
        assert_eq!(escape_segment("simple"), "simple");
        assert_eq!(escape_segment("with/slash"), "with%2Fslash");
        assert_eq!(escape_segment("100%"), "100%25");
        assert_ne!(escape_segment("a/b"), escape_segment("a%2Fb"));
        assert_eq!(escape_segment(".."), "%2E%2E");
        assert_eq!(escape_segment(""), "%00");
    }

    #[test]
    fn test_cache_paths() {
        let paths = paths();
        let m = mod_id(7);
        let f = modfile_id(42);

        assert_eq!(paths.mod_dir(m), PathBuf::from("/cache/mods/7"));
        assert!(paths.mod_profile_path(m).ends_with("mods/7/profile.data"));
        assert!(paths.modfile_path(m, f).ends_with("mods/7/binaries/42.data"));
        assert!(paths.binary_path(m, f).ends_with("mods/7/binaries/42.zip"));
        assert!(
            paths
                .binary_download_path(m, f)
                .ends_with("mods/7/binaries/42.zip.download")
        );
        assert!(
            paths
                .logo_path(m, LogoSize::Thumbnail320x180)
                .ends_with("mods/7/logo/thumb_320x180.png")
        );
        assert!(paths.logo_version_path(m).ends_with("mods/7/logo/versionInfo.data"));
        assert!(paths.team_path(m).ends_with("mods/7/team.data"));
        assert!(
            paths
                .user_path(UserId::new(3).unwrap())
                .ends_with("users/3/profile.data")
        );
    }

    #[test]
    fn test_gallery_images_use_volatile_root() {
        let path = paths().gallery_image_path(mod_id(7), "shot_01", GalleryImageSize::Original);
        assert_eq!(
            path,
            PathBuf::from("/images/mod_images/7/original/shot_01.png")
        );
        assert!(!path.starts_with("/cache"));
    }

    #[test]
    fn test_resolve_matches_helpers_and_is_stable() {
        let paths = paths();
        let key = EntityKey::Modfile {
            mod_id: mod_id(7),
            modfile_id: modfile_id(42),
        };
        assert_eq!(paths.resolve(&key), paths.modfile_path(mod_id(7), modfile_id(42)));
        assert_eq!(paths.resolve(&key), paths.clone().resolve(&key.clone()));
    }

    #[test]
    fn test_resolve_is_injective_per_variant() {
        let paths = paths();
        let mut seen = HashSet::new();
        for m in 1..=12 {
            for f in 1..=12 {
                let key = EntityKey::Modfile {
                    mod_id: mod_id(m),
                    modfile_id: modfile_id(f),
                };
                assert!(seen.insert(paths.resolve(&key)));
            }
            for size in LogoSize::ALL {
                let key = EntityKey::Logo {
                    mod_id: mod_id(m),
                    size,
                };
                assert!(seen.insert(paths.resolve(&key)));
            }
            for stem in ["a", "a/b", "a_b", "a%2Fb"] {
                let key = EntityKey::GalleryImage {
                    mod_id: mod_id(m),
                    file_name_stem: stem.to_string(),
                    size: GalleryImageSize::Thumbnail320x180,
                };
                assert!(seen.insert(paths.resolve(&key)));
            }
        }
    }
}
