// Resource cache.
// Save, load, delete, and enumerate each kind of cached entity under a configured root.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::remote::{
    AuthState, AvatarSize, GalleryImageSize, GameProfile, LogoSize, ModId, ModProfile,
    ModTeamMember, Modfile, ModfileId, UserId, UserProfile,
};

use super::object::{JsonSerializer, ObjectCache, Serializer};
use super::paths::CachePaths;
use super::store;

/// Size -> source file name of each cached logo rendition.
pub type LogoVersionIndex = BTreeMap<LogoSize, String>;

/// Domain facade over the object cache.
///
/// Loads return `None` on any kind of miss. Saves and deletes return the underlying
/// error after logging it; none of them panic. Each individual write is atomic on disk,
/// but read-modify-write helpers such as [`update_auth_state`](Self::update_auth_state)
/// do not compose across concurrent callers: the last whole-record write wins.
#[derive(Debug, Clone)]
pub struct ResourceCache<S = JsonSerializer> {
    paths: CachePaths,
    objects: ObjectCache<S>,
}

impl ResourceCache<JsonSerializer> {
    /// Open a JSON-encoded cache, creating both roots if needed.
    pub fn open(config: &CacheConfig) -> Result<Self> {
        Self::with_serializer(config, JsonSerializer::default())
    }
}

impl<S: Serializer> ResourceCache<S> {
    pub fn with_serializer(config: &CacheConfig, serializer: S) -> Result<Self> {
        store::ensure_dir(&config.root)?;
        store::ensure_dir(&config.image_root)?;
        Ok(Self {
            paths: CachePaths::new(config),
            objects: ObjectCache::new(serializer),
        })
    }

    pub fn paths(&self) -> &CachePaths {
        &self.paths
    }

    /// Point the cache at a new durable root, creating it if absent.
    ///
    /// On failure the previous root stays active.
    pub fn set_root(&mut self, root: impl Into<PathBuf>) -> Result<()> {
        let root = root.into();
        if let Err(e) = store::ensure_dir(&root) {
            tracing::error!(path = %root.display(), error = %e, "Failed to create cache root; keeping previous root");
            return Err(e);
        }
        tracing::info!(path = %root.display(), "Cache root changed");
        self.paths.set_root(root);
        Ok(())
    }

    /// Point gallery images at a new volatile root, creating it if absent.
    pub fn set_image_root(&mut self, image_root: impl Into<PathBuf>) -> Result<()> {
        let image_root = image_root.into();
        if let Err(e) = store::ensure_dir(&image_root) {
            tracing::error!(path = %image_root.display(), error = %e, "Failed to create image cache root; keeping previous root");
            return Err(e);
        }
        self.paths.set_image_root(image_root);
        Ok(())
    }

    pub fn save_game_profile(&self, profile: &GameProfile) -> Result<()> {
        self.objects
            .write_object(&self.paths.game_profile_path(), profile)
    }

    pub fn load_game_profile(&self) -> Option<GameProfile> {
        self.objects.read_object(&self.paths.game_profile_path())
    }

    pub fn delete_game_profile(&self) -> Result<()> {
        store::delete(&self.paths.game_profile_path())
    }

    /// Replace the stored auth state wholesale.
    pub fn save_auth_state(&self, state: &AuthState) -> Result<()> {
        self.objects.write_object(&self.paths.auth_state_path(), state)
    }

    pub fn load_auth_state(&self) -> Option<AuthState> {
        self.objects.read_object(&self.paths.auth_state_path())
    }

    /// Load the auth state (or a default one), apply `update`, and write it back whole.
    pub fn update_auth_state(&self, update: impl FnOnce(&mut AuthState)) -> Result<AuthState> {
        let mut state = self.load_auth_state().unwrap_or_default();
        update(&mut state);
        self.save_auth_state(&state)?;
        Ok(state)
    }

    pub fn set_oauth_token(&self, token: impl Into<String>) -> Result<AuthState> {
        let token = token.into();
        self.update_auth_state(|state| state.oauth_token = Some(token))
    }

    pub fn set_authenticated_user(&self, user_id: Option<UserId>) -> Result<AuthState> {
        self.update_auth_state(|state| state.user_id = user_id)
    }

    pub fn set_subscribed_mods(&self, mod_ids: Vec<ModId>) -> Result<AuthState> {
        self.update_auth_state(|state| state.subscribed_mod_ids = mod_ids)
    }

    /// Add a subscription; already subscribed ids are left as they are.
    pub fn add_subscribed_mod(&self, mod_id: ModId) -> Result<AuthState> {
        self.update_auth_state(|state| {
            if !state.subscribed_mod_ids.contains(&mod_id) {
                state.subscribed_mod_ids.push(mod_id);
            }
        })
    }

    pub fn remove_subscribed_mod(&self, mod_id: ModId) -> Result<AuthState> {
        self.update_auth_state(|state| state.subscribed_mod_ids.retain(|id| *id != mod_id))
    }

    pub fn set_owned_mods(&self, mod_ids: Vec<ModId>) -> Result<AuthState> {
        self.update_auth_state(|state| state.owned_mod_ids = mod_ids)
    }

    /// Forget the authenticated user entirely.
    pub fn clear_auth_state(&self) -> Result<()> {
        store::delete(&self.paths.auth_state_path())
    }

    pub fn save_mod_profile(&self, profile: &ModProfile) -> Result<()> {
        self.objects
            .write_object(&self.paths.mod_profile_path(profile.id), profile)
    }

    /// Save every profile, continuing past failures. Returns how many were written.
    pub fn save_mod_profiles<'a>(&self, profiles: impl IntoIterator<Item = &'a ModProfile>) -> usize {
        profiles
            .into_iter()
            .filter(|profile| self.save_mod_profile(profile).is_ok())
            .count()
    }

    pub fn load_mod_profile(&self, mod_id: ModId) -> Option<ModProfile> {
        let profile = self.objects.read_object(&self.paths.mod_profile_path(mod_id));
        tracing::debug!(%mod_id, hit = profile.is_some(), "Mod profile cache lookup");
        profile
    }

    /// Ids of every mod with a cache directory, read lazily from disk.
    pub fn mod_ids(&self) -> impl Iterator<Item = ModId> + use<S> {
        id_dirs(&self.paths.mods_dir()).filter_map(|(name, _)| parse_id(&name, ModId::new))
    }

    /// Lazily enumerate cached mod profiles, skipping entries that fail to load.
    pub fn iter_mod_profiles(&self) -> impl Iterator<Item = ModProfile> + '_ {
        self.mod_ids()
            .filter_map(move |mod_id| self.read_listed(&self.paths.mod_profile_path(mod_id)))
    }

    /// Remove everything cached for a mod: profile, team, logos, modfiles, and binaries.
    pub fn delete_mod(&self, mod_id: ModId) -> Result<()> {
        tracing::debug!(%mod_id, "Deleting mod from cache");
        store::delete_dir(&self.paths.mod_dir(mod_id))
    }

    pub fn save_modfile(&self, modfile: &Modfile) -> Result<()> {
        self.objects.write_object(
            &self.paths.modfile_path(modfile.mod_id, modfile.id),
            modfile,
        )
    }

    pub fn load_modfile(&self, mod_id: ModId, modfile_id: ModfileId) -> Option<Modfile> {
        self.objects
            .read_object(&self.paths.modfile_path(mod_id, modfile_id))
    }

    /// Ids of the modfiles with cached metadata for a mod.
    pub fn modfile_ids(&self, mod_id: ModId) -> impl Iterator<Item = ModfileId> + use<S> {
        store::list_entries(&self.paths.binaries_dir(mod_id)).filter_map(|entry| {
            let path = entry.path();
            if path.extension() != Some(OsStr::new("data")) {
                return None;
            }
            let stem = path.file_stem()?.to_str()?.to_owned();
            parse_id(&stem, ModfileId::new)
        })
    }

    /// Lazily enumerate cached modfile metadata of a mod, skipping entries that fail to load.
    pub fn iter_modfiles(&self, mod_id: ModId) -> impl Iterator<Item = Modfile> + '_ {
        self.modfile_ids(mod_id).filter_map(move |modfile_id| {
            self.read_listed(&self.paths.modfile_path(mod_id, modfile_id))
        })
    }

    /// Path where the payload of a modfile is (or would be) committed.
    pub fn binary_path(&self, mod_id: ModId, modfile_id: ModfileId) -> PathBuf {
        self.paths.binary_path(mod_id, modfile_id)
    }

    pub fn has_binary(&self, mod_id: ModId, modfile_id: ModfileId) -> bool {
        store::exists(&self.paths.binary_path(mod_id, modfile_id))
    }

    pub fn save_binary_zip(&self, mod_id: ModId, modfile_id: ModfileId, bytes: &[u8]) -> Result<()> {
        self.objects
            .write_raw(&self.paths.binary_path(mod_id, modfile_id), bytes)
    }

    pub fn load_binary_zip(&self, mod_id: ModId, modfile_id: ModfileId) -> Option<Vec<u8>> {
        self.objects
            .read_raw(&self.paths.binary_path(mod_id, modfile_id))
    }

    /// Delete a modfile's metadata, its payload, and any partial download left behind.
    ///
    /// The deletes are independent; all are attempted and the first error is returned.
    pub fn delete_modfile_and_binary(&self, mod_id: ModId, modfile_id: ModfileId) -> Result<()> {
        let metadata = store::delete(&self.paths.modfile_path(mod_id, modfile_id));
        let binary = store::delete(&self.paths.binary_path(mod_id, modfile_id));
        let partial = store::delete(&self.paths.binary_download_path(mod_id, modfile_id));
        metadata.and(binary).and(partial)
    }

    /// Delete every modfile record and payload of a mod, keeping its profile and images.
    pub fn delete_all_modfiles_and_binaries(&self, mod_id: ModId) -> Result<()> {
        store::delete_dir(&self.paths.binaries_dir(mod_id))
    }

    /// Write a logo rendition, then record `source_file_name` as its version.
    pub fn save_logo(
        &self,
        mod_id: ModId,
        size: LogoSize,
        source_file_name: &str,
        png: &[u8],
    ) -> Result<()> {
        self.objects
            .write_raw(&self.paths.logo_path(mod_id, size), png)?;

        let mut index = self.logo_version_file_names(mod_id);
        index.insert(size, source_file_name.to_string());
        self.objects
            .write_object(&self.paths.logo_version_path(mod_id), &index)
    }

    /// Raw bytes of a cached logo rendition.
    ///
    /// The version index is not consulted; callers that care about freshness compare
    /// [`logo_version`](Self::logo_version) against the remote file name themselves.
    pub fn load_logo(&self, mod_id: ModId, size: LogoSize) -> Option<Vec<u8>> {
        self.objects.read_raw(&self.paths.logo_path(mod_id, size))
    }

    /// The full size -> source file name index of a mod's logo.
    pub fn logo_version_file_names(&self, mod_id: ModId) -> LogoVersionIndex {
        self.objects
            .read_object(&self.paths.logo_version_path(mod_id))
            .unwrap_or_default()
    }

    pub fn logo_version(&self, mod_id: ModId, size: LogoSize) -> Option<String> {
        self.logo_version_file_names(mod_id).remove(&size)
    }

    /// Delete every logo rendition and the version index of a mod.
    pub fn delete_logos(&self, mod_id: ModId) -> Result<()> {
        store::delete_dir(&self.paths.logo_dir(mod_id))
    }

    pub fn save_gallery_image(
        &self,
        mod_id: ModId,
        file_name_stem: &str,
        size: GalleryImageSize,
        png: &[u8],
    ) -> Result<()> {
        self.objects.write_raw(
            &self.paths.gallery_image_path(mod_id, file_name_stem, size),
            png,
        )
    }

    pub fn load_gallery_image(
        &self,
        mod_id: ModId,
        file_name_stem: &str,
        size: GalleryImageSize,
    ) -> Option<Vec<u8>> {
        self.objects
            .read_raw(&self.paths.gallery_image_path(mod_id, file_name_stem, size))
    }

    pub fn delete_gallery_image(
        &self,
        mod_id: ModId,
        file_name_stem: &str,
        size: GalleryImageSize,
    ) -> Result<()> {
        store::delete(&self.paths.gallery_image_path(mod_id, file_name_stem, size))
    }

    pub fn save_team(&self, mod_id: ModId, members: &[ModTeamMember]) -> Result<()> {
        self.objects.write_object(&self.paths.team_path(mod_id), &members)
    }

    pub fn load_team(&self, mod_id: ModId) -> Option<Vec<ModTeamMember>> {
        self.objects.read_object(&self.paths.team_path(mod_id))
    }

    pub fn delete_team(&self, mod_id: ModId) -> Result<()> {
        store::delete(&self.paths.team_path(mod_id))
    }

    pub fn save_user_profile(&self, profile: &UserProfile) -> Result<()> {
        self.objects
            .write_object(&self.paths.user_path(profile.id), profile)
    }

    pub fn load_user_profile(&self, user_id: UserId) -> Option<UserProfile> {
        self.objects.read_object(&self.paths.user_path(user_id))
    }

    /// Remove a user's profile and avatars.
    pub fn delete_user(&self, user_id: UserId) -> Result<()> {
        store::delete_dir(&self.paths.user_dir(user_id))
    }

    pub fn user_ids(&self) -> impl Iterator<Item = UserId> + use<S> {
        id_dirs(&self.paths.users_dir()).filter_map(|(name, _)| parse_id(&name, UserId::new))
    }

    /// Lazily enumerate cached user profiles, skipping entries that fail to load.
    pub fn iter_user_profiles(&self) -> impl Iterator<Item = UserProfile> + '_ {
        self.user_ids()
            .filter_map(move |user_id| self.read_listed(&self.paths.user_path(user_id)))
    }

    pub fn save_avatar(&self, user_id: UserId, size: AvatarSize, png: &[u8]) -> Result<()> {
        self.objects
            .write_raw(&self.paths.avatar_path(user_id, size), png)
    }

    pub fn load_avatar(&self, user_id: UserId, size: AvatarSize) -> Option<Vec<u8>> {
        self.objects.read_raw(&self.paths.avatar_path(user_id, size))
    }

    pub fn delete_avatar(&self, user_id: UserId, size: AvatarSize) -> Result<()> {
        store::delete(&self.paths.avatar_path(user_id, size))
    }

    /// Read one record found by enumeration. Directories without the record are
    /// skipped quietly; records that fail to read or decode are skipped with a warning.
    fn read_listed<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        match self.objects.try_read_object(path) {
            Ok(value) => Some(value),
            Err(CacheError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping cache entry during enumeration");
                None
            }
        }
    }
}

/// Subdirectories of `dir` as (name, path) pairs.
fn id_dirs(dir: &Path) -> impl Iterator<Item = (String, PathBuf)> + use<> {
    store::list_entries(dir).filter_map(|entry| {
        let path = entry.path();
        if !path.is_dir() {
            return None;
        }
        let name = entry.file_name().into_string().ok()?;
        Some((name, path))
    })
}

/// Parse a directory or file name as an id, ignoring anything that is not one.
fn parse_id<T>(name: &str, new: impl FnOnce(i64) -> Result<T>) -> Option<T> {
    match name.parse::<i64>().ok().map(new) {
        Some(Ok(id)) => Some(id),
        _ => {
            tracing::debug!(name, "Ignoring non-id entry in cache directory");
            None
        }
    }
}
