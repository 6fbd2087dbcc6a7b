// Remote resource types.
// Identifiers, image size variants, and the records fetched from the mod API and cached locally.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(u32);

        impl $name {
            /// Validate and wrap a raw id. Zero and negative values are rejected.
            pub fn new(value: i64) -> Result<Self, CacheError> {
                u32::try_from(value)
                    .ok()
                    .filter(|v| *v > 0)
                    .map(Self)
                    .ok_or(CacheError::InvalidId { kind: $kind, value })
            }

            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = CacheError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                i64::from(id.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_id!(
    /// Identifier of a mod.
    ModId,
    "mod"
);
positive_id!(
    /// Identifier of a single uploaded file (build) of a mod.
    ModfileId,
    "modfile"
);
positive_id!(
    /// Identifier of a user.
    UserId,
    "user"
);

/// Logo renditions served for every mod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoSize {
    Original,
    Thumbnail320x180,
    Thumbnail640x360,
    Thumbnail1280x720,
}

impl LogoSize {
    pub const ALL: [LogoSize; 4] = [
        LogoSize::Original,
        LogoSize::Thumbnail320x180,
        LogoSize::Thumbnail640x360,
        LogoSize::Thumbnail1280x720,
    ];

    /// Stable file-system segment for this size.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoSize::Original => "original",
            LogoSize::Thumbnail320x180 => "thumb_320x180",
            LogoSize::Thumbnail640x360 => "thumb_640x360",
            LogoSize::Thumbnail1280x720 => "thumb_1280x720",
        }
    }
}

/// Gallery image renditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GalleryImageSize {
    Original,
    Thumbnail320x180,
}

impl GalleryImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            GalleryImageSize::Original => "original",
            GalleryImageSize::Thumbnail320x180 => "thumb_320x180",
        }
    }
}

/// User avatar renditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarSize {
    Original,
    Thumbnail50x50,
    Thumbnail100x100,
}

impl AvatarSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarSize::Original => "original",
            AvatarSize::Thumbnail50x50 => "thumb_50x50",
            AvatarSize::Thumbnail100x100 => "thumb_100x100",
        }
    }
}

/// Profile of the game all mods belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameProfile {
    pub id: u32,
    pub name: String,
    pub name_id: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub date_updated: DateTime<Utc>,
}

/// Locations of the logo renditions on the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoLocator {
    pub filename: String,
    pub original: String,
    pub thumb_320x180: String,
    pub thumb_640x360: String,
    pub thumb_1280x720: String,
}

impl LogoLocator {
    /// Remote URL of the given rendition.
    pub fn url(&self, size: LogoSize) -> &str {
        match size {
            LogoSize::Original => &self.original,
            LogoSize::Thumbnail320x180 => &self.thumb_320x180,
            LogoSize::Thumbnail640x360 => &self.thumb_640x360,
            LogoSize::Thumbnail1280x720 => &self.thumb_1280x720,
        }
    }
}

/// Mod profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModProfile {
    pub id: ModId,
    pub name: String,
    pub name_id: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub submitted_by: UserId,
    pub date_added: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    #[serde(default)]
    pub logo: Option<LogoLocator>,
    /// Current release of the mod, if any has been published.
    #[serde(default)]
    pub modfile: Option<Modfile>,
}

/// Signed download location of a modfile binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModfileDownload {
    pub binary_url: String,
    pub date_expires: DateTime<Utc>,
}

/// Hashes published for a modfile binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHash {
    pub md5: String,
}

/// Metadata describing one uploaded build of a mod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modfile {
    pub id: ModfileId,
    pub mod_id: ModId,
    pub date_added: DateTime<Utc>,
    pub filename: String,
    pub filesize: u64,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub filehash: Option<FileHash>,
    pub download: ModfileDownload,
}

/// Member of a mod's team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModTeamMember {
    pub id: u32,
    pub user: UserProfile,
    pub level: u32,
    #[serde(default)]
    pub position: Option<String>,
}

/// Public profile of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub name_id: String,
    #[serde(default)]
    pub date_online: Option<DateTime<Utc>>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Locally persisted state of the authenticated user.
///
/// Stored as a single record; partial updates go through
/// [`ResourceCache::update_auth_state`](crate::cache::ResourceCache::update_auth_state).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(default)]
    pub oauth_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub owned_mod_ids: Vec<ModId>,
    #[serde(default)]
    pub subscribed_mod_ids: Vec<ModId>,
}
