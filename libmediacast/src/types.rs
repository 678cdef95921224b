//! Core domain types for Mediacast

use serde::{Deserialize, Serialize};

/// A chat participant, created lazily on first interaction.
///
/// The `is_admin` flag is stamped once at creation from the configured
/// allow-list and is never revoked at runtime. Authorization checks go
/// through the allow-list itself, not this flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// External chat id, unique per user.
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
}

/// Insert payload for a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
}

/// Content kind of a queued submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "photo" => Some(Self::Photo),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of content awaiting broadcast.
///
/// The published flag is monotonic: it only ever moves from false to
/// true, and only the publisher flips it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPost {
    pub id: i64,
    /// Owning user, for provenance only.
    pub user_id: i64,
    pub kind: MediaKind,
    /// Opaque transport handle for the media content.
    pub file_ref: String,
    pub caption: String,
    /// Unix seconds at insert time; ties are broken by ascending id.
    pub created_at: i64,
    pub published: bool,
}

/// Insert payload for a pending post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i64,
    pub kind: MediaKind,
    pub file_ref: String,
    pub caption: String,
}

/// Singleton broadcast settings. Absent means automatic publishing is off.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Settings {
    /// Minimum spacing between automatic publishes, in minutes.
    pub interval_minutes: i64,
}
