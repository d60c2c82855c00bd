//! Shared task lists and their membership sets.
//!
//! Members and pending invites are stored as member keys: the user's
//! lowercased email, or the user id when the identity has no email.
//! An invite is not a record of its own; it is a key sitting in
//! `pending_invites` until it is accepted and moved to `members`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name used when an existing list has lost its name.
pub const UNTITLED_LIST_NAME: &str = "Untitled List";

fn untitled_list_name() -> String {
    UNTITLED_LIST_NAME.to_string()
}

/// A task collection visible to every key in `members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedList {
    /// Document id.
    pub id: String,
    /// Display name.
    #[serde(default = "untitled_list_name")]
    pub name: String,
    /// User id of the creator. Only the owner may delete the list.
    pub owner_id: String,
    /// Member keys. Always contains the owner's key.
    pub members: BTreeSet<String>,
    /// Member keys invited but not yet joined.
    #[serde(default)]
    pub pending_invites: BTreeSet<String>,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
    /// Server timestamp at creation.
    pub created_at: DateTime<Utc>,
    /// Server timestamp of the soft delete, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SharedList {
    /// Returns `true` if `key` is a member.
    #[must_use]
    pub fn is_member(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    /// Returns `true` if `user_id` created the list.
    #[must_use]
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Returns `true` if `key` has an invite waiting.
    #[must_use]
    pub fn has_pending_invite(&self, key: &str) -> bool {
        self.pending_invites.contains(key)
    }

    /// Summary shown to an invitee.
    #[must_use]
    pub fn invite_summary(&self) -> InviteSummary {
        InviteSummary {
            list_id: self.id.clone(),
            name: self.name.clone(),
            owner_id: self.owner_id.clone(),
        }
    }
}

/// Fields for a list about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewList {
    /// Display name.
    pub name: String,
    /// Creator's user id.
    pub owner_id: String,
    /// Creator's member key, seeded into `members`.
    pub owner_key: String,
}

/// A pending invitation as returned to the invitee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteSummary {
    pub list_id: String,
    pub name: String,
    pub owner_id: String,
}
