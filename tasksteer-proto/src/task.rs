//! Task records and the helpers that shape them before storage.
//!
//! A [`Task`] lives in exactly one owner context ([`TaskOwner`]): a user's
//! personal collection or the task sub-collection of one shared list.
//! Deletion is logical; `deleted` flips to `true` and the record stays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title used when neither the caller nor the model supplies one.
pub const DEFAULT_TASK_TITLE: &str = "Untitled Task";

/// Workflow status of a task.
///
/// The serialized form is the display label lowercased with spaces removed
/// (`"High Priority"` is stored as `"highpriority"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Urgent work ("ASAP", "critical", "top priority").
    HighPriority,
    /// Not started. The default for anything that matches no other rule.
    #[default]
    ToDo,
    /// The assignee has already started.
    InProgress,
    /// Checking or approving someone else's work.
    Review,
    /// Explicitly finished.
    Completed,
}

impl TaskStatus {
    /// Every status, in the order the labels are presented to the model.
    pub const ALL: [Self; 5] = [
        Self::HighPriority,
        Self::ToDo,
        Self::InProgress,
        Self::Review,
        Self::Completed,
    ];

    /// Human-readable label, e.g. `"In Progress"`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HighPriority => "High Priority",
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Review => "Review",
            Self::Completed => "Completed",
        }
    }

    /// Compact stored form, e.g. `"inprogress"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighPriority => "highpriority",
            Self::ToDo => "todo",
            Self::InProgress => "inprogress",
            Self::Review => "review",
            Self::Completed => "completed",
        }
    }

    /// Parses a label or stored form.
    ///
    /// Case-insensitive; spaces, underscores and hyphens are ignored, so
    /// `"In Progress"`, `"in_progress"` and `"inprogress"` are all accepted.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let compact: String = input
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL.into_iter().find(|s| s.as_str() == compact)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a task came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSource {
    /// Extracted from an uploaded transcript.
    Transcript,
    /// Created directly through the API.
    #[default]
    Manual,
}

/// The single context that owns a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskOwner {
    /// A user's personal collection, keyed by user id.
    Personal {
        /// Identity-provider user id.
        user_id: String,
    },
    /// The task sub-collection of a shared list.
    List {
        /// Shared list id.
        list_id: String,
    },
}

impl TaskOwner {
    /// Personal owner for the given user id.
    pub fn personal(user_id: impl Into<String>) -> Self {
        Self::Personal {
            user_id: user_id.into(),
        }
    }

    /// Shared-list owner for the given list id.
    pub fn list(list_id: impl Into<String>) -> Self {
        Self::List {
            list_id: list_id.into(),
        }
    }
}

impl std::fmt::Display for TaskOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Personal { user_id } => write!(f, "user:{user_id}"),
            Self::List { list_id } => write!(f, "list:{list_id}"),
        }
    }
}

/// A stored task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Document id, unique within its owner context.
    pub id: String,
    /// Short imperative summary.
    pub title: String,
    /// Why the task exists.
    #[serde(default)]
    pub description: String,
    /// Free-text name or email of the responsible person. May be empty.
    #[serde(default)]
    pub assignee: String,
    /// `YYYY-MM-DD`, or empty when no deadline was given.
    #[serde(default)]
    pub due_date: String,
    /// Workflow status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
    /// Server timestamp at insertion.
    pub created_at: DateTime<Utc>,
    /// Server timestamp of the last update, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Server timestamp of the soft delete, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Origin tag.
    #[serde(default)]
    pub source: TaskSource,
    /// Owning list, for tasks in a shared list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    /// Name of the owning list at insertion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_name: Option<String>,
}

/// Caller-supplied fields for a task about to be inserted.
///
/// Ids, timestamps and the soft-delete flag are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub due_date: String,
    pub status: TaskStatus,
    pub source: TaskSource,
    pub list_id: Option<String>,
    pub list_name: Option<String>,
}

/// Partial update of the user-editable task fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl TaskPatch {
    /// Returns `true` if the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
            && self.assignee.is_none()
    }

    /// Applies every present field to `task`.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(due_date) = &self.due_date {
            task.due_date.clone_from(due_date);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(assignee) = &self.assignee {
            task.assignee.clone_from(assignee);
        }
    }
}

/// Canonical stored form of a typed assignee.
///
/// Email addresses are trimmed and lowercased so they compare equal to
/// member keys. Anything else is kept as typed.
#[must_use]
pub fn canonical_assignee(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains('@') {
        trimmed.to_lowercase()
    } else {
        raw.to_string()
    }
}

/// Matches a free-text assignee name against the current user's email.
///
/// If the lowercased local part of `user_email` contains the trimmed,
/// lowercased `raw` name, or the other way round, the email is returned.
/// Otherwise `raw` comes back unchanged. Blank names, a missing email and
/// an empty local part never match.
#[must_use]
pub fn normalize_assignee(raw: &str, user_email: Option<&str>) -> String {
    let Some(email) = user_email.filter(|e| !e.is_empty()) else {
        return raw.to_string();
    };
    let assignee = raw.trim().to_lowercase();
    let local_part = email.split('@').next().unwrap_or_default().to_lowercase();
    if assignee.is_empty() || local_part.is_empty() {
        return raw.to_string();
    }
    if local_part.contains(&assignee) || assignee.contains(&local_part) {
        email.to_string()
    } else {
        raw.to_string()
    }
}
