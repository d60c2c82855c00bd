//! JSON bodies exchanged over the HTTP API.
//!
//! Field names follow the wire format the web client already speaks,
//! which is why invite bodies use `listId` while everything else uses
//! snake case. Required fields are modelled as `Option` so the server can
//! answer a missing field with its own 400 message.

use serde::{Deserialize, Serialize};

use crate::list::{InviteSummary, SharedList};
use crate::task::{TaskPatch, TaskStatus, canonical_assignee};

/// Errors raised while converting a request body into a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BodyError {
    /// The status string is not one of the known labels.
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    /// `type` on create-task was neither `personal` nor `shared`.
    #[error("invalid task type: {0}")]
    InvalidTaskType(String),
    /// `action` on upload was not a known destination.
    #[error("invalid action type: {0}")]
    InvalidAction(String),
}

/// Plain acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `POST /suggest-status` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestStatusRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `POST /suggest-status` reply; the status is given as its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestStatusResponse {
    pub suggested_status: String,
}

/// Destination for tasks extracted from an uploaded transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadAction {
    /// Into the uploader's personal collection.
    PersonalTasks,
    /// Into a freshly created shared list.
    NewList,
    /// Into a shared list the uploader already belongs to.
    ExistingList,
}

impl std::str::FromStr for UploadAction {
    type Err = BodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personalTasks" => Ok(Self::PersonalTasks),
            "newList" => Ok(Self::NewList),
            "existingList" => Ok(Self::ExistingList),
            other => Err(BodyError::InvalidAction(other.to_string())),
        }
    }
}

/// `POST /upload` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Number of tasks written.
    pub count: usize,
    /// Id of the list created by a `newList` upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_list_id: Option<String>,
}

/// `POST /create-list` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateListRequest {
    pub name: Option<String>,
}

/// `POST /create-list` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateListResponse {
    pub message: String,
    pub list: SharedList,
}

/// `POST /invite` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InviteRequest {
    #[serde(rename = "listId")]
    pub list_id: Option<String>,
    pub email: Option<String>,
}

/// `POST /accept-invite` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcceptInviteRequest {
    #[serde(rename = "listId")]
    pub list_id: Option<String>,
}

/// `GET /invites` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitesResponse {
    pub invites: Vec<InviteSummary>,
}

/// Target collection for `POST /create-task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Personal,
    Shared,
}

impl std::str::FromStr for TaskKind {
    type Err = BodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(Self::Personal),
            "shared" => Ok(Self::Shared),
            other => Err(BodyError::InvalidTaskType(other.to_string())),
        }
    }
}

/// `POST /create-task` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub list_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
}

impl CreateTaskRequest {
    /// Resolves the target collection.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::InvalidTaskType`] for a missing or unknown type.
    pub fn task_kind(&self) -> Result<TaskKind, BodyError> {
        self.kind.as_deref().unwrap_or_default().parse()
    }

    /// Resolves the requested status, defaulting to [`TaskStatus::ToDo`].
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::InvalidStatus`] for an unknown label.
    pub fn task_status(&self) -> Result<TaskStatus, BodyError> {
        parse_status(self.status.as_deref())
            .map(Option::unwrap_or_default)
    }
}

/// `POST /create-task` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    pub message: String,
    pub id: String,
}

/// `PUT /update-*-task` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
}

impl UpdateTaskRequest {
    /// Converts the body into a [`TaskPatch`].
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::InvalidStatus`] if `status` is present but unknown.
    pub fn into_patch(self) -> Result<TaskPatch, BodyError> {
        let status = parse_status(self.status.as_deref())?;
        Ok(TaskPatch {
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            status,
            assignee: self.assignee.as_deref().map(canonical_assignee),
        })
    }
}

fn parse_status(raw: Option<&str>) -> Result<Option<TaskStatus>, BodyError> {
    raw.map(|s| TaskStatus::parse(s).ok_or_else(|| BodyError::InvalidStatus(s.to_string())))
        .transpose()
}
