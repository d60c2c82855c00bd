//! `POST /upload`: transcript in, tasks out.
//!
//! The form is read and validated in full before the model is called, so a
//! bad destination never costs a model request.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use chrono::NaiveDate;
use tasksteer_proto::api::{UploadAction, UploadResponse};
use tasksteer_proto::list::{NewList, SharedList};
use tasksteer_proto::task::{NewTask, TaskOwner, TaskSource, normalize_assignee};

use super::{member_list, present};
use crate::ai::{self, ExtractedTask};
use crate::auth::Identity;
use crate::error::ApiError;
use crate::extract::{DocumentKind, ExtractError, extract_text, sanitize_filename};
use crate::server::AppState;

/// Multipart fields of an upload.
#[derive(Debug, Default)]
struct UploadForm {
    /// Client filename and raw bytes of the `file` part.
    file: Option<(String, Vec<u8>)>,
    action: Option<String>,
    meeting_date: Option<String>,
    new_list_name: Option<String>,
    list_id: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some((filename, bytes.to_vec()));
            }
            "action" => form.action = Some(field.text().await?),
            "meeting_date" => form.meeting_date = Some(field.text().await?),
            "new_list_name" => form.new_list_name = Some(field.text().await?),
            "list_id" => form.list_id = Some(field.text().await?),
            other => tracing::debug!(field = other, "ignoring unknown upload field"),
        }
    }
    Ok(form)
}

/// Where extracted tasks go, resolved before extraction.
enum Destination {
    Personal,
    NewList(Option<String>),
    Existing(SharedList),
}

async fn resolve_destination(
    state: &AppState,
    user: &Identity,
    form: &mut UploadForm,
) -> Result<Destination, ApiError> {
    let action: UploadAction = present(form.action.take())
        .ok_or_else(|| ApiError::BadRequest("Missing 'action' in form data.".into()))?
        .parse()?;

    Ok(match action {
        UploadAction::PersonalTasks => Destination::Personal,
        UploadAction::NewList => Destination::NewList(present(form.new_list_name.take())),
        UploadAction::ExistingList => {
            let list_id = present(form.list_id.take()).ok_or_else(|| {
                ApiError::BadRequest("Missing 'list_id' for existing list.".into())
            })?;
            let list =
                member_list(state, &list_id, user, "You are not a member of this list.").await?;
            Destination::Existing(list)
        }
    })
}

/// Parses `meeting_date`, defaulting to today's local date.
fn resolve_meeting_date(raw: Option<String>) -> Result<String, ApiError> {
    match present(raw) {
        None => Ok(chrono::Local::now().date_naive().to_string()),
        Some(date) => NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map(|d| d.format("%Y-%m-%d").to_string())
            .map_err(|_| {
                ApiError::BadRequest(format!(
                    "Invalid meeting_date '{date}', expected YYYY-MM-DD."
                ))
            }),
    }
}

fn to_new_task(task: ExtractedTask, assignee: String, list: Option<&SharedList>) -> NewTask {
    NewTask {
        title: task.title,
        description: task.description,
        assignee,
        due_date: task.due_date,
        status: task.status,
        source: TaskSource::Transcript,
        list_id: list.map(|l| l.id.clone()),
        list_name: list.map(|l| l.name.clone()),
    }
}

/// Inserts `extracted` into `list`, matching assignee names to the uploader.
async fn fill_list(
    state: &AppState,
    user: &Identity,
    list: &SharedList,
    extracted: Vec<ExtractedTask>,
) -> Result<usize, ApiError> {
    let key = user.member_key();
    let email = user.email.as_ref().map(|_| key.as_str());
    let tasks: Vec<NewTask> = extracted
        .into_iter()
        .map(|t| {
            let assignee = normalize_assignee(t.assignee.as_deref().unwrap_or_default(), email);
            to_new_task(t, assignee, Some(list))
        })
        .collect();
    let inserted = state
        .store
        .insert_tasks(&TaskOwner::list(&list.id), tasks)
        .await?;
    Ok(inserted.len())
}

/// `POST /upload`
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    tracing::info!(user_id = %user.uid, "transcript upload received");
    let mut form = read_form(multipart).await?;

    let (raw_name, bytes) = form
        .file
        .take()
        .ok_or_else(|| ApiError::BadRequest("No file part in the request.".into()))?;
    if raw_name.is_empty() {
        return Err(ApiError::BadRequest("No selected file.".into()));
    }
    let filename = sanitize_filename(&raw_name).to_lowercase();
    if DocumentKind::from_filename(&filename).is_none() {
        return Err(ExtractError::Unsupported(filename).into());
    }

    let destination = resolve_destination(&state, &user, &mut form).await?;
    let meeting_date = resolve_meeting_date(form.meeting_date.take())?;
    let model = state.model()?;

    let transcript = extract_text(&filename, bytes, state.max_document_size()).await?;
    let extracted = ai::extract_tasks(model, &transcript, &meeting_date).await?;

    if extracted.is_empty() {
        return Ok(Json(UploadResponse {
            message: "No valid tasks were extracted from the document.".into(),
            count: 0,
            new_list_id: None,
        }));
    }

    let response = match destination {
        Destination::Personal => {
            let assignee = user.member_key();
            let tasks: Vec<NewTask> = extracted
                .into_iter()
                .map(|t| to_new_task(t, assignee.clone(), None))
                .collect();
            let count = state
                .store
                .insert_tasks(&TaskOwner::personal(&user.uid), tasks)
                .await?
                .len();
            tracing::info!(user_id = %user.uid, count, "transcript tasks added to personal tasks");
            UploadResponse {
                message: format!("Added {count} task(s) to your personal tasks."),
                count,
                new_list_id: None,
            }
        }
        Destination::NewList(name) => {
            let list = state
                .store
                .create_list(NewList {
                    name: name.unwrap_or_else(|| format!("Tasks from {filename}")),
                    owner_id: user.uid.clone(),
                    owner_key: user.member_key(),
                })
                .await?;
            let count = fill_list(&state, &user, &list, extracted).await?;
            tracing::info!(
                user_id = %user.uid,
                list_id = %list.id,
                count,
                "transcript tasks added to new list"
            );
            UploadResponse {
                message: format!("Created new list '{}' with {count} task(s).", list.name),
                count,
                new_list_id: Some(list.id),
            }
        }
        Destination::Existing(list) => {
            let count = fill_list(&state, &user, &list, extracted).await?;
            tracing::info!(
                user_id = %user.uid,
                list_id = %list.id,
                count,
                "transcript tasks added to list"
            );
            UploadResponse {
                message: format!("Added {count} task(s) to the list."),
                count,
                new_list_id: None,
            }
        }
    };

    Ok(Json(response))
}
