//! Task CRUD for personal collections and shared lists.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use tasksteer_proto::api::{
    CreateTaskRequest, CreateTaskResponse, MessageResponse, TaskKind, UpdateTaskRequest,
};
use tasksteer_proto::task::{
    DEFAULT_TASK_TITLE, NewTask, Task, TaskOwner, TaskSource, canonical_assignee,
};

use super::{member_list, present};
use crate::auth::Identity;
use crate::error::ApiError;
use crate::server::AppState;
use crate::store::TaskQuery;

const TASK_NOT_FOUND: &str = "Task not found.";

/// `GET /tasks`: the caller's personal tasks followed by the tasks
/// assigned to them in every list they belong to.
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let key = user.member_key();
    let mut tasks = state
        .store
        .tasks(&TaskOwner::personal(&user.uid), &TaskQuery::default())
        .await?;

    let lists = state.store.lists_for_member(&key).await?;
    for list in &lists {
        let assigned = state
            .store
            .tasks(&TaskOwner::list(&list.id), &TaskQuery::assigned_to(&key))
            .await?;
        tasks.extend(assigned);
    }

    tracing::debug!(user_id = %user.uid, lists = lists.len(), count = tasks.len(), "tasks listed");
    Ok(Json(tasks))
}

/// `POST /create-task`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<CreateTaskResponse>), ApiError> {
    let kind = body.task_kind()?;
    let status = body.task_status()?;
    let mut task = NewTask {
        title: present(body.title).unwrap_or_else(|| DEFAULT_TASK_TITLE.to_string()),
        description: body.description.unwrap_or_default(),
        assignee: canonical_assignee(body.assignee.as_deref().unwrap_or_default()),
        due_date: body.due_date.unwrap_or_default(),
        status,
        source: TaskSource::Manual,
        ..NewTask::default()
    };

    let (owner, message) = match kind {
        TaskKind::Personal => (TaskOwner::personal(&user.uid), "Personal task created."),
        TaskKind::Shared => {
            let list_id = present(body.list_id).ok_or_else(|| {
                ApiError::BadRequest("Missing 'list_id' for a shared task.".into())
            })?;
            let list = member_list(
                &state,
                &list_id,
                &user,
                "You are not authorized to add tasks to this list.",
            )
            .await?;
            task.list_id = Some(list.id.clone());
            task.list_name = Some(list.name);
            (TaskOwner::list(list.id), "Shared task created.")
        }
    };

    let inserted = state.store.insert_tasks(&owner, vec![task]).await?;
    let id = inserted
        .into_iter()
        .next()
        .map(|t| t.id)
        .ok_or_else(|| ApiError::Internal("store returned no task".into()))?;
    tracing::info!(user_id = %user.uid, owner = %owner, task_id = %id, "task created");

    Ok((
        StatusCode::CREATED,
        Json(CreateTaskResponse {
            message: message.to_string(),
            id,
        }),
    ))
}

async fn apply_update(
    state: &AppState,
    owner: &TaskOwner,
    task_id: &str,
    body: UpdateTaskRequest,
) -> Result<Json<MessageResponse>, ApiError> {
    let patch = body.into_patch()?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("No update fields provided.".into()));
    }
    state
        .store
        .update_task(owner, task_id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound(TASK_NOT_FOUND.into()))?;
    tracing::info!(owner = %owner, task_id, "task updated");
    Ok(Json(MessageResponse::new("Task updated successfully.")))
}

async fn apply_delete(
    state: &AppState,
    owner: &TaskOwner,
    task_id: &str,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.store.delete_task(owner, task_id).await? {
        return Err(ApiError::NotFound(TASK_NOT_FOUND.into()));
    }
    tracing::info!(owner = %owner, task_id, "task deleted");
    Ok(Json(MessageResponse::new("Task deleted successfully.")))
}

/// `PUT /update-personal-task/{task_id}`
pub async fn update_personal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Path(task_id): Path<String>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    apply_update(&state, &TaskOwner::personal(&user.uid), &task_id, body).await
}

/// `PUT /update-shared-task/{list_id}/{task_id}`
pub async fn update_shared(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Path((list_id, task_id)): Path<(String, String)>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    member_list(
        &state,
        &list_id,
        &user,
        "You are not authorized to modify tasks in this list.",
    )
    .await?;
    apply_update(&state, &TaskOwner::list(list_id), &task_id, body).await
}

/// `DELETE /delete-personal-task/{task_id}`
pub async fn delete_personal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Path(task_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    apply_delete(&state, &TaskOwner::personal(&user.uid), &task_id).await
}

/// `DELETE /delete-shared-task/{list_id}/{task_id}`
pub async fn delete_shared(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Path((list_id, task_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    member_list(
        &state,
        &list_id,
        &user,
        "You are not authorized to delete tasks in this list.",
    )
    .await?;
    apply_delete(&state, &TaskOwner::list(list_id), &task_id).await
}
