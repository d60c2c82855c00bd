//! Shared lists, invitations and membership.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use tasksteer_proto::api::{
    AcceptInviteRequest, CreateListRequest, CreateListResponse, InviteRequest, InvitesResponse,
    MessageResponse,
};
use tasksteer_proto::list::{NewList, SharedList};
use tasksteer_proto::task::{Task, TaskOwner};

use super::{member_list, present};
use crate::auth::Identity;
use crate::error::ApiError;
use crate::server::AppState;
use crate::store::TaskQuery;

/// `GET /lists`
pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
) -> Result<Json<Vec<SharedList>>, ApiError> {
    let lists = state.store.lists_for_member(&user.member_key()).await?;
    Ok(Json(lists))
}

/// `GET /lists/{list_id}/tasks`
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Path(list_id): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    member_list(
        &state,
        &list_id,
        &user,
        "You are not a member of this list.",
    )
    .await?;
    let tasks = state
        .store
        .tasks(&TaskOwner::list(list_id), &TaskQuery::default())
        .await?;
    Ok(Json(tasks))
}

/// `POST /create-list`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Json(body): Json<CreateListRequest>,
) -> Result<(StatusCode, Json<CreateListResponse>), ApiError> {
    let name =
        present(body.name).ok_or_else(|| ApiError::BadRequest("List name is required.".into()))?;

    let list = state
        .store
        .create_list(NewList {
            name,
            owner_id: user.uid.clone(),
            owner_key: user.member_key(),
        })
        .await?;
    tracing::info!(user_id = %user.uid, list_id = %list.id, "list created");

    Ok((
        StatusCode::CREATED,
        Json(CreateListResponse {
            message: format!("List '{}' created successfully.", list.name),
            list,
        }),
    ))
}

/// `DELETE /delete-list/{list_id}`: owner only.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Path(list_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let list = state
        .store
        .get_list(&list_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("List with ID '{list_id}' not found.")))?;
    if !list.is_owner(&user.uid) {
        return Err(ApiError::Forbidden(
            "Only the list owner can delete this list.".into(),
        ));
    }

    if !state.store.delete_list(&list_id).await? {
        return Err(ApiError::NotFound(format!(
            "List with ID '{list_id}' not found."
        )));
    }
    tracing::info!(user_id = %user.uid, list_id = %list_id, "list deleted");
    Ok(Json(MessageResponse::new("List deleted successfully.")))
}

/// `POST /invite`
pub async fn invite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Json(body): Json<InviteRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (Some(list_id), Some(email)) = (present(body.list_id), present(body.email)) else {
        return Err(ApiError::BadRequest(
            "listId and email are required.".into(),
        ));
    };
    let email = email.to_lowercase();

    let list = member_list(
        &state,
        &list_id,
        &user,
        "You must be a member of this list to invite others.",
    )
    .await?;

    if !state.store.add_invite(&list_id, &email).await? {
        return Ok(Json(MessageResponse::new(
            "User is already a member of this list.",
        )));
    }
    tracing::info!(user_id = %user.uid, list_id = %list_id, invitee = %email, "invite sent");
    Ok(Json(MessageResponse::new(format!(
        "Successfully sent an invitation to {email} for list '{}'.",
        list.name
    ))))
}

/// `GET /invites`
pub async fn invites(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
) -> Result<Json<InvitesResponse>, ApiError> {
    let invites = state
        .store
        .lists_inviting(&user.member_key())
        .await?
        .iter()
        .map(SharedList::invite_summary)
        .collect();
    Ok(Json(InvitesResponse { invites }))
}

/// `POST /accept-invite`
pub async fn accept_invite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Json(body): Json<AcceptInviteRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let list_id =
        present(body.list_id).ok_or_else(|| ApiError::BadRequest("Missing listId.".into()))?;

    if !state
        .store
        .accept_invite(&list_id, &user.member_key())
        .await?
    {
        return Err(ApiError::Forbidden(
            "No pending invitation found for this list.".into(),
        ));
    }
    tracing::info!(user_id = %user.uid, list_id = %list_id, "invite accepted");
    Ok(Json(MessageResponse::new(
        "Successfully joined the shared list.",
    )))
}
