//! HTTP route handlers.
//!
//! Protected handlers take the caller as `Extension<Identity>`, which
//! [`crate::auth::require_auth`] inserts before they run.

pub mod lists;
pub mod status;
pub mod tasks;
pub mod upload;

use tasksteer_proto::list::SharedList;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::server::AppState;

/// Loads a live list and checks the caller is a member of it.
///
/// # Errors
///
/// [`ApiError::NotFound`] if the list is missing or deleted,
/// [`ApiError::Forbidden`] with `denied` if the caller is not a member.
async fn member_list(
    state: &AppState,
    list_id: &str,
    user: &Identity,
    denied: &str,
) -> Result<SharedList, ApiError> {
    let list = state
        .store
        .get_list(list_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("List with ID '{list_id}' not found.")))?;

    if !list.is_member(&user.member_key()) {
        tracing::warn!(user_id = %user.uid, list_id, "caller is not a list member");
        return Err(ApiError::Forbidden(denied.to_string()));
    }
    Ok(list)
}

/// Trims `value` and drops it when blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
