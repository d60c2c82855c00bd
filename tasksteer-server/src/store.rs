//! Persistence layer: owner-scoped task collections and shared lists.
//!
//! [`TaskStore`] is the narrow interface handlers talk to. [`MemoryStore`]
//! keeps everything in memory behind a lock and, when given a path, writes
//! a JSON snapshot on every mutation and reloads it on start-up. A change
//! only becomes visible once its snapshot is on disk.
//!
//! Deletion is logical. Soft-deleted tasks and lists stay in the snapshot
//! but are invisible to every read and update.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tasksteer_proto::list::{NewList, SharedList};
use tasksteer_proto::task::{NewTask, Task, TaskOwner, TaskPatch};
use uuid::Uuid;

/// Errors raised by a [`TaskStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The list does not exist or has been deleted.
    #[error("list not found: {0}")]
    ListNotFound(String),
    /// Reading or writing the snapshot file failed.
    #[error("snapshot I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The snapshot could not be encoded or decoded.
    #[error("snapshot encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Filter for [`TaskStore::tasks`].
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    /// Only tasks whose assignee equals this value.
    pub assignee: Option<String>,
}

impl TaskQuery {
    /// Tasks assigned to `assignee`.
    pub fn assigned_to(assignee: impl Into<String>) -> Self {
        Self {
            assignee: Some(assignee.into()),
        }
    }
}

/// Document store used by the HTTP handlers.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts tasks into the owner's collection as one batch.
    async fn insert_tasks(
        &self,
        owner: &TaskOwner,
        tasks: Vec<NewTask>,
    ) -> Result<Vec<Task>, StoreError>;

    /// Fetches a live task.
    async fn get_task(&self, owner: &TaskOwner, task_id: &str) -> Result<Option<Task>, StoreError>;

    /// Applies a patch to a live task and stamps `updated_at`.
    async fn update_task(
        &self,
        owner: &TaskOwner,
        task_id: &str,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, StoreError>;

    /// Soft-deletes a live task. Returns `false` if there was none.
    async fn delete_task(&self, owner: &TaskOwner, task_id: &str) -> Result<bool, StoreError>;

    /// Lists live tasks of the owner, oldest first.
    async fn tasks(&self, owner: &TaskOwner, query: &TaskQuery) -> Result<Vec<Task>, StoreError>;

    /// Creates a list whose only member is the owner.
    async fn create_list(&self, list: NewList) -> Result<SharedList, StoreError>;

    /// Fetches a live list.
    async fn get_list(&self, list_id: &str) -> Result<Option<SharedList>, StoreError>;

    /// Live lists that include `member` in their members.
    async fn lists_for_member(&self, member: &str) -> Result<Vec<SharedList>, StoreError>;

    /// Live lists that hold a pending invite for `member`.
    async fn lists_inviting(&self, member: &str) -> Result<Vec<SharedList>, StoreError>;

    /// Adds `invitee` to the pending invites. Returns `false` if the
    /// invitee is already a member.
    async fn add_invite(&self, list_id: &str, invitee: &str) -> Result<bool, StoreError>;

    /// Moves `member` from pending invites to members. Returns `false` if
    /// no invite was pending.
    async fn accept_invite(&self, list_id: &str, member: &str) -> Result<bool, StoreError>;

    /// Soft-deletes a live list. Returns `false` if there was none.
    async fn delete_list(&self, list_id: &str) -> Result<bool, StoreError>;
}

type TaskCollection = BTreeMap<String, Task>;

/// Everything the store holds. This is also the snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Collections {
    /// user id → task id → task
    #[serde(default)]
    personal: HashMap<String, TaskCollection>,
    /// list id → list
    #[serde(default)]
    lists: BTreeMap<String, SharedList>,
    /// list id → task id → task
    #[serde(default)]
    list_tasks: HashMap<String, TaskCollection>,
}

impl Collections {
    fn live_list(&self, list_id: &str) -> Option<&SharedList> {
        self.lists.get(list_id).filter(|l| !l.deleted)
    }

    fn live_list_mut(&mut self, list_id: &str) -> Option<&mut SharedList> {
        self.lists.get_mut(list_id).filter(|l| !l.deleted)
    }

    fn collection(&self, owner: &TaskOwner) -> Option<&TaskCollection> {
        match owner {
            TaskOwner::Personal { user_id } => self.personal.get(user_id),
            TaskOwner::List { list_id } => self.list_tasks.get(list_id),
        }
    }

    fn collection_mut(&mut self, owner: &TaskOwner) -> &mut TaskCollection {
        match owner {
            TaskOwner::Personal { user_id } => self.personal.entry(user_id.clone()).or_default(),
            TaskOwner::List { list_id } => self.list_tasks.entry(list_id.clone()).or_default(),
        }
    }

    fn live_task_mut(&mut self, owner: &TaskOwner, task_id: &str) -> Option<&mut Task> {
        let collection = match owner {
            TaskOwner::Personal { user_id } => self.personal.get_mut(user_id),
            TaskOwner::List { list_id } => self.list_tasks.get_mut(list_id),
        }?;
        collection.get_mut(task_id).filter(|t| !t.deleted)
    }
}

/// In-memory [`TaskStore`] with an optional JSON snapshot on disk.
pub struct MemoryStore {
    data: RwLock<Collections>,
    snapshot_path: Option<PathBuf>,
    /// Held for the whole of a mutation, so changes apply one at a time.
    commit_lock: tokio::sync::Mutex<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty, memory-only store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Collections::default()),
            snapshot_path: None,
            commit_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Opens a store backed by the snapshot at `path`.
    ///
    /// A missing file starts an empty store; the file is created on the
    /// first mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be read or parsed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let data = match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::default(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        tracing::info!(path = %path.display(), "document store opened");
        Ok(Self {
            data: RwLock::new(data),
            snapshot_path: Some(path.to_path_buf()),
            commit_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Runs `change` and publishes its result.
    ///
    /// `change` returns its value and whether it modified anything. With a
    /// snapshot path the change runs on a copy, and the copy replaces the
    /// live data only after it has been written. A failed write leaves the
    /// store as it was.
    async fn commit<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        T: Send,
        F: FnOnce(&mut Collections) -> Result<(T, bool), StoreError> + Send,
    {
        let _guard = self.commit_lock.lock().await;
        let Some(path) = &self.snapshot_path else {
            return change(&mut self.data.write()).map(|(value, _)| value);
        };

        let mut next = self.data.read().clone();
        let (value, dirty) = change(&mut next)?;
        if dirty {
            write_snapshot(path, &next).await?;
            *self.data.write() = next;
        }
        Ok(value)
    }
}

/// Writes `data` to a temporary file next to `path`, then renames it over.
async fn write_snapshot(path: &Path, data: &Collections) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp, json).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

fn build_task(new: NewTask, now: chrono::DateTime<Utc>) -> Task {
    Task {
        id: Uuid::now_v7().to_string(),
        title: new.title,
        description: new.description,
        assignee: new.assignee,
        due_date: new.due_date,
        status: new.status,
        deleted: false,
        created_at: now,
        updated_at: None,
        deleted_at: None,
        source: new.source,
        list_id: new.list_id,
        list_name: new.list_name,
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_tasks(
        &self,
        owner: &TaskOwner,
        tasks: Vec<NewTask>,
    ) -> Result<Vec<Task>, StoreError> {
        self.commit(|data| {
            if let TaskOwner::List { list_id } = owner {
                if data.live_list(list_id).is_none() {
                    return Err(StoreError::ListNotFound(list_id.clone()));
                }
            }
            let now = Utc::now();
            let collection = data.collection_mut(owner);
            let inserted: Vec<Task> = tasks
                .into_iter()
                .map(|new| {
                    let task = build_task(new, now);
                    collection.insert(task.id.clone(), task.clone());
                    task
                })
                .collect();
            let dirty = !inserted.is_empty();
            Ok((inserted, dirty))
        })
        .await
    }

    async fn get_task(&self, owner: &TaskOwner, task_id: &str) -> Result<Option<Task>, StoreError> {
        let data = self.data.read();
        Ok(data
            .collection(owner)
            .and_then(|c| c.get(task_id))
            .filter(|t| !t.deleted)
            .cloned())
    }

    async fn update_task(
        &self,
        owner: &TaskOwner,
        task_id: &str,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        self.commit(|data| {
            let updated = data.live_task_mut(owner, task_id).map(|task| {
                patch.apply(task);
                task.updated_at = Some(Utc::now());
                task.clone()
            });
            let dirty = updated.is_some();
            Ok((updated, dirty))
        })
        .await
    }

    async fn delete_task(&self, owner: &TaskOwner, task_id: &str) -> Result<bool, StoreError> {
        self.commit(|data| {
            let deleted = data.live_task_mut(owner, task_id).is_some_and(|task| {
                task.deleted = true;
                task.deleted_at = Some(Utc::now());
                true
            });
            Ok((deleted, deleted))
        })
        .await
    }

    async fn tasks(&self, owner: &TaskOwner, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let data = self.data.read();
        Ok(data
            .collection(owner)
            .map(|c| {
                c.values()
                    .filter(|t| !t.deleted)
                    .filter(|t| query.assignee.as_ref().is_none_or(|a| &t.assignee == a))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_list(&self, list: NewList) -> Result<SharedList, StoreError> {
        let created = SharedList {
            id: Uuid::now_v7().to_string(),
            name: list.name,
            owner_id: list.owner_id,
            members: [list.owner_key].into_iter().collect(),
            pending_invites: std::collections::BTreeSet::new(),
            deleted: false,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.commit(|data| {
            data.lists.insert(created.id.clone(), created.clone());
            Ok((created, true))
        })
        .await
    }

    async fn get_list(&self, list_id: &str) -> Result<Option<SharedList>, StoreError> {
        Ok(self.data.read().live_list(list_id).cloned())
    }

    async fn lists_for_member(&self, member: &str) -> Result<Vec<SharedList>, StoreError> {
        let data = self.data.read();
        Ok(data
            .lists
            .values()
            .filter(|l| !l.deleted && l.is_member(member))
            .cloned()
            .collect())
    }

    async fn lists_inviting(&self, member: &str) -> Result<Vec<SharedList>, StoreError> {
        let data = self.data.read();
        Ok(data
            .lists
            .values()
            .filter(|l| !l.deleted && l.has_pending_invite(member))
            .cloned()
            .collect())
    }

    async fn add_invite(&self, list_id: &str, invitee: &str) -> Result<bool, StoreError> {
        self.commit(|data| {
            let list = data
                .live_list_mut(list_id)
                .ok_or_else(|| StoreError::ListNotFound(list_id.to_string()))?;
            if list.is_member(invitee) {
                return Ok((false, false));
            }
            list.pending_invites.insert(invitee.to_string());
            Ok((true, true))
        })
        .await
    }

    async fn accept_invite(&self, list_id: &str, member: &str) -> Result<bool, StoreError> {
        self.commit(|data| {
            let list = data
                .live_list_mut(list_id)
                .ok_or_else(|| StoreError::ListNotFound(list_id.to_string()))?;
            if !list.pending_invites.remove(member) {
                return Ok((false, false));
            }
            list.members.insert(member.to_string());
            Ok((true, true))
        })
        .await
    }

    async fn delete_list(&self, list_id: &str) -> Result<bool, StoreError> {
        self.commit(|data| {
            let deleted = data.live_list_mut(list_id).is_some_and(|list| {
                list.deleted = true;
                list.deleted_at = Some(Utc::now());
                true
            });
            Ok((deleted, deleted))
        })
        .await
    }
}
