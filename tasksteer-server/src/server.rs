//! Router assembly, shared state and the listener lifecycle.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ai::TaskModel;
use crate::auth::{self, TokenVerifier};
use crate::error::ApiError;
use crate::handlers;
use crate::store::TaskStore;

/// Default upload limit (16 MiB).
const DEFAULT_MAX_UPLOAD_SIZE: usize = 16 * 1024 * 1024;

/// How far a compressed upload may inflate, relative to the upload limit.
const MAX_DOCUMENT_EXPANSION: usize = 4;

/// State shared by every handler.
pub struct AppState {
    /// Document store for tasks and lists.
    pub store: Arc<dyn TaskStore>,
    /// Resolves bearer tokens to identities.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Generative model, absent when no API key is configured.
    pub model: Option<Arc<dyn TaskModel>>,
    /// Browser origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Largest accepted `/upload` body in bytes.
    pub max_upload_size: usize,
}

impl AppState {
    /// Creates state without a model and with no CORS origins.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            store,
            verifier,
            model: None,
            cors_origins: Vec::new(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn TaskModel>) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    #[must_use]
    pub const fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }

    /// Largest decompressed document body accepted from an upload.
    #[must_use]
    pub const fn max_document_size(&self) -> usize {
        self.max_upload_size.saturating_mul(MAX_DOCUMENT_EXPANSION)
    }

    /// The configured model.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ModelUnavailable`] when none is configured.
    pub fn model(&self) -> Result<&dyn TaskModel, ApiError> {
        self.model.as_deref().ok_or(ApiError::ModelUnavailable)
    }
}

/// CORS for the configured browser origins. Unparseable origins are
/// skipped with a warning.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Builds the full application router.
///
/// `/` and `/login` are public; every other route sits behind
/// [`auth::require_auth`].
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/suggest-status", post(handlers::status::suggest))
        .route(
            "/upload",
            post(handlers::upload::upload).layer(DefaultBodyLimit::max(state.max_upload_size)),
        )
        .route("/tasks", get(handlers::tasks::list_all))
        .route("/create-task", post(handlers::tasks::create))
        .route(
            "/update-personal-task/{task_id}",
            put(handlers::tasks::update_personal),
        )
        .route(
            "/update-shared-task/{list_id}/{task_id}",
            put(handlers::tasks::update_shared),
        )
        .route(
            "/delete-personal-task/{task_id}",
            delete(handlers::tasks::delete_personal),
        )
        .route(
            "/delete-shared-task/{list_id}/{task_id}",
            delete(handlers::tasks::delete_shared),
        )
        .route("/lists", get(handlers::lists::list_mine))
        .route("/lists/{list_id}/tasks", get(handlers::lists::list_tasks))
        .route("/create-list", post(handlers::lists::create))
        .route("/delete-list/{list_id}", delete(handlers::lists::delete))
        .route("/invite", post(handlers::lists::invite))
        .route("/invites", get(handlers::lists::invites))
        .route("/accept-invite", post(handlers::lists::accept_invite))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .route("/", get(handlers::status::index))
        .route("/login", post(handlers::status::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.cors_origins))
        .with_state(state)
}

/// Starts the HTTP server with a pre-built [`AppState`] and returns the
/// bound address and a join handle.
///
/// Binding `127.0.0.1:0` picks a free port, which is how the integration
/// tests run it.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "http server error");
        }
    });

    Ok((bound_addr, handle))
}
