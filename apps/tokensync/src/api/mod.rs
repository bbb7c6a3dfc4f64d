//! # Relay HTTP API Module
//!
//! This module implements the relay HTTP API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /publish-tokens` - Publish a token payload into a project target
//! - `GET /live-tokens` - Read the currently published token file
//! - `GET /version-history` - List published versions
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `TOKENSYNC_PROJECTS`: JSON map of project id to project config
//! - `TOKENSYNC_CORS_ORIGINS`: comma-separated allowed origins, or "*" (default: localhost only)
//! - `TOKENSYNC_RATE_LIMIT`: requests per second (default: 100, 0 to disable)
//! - `TOKENSYNC_GITHUB_TOKEN`: fallback token for GitHub-backed projects

mod auth;
mod github;
mod handlers;
mod middleware;
mod types;

pub use auth::verify_publish_key;
pub use github::{GitHubClient, GitHubTarget};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    ErrorResponse, HealthResponse, ProjectQuery, PublishTokensRequest, PublishTokensResponse,
    VersionHistoryResponse, VersionItem,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokensync_core::TokenSyncError;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// PROJECT CONFIGURATION
// =============================================================================

/// One relay project: a publish key plus a write target. The target is
/// either a local directory (`localPath`) or a GitHub repository.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub publish_key: String,
    #[serde(default)]
    pub local_path: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub github_token: Option<String>,
    /// Project-wide target file path.
    #[serde(default)]
    pub path: Option<String>,
    /// Per-environment target file paths, taking precedence over `path`.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

impl ProjectConfig {
    /// Target file path for an environment: the per-environment entry, else
    /// the project path, else `tokens.json`.
    #[must_use]
    pub fn target_path(&self, environment: &str) -> String {
        if let Some(env_path) = self.paths.get(environment) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
        if let Some(path) = &self.path {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
        "tokens.json".to_string()
    }

    /// Local directory root when this project writes to the filesystem.
    #[must_use]
    pub fn local_root(&self) -> Option<&str> {
        self.local_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }

    /// GitHub target for an environment, when fully configured.
    pub fn github_target(
        &self,
        environment: &str,
        fallback_token: Option<&str>,
    ) -> Result<GitHubTarget, TokenSyncError> {
        let token = self
            .github_token
            .as_deref()
            .or(fallback_token)
            .unwrap_or_default();
        let (Some(owner), Some(repo)) = (self.owner.as_deref(), self.repo.as_deref()) else {
            return Err(TokenSyncError::Config(
                "Project target is incomplete. Configure either localPath or GitHub owner/repo/token."
                    .to_string(),
            ));
        };
        if token.is_empty() {
            return Err(TokenSyncError::Config(
                "Project target is incomplete. Configure either localPath or GitHub owner/repo/token."
                    .to_string(),
            ));
        }
        Ok(GitHubTarget {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: self.branch.clone().unwrap_or_else(|| "main".to_string()),
            path: self.target_path(environment),
            token: token.to_string(),
        })
    }
}

/// Parse `TOKENSYNC_PROJECTS`; malformed or missing config is an empty map.
#[must_use]
pub fn parse_projects_from_env() -> BTreeMap<String, ProjectConfig> {
    let Ok(raw) = std::env::var("TOKENSYNC_PROJECTS") else {
        return BTreeMap::new();
    };
    serde_json::from_str(&raw).unwrap_or_default()
}

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: project registry plus the GitHub client.
#[derive(Clone)]
pub struct AppState {
    pub projects: Arc<BTreeMap<String, ProjectConfig>>,
    pub github: GitHubClient,
    pub github_token: Option<String>,
    /// Serializes local-directory writes across concurrent publishes.
    pub local_guard: Arc<Mutex<()>>,
}

impl AppState {
    #[must_use]
    pub fn new(projects: BTreeMap<String, ProjectConfig>, github_token: Option<String>) -> Self {
        Self {
            projects: Arc::new(projects),
            github: GitHubClient::new(),
            github_token,
            local_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Build state from `TOKENSYNC_PROJECTS` and `TOKENSYNC_GITHUB_TOKEN`.
    #[must_use]
    pub fn from_env() -> Self {
        let projects = parse_projects_from_env();
        if projects.is_empty() {
            tracing::warn!(
                "No projects configured. Set TOKENSYNC_PROJECTS to accept publishes."
            );
        }
        let github_token = std::env::var("TOKENSYNC_GITHUB_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());
        Self::new(projects, github_token)
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from `TOKENSYNC_CORS_ORIGINS`.
///
/// - `*` allows all origins (development mode)
/// - unset defaults to localhost only
/// - otherwise a comma-separated allow list
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("TOKENSYNC_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (TOKENSYNC_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in TOKENSYNC_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No TOKENSYNC_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Restrictive CORS layer allowing only localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8787".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8787".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Rate Limiting - global quota (if enabled)
///
/// Publish keys are verified inside the publish handler against the
/// per-project configuration, not by a bearer middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/publish-tokens", post(handlers::publish_handler))
        .route("/live-tokens", get(handlers::live_tokens_handler))
        .route("/version-history", get(handlers::version_history_handler));

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the relay HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), TokenSyncError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TokenSyncError::Io(format!("Bind failed: {e}")))?;

    tracing::info!("tokensync relay listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| TokenSyncError::Io(format!("Server error: {e}")))
}

// =============================================================================
// TESTS
// =============================================================================
