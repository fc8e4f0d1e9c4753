//! `FovServer`: the streaming listener and the HTTP listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::{Method, StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use chrono::Utc;
use fov_core::{HelloMessage, Trajectory};
use fov_settings::FovSettings;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::directory::{DIRECTORY_PATH, StreamDirectory};
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::metrics::{DIRECTORY_REQUESTS_TOTAL, render};
use crate::shutdown::{LISTENER_GRACE, ShutdownCoordinator};
use crate::status::status_page;
use crate::websocket::registry::SessionRegistry;
use crate::websocket::session::{SessionContext, run_ws_session};

/// Shared state accessible from HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Static stream directory.
    pub directory: Arc<StreamDirectory>,
    /// Live streaming sessions.
    pub registry: Arc<SessionRegistry>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// Bound listeners and their serving tasks.
#[derive(Debug)]
pub struct ListenHandle {
    /// Local address of the streaming listener.
    pub stream_addr: SocketAddr,
    /// Local address of the HTTP listener.
    pub http_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl ListenHandle {
    /// The serving tasks, one per listener.
    pub fn into_tasks(self) -> Vec<JoinHandle<()>> {
        self.tasks
    }
}

/// The figure-8 stream server.
pub struct FovServer {
    settings: FovSettings,
    config: ServerConfig,
    trajectory: Arc<Trajectory>,
    directory: Arc<StreamDirectory>,
    registry: Arc<SessionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl FovServer {
    /// Create a server from resolved settings. The trajectory is built here,
    /// once, and shared by every session.
    pub fn new(settings: FovSettings) -> Self {
        let config = ServerConfig::from_settings(&settings);
        let trajectory = Arc::new(Trajectory::figure8(settings.stream.grid));
        let directory = Arc::new(StreamDirectory::from_settings(&settings));
        Self {
            settings,
            config,
            trajectory,
            directory,
            registry: Arc::new(SessionRegistry::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Router for the streaming listener: a `WebSocket` upgrade on `/`.
    pub fn stream_router(&self) -> Router {
        let stream = &self.settings.stream;
        let ctx = SessionContext {
            trajectory: Arc::clone(&self.trajectory),
            hello: HelloMessage::new(stream.name.clone(), stream.sport.clone(), stream.grid, stream.fps),
            timing: self.config.timing,
            registry: Arc::clone(&self.registry),
            shutdown: self.shutdown.token(),
        };

        Router::new()
            .route("/", get(ws_handler))
            .with_state(Arc::new(ctx))
    }

    /// Router for the HTTP listener: status page, directory, health, metrics.
    pub fn http_router(&self) -> Router {
        let state = AppState {
            directory: Arc::clone(&self.directory),
            registry: Arc::clone(&self.registry),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/", get(status_handler))
            .route(DIRECTORY_PATH, get(streams_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET, Method::HEAD]),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind both listeners and start serving.
    ///
    /// Both binds must succeed; if either fails nothing is served. Serving
    /// stops when [`shutdown`](Self::shutdown) is called.
    pub async fn listen(&self) -> Result<ListenHandle, ServerError> {
        let stream_addr = self.config.stream_addr();
        let http_addr = self.config.http_addr();
        let (stream_listener, http_listener) = tokio::try_join!(
            bind("stream", &stream_addr),
            bind("http", &http_addr)
        )?;
        let stream_local = stream_listener.local_addr()?;
        let http_local = http_listener.local_addr()?;

        let token = self.shutdown.token();
        let tasks = vec![
            tokio::spawn(serve("stream", stream_listener, self.stream_router(), token.clone())),
            tokio::spawn(serve("http", http_listener, self.http_router(), token)),
        ];

        info!(
            stream_addr = %stream_local,
            http_addr = %http_local,
            stream_url = self.directory.stream_url(),
            trajectory_len = self.trajectory.len(),
            "listeners bound"
        );
        Ok(ListenHandle {
            stream_addr: stream_local,
            http_addr: http_local,
            tasks,
        })
    }

    /// Stop both listeners and every streaming session.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Stop everything and wait for the listener tasks to finish.
    pub async fn shutdown_and_wait(&self, handle: ListenHandle) {
        let active = self.registry.count().await;
        info!(active_sessions = active, "shutting down");
        if !self
            .shutdown
            .stop_listeners(handle.into_tasks(), LISTENER_GRACE)
            .await
        {
            warn!("abandoning listeners that did not stop in time");
        }
    }

    /// Resolved settings.
    pub fn settings(&self) -> &FovSettings {
        &self.settings
    }

    /// Listener configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The shared trajectory.
    pub fn trajectory(&self) -> &Arc<Trajectory> {
        &self.trajectory
    }

    /// The stream directory.
    pub fn directory(&self) -> &Arc<StreamDirectory> {
        &self.directory
    }

    /// Live session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }
}

async fn bind(listener: &'static str, addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            listener,
            addr: addr.to_string(),
            source,
        })
}

async fn serve(name: &'static str, listener: TcpListener, router: Router, token: CancellationToken) {
    let app = router.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(token.cancelled_owned())
        .await
    {
        error!(listener = name, error = %e, "listener failed");
    }
    info!(listener = name, "listener stopped");
}

/// GET / on the streaming listener.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(ctx): State<Arc<SessionContext>>,
) -> Response {
    if ctx.shutdown.is_cancelled() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_failed_upgrade(move |e| warn!(%remote, error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            let _ = run_ws_session(socket, Some(remote), ctx).await;
        })
}

/// GET /
async fn status_handler(State(state): State<AppState>) -> Html<String> {
    Html(status_page(&state.directory))
}

/// GET /api/streams.json
async fn streams_handler(State(state): State<AppState>) -> Response {
    counter!(DIRECTORY_REQUESTS_TOTAL).increment(1);
    state.directory.response(Utc::now())
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let sessions = state.registry.count().await;
    Json(health::health_check(state.start_time, sessions))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(&handle),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
