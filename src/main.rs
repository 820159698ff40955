use std::{sync::Arc, time::Duration};

use axum::{
    extract::{self},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use sysinfo::{CpuExt, System, SystemExt};
use tokio::time;

use sqlgrade::{
    config, core::ErrorKind, lesson::Lesson, metrics, util::SimpleLogger, AuditFinding,
    QueryResult, SQLError, Session, SessionContext, ValidationResult,
};

static LOGGER: SimpleLogger = SimpleLogger;

struct AppState {
    session: Arc<Session>,
    timeout: Duration,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn status_of(err: &SQLError) -> StatusCode {
    match err.kind {
        ErrorKind::InputError => StatusCode::NOT_FOUND,
        ErrorKind::PolicyViolation | ErrorKind::ExecutionError => StatusCode::BAD_REQUEST,
        ErrorKind::ResourceError | ErrorKind::ConfigError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Runs an engine call off the async executor under the configured deadline.
/// A call that outlives the deadline keeps running and still releases its
/// handles when it finishes.
async fn run_engine<T, F>(state: &AppState, call: F) -> Result<Json<T>, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Session) -> Result<T, SQLError> + Send + 'static,
{
    let session = state.session.clone();
    let task = tokio::task::spawn_blocking(move || call(session.as_ref()));
    match time::timeout(state.timeout, task).await {
        Err(_) => {
            warn!("Engine call exceeded {:?}", state.timeout);
            Err(api_error(StatusCode::GATEWAY_TIMEOUT, "Query timed out"))
        }
        Ok(Err(join_err)) => {
            error!("Engine task failed: {join_err}");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
        Ok(Ok(Err(err))) => Err(api_error(status_of(&err), err.message)),
        Ok(Ok(Ok(value))) => Ok(Json(value)),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    lesson_id: String,
    exercise_id: String,
    #[serde(default)]
    query: String,
}

async fn validate(
    extract::State(state): extract::State<Arc<AppState>>,
    extract::Json(request): extract::Json<ValidateRequest>,
) -> Result<Json<ValidationResult>, ApiError> {
    run_engine(&state, move |session| {
        session.validate(&request.lesson_id, &request.exercise_id, &request.query)
    })
    .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    lesson_id: String,
    #[serde(default)]
    query: String,
}

async fn run_query(
    extract::State(state): extract::State<Arc<AppState>>,
    extract::Json(request): extract::Json<QueryRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    run_engine(&state, move |session| {
        session.run_query(&request.lesson_id, &request.query)
    })
    .await
}

async fn list_lessons(
    extract::State(state): extract::State<Arc<AppState>>,
) -> Result<Json<Vec<Lesson>>, ApiError> {
    run_engine(&state, |session| session.lessons()).await
}

async fn get_lesson(
    extract::State(state): extract::State<Arc<AppState>>,
    extract::Path(lesson_id): extract::Path<String>,
) -> Result<Json<Lesson>, ApiError> {
    run_engine(&state, move |session| session.lesson(&lesson_id)).await
}

async fn audit_lesson(
    extract::State(state): extract::State<Arc<AppState>>,
    extract::Path(lesson_id): extract::Path<String>,
) -> Result<Json<Vec<AuditFinding>>, ApiError> {
    run_engine(&state, move |session| session.audit_lesson(&lesson_id)).await
}

async fn ping() -> &'static str {
    "pong"
}

async fn metrics_handler() -> String {
    metrics::render()
}

#[tokio::main]
pub async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./config.toml".to_string());
    let config = match config::initialize_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) =
        log::set_logger(&LOGGER).map(|()| log::set_max_level(config.log.level_filter()))
    {
        eprintln!("cannot install logger: {e}");
    }

    let mut sys = System::new();
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            sys.refresh_all();
            metrics::CPU.set(sys.global_cpu_info().cpu_usage() as i64);
            metrics::MEMORY.set(sys.used_memory() as i64);
        }
    });

    let session = Arc::new(Session::new(SessionContext::from_config(config)));
    let app_state = AppState {
        session,
        timeout: config.validation.timeout(),
    };

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/ping", get(ping))
        .route("/lessons", get(list_lessons))
        .route("/lessons/:id", get(get_lesson))
        .route("/lessons/:id/audit", get(audit_lesson))
        .route("/validate", post(validate))
        .route("/query", post(run_query))
        .with_state(Arc::new(app_state));

    let http_addr = config.server.address.as_str();
    let listener = match tokio::net::TcpListener::bind(http_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot bind {}: {}", http_addr, e);
            std::process::exit(1);
        }
    };
    info!(
        "HTTP listening to {}, lessons from {}, datasets in {}",
        http_addr,
        config.storage.content_dir.display(),
        config.storage.data_dir.display()
    );
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server stopped: {}", e);
    }
}
