use crate::commands;
use crate::config::Config;
use crate::error::{error_response, AppError, INTERNAL_ERROR_MESSAGE};
use crate::models::{FeedbackUpdate, NewFeedback, Resource, ResourceFilter};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{Map, Value};
use std::any::Any;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

type Body<T> = Result<Json<T>, JsonRejection>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/resources", get(list_resources).post(create_resource))
        .route(
            "/resources/:id",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .route("/resources/:id/feedback", post(create_feedback))
        .route(
            "/resources/:id/feedback/:feedback_id",
            put(update_feedback).delete(delete_feedback),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(
    config: &Config,
    app_state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(app_state);

    let address = config.address();
    let listener = TcpListener::bind(&address).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn list_resources(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<Resource>>, AppError> {
    let Query(pairs) = query?;
    let filter = ResourceFilter::from_pairs(pairs);
    commands::list_resources(&state, &filter).map(Json)
}

async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Resource>, AppError> {
    commands::get_resource(&state, &id).map(Json)
}

async fn create_resource(
    State(state): State<AppState>,
    payload: Body<Map<String, Value>>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let resource = commands::create_resource(&state, payload)?;

    Ok((StatusCode::CREATED, Json(resource)))
}

async fn update_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    patch: Body<Map<String, Value>>,
) -> Result<Json<Resource>, AppError> {
    let Json(patch) = patch?;
    commands::update_resource(&state, &id, patch).map(Json)
}

async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    commands::delete_resource(&state, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_feedback(
    State(state): State<AppState>,
    Path(resource_id): Path<String>,
    payload: Body<NewFeedback>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let feedback = commands::create_feedback(
        &state,
        &resource_id,
        payload.feedback_text.as_deref(),
        payload.user_id,
    )?;

    Ok((StatusCode::CREATED, Json(feedback)))
}

async fn update_feedback(
    State(state): State<AppState>,
    Path((resource_id, feedback_id)): Path<(String, String)>,
    payload: Body<FeedbackUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let feedback = commands::update_feedback(
        &state,
        &resource_id,
        &feedback_id,
        payload.feedback_text.as_deref(),
    )?;

    Ok(Json(feedback))
}

async fn delete_feedback(
    State(state): State<AppState>,
    Path((resource_id, feedback_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    commands::delete_feedback(&state, &resource_id, &feedback_id)?;
    Ok(StatusCode::NO_CONTENT)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {detail}");

    error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
