use anyhow::Result;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::error;

use crate::movie_store::{MovieStore, NewMovie, StoreError};
use tower_http::services::ServeDir;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{log_requests, state::*, RequestsLoggingLevel, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct CreateMovieBody {
    pub title: Option<String>,
    pub rating: Option<i64>,
    pub runtime_min: Option<i64>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    pub director: Option<String>,
}

fn validation_error(field: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "errors": { field: [message] } })),
    )
        .into_response()
}

fn not_found(movie_id: i64) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": format!("Movie {} not found", movie_id) })),
    )
        .into_response()
}

fn store_failure(err: StoreError) -> Response {
    error!("Movie store failure: {}", err);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "detail": "Movie store unavailable" })),
    )
        .into_response()
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        hash: state.hash.clone(),
    };
    Json(stats)
}

async fn list_movies(State(store): State<GuardedMovieStore>) -> Response {
    match store.list_movies() {
        Ok(movies) => Json(movies).into_response(),
        Err(err) => store_failure(err),
    }
}

async fn create_movie(
    State(store): State<GuardedMovieStore>,
    Json(body): Json<CreateMovieBody>,
) -> Response {
    let title = match body.title {
        None => return validation_error("title", "This field is required."),
        Some(title) if title.trim().is_empty() => {
            return validation_error("title", "This field may not be blank.")
        }
        Some(title) => title,
    };

    let new = NewMovie {
        title,
        rating: body.rating,
        runtime_min: body.runtime_min,
        genres: body.genre,
        actors: body.actors,
        directors: body.director.into_iter().collect(),
    };

    match store.create_movie(&new) {
        Ok(details) => (StatusCode::CREATED, Json(details)).into_response(),
        Err(StoreError::EmptyTitle) => validation_error("title", "This field may not be blank."),
        Err(err) => store_failure(err),
    }
}

async fn get_movie(State(store): State<GuardedMovieStore>, Path(id): Path<i64>) -> Response {
    match store.get_movie(id) {
        Ok(Some(details)) => Json(details).into_response(),
        Ok(None) => not_found(id),
        Err(err) => store_failure(err),
    }
}

async fn delete_movie(State(store): State<GuardedMovieStore>, Path(id): Path<i64>) -> Response {
    match store.delete_movie(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(StoreError::MovieNotFound(id)) => not_found(id),
        Err(err) => store_failure(err),
    }
}

impl ServerState {
    fn new(config: ServerConfig, store: Arc<MovieStore>) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            store,
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(config: ServerConfig, store: Arc<MovieStore>) -> Result<Router> {
    let state = ServerState::new(config.clone(), store);

    let movie_routes: Router = Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/{id}", get(get_movie).delete(delete_movie))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .merge(movie_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    store: Arc<MovieStore>,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    frontend_dir_path: Option<String>,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
        frontend_dir_path,
    };
    let app = make_app(config, store)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let store = Arc::new(MovieStore::open_in_memory().unwrap());
        make_app(ServerConfig::default(), store).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn empty_catalog_lists_no_movies() {
        let app = test_app();
        let request = Request::builder()
            .uri("/movies")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn create_returns_created_with_flattened_relations() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/movies")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "title": "Inception",
                    "rating": 9,
                    "runtime_min": 148,
                    "genre": ["Sci-Fi"],
                    "actors": ["Leonardo DiCaprio"],
                    "director": "Christopher Nolan",
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["title"], "Inception");
        assert_eq!(body["genre"], json!(["Sci-Fi"]));
        assert_eq!(body["director"], "Christopher Nolan");
    }

    #[tokio::test]
    async fn create_without_title_is_bad_request() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/movies")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "rating": 5 }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"]["title"], json!(["This field is required."]));
    }

    #[tokio::test]
    async fn create_with_blank_title_is_bad_request() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/movies")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "title": "  " }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["errors"]["title"],
            json!(["This field may not be blank."])
        );
    }

    #[tokio::test]
    async fn unknown_movie_is_not_found() {
        let app = test_app();
        let request = Request::builder()
            .uri("/movies/123")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "detail": "Movie 123 not found" })
        );
    }

    #[tokio::test]
    async fn delete_unknown_movie_is_not_found() {
        let app = test_app();
        let request = Request::builder()
            .method("DELETE")
            .uri("/movies/7")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn home_reports_server_stats() {
        let app = test_app();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["uptime"].is_string());
        assert!(body["version"].is_string());
        assert!(body["hash"].is_string());
    }
}
