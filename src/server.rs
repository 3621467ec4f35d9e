//! GraphQL HTTP server.

use std::future::Future;

use async_graphql::http::GraphiQLSource;
use async_graphql::{ErrorExtensions, Pos, Request, Response};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::auth;
use crate::config::{AuthConfig, ServerConfig};
use crate::schema::{prepare_request, TrackerSchema};
use crate::store::Stores;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub schema: TrackerSchema,
    pub stores: Stores,
    pub auth: AuthConfig,
}

/// Routes for `/graphql`, `/health` and, when enabled, the GraphiQL page.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let mut app = Router::new().route("/health", get(health_check));

    app = if config.enable_playground {
        app.route("/graphql", get(graphql_playground).post(graphql_handler))
            .route("/", get(graphql_playground))
    } else {
        app.route("/graphql", axum::routing::post(graphql_handler))
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the GraphQL server with graceful shutdown support.
pub async fn serve_with_shutdown<F>(
    state: AppState,
    config: ServerConfig,
    shutdown_signal: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, playground = config.enable_playground, "GraphQL server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    debug!("Server stopped");
    Ok(())
}

/// GraphQL query handler.
///
/// Resolves the bearer token, if any, and attaches the viewer and fresh
/// loaders before executing. A failing user lookup answers with an
/// `INTERNAL_SERVER_ERROR` instead of running the request anonymously.
pub async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: Json<Request>,
) -> Json<Response> {
    let viewer = match auth::authenticate(&headers, &state.stores, &state.auth).await {
        Ok(viewer) => viewer,
        Err(e) => {
            error!(error = %e, "Viewer lookup failed");
            return Json(Response::from_errors(vec![
                e.extend().into_server_error(Pos::default())
            ]));
        }
    };
    let request = prepare_request(req.0, &state.stores, viewer);

    let response = state.schema.execute(request).await;

    Json(response)
}

/// GraphQL Playground UI.
async fn graphql_playground() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
