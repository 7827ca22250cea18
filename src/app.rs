use std::net::SocketAddr;
use std::sync::atomic::Ordering;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{Html, Response},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{auth, chirps, config::AppConfig, state::AppState, users};

pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(chirps::router())
        .route("/healthz", get(healthz))
        .route("/reset", get(reset_hits).post(reset_hits));

    let files = Router::new()
        .nest_service("/app", ServeDir::new(&state.config.fileserver_root))
        .layer(middleware::from_fn_with_state(state.clone(), count_hits));

    Router::new()
        .nest("/api", api)
        .route("/admin/metrics", get(metrics))
        .merge(files)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> Html<String> {
    let hits = state.hits.load(Ordering::Relaxed);
    Html(format!(
        "<html>\n\n<body>\n    <h1>Welcome, Chirpy Admin</h1>\n    <p>Chirpy has been visited {hits} times!</p>\n</body>\n\n</html>"
    ))
}

async fn reset_hits(State(state): State<AppState>) -> &'static str {
    state.hits.store(0, Ordering::Relaxed);
    "Hits reset to 0"
}

async fn count_hits(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}
