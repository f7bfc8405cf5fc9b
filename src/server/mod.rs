pub mod dto;
pub mod error;
pub mod routes;
pub mod state;


pub use state::AppState;

use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid CORS origin {0:?}")]
    InvalidOrigin(String),
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/medlife/ask_ai/", get(routes::ask::ask_ai))
        .route("/medlife/prompt/", get(routes::ask::prompt))
        .route("/medlife/addmember", post(routes::members::add_member))
        .route("/medlife/editmember", post(routes::members::edit_member))
        .route("/medlife/getmember", get(routes::members::get_members))
        .route("/medlife/deletemember", delete(routes::members::delete_member))
        .route(
            "/api/member-details/{email}/{member_index}",
            get(routes::members::member_details),
        )
        .route("/medlife/tokens/", get(routes::members::increment_tokens))
        .route("/medlife/tokensCount/", get(routes::members::token_count))
        .route("/api/get-user-gender", get(routes::members::user_gender))
        .route("/medlife/fetchChat/", get(routes::chat::fetch_chat))
        .route("/medlife/saveChat/", post(routes::chat::save_chat))
        .route("/api/keys/encrypt", post(routes::keys::encrypt_key))
        .with_state(state)
}

pub fn cors_layer(origin: &str) -> Result<CorsLayer, ServerError> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|_| ServerError::InvalidOrigin(origin.to_string()))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([routes::ask::OUTCOME_HEADER]))
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr, cors_origin: &str) -> Result<(), ServerError> {
    info!("Binding HTTP server on {}", addr);
    let app = router(state).layer(cors_layer(cors_origin)?);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!("HTTP server ready on {} (CORS origin {})", addr, cors_origin);

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(ServerError::Serve)
}
