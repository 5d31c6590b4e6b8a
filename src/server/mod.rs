mod handlers;
mod identity;


use std::net::SocketAddr;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::DynAPI;
use crate::error::{unexpected_error, Error};
use crate::server::handlers::{awards, bids, realtime, sessions};

pub use identity::{USER_ID_HEADER, USER_ROLES_HEADER};

pub fn routes(api: DynAPI) -> Router {
    Router::new()
        .route("/sessions", post(sessions::create).get(sessions::list))
        .route("/sessions/:id", get(sessions::find))
        .route("/sessions/:id/close", patch(sessions::close))
        .route("/sessions/:id/extend", patch(sessions::extend))
        .route("/sessions/:id/bids", get(bids::list).put(bids::place))
        .route("/sessions/:id/winner", patch(awards::select_winner))
        .route("/sessions/:id/accept", patch(awards::accept))
        .route(
            "/sessions/:id/assignment/retry",
            patch(awards::retry_assignment),
        )
        .route("/loads/:id/session", get(sessions::find_by_load))
        .route("/bids/:id/transport_request", post(awards::transport_request))
        .route("/realtime", get(realtime::connect))
        .layer(Extension(api))
}

pub async fn serve(api: DynAPI, addr: SocketAddr) -> Result<(), Error> {
    let app = routes(api);

    let server = axum::Server::try_bind(&addr).map_err(|err| {
        tracing::error!("failed to bind {}: {}", addr, err);
        unexpected_error()
    })?;

    tracing::info!("listening on {}", addr);

    server
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server stopped: {}", err);
            unexpected_error()
        })
}
