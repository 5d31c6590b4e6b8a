use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::auth::User;
use crate::entities::{Award, Session, TransportRequest};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct WinnerParams {
    bid_id: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct TransportRequestParams {
    #[serde(default)]
    message: Option<String>,
}

pub async fn select_winner(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(session_id): Path<Uuid>,
    Json(params): Json<WinnerParams>,
) -> Result<Json<Session>, Error> {
    let session = api.select_winner(user, session_id, params.bid_id).await?;

    Ok(session.into())
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(session_id): Path<Uuid>,
    Json(params): Json<WinnerParams>,
) -> Result<Json<Award>, Error> {
    let award = api.accept_bid(user, session_id, params.bid_id).await?;

    Ok(award.into())
}

pub async fn retry_assignment(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Award>, Error> {
    let award = api.retry_assignment(user, session_id).await?;

    Ok(award.into())
}

pub async fn transport_request(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(bid_id): Path<Uuid>,
    Json(params): Json<TransportRequestParams>,
) -> Result<Json<TransportRequest>, Error> {
    let request = api
        .send_transport_request(user, bid_id, params.message)
        .await?;

    Ok(request.into())
}
