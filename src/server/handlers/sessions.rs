use axum::extract::{Extension, Json, Path, Query};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{DynAPI, NewSession, SessionFilter};
use crate::auth::User;
use crate::entities::Session;
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct ExtendParams {
    end_time: DateTime<Utc>,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<NewSession>,
) -> Result<Json<Session>, Error> {
    let session = api.create_session(user, params).await?;

    Ok(session.into())
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    user: User,
    Query(filter): Query<SessionFilter>,
) -> Result<Json<Vec<Session>>, Error> {
    let sessions = api.active_sessions(user, filter).await?;

    Ok(sessions.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, Error> {
    let session = api.find_session(user, id).await?;

    Ok(session.into())
}

pub async fn find_by_load(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(load_id): Path<Uuid>,
) -> Result<Json<Session>, Error> {
    let session = api.find_session_by_load(user, load_id).await?;

    Ok(session.into())
}

pub async fn close(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, Error> {
    let session = api.close_session(user, id).await?;

    Ok(session.into())
}

pub async fn extend(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<ExtendParams>,
) -> Result<Json<Session>, Error> {
    let session = api.extend_session(user, id, params.end_time).await?;

    Ok(session.into())
}
