use axum::extract::{Extension, Json, Path};
use uuid::Uuid;

use crate::api::{BidParams, DynAPI};
use crate::auth::User;
use crate::entities::Bid;
use crate::error::Error;

pub async fn list(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<Bid>>, Error> {
    let bids = api.find_bids(user, session_id).await?;

    Ok(bids.into())
}

pub async fn place(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(session_id): Path<Uuid>,
    Json(params): Json<BidParams>,
) -> Result<Json<Bid>, Error> {
    let bid = api.place_bid(user, session_id, params).await?;

    Ok(bid.into())
}
