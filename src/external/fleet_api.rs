use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Assignment, Load, TransportRequest};
use crate::error::{
    invalid_input_error, missing_reference_error, not_found_error, upstream_error, Error,
};

use super::Fleet;

/// HTTP client for the fleet service that owns loads and vehicles.
#[derive(Clone, Debug)]
pub struct FleetApi {
    client: reqwest::Client,
    api_base: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct LoadResponse {
    #[serde(alias = "_id")]
    id: Uuid,
    owner_id: Option<Uuid>,
    #[serde(default)]
    load_owner_id: Option<Uuid>,
}

impl FleetApi {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

fn check_status(res: &Response) -> Result<(), Error> {
    let status = res.status();

    if status == StatusCode::NOT_FOUND {
        return Err(not_found_error());
    } else if status.is_client_error() {
        return Err(invalid_input_error());
    } else if !status.is_success() {
        return Err(upstream_error());
    }

    Ok(())
}

#[async_trait]
impl Fleet for FleetApi {
    #[tracing::instrument(skip(self))]
    async fn find_load(&self, load_id: Uuid) -> Result<Load, Error> {
        let res = self
            .client
            .get(self.url(&format!("/loads/{}", load_id)))
            .send()
            .await?;

        check_status(&res)?;

        let data: LoadResponse = res.json().await?;

        // older load documents carry the owner under a different key
        let owner_id = data
            .owner_id
            .or(data.load_owner_id)
            .ok_or_else(missing_reference_error)?;

        Ok(Load {
            id: data.id,
            owner_id,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn assign(&self, assignment: &Assignment) -> Result<(), Error> {
        let res = self
            .client
            .patch(self.url(&format!("/loads/{}/assignment", assignment.load_id)))
            .json(assignment)
            .send()
            .await?;

        check_status(&res)
    }

    #[tracing::instrument(skip(self))]
    async fn send_transport_request(&self, request: &TransportRequest) -> Result<(), Error> {
        let res = self
            .client
            .post(self.url("/transport_requests"))
            .json(request)
            .send()
            .await?;

        check_status(&res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_is_normalised() {
        let api = FleetApi::new("http://fleet.internal/");

        assert_eq!(api.url("/loads/1"), "http://fleet.internal/loads/1");
    }

    #[test]
    fn load_response_accepts_either_owner_key() {
        let id = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let data: LoadResponse = serde_json::from_value(serde_json::json!({
            "_id": id.to_string(),
            "load_owner_id": owner.to_string(),
        }))
        .unwrap();

        assert_eq!(data.id, id);
        assert_eq!(data.owner_id.or(data.load_owner_id), Some(owner));
    }
}
