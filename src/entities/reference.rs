use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{missing_reference_error, Error};

/// A reference to an external entity, either by id or as an embedded document
/// as some clients send it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Id(Uuid),
    Embedded(Embedded),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Embedded {
    #[serde(default, alias = "_id")]
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Reference {
    pub fn id(&self) -> Result<Uuid, Error> {
        match self {
            Self::Id(id) => Ok(*id),
            Self::Embedded(Embedded { id: Some(id), .. }) => Ok(*id),
            Self::Embedded(Embedded { id: None, .. }) => Err(missing_reference_error()),
        }
    }
}

impl From<Uuid> for Reference {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}
