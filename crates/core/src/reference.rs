//! Typed request for generation data.
//!
//! A [`GenerationDataReference`] names the thing whose generation
//! parameters the panel should load: one model version (optionally pinned
//! to a training epoch), a set of model versions, or any other platform
//! entity by type and id. It is immutable once built and serves both as the
//! HTTP query and as the memoization key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, MediaType};

/// Wire `type` for a single model version.
pub const TYPE_MODEL_VERSION: &str = "modelVersion";
/// Wire `type` for a list of model versions.
pub const TYPE_MODEL_VERSIONS: &str = "modelVersions";

/// What generation data to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawReference", into = "RawReference")]
pub enum GenerationDataReference {
    ModelVersion { id: DbId, epoch: Option<u32> },
    ModelVersions { ids: Vec<DbId> },
    /// Any other entity, e.g. `image`, `video`, `audio`, `post`.
    Entity { entity_type: String, id: DbId },
}

impl GenerationDataReference {
    pub fn model_version(id: DbId) -> Self {
        Self::ModelVersion { id, epoch: None }
    }

    pub fn model_version_epoch(id: DbId, epoch: u32) -> Self {
        Self::ModelVersion {
            id,
            epoch: Some(epoch),
        }
    }

    pub fn model_versions(ids: impl Into<Vec<DbId>>) -> Self {
        Self::ModelVersions { ids: ids.into() }
    }

    pub fn entity(entity_type: impl Into<String>, id: DbId) -> Self {
        Self::Entity {
            entity_type: entity_type.into(),
            id,
        }
    }

    /// The wire `type` discriminator.
    pub fn type_name(&self) -> &str {
        match self {
            Self::ModelVersion { .. } => TYPE_MODEL_VERSION,
            Self::ModelVersions { .. } => TYPE_MODEL_VERSIONS,
            Self::Entity { entity_type, .. } => entity_type,
        }
    }

    /// `Some` when the reference points at a piece of media that can be
    /// remixed (image, audio or video).
    pub fn media_kind(&self) -> Option<MediaType> {
        match self {
            Self::Entity { entity_type, .. } => entity_type
                .parse::<MediaType>()
                .ok()
                .filter(|m| m.is_remixable()),
            _ => None,
        }
    }

    /// Deterministic memoization key.
    ///
    /// | reference                  | key                          |
    /// |----------------------------|------------------------------|
    /// | `modelVersions [1, 2, 3]`  | `modelVersions_1_2_3`        |
    /// | `modelVersion 42`          | `modelVersion_42`            |
    /// | `modelVersion 42 epoch 3`  | `modelVersion_42_3`          |
    /// | `modelVersion 42 epoch 0`  | `modelVersion_42`            |
    /// | `image 7`                  | `image_7`                    |
    pub fn cache_key(&self) -> String {
        match self {
            Self::ModelVersions { ids } => {
                let joined: Vec<String> = ids.iter().map(ToString::to_string).collect();
                format!("{TYPE_MODEL_VERSIONS}_{}", joined.join("_"))
            }
            // Epoch 0 shares the bare key.
            Self::ModelVersion { id, epoch } => match epoch {
                Some(epoch) if *epoch != 0 => format!("{TYPE_MODEL_VERSION}_{id}_{epoch}"),
                _ => format!("{TYPE_MODEL_VERSION}_{id}"),
            },
            Self::Entity { entity_type, id } => format!("{entity_type}_{id}"),
        }
    }

    /// Query-string pairs for `GET /api/generation/data`.
    ///
    /// Lists are encoded as repeated keys (`ids=1&ids=2`).
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("type", self.type_name().to_string())];
        match self {
            Self::ModelVersion { id, epoch } => {
                pairs.push(("id", id.to_string()));
                if let Some(epoch) = epoch {
                    pairs.push(("epoch", epoch.to_string()));
                }
            }
            Self::ModelVersions { ids } => {
                pairs.extend(ids.iter().map(|id| ("ids", id.to_string())));
            }
            Self::Entity { id, .. } => pairs.push(("id", id.to_string())),
        }
        pairs
    }
}

impl fmt::Display for GenerationDataReference {
    /// Compact form accepted by [`FromStr`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelVersion { id, epoch: Some(epoch) } => {
                write!(f, "{TYPE_MODEL_VERSION}:{id}@{epoch}")
            }
            Self::ModelVersion { id, epoch: None } => write!(f, "{TYPE_MODEL_VERSION}:{id}"),
            Self::ModelVersions { ids } => {
                let joined: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "{TYPE_MODEL_VERSIONS}:{}", joined.join(","))
            }
            Self::Entity { entity_type, id } => write!(f, "{entity_type}:{id}"),
        }
    }
}

impl FromStr for GenerationDataReference {
    type Err = CoreError;

    /// Parse `modelVersion:42`, `modelVersion:42@3`, `modelVersions:1,2,3`
    /// or `<type>:<id>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s.split_once(':').ok_or_else(|| {
            CoreError::Validation(format!("Reference '{s}' must look like '<type>:<id>'"))
        })?;
        let kind = kind.trim();
        let rest = rest.trim();
        if kind.is_empty() {
            return Err(CoreError::Validation(format!(
                "Reference '{s}' is missing a type"
            )));
        }

        match kind {
            TYPE_MODEL_VERSION => match rest.split_once('@') {
                Some((id, epoch)) => Ok(Self::model_version_epoch(
                    parse_id(id)?,
                    epoch.trim().parse().map_err(|_| {
                        CoreError::Validation(format!("Invalid epoch '{epoch}'"))
                    })?,
                )),
                None => Ok(Self::model_version(parse_id(rest)?)),
            },
            TYPE_MODEL_VERSIONS => {
                let ids = rest
                    .split(',')
                    .map(parse_id)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::model_versions(ids))
            }
            other => Ok(Self::entity(other, parse_id(rest)?)),
        }
    }
}

fn parse_id(raw: &str) -> Result<DbId, CoreError> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Validation(format!("Invalid id '{raw}'")))
}

// ---------------------------------------------------------------------------
// Serde wire shape
// ---------------------------------------------------------------------------

/// Flat `{ type, id?, ids?, epoch? }` object, the JSON form the UI sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawReference {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ids: Option<Vec<DbId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    epoch: Option<u32>,
}

impl TryFrom<RawReference> for GenerationDataReference {
    type Error = CoreError;

    fn try_from(raw: RawReference) -> Result<Self, Self::Error> {
        let missing_id =
            || CoreError::Validation(format!("Reference of type '{}' requires an id", raw.kind));
        match raw.kind.as_str() {
            TYPE_MODEL_VERSIONS => Ok(Self::ModelVersions {
                ids: raw.ids.unwrap_or_default(),
            }),
            TYPE_MODEL_VERSION => Ok(Self::ModelVersion {
                id: raw.id.ok_or_else(missing_id)?,
                epoch: raw.epoch,
            }),
            "" => Err(CoreError::Validation("Reference type is empty".into())),
            _ => Ok(Self::Entity {
                id: raw.id.ok_or_else(missing_id)?,
                entity_type: raw.kind,
            }),
        }
    }
}

impl From<GenerationDataReference> for RawReference {
    fn from(reference: GenerationDataReference) -> Self {
        match reference {
            GenerationDataReference::ModelVersion { id, epoch } => Self {
                kind: TYPE_MODEL_VERSION.into(),
                id: Some(id),
                ids: None,
                epoch,
            },
            GenerationDataReference::ModelVersions { ids } => Self {
                kind: TYPE_MODEL_VERSIONS.into(),
                id: None,
                ids: Some(ids),
                epoch: None,
            },
            GenerationDataReference::Entity { entity_type, id } => Self {
                kind: entity_type,
                id: Some(id),
                ids: None,
                epoch: None,
            },
        }
    }
}
