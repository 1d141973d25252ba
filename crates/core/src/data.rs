//! Generation data payload returned by `GET /api/generation/data`.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, MediaType, Params};

/// Back-reference to the content a generation remixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemixOfProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// A model or component selectable as a generation input.
///
/// Only the fields the panel reasons about are typed; everything else the
/// API sends rides along in `extra` and is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResource {
    pub id: DbId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air: Option<String>,
    #[serde(default)]
    pub can_generate: bool,
    #[serde(default)]
    pub has_access: bool,
    /// Generatable stand-in offered when this resource itself is not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitute: Option<Box<ResourceSubstitute>>,
    #[serde(flatten)]
    pub extra: Params,
}

/// Partial resource sent as a stand-in.
///
/// Every field is optional so that a key the API omits never overrides the
/// resource it stands in for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSubstitute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_generate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitute: Option<Box<ResourceSubstitute>>,
    #[serde(flatten)]
    pub extra: Params,
}

impl GenerationResource {
    /// Resolve the substitute once and strip it.
    ///
    /// If this resource cannot generate but its substitute can, the
    /// substitute's fields win over ours (extra fields are merged key by
    /// key). The substitute's own `substitute` is never followed.
    pub fn into_generatable(mut self) -> Self {
        let substitute = self.substitute.take();
        match substitute {
            Some(sub) if !self.can_generate && sub.can_generate == Some(true) => {
                let ResourceSubstitute {
                    id,
                    name,
                    model_id,
                    model_name,
                    model_type,
                    base_model,
                    strength,
                    epoch_number,
                    air,
                    can_generate,
                    has_access,
                    substitute: _,
                    extra,
                } = *sub;

                let mut merged_extra = self.extra;
                merged_extra.extend(extra);

                Self {
                    id: id.unwrap_or(self.id),
                    name: name.unwrap_or(self.name),
                    model_id: model_id.or(self.model_id),
                    model_name: model_name.or(self.model_name),
                    model_type: model_type.or(self.model_type),
                    base_model: base_model.or(self.base_model),
                    strength: strength.or(self.strength),
                    epoch_number: epoch_number.or(self.epoch_number),
                    air: air.or(self.air),
                    can_generate: can_generate.unwrap_or(self.can_generate),
                    has_access: has_access.unwrap_or(self.has_access),
                    substitute: None,
                    extra: merged_extra,
                }
            }
            _ => self,
        }
    }
}

/// Apply [`GenerationResource::into_generatable`] to every resource.
pub fn with_substitute(resources: Vec<GenerationResource>) -> Vec<GenerationResource> {
    resources
        .into_iter()
        .map(GenerationResource::into_generatable)
        .collect()
}

/// Raw (pre-normalization) generation data.
///
/// Treated as immutable history: once fetched for a reference it never
/// changes, which is what makes unbounded memoization sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationData {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub resources: Vec<GenerationResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remix_of: Option<RemixOfProps>,
}
