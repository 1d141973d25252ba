use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Platform entity identifiers (model versions, images, posts) are 64-bit.
pub type DbId = i64;

/// Free-form generation parameters (`prompt`, `engine`, `sourceImage`, ...).
pub type Params = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// MediaType
// ---------------------------------------------------------------------------

/// Kind of media a generation request produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
    Audio,
    Text,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
        }
    }

    /// Media kinds whose references feed the remix store.
    pub fn is_remixable(self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Audio)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "text" => Ok(Self::Text),
            other => Err(CoreError::UnknownVariant {
                kind: "media type",
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Panel view / run type
// ---------------------------------------------------------------------------

/// Tab shown inside the generation panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationPanelView {
    Queue,
    #[default]
    Generate,
    Feed,
}

impl FromStr for GenerationPanelView {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queue" => Ok(Self::Queue),
            "generate" => Ok(Self::Generate),
            "feed" => Ok(Self::Feed),
            other => Err(CoreError::UnknownVariant {
                kind: "panel view",
                value: other.to_string(),
            }),
        }
    }
}

/// How the current panel data came to be.
///
/// - `Run`: opened from a model/resource reference.
/// - `Remix`: opened from an existing image.
/// - `Replay`: pushed in explicitly via `set_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Run,
    Remix,
    Replay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_round_trips_through_str() {
        for media in [MediaType::Image, MediaType::Video, MediaType::Audio, MediaType::Text] {
            assert_eq!(media.as_str().parse::<MediaType>().unwrap(), media);
        }
    }

    #[test]
    fn media_type_rejects_unknown() {
        assert!("model".parse::<MediaType>().is_err());
    }

    #[test]
    fn text_is_not_remixable() {
        assert!(MediaType::Audio.is_remixable());
        assert!(!MediaType::Text.is_remixable());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&RunType::Replay).unwrap(), "\"replay\"");
        assert_eq!(
            serde_json::from_str::<GenerationPanelView>("\"feed\"").unwrap(),
            GenerationPanelView::Feed
        );
    }
}
