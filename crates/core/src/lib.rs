//! Domain types and pure transformations for the generation panel.
//!
//! - [`reference`]: [`GenerationDataReference`], the immutable request that
//!   doubles as a memoization key.
//! - [`data`]: the fetched [`GenerationData`] payload and resource
//!   substitution.
//! - [`params`]: the parameter normalizer and process-mode derivation.
//! - [`types`]: small enums shared by every crate in the workspace.

pub mod data;
pub mod error;
pub mod params;
pub mod reference;
pub mod types;

pub use data::{
    with_substitute, GenerationData, GenerationResource, RemixOfProps, ResourceSubstitute,
};
pub use error::CoreError;
pub use params::{
    derive_process, engine_of, has_source_image, normalize_params, NormalizedParams,
    ResolutionError, SourceImage, SourceImageResolver,
};
pub use reference::GenerationDataReference;
pub use types::{DbId, GenerationPanelView, MediaType, Params, RunType};
