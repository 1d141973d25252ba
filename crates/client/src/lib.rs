//! HTTP access to generation data.
//!
//! - [`api::GenerationApi`]: reqwest client for `GET /api/generation/data`.
//! - [`source_image::HttpSourceImageResolver`]: downloads an image URL and
//!   reads its dimensions.
//! - [`fetcher::GenerationDataFetcher`]: process-lifetime memoization in
//!   front of any [`api::GenerationDataSource`].

pub mod api;
pub mod fetcher;
pub mod source_image;

pub use api::{FetchError, GenerationApi, GenerationDataSource};
pub use fetcher::GenerationDataFetcher;
pub use source_image::HttpSourceImageResolver;
