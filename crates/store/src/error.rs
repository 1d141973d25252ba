use genpanel_client::FetchError;
use genpanel_core::ResolutionError;

/// Errors surfaced by panel operations.
///
/// Both variants leave the previously loaded panel data in place.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}
