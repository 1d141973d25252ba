//! Generation panel state and its satellite stores.
//!
//! - [`panel::GenerationStore`]: panel state (open/view/type/loading/data)
//!   driven by a pure reducer, orchestrating fetch and normalization.
//! - [`form::GenerationFormStore`]: persisted form defaults
//!   (`type`, `engine`, `workflow`).
//! - [`remix::RemixStore`]: persisted reference to the content being
//!   remixed.
//! - [`persist`]: key-value persistence behind those two stores.
//! - [`environment::Environment`]: viewport and route queries.
//! - [`context::GenerationContext`]: wires everything together once per
//!   application.

pub mod context;
pub mod environment;
pub mod error;
pub mod events;
pub mod form;
pub mod panel;
pub mod persist;
pub mod remix;

pub use context::GenerationContext;
pub use environment::{Environment, StaticEnvironment};
pub use error::StoreError;
pub use events::{PanelEvent, PanelEventBus, StoreEvent};
pub use form::{FormDefaults, FormUpdate, GenerationFormStore};
pub use panel::{GenerationStore, PanelAction, PanelData, PanelState, SetDataInput};
pub use persist::{FileStorage, MemoryStorage, PersistError, PersistStorage};
pub use remix::{RemixState, RemixStore};
