//! Generation panel state store.
//!
//! State lives behind a `tokio::sync::RwLock` and only changes through
//! [`reduce`], a pure function of the current state and a [`PanelAction`].
//! [`GenerationStore`] runs the async work (fetch, normalize, sync the
//! satellite stores) and then dispatches the resulting action.
//!
//! Overlapping `open` calls are not sequenced: each one dispatches its own
//! result when it finishes, so the last to complete wins.

use std::sync::Arc;

use genpanel_client::GenerationDataFetcher;
use genpanel_core::params::PROCESS_KEY;
use genpanel_core::{
    derive_process, engine_of, normalize_params, with_substitute, GenerationData,
    GenerationDataReference, GenerationPanelView, GenerationResource, MediaType,
    NormalizedParams, Params, RemixOfProps, RunType, SourceImageResolver,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::Instrument;

use crate::environment::Environment;
use crate::error::StoreError;
use crate::events::{PanelEvent, PanelEventBus, StoreEvent};
use crate::form::{FormUpdate, GenerationFormStore};
use crate::remix::{RemixState, RemixStore};

/// Reference type whose data is opened as a remix.
const REMIX_REFERENCE_TYPE: &str = "image";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Generation data as shown by the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelData {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub params: Params,
    pub resources: Vec<GenerationResource>,
    pub run_type: RunType,
}

/// Everything the panel UI renders from.
///
/// `counter` goes up by one every time `data` is assigned, and is the
/// signal consumers should watch for data changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub counter: u64,
    pub loading: bool,
    pub opened: bool,
    pub view: GenerationPanelView,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remix_of: Option<RemixOfProps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PanelData>,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            counter: 0,
            loading: false,
            opened: false,
            view: GenerationPanelView::Generate,
            media_type: MediaType::Image,
            remix_of: None,
            data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Reducer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    /// Show the panel. With a reference, switch to the generate view and
    /// start loading.
    Open { with_reference: bool },
    Close,
    SetView(GenerationPanelView),
    SetType(MediaType),
    /// A reference load finished with an error.
    LoadFailed,
    /// A reference load finished successfully.
    Loaded(PanelData),
    /// Data pushed in from elsewhere.
    Replay {
        data: PanelData,
        remix_of: Option<RemixOfProps>,
        force_generate_view: bool,
    },
    ClearData,
}

/// Apply `action` to `state` and describe the change.
pub fn reduce(state: &mut PanelState, action: PanelAction) -> PanelEvent {
    match action {
        PanelAction::Open { with_reference } => {
            state.opened = true;
            if with_reference {
                state.view = GenerationPanelView::Generate;
                state.loading = true;
            }
            PanelEvent::Opened {
                loading: state.loading,
            }
        }
        PanelAction::Close => {
            state.opened = false;
            PanelEvent::Closed
        }
        PanelAction::SetView(view) => {
            state.view = view;
            PanelEvent::ViewChanged { view }
        }
        PanelAction::SetType(media_type) => {
            state.media_type = media_type;
            PanelEvent::TypeChanged { media_type }
        }
        PanelAction::LoadFailed => {
            state.loading = false;
            PanelEvent::LoadFailed
        }
        PanelAction::Loaded(data) => {
            let run_type = data.run_type;
            state.data = Some(data);
            state.loading = false;
            state.counter += 1;
            PanelEvent::DataChanged { run_type }
        }
        PanelAction::Replay {
            data,
            remix_of,
            force_generate_view,
        } => {
            let run_type = data.run_type;
            state.remix_of = remix_of;
            state.data = Some(data);
            state.counter += 1;
            if force_generate_view {
                state.view = GenerationPanelView::Generate;
            }
            PanelEvent::DataChanged { run_type }
        }
        PanelAction::ClearData => {
            state.data = None;
            PanelEvent::DataCleared
        }
    }
}

// ---------------------------------------------------------------------------
// set_data input
// ---------------------------------------------------------------------------

/// Generation data pushed into the panel without a fetch, e.g. a replay of
/// a finished request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDataInput {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remix_of: Option<RemixOfProps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub resources: Vec<GenerationResource>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The generation panel store.
///
/// Writes to [`GenerationFormStore`] and [`RemixStore`] but never reads
/// them back.
pub struct GenerationStore {
    state: RwLock<PanelState>,
    events: PanelEventBus,
    fetcher: Arc<GenerationDataFetcher>,
    resolver: Arc<dyn SourceImageResolver>,
    form: Arc<GenerationFormStore>,
    remix: Arc<RemixStore>,
    environment: Arc<dyn Environment>,
}

impl GenerationStore {
    pub fn new(
        fetcher: Arc<GenerationDataFetcher>,
        resolver: Arc<dyn SourceImageResolver>,
        form: Arc<GenerationFormStore>,
        remix: Arc<RemixStore>,
        environment: Arc<dyn Environment>,
    ) -> Self {
        Self {
            state: RwLock::new(PanelState::default()),
            events: PanelEventBus::default(),
            fetcher,
            resolver,
            form,
            remix,
            environment,
        }
    }

    pub async fn snapshot(&self) -> PanelState {
        self.state.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Apply `action` and notify subscribers.
    pub async fn dispatch(&self, action: PanelAction) -> PanelEvent {
        let (event, counter) = {
            let mut state = self.state.write().await;
            let event = reduce(&mut state, action);
            (event, state.counter)
        };
        self.events.publish(event.clone(), counter);
        event
    }

    /// Open the panel, optionally loading generation data for `reference`.
    ///
    /// On failure `loading` is reset, the previous `data` is kept, and the
    /// error is returned to the caller.
    pub async fn open(&self, reference: Option<GenerationDataReference>) -> Result<(), StoreError> {
        let Some(reference) = reference else {
            self.dispatch(PanelAction::Open {
                with_reference: false,
            })
            .await;
            return Ok(());
        };

        self.dispatch(PanelAction::Open {
            with_reference: true,
        })
        .await;

        let span = tracing::info_span!(
            "open_generation_panel",
            request_id = %uuid::Uuid::new_v4(),
            reference = %reference,
        );

        async {
            match self.load(&reference).await {
                Ok(data) => {
                    let run_type = data.run_type;
                    self.dispatch(PanelAction::Loaded(data)).await;
                    tracing::info!(?run_type, "Generation data loaded");
                    Ok(())
                }
                Err(e) => {
                    self.dispatch(PanelAction::LoadFailed).await;
                    tracing::warn!(error = %e, "Failed to load generation data");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Fetch, normalize and sync satellites; produces the data to assign.
    async fn load(&self, reference: &GenerationDataReference) -> Result<PanelData, StoreError> {
        let GenerationData {
            media_type,
            params,
            resources,
            remix_of,
        } = self.fetcher.fetch(reference).await?;

        let NormalizedParams { params } =
            normalize_params(&params, remix_of.as_ref(), self.resolver.as_ref()).await?;

        let form_update = match engine_of(&params) {
            Some(engine) => FormUpdate::media_type(media_type).with_engine(engine),
            None => FormUpdate::media_type(media_type),
        };
        self.form.apply(form_update).await;

        let resources = with_substitute(resources);

        if reference.media_kind().is_some() {
            self.remix
                .replace(RemixState {
                    resources: Some(resources.clone()),
                    params: Some(params.clone()),
                    remix_of_id: remix_of.as_ref().and_then(|r| r.id),
                    remix_of,
                })
                .await;
        }

        let run_type = if reference.type_name() == REMIX_REFERENCE_TYPE {
            RunType::Remix
        } else {
            RunType::Run
        };

        Ok(PanelData {
            media_type,
            params,
            resources,
            run_type,
        })
    }

    /// Hide the panel. Data is kept so reopening resumes where it left off.
    pub async fn close(&self) {
        self.dispatch(PanelAction::Close).await;
    }

    pub async fn set_view(&self, view: GenerationPanelView) {
        self.dispatch(PanelAction::SetView(view)).await;
    }

    pub async fn set_type(&self, media_type: MediaType) {
        self.dispatch(PanelAction::SetType(media_type)).await;
    }

    /// Assign generation data that did not come from a reference fetch.
    pub async fn set_data(&self, input: SetDataInput) -> Result<(), StoreError> {
        let SetDataInput {
            media_type,
            remix_of,
            workflow,
            engine,
            params,
            resources,
        } = input;

        let mut form_update = FormUpdate::media_type(media_type).with_workflow(workflow);
        if let Some(engine) = engine.filter(|engine| !engine.is_empty()) {
            form_update = form_update.with_engine(engine);
        }
        self.form.apply(form_update).await;

        let NormalizedParams { mut params } =
            normalize_params(&params, None, self.resolver.as_ref()).await?;
        if let Some(process) = derive_process(media_type, &params) {
            params.insert(PROCESS_KEY.to_string(), process.into());
        }

        let force_generate_view = self.environment.is_compact_viewport()
            || !self.environment.is_on_generation_route();

        self.dispatch(PanelAction::Replay {
            data: PanelData {
                media_type,
                params,
                resources: with_substitute(resources),
                run_type: RunType::Replay,
            },
            remix_of,
            force_generate_view,
        })
        .await;

        tracing::info!(%media_type, force_generate_view, "Generation data replayed");
        Ok(())
    }

    /// Forget the current data. Visibility and view are untouched.
    pub async fn clear_data(&self) {
        self.dispatch(PanelAction::ClearData).await;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn data(run_type: RunType) -> PanelData {
        PanelData {
            media_type: MediaType::Image,
            params: json!({"prompt": "a cat"}).as_object().cloned().unwrap(),
            resources: vec![],
            run_type,
        }
    }

    #[test]
    fn default_state() {
        let state = PanelState::default();
        assert_eq!(state.counter, 0);
        assert!(!state.opened);
        assert!(!state.loading);
        assert_eq!(state.view, GenerationPanelView::Generate);
        assert_eq!(state.media_type, MediaType::Image);
    }

    #[test]
    fn open_without_reference_keeps_view() {
        let mut state = PanelState {
            view: GenerationPanelView::Queue,
            ..Default::default()
        };
        let event = reduce(&mut state, PanelAction::Open { with_reference: false });
        assert!(state.opened);
        assert!(!state.loading);
        assert_eq!(state.view, GenerationPanelView::Queue);
        assert_eq!(event, PanelEvent::Opened { loading: false });
    }

    #[test]
    fn open_with_reference_starts_loading_on_generate() {
        let mut state = PanelState {
            view: GenerationPanelView::Feed,
            ..Default::default()
        };
        reduce(&mut state, PanelAction::Open { with_reference: true });
        assert!(state.loading);
        assert_eq!(state.view, GenerationPanelView::Generate);
    }

    #[test]
    fn loaded_assigns_data_and_bumps_counter() {
        let mut state = PanelState {
            loading: true,
            ..Default::default()
        };
        reduce(&mut state, PanelAction::Loaded(data(RunType::Run)));
        assert!(!state.loading);
        assert_eq!(state.counter, 1);
        assert_eq!(state.data, Some(data(RunType::Run)));
    }

    #[test]
    fn load_failure_keeps_data() {
        let mut state = PanelState {
            loading: true,
            data: Some(data(RunType::Remix)),
            counter: 4,
            ..Default::default()
        };
        reduce(&mut state, PanelAction::LoadFailed);
        assert!(!state.loading);
        assert_eq!(state.counter, 4);
        assert_eq!(state.data, Some(data(RunType::Remix)));
    }

    #[test]
    fn close_retains_data() {
        let mut state = PanelState {
            opened: true,
            data: Some(data(RunType::Run)),
            ..Default::default()
        };
        reduce(&mut state, PanelAction::Close);
        assert!(!state.opened);
        assert!(state.data.is_some());
    }

    #[test]
    fn replay_forces_generate_view_only_when_asked() {
        let mut state = PanelState {
            view: GenerationPanelView::Queue,
            ..Default::default()
        };
        reduce(
            &mut state,
            PanelAction::Replay {
                data: data(RunType::Replay),
                remix_of: None,
                force_generate_view: false,
            },
        );
        assert_eq!(state.view, GenerationPanelView::Queue);
        assert_eq!(state.counter, 1);

        reduce(
            &mut state,
            PanelAction::Replay {
                data: data(RunType::Replay),
                remix_of: None,
                force_generate_view: true,
            },
        );
        assert_eq!(state.view, GenerationPanelView::Generate);
        assert_eq!(state.counter, 2);
    }

    #[test]
    fn clear_data_leaves_visibility_alone() {
        let mut state = PanelState {
            opened: true,
            view: GenerationPanelView::Feed,
            data: Some(data(RunType::Run)),
            counter: 2,
            ..Default::default()
        };
        reduce(&mut state, PanelAction::ClearData);
        assert!(state.data.is_none());
        assert!(state.opened);
        assert_eq!(state.view, GenerationPanelView::Feed);
        assert_eq!(state.counter, 2);
    }

    #[test]
    fn state_serializes_with_wire_names() {
        let state = PanelState {
            data: Some(data(RunType::Replay)),
            ..Default::default()
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["type"], json!("image"));
        assert_eq!(value["data"]["runType"], json!("replay"));
        assert!(value.get("remixOf").is_none());
    }
}
