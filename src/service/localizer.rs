//! Request orchestration on top of the service primitives.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, warn};

use super::{NetworkAnchorResponse, NetworkAnchorService};
use crate::error::{AnchorError, AnchorResult};
use crate::geometry::Pose;
use crate::models::NetworkAnchor;
use crate::utils::scope_guard::ScopeGuard;

pub type PlacedObserver = Rc<dyn Fn(&NetworkAnchor, Pose)>;

struct LocalizerState {
    service: NetworkAnchorService,
    anchor_id: RefCell<String>,
    placement: Cell<Pose>,
    busy: Cell<Option<u64>>,
    generation: Cell<u64>,
    running: RefCell<Option<AbortHandle>>,
    placed: RefCell<Vec<PlacedObserver>>,
    last_placed: RefCell<Option<NetworkAnchor>>,
}

impl LocalizerState {
    fn place(&self, anchor: &NetworkAnchor) {
        if self.last_placed.borrow().as_ref() == Some(anchor) {
            return;
        }
        *self.last_placed.borrow_mut() = Some(anchor.clone());
        let pose = anchor.world_pose(None);
        info!("Placing anchor '{}' at {:?}", anchor.anchor_id(), pose.position);
        let observers = self.placed.borrow().clone();
        for observer in observers {
            observer(anchor, pose);
        }
    }

    /// Follows the service's anchor. Anchors this peer authored are placed
    /// by the workflow that created them.
    fn anchor_changed(&self, anchor: Option<&NetworkAnchor>) {
        match anchor {
            Some(anchor) if anchor.owner_id() != self.service.local_peer_id() => {
                info!("Anchor '{}' adopted from peer {}", anchor.anchor_id(), anchor.owner_id());
                self.place(anchor);
            }
            Some(_) => {}
            None => *self.last_placed.borrow_mut() = None,
        }
    }

    fn place_on_success(&self, response: &NetworkAnchorResponse) {
        if let (true, Some(anchor)) = (response.is_success(), response.network_anchor.as_ref()) {
            self.place(anchor);
        }
    }
}

/// Drives discovery and creation for an application.
///
/// One workflow runs at a time. Each runs as a local task, so the methods
/// here must be called inside a [`tokio::task::LocalSet`].
#[derive(Clone)]
pub struct AnchorLocalizer {
    state: Rc<LocalizerState>,
}

impl AnchorLocalizer {
    pub const DEFAULT_ANCHOR_ID: &'static str = "origin";

    pub fn new(service: NetworkAnchorService) -> Self {
        let state = Rc::new(LocalizerState {
            service,
            anchor_id: RefCell::new(Self::DEFAULT_ANCHOR_ID.to_string()),
            placement: Cell::new(Pose::IDENTITY),
            busy: Cell::new(None),
            generation: Cell::new(0),
            running: RefCell::new(None),
            placed: RefCell::new(Vec::new()),
            last_placed: RefCell::new(None),
        });

        let weak: Weak<LocalizerState> = Rc::downgrade(&state);
        state.service.on_network_anchor_changed(move |anchor| {
            if let Some(state) = weak.upgrade() {
                state.anchor_changed(anchor);
            }
        });

        Self { state }
    }

    pub fn with_anchor_id(self, anchor_id: impl Into<String>) -> Self {
        *self.state.anchor_id.borrow_mut() = anchor_id.into();
        self
    }

    /// World pose a newly created anchor is authored at.
    pub fn set_placement(&self, placement: Pose) {
        self.state.placement.set(placement);
    }

    pub fn service(&self) -> &NetworkAnchorService {
        &self.state.service
    }

    pub fn is_busy(&self) -> bool {
        self.state.busy.get().is_some()
    }

    /// Called with the anchor and its local world pose whenever a workflow
    /// settles on a new anchor or another peer's anchor is adopted.
    pub fn on_anchor_placed(&self, observer: impl Fn(&NetworkAnchor, Pose) + 'static) {
        self.state.placed.borrow_mut().push(Rc::new(observer));
    }

    /// Looks for an anchor another peer already owns.
    pub fn locate_existing_anchor(&self) -> AnchorResult<JoinHandle<NetworkAnchorResponse>> {
        self.start("locate", false, |state| async move {
            // Let messages that arrived with us settle first.
            tokio::task::yield_now().await;
            let response = state.service.request_network_anchor().await;
            state.place_on_success(&response);
            response
        })
    }

    /// Joins an existing anchor, or authors one if nobody has it yet.
    pub fn create_or_get_anchor(&self) -> AnchorResult<JoinHandle<NetworkAnchorResponse>> {
        self.start("create-or-get", false, |state| async move {
            let found = state.service.request_network_anchor().await;
            if found.is_success() {
                state.place_on_success(&found);
                return found;
            }
            let response = create(&state).await;
            state.place_on_success(&response);
            response
        })
    }

    /// Authors a new anchor. With `force` a running workflow is aborted
    /// first; its pending request is left to expire.
    pub fn create_network_anchor(&self, force: bool) -> AnchorResult<JoinHandle<NetworkAnchorResponse>> {
        self.start("create", force, |state| async move {
            let response = create(&state).await;
            state.place_on_success(&response);
            response
        })
    }

    fn start<F, Fut>(&self, name: &str, force: bool, workflow: F) -> AnchorResult<JoinHandle<NetworkAnchorResponse>>
    where
        F: FnOnce(Rc<LocalizerState>) -> Fut,
        Fut: Future<Output = NetworkAnchorResponse> + 'static,
    {
        if self.is_busy() {
            if !force {
                warn!("Ignoring {} request; another anchor request is in flight", name);
                return Err(AnchorError::ProtocolBusy);
            }
            if let Some(running) = self.state.running.borrow_mut().take() {
                warn!("Aborting the running anchor request for {}", name);
                running.abort();
            }
        }

        let generation = self.state.generation.get() + 1;
        self.state.generation.set(generation);
        self.state.busy.set(Some(generation));

        let state = self.state.clone();
        let workflow = workflow(self.state.clone());
        let handle = tokio::task::spawn_local(async move {
            let _release = ScopeGuard::new(move || {
                if state.busy.get() == Some(generation) {
                    state.busy.set(None);
                }
            });
            workflow.await
        });
        *self.state.running.borrow_mut() = Some(handle.abort_handle());
        Ok(handle)
    }
}

async fn create(state: &LocalizerState) -> NetworkAnchorResponse {
    let anchor_id = state.anchor_id.borrow().clone();
    let placement = state.placement.get();
    state
        .service
        .request_create_network_anchor(&anchor_id, placement.position, placement.rotation)
        .await
}
