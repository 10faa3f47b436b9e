//! The localization service: discovers, creates and announces network anchors
//! across the peers of a session.
//!
//! A service is a cheap-to-clone handle around single-threaded state. Every
//! method, and [`NetworkAnchorService::process_network_event`] in particular,
//! must be called from the thread that owns it; transports doing background
//! I/O marshal inbound events onto that thread. The only suspension points
//! are pending-request awaits, their deadlines, and coordinate provider
//! futures. Between them, state changes are atomic with respect to event
//! ingestion.

pub mod directory;
mod handlers;
pub mod localizer;
pub mod observers;
pub mod options;
pub mod pending;

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

use crate::error::AnchorError;
use crate::geometry::{Quat, Vec3};
use crate::models::{
    try_colocalize, ConnectToServiceRequest, ConnectToServiceResponse, Coordinate, CreateNetworkAnchorRequest,
    CreateNetworkAnchorResponse, DisconnectFromServiceRequest, GetNetworkAnchorRequest, GetNetworkAnchorResponse,
    GetRemoteCoordinatesRequest, GetRemoteCoordinatesResponse, NetworkAnchor, NetworkEvent, PeerCoordinates, PeerId,
    ResultCode, Target,
};
use crate::providers::CoordinateProvider;
use crate::transport::Transport;

pub use directory::PeerDirectory;
pub use localizer::AnchorLocalizer;
pub use options::{AckPolicy, ServiceOptions};
use observers::Observers;
use pending::{PendingRequest, PendingSlot};

/// Result of an anchor discovery or creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkAnchorResponse {
    pub result_code: ResultCode,
    pub network_anchor: Option<NetworkAnchor>,
}

impl NetworkAnchorResponse {
    pub fn failed() -> Self {
        Self { result_code: ResultCode::Failed, network_anchor: None }
    }

    pub fn is_success(&self) -> bool {
        self.result_code.is_success()
    }
}

/// Result of borrowing another peer's coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCoordinatesResponse {
    pub result_code: ResultCode,
    pub peer_id: Option<PeerId>,
    pub coordinates: Vec<Coordinate>,
}

impl RemoteCoordinatesResponse {
    pub fn failed() -> Self {
        Self { result_code: ResultCode::Failed, peer_id: None, coordinates: Vec::new() }
    }
}

#[derive(Default)]
struct State {
    local_peer_id: PeerId,
    connected: bool,
    directory: PeerDirectory,
    local_coordinates: Vec<Coordinate>,
    local_network_anchor: Option<NetworkAnchor>,
    peer_coordinates: HashMap<PeerId, PeerCoordinates>,
    provider: Option<Rc<dyn CoordinateProvider>>,
    connect_slot: PendingSlot<ConnectToServiceResponse>,
    get_anchor_slot: PendingSlot<GetNetworkAnchorResponse>,
    create_anchor_slot: PendingSlot<CreateNetworkAnchorResponse>,
    remote_coordinates_slot: PendingSlot<GetRemoteCoordinatesResponse>,
}

struct Inner {
    options: ServiceOptions,
    state: RefCell<State>,
    observers: Observers,
}

#[derive(Clone)]
pub struct NetworkAnchorService {
    inner: Rc<Inner>,
}

/// Non-owning handle, for collaborators the service itself holds on to.
#[derive(Clone)]
pub struct WeakNetworkAnchorService {
    inner: Weak<Inner>,
}

impl WeakNetworkAnchorService {
    pub fn upgrade(&self) -> Option<NetworkAnchorService> {
        self.inner.upgrade().map(|inner| NetworkAnchorService { inner })
    }

    pub fn refers_to(&self, service: &NetworkAnchorService) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Rc::as_ptr(&service.inner))
    }
}

thread_local! {
    static GLOBAL_SERVICE: RefCell<Option<NetworkAnchorService>> = const { RefCell::new(None) };
}

impl Default for NetworkAnchorService {
    fn default() -> Self {
        Self::new(ServiceOptions::default())
    }
}

impl NetworkAnchorService {
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            inner: Rc::new(Inner {
                options,
                state: RefCell::new(State::default()),
                observers: Observers::default(),
            }),
        }
    }

    /// Makes `service` the thread's shared instance for adapter layers.
    pub fn install_global(service: &NetworkAnchorService) {
        GLOBAL_SERVICE.with(|global| *global.borrow_mut() = Some(service.clone()));
    }

    /// The thread's shared instance, if one was installed.
    pub fn global() -> Option<NetworkAnchorService> {
        GLOBAL_SERVICE.with(|global| global.borrow().clone())
    }

    pub fn downgrade(&self) -> WeakNetworkAnchorService {
        WeakNetworkAnchorService { inner: Rc::downgrade(&self.inner) }
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.inner.options
    }

    fn state(&self) -> Ref<'_, State> {
        self.inner.state.borrow()
    }

    fn state_mut(&self) -> RefMut<'_, State> {
        self.inner.state.borrow_mut()
    }

    // Getters hand out copies.

    pub fn local_peer_id(&self) -> PeerId {
        self.state().local_peer_id
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub fn peer_directory(&self) -> Vec<PeerId> {
        self.state().directory.to_vec()
    }

    pub fn local_coordinates(&self) -> Vec<Coordinate> {
        self.state().local_coordinates.clone()
    }

    pub fn local_network_anchor(&self) -> Option<NetworkAnchor> {
        self.state().local_network_anchor.clone()
    }

    /// Last coordinate set a peer reported to us.
    pub fn peer_coordinates(&self, peer_id: PeerId) -> Option<PeerCoordinates> {
        self.state().peer_coordinates.get(&peer_id).cloned()
    }

    // Observer registration.

    pub fn on_connection_changed(&self, observer: impl Fn(bool) + 'static) {
        self.inner.observers.add_connection(Rc::new(observer));
    }

    pub fn on_network_anchor_changed(&self, observer: impl Fn(Option<&NetworkAnchor>) + 'static) {
        self.inner.observers.add_anchor(Rc::new(observer));
    }

    /// Outbound events leave the service through these observers.
    pub fn on_broadcast_network_event(&self, observer: impl Fn(u8, &str, &[i32]) + 'static) {
        self.inner.observers.add_broadcast(Rc::new(observer));
    }

    /// Debug stream, only fed while `verbose_logging` is on.
    pub fn on_debug_log(&self, observer: impl Fn(&str, i32) + 'static) {
        self.inner.observers.add_debug(Rc::new(observer));
    }

    /// Routes outbound events into `transport`.
    pub fn attach_transport(&self, transport: Rc<dyn Transport>) {
        self.on_broadcast_network_event(move |code, json, targets| transport.send(code, json, targets));
    }

    /// Replaces the local anchor, notifying observers iff the value changed.
    fn set_local_network_anchor(&self, anchor: Option<NetworkAnchor>) {
        let changed = {
            let mut state = self.state_mut();
            if state.local_network_anchor == anchor {
                false
            } else {
                state.local_network_anchor = anchor.clone();
                true
            }
        };
        if changed {
            debug!("Local network anchor changed: {:?}", anchor.as_ref().map(NetworkAnchor::anchor_id));
            self.inner.observers.anchor_changed(anchor.as_ref());
        }
    }

    fn debug_log(&self, message: &str, code: i32) {
        debug!("{} ({})", message, code);
        if self.inner.options.verbose_logging {
            self.inner.observers.debug(message, code);
        }
    }

    fn send_event(&self, event: NetworkEvent, targets: &[Target]) {
        let code = event.code();
        let json = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {}: {}", code, e);
                return;
            }
        };
        let target_ids: Vec<i32> = targets.iter().map(|target| target.id()).collect();
        self.debug_log(&format!("Sending {} to {:?}", code, target_ids), i32::from(code.as_u8()));
        self.inner.observers.broadcast(code.as_u8(), &json, &target_ids);
    }

    /// Awaits `request` up to the request deadline, clearing the slot chosen by
    /// `slot` if the deadline passes.
    async fn await_pending<R>(
        &self,
        request: PendingRequest<R>,
        slot: impl Fn(&mut State) -> &mut PendingSlot<R>,
    ) -> Option<R> {
        let generation = request.generation();
        let response = request.wait(self.inner.options.request_timeout).await;
        if response.is_none() {
            slot(&mut *self.state_mut()).expire(generation);
        }
        response
    }

    /// Asks the provider for coordinates and caches a non-empty answer as the
    /// local snapshot.
    pub async fn refresh_coordinates(&self, refresh: bool) -> Vec<Coordinate> {
        let provider = self.state().provider.clone();
        let Some(provider) = provider else {
            warn!("No coordinate provider set; connect first");
            return Vec::new();
        };

        let mut coordinates = provider.request_coordinate_references(refresh).await;
        coordinates.retain(|coordinate| {
            let valid = coordinate.is_valid();
            if !valid {
                debug!("Dropping coordinate without id");
            }
            valid
        });

        if !coordinates.is_empty() {
            self.state_mut().local_coordinates = coordinates.clone();
        }
        coordinates
    }

    /// Joins the session through the master client.
    pub async fn connect(&self, peer_id: PeerId, provider: Rc<dyn CoordinateProvider>) -> ResultCode {
        provider.initialize();
        let request = {
            let mut state = self.state_mut();
            state.local_peer_id = peer_id;
            state.provider = Some(provider);
            state.connect_slot.install(None)
        };
        info!("Peer {} connecting to the anchor service", peer_id);
        self.send_event(
            NetworkEvent::ConnectToServiceRequest(ConnectToServiceRequest { sender_id: peer_id }),
            &[Target::Master],
        );

        match self.await_pending(request, |state| &mut state.connect_slot).await {
            Some(response) if response.result_code.is_success() => {
                let was_connected = std::mem::replace(&mut self.state_mut().connected, true);
                info!("Peer {} connected; directory {:?}", peer_id, response.connected_player_ids);
                if !was_connected {
                    self.inner.observers.connection_changed(true);
                }
                ResultCode::Success
            }
            Some(response) => {
                warn!("Master refused connection of peer {}: {}", peer_id, response.result_code);
                ResultCode::Failed
            }
            None => {
                warn!("Connection of peer {} timed out", peer_id);
                ResultCode::Failed
            }
        }
    }

    /// Leaves the session, or with `Some(other)` asks the master to drop
    /// another peer. Ignored when not connected.
    pub fn disconnect(&self, peer_id: Option<PeerId>) {
        let (local_peer_id, connected) = {
            let state = self.state();
            (state.local_peer_id, state.connected)
        };
        if !connected {
            debug!("Disconnect ignored; not connected");
            return;
        }

        let target = peer_id.unwrap_or(local_peer_id);
        self.send_event(
            NetworkEvent::DisconnectFromServiceRequest(DisconnectFromServiceRequest { sender_id: target }),
            &[Target::Master],
        );
        if target != local_peer_id {
            return;
        }

        let provider = {
            let mut state = self.state_mut();
            state.connected = false;
            state.local_coordinates.clear();
            state.peer_coordinates.clear();
            state.directory.clear();
            state.connect_slot.cancel();
            state.get_anchor_slot.cancel();
            state.create_anchor_slot.cancel();
            state.remote_coordinates_slot.cancel();
            state.provider.take()
        };
        if let Some(provider) = provider {
            provider.disable();
        }
        self.set_local_network_anchor(None);
        info!("Peer {} disconnected", local_peer_id);
        self.inner.observers.connection_changed(false);
    }

    /// Looks for an anchor some other peer already owns.
    ///
    /// Peers are polled one at a time in directory order. The first peer that
    /// answers with an anchor on a coordinate we also observe wins.
    pub async fn request_network_anchor(&self) -> NetworkAnchorResponse {
        let coordinates = self.refresh_coordinates(true).await;
        if coordinates.is_empty() {
            error!("{}", AnchorError::InputUnavailable);
            return NetworkAnchorResponse::failed();
        }

        let (local_peer_id, peers) = {
            let state = self.state();
            (state.local_peer_id, state.directory.remote_peers(state.local_peer_id))
        };

        for peer_id in peers {
            let request = self.state_mut().get_anchor_slot.install(Some(peer_id));
            self.send_event(
                NetworkEvent::GetNetworkAnchorRequest(GetNetworkAnchorRequest { sender_id: local_peer_id }),
                &[Target::Peer(peer_id)],
            );

            let Some(response) = self.await_pending(request, |state| &mut state.get_anchor_slot).await else {
                self.debug_log(&AnchorError::PeerUnreachable { peer_id }.to_string(), peer_id);
                continue;
            };
            if !response.result_code.is_success() {
                self.debug_log(&format!("Peer {} has no anchor: {}", peer_id, response.result_code), peer_id);
                continue;
            }

            match try_colocalize(&coordinates, &response.generic_coordinates, response.network_anchor.as_ref()) {
                Some(anchor) => {
                    info!("Co-localized anchor '{}' through peer {}", anchor.anchor_id(), peer_id);
                    self.set_local_network_anchor(Some(anchor.clone()));
                    return NetworkAnchorResponse { result_code: ResultCode::Success, network_anchor: Some(anchor) };
                }
                None => {
                    self.debug_log(&format!("Peer {}: {}", peer_id, AnchorError::NoSharedFrame), peer_id);
                }
            }
        }

        NetworkAnchorResponse {
            result_code: ResultCode::NoMatchesFound,
            network_anchor: self.local_network_anchor(),
        }
    }

    /// Authors a new anchor at a world pose and announces it to the other
    /// peers. How many acknowledgements count is set by [`AckPolicy`].
    pub async fn request_create_network_anchor(
        &self,
        anchor_id: &str,
        position: Vec3,
        rotation: Quat,
    ) -> NetworkAnchorResponse {
        let request = self.state_mut().create_anchor_slot.install(None);
        let generation = request.generation();

        let coordinates = self.refresh_coordinates(true).await;
        let Some(first) = coordinates.first() else {
            error!("Cannot create anchor '{}' without coordinates", anchor_id);
            self.state_mut().create_anchor_slot.expire(generation);
            return NetworkAnchorResponse::failed();
        };

        let local_peer_id = self.local_peer_id();
        let anchor = NetworkAnchor::new_local(anchor_id, local_peer_id, first, position, rotation);
        if !anchor.is_valid() {
            error!("{}", AnchorError::Internal(format!("created anchor '{}' is invalid", anchor_id)));
            self.state_mut().create_anchor_slot.expire(generation);
            return NetworkAnchorResponse::failed();
        }

        info!("Creating anchor '{}' on coordinate {}", anchor_id, first.id);
        self.send_event(
            NetworkEvent::CreateNetworkAnchorRequest(CreateNetworkAnchorRequest {
                sender_id: local_peer_id,
                generic_coordinates: coordinates.clone(),
                network_anchor: Some(anchor.clone()),
            }),
            &[Target::Others],
        );

        let Some(response) = self.await_pending(request, |state| &mut state.create_anchor_slot).await else {
            warn!("No peer acknowledged anchor '{}'", anchor_id);
            return NetworkAnchorResponse::failed();
        };

        if response.result_code.is_success() {
            self.set_local_network_anchor(Some(anchor.clone()));
        }
        NetworkAnchorResponse { result_code: response.result_code, network_anchor: Some(anchor) }
    }

    /// Borrows the coordinate set of the first remote peer that has one.
    pub async fn request_remote_coordinates(&self) -> RemoteCoordinatesResponse {
        let (local_peer_id, peers) = {
            let state = self.state();
            (state.local_peer_id, state.directory.remote_peers(state.local_peer_id))
        };

        for peer_id in peers {
            let request = self.state_mut().remote_coordinates_slot.install(Some(peer_id));
            self.send_event(
                NetworkEvent::GetRemoteCoordinatesRequest(GetRemoteCoordinatesRequest { sender_id: local_peer_id }),
                &[Target::Peer(peer_id)],
            );

            match self.await_pending(request, |state| &mut state.remote_coordinates_slot).await {
                Some(response) if response.result_code.is_success() && !response.generic_coordinates.is_empty() => {
                    debug!("Borrowed {} coordinates from peer {}", response.generic_coordinates.len(), peer_id);
                    return RemoteCoordinatesResponse {
                        result_code: ResultCode::Success,
                        peer_id: Some(peer_id),
                        coordinates: response.generic_coordinates,
                    };
                }
                Some(response) => {
                    self.debug_log(&format!("Peer {} has no coordinates: {}", peer_id, response.result_code), peer_id);
                }
                None => {
                    self.debug_log(&AnchorError::PeerUnreachable { peer_id }.to_string(), peer_id);
                }
            }
        }

        RemoteCoordinatesResponse::failed()
    }

    /// Keeps the latest coordinate upload of `peer_id`.
    fn record_peer_coordinates(&self, peer_id: PeerId, coordinates: &[Coordinate]) {
        if coordinates.is_empty() {
            return;
        }
        self.state_mut()
            .peer_coordinates
            .insert(peer_id, PeerCoordinates::new(peer_id, coordinates.to_vec()));
    }
}
