//! Application state container.
//!
//! State is only mutated by reducers in response to dispatched [`Action`]s. Writes are
//! serialized through a [`Mutex`] and every resulting snapshot is published on a [`watch`]
//! channel, so readers get cheap lock-free snapshots and subscribers see every change.

mod auth;
mod home;
mod persist;

use alloc::sync::Arc;

use devicehub_common::{ComponentKind, ComponentRecord, Device, Link, Session};
use secrecy::SecretString;
use tokio::sync::{Mutex, watch};

pub use auth::AuthSlice;
pub use home::{HomeSlice, ResourceSlot};
pub use persist::{PersistedState, Persistor, StoreError};

/// Phase of an asynchronous operation as seen by the reducers.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle<T> {
    /// Started: mark loading and clear the previous error.
    Pending,
    /// Finished successfully with a result.
    Fulfilled(T),
    /// Finished with an error message.
    Rejected(String),
}

/// Everything that can change the application state.
#[derive(Debug, Clone)]
pub enum Action {
    Login(Lifecycle<Session>),
    Register(Lifecycle<Session>),
    Logout,
    ClearAuthStatus,
    ProvisionStarted,
    Device(Lifecycle<Device>),
    Component(ComponentKind, Lifecycle<ComponentRecord>),
    Link(ComponentKind, Lifecycle<Link>),
    ProvisionSettled,
    ClearHomeStatus,
    ClearCurrentDevice,
    Hydrate(PersistedState),
}

/// Full application state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub auth: AuthSlice,
    pub home: HomeSlice,
}

impl StoreState {
    fn reduce(&mut self, action: Action) {
        match action {
            Action::Login(phase) | Action::Register(phase) => self.auth.apply(phase),
            Action::Logout => {
                self.auth = AuthSlice::default();
                self.home.clear_status();
                self.home.current_device = None;
            }
            Action::ClearAuthStatus => self.auth.clear_status(),
            Action::ProvisionStarted => self.home.provisioning = true,
            Action::Device(phase) => self.home.apply_device(phase),
            Action::Component(kind, phase) => self.home.apply_component(kind, phase),
            Action::Link(kind, phase) => self.home.apply_link(kind, phase),
            Action::ProvisionSettled => self.home.provisioning = false,
            Action::ClearHomeStatus => self.home.clear_status(),
            Action::ClearCurrentDevice => self.home.current_device = None,
            Action::Hydrate(persisted) => {
                self.auth.session = persisted.session;
                self.home.devices = persisted.devices;
            }
        }
    }

    /// The slices that survive a restart.
    #[must_use]
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            session: self.auth.session.clone(),
            devices: self.home.devices.clone(),
        }
    }
}

/// Watch channel receiver for state snapshots.
pub type StoreRx = watch::Receiver<Arc<StoreState>>;

/// The state container shared by the application context.
#[derive(Debug)]
pub struct Store {
    inner: Mutex<StoreState>,
    tx: watch::Sender<Arc<StoreState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreState::default())
    }
}

impl Store {
    #[must_use]
    pub fn new(initial: StoreState) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial.clone()));
        Self {
            inner: Mutex::new(initial),
            tx,
        }
    }

    /// Runs the reducers for `action`, publishes the new snapshot and returns it.
    ///
    /// Publishing happens under the write lock, so snapshots go out in dispatch order.
    pub async fn dispatch(&self, action: Action) -> Arc<StoreState> {
        let mut guard = self.inner.lock().await;
        guard.reduce(action);
        let snapshot = Arc::new(guard.clone());
        // send_replace publishes even when nobody is subscribed
        self.tx.send_replace(Arc::clone(&snapshot));
        drop(guard);
        snapshot
    }

    /// Read the current snapshot without acquiring the write mutex.
    pub fn borrow(&self) -> watch::Ref<'_, Arc<StoreState>> {
        self.tx.borrow()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<StoreState> {
        Arc::clone(&self.tx.borrow())
    }

    /// Subscribe to future state changes.
    #[must_use]
    pub fn subscribe(&self) -> StoreRx {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.borrow().auth.session.clone()
    }

    /// Bearer token of the current session, if signed in.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.borrow()
            .auth
            .session
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    #[must_use]
    pub fn persisted(&self) -> PersistedState {
        self.borrow().persisted()
    }
}
