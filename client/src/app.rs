//! Application context: the explicit owner of all client state.
//!
//! Built once at startup from the config and a host bridge, hydrated from the persisted
//! state file, and handed to whatever drives the client (the CLI, tests).

use alloc::sync::Arc;

use devicehub_common::{EnvelopeError, RegisterPayload, Session, SystemInfo};
use devicehub_host_bridge::BridgeError;
use eyre::WrapErr as _;
use secrecy::SecretString;
use thiserror::Error as ThisError;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::bridge::{SharedBridge, log_best_effort};
use crate::config::ClientConfig;
use crate::provision::{ProvisionReport, Provisioner};
use crate::services::{AuthService, DeviceService};
use crate::store::{Action, Lifecycle, Persistor, Store};

/// Message stored when the server rejects a call without saying why.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Why a provisioning request was not carried out.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ProvisionRefusal {
    #[error("Not signed in")]
    NotSignedIn,
    #[error("This machine is already registered as device {device_id} for user {owner_id}")]
    AlreadyProvisioned { owner_id: i64, device_id: i64 },
    #[error("Provisioning already ran in this session")]
    AlreadyTriggered,
}

pub struct AppContext {
    config: ClientConfig,
    store: Arc<Store>,
    auth: AuthService,
    provisioner: Provisioner,
    persistor: Persistor,
    bridge: SharedBridge,
}

impl AppContext {
    /// Builds the context and restores the persisted session and device list.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the state file is unreadable.
    pub async fn init(config: ClientConfig, bridge: SharedBridge) -> eyre::Result<Self> {
        let client =
            ApiClient::new(&config.api, Arc::clone(&bridge)).wrap_err("Failed to build HTTP client")?;
        let store = Arc::new(Store::default());
        let persistor = Persistor::new(&config.storage.path, config.storage.namespace.clone());

        let persisted = persistor.load().await?;
        store.dispatch(Action::Hydrate(persisted)).await;

        let auth = AuthService::new(client.clone());
        let devices = DeviceService::new(client, Arc::clone(&store));
        let provisioner = Provisioner::new(
            devices,
            Arc::clone(&store),
            Arc::clone(&bridge),
            config.device.clone(),
        );

        Ok(Self {
            config,
            store,
            auth,
            provisioner,
            persistor,
            bridge,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<Store> {
        &self.store
    }

    #[must_use]
    pub const fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    async fn persist(&self) {
        if let Err(e) = self.persistor.save(&self.store.persisted()).await {
            warn!("Failed to persist state: {e:?}");
        }
    }

    async fn settle_auth(
        &self,
        result: Result<Session, EnvelopeError>,
        wrap: fn(Lifecycle<Session>) -> Action,
        label: &str,
    ) -> Result<Session, EnvelopeError> {
        match result {
            Ok(session) => {
                self.store
                    .dispatch(wrap(Lifecycle::Fulfilled(session.clone())))
                    .await;
                log_best_effort(
                    &*self.bridge,
                    &format!("{label} successful for user {}", session.user.id),
                )
                .await;
                self.persist().await;
                Ok(session)
            }
            Err(e) => {
                let message = if e.message().is_empty() {
                    UNKNOWN_ERROR.to_owned()
                } else {
                    e.message().to_owned()
                };
                self.store
                    .dispatch(wrap(Lifecycle::Rejected(message.clone())))
                    .await;
                log_best_effort(&*self.bridge, &format!("{label} failed: {message}")).await;
                Err(e)
            }
        }
    }

    /// Signs in and stores the session.
    ///
    /// # Errors
    ///
    /// Returns the envelope failure when the server or transport rejects the login.
    pub async fn login(
        &self,
        email: &str,
        password: SecretString,
    ) -> Result<Session, EnvelopeError> {
        self.store.dispatch(Action::Login(Lifecycle::Pending)).await;
        log_best_effort(&*self.bridge, "Attempting login...").await;
        let result = self.auth.login(email, password).await.into_data();
        self.settle_auth(result, Action::Login, "Login").await
    }

    /// Creates an account and stores the returned session.
    ///
    /// # Errors
    ///
    /// Returns the envelope failure when the server or transport rejects the sign-up.
    pub async fn register(&self, payload: RegisterPayload) -> Result<Session, EnvelopeError> {
        self.store
            .dispatch(Action::Register(Lifecycle::Pending))
            .await;
        let result = self.auth.register(payload).await.into_data();
        self.settle_auth(result, Action::Register, "Register").await
    }

    /// Clears the session and re-arms provisioning for the next sign-in.
    pub async fn logout(&self) {
        self.store.dispatch(Action::Logout).await;
        self.provisioner.reset();
        self.persist().await;
        info!("Signed out");
    }

    /// Provisions this machine for the signed-in user.
    ///
    /// Refuses when a device for the user was already created from this machine, unless
    /// `force` is set.
    ///
    /// # Errors
    ///
    /// Returns why provisioning was not started. Failures of individual steps are part of
    /// the returned report instead.
    pub async fn provision(&self, force: bool) -> Result<ProvisionReport, ProvisionRefusal> {
        let user_id = self
            .store
            .borrow()
            .auth
            .user_id()
            .ok_or(ProvisionRefusal::NotSignedIn)?;

        if !force {
            let existing = self
                .store
                .borrow()
                .home
                .devices
                .iter()
                .find(|device| device.owner_id == user_id)
                .map(|device| device.id);
            if let Some(device_id) = existing {
                return Err(ProvisionRefusal::AlreadyProvisioned {
                    owner_id: user_id,
                    device_id,
                });
            }
        }

        let report = self
            .provisioner
            .trigger(Some(user_id))
            .await
            .ok_or(ProvisionRefusal::AlreadyTriggered)?;
        self.persist().await;
        Ok(report)
    }

    /// Hardware snapshot of this machine.
    ///
    /// # Errors
    ///
    /// Returns an error if the host bridge cannot take the snapshot.
    pub async fn system_info(&self) -> Result<SystemInfo, BridgeError> {
        self.bridge.get_system_info().await
    }
}
