//! Device, component and link creation.
//!
//! Create responses nest the stored record under a key (`data.device`, `data.cpu`,
//! `data.devicecpu`, ...). Only its id is required; attributes the server does not echo back
//! are filled in from the request body. A success envelope without a record id is returned
//! with no data, which callers treat as a failure.

use alloc::sync::Arc;

use devicehub_common::{
    ApiEnvelope, Component, ComponentKind, Device, Link, NewDevice, NewLink, Record,
    SYNTHESIZED_ERROR_CODE,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::api::{ApiClient, Method};
use crate::store::Store;

/// Maps device provisioning operations onto authenticated API calls.
#[derive(Clone)]
pub struct DeviceService {
    client: ApiClient,
    store: Arc<Store>,
}

impl DeviceService {
    #[must_use]
    pub const fn new(client: ApiClient, store: Arc<Store>) -> Self {
        Self { client, store }
    }

    /// `POST /devices/`.
    #[tracing::instrument(skip_all, fields(owner_id = device.owner_id))]
    pub async fn add_device(&self, device: &NewDevice) -> ApiEnvelope<Device> {
        self.create("/devices/", "device", device).await
    }

    /// `POST /cpus/`, `/gpus/`, `/disks/` or `/rams/` depending on the component type.
    #[tracing::instrument(skip_all, fields(kind = %C::KIND))]
    pub async fn add_component<C: Component>(&self, component: &C) -> ApiEnvelope<Record<C>> {
        self.create(C::KIND.create_path(), C::KIND.record_key(), component)
            .await
    }

    /// `POST /device<kind>s/` associating an existing component with an existing device.
    #[tracing::instrument(skip(self, description))]
    pub async fn link_component(
        &self,
        kind: ComponentKind,
        device_id: i64,
        component_id: i64,
        description: Option<String>,
    ) -> ApiEnvelope<Link> {
        let link = NewLink {
            kind,
            device_id,
            component_id,
            description,
        };
        self.create(kind.link_path(), kind.link_key(), &link).await
    }

    /// Posts `payload` and decodes the record nested under `key` on top of it.
    async fn create<P: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        payload: &P,
    ) -> ApiEnvelope<T> {
        let body = match serde_json::to_value(payload) {
            Ok(body) => body,
            Err(e) => return ApiEnvelope::error(SYNTHESIZED_ERROR_CODE, e.to_string()),
        };
        let token = self.store.access_token();
        self.client
            .request::<Value>(Method::POST, path, Some(&body), token.as_ref())
            .await
            .unnest_onto(key, &body)
    }
}
