//! Read-only source of truth for device capability metadata (§4.5), refreshed
//! once at the start of each daily run (§4.10 phase `RefreshCapabilities`).
//! A separate boundary from [`crate::storage::StorageBackend`] because the
//! registry is owned by the home automation platform, not by this crate.

use crate::types::DeviceCapability;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    /// # Errors
    /// Returns `Error::AdapterTransient` (retried per §5) or
    /// `Error::AdapterNonTransient`.
    async fn list_device_capabilities(&self) -> Result<Vec<DeviceCapability>>;
}
