//! Device identity and shared-secret storage capability
//!
//! Provisioning writes the device identifier and, in software-key mode, the
//! shared secret into persistent storage. The engine reads them through
//! this capability; it never writes.

use async_trait::async_trait;
use tracing::error;

/// Read access to provisioned device credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Provisioned device identifier
    async fn device_id(&self) -> anyhow::Result<String>;

    /// Shared secret bytes, or `None` when the hardware key is active and
    /// the secret never enters ordinary storage
    async fn shared_key(&self) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Check that the store holds everything the protocol needs
///
/// Every missing or unreadable item is logged; the result is a plain
/// go/no-go answer, never an error. Pass `hardware_key = true` when the
/// secret lives in a protected hardware slot and is not expected in the
/// store.
pub async fn check_provisioning(store: &dyn CredentialStore, hardware_key: bool) -> bool {
    let mut ok = true;

    match store.device_id().await {
        Ok(id) if !id.is_empty() => {}
        Ok(_) => {
            error!("provisioning: device id is empty");
            ok = false;
        }
        Err(err) => {
            error!("provisioning: device id unreadable: {err:#}");
            ok = false;
        }
    }

    if !hardware_key {
        match store.shared_key().await {
            Ok(Some(key)) if !key.is_empty() => {}
            Ok(_) => {
                error!("provisioning: shared key not present");
                ok = false;
            }
            Err(err) => {
                error!("provisioning: shared key unreadable: {err:#}");
                ok = false;
            }
        }
    }

    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStore {
        device_id: anyhow::Result<String>,
        shared_key: anyhow::Result<Option<Vec<u8>>>,
    }

    #[async_trait]
    impl CredentialStore for FixedStore {
        async fn device_id(&self) -> anyhow::Result<String> {
            match &self.device_id {
                Ok(id) => Ok(id.clone()),
                Err(err) => Err(anyhow::anyhow!("{err:#}")),
            }
        }

        async fn shared_key(&self) -> anyhow::Result<Option<Vec<u8>>> {
            match &self.shared_key {
                Ok(key) => Ok(key.clone()),
                Err(err) => Err(anyhow::anyhow!("{err:#}")),
            }
        }
    }

    #[tokio::test]
    async fn fully_provisioned_store_passes() {
        let store = FixedStore {
            device_id: Ok("dev-1".to_string()),
            shared_key: Ok(Some(b"s3cret".to_vec())),
        };
        assert!(check_provisioning(&store, false).await);
    }

    #[tokio::test]
    async fn missing_shared_key_fails_in_software_mode() {
        let store = FixedStore {
            device_id: Ok("dev-1".to_string()),
            shared_key: Ok(None),
        };
        assert!(!check_provisioning(&store, false).await);
    }

    #[tokio::test]
    async fn missing_shared_key_passes_in_hardware_mode() {
        let store = FixedStore {
            device_id: Ok("dev-1".to_string()),
            shared_key: Ok(None),
        };
        assert!(check_provisioning(&store, true).await);
    }

    #[tokio::test]
    async fn unreadable_device_id_fails() {
        let store = FixedStore {
            device_id: Err(anyhow::anyhow!("storage not initialized")),
            shared_key: Ok(Some(b"s3cret".to_vec())),
        };
        assert!(!check_provisioning(&store, false).await);
    }

    #[tokio::test]
    async fn empty_device_id_fails() {
        let store = FixedStore {
            device_id: Ok(String::new()),
            shared_key: Ok(Some(b"s3cret".to_vec())),
        };
        assert!(!check_provisioning(&store, false).await);
    }
}
