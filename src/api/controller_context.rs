use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use log::error;
use tokio::time::timeout;

use crate::{error::ServiceError, repository::PupilStore};

/// Shared handle the controllers use to reach storage.
///
/// Store calls are blocking, so [`StorageContext::run`] moves them onto the
/// blocking pool and bounds them with the configured storage timeout.
#[derive(Clone)]
pub struct StorageContext {
    store: Arc<dyn PupilStore>,
    timeout: Duration,
}

impl StorageContext {
    pub fn new(store: Arc<dyn PupilStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Runs `work` against the store off the async executor.
    ///
    /// Expiry of the timeout yields `STORAGE_UNAVAILABLE`; the abandoned call
    /// is left to finish on its own.
    pub async fn run<T, E, F>(&self, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&dyn PupilStore) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<ServiceError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        match timeout(self.timeout, web::block(move || work(store.as_ref()))).await {
            Ok(Ok(result)) => result.map_err(Into::into),
            Ok(Err(blocking)) => {
                error!("Blocking storage task failed: {}", blocking);
                Err(ServiceError::Internal(blocking.to_string()))
            }
            Err(_) => Err(ServiceError::StorageUnavailable(format!(
                "storage call exceeded {} ms",
                self.timeout.as_millis()
            ))),
        }
    }
}
