use std::sync::Arc;

use chrono::Utc;
use wrapped_logging::{short_wallet, wrapped_debug, wrapped_info, wrapped_warn};

use crate::store::JobStore;
use crate::{CreateError, JobRecord, NewJob, RecordStatus};

/// User-triggered creation path: clean up, then insert a pending job.
#[derive(Clone)]
pub struct RequestInitiator {
    store: Arc<dyn JobStore>,
}

impl RequestInitiator {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Deletes earlier records for `wallet`, then creates a pending one.
    ///
    /// Either step failing fails the whole call; nothing is returned to track.
    pub async fn start(&self, wallet: &str) -> Result<JobRecord, CreateError> {
        let removed = self
            .store
            .delete_by_wallet(wallet)
            .await
            .map_err(CreateError::Cleanup)?;
        if removed > 0 {
            wrapped_debug!(
                "Removed {} previous job(s) for {}",
                removed,
                short_wallet(wallet)
            );
        }

        let now = Utc::now();
        let job = NewJob {
            wallet_address: wallet.to_string(),
            status: RecordStatus::Pending,
            // Payment construction is out of scope; the row still carries a reference.
            tx_signature: Some(format!("mock-signature-{}", now.timestamp_millis())),
            created_at: now,
        };
        match self.store.create(job).await {
            Ok(record) => {
                wrapped_info!("Created job {} for {}", record.id, short_wallet(wallet));
                Ok(record)
            }
            Err(err) => {
                wrapped_warn!("Create failed for {}: {}", short_wallet(wallet), err);
                Err(err)
            }
        }
    }
}
