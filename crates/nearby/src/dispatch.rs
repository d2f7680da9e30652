use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use model::nearby::{NearbyQuery, NearbyResponse};

use crate::service::NearbyCarparks;

/// Runs nearby queries for one consumer and drops answers that were
/// overtaken by a newer query.
///
/// Each dispatch takes a ticket. When its query finishes, the answer is only
/// handed out if no later ticket has been issued in the meantime.
pub struct Dispatcher {
    service: Arc<NearbyCarparks>,
    issued: AtomicU64,
}

impl Dispatcher {
    pub fn new(service: Arc<NearbyCarparks>) -> Self {
        Self {
            service,
            issued: AtomicU64::new(0),
        }
    }

    pub async fn dispatch(&self, query: NearbyQuery) -> Option<NearbyResponse> {
        self.latest_only(self.service.query(query)).await
    }

    /// Awaits `work` under a fresh ticket; `None` if it went stale.
    pub async fn latest_only<F: Future>(&self, work: F) -> Option<F::Output> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let output = work.await;
        if self.issued.load(Ordering::SeqCst) == ticket {
            Some(output)
        } else {
            log::debug!("Discarding stale result of dispatch {}.", ticket);
            None
        }
    }
}
