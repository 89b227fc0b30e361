//! Fixed-interval background refresh of the visible record list.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use birth_registry_core::User;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::client::{RecordListing, RecordsClient};

/// Running poller. Dropping it stops polling and discards in-flight results.
pub struct PollHandle {
    listing: watch::Receiver<RecordListing>,
    alive: Arc<AtomicBool>,
    ticker: JoinHandle<()>,
}

impl PollHandle {
    /// Receiver for the latest listing.
    pub fn subscribe(&self) -> watch::Receiver<RecordListing> {
        self.listing.clone()
    }

    /// Latest published listing.
    pub fn latest(&self) -> RecordListing {
        self.listing.borrow().clone()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        self.ticker.abort();
    }
}

/// Starts polling the records visible to `user` every `every`.
///
/// The first poll runs immediately. Each tick starts an independent fetch,
/// so a slow response never delays the next one; whichever fetch finishes
/// last wins. Failed polls keep the previous listing.
pub fn spawn_poller(client: Arc<RecordsClient>, user: User, every: Duration) -> PollHandle {
    let (publisher, listing) = watch::channel(RecordListing::default());
    let publisher = Arc::new(publisher);
    let alive = Arc::new(AtomicBool::new(true));

    let ticker = tokio::spawn({
        let alive = alive.clone();
        async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tokio::spawn(poll_once(
                    client.clone(),
                    user.clone(),
                    publisher.clone(),
                    alive.clone(),
                ));
            }
        }
    });

    PollHandle {
        listing,
        alive,
        ticker,
    }
}

async fn poll_once(
    client: Arc<RecordsClient>,
    user: User,
    publisher: Arc<watch::Sender<RecordListing>>,
    alive: Arc<AtomicBool>,
) {
    let result = client.list_for(&user).await;
    if !alive.load(Ordering::SeqCst) {
        debug!("poller stopped; discarding listing");
        return;
    }

    match result {
        Ok(listing) => {
            publisher.send_replace(listing);
        }
        Err(error) => warn!(%error, "record poll failed; keeping previous listing"),
    }
}
