//! Single-lane admission in front of the dispensing engine.
//!
//! The dispenser has one physical head, so only one request may be pouring at
//! a time. Requests queue on a fair (FIFO) async mutex and are admitted in
//! arrival order; a queued request that is cancelled simply leaves the queue.
//! Level and profile queries never go through the lane.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::debug;

use dispenser_events::EventBus;
use dispenser_inventory::RegistryError;
use dispenser_profiles::{Profile, ProfileError, ProfileRepository};
use dispenser_telemetry::{DispenseEvent, DispenseRecord};

use crate::cancel::CancelHandle;
use crate::engine::DispensingEngine;
use crate::error::DispenseError;
use crate::state::{RequestState, RequestTracker};

/// Gateway counters, by terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GatewayStats {
    pub submitted: u64,
    pub committed: u64,
    pub rejected: u64,
    pub aborted_insufficient: u64,
    pub rolled_back: u64,
    pub cancelled: u64,
    pub queued: u64,
}

pub struct RequestGateway<R, B>
where
    R: ProfileRepository,
    B: EventBus<DispenseEvent>,
{
    engine: DispensingEngine<R, B>,
    lane: tokio::sync::Mutex<()>,
    dispensing: AtomicBool,
    stats: Mutex<GatewayStats>,
}

impl<R, B> RequestGateway<R, B>
where
    R: ProfileRepository,
    B: EventBus<DispenseEvent>,
{
    pub fn new(engine: DispensingEngine<R, B>) -> Self {
        Self {
            engine,
            lane: tokio::sync::Mutex::new(()),
            dispensing: AtomicBool::new(false),
            stats: Mutex::new(GatewayStats::default()),
        }
    }

    pub fn engine(&self) -> &DispensingEngine<R, B> {
        &self.engine
    }

    pub async fn dispense(
        &self,
        profile_name: &str,
        total_volume_ml: f64,
    ) -> Result<DispenseRecord, DispenseError> {
        self.dispense_with_cancel(profile_name, total_volume_ml, &CancelHandle::new())
            .await
    }

    /// Queue a request and run it once it reaches the head of the lane.
    ///
    /// Dropping the returned future is safe at any point: a queued request
    /// leaves the queue, an admitted one has its deductions reversed and frees
    /// the lane.
    pub async fn dispense_with_cancel(
        &self,
        profile_name: &str,
        total_volume_ml: f64,
        cancel: &CancelHandle,
    ) -> Result<DispenseRecord, DispenseError> {
        let mut tracker = RequestTracker::new();
        bump(&self.stats, |s| s.submitted += 1);

        let admitted = {
            let mut slot = QueueSlot::enter(&self.stats);
            let lane = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                guard = self.lane.lock() => Some(guard),
            };
            slot.admitted = lane.is_some();
            lane
        };

        let Some(_lane) = admitted else {
            tracker.advance(RequestState::Cancelled)?;
            debug!(profile = profile_name, "request cancelled while queued");
            return Err(DispenseError::Cancelled { rolled_back: false });
        };

        if self.dispensing.swap(true, Ordering::SeqCst) {
            return Err(dispenser_core::DomainError::invariant(
                "two requests admitted to the dispensing lane",
            )
            .into());
        }

        let mut admission = Admission {
            dispensing: &self.dispensing,
            stats: &self.stats,
            tracker,
        };
        let result = self
            .engine
            .dispense_tracked(profile_name, total_volume_ml, cancel, &mut admission.tracker)
            .await;
        drop(admission);
        result
    }

    /// Whether a request currently holds the dispensing lane.
    pub fn is_dispensing(&self) -> bool {
        self.dispensing.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> GatewayStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Not serialized against dispensing.
    pub fn levels_snapshot(&self) -> Result<BTreeMap<String, f64>, RegistryError> {
        self.engine.registry().levels_snapshot()
    }

    /// Not serialized against dispensing.
    pub fn get_profile(&self, name: &str) -> Result<Profile, ProfileError> {
        self.engine.profiles().get(name)
    }
}

fn bump(stats: &Mutex<GatewayStats>, update: impl FnOnce(&mut GatewayStats)) {
    if let Ok(mut stats) = stats.lock() {
        update(&mut stats);
    }
}

/// A request waiting for the lane. Leaving the queue without being admitted
/// (cancelled or dropped) counts as a cancellation.
struct QueueSlot<'a> {
    stats: &'a Mutex<GatewayStats>,
    admitted: bool,
}

impl<'a> QueueSlot<'a> {
    fn enter(stats: &'a Mutex<GatewayStats>) -> Self {
        bump(stats, |s| s.queued += 1);
        Self {
            stats,
            admitted: false,
        }
    }
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        let admitted = self.admitted;
        bump(self.stats, |s| {
            s.queued -= 1;
            if !admitted {
                s.cancelled += 1;
            }
        });
    }
}

/// The request holding the lane. Counts its outcome and releases the
/// dispensing flag however the request ends.
struct Admission<'a> {
    dispensing: &'a AtomicBool,
    stats: &'a Mutex<GatewayStats>,
    tracker: RequestTracker,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        self.dispensing.store(false, Ordering::SeqCst);
        let state = self.tracker.state();
        bump(self.stats, |s| match state {
            RequestState::Committed => s.committed += 1,
            RequestState::Rejected => s.rejected += 1,
            RequestState::AbortedInsufficient => s.aborted_insufficient += 1,
            // Dropped mid-pour: the engine has already reversed its deductions.
            RequestState::RolledBack | RequestState::Dispensing => s.rolled_back += 1,
            RequestState::Cancelled
            | RequestState::Received
            | RequestState::Validating
            | RequestState::Reserving => s.cancelled += 1,
        });
    }
}
