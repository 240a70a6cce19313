//! # Streaming Module
//!
//! The region load pipeline: a FIFO schedule with a single in-flight slot,
//! and a worker thread that turns region keys into ready-to-upload
//! [`RegionData`].
//!
//! One load at a time is a deliberate backpressure policy. Fetching many
//! regions concurrently would spike GPU buffer allocation and memory
//! bandwidth right when the viewer is already crossing into new terrain;
//! queued keys simply wait their turn. The queue stays in first-in order,
//! so regions load in the order their cells came into range.

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::info;

use crate::engine_state::voxels::grid::RegionKey;
use crate::engine_state::voxels::region::RegionData;
use crate::terrain::{TerrainError, TerrainProvider};

/// Maximum number of region loads in flight at once.
///
/// Kept at 1 so at most one region is mutating GPU buffer state at any
/// time system-wide. Raising this would need the upload path to tolerate
/// interleaved buffer growth from several regions.
pub const MAX_LOADS_IN_FLIGHT: usize = 1;

/// The FIFO load queue plus the in-flight slot.
///
/// Maintains the scheduling invariants: no duplicate keys, no key that is
/// both queued and in flight, and at most [`MAX_LOADS_IN_FLIGHT`] loads
/// running. Callers are responsible for not enqueueing already-loaded keys.
pub struct LoadSchedule {
    queue: VecDeque<RegionKey>,
    in_flight: Option<RegionKey>,
}

impl LoadSchedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: None,
        }
    }

    /// Appends `key` unless it is already queued or in flight.
    ///
    /// Returns whether the key was actually added.
    pub fn enqueue(&mut self, key: RegionKey) -> bool {
        if self.is_pending(key) {
            return false;
        }
        self.queue.push_back(key);
        true
    }

    /// Whether `key` is queued or currently loading.
    pub fn is_pending(&self, key: RegionKey) -> bool {
        self.in_flight == Some(key) || self.queue.contains(&key)
    }

    /// Drops queued keys for which `keep` returns false. The in-flight
    /// load cannot be recalled; its outcome is filtered on arrival
    /// instead.
    pub fn prune(&mut self, mut keep: impl FnMut(&RegionKey) -> bool) {
        self.queue.retain(|key| keep(key));
    }

    /// Pops the next key to load, occupying the in-flight slot.
    ///
    /// Returns `None` while a load is already running or the queue is
    /// empty.
    pub fn start_next(&mut self) -> Option<RegionKey> {
        if self.in_flight.is_some() {
            return None;
        }
        let key = self.queue.pop_front()?;
        self.in_flight = Some(key);
        Some(key)
    }

    /// Frees the in-flight slot after `key` finished, successfully or not.
    pub fn complete(&mut self, key: RegionKey) {
        if self.in_flight == Some(key) {
            self.in_flight = None;
        }
    }

    /// Number of keys waiting in the queue.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// The queued keys in load order, front first.
    pub fn queued_keys(&self) -> impl Iterator<Item = &RegionKey> {
        self.queue.iter()
    }

    /// The key currently loading, if any.
    pub fn in_flight(&self) -> Option<RegionKey> {
        self.in_flight
    }
}

impl Default for LoadSchedule {
    fn default() -> Self {
        Self::new()
    }
}

/// Completed load for one region key, successful or failed.
pub struct LoadOutcome {
    /// The requested key.
    pub key: RegionKey,
    /// The built region data, or the terrain error that stopped it.
    pub result: Result<RegionData, TerrainError>,
}

/// Worker-thread loader turning region keys into [`RegionData`].
///
/// The worker owns the terrain provider, so fetching and the full CPU
/// build (voxel insertion, bounds, occlusion) happen off the render
/// thread; by the time an outcome crosses back, everything but the GPU
/// upload is done. Requests and outcomes travel over mpsc channels and
/// are drained with `try_recv` from the frame loop, which keeps the main
/// thread from ever blocking on a slow fetch.
pub struct RegionLoader {
    request_sender: Sender<RegionKey>,
    outcome_receiver: Receiver<LoadOutcome>,
    _worker: JoinHandle<()>,
}

impl RegionLoader {
    /// Spawns the loader worker around a terrain provider.
    pub fn spawn(provider: Box<dyn TerrainProvider>) -> Self {
        let (request_sender, request_receiver) = channel::<RegionKey>();
        let (outcome_sender, outcome_receiver) = channel::<LoadOutcome>();

        let worker = thread::spawn(move || {
            info!("region loader worker started");
            while let Ok(key) = request_receiver.recv() {
                let result = provider
                    .fetch_region(key.center)
                    .and_then(|codes| RegionData::from_codes(key, &codes));
                if outcome_sender.send(LoadOutcome { key, result }).is_err() {
                    break;
                }
            }
        });

        Self {
            request_sender,
            outcome_receiver,
            _worker: worker,
        }
    }

    /// Hands a key to the worker. Returns false if the worker is gone.
    pub fn request(&self, key: RegionKey) -> bool {
        self.request_sender.send(key).is_ok()
    }

    /// Takes one finished outcome, if any has arrived.
    pub fn try_take_outcome(&self) -> Option<LoadOutcome> {
        self.outcome_receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::terrain::{CODE_AIR, CODE_DIRT, REGION_VOLUME};

    fn key(x: i32) -> RegionKey {
        RegionKey {
            center: Point3::new(x, 16, 16),
        }
    }

    #[test]
    fn schedule_deduplicates_keys() {
        let mut schedule = LoadSchedule::new();

        assert!(schedule.enqueue(key(16)));
        assert!(!schedule.enqueue(key(16)));
        assert!(schedule.enqueue(key(48)));
        assert_eq!(schedule.queued_len(), 2);
    }

    #[test]
    fn only_one_load_runs_at_a_time() {
        let mut schedule = LoadSchedule::new();
        schedule.enqueue(key(16));
        schedule.enqueue(key(48));

        let first = schedule.start_next().expect("first load starts");
        assert_eq!(first, key(16));
        assert_eq!(schedule.start_next(), None, "slot is occupied");
        assert_eq!(schedule.in_flight(), Some(key(16)));

        // The in-flight key still counts as pending and cannot re-enter.
        assert!(!schedule.enqueue(key(16)));

        schedule.complete(key(16));
        assert_eq!(schedule.start_next(), Some(key(48)));
    }

    #[test]
    fn keys_start_in_fifo_order() {
        let mut schedule = LoadSchedule::new();
        for x in [16, 48, 80, 112] {
            schedule.enqueue(key(x));
        }

        let mut order = Vec::new();
        while let Some(started) = schedule.start_next() {
            order.push(started.center.x);
            schedule.complete(started);
        }
        assert_eq!(order, vec![16, 48, 80, 112]);
    }

    #[test]
    fn prune_drops_queued_keys_only() {
        let mut schedule = LoadSchedule::new();
        schedule.enqueue(key(16));
        schedule.enqueue(key(48));
        schedule.enqueue(key(80));
        let running = schedule.start_next().unwrap();

        schedule.prune(|k| k.center.x != 48);
        assert_eq!(schedule.queued_len(), 1);
        assert_eq!(schedule.in_flight(), Some(running));
    }

    struct FlatProvider;

    impl TerrainProvider for FlatProvider {
        fn fetch_region(&self, _origin: Point3<i32>) -> Result<Vec<i8>, TerrainError> {
            let mut codes = vec![CODE_AIR; REGION_VOLUME];
            codes[0] = CODE_DIRT;
            Ok(codes)
        }
    }

    struct FailingProvider;

    impl TerrainProvider for FailingProvider {
        fn fetch_region(&self, _origin: Point3<i32>) -> Result<Vec<i8>, TerrainError> {
            Err(TerrainError::Malformed {
                expected: REGION_VOLUME,
                actual: 0,
            })
        }
    }

    #[test]
    fn loader_builds_region_data_off_thread() {
        let loader = RegionLoader::spawn(Box::new(FlatProvider));
        assert!(loader.request(key(16)));

        let outcome = loop {
            if let Some(outcome) = loader.try_take_outcome() {
                break outcome;
            }
            thread::yield_now();
        };

        assert_eq!(outcome.key, key(16));
        let data = outcome.result.expect("load should succeed");
        assert_eq!(data.voxels.len(), 1);
    }

    #[test]
    fn loader_reports_fetch_failures_as_outcomes() {
        let loader = RegionLoader::spawn(Box::new(FailingProvider));
        loader.request(key(16));

        let outcome = loop {
            if let Some(outcome) = loader.try_take_outcome() {
                break outcome;
            }
            thread::yield_now();
        };

        assert!(outcome.result.is_err());
    }

    #[test]
    fn loader_preserves_request_order() {
        let loader = RegionLoader::spawn(Box::new(FlatProvider));
        loader.request(key(16));
        loader.request(key(48));
        loader.request(key(80));

        let mut order = Vec::new();
        while order.len() < 3 {
            if let Some(outcome) = loader.try_take_outcome() {
                order.push(outcome.key.center.x);
            } else {
                thread::yield_now();
            }
        }
        assert_eq!(order, vec![16, 48, 80]);
    }
}
