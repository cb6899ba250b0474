// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Update rollout coordination.
//!
//! [`UpdateCoordinator`] owns a single worker task that applies every
//! [`Task`] in arrival order. Timers and failover fetches post their results
//! back onto the same channel, so the [`CoordinatorCore`] never needs locks.

pub mod clock;
mod engine;
pub mod gate;
pub mod schedule;


pub use engine::{
    Collaborators, CoordinatorCore, CoordinatorSettings, Origin, SharedSnapshot, Snapshot, Task,
    TaskQueue, UpdateListener,
};

use crate::collection::UpdateCollection;
use crate::error::{Result, RolloutError};
use crate::models::ContentId;
use crate::network::PeerHandle;
use log::{debug, error};
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Posts tasks onto the worker channel using the tokio timer and blocking pool.
struct TokioTaskQueue {
    sender: mpsc::UnboundedSender<Task>,
    runtime: Handle,
}

impl TaskQueue for TokioTaskQueue {
    fn submit_after(&self, delay: Duration, task: Task) {
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if sender.send(task).is_err() {
                debug!("Coordinator stopped, dropping delayed task");
            }
        });
    }

    fn run_detached(&self, job: Box<dyn FnOnce() -> Task + Send>) {
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            match tokio::task::spawn_blocking(job).await {
                Ok(task) => {
                    if sender.send(task).is_err() {
                        debug!("Coordinator stopped, dropping job result");
                    }
                }
                Err(e) => error!("Background job failed: {e}"),
            }
        });
    }
}

/// Handle to a running coordinator. Cheap to share behind an `Arc`.
pub struct UpdateCoordinator {
    sender: mpsc::UnboundedSender<Task>,
    snapshot: SharedSnapshot,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl UpdateCoordinator {
    /// Starts the worker on the current tokio runtime.
    ///
    /// The cached and bundled documents are ingested first. The periodic
    /// download retry begins after `retry_delay`.
    pub fn start(settings: CoordinatorSettings, deps: Collaborators) -> Self {
        Self::start_with_rng(settings, deps, StdRng::from_entropy())
    }

    /// Like [`start`](Self::start) with a deterministic random source.
    pub fn start_seeded(settings: CoordinatorSettings, deps: Collaborators, seed: u64) -> Self {
        Self::start_with_rng(settings, deps, StdRng::seed_from_u64(seed))
    }

    fn start_with_rng(settings: CoordinatorSettings, deps: Collaborators, rng: StdRng) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let snapshot: SharedSnapshot = Arc::new(RwLock::new(Snapshot::default()));
        let queue = Arc::new(TokioTaskQueue {
            sender: sender.clone(),
            runtime: Handle::current(),
        });

        let retry_delay = Duration::from_millis(settings.retry_delay);
        let mut core =
            CoordinatorCore::new(settings, deps, queue.clone(), snapshot.clone()).with_rng(rng);

        let worker = tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                core.handle(task);
            }
            debug!("Update coordinator worker finished");
        });

        // The channel is open: the receiver lives in the worker we just spawned.
        let _ = sender.send(Task::LoadFromDisk);
        queue.submit_after(retry_delay, Task::Poll);

        Self {
            sender,
            snapshot,
            worker: Mutex::new(Some(worker)),
        }
    }

    fn submit(&self, task: Task) -> Result<()> {
        self.sender
            .send(task)
            .map_err(|_| RolloutError::CoordinatorStopped)
    }

    /// Queues update data received from a peer.
    pub fn handle_new_data(&self, data: Vec<u8>, peer: Option<PeerHandle>) -> Result<()> {
        self.submit(Task::NetworkData { data, peer })
    }

    /// A peer advertised update collection `id`. Only an id equal to ours is
    /// of interest: the peer becomes a download source.
    pub fn handle_update_available(&self, peer: PeerHandle, id: i32) -> Result<()> {
        if id != self.latest_id() {
            return Ok(());
        }
        self.submit(Task::PeerAdvertised { peer, id })
    }

    /// Called by the download subsystem when an update transfer ends.
    pub fn download_finished(&self, id: ContentId, success: bool) -> Result<()> {
        self.submit(Task::DownloadFinished { id, success })
    }

    /// Called once the local content index has finished loading.
    pub fn try_to_download_updates(&self) -> Result<()> {
        self.submit(Task::LibraryLoaded)
    }

    pub fn latest_id(&self) -> i32 {
        self.snapshot.read().id
    }

    /// Raw bytes of the accepted document, as received.
    pub fn latest_bytes(&self) -> Option<Arc<Vec<u8>>> {
        self.snapshot.read().bytes.clone()
    }

    pub fn update_collection(&self) -> Option<Arc<UpdateCollection>> {
        self.snapshot.read().collection.clone()
    }

    /// Whether a peer advertising `id` has something newer than us.
    pub fn should_request_update_message(&self, id: i32) -> bool {
        id > self.latest_id()
    }

    /// Stops the worker. Pending timers are dropped when they fire.
    pub async fn shutdown(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.abort();
            let _ = worker.await;
        }
    }
}
