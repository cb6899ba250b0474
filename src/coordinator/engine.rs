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

//! The update coordinator state machine.
//!
//! Every method here runs on the single background worker, so the core owns
//! its state outright. Timers and HTTP completions come back in as [`Task`]s.

use crate::collection::{IGNORE_ID, UpdateCollection, decorate_url};
use crate::config::RolloutConfig;
use crate::coordinator::clock::Clock;
use crate::coordinator::gate::{HttpRequestGate, RequestReason};
use crate::coordinator::schedule::{
    CONNECTED_FAILOVER_DELAY, DISCONNECTED_FAILOVER_DELAY, is_stale, millis, notification_delay,
    random_below,
};
use crate::download::{DownloadManager, FailoverClient, SourceDescriptor, TransferHandle};
use crate::error::Result;
use crate::models::{ClientProfile, ContentId, DownloadDescriptor, UpdateCandidate};
use crate::network::{NetworkHealth, PeerHandle, PeerNetwork, source_label};
use crate::security::{self, MessageVerifier};
use crate::storage::{ContentIndex, DocumentStore, StateStore, UpdateState};
use log::{debug, error, info, trace, warn};
use parking_lot::RwLock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Where a document came from. Each source has its own acceptance policy.
#[derive(Clone)]
pub enum Origin {
    Disk,
    Network(Option<PeerHandle>),
    Http,
}

impl Origin {
    fn label(&self) -> String {
        match self {
            Origin::Disk => "disk".to_string(),
            Origin::Network(peer) => format!("network ({})", source_label(peer.as_ref())),
            Origin::Http => "http".to_string(),
        }
    }
}

/// Work items of the background worker.
pub enum Task {
    /// Ingest the cached document, then the bundled one.
    LoadFromDisk,
    NetworkData {
        data: Vec<u8>,
        peer: Option<PeerHandle>,
    },
    /// Result of a failover fetch, still compressed.
    HttpCompleted(Result<Vec<u8>>),
    /// A peer advertised the update id we hold.
    PeerAdvertised { peer: PeerHandle, id: i32 },
    /// Periodic download retry and hopeless sweep. Reschedules itself.
    Poll,
    /// Delayed user notification for collection `id`.
    Notify { id: i32 },
    StaleFailover,
    MaxFailover,
    DownloadFinished { id: ContentId, success: bool },
    /// The local content index finished loading.
    LibraryLoaded,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::LoadFromDisk => write!(f, "LoadFromDisk"),
            Task::NetworkData { data, peer } => write!(
                f,
                "NetworkData({} bytes from {})",
                data.len(),
                source_label(peer.as_ref())
            ),
            Task::HttpCompleted(result) => write!(f, "HttpCompleted(ok: {})", result.is_ok()),
            Task::PeerAdvertised { peer, id } => {
                write!(f, "PeerAdvertised({id} from {})", peer.address())
            }
            Task::Poll => write!(f, "Poll"),
            Task::Notify { id } => write!(f, "Notify({id})"),
            Task::StaleFailover => write!(f, "StaleFailover"),
            Task::MaxFailover => write!(f, "MaxFailover"),
            Task::DownloadFinished { id, success } => {
                write!(f, "DownloadFinished({id}, success: {success})")
            }
            Task::LibraryLoaded => write!(f, "LibraryLoaded"),
        }
    }
}

/// Posts tasks back onto the worker.
pub trait TaskQueue: Send + Sync {
    /// Runs `task` on the worker after `delay`.
    fn submit_after(&self, delay: Duration, task: Task);

    /// Runs blocking `job` off the worker and queues the task it returns.
    fn run_detached(&self, job: Box<dyn FnOnce() -> Task + Send>);
}

/// Receives the single "update available" notification per collection.
pub trait UpdateListener: Send + Sync {
    fn on_update_available(&self, candidate: &UpdateCandidate);
}

/// External collaborators of the coordinator.
#[derive(Clone)]
pub struct Collaborators {
    pub verifier: Arc<dyn MessageVerifier>,
    pub documents: Arc<dyn DocumentStore>,
    pub state: Arc<dyn StateStore>,
    pub downloads: Arc<dyn DownloadManager>,
    pub index: Arc<dyn ContentIndex>,
    pub network: Arc<dyn PeerNetwork>,
    pub health: Arc<dyn NetworkHealth>,
    pub listener: Arc<dyn UpdateListener>,
    pub failover: Arc<dyn FailoverClient>,
    pub clock: Arc<dyn Clock>,
}

/// Tunables of the coordinator. Durations are in milliseconds.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub profile: ClientProfile,
    pub update_dir: PathBuf,
    pub update_delay: u64,
    pub retry_delay: u64,
    pub download_delay: u64,
    pub giveup_factor: u64,
    pub min_attempts: u32,
    pub timeout_url: String,
    pub max_urls: Vec<String>,
    pub min_max_delay: u64,
    pub max_max_delay: u64,
    pub silent_period: u64,
}

impl CoordinatorSettings {
    pub fn from_config(config: &RolloutConfig, profile: ClientProfile, home: &Path) -> Self {
        Self {
            profile,
            update_dir: config.update_dir(home),
            update_delay: config.update.delay_ms,
            retry_delay: config.update.retry_delay_ms,
            download_delay: config.download.delay_ms,
            giveup_factor: config.download.giveup_factor,
            min_attempts: config.download.min_attempts,
            timeout_url: config.failover.timeout_url.clone(),
            max_urls: config.failover.max_urls.clone(),
            min_max_delay: config.failover.min_max_delay_ms,
            max_max_delay: config.failover.max_max_delay_ms,
            silent_period: config.failover.silent_period_ms,
        }
    }

    /// The profile used for selection, with the style ceiling capped at major.
    fn selection_profile(&self) -> ClientProfile {
        ClientProfile {
            style: self.profile.style.capped(),
            ..self.profile.clone()
        }
    }
}

/// What other threads may read about the accepted collection.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub id: i32,
    pub bytes: Option<Arc<Vec<u8>>>,
    pub collection: Option<Arc<UpdateCollection>>,
}

pub type SharedSnapshot = Arc<RwLock<Snapshot>>;

enum NotifyAction {
    None,
    Delayed,
    Now,
    AwaitDownload,
}

pub struct CoordinatorCore {
    settings: CoordinatorSettings,
    deps: Collaborators,
    queue: Arc<dyn TaskQueue>,
    snapshot: SharedSnapshot,
    rng: StdRng,
    gate: HttpRequestGate,
    state: UpdateState,
    last_id: i32,
    last_timestamp: i64,
    my_update: Option<UpdateCandidate>,
    to_download: Vec<DownloadDescriptor>,
    kill_obsolete: bool,
    notified_id: Option<i32>,
}

impl CoordinatorCore {
    pub fn new(
        settings: CoordinatorSettings,
        deps: Collaborators,
        queue: Arc<dyn TaskQueue>,
        snapshot: SharedSnapshot,
    ) -> Self {
        let state = deps.state.load();
        Self {
            settings,
            deps,
            queue,
            snapshot,
            rng: StdRng::from_entropy(),
            gate: HttpRequestGate::new(),
            state,
            last_id: 0,
            last_timestamp: 0,
            my_update: None,
            to_download: Vec::new(),
            kill_obsolete: false,
            notified_id: None,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn last_id(&self) -> i32 {
        self.last_id
    }

    pub fn my_update(&self) -> Option<&UpdateCandidate> {
        self.my_update.as_ref()
    }

    pub fn to_download(&self) -> &[DownloadDescriptor] {
        &self.to_download
    }

    pub fn gate(&self) -> &HttpRequestGate {
        &self.gate
    }

    pub fn state(&self) -> &UpdateState {
        &self.state
    }

    pub fn handle(&mut self, task: Task) {
        trace!("Handling {task:?}");
        match task {
            Task::LoadFromDisk => self.load_from_disk(),
            Task::NetworkData { data, peer } => self.handle_data(&data, Origin::Network(peer)),
            Task::HttpCompleted(result) => self.http_completed(result),
            Task::PeerAdvertised { peer, id } => self.add_source_if_id_matches(Some(&peer), id),
            Task::Poll => self.poll(),
            Task::Notify { id } => self.notify_about(id),
            Task::StaleFailover => {
                let url = self.settings.timeout_url.clone();
                self.launch(&url);
            }
            Task::MaxFailover => self.launch_max_failover(),
            Task::DownloadFinished { id, success } => self.download_finished(&id, success),
            Task::LibraryLoaded => self.library_loaded(),
        }
    }

    fn now(&self) -> i64 {
        self.deps.clock.now()
    }

    fn save_state(&self) {
        if let Err(e) = self.deps.state.save(&self.state) {
            warn!("Failed to save update state: {e}");
        }
    }

    fn load_from_disk(&mut self) {
        match self.deps.documents.load() {
            Some(data) => self.handle_data(&data, Origin::Disk),
            None => debug!("No cached update document"),
        }
        match self.deps.documents.load_bundled() {
            Some(data) => self.handle_data(&data, Origin::Disk),
            None => debug!("No bundled update document"),
        }
    }

    /// Verifies, parses and applies the acceptance policy of `origin`.
    pub fn handle_data(&mut self, data: &[u8], origin: Origin) {
        let network_source = match &origin {
            Origin::Network(peer) => Some(source_label(peer.as_ref())),
            _ => None,
        };

        let Some(xml) = self.deps.verifier.verify(data) else {
            warn!("Could not verify update data from {}", origin.label());
            if let Some(source) = &network_source {
                self.deps.health.on_invalid_response(source);
            }
            return;
        };

        let collection = match UpdateCollection::parse(&xml, &self.settings.profile) {
            Ok(collection) => collection,
            Err(e) => {
                warn!("Invalid update data from {}: {e}", origin.label());
                if let Some(source) = &network_source {
                    self.deps.health.on_invalid_response(source);
                }
                return;
            }
        };

        if let Some(source) = &network_source {
            self.deps.health.on_valid_response(source);
        }

        debug!(
            "Got collection {} from {}, current id is {}",
            collection.id(),
            origin.label(),
            self.last_id
        );

        match &origin {
            Origin::Disk => {
                self.check_for_stale_update();
                if collection.id() > self.last_id {
                    self.store_and_update(data, collection, &origin);
                }
            }
            Origin::Network(peer) => {
                if collection.is_ignore() {
                    if self.last_id != IGNORE_ID {
                        self.request_max_failover();
                    }
                } else if collection.id() <= self.last_id {
                    self.check_for_stale_update();
                    self.add_source_if_id_matches(peer.as_ref(), collection.id());
                } else {
                    self.store_and_update(data, collection, &origin);
                }
            }
            Origin::Http => {
                if collection.id() >= self.last_id {
                    self.store_and_update(data, collection, &origin);
                }
            }
        }
    }

    fn store_and_update(&mut self, data: &[u8], collection: UpdateCollection, origin: &Origin) {
        // A max failover fetches straight from the source; ignore the network meanwhile.
        if matches!(origin, Origin::Network(_))
            && self.gate.is_pending()
            && self.gate.reason() == Some(RequestReason::Max)
        {
            debug!("Ignoring network data while a max failover is pending");
            return;
        }

        info!(
            "Accepted update collection {} from {}",
            collection.id(),
            origin.label()
        );

        let now = self.now();
        self.last_id = collection.id();
        self.last_timestamp = collection.timestamp();
        self.state.last_update_timestamp = self.last_timestamp;
        self.state.next_download_time = self
            .last_timestamp
            .saturating_add(random_below(&mut self.rng, self.settings.download_delay));

        let persist = !matches!(origin, Origin::Disk);
        if persist {
            if self.gate.reason() == Some(RequestReason::Timeout) {
                self.gate.cancel();
            }
            self.state.last_http_failover = now;
            if let Err(e) = self.deps.documents.persist(data) {
                warn!("Failed to save update document: {e}");
            }
        }
        self.save_state();

        let collection = Arc::new(collection);
        *self.snapshot.write() = Snapshot {
            id: self.last_id,
            bytes: Some(Arc::new(data.to_vec())),
            collection: Some(collection.clone()),
        };
        if persist {
            self.deps.network.broadcast_capability_changed();
        }

        let my_update = collection
            .select_best(&self.settings.selection_profile())
            .cloned()
            .map(|candidate| self.prepare_update_command(candidate));

        let mut to_download = collection.downloadable().to_vec();
        if let Some(mine) = my_update.as_ref().and_then(|c| c.download.as_ref()) {
            to_download.retain(|d| d.content_id != mine.content_id);
            to_download.insert(0, mine.clone());
        }

        self.my_update = my_update;
        self.to_download = to_download;
        self.kill_obsolete = true;

        self.download_updates(None);

        let action = match &self.my_update {
            None => NotifyAction::None,
            Some(candidate) => match candidate.content_id() {
                None => NotifyAction::Delayed,
                Some(id) if self.is_failed(id) => NotifyAction::Delayed,
                Some(_) if self.is_my_update_downloaded() => NotifyAction::Now,
                Some(_) => NotifyAction::AwaitDownload,
            },
        };

        match action {
            NotifyAction::None => warn!("No relevant update to notify about"),
            NotifyAction::Delayed => {
                debug!("Update needs no download, or its download is hopeless");
                self.strip_update_command();
                self.schedule_notification(collection.timestamp());
            }
            NotifyAction::Now => {
                debug!("Update for us is already on disk");
                self.fire_update();
            }
            NotifyAction::AwaitDownload => {
                debug!("Update needs a download, waiting for it to finish");
            }
        }
    }

    fn prepare_update_command(&self, candidate: UpdateCandidate) -> UpdateCandidate {
        if !candidate.is_downloadable() {
            return candidate;
        }
        let update_dir = self
            .settings
            .update_dir
            .canonicalize()
            .unwrap_or_else(|_| self.settings.update_dir.clone());
        let command = candidate.prepared_command(&update_dir);
        candidate.with_command(command)
    }

    fn strip_update_command(&mut self) {
        self.my_update = self.my_update.take().map(|c| c.with_command(None));
    }

    fn schedule_notification(&mut self, timestamp: i64) {
        let delay = notification_delay(
            self.now(),
            timestamp,
            self.settings.update_delay,
            &mut self.rng,
        );
        self.queue
            .submit_after(millis(delay), Task::Notify { id: self.last_id });
    }

    fn notify_about(&mut self, id: i32) {
        if id != self.last_id {
            debug!("Skipping notification for superseded collection {id}");
            return;
        }
        self.fire_update();
    }

    fn fire_update(&mut self) {
        let Some(candidate) = &self.my_update else {
            return;
        };
        if self.notified_id == Some(self.last_id) {
            debug!("Already notified about collection {}", self.last_id);
            return;
        }
        self.notified_id = Some(self.last_id);
        info!("Update {} is available", candidate.for_version);
        self.deps.listener.on_update_available(candidate);
    }

    fn check_for_stale_update(&mut self) {
        let now = self.now();
        if is_stale(now, self.state.last_update_timestamp)
            && is_stale(now, self.state.last_http_failover)
            && !self.gate.try_queue(RequestReason::Timeout)
        {
            let delay = if self.deps.network.is_connected() {
                CONNECTED_FAILOVER_DELAY
            } else {
                DISCONNECTED_FAILOVER_DELAY
            };
            debug!("Scheduling stale update failover in {delay:?}");
            self.queue.submit_after(delay, Task::StaleFailover);
        }
    }

    fn request_max_failover(&mut self) {
        let now = self.now();
        let silent_until = self
            .state
            .last_http_failover
            .saturating_add(self.settings.silent_period as i64);
        if now <= silent_until {
            debug!("Ignoring max failover during the silent period");
            return;
        }
        if self.gate.try_queue(RequestReason::Max) {
            debug!("Failover request already pending");
            return;
        }

        let delay = random_below(&mut self.rng, self.settings.max_max_delay)
            .saturating_add(self.settings.min_max_delay as i64);
        debug!("Scheduling max failover in {delay} ms");
        self.queue.submit_after(millis(delay), Task::MaxFailover);
    }

    fn launch_max_failover(&mut self) {
        if self.settings.max_urls.is_empty() {
            warn!("No failover URLs configured");
            self.gate.cancel();
            return;
        }
        let index = random_below(&mut self.rng, self.settings.max_urls.len() as u64) as usize;
        let url = self.settings.max_urls[index].clone();
        self.launch(&url);
    }

    fn launch(&mut self, url: &str) {
        if !self.gate.is_queued() {
            debug!("No failover request queued");
            return;
        }
        self.gate.mark_active();

        let url = decorate_url(url, &self.settings.profile);
        info!("Requesting update document from {url}");
        let client = self.deps.failover.clone();
        self.queue
            .run_detached(Box::new(move || Task::HttpCompleted(client.fetch(&url))));
    }

    fn http_completed(&mut self, result: Result<Vec<u8>>) {
        self.state.last_http_failover = self.now();
        self.save_state();
        self.gate.finish();

        let body = match result {
            Ok(body) => body,
            Err(e) => {
                warn!("HTTP failover failed: {e}");
                return;
            }
        };
        match security::inflate(&body) {
            Ok(data) => self.handle_data(&data, Origin::Http),
            Err(e) => warn!("Could not read failover response: {e}"),
        }
    }

    fn add_source_if_id_matches(&mut self, peer: Option<&PeerHandle>, id: i32) {
        if id == self.last_id {
            self.download_updates(peer);
        } else {
            debug!("Peer has collection {id}, we have {}", self.last_id);
        }
    }

    fn is_failed(&self, id: &ContentId) -> bool {
        self.state.failed_updates.contains(id.as_str())
    }

    fn is_my_update_downloaded(&self) -> bool {
        if !self.deps.index.is_ready() {
            return false;
        }
        match self.my_update.as_ref().and_then(|c| c.content_id()) {
            Some(id) => self.deps.index.has_complete(id),
            None => true,
        }
    }

    fn download_updates(&mut self, source: Option<&PeerHandle>) {
        let downloads = self.deps.downloads.clone();
        let index = self.deps.index.clone();
        if !downloads.is_ready() || !index.is_ready() {
            debug!("Download subsystem or content index not ready");
            return;
        }

        self.kill_obsolete_updates();

        let now = self.now();
        for descriptor in &self.to_download {
            let id = &descriptor.content_id;
            if self.is_failed(id) {
                continue;
            }

            let mut transfer = downloads.find_transfer(id);
            if index.has_complete(id) {
                if let Some(transfer) = transfer {
                    downloads.stop_transfer(&transfer);
                }
                continue;
            }

            if transfer.is_none()
                && !downloads.has_active_update_transfer()
                && now > self.state.next_download_time
            {
                match downloads.start_transfer(descriptor, now) {
                    Ok(started) => {
                        info!("Started update download {id}");
                        transfer = Some(started);
                    }
                    Err(e) => error!("Unable to start update download {id}: {e}"),
                }
            }

            if let Some(transfer) = transfer {
                match source {
                    Some(peer) => downloads
                        .add_source(&transfer, SourceDescriptor::for_peer(peer.as_ref(), descriptor)),
                    None => self.add_current_sources(&transfer, descriptor),
                }
            }
        }
    }

    fn add_current_sources(&self, transfer: &TransferHandle, descriptor: &DownloadDescriptor) {
        for peer in self.deps.network.connected_peers() {
            if peer.advertised_update_id() == self.last_id {
                trace!("Adding source {}", peer.address());
                self.deps
                    .downloads
                    .add_source(transfer, SourceDescriptor::for_peer(peer.as_ref(), descriptor));
            }
        }
    }

    fn kill_obsolete_updates(&mut self) {
        if !self.kill_obsolete {
            return;
        }
        self.kill_obsolete = false;

        let keep: Vec<ContentId> = self
            .to_download
            .iter()
            .map(|d| d.content_id.clone())
            .collect();
        self.deps.downloads.kill_transfers_not_listed(&keep);

        for (id, path) in self.deps.index.update_area_files() {
            if keep.contains(&id) {
                continue;
            }
            match self.deps.index.remove(&path) {
                Ok(()) => info!("Removed obsolete update {}", path.display()),
                Err(e) => warn!("Failed to remove obsolete update {}: {e}", path.display()),
            }
        }
    }

    fn poll(&mut self) {
        self.download_updates(None);
        self.kill_hopeless_updates();
        self.queue
            .submit_after(Duration::from_millis(self.settings.retry_delay), Task::Poll);
    }

    fn kill_hopeless_updates(&mut self) {
        let downloads = self.deps.downloads.clone();
        if !downloads.has_active_update_transfer() {
            return;
        }

        let now = self.now();
        let threshold = i64::try_from(
            self.settings
                .giveup_factor
                .saturating_mul(self.settings.download_delay),
        )
        .unwrap_or(i64::MAX);
        let mut hopeless = Vec::new();
        for descriptor in &self.to_download {
            let Some(transfer) = downloads.find_transfer(&descriptor.content_id) else {
                continue;
            };
            if now.saturating_sub(transfer.start_time()) >= threshold
                && transfer.attempts() >= self.settings.min_attempts
            {
                warn!(
                    "Giving up on update download {} after {} attempts",
                    descriptor.content_id,
                    transfer.attempts()
                );
                downloads.stop_transfer(&transfer);
                hopeless.push(descriptor.content_id.clone());
            }
        }

        // Stopping a transfer reports nothing back, so finish it here.
        for id in hopeless {
            self.download_finished(&id, false);
        }
    }

    fn download_finished(&mut self, id: &ContentId, success: bool) {
        if !success && self.state.failed_updates.insert(id.to_string()) {
            self.save_state();
        }

        let mine = self
            .my_update
            .as_ref()
            .and_then(|c| c.content_id())
            .is_some_and(|my_id| my_id == id);
        if !mine {
            return;
        }

        if success {
            self.fire_update();
            self.deps.network.broadcast_capability_changed();
        } else {
            warn!("Download of our update {id} failed");
            self.strip_update_command();
            self.schedule_notification(self.last_timestamp);
        }
    }

    fn library_loaded(&mut self) {
        let downloadable = self
            .my_update
            .as_ref()
            .is_some_and(|c| c.is_downloadable());
        if downloadable && self.is_my_update_downloaded() {
            self.fire_update();
        }
        self.download_updates(None);
    }
}
