//! Cache, write buffer and notification discipline over a storage backend.
//!
//! # Responsibility
//! - Serve reads from an in-memory cache, loading and hydrating on miss.
//! - Queue durable writes and flush them in coalesced batches.
//! - Publish one change notification per write call once it is durable.
//!
//! # Invariants
//! - Cache mutation happens inside the write call.
//! - A failed flush re-queues its batch; nothing is dropped silently.
//! - Notifications produced by a flush are delivered at the start of a
//!   later turn, never inside the call that queued the write.

use std::collections::HashMap;

use log::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::model::concept::{Concept, ConceptId};
use crate::model::settings::Settings;
use crate::pubsub::{EventBus, SubscriptionId};
use crate::store::backend::{SerializedConcept, StorageBackend, WriteOp};
use crate::store::hydrate::{hydrate_concept, hydrate_settings};
use crate::store::sqlite::SqliteBackend;
use crate::store::write_buffer::{coalesce, QueuedWrite, WriteBuffer};
use crate::store::{ConceptStore, StoreResult};

/// Persisted data layout version written by `init`.
pub const DATA_VERSION: u32 = 1;

pub const DEFAULT_MIN_FLUSH_INTERVAL_MS: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Minimum spacing between two durable flushes.
    pub min_flush_interval_ms: i64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            min_flush_interval_ms: DEFAULT_MIN_FLUSH_INTERVAL_MS,
        }
    }
}

/// Notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Concept(ConceptId),
    Settings,
    /// Receives every change.
    AnyChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    SettingsSaved,
    Initialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub concept_id: Option<ConceptId>,
    /// Time the change became durable.
    pub at_ms: i64,
}

pub type ChangeCallback = Box<dyn FnMut(&ChangeEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushStats {
    pub flushes: u64,
    pub rows_written: u64,
    pub failures: u64,
}

/// What one turn did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnOutcome {
    pub delivered: usize,
    pub rows_written: usize,
}

#[derive(Debug, Clone, Copy)]
struct Notice {
    channel: Channel,
    kind: ChangeKind,
    concept_id: Option<ConceptId>,
}

pub struct CachedStore<B, C = SystemClock> {
    backend: B,
    clock: C,
    concepts: HashMap<ConceptId, Concept>,
    order: Vec<ConceptId>,
    all_loaded: bool,
    settings: Option<Settings>,
    buffer: WriteBuffer<Notice>,
    bus: EventBus<Channel, ChangeEvent>,
    stats: FlushStats,
}

impl<B: StorageBackend> CachedStore<B, SystemClock> {
    pub fn new(backend: B, options: StoreOptions) -> Self {
        Self::with_clock(backend, SystemClock, options)
    }
}

impl CachedStore<SqliteBackend, SystemClock> {
    /// Opens (and migrates) a SQLite store file.
    pub fn open_sqlite(
        path: impl AsRef<std::path::Path>,
        options: StoreOptions,
    ) -> StoreResult<Self> {
        Ok(Self::new(SqliteBackend::open(path)?, options))
    }
}

impl<B: StorageBackend, C: Clock> CachedStore<B, C> {
    pub fn with_clock(backend: B, clock: C, options: StoreOptions) -> Self {
        Self {
            backend,
            clock,
            concepts: HashMap::new(),
            order: Vec::new(),
            all_loaded: false,
            settings: None,
            buffer: WriteBuffer::new(options.min_flush_interval_ms),
            bus: EventBus::new(),
            stats: FlushStats::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn stats(&self) -> FlushStats {
        self.stats
    }

    pub fn pending_writes(&self) -> usize {
        self.buffer.len()
    }

    pub fn pending_notifications(&self) -> usize {
        self.bus.pending_len()
    }

    /// Earliest time a queued flush may run; `None` when nothing is queued.
    pub fn next_flush_at(&self) -> Option<i64> {
        self.buffer.due_at()
    }

    /// Installs the audit hook that sees every delivered notification.
    pub fn set_audit_observer(&mut self, observer: impl FnMut(&Channel, &ChangeEvent) + 'static) {
        self.bus.set_observer(observer);
    }

    pub fn clear_audit_observer(&mut self) {
        self.bus.clear_observer();
    }

    /// Flushes queued writes regardless of the coalescing window.
    pub fn flush_now(&mut self) -> StoreResult<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        self.flush(self.clock.now_ms())
    }

    fn flush(&mut self, now_ms: i64) -> StoreResult<usize> {
        let batch = self.buffer.take_batch(now_ms);
        let ops = coalesce(&batch);
        if let Err(err) = self.backend.write_batch(&ops, now_ms) {
            self.stats.failures += 1;
            error!(
                "event=store_flush module=store status=error backend={} queued={} error={}",
                self.backend.name(),
                batch.len(),
                err
            );
            self.buffer.restore(batch, now_ms);
            return Err(err.into());
        }

        self.stats.flushes += 1;
        self.stats.rows_written += ops.len() as u64;
        debug!(
            "event=store_flush module=store status=ok backend={} queued={} rows={}",
            self.backend.name(),
            batch.len(),
            ops.len()
        );
        for write in batch {
            self.publish_after_commit(write.notice, now_ms);
        }
        Ok(ops.len())
    }

    fn publish_after_commit(&mut self, notice: Notice, now_ms: i64) {
        let event = ChangeEvent {
            kind: notice.kind,
            concept_id: notice.concept_id,
            at_ms: now_ms,
        };
        self.bus.publish_deferred(notice.channel, event);
        self.bus.publish_deferred(Channel::AnyChange, event);
    }

    fn put_concept(&mut self, concept: Concept, kind: ChangeKind) -> StoreResult<()> {
        let serialized = serialize_concept(&concept)?;
        let id = concept.id;
        if !self.order.contains(&id) {
            self.order.push(id);
        }
        self.concepts.insert(id, concept);
        self.buffer.enqueue(
            QueuedWrite {
                op: WriteOp::PutConcept(serialized),
                notice: Notice {
                    channel: Channel::Concept(id),
                    kind,
                    concept_id: Some(id),
                },
            },
            self.clock.now_ms(),
        );
        Ok(())
    }

    fn queue_settings(&mut self, settings: &Settings) -> StoreResult<()> {
        let json = serde_json::to_string(settings)?;
        self.buffer.enqueue(
            QueuedWrite {
                op: WriteOp::PutSettings(json),
                notice: Notice {
                    channel: Channel::Settings,
                    kind: ChangeKind::SettingsSaved,
                    concept_id: None,
                },
            },
            self.clock.now_ms(),
        );
        Ok(())
    }

    /// Returns false when the backend could not be read.
    fn load_all(&mut self) -> bool {
        let rows = match self.backend.read_all_concepts() {
            Ok(rows) => rows,
            Err(err) => {
                warn!(
                    "event=store_read_all module=store status=error backend={} error={}",
                    self.backend.name(),
                    err
                );
                return false;
            }
        };

        let mut order = Vec::with_capacity(rows.len());
        for raw in rows {
            let concept = match hydrate_concept(&raw) {
                Ok(concept) => concept,
                Err(err) => {
                    warn!("event=store_hydrate module=store status=error error={err}");
                    continue;
                }
            };
            order.push(concept.id);
            // Cached entries may carry writes that are not durable yet.
            self.concepts.entry(concept.id).or_insert(concept);
        }
        for id in &self.order {
            if !order.contains(id) && self.concepts.contains_key(id) {
                order.push(*id);
            }
        }
        self.order = order;
        self.all_loaded = true;
        true
    }
}

impl<B: StorageBackend, C: Clock> ConceptStore for CachedStore<B, C> {
    fn is_valid(&self) -> bool {
        match self.backend.is_initialized() {
            Ok(valid) => valid,
            Err(err) => {
                warn!(
                    "event=store_is_valid module=store status=error backend={} error={}",
                    self.backend.name(),
                    err
                );
                false
            }
        }
    }

    fn init(&mut self, settings: &Settings, concepts: &[Concept]) -> StoreResult<()> {
        // Earlier queued writes must not land on top of the initial load.
        self.flush_now()?;

        let settings_json = serde_json::to_string(settings)?;
        let rows = concepts
            .iter()
            .map(serialize_concept)
            .collect::<StoreResult<Vec<_>>>()?;
        let now_ms = self.clock.now_ms();
        self.backend
            .initialize(&settings_json, &rows, DATA_VERSION, now_ms)?;

        self.settings = Some(settings.clone());
        for concept in concepts {
            if !self.order.contains(&concept.id) {
                self.order.push(concept.id);
            }
            self.concepts.insert(concept.id, concept.clone());
        }
        self.bus.publish_deferred(
            Channel::AnyChange,
            ChangeEvent {
                kind: ChangeKind::Initialized,
                concept_id: None,
                at_ms: now_ms,
            },
        );
        info!(
            "event=store_init module=store status=ok backend={} concepts={}",
            self.backend.name(),
            concepts.len()
        );
        Ok(())
    }

    fn get_concept(&mut self, id: ConceptId) -> Option<Concept> {
        if let Some(concept) = self.concepts.get(&id) {
            return Some(concept.clone());
        }
        let raw = match self.backend.read_concept(id) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    "event=store_read module=store status=error backend={} concept_id={} error={}",
                    self.backend.name(),
                    id,
                    err
                );
                return None;
            }
        };
        match hydrate_concept(&raw) {
            Ok(concept) => {
                self.order.push(id);
                self.concepts.insert(id, concept.clone());
                Some(concept)
            }
            Err(err) => {
                warn!("event=store_hydrate module=store status=error concept_id={id} error={err}");
                None
            }
        }
    }

    fn get_all_concepts(&mut self) -> Vec<Concept> {
        // A failed bulk read reports nothing rather than a partial cache.
        if !self.all_loaded && !self.load_all() {
            return Vec::new();
        }
        self.order
            .iter()
            .filter_map(|id| self.concepts.get(id).cloned())
            .collect()
    }

    fn create_concept(&mut self, concept: Concept) -> StoreResult<()> {
        self.put_concept(concept, ChangeKind::Created)
    }

    fn update_concept(&mut self, concept: Concept) -> StoreResult<()> {
        self.put_concept(concept, ChangeKind::Updated)
    }

    fn get_settings(&mut self) -> Settings {
        if let Some(settings) = &self.settings {
            return settings.clone();
        }
        let stored = match self.backend.read_settings() {
            Ok(stored) => stored,
            Err(err) => {
                // Defaults are not persisted here; that would overwrite
                // settings that are only unreadable for now.
                warn!(
                    "event=store_read_settings module=store status=error backend={} error={}",
                    self.backend.name(),
                    err
                );
                return Settings::default();
            }
        };
        if let Some(raw) = stored {
            match hydrate_settings(&raw) {
                Ok(settings) => {
                    self.settings = Some(settings.clone());
                    return settings;
                }
                Err(err) => {
                    warn!("event=store_hydrate_settings module=store status=error error={err}");
                }
            }
        }

        let defaults = Settings::default();
        self.settings = Some(defaults.clone());
        if let Err(err) = self.queue_settings(&defaults) {
            warn!("event=store_default_settings module=store status=error error={err}");
        }
        defaults
    }

    fn save_settings(&mut self, settings: Settings) -> StoreResult<()> {
        self.queue_settings(&settings)?;
        self.settings = Some(settings);
        Ok(())
    }

    fn get_last_updated_time(&self) -> Option<i64> {
        self.backend.read_last_updated().unwrap_or_else(|err| {
            warn!("event=store_last_updated module=store status=error error={err}");
            None
        })
    }

    fn get_version(&self) -> Option<u32> {
        self.backend.read_version().unwrap_or_else(|err| {
            warn!("event=store_version module=store status=error error={err}");
            None
        })
    }

    fn set_version(&mut self, version: u32) -> StoreResult<()> {
        self.backend.write_version(version)?;
        info!("event=store_set_version module=store status=ok version={version}");
        Ok(())
    }

    fn subscribe_concept(&mut self, channel: Channel, callback: ChangeCallback) -> SubscriptionId {
        self.bus.subscribe(channel, callback)
    }

    fn unsubscribe_concept(&mut self, subscription: SubscriptionId) -> bool {
        self.bus.unsubscribe(subscription)
    }

    fn run_turn(&mut self) -> StoreResult<TurnOutcome> {
        let delivered = self.bus.dispatch_pending();
        let now_ms = self.clock.now_ms();
        let rows_written = if self.buffer.is_due(now_ms) {
            self.flush(now_ms)?
        } else {
            0
        };
        Ok(TurnOutcome {
            delivered,
            rows_written,
        })
    }

    fn run_until_idle(&mut self) -> StoreResult<TurnOutcome> {
        let rows_written = self.flush_now()?;
        let delivered = self.bus.dispatch_pending();
        Ok(TurnOutcome {
            delivered,
            rows_written,
        })
    }
}

fn serialize_concept(concept: &Concept) -> StoreResult<SerializedConcept> {
    Ok(SerializedConcept {
        id: concept.id,
        kind: concept.kind().to_string(),
        json: serde_json::to_string(concept)?,
    })
}
