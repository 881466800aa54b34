pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod queue;
pub mod retry;
pub mod rollback;

pub use api::{AddItemRequest, ApiError, CartApi, RemoteCart};
pub use config::EngineConfig;
pub use error::EngineError;
pub use events::{
    Analytics, AnalyticsEvent, Notifier, NoticeLevel, NullAnalytics, NullNotifier,
};
pub use queue::QueueReport;
pub use retry::{retry, RetryPolicy};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

use cartsync_core::clock::now_ms;
use cartsync_core::identity::{ItemKey, LineSelector};
use cartsync_core::ids::ProductId;
use cartsync_core::model::{CartLineItem, CartState, Product, ProductOption, MAX_QUANTITY};
use cartsync_core::ops::{CartOp, QueuedOperation};
use cartsync_core::validate::{validate_line_item, ValidationIssue};
use cartsync_storage::{SessionRecord, SessionStore, SnapshotStore, SqliteStore};

use crate::queue::OfflineQueue;
use crate::rollback::{MutationRecord, RollbackPoint};

/// How a mutation reached the command entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyMode {
    /// User-initiated: validate, apply optimistically, confirm or enqueue.
    Fresh,
    /// Queue drain: arguments were validated when first applied; local
    /// state usually already reflects the mutation, and failures feed the
    /// operation's attempt counter instead of re-queueing.
    Replay,
}

/// What a mutation call resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Confirmed by the server.
    Confirmed,
    /// Applied locally and queued for replay when connectivity returns.
    Queued,
}

/// The optimistic mutation core: owns the cart, applies mutations locally
/// first, confirms them remotely (or queues them while offline), and rolls
/// back exactly to the captured before-image on failure.
///
/// All collaborators are injected at construction; there is no global
/// instance. Mutations serialize on an internal gate, so two calls issued
/// concurrently run one after the other; reads observe the optimistic
/// state while a confirmation is still in flight.
pub struct CartEngine<A: CartApi> {
    api: A,
    config: EngineConfig,
    state: StdMutex<CartState>,
    queue: StdMutex<OfflineQueue>,
    online: AtomicBool,
    draining: AtomicBool,
    /// Serializes mutations end-to-end; held across the remote call.
    gate: AsyncMutex<()>,
    snapshots: SnapshotStore<Arc<SqliteStore>>,
    session: SessionStore<Arc<SqliteStore>>,
    notifier: Arc<dyn Notifier>,
    analytics: Arc<dyn Analytics>,
}

impl<A: CartApi> CartEngine<A> {
    pub fn new(api: A, store: SqliteStore, config: EngineConfig) -> Self {
        let store = Arc::new(store);
        Self {
            api,
            config,
            state: StdMutex::new(CartState::default()),
            queue: StdMutex::new(OfflineQueue::default()),
            online: AtomicBool::new(true),
            draining: AtomicBool::new(false),
            gate: AsyncMutex::new(()),
            snapshots: SnapshotStore::new(Arc::clone(&store)),
            session: SessionStore::new(store),
            notifier: Arc::new(NullNotifier),
            analytics: Arc::new(NullAnalytics),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn Analytics>) -> Self {
        self.analytics = analytics;
        self
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Snapshot of the current cart, derived totals included.
    pub fn cart(&self) -> CartState {
        self.state_guard().clone()
    }

    pub fn item_count(&self) -> u32 {
        self.state_guard().item_count()
    }

    pub fn total_price(&self) -> f64 {
        self.state_guard().total_price()
    }

    pub fn version(&self) -> u64 {
        self.state_guard().version
    }

    pub fn is_dirty(&self) -> bool {
        self.state_guard().is_dirty
    }

    pub fn last_synced_ms(&self) -> Option<u64> {
        self.state_guard().last_synced_ms
    }

    pub fn last_error(&self) -> Option<String> {
        self.state_guard().last_error.clone()
    }

    pub fn pending_ops(&self) -> usize {
        self.queue_guard().len()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Restore sync bookkeeping and the pending offline queue from the
    /// session store. Returns whether a previous session was found. Items
    /// are not restored here; `load_cart` owns that (with its snapshot
    /// fallback).
    pub fn resume(&self) -> Result<bool, EngineError> {
        let Some(record) = self.session.load()? else {
            return Ok(false);
        };
        {
            let mut state = self.state_guard();
            state.version = record.version;
            state.last_synced_ms = record.last_synced_ms;
            state.is_dirty = record.is_dirty;
        }
        self.queue_guard().restore(record.pending);
        Ok(true)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Put `quantity` of `product` (with the given option selections) in
    /// the cart. If a line with the same identity key already exists this
    /// is an add-on-top: it delegates to a quantity update with the summed
    /// quantity rather than creating a duplicate line.
    pub async fn add_item(
        &self,
        product: &Product,
        quantity: u32,
        selected_options: &[ProductOption],
    ) -> Result<MutationOutcome, EngineError> {
        let _gate = self.gate.lock().await;

        let key = ItemKey::for_line(&product.id, selected_options);
        let existing = {
            let state = self.state_guard();
            state
                .position_by_key(&key)
                .map(|index| state.items()[index].quantity)
        };
        let op = match existing {
            Some(current) => CartOp::Update {
                product_id: product.id.clone(),
                quantity: current.saturating_add(quantity),
                option_name: selected_options.first().map(|o| o.name.clone()),
            },
            None => CartOp::Add {
                product: product.clone(),
                quantity,
                selected_options: selected_options.to_vec(),
            },
        };
        self.apply(op, ApplyMode::Fresh).await
    }

    /// Remove the line item matching `product_id` (and `option_name`, when
    /// given). Fails with `ItemNotFound` if nothing matches.
    pub async fn remove_item(
        &self,
        product_id: &ProductId,
        option_name: Option<&str>,
    ) -> Result<MutationOutcome, EngineError> {
        let _gate = self.gate.lock().await;
        let op = CartOp::Remove {
            product_id: product_id.clone(),
            option_name: option_name.map(str::to_string),
        };
        self.apply(op, ApplyMode::Fresh).await
    }

    /// Set a line item's quantity. Zero redirects to removal — a
    /// zero-quantity line is never a persisted state.
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        new_quantity: u32,
        option_name: Option<&str>,
    ) -> Result<MutationOutcome, EngineError> {
        let _gate = self.gate.lock().await;
        let op = if new_quantity == 0 {
            CartOp::Remove {
                product_id: product_id.clone(),
                option_name: option_name.map(str::to_string),
            }
        } else {
            CartOp::Update {
                product_id: product_id.clone(),
                quantity: new_quantity,
                option_name: option_name.map(str::to_string),
            }
        };
        self.apply(op, ApplyMode::Fresh).await
    }

    /// Empty the cart. Idempotent: clearing an empty cart succeeds.
    pub async fn clear_cart(&self) -> Result<MutationOutcome, EngineError> {
        let _gate = self.gate.lock().await;
        self.apply(CartOp::Clear, ApplyMode::Fresh).await
    }

    /// Fetch the authoritative cart and replace local state wholesale.
    ///
    /// On fetch failure this degrades to the last local snapshot (or an
    /// empty cart if none survives) without surfacing an error: a stale
    /// cart view beats an error state on this path.
    pub async fn load_cart(&self) -> Result<(), EngineError> {
        let _gate = self.gate.lock().await;
        match self.api.fetch_cart().await {
            Ok(remote) => {
                let synced_at = now_ms()?;
                {
                    let mut state = self.state_guard();
                    state.replace_items(remote.items);
                    state.version = remote.version;
                    state.last_synced_ms = Some(synced_at);
                    state.last_error = None;
                }
                self.persist_snapshot();
                self.persist_session()?;
                tracing::debug!(version = remote.version, "loaded authoritative cart");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "cart fetch failed, falling back to local snapshot");
                let restored = self.snapshots.restore()?;
                let mut state = self.state_guard();
                match restored {
                    Some(snapshot) => state.replace_items(snapshot.items),
                    None => state.replace_items(Vec::new()),
                }
                Ok(())
            }
        }
    }

    // ========================================================================
    // Connectivity / Sync
    // ========================================================================

    /// Record loss of connectivity. Subsequent mutations queue instead of
    /// calling the server.
    pub fn go_offline(&self) {
        if self.online.swap(false, Ordering::SeqCst) {
            tracing::warn!("connectivity lost, mutations will queue");
            self.notifier.emit(
                NoticeLevel::Info,
                "You're offline — changes will sync when connection returns",
            );
        }
    }

    /// Record restored connectivity, wait the stabilization delay, then
    /// drain the offline queue.
    pub async fn go_online(&self) -> Result<QueueReport, EngineError> {
        if self.online.swap(true, Ordering::SeqCst) {
            // Already online; nothing to replay on a no-op transition.
            return Ok(QueueReport {
                pending: self.queue_guard().len(),
                ..QueueReport::default()
            });
        }
        tracing::info!(
            pending = self.queue_guard().len(),
            "connectivity restored, scheduling queue drain"
        );
        tokio::time::sleep(self.config.reconnect_delay).await;
        self.process_queue().await
    }

    /// Full resynchronization: pull the authoritative cart, replay the
    /// offline queue, clear the dirty flag. Fails fast when offline.
    pub async fn sync_with_server(&self) -> Result<QueueReport, EngineError> {
        if !self.is_online() {
            return Err(EngineError::Offline);
        }
        self.load_cart().await?;
        let report = self.process_queue().await?;
        {
            let mut state = self.state_guard();
            state.is_dirty = false;
        }
        self.persist_session()?;
        let (version, item_count) = {
            let state = self.state_guard();
            (state.version, state.item_count())
        };
        self.notifier.emit(NoticeLevel::Success, "Cart synced");
        self.analytics.record(AnalyticsEvent::CartSynced {
            version,
            item_count,
        });
        Ok(report)
    }

    /// Replay queued mutations in FIFO order. Single-flight: a drain
    /// started while another is running returns immediately with the
    /// current pending count.
    pub async fn process_queue(&self) -> Result<QueueReport, EngineError> {
        if self.draining.swap(true, Ordering::SeqCst) {
            return Ok(QueueReport {
                pending: self.queue_guard().len(),
                ..QueueReport::default()
            });
        }
        let result = self.drain_pass().await;
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    async fn drain_pass(&self) -> Result<QueueReport, EngineError> {
        let mut report = QueueReport::default();
        // Bounded by the length at entry so a failing op pushed to the back
        // is not retried within the same pass.
        let initial = self.queue_guard().len();

        for _ in 0..initial {
            if !self.is_online() {
                break;
            }
            let Some(mut queued) = self.queue_guard().pop_front() else {
                break;
            };
            let outcome = {
                let _gate = self.gate.lock().await;
                self.apply(queued.op.clone(), ApplyMode::Replay).await
            };
            match outcome {
                Ok(_) => report.resolved += 1,
                Err(err) => {
                    queued.attempts += 1;
                    if queued.attempts >= self.config.max_queue_attempts {
                        tracing::warn!(
                            op = queued.op.kind_name(),
                            error = %err,
                            "abandoning queued operation after retry limit"
                        );
                        report.abandoned += 1;
                    } else {
                        self.queue_guard().push(queued);
                    }
                }
            }
        }

        report.pending = self.queue_guard().len();
        self.persist_session()?;
        self.report_drain(&report);
        Ok(report)
    }

    // ========================================================================
    // Command entry point
    // ========================================================================

    /// The single command-handling entry point. Fresh mutations and queue
    /// replays both land here; the caller holds the mutation gate.
    async fn apply(&self, op: CartOp, mode: ApplyMode) -> Result<MutationOutcome, EngineError> {
        let record = match self.apply_optimistic(&op, mode) {
            Ok(record) => record,
            Err(err) => {
                if mode == ApplyMode::Fresh {
                    self.surface_failure(&op, &err);
                }
                return Err(err);
            }
        };
        self.persist_snapshot();

        if mode == ApplyMode::Fresh && !self.is_online() {
            self.enqueue(op)?;
            return Ok(MutationOutcome::Queued);
        }

        match self.confirm_remote(&op).await {
            Ok(()) => {
                self.commit_confirmed()?;
                if mode == ApplyMode::Fresh {
                    self.report_success(&op);
                }
                Ok(MutationOutcome::Confirmed)
            }
            Err(api_err) => {
                self.roll_back(record);
                self.persist_snapshot();
                let err = EngineError::Remote(api_err);
                if mode == ApplyMode::Fresh {
                    self.surface_failure(&op, &err);
                }
                Err(err)
            }
        }
    }

    /// Validate and apply the mutation to in-memory state, returning the
    /// command record whose before-image undoes it. State is read fresh
    /// here, under the lock — never cached across an await.
    fn apply_optimistic(
        &self,
        op: &CartOp,
        mode: ApplyMode,
    ) -> Result<MutationRecord, EngineError> {
        let mut state = self.state_guard();
        let before = match op {
            CartOp::Add {
                product,
                quantity,
                selected_options,
            } => {
                let candidate =
                    CartLineItem::new(product.clone(), *quantity, selected_options.clone());
                if mode == ApplyMode::Fresh {
                    let issues = validate_line_item(&candidate);
                    if !issues.is_empty() {
                        return Err(EngineError::Validation(issues));
                    }
                }
                let key = candidate.key();
                if mode == ApplyMode::Replay && state.position_by_key(&key).is_some() {
                    // Still present from the original optimistic insert.
                    RollbackPoint::Unchanged
                } else {
                    state.push_item(candidate);
                    RollbackPoint::ItemAbsent { key }
                }
            }

            CartOp::Remove {
                product_id,
                option_name,
            } => {
                let selector = LineSelector {
                    product_id: product_id.clone(),
                    option_name: option_name.clone(),
                };
                match state.position_matching(&selector) {
                    Some(index) => {
                        let item = state.remove_item(index);
                        RollbackPoint::Item { index, item }
                    }
                    None if mode == ApplyMode::Replay => RollbackPoint::Unchanged,
                    None => return Err(EngineError::ItemNotFound(product_id.to_string())),
                }
            }

            CartOp::Update {
                product_id,
                quantity,
                option_name,
            } => {
                if *quantity > MAX_QUANTITY {
                    return Err(EngineError::Validation(vec![
                        ValidationIssue::QuantityTooLarge {
                            quantity: *quantity,
                        },
                    ]));
                }
                let selector = LineSelector {
                    product_id: product_id.clone(),
                    option_name: option_name.clone(),
                };
                let index = state
                    .position_matching(&selector)
                    .ok_or_else(|| EngineError::ItemNotFound(product_id.to_string()))?;
                let prior = state.items()[index].quantity;
                let key = state.items()[index].key();
                state.set_quantity(index, *quantity);
                RollbackPoint::Quantity {
                    key,
                    quantity: prior,
                }
            }

            CartOp::Clear => {
                let items = state.items().to_vec();
                state.replace_items(Vec::new());
                RollbackPoint::AllItems { items }
            }
        };

        Ok(MutationRecord {
            kind: op.kind_name(),
            before,
            after: op.clone(),
        })
    }

    /// Confirm the mutation with the server, retried per the engine's
    /// backoff policy.
    async fn confirm_remote(&self, op: &CartOp) -> Result<(), ApiError> {
        let policy = RetryPolicy {
            max_attempts: self.config.max_attempts,
            base_delay: self.config.base_delay,
        };
        match op {
            CartOp::Add {
                product,
                quantity,
                selected_options,
            } => {
                let request = AddItemRequest {
                    product_id: product.id.clone(),
                    quantity: *quantity,
                    selected_options: selected_options.clone(),
                };
                retry(policy, || self.api.add_item(&request)).await
            }
            CartOp::Update {
                product_id,
                quantity,
                ..
            } => retry(policy, || self.api.update_item(product_id, *quantity)).await,
            CartOp::Remove { product_id, .. } => {
                retry(policy, || self.api.remove_item(product_id)).await
            }
            CartOp::Clear => retry(policy, || self.api.clear_cart()).await,
        }
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    fn commit_confirmed(&self) -> Result<(), EngineError> {
        let queue_empty = self.queue_guard().is_empty();
        let synced_at = now_ms()?;
        {
            let mut state = self.state_guard();
            state.version += 1;
            state.last_synced_ms = Some(synced_at);
            state.is_dirty = !queue_empty;
            state.last_error = None;
        }
        self.persist_session()
    }

    fn roll_back(&self, record: MutationRecord) {
        tracing::warn!(kind = record.kind, "remote confirmation failed, rolling back");
        let mut state = self.state_guard();
        record.before.reapply(&mut state);
    }

    fn enqueue(&self, op: CartOp) -> Result<(), EngineError> {
        let queued = QueuedOperation::new(op.clone(), now_ms()?);
        tracing::info!(kind = op.kind_name(), "offline, queueing mutation for replay");
        self.queue_guard().push(queued);
        self.state_guard().is_dirty = true;
        self.persist_session()?;
        self.note_queued(&op);
        Ok(())
    }

    /// Snapshot persistence is best-effort: a storage hiccup must not fail
    /// the mutation — the server confirmation decides commit or rollback.
    fn persist_snapshot(&self) {
        let items = self.state_guard().items().to_vec();
        if let Err(err) = self.snapshots.save(&items) {
            tracing::warn!(error = %err, "failed to persist cart snapshot");
        }
    }

    fn persist_session(&self) -> Result<(), EngineError> {
        let pending = self.queue_guard().snapshot();
        let record = {
            let state = self.state_guard();
            SessionRecord {
                version: state.version,
                last_synced_ms: state.last_synced_ms,
                is_dirty: state.is_dirty,
                pending,
            }
        };
        self.session.save(&record)?;
        Ok(())
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    fn report_success(&self, op: &CartOp) {
        let (message, event) = match op {
            CartOp::Add {
                product, quantity, ..
            } => (
                format!("Added {} to your cart", product.name),
                AnalyticsEvent::ItemAdded {
                    product_id: product.id.clone(),
                    quantity: *quantity,
                },
            ),
            CartOp::Update {
                product_id,
                quantity,
                ..
            } => (
                "Quantity updated".to_string(),
                AnalyticsEvent::QuantityUpdated {
                    product_id: product_id.clone(),
                    quantity: *quantity,
                },
            ),
            CartOp::Remove { product_id, .. } => (
                "Item removed from your cart".to_string(),
                AnalyticsEvent::ItemRemoved {
                    product_id: product_id.clone(),
                },
            ),
            CartOp::Clear => ("Cart cleared".to_string(), AnalyticsEvent::CartCleared),
        };
        self.notifier.emit(NoticeLevel::Success, &message);
        self.analytics.record(event);
    }

    fn note_queued(&self, op: &CartOp) {
        let message = match op {
            CartOp::Add { product, .. } => format!(
                "You're offline — {} will be added once connection returns",
                product.name
            ),
            CartOp::Update { .. } => {
                "You're offline — quantity change will sync once connection returns".to_string()
            }
            CartOp::Remove { .. } => {
                "You're offline — removal will sync once connection returns".to_string()
            }
            CartOp::Clear => {
                "You're offline — cart will be cleared once connection returns".to_string()
            }
        };
        self.notifier.emit(NoticeLevel::Info, &message);
    }

    fn surface_failure(&self, op: &CartOp, err: &EngineError) {
        let message = err.to_string();
        self.state_guard().last_error = Some(message.clone());
        self.notifier.emit(NoticeLevel::Error, &message);
        if let CartOp::Add { product, .. } = op {
            self.analytics.record(AnalyticsEvent::ItemAddFailed {
                product_id: product.id.clone(),
                error: message,
            });
        }
    }

    fn report_drain(&self, report: &QueueReport) {
        if report.resolved + report.pending + report.abandoned == 0 {
            return;
        }
        let message = if report.pending > 0 {
            format!(
                "Synced {} change(s), {} still pending",
                report.resolved, report.pending
            )
        } else {
            format!("Synced {} offline change(s)", report.resolved)
        };
        self.notifier.emit(NoticeLevel::Info, &message);
        self.analytics.record(AnalyticsEvent::QueueProcessed {
            resolved: report.resolved,
            pending: report.pending,
        });
    }

    // ========================================================================
    // Guards
    // ========================================================================

    fn state_guard(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue_guard(&self) -> MutexGuard<'_, OfflineQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
