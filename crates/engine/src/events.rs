use cartsync_core::ids::ProductId;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// User-facing notification channel. The engine emits short messages at
/// mutation outcomes, queued-while-offline variants, and sync completion;
/// what happens to them (toast, log, nothing) is the host's business.
pub trait Notifier {
    fn emit(&self, level: NoticeLevel, message: &str);
}

/// Discards every notice.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn emit(&self, _level: NoticeLevel, _message: &str) {}
}

/// One event per meaningful engine transition.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent {
    ItemAdded { product_id: ProductId, quantity: u32 },
    ItemAddFailed { product_id: ProductId, error: String },
    ItemRemoved { product_id: ProductId },
    QuantityUpdated { product_id: ProductId, quantity: u32 },
    CartCleared,
    CartSynced { version: u64, item_count: u32 },
    QueueProcessed { resolved: usize, pending: usize },
}

/// Analytics channel.
pub trait Analytics {
    fn record(&self, event: AnalyticsEvent);
}

/// Discards every event.
pub struct NullAnalytics;

impl Analytics for NullAnalytics {
    fn record(&self, _event: AnalyticsEvent) {}
}
