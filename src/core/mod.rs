//! Monitoring core: probing, discovery, scheduling and the monitor service.

pub mod batch;
pub mod classifier;
pub mod discovery;
pub mod http;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod prober;
pub mod scheduler;
pub mod upstream;

pub use batch::BatchRunner;
pub use classifier::{ProbeKind, classify};
pub use discovery::{FALLBACK_MODELS, discover, fallback_catalog};
pub use models::{
    CacheSnapshot, CatalogSource, ModelCatalog, ModelStatus, MonitorSnapshot, ProbeState,
    RefreshReport, StatusMap, StatusStats,
};
pub use monitor::{ModelMonitor, MonitorBuilder};
pub use prober::Prober;
pub use scheduler::{RefreshPolicy, RefreshTrigger, SchedulerState};
pub use upstream::{ChatProbe, ModelApi, OpenAiCompatApi};
