pub mod config;
pub mod desk;
pub mod ingest;
pub mod journal;
pub mod merchant_api;
pub mod metrics;
pub mod notify;
pub mod order;
pub mod testing;
pub mod timer;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use desk::{
    create_desk, DeskDeps, DeskError, DeskEvent, DeskHandle, DeskRunner, DeskSnapshot,
    IngestOutcome,
};
pub use ingest::{IngestController, IngestError, IngestStatus, InboundEvent, LinkState};
pub use journal::{JournalError, OrderJournal, SqliteOrderJournal};
pub use merchant_api::{HttpOrderApi, OrderApi, OrderApiError};
pub use notify::{AlertError, AlertSink, LogAlertSink};
pub use order::{NewOrder, Order, OrderBoard, OrderPhase, ReturnSource, ServerStatus};
pub use timer::{AdherenceBand, OrderTimers};
