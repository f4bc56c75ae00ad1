//! Trigger cycle orchestration.
//!
//! - `PublishCoordinator`: query → evaluate → build → publish → mark consumed
//! - `EventIngestor`: match → store → trigger (inline or in the background)
//! - `SingleFlight`: one cycle at a time per service
//! - `RetryPolicy`: bounded backoff around store and sink calls

pub mod coordinator;
pub mod ingestor;
pub mod retry;
pub mod single_flight;

pub use coordinator::{CoordinatorError, PublishCoordinator, TriggerMode, TriggerOutcome};
pub use ingestor::{
    EventIngestor, IncomingEvent, IngestError, IngestOutcome, TriggerProcessing, TriggerStatus,
};
pub use retry::{RetryPolicy, Retryable};
pub use single_flight::{AcquireError, LockMode, SingleFlight};
