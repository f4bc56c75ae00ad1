pub mod admin;
pub mod aggregate;
pub mod config;
pub mod method;
pub mod policy;

pub use admin::{ErrorResponse, IngestResponse, ResetResponse, TriggerReport, TriggerResponse};
pub use aggregate::{AggregatePayload, EventGroupPayload, EventPayload};
pub use config::{EndpointDocument, ServiceConfigDocument, TargetSinkDocument, TriggerDocument};
pub use method::{HttpMethod, UnknownHttpMethod};
pub use policy::{SelectionPolicy, TriggerType};
