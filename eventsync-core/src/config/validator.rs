//! Semantic validation of the service description.
//!
//! Every check runs even after a failure so that the operator gets the full
//! list of problems in one go.

use std::fmt::Write as _;

use eventsync_sdk::headers::EVENT_PATH_PREFIX;
use eventsync_sdk::objects::{
    EndpointDocument, HttpMethod, SelectionPolicy, ServiceConfigDocument, TargetSinkDocument,
    TriggerDocument, TriggerType,
};
use thiserror::Error;
use url::Url;

use super::{Endpoint, MethodSet, ServiceConfig, SinkTarget, TriggerConfig};

/// A single problem found in the service description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigViolation {
    #[error("the serviceName must be set")]
    EmptyServiceName,

    #[error("the endpoints definition must contain at least 2 entries, found {found}")]
    NotEnoughEndpoints { found: usize },

    #[error("the endpoint eventKey must not be empty at index {index}")]
    EmptyEventKey { index: usize },

    #[error("the eventKey {event_key:?} is duplicated at index {first} and {second}")]
    DuplicateEventKey {
        event_key: String,
        first: usize,
        second: usize,
    },

    #[error("the accepted method {method:?} is not valid for the endpoint {event_key:?}")]
    InvalidMethod { event_key: String, method: String },

    #[error(
        "the minimal number of occurrences must be positive for the endpoint {event_key:?}, got {value}"
    )]
    InvalidMinOccurrence { event_key: String, value: i64 },

    #[error(
        "the event to send value {value:?} is not valid for the endpoint {event_key:?}; accepted values are ALL, FIRST, LAST, BOUNDARIES"
    )]
    InvalidSelectionPolicy { event_key: String, value: String },

    #[error("the trigger conditions and type must be set")]
    MissingTrigger,

    #[error("the trigger type must be \"window\" or \"none\", got {value:?}")]
    InvalidTriggerType { value: String },

    #[error("the observation period of the trigger must be > 0, got {value}")]
    NonPositiveObservationPeriod { value: i64 },

    #[error("the targetSink definition must be set")]
    MissingSink,

    #[error("invalid targetSink: {reason}")]
    InvalidSinkTarget { reason: String },
}

/// Every violation found in a service description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedConfigError {
    pub violations: Vec<ConfigViolation>,
}

impl std::error::Error for AggregatedConfigError {}

impl std::fmt::Display for AggregatedConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "the service description contains {} blocking error(s):",
            self.violations.len()
        )?;
        for violation in &self.violations {
            writeln!(f, "  - {violation}")?;
        }
        Ok(())
    }
}

/// A normalized configuration together with the acceptance report shown to
/// the operator on startup.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: ServiceConfig,
    pub report: String,
}

/// Validate and normalize a raw service description.
///
/// Methods are matched case-insensitively and rewritten in uppercase; an
/// empty method list means all 8 methods. A `minNbOfOccurrence` of 0 becomes
/// 1 and an empty `eventToSend` becomes `ALL`.
pub fn validate(doc: &ServiceConfigDocument) -> Result<ValidatedConfig, AggregatedConfigError> {
    let mut violations = Vec::new();
    let mut report = String::from("the service description is correct:\n");

    if doc.service_name.is_empty() {
        violations.push(ConfigViolation::EmptyServiceName);
    } else {
        let _ = writeln!(report, "service name {:?}", doc.service_name);
    }

    let endpoints = validate_endpoints(&doc.endpoints, &mut violations, &mut report);
    let trigger = validate_trigger(doc.trigger.as_ref(), &mut violations, &mut report);
    let sink = validate_sink(doc.target_sink.as_ref(), &mut violations, &mut report);

    match (trigger, sink) {
        (Some(trigger), Some(sink)) if violations.is_empty() => Ok(ValidatedConfig {
            config: ServiceConfig {
                service_name: doc.service_name.clone(),
                endpoints,
                trigger,
                sink,
            },
            report,
        }),
        _ => Err(AggregatedConfigError { violations }),
    }
}

fn validate_endpoints(
    docs: &[EndpointDocument],
    violations: &mut Vec<ConfigViolation>,
    report: &mut String,
) -> Vec<Endpoint> {
    if docs.len() < 2 {
        violations.push(ConfigViolation::NotEnoughEndpoints { found: docs.len() });
    }
    let _ = writeln!(report, "endpoints:");

    let mut endpoints = Vec::with_capacity(docs.len());
    for (index, doc) in docs.iter().enumerate() {
        if doc.event_key.is_empty() {
            violations.push(ConfigViolation::EmptyEventKey { index });
        }
        if let Some(first) = docs[..index]
            .iter()
            .position(|other| other.event_key == doc.event_key)
        {
            violations.push(ConfigViolation::DuplicateEventKey {
                event_key: doc.event_key.clone(),
                first,
                second: index,
            });
        }

        let mut accepted_methods = MethodSet::new();
        for token in &doc.accepted_http_methods {
            match HttpMethod::parse_ignore_case(token) {
                Some(method) if !accepted_methods.contains(&method) => {
                    accepted_methods.push(method)
                }
                Some(_) => {}
                None => violations.push(ConfigViolation::InvalidMethod {
                    event_key: doc.event_key.clone(),
                    method: token.clone(),
                }),
            }
        }
        if doc.accepted_http_methods.is_empty() {
            accepted_methods.extend(HttpMethod::ALL);
        }

        let min_occurrence = match doc.min_nb_of_occurrence {
            0 => 1,
            value => u32::try_from(value).unwrap_or_else(|_| {
                violations.push(ConfigViolation::InvalidMinOccurrence {
                    event_key: doc.event_key.clone(),
                    value,
                });
                1
            }),
        };

        let selection_policy = if doc.event_to_send.is_empty() {
            SelectionPolicy::default()
        } else {
            SelectionPolicy::from_token(&doc.event_to_send).unwrap_or_else(|| {
                violations.push(ConfigViolation::InvalidSelectionPolicy {
                    event_key: doc.event_key.clone(),
                    value: doc.event_to_send.clone(),
                });
                SelectionPolicy::default()
            })
        };

        let methods = accepted_methods
            .iter()
            .map(HttpMethod::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            report,
            "  {}. {:?} at {EVENT_PATH_PREFIX}{}, methods [{methods}], at least {min_occurrence} event(s), sends {}",
            index + 1,
            doc.event_key,
            doc.event_key,
            describe_policy(selection_policy),
        );

        endpoints.push(Endpoint {
            event_key: doc.event_key.clone(),
            accepted_methods,
            min_occurrence,
            selection_policy,
        });
    }
    endpoints
}

fn describe_policy(policy: SelectionPolicy) -> &'static str {
    match policy {
        SelectionPolicy::All => "all the window events",
        SelectionPolicy::First => "the first window event",
        SelectionPolicy::Last => "the latest window event",
        SelectionPolicy::Boundaries => "the first and latest window events",
    }
}

fn validate_trigger(
    doc: Option<&TriggerDocument>,
    violations: &mut Vec<ConfigViolation>,
    report: &mut String,
) -> Option<TriggerConfig> {
    let Some(doc) = doc else {
        violations.push(ConfigViolation::MissingTrigger);
        return None;
    };

    let trigger_type = TriggerType::from_token(&doc.trigger_type);
    if trigger_type.is_none() {
        violations.push(ConfigViolation::InvalidTriggerType {
            value: doc.trigger_type.clone(),
        });
    }

    let observation_period_secs = u64::try_from(doc.observation_period)
        .ok()
        .filter(|secs| *secs > 0);
    if observation_period_secs.is_none() {
        violations.push(ConfigViolation::NonPositiveObservationPeriod {
            value: doc.observation_period,
        });
    }

    let trigger_type = trigger_type?;
    let observation_period_secs = observation_period_secs?;
    let _ = writeln!(
        report,
        "trigger {trigger_type} over the last {observation_period_secs} second(s), events {}",
        if doc.keep_event_after_trigger {
            "kept after a trigger"
        } else {
            "exported only once"
        }
    );

    Some(TriggerConfig {
        trigger_type,
        observation_period_secs,
        keep_after_trigger: doc.keep_event_after_trigger,
    })
}

fn validate_sink(
    doc: Option<&TargetSinkDocument>,
    violations: &mut Vec<ConfigViolation>,
    report: &mut String,
) -> Option<SinkTarget> {
    let Some(doc) = doc else {
        violations.push(ConfigViolation::MissingSink);
        return None;
    };

    match parse_sink(doc) {
        Ok(sink) => {
            let _ = writeln!(report, "aggregates published to {sink}");
            Some(sink)
        }
        Err(reason) => {
            violations.push(ConfigViolation::InvalidSinkTarget { reason });
            None
        }
    }
}

fn parse_sink(doc: &TargetSinkDocument) -> Result<SinkTarget, String> {
    match (&doc.topic, &doc.webhook) {
        (Some(topic), None) => parse_topic(topic),
        (None, Some(webhook)) => {
            let url = Url::parse(webhook).map_err(|e| format!("webhook {webhook:?}: {e}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(format!("webhook {webhook:?} must be an http(s) URL"));
            }
            Ok(SinkTarget::Webhook { url })
        }
        (Some(_), Some(_)) => Err("only one of topic or webhook may be set".to_string()),
        (None, None) => Err("one of topic or webhook must be set".to_string()),
    }
}

fn parse_topic(topic: &str) -> Result<SinkTarget, String> {
    match topic.split('/').collect::<Vec<_>>().as_slice() {
        ["projects", project, "topics", name] if !project.is_empty() && !name.is_empty() => {
            Ok(SinkTarget::PubSubTopic {
                project: project.to_string(),
                topic: name.to_string(),
            })
        }
        _ => Err(format!(
            "the topic format must be \"projects/<ProjectID>/topics/<TopicName>\", got {topic:?}"
        )),
    }
}
