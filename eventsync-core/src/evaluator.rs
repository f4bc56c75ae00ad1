//! Trigger condition evaluation.

use eventsync_sdk::objects::TriggerType;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::events::WindowEvents;

/// Whether the window satisfies every endpoint.
///
/// Always `false` for trigger type `none`. Otherwise each configured endpoint
/// must have at least `min_occurrence` (and at least one) window events.
pub fn needed(window: &WindowEvents, config: &ServiceConfig) -> bool {
    if config.trigger.trigger_type == TriggerType::None {
        debug!("trigger type is none, no automatic evaluation");
        return false;
    }

    config.endpoints.iter().all(|endpoint| {
        let count = window.get(&endpoint.event_key).map_or(0, Vec::len);
        let satisfied = count >= 1 && count >= endpoint.min_occurrence as usize;
        if !satisfied {
            debug!(
                event_key = %endpoint.event_key,
                min_occurrence = endpoint.min_occurrence,
                count,
                "endpoint not satisfied"
            );
        }
        satisfied
    })
}
