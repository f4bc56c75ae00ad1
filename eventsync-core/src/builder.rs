//! Aggregate construction and identity.

use std::collections::BTreeMap;

use eventsync_sdk::objects::{AggregatePayload, EventGroupPayload, SelectionPolicy, TriggerType};
use itertools::Itertools;
use ring::digest::{SHA256, digest};
use time::OffsetDateTime;

use crate::config::ServiceConfig;
use crate::events::{Event, WindowEvents};

/// Window statistics and selected events of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateGroup {
    pub source_key: String,
    /// Oldest window event, before selection.
    pub first_event_time: Option<OffsetDateTime>,
    /// Youngest window event, before selection.
    pub last_event_time: Option<OffsetDateTime>,
    /// Number of window events, before selection.
    pub count: usize,
    pub min_occurrence: u32,
    pub selection_policy: SelectionPolicy,
    /// Ordered by reception time, then external id.
    pub selected_events: Vec<Event>,
}

/// The notification published at the end of a trigger cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// Hex SHA-256 of the selected events' external ids.
    pub id: String,
    pub generated_at: OffsetDateTime,
    pub service_name: String,
    pub trigger_type: TriggerType,
    /// One group per configured endpoint, in configuration order.
    pub groups: Vec<AggregateGroup>,
}

impl Aggregate {
    pub fn group(&self, source_key: &str) -> Option<&AggregateGroup> {
        self.groups.iter().find(|g| g.source_key == source_key)
    }

    pub fn to_payload(&self) -> AggregatePayload {
        AggregatePayload {
            event_id: self.id.clone(),
            date: self.generated_at,
            service_name: self.service_name.clone(),
            trigger_type: self.trigger_type,
            events: self
                .groups
                .iter()
                .map(|g| {
                    let payload = EventGroupPayload {
                        first_event_date: g.first_event_time,
                        last_event_date: g.last_event_time,
                        number_of_events: g.count,
                        min_nb_of_occurrence: g.min_occurrence,
                        event_to_send: g.selection_policy,
                        events: g.selected_events.iter().map(Event::to_payload).collect(),
                    };
                    (g.source_key.clone(), payload)
                })
                .collect::<BTreeMap<_, _>>(),
        }
    }
}

/// Build the aggregate of a window.
///
/// Every configured endpoint gets a group, even without events. The result
/// does not depend on the order of the events in `window`.
pub fn build(
    window: &WindowEvents,
    config: &ServiceConfig,
    generated_at: OffsetDateTime,
) -> Aggregate {
    let groups = config
        .endpoints
        .iter()
        .map(|endpoint| {
            let events = window
                .get(&endpoint.event_key)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let ordered = events
                .iter()
                .sorted_by(|a, b| {
                    a.received_at
                        .cmp(&b.received_at)
                        .then_with(|| a.external_id.cmp(&b.external_id))
                })
                .collect::<Vec<_>>();

            AggregateGroup {
                source_key: endpoint.event_key.clone(),
                first_event_time: ordered.first().map(|e| e.received_at),
                last_event_time: ordered.last().map(|e| e.received_at),
                count: ordered.len(),
                min_occurrence: endpoint.min_occurrence,
                selection_policy: endpoint.selection_policy,
                selected_events: select(&ordered, endpoint.selection_policy)
                    .into_iter()
                    .cloned()
                    .collect(),
            }
        })
        .collect::<Vec<_>>();

    let id = fingerprint(groups.iter().flat_map(|g| {
        g.selected_events
            .iter()
            .map(|e| e.external_id.as_str())
            .sorted()
    }));

    Aggregate {
        id,
        generated_at,
        service_name: config.service_name.clone(),
        trigger_type: config.trigger.trigger_type,
        groups,
    }
}

/// Apply a selection policy to chronologically ordered events.
fn select<'a>(ordered: &[&'a Event], policy: SelectionPolicy) -> Vec<&'a Event> {
    match (policy, ordered) {
        (_, []) => Vec::new(),
        (SelectionPolicy::All, _) => ordered.to_vec(),
        (SelectionPolicy::First, [first, ..]) => vec![*first],
        (SelectionPolicy::Last, [.., last]) => vec![*last],
        (SelectionPolicy::Boundaries, [only]) => vec![*only],
        (SelectionPolicy::Boundaries, [first, .., last]) => vec![*first, *last],
    }
}

/// Hex SHA-256 of the concatenated ids.
pub fn fingerprint<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let concatenated = ids.into_iter().collect::<String>();
    hex::encode(digest(&SHA256, concatenated.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::tests::event;
    use crate::matcher::tests::two_entry_config;
    use time::Duration;
    use time::macros::datetime;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn three_hourly_events() -> WindowEvents {
        let t = datetime!(2024-05-01 12:00 UTC);
        let mut window = WindowEvents::new();
        window.insert("entry1".to_string(), vec![event("entry1", "a1", t)]);
        window.insert(
            "entry2".to_string(),
            vec![
                event("entry2", "b-now", t),
                event("entry2", "b-after", t + Duration::hours(1)),
                event("entry2", "b-before", t - Duration::hours(1)),
            ],
        );
        window
    }

    fn selected_ids(aggregate: &Aggregate, key: &str) -> Vec<String> {
        aggregate
            .group(key)
            .unwrap()
            .selected_events
            .iter()
            .map(|e| e.external_id.clone())
            .collect()
    }

    #[test]
    fn test_selection_policies() {
        let window = three_hourly_events();
        let now = OffsetDateTime::now_utc();
        let mut config = two_entry_config();

        let cases = [
            (SelectionPolicy::All, vec!["b-before", "b-now", "b-after"]),
            (SelectionPolicy::First, vec!["b-before"]),
            (SelectionPolicy::Last, vec!["b-after"]),
            (SelectionPolicy::Boundaries, vec!["b-before", "b-after"]),
        ];
        for (policy, expected) in cases {
            config.endpoints[1].selection_policy = policy;
            let aggregate = build(&window, &config, now);
            assert_eq!(selected_ids(&aggregate, "entry2"), expected, "{policy}");

            let group = aggregate.group("entry2").unwrap();
            assert_eq!(group.count, 3);
            assert_eq!(group.first_event_time, Some(datetime!(2024-05-01 11:00 UTC)));
            assert_eq!(group.last_event_time, Some(datetime!(2024-05-01 13:00 UTC)));
        }
    }

    #[test]
    fn test_boundaries_with_single_event() {
        let window = three_hourly_events();
        let mut config = two_entry_config();
        config.endpoints[0].selection_policy = SelectionPolicy::Boundaries;

        let aggregate = build(&window, &config, OffsetDateTime::now_utc());
        assert_eq!(selected_ids(&aggregate, "entry1"), vec!["a1"]);
    }

    #[test]
    fn test_id_ignores_input_order() {
        let config = two_entry_config();
        let now = OffsetDateTime::now_utc();
        let window = three_hourly_events();
        let mut reversed = window.clone();
        for events in reversed.values_mut() {
            events.reverse();
        }

        let a = build(&window, &config, now);
        let b = build(&reversed, &config, now);
        assert_eq!(a.id, b.id);
        assert_eq!(a, b);

        // entry1 ids first, then entry2 ids in lexicographic order
        assert_eq!(a.id, fingerprint(["a1", "b-after", "b-before", "b-now"]));
    }

    #[test]
    fn test_empty_window() {
        let config = two_entry_config();
        let aggregate = build(&WindowEvents::new(), &config, OffsetDateTime::now_utc());

        assert_eq!(aggregate.id, EMPTY_SHA256);
        assert_eq!(aggregate.groups.len(), 2);
        let group = aggregate.group("entry1").unwrap();
        assert_eq!(group.count, 0);
        assert_eq!(group.first_event_time, None);
        assert!(group.selected_events.is_empty());
    }

    #[test]
    fn test_payload_keeps_every_endpoint() {
        let mut config = two_entry_config();
        config.endpoints[1].selection_policy = SelectionPolicy::First;
        let now = datetime!(2024-05-01 14:00 UTC);
        let aggregate = build(&three_hourly_events(), &config, now);

        let payload = aggregate.to_payload();
        assert_eq!(payload.event_id, aggregate.id);
        assert_eq!(payload.date, now);
        assert_eq!(payload.service_name, "test-service");
        assert_eq!(payload.events.len(), 2);

        let group = &payload.events["entry2"];
        assert_eq!(group.number_of_events, 3);
        assert_eq!(group.event_to_send, SelectionPolicy::First);
        assert_eq!(group.events.len(), 1);
        assert_eq!(group.events[0].datetime, datetime!(2024-05-01 11:00 UTC));
    }
}
