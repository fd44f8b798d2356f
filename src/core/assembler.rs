/// Event assembler: turns shape-checked records into fully parsed events.

use thiserror::Error;

use crate::core::condition::parse_condition;
use crate::core::expression::{ParseContext, ParseError};
use crate::core::operation::parse_operations;
use crate::core::validate::EventRecord;
use crate::schema::event::{Action, Event, Trigger, Triggers};

/// A DSL error located in its source event.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{location}: {source}")]
pub struct AssembleError {
    /// `storyline/event`
    pub location: String,
    pub source: ParseError,
}

/// Parse every condition and operation of an event record. Triggers, action
/// conditions and operations all resolve `sl.` against the event's own
/// storyline.
pub fn build_event(record: &EventRecord) -> Result<Event, AssembleError> {
    let context = ParseContext::for_storyline(&record.storyline);
    let located = |source: ParseError| AssembleError {
        location: record.location(),
        source,
    };

    let mut triggers = Triggers::default();
    for (kind, trigger) in &record.triggers {
        let condition = parse_condition(&trigger.condition, &context).map_err(located)?;
        triggers.set(
            *kind,
            Trigger {
                condition,
                weight: trigger.weight,
            },
        );
    }

    let mut actions = indexmap::IndexMap::with_capacity(record.actions.len());
    for (name, action) in &record.actions {
        let operations = parse_operations(&action.operations, &context).map_err(located)?;
        let condition = action
            .condition
            .as_ref()
            .map(|c| parse_condition(c, &context))
            .transpose()
            .map_err(located)?;
        actions.insert(
            name.clone(),
            Action {
                operations,
                condition,
            },
        );
    }

    let on_display = parse_operations(&record.on_display, &context).map_err(located)?;

    Ok(Event {
        event: record.event.clone(),
        storyline: record.storyline.clone(),
        description: record.description.clone(),
        repeatable: record.repeatable,
        on_display,
        triggers,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validate::validate_event;
    use crate::schema::condition::{ComparisonOperator, Condition};
    use crate::schema::operation::AssignmentOperator;
    use crate::schema::value::{StateAccess, Value};
    use serde_json::json;

    fn record(header: serde_json::Value) -> EventRecord {
        validate_event(&header, "storyline_slug", "event_slug", "Description").unwrap()
    }

    #[test]
    fn most_basic_event() {
        let event = build_event(&record(serde_json::Value::Null)).unwrap();
        assert_eq!(event.slug(), "storyline_slug/event_slug");
        assert_eq!(event.description, "Description");
        assert!(!event.repeatable);
        assert_eq!(event.triggers, Triggers::default());
        assert!(event.actions.is_empty());
        assert!(event.on_display.is_empty());
    }

    #[test]
    fn trigger_condition_uses_storyline_context() {
        let event = build_event(&record(json!({
            "triggers": {"hard": {"condition": "sl.seen == false"}}
        })))
        .unwrap();
        let hard = event.triggers.hard.unwrap();
        assert_eq!(hard.weight, 1.0);
        assert_eq!(
            hard.condition,
            Condition::atomic(
                Value::state(["storylines", "storyline_slug", "seen"]),
                ComparisonOperator::Eq,
                Value::Bool(false)
            )
        );
        assert!(event.triggers.soft.is_none());
    }

    #[test]
    fn soft_trigger_keeps_weight() {
        let event = build_event(&record(json!({
            "triggers": {"soft": {"condition": {"OR": ["g.a == 1", "g.b == 2"]}, "weight": 3}}
        })))
        .unwrap();
        assert_eq!(event.triggers.soft.unwrap().weight, 3.0);
    }

    #[test]
    fn actions_operations_and_conditions() {
        let event = build_event(&record(json!({
            "on_display": ["sl.visits += 1"],
            "actions": {
                "OK": {"operations": ["global.test = false"]},
                "Pay": {"operations": ["r.gold -= 10"], "condition": "r.gold >= 10"}
            }
        })))
        .unwrap();

        let ok = &event.actions["OK"];
        assert_eq!(ok.operations.len(), 1);
        assert_eq!(ok.operations[0].lhs, StateAccess::new(["global", "test"]));
        assert_eq!(ok.operations[0].operator, AssignmentOperator::Assign);
        assert!(ok.condition.is_none());
        assert!(event.actions["Pay"].condition.is_some());

        assert_eq!(
            event.on_display[0].lhs,
            StateAccess::new(["storylines", "storyline_slug", "visits"])
        );
    }

    #[test]
    fn errors_carry_location() {
        let err = build_event(&record(json!({
            "actions": {"OK": {"operations": ["global.test == false"]}}
        })))
        .unwrap_err();
        assert_eq!(err.location, "storyline_slug/event_slug");
        assert!(matches!(err.source, ParseError::InvalidOperator { .. }));
        assert!(err.to_string().starts_with("storyline_slug/event_slug: "));
    }

    #[test]
    fn bad_trigger_condition_fails() {
        let err = build_event(&record(json!({
            "triggers": {"soft": {"condition": "g.turn += 1"}}
        })))
        .unwrap_err();
        assert!(matches!(err.source, ParseError::InvalidOperator { .. }));
    }
}
