/// Condition evaluation and operation application against a state document.

use std::cmp::Ordering;

use serde_json::Value as Json;

use crate::core::state::{kind_of, StateDocument, StateError};
use crate::schema::condition::{
    AtomicCondition, BooleanOperator, ComparisonOperator, Condition, PropositionalCondition,
};
use crate::schema::operation::{AssignmentOperator, Operation};
use crate::schema::value::json_number;

/// Strict equality: no coercion between types, numbers compare by value,
/// arrays and objects compare structurally.
pub fn json_eq(a: &Json, b: &Json) -> bool {
    match (a, b) {
        (Json::Number(x), Json::Number(y)) => x.as_f64() == y.as_f64(),
        (Json::Array(xs), Json::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Json::Object(xs), Json::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map_or(false, |y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

/// Equality over possibly undefined operands.
pub fn strict_eq(a: Option<&Json>, b: Option<&Json>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => json_eq(a, b),
        _ => false,
    }
}

fn order(a: Option<&Json>, b: Option<&Json>) -> Option<Ordering> {
    match (a?, b?) {
        (Json::Number(x), Json::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Json::String(x), Json::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn describe(value: Option<&Json>) -> &'static str {
    value.map_or("undefined", kind_of)
}

/// Evaluate a condition tree. Sub-conditions are evaluated in order and
/// short-circuit.
pub fn test_condition(state: &StateDocument, condition: &Condition) -> Result<bool, StateError> {
    match condition {
        Condition::AtomicCondition(atomic) => test_atomic(state, atomic),
        Condition::PropositionalCondition(prop) => test_propositional(state, prop),
    }
}

fn test_atomic(state: &StateDocument, condition: &AtomicCondition) -> Result<bool, StateError> {
    let lhs = state.resolve_value(&condition.lhs)?;
    let rhs = state.resolve_value(&condition.rhs)?;
    let (lhs, rhs) = (lhs.as_ref(), rhs.as_ref());

    let ordered = |accept: fn(Ordering) -> bool| order(lhs, rhs).map_or(false, accept);

    Ok(match condition.operator {
        ComparisonOperator::Eq => strict_eq(lhs, rhs),
        ComparisonOperator::Ne => !strict_eq(lhs, rhs),
        ComparisonOperator::Gt => ordered(Ordering::is_gt),
        ComparisonOperator::Ge => ordered(Ordering::is_ge),
        ComparisonOperator::Lt => ordered(Ordering::is_lt),
        ComparisonOperator::Le => ordered(Ordering::is_le),
        ComparisonOperator::In | ComparisonOperator::NotIn => {
            let items = match rhs {
                Some(Json::Array(items)) => items,
                other => {
                    return Err(StateError::NotAnArray {
                        operator: condition.operator.token().to_string(),
                        path: condition.rhs.to_string(),
                        found: describe(other),
                    })
                }
            };
            let contained = items.iter().any(|item| strict_eq(Some(item), lhs));
            contained == (condition.operator == ComparisonOperator::In)
        }
    })
}

fn test_propositional(
    state: &StateDocument,
    condition: &PropositionalCondition,
) -> Result<bool, StateError> {
    for sub in &condition.conditions {
        let passed = test_condition(state, sub)?;
        match (condition.boolean_operator, passed) {
            (BooleanOperator::And, false) => return Ok(false),
            (BooleanOperator::Or, true) => return Ok(true),
            _ => {}
        }
    }
    Ok(condition.boolean_operator == BooleanOperator::And)
}

/// Display form of a number when concatenated to a string: integral values
/// have no fractional part.
fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Apply one operation. Fails before touching state on every error.
pub fn apply_operation(state: &mut StateDocument, operation: &Operation) -> Result<(), StateError> {
    let lhs = &operation.lhs;
    let operator = operation.operator;
    let path = || lhs.path();
    let token = || operator.token().to_string();

    let missing = state.resolve_path(lhs, true)?.missing;
    if missing && operator.is_compound() {
        return Err(StateError::CompoundOnUndefined {
            operator: token(),
            path: path(),
        });
    }

    let rhs = state
        .resolve_value(&operation.rhs)?
        .ok_or_else(|| StateError::UndefinedRhs {
            operator: token(),
            path: path(),
        })?;

    match operator {
        AssignmentOperator::Assign => state.write(lhs, rhs),
        AssignmentOperator::AppendTo | AssignmentOperator::RemoveFrom => {
            let current = state.value_mut(lhs);
            let items = match current {
                Some(Json::Array(items)) => items,
                other => {
                    return Err(StateError::NotAnArray {
                        operator: token(),
                        path: path(),
                        found: describe(other.as_deref()),
                    })
                }
            };
            if operator == AssignmentOperator::AppendTo {
                items.push(rhs);
            } else {
                items.retain(|item| !json_eq(item, &rhs));
            }
            Ok(())
        }
        _ => {
            let current = state
                .resolve_path(lhs, true)?
                .value()
                .cloned()
                .unwrap_or(Json::Null);
            let result = combine(operator, &current, &rhs).ok_or_else(|| {
                StateError::IncompatibleOperands {
                    operator: token(),
                    path: path(),
                    lhs: kind_of(&current),
                    rhs: kind_of(&rhs),
                }
            })?;
            let result = match result {
                Combined::Number(n) => json_number(n).ok_or_else(|| StateError::NonFiniteResult {
                    operator: token(),
                    path: path(),
                })?,
                Combined::Text(s) => Json::String(s),
            };
            state.write(lhs, result)
        }
    }
}

enum Combined {
    Number(f64),
    Text(String),
}

/// Arithmetic and concatenation. `None` means the operand types don't mix.
fn combine(operator: AssignmentOperator, lhs: &Json, rhs: &Json) -> Option<Combined> {
    use AssignmentOperator::*;

    if operator == Add {
        match (lhs, rhs) {
            (Json::String(a), Json::String(b)) => return Some(Combined::Text(format!("{a}{b}"))),
            (Json::String(a), Json::Number(b)) => {
                return Some(Combined::Text(format!("{}{}", a, number_text(b.as_f64()?))))
            }
            (Json::Number(a), Json::String(b)) => {
                return Some(Combined::Text(format!("{}{}", number_text(a.as_f64()?), b)))
            }
            _ => {}
        }
    }

    let (a, b) = (lhs.as_f64()?, rhs.as_f64()?);
    let n = match operator {
        Add => a + b,
        Sub => a - b,
        Mul => a * b,
        Div => a / b,
        Rem => a % b,
        Assign | AppendTo | RemoveFrom => return None,
    };
    Some(Combined::Number(n))
}

/// Apply operations in order. Not transactional: an error leaves earlier
/// operations applied.
pub fn apply_operations(
    state: &mut StateDocument,
    operations: &[Operation],
) -> Result<(), StateError> {
    operations
        .iter()
        .try_for_each(|operation| apply_operation(state, operation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::value::{StateAccess, Value};
    use serde_json::json;

    fn doc(value: Json) -> StateDocument {
        StateDocument::try_from(value).unwrap()
    }

    fn foo(value: Json) -> StateDocument {
        doc(json!({ "global": { "foo": value } }))
    }

    fn op(path: &[&str], operator: AssignmentOperator, rhs: Value) -> Operation {
        Operation {
            lhs: StateAccess::new(path.iter().copied()),
            operator,
            rhs,
        }
    }

    fn global_foo(state: &StateDocument) -> Option<&Json> {
        state.get(&["global", "foo"])
    }

    fn atomic(lhs: Value, operator: ComparisonOperator, rhs: Value) -> Condition {
        Condition::atomic(lhs, operator, rhs)
    }

    fn check(lhs: Value, operator: ComparisonOperator, rhs: Value) -> bool {
        test_condition(&foo(json!("bar")), &atomic(lhs, operator, rhs)).unwrap()
    }

    #[test]
    fn assignment_replaces_and_creates() {
        let mut state = foo(json!("bar"));
        apply_operation(&mut state, &op(&["global", "foo"], AssignmentOperator::Assign, "baz".into())).unwrap();
        assert_eq!(global_foo(&state), Some(&json!("baz")));

        apply_operation(&mut state, &op(&["global", "fizz"], AssignmentOperator::Assign, "buzz".into())).unwrap();
        assert_eq!(state.get(&["global", "fizz"]), Some(&json!("buzz")));
    }

    #[test]
    fn assignment_from_state_access() {
        let mut state = doc(json!({"global": {"foo": 1, "bar": 2}}));
        apply_operation(
            &mut state,
            &op(&["global", "foo"], AssignmentOperator::Assign, Value::state(["global", "bar"])),
        )
        .unwrap();
        assert_eq!(global_foo(&state), Some(&json!(2)));
    }

    #[test]
    fn missing_intermediate_fails_for_every_operator() {
        for operator in AssignmentOperator::ALL {
            let mut state = foo(json!("bar"));
            let err = apply_operation(&mut state, &op(&["g", "fizz"], operator, "buzz".into())).unwrap_err();
            assert!(matches!(err, StateError::MissingPath(_)), "{operator}: {err}");
        }
    }

    #[test]
    fn compound_on_undefined_fails() {
        for operator in AssignmentOperator::ALL.into_iter().filter(|o| o.is_compound()) {
            let mut state = foo(json!(10));
            let err = apply_operation(&mut state, &op(&["global", "fizz"], operator, Value::Number(3.0)))
                .unwrap_err();
            assert!(err.to_string().starts_with("can't apply compound operator on undefined"));
        }
    }

    #[test]
    fn add_concatenates_strings() {
        let mut state = foo(json!("bar"));
        apply_operation(&mut state, &op(&["global", "foo"], AssignmentOperator::Add, "baz".into())).unwrap();
        assert_eq!(global_foo(&state), Some(&json!("barbaz")));

        apply_operation(&mut state, &op(&["global", "foo"], AssignmentOperator::Add, Value::Number(2.0))).unwrap();
        assert_eq!(global_foo(&state), Some(&json!("barbaz2")));
    }

    #[test]
    fn add_numbers_from_state_access() {
        let mut state = doc(json!({"global": {"foo": 1, "bar": 2}}));
        apply_operation(
            &mut state,
            &op(&["global", "foo"], AssignmentOperator::Add, Value::state(["global", "bar"])),
        )
        .unwrap();
        assert_eq!(global_foo(&state), Some(&json!(3)));
    }

    #[test]
    fn arithmetic_operators() {
        let cases = [
            (AssignmentOperator::Sub, 2.0, json!(8)),
            (AssignmentOperator::Mul, 2.0, json!(20)),
            (AssignmentOperator::Div, 2.0, json!(5)),
            (AssignmentOperator::Rem, 7.0, json!(3)),
            (AssignmentOperator::Div, 4.0, json!(2.5)),
        ];
        for (operator, rhs, expected) in cases {
            let mut state = foo(json!(10));
            apply_operation(&mut state, &op(&["global", "foo"], operator, Value::Number(rhs))).unwrap();
            assert_eq!(global_foo(&state), Some(&expected), "{operator}");
        }
    }

    #[test]
    fn non_finite_results_fail() {
        let mut state = foo(json!(10));
        let err = apply_operation(&mut state, &op(&["global", "foo"], AssignmentOperator::Div, Value::Number(0.0)))
            .unwrap_err();
        assert!(matches!(err, StateError::NonFiniteResult { .. }));
        assert_eq!(global_foo(&state), Some(&json!(10)));
    }

    #[test]
    fn incompatible_operands_fail() {
        let mut state = foo(json!("bar"));
        let err = apply_operation(&mut state, &op(&["global", "foo"], AssignmentOperator::Sub, Value::Number(1.0)))
            .unwrap_err();
        assert_eq!(
            err,
            StateError::IncompatibleOperands {
                operator: "-=".to_string(),
                path: "global.foo".to_string(),
                lhs: "string",
                rhs: "number"
            }
        );
    }

    #[test]
    fn undefined_rhs_fails() {
        let mut state = foo(json!(1));
        let err = apply_operation(
            &mut state,
            &op(&["global", "foo"], AssignmentOperator::Assign, Value::state(["global", "nope"])),
        )
        .unwrap_err();
        assert!(matches!(err, StateError::UndefinedRhs { .. }));
    }

    #[test]
    fn append_and_remove() {
        let mut state = foo(json!(["map", "rope", "map"]));
        apply_operation(&mut state, &op(&["global", "foo"], AssignmentOperator::AppendTo, "lamp".into())).unwrap();
        assert_eq!(global_foo(&state), Some(&json!(["map", "rope", "map", "lamp"])));

        apply_operation(&mut state, &op(&["global", "foo"], AssignmentOperator::RemoveFrom, "map".into())).unwrap();
        assert_eq!(global_foo(&state), Some(&json!(["rope", "lamp"])));

        let mut state = foo(json!("bar"));
        let err = apply_operation(&mut state, &op(&["global", "foo"], AssignmentOperator::AppendTo, "x".into()))
            .unwrap_err();
        assert!(matches!(err, StateError::NotAnArray { found: "string", .. }));
    }

    #[test]
    fn batches_are_applied_in_order_and_not_rolled_back() {
        let mut state = foo(json!("bar"));
        apply_operations(
            &mut state,
            &[
                op(&["global", "foo"], AssignmentOperator::Add, "baz".into()),
                op(&["global", "bar"], AssignmentOperator::Assign, "foo".into()),
            ],
        )
        .unwrap();
        assert_eq!(global_foo(&state), Some(&json!("barbaz")));
        assert_eq!(state.get(&["global", "bar"]), Some(&json!("foo")));

        let err = apply_operations(
            &mut state,
            &[
                op(&["global", "foo"], AssignmentOperator::Assign, "first".into()),
                op(&["global", "fizz"], AssignmentOperator::Add, "x".into()),
            ],
        );
        assert!(err.is_err());
        assert_eq!(global_foo(&state), Some(&json!("first")));
    }

    #[test]
    fn missing_operand_compares_false() {
        assert!(!check(Value::state(["g", "fizz"]), ComparisonOperator::Eq, "bar".into()));
        assert!(check(Value::state(["g", "fizz"]), ComparisonOperator::Ne, "bar".into()));
        assert!(check(
            Value::state(["global", "nope"]),
            ComparisonOperator::Eq,
            Value::state(["global", "other"])
        ));
    }

    #[test]
    fn equality_is_strict() {
        assert!(check(Value::Bool(true), ComparisonOperator::Eq, Value::Bool(true)));
        assert!(!check(Value::Bool(true), ComparisonOperator::Eq, Value::Bool(false)));
        assert!(!check(Value::Number(1.0), ComparisonOperator::Eq, "1".into()));
        assert!(check(Value::Number(1.0), ComparisonOperator::Ne, "1".into()));
        assert!(check(Value::Null, ComparisonOperator::Eq, Value::Null));
        assert!(check(
            Value::Array(vec![Value::Number(1.0)]),
            ComparisonOperator::Eq,
            Value::Array(vec![Value::Number(1.0)])
        ));
    }

    #[test]
    fn numbers_compare_by_value() {
        let state = doc(json!({"global": {"i": 2, "f": 2.0}}));
        let c = atomic(Value::state(["global", "i"]), ComparisonOperator::Eq, Value::state(["global", "f"]));
        assert!(test_condition(&state, &c).unwrap());
    }

    #[test]
    fn ordering_operators() {
        use ComparisonOperator::*;
        let n = Value::Number;
        let table = [
            (n(1.0), Gt, n(0.0), true),
            (n(0.0), Gt, n(1.0), false),
            (n(0.0), Gt, n(0.0), false),
            (n(1.0), Ge, n(0.0), true),
            (n(0.0), Ge, n(1.0), false),
            (n(0.0), Ge, n(0.0), true),
            (n(1.0), Lt, n(0.0), false),
            (n(0.0), Lt, n(1.0), true),
            (n(0.0), Lt, n(0.0), false),
            (n(1.0), Le, n(0.0), false),
            (n(0.0), Le, n(1.0), true),
            (n(0.0), Le, n(0.0), true),
            ("abc".into(), Lt, "abd".into(), true),
            (n(1.0), Lt, "2".into(), false),
            (Value::Null, Ge, n(0.0), false),
        ];
        for (lhs, operator, rhs, expected) in table {
            assert_eq!(check(lhs.clone(), operator, rhs.clone()), expected, "{lhs:?} {operator} {rhs:?}");
        }
    }

    #[test]
    fn membership() {
        let state = doc(json!({"global": {"items": ["map", 3]}}));
        let items = || Value::state(["global", "items"]);
        let test = |lhs: Value, operator| test_condition(&state, &atomic(lhs, operator, items())).unwrap();
        assert!(test("map".into(), ComparisonOperator::In));
        assert!(test(Value::Number(3.0), ComparisonOperator::In));
        assert!(!test("rope".into(), ComparisonOperator::In));
        assert!(test("rope".into(), ComparisonOperator::NotIn));

        let err = test_condition(
            &state,
            &atomic("map".into(), ComparisonOperator::In, Value::state(["global", "nope"])),
        )
        .unwrap_err();
        assert!(matches!(err, StateError::NotAnArray { found: "undefined", .. }));
    }

    #[test]
    fn propositional_conditions() {
        let state = foo(json!("bar"));
        let yes = || atomic(Value::Bool(true), ComparisonOperator::Eq, Value::Bool(true));
        let no = || atomic(Value::Bool(true), ComparisonOperator::Eq, Value::Bool(false));
        let prop = |op, conditions| Condition::propositional(op, conditions);

        assert!(test_condition(&state, &prop(BooleanOperator::And, vec![yes(), yes()])).unwrap());
        assert!(!test_condition(&state, &prop(BooleanOperator::And, vec![yes(), no()])).unwrap());
        assert!(test_condition(&state, &prop(BooleanOperator::Or, vec![no(), yes()])).unwrap());
        assert!(test_condition(&state, &prop(BooleanOperator::Or, vec![yes(), yes()])).unwrap());
        assert!(!test_condition(&state, &prop(BooleanOperator::Or, vec![no(), no()])).unwrap());
    }

    #[test]
    fn nested_conditions() {
        let state = foo(json!("bar"));
        let foo_is = |v: &str| atomic(Value::state(["global", "foo"]), ComparisonOperator::Eq, v.into());
        let tree = Condition::propositional(
            BooleanOperator::And,
            vec![
                foo_is("bar"),
                Condition::propositional(BooleanOperator::Or, vec![foo_is("nope"), foo_is("bar")]),
            ],
        );
        assert!(test_condition(&state, &tree).unwrap());

        let tree = Condition::propositional(
            BooleanOperator::Or,
            vec![
                foo_is("nope"),
                Condition::propositional(BooleanOperator::And, vec![foo_is("nope"), foo_is("bar")]),
            ],
        );
        assert!(!test_condition(&state, &tree).unwrap());
    }
}
