/// Condition-tree builder: strings become atomic conditions, `{AND: [...]}`
/// and `{OR: [...]}` objects become propositional conditions.

use crate::core::expression::{parse, Operator, ParseContext, ParseError};
use crate::schema::condition::{BooleanOperator, Condition};

/// Build a condition from its decoded front-matter form.
pub fn parse_condition(
    input: &serde_json::Value,
    context: &ParseContext,
) -> Result<Condition, ParseError> {
    match input {
        serde_json::Value::String(code) => parse_atomic(code, context),
        serde_json::Value::Object(map) if map.len() == 1 => {
            let (key, value) = map
                .iter()
                .next()
                .ok_or_else(|| shape_error(input))?;
            let boolean_operator =
                BooleanOperator::from_token(key).ok_or_else(|| shape_error(input))?;
            let items = value.as_array().ok_or_else(|| shape_error(input))?;
            let conditions = items
                .iter()
                .map(|item| parse_condition(item, context))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Condition::propositional(boolean_operator, conditions))
        }
        _ => Err(shape_error(input)),
    }
}

/// Build an atomic condition from one statement.
pub fn parse_atomic(code: &str, context: &ParseContext) -> Result<Condition, ParseError> {
    let expression = parse(code, context)?;
    match expression.operator {
        Operator::Comparison(operator) => {
            Ok(Condition::atomic(expression.lhs, operator, expression.rhs))
        }
        other => Err(ParseError::InvalidOperator {
            operator: other.token().to_string(),
            code: code.to_string(),
        }),
    }
}

fn shape_error(input: &serde_json::Value) -> ParseError {
    ParseError::InvalidConditionShape {
        found: input.to_string(),
    }
}
