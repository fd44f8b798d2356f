/// Operation builder: statements that mutate the state document.

use crate::core::expression::{parse, Operator, ParseContext, ParseError};
use crate::schema::operation::Operation;
use crate::schema::value::Value;

/// Parse one assignment statement, e.g. `sl.visited = true`.
pub fn parse_operation(code: &str, context: &ParseContext) -> Result<Operation, ParseError> {
    let expression = parse(code, context)?;

    let operator = match expression.operator {
        Operator::Assignment(op) => op,
        other => {
            return Err(ParseError::InvalidOperator {
                operator: other.token().to_string(),
                code: code.to_string(),
            })
        }
    };

    let lhs = match expression.lhs {
        Value::State(access) => access,
        _ => return Err(ParseError::LhsNotStateAccess(code.to_string())),
    };

    Ok(Operation {
        lhs,
        operator,
        rhs: expression.rhs,
    })
}

/// Parse an ordered list of operations.
pub fn parse_operations<S: AsRef<str>>(
    codes: &[S],
    context: &ParseContext,
) -> Result<Vec<Operation>, ParseError> {
    codes
        .iter()
        .map(|code| parse_operation(code.as_ref(), context))
        .collect()
}
