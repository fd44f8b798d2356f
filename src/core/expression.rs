/// Expression language — turns one `lhs OPERATOR rhs` statement into typed
/// operands.
///
/// Operators must be delimited by a single space on each side. Operands are
/// resolved in a fixed priority order: null keyword, boolean, numeral,
/// quoted string, bracketed array, state access.

use std::fmt;
use thiserror::Error;

use crate::schema::condition::{BooleanOperator, ComparisonOperator};
use crate::schema::operation::AssignmentOperator;
use crate::schema::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("could not find the operator in '{0}'")]
    MissingOperator(String),
    #[error("too many operator candidates in '{code}': {candidates}")]
    AmbiguousOperator { code: String, candidates: String },
    #[error("missing left-hand side in '{0}'")]
    MissingLhs(String),
    #[error("missing right-hand side in '{0}'")]
    MissingRhs(String),
    #[error("'{0}' is an invalid string expression")]
    InvalidString(String),
    #[error("invalid expression: '{0}'")]
    InvalidExpression(String),
    #[error("first-level must be one of {}, not '{found}' in '{token}'", FIRST_LEVELS)]
    InvalidFirstLevel { token: String, found: String },
    #[error("the 'sl' shorthand needs a storyline context: '{0}'")]
    MissingStorylineContext(String),
    #[error("invalid operator {operator} in '{code}'")]
    InvalidOperator { operator: String, code: String },
    #[error("left-hand side of an operation must be a state access: '{0}'")]
    LhsNotStateAccess(String),
    #[error("conditions must be a string or an object with one and only one of {}: {found}", boolean_operator_list())]
    InvalidConditionShape { found: String },
}

const FIRST_LEVELS: &str = "global (g), resources (r), storylines (s), sl";

const NULL_KEYWORDS: &[&str] = &["null", "Null", "NULL", "None", "none", "NONE"];
const TRUE_KEYWORDS: &[&str] = &["true", "True", "TRUE"];
const FALSE_KEYWORDS: &[&str] = &["false", "False", "FALSE"];

fn boolean_operator_list() -> String {
    BooleanOperator::ALL
        .iter()
        .map(|op| op.token())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Any operator of the language: comparisons for conditions, assignments
/// for operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Comparison(ComparisonOperator),
    Assignment(AssignmentOperator),
}

impl Operator {
    pub fn all() -> impl Iterator<Item = Operator> {
        ComparisonOperator::ALL
            .into_iter()
            .map(Operator::Comparison)
            .chain(AssignmentOperator::ALL.into_iter().map(Operator::Assignment))
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Comparison(op) => op.token(),
            Self::Assignment(op) => op.token(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Parse-time information about where a statement was written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseContext {
    /// Storyline owning the statement; the `sl` shorthand expands to it.
    pub storyline: Option<String>,
}

impl ParseContext {
    pub fn for_storyline(storyline: &str) -> Self {
        Self {
            storyline: Some(storyline.to_string()),
        }
    }
}

/// A parsed `lhs operator rhs` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub lhs: Value,
    pub operator: Operator,
    pub rhs: Value,
}

/// `^[a-z][a-z0-9_]*$`
pub fn is_slug(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn is_index(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_digit())
}

/// Parse one statement of the expression language.
pub fn parse(code: &str, context: &ParseContext) -> Result<Expression, ParseError> {
    // Padding lets operators at either end still count as delimited.
    let padded = format!(" {} ", code);
    let operator = find_operator(code, &padded)?;

    let delimited = format!(" {} ", operator.token());
    let at = padded
        .find(&delimited)
        .ok_or_else(|| ParseError::MissingOperator(code.to_string()))?;
    let lhs = padded[..at].trim();
    let rhs = padded[at + delimited.len()..].trim();

    if lhs.is_empty() {
        return Err(ParseError::MissingLhs(code.to_string()));
    }
    if rhs.is_empty() {
        return Err(ParseError::MissingRhs(code.to_string()));
    }

    Ok(Expression {
        lhs: get_arg(lhs, context)?,
        operator,
        rhs: get_arg(rhs, context)?,
    })
}

fn find_operator(code: &str, padded: &str) -> Result<Operator, ParseError> {
    // (operator, start, end) of the first delimited occurrence
    let candidates: Vec<(Operator, usize, usize)> = Operator::all()
        .filter_map(|op| {
            let token = op.token();
            padded
                .find(&format!(" {} ", token))
                .map(|i| (op, i + 1, i + 1 + token.len()))
        })
        .collect();

    let longest = candidates
        .iter()
        .max_by_key(|(_, start, end)| end - start)
        .copied()
        .ok_or_else(|| ParseError::MissingOperator(code.to_string()))?;

    let (operator, outer_start, outer_end) = longest;
    let nested = candidates
        .iter()
        .all(|(_, start, end)| *start >= outer_start && *end <= outer_end);
    if !nested {
        let listed = candidates
            .iter()
            .map(|(op, _, _)| op.token())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ParseError::AmbiguousOperator {
            code: code.to_string(),
            candidates: listed,
        });
    }

    Ok(operator)
}

/// Resolve one operand into a typed value.
pub fn get_arg(token: &str, context: &ParseContext) -> Result<Value, ParseError> {
    let token = token.trim();

    if NULL_KEYWORDS.contains(&token) {
        return Ok(Value::Null);
    }
    if let Some(b) = get_boolean_arg(token) {
        return Ok(Value::Bool(b));
    }
    if let Some(n) = get_numeral_arg(token) {
        return Ok(Value::Number(n));
    }
    if let Some(s) = get_string_arg(token)? {
        return Ok(Value::String(s));
    }
    if let Some(items) = get_array_arg(token, context)? {
        return Ok(Value::Array(items));
    }
    if let Some(state) = get_state_arg(token, context)? {
        return Ok(state);
    }

    Err(ParseError::InvalidExpression(token.to_string()))
}

pub fn get_boolean_arg(token: &str) -> Option<bool> {
    if TRUE_KEYWORDS.contains(&token) {
        Some(true)
    } else if FALSE_KEYWORDS.contains(&token) {
        Some(false)
    } else {
        None
    }
}

fn get_numeral_arg(token: &str) -> Option<f64> {
    let looks_numeric = token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !looks_numeric {
        return None;
    }
    token.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `Ok(None)` when the token is not quoted at all.
fn get_string_arg(token: &str) -> Result<Option<String>, ParseError> {
    let quote = match token.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return Ok(None),
    };
    if token.len() < 2 || !token.ends_with(quote) {
        return Err(ParseError::InvalidString(token.to_string()));
    }

    let inner = &token[1..token.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) if next == quote || next == '\\' => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => return Err(ParseError::InvalidString(token.to_string())),
            },
            c if c == quote => return Err(ParseError::InvalidString(token.to_string())),
            c => out.push(c),
        }
    }
    Ok(Some(out))
}

fn get_array_arg(token: &str, context: &ParseContext) -> Result<Option<Vec<Value>>, ParseError> {
    if token.len() < 2 || !token.starts_with('[') || !token.ends_with(']') {
        return Ok(None);
    }
    let inner = token[1..token.len() - 1].trim();
    if inner.is_empty() {
        return Ok(Some(Vec::new()));
    }

    split_top_level(inner)
        .into_iter()
        .map(|item| {
            let item = item.trim();
            if item.is_empty() {
                Err(ParseError::InvalidExpression(token.to_string()))
            } else {
                get_arg(item, context)
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Split on commas that are outside quotes and nested brackets.
fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

fn get_state_arg(token: &str, context: &ParseContext) -> Result<Option<Value>, ParseError> {
    let segments: Vec<&str> = token.split('.').collect();
    let (first, rest) = match segments.split_first() {
        Some((first, rest)) if !rest.is_empty() => (*first, rest),
        _ => return Ok(None),
    };
    if !is_slug(first) || !rest.iter().all(|s| is_slug(s) || is_index(s)) {
        return Ok(None);
    }

    let mut data: Vec<String> = Vec::with_capacity(segments.len() + 1);
    match first {
        "global" | "g" => data.push("global".to_string()),
        "resources" | "r" => data.push("resources".to_string()),
        "storylines" | "s" => data.push("storylines".to_string()),
        "sl" => {
            let storyline = context
                .storyline
                .as_deref()
                .ok_or_else(|| ParseError::MissingStorylineContext(token.to_string()))?;
            data.push("storylines".to_string());
            data.push(storyline.to_string());
        }
        other => {
            return Err(ParseError::InvalidFirstLevel {
                token: token.to_string(),
                found: other.to_string(),
            })
        }
    }
    data.extend(rest.iter().map(|s| s.to_string()));

    Ok(Some(Value::state(data)))
}
