// Formula evaluation - a stack machine over the postfix token stream.

use crate::cell::{CellError, Value};
use crate::cell_ref::CellRef;

use super::parser::{self, Token};

/// Failure modes of formula evaluation.
///
/// These never escape the editing surface: the recalculation engine maps
/// each failure onto the cell's error code via [`FormulaError::cell_error`].
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// A character the lexer does not recognize.
    InvalidCharacter(char),
    /// A numeric literal that does not parse (e.g. `1.2.3`).
    InvalidNumber(String),
    /// Letters without a row number, a zero row, or an overflowing
    /// coordinate (e.g. `AB`, `A0`).
    InvalidReference(String),
    /// Operator/operand mismatch: too few operands, or leftovers.
    MalformedExpression,
    /// Division by exactly zero.
    DivideByZero,
    /// A referenced value could not be coerced to a number.
    Value,
    /// A referenced cell currently holds an error; evaluation of the
    /// referencing formula fails with it.
    RefError(CellError),
}

impl FormulaError {
    /// The error code stored on a cell when this failure surfaces.
    ///
    /// Only divide-by-zero and value coercion keep their own codes; every
    /// other failure — bad tokens, stack-discipline violations, errors
    /// propagated from referenced cells — collapses to the opaque `#ERROR`.
    pub fn cell_error(&self) -> CellError {
        match self {
            FormulaError::DivideByZero => CellError::DivByZero,
            FormulaError::Value => CellError::Value,
            _ => CellError::Error,
        }
    }
}

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormulaError::InvalidCharacter(c) => write!(f, "invalid character: {:?}", c),
            FormulaError::InvalidNumber(s) => write!(f, "invalid number: {}", s),
            FormulaError::InvalidReference(s) => write!(f, "invalid cell reference: {}", s),
            FormulaError::MalformedExpression => write!(f, "malformed expression"),
            FormulaError::DivideByZero => write!(f, "division by zero"),
            FormulaError::Value => write!(f, "value is not numeric"),
            FormulaError::RefError(code) => write!(f, "referenced cell has error {}", code),
        }
    }
}

impl std::error::Error for FormulaError {}

/// Evaluate raw cell text.
///
/// Text without the `=` marker never fails: it is the trimmed text parsed
/// as a number when possible, the literal text otherwise. Formula text is
/// uppercased, tokenized, converted to postfix, and evaluated against
/// `resolve`, which supplies the current value of each referenced cell
/// (blank or out-of-grid references resolve to `Value::Empty`, read as 0)
/// and fails for cells that currently hold an error.
pub fn evaluate<F>(input: &str, resolve: F) -> Result<Value, FormulaError>
where
    F: FnMut(CellRef) -> Result<Value, FormulaError>,
{
    if !input.starts_with('=') {
        return Ok(Value::from_raw(input));
    }

    let expr = input[1..].to_ascii_uppercase();
    let tokens = parser::tokenize(&expr)?;
    let postfix = parser::to_postfix(tokens);
    eval_postfix(&postfix, resolve).map(Value::Number)
}

/// Run the postfix stack machine.
fn eval_postfix<F>(postfix: &[Token], mut resolve: F) -> Result<f64, FormulaError>
where
    F: FnMut(CellRef) -> Result<Value, FormulaError>,
{
    let mut stack: Vec<f64> = Vec::new();

    for &token in postfix {
        match token {
            Token::Number(n) => stack.push(n),
            Token::Ref(cell) => {
                let value = resolve(cell)?;
                let n = value.coerce_number().ok_or(FormulaError::Value)?;
                stack.push(n);
            }
            Token::Plus => {
                let (a, b) = pop_operands(&mut stack)?;
                stack.push(a + b);
            }
            Token::Minus => {
                let (a, b) = pop_operands(&mut stack)?;
                stack.push(a - b);
            }
            Token::Star => {
                let (a, b) = pop_operands(&mut stack)?;
                stack.push(a * b);
            }
            Token::Slash => {
                let (a, b) = pop_operands(&mut stack)?;
                if b == 0.0 {
                    return Err(FormulaError::DivideByZero);
                }
                stack.push(a / b);
            }
            // A paren here means the parenthesization never balanced.
            Token::LParen | Token::RParen => return Err(FormulaError::MalformedExpression),
        }
    }

    if stack.len() != 1 {
        return Err(FormulaError::MalformedExpression);
    }
    Ok(stack[0])
}

/// Pop `b` then `a`; the operator applies as `a op b`.
fn pop_operands(stack: &mut Vec<f64>) -> Result<(f64, f64), FormulaError> {
    let b = stack.pop().ok_or(FormulaError::MalformedExpression)?;
    let a = stack.pop().ok_or(FormulaError::MalformedExpression)?;
    Ok((a, b))
}
