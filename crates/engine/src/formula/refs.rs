//! Reference extraction from formula text.
//!
//! Static analysis only: references are collected from the token stream
//! without evaluating (or even fully validating) the arithmetic. This is
//! what the dependency graph is built from.

use crate::cell_ref::CellRef;

use super::parser::{self, Token};

/// Extract the cell references of a formula, in token order.
///
/// Non-formula text has no references. Duplicates are kept: the graph
/// tolerates them and token order is part of the deterministic traversal
/// order downstream.
///
/// Never fails — a formula whose arithmetic is malformed still yields its
/// references, and a lex error simply ends the scan (the references seen
/// before the error are returned).
pub fn extract_refs(input: &str) -> Vec<CellRef> {
    if !input.starts_with('=') {
        return Vec::new();
    }

    let expr = input[1..].to_ascii_uppercase();
    let (tokens, _) = parser::scan(&expr);
    tokens
        .into_iter()
        .filter_map(|token| match token {
            Token::Ref(cell) => Some(cell),
            _ => None,
        })
        .collect()
}
