//! Module `visibility` implement combination of visibility labels.
//!
//! When records of several visibility labels are folded into a single
//! record, the resulting label is computed by a [Combiner]. Combiners are
//! passed to the aggregator at construction time, any closure of shape
//! `Fn(&[Vec<u8>]) -> Result<Vec<u8>>` is a combiner.
//!
//! [AndCombiner] is the default combiner, label expressions are made up
//! of terms, `&`, `|` and parenthesis, for example `A&(B|C)`.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use std::collections::BTreeSet;

use crate::Result;

lazy_static! {
    static ref TERM: Regex = Regex::new(r"^[A-Za-z0-9_\-:./]+$").unwrap();
}

/// Combine a set of visibility labels into a single label.
pub trait Combiner {
    /// `labels` are distinct and in ascending order. Fail if labels cannot
    /// be combined.
    fn combine(&self, labels: &[Vec<u8>]) -> Result<Vec<u8>>;
}

impl<F> Combiner for F
where
    F: Fn(&[Vec<u8>]) -> Result<Vec<u8>>,
{
    fn combine(&self, labels: &[Vec<u8>]) -> Result<Vec<u8>> {
        self(labels)
    }
}

/// Combiner that requires all of the input labels, that is, output label
/// is the conjunction of input labels.
#[derive(Clone, Copy, Debug, Default)]
pub struct AndCombiner;

impl Combiner for AndCombiner {
    fn combine(&self, labels: &[Vec<u8>]) -> Result<Vec<u8>> {
        let mut terms: BTreeSet<Vec<u8>> = BTreeSet::new();
        for label in labels.iter().filter(|l| !l.is_empty()) {
            match validate(label)? {
                Expr::And(items) => terms.extend(items.into_iter()),
                Expr::Or => {
                    let mut term = vec![b'('];
                    term.extend_from_slice(label);
                    term.push(b')');
                    terms.insert(term);
                }
                Expr::Term(term) => {
                    terms.insert(term);
                }
            }
        }

        let terms: Vec<Vec<u8>> = terms.into_iter().collect();
        Ok(terms.join(&b'&'))
    }
}

// Top level shape of a label expression, conjunctions carry the raw
// bytes of each operand.
enum Expr {
    Term(Vec<u8>),
    And(Vec<Vec<u8>>),
    Or,
}

/// Validate `label` as a visibility expression.
pub fn is_valid(label: &[u8]) -> bool {
    label.is_empty() || validate(label).is_ok()
}

fn validate(label: &[u8]) -> Result<Expr> {
    let (expr, n) = parse_expr(label, 0)?;
    if n != label.len() {
        err_at!(
            VisibilityCombine, msg: "unbalanced ')' at {} in {:?}", n,
            String::from_utf8_lossy(label)
        )?
    }
    Ok(expr)
}

// parse operands separated by a single kind of operator, starting at
// `off`, stop at end of input or at an unmatched ')'.
fn parse_expr(label: &[u8], mut off: usize) -> Result<(Expr, usize)> {
    let mut operands: Vec<Vec<u8>> = vec![];
    let mut op: Option<u8> = None;

    loop {
        let start = off;
        off = parse_operand(label, off)?;
        operands.push(label[start..off].to_vec());

        match label.get(off) {
            Some(c @ b'&') | Some(c @ b'|') => {
                match op {
                    Some(prev) if prev != *c => err_at!(
                        VisibilityCombine, msg: "mixed '&' and '|' at {} in {:?}", off,
                        String::from_utf8_lossy(label)
                    )?,
                    _ => op = Some(*c),
                }
                off += 1;
            }
            Some(b')') | None => break,
            Some(c) => err_at!(
                VisibilityCombine, msg: "unexpected {:?} at {} in {:?}", *c as char, off,
                String::from_utf8_lossy(label)
            )?,
        }
    }

    let expr = match op {
        None => Expr::Term(operands.remove(0)),
        Some(b'&') => Expr::And(operands),
        Some(_) => Expr::Or,
    };
    Ok((expr, off))
}

// parse a single term or a parenthesised expression, return offset past
// the operand.
fn parse_operand(label: &[u8], off: usize) -> Result<usize> {
    match label.get(off) {
        Some(b'(') => {
            let (_, end) = parse_expr(label, off + 1)?;
            match label.get(end) {
                Some(b')') => Ok(end + 1),
                _ => err_at!(
                    VisibilityCombine, msg: "missing ')' in {:?}",
                    String::from_utf8_lossy(label)
                ),
            }
        }
        Some(_) => {
            let end = label[off..]
                .iter()
                .position(|c| matches!(c, b'&' | b'|' | b'(' | b')'))
                .map(|n| off + n)
                .unwrap_or_else(|| label.len());
            if end == off || !TERM.is_match(&label[off..end]) {
                err_at!(
                    VisibilityCombine, msg: "invalid term at {} in {:?}", off,
                    String::from_utf8_lossy(label)
                )
            } else {
                Ok(end)
            }
        }
        None => err_at!(
            VisibilityCombine, msg: "empty term at {} in {:?}", off,
            String::from_utf8_lossy(label)
        ),
    }
}

#[cfg(test)]
#[path = "visibility_test.rs"]
mod visibility_test;
