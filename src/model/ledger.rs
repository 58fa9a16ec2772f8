//! The answer ledger: a topic's answers in storage order, and the pure
//! transformations applied to it before it is written back as a whole.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A votable option within a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub votes: u32,
}

impl Answer {
    /// A fresh answer with no votes.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            votes: 0,
        }
    }
}

/// Split raw multi-line input into answers: one per non-blank trimmed line,
/// in input order.
fn parse_lines(raw_lines: &str) -> impl Iterator<Item = Answer> + '_ {
    raw_lines
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Answer::new)
}

/// Append the answers parsed from `raw_lines` after `existing`.
/// Existing answers keep their vote counts.
///
/// Fails if `raw_lines` contains no non-blank line.
pub fn add_answers(existing: &[Answer], raw_lines: &str) -> Result<Vec<Answer>> {
    let added = parse_lines(raw_lines).collect::<Vec<_>>();
    if added.is_empty() {
        return Err(Error::Validation(
            "Enter at least one non-blank answer".to_string(),
        ));
    }

    let mut answers = Vec::with_capacity(existing.len() + added.len());
    answers.extend_from_slice(existing);
    answers.extend(added);
    Ok(answers)
}

/// Build a brand-new answer list from `raw_lines`.
///
/// Used by topic edits, which deliberately discard all prior vote counts.
pub fn replace_answers(raw_lines: &str) -> Vec<Answer> {
    parse_lines(raw_lines).collect()
}

/// Copy `existing` with the answer at `position` given exactly one more vote.
pub fn increment_vote(existing: &[Answer], position: usize) -> Result<Vec<Answer>> {
    let mut answers = existing.to_vec();
    let answer = answers
        .get_mut(position)
        .ok_or_else(|| Error::not_found(format!("Answer at position {position}")))?;
    answer.votes = answer.votes.saturating_add(1);
    Ok(answers)
}
