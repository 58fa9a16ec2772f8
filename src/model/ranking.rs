//! Pure derivations from topic state: display order, rank glyphs and
//! publication filters. Nothing here is persisted.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rocket::FromFormField;
use serde::{Deserialize, Serialize};

use crate::model::{ledger::Answer, topic::Topic};

/// Pair each answer with its storage position and order them by votes,
/// most first. Ties keep storage order.
///
/// The storage position, not the display index, is what votes target.
pub fn sorted_by_votes_descending(answers: &[Answer]) -> Vec<(usize, &Answer)> {
    let mut ranked = answers.iter().enumerate().collect::<Vec<_>>();
    // `sort_by` is stable.
    ranked.sort_by(|(_, a), (_, b)| b.votes.cmp(&a.votes));
    ranked
}

/// The marker shown next to an answer at a given display index.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RankGlyph {
    First,
    Second,
    Third,
    /// 1-based ordinal for everything below the podium.
    Ordinal(usize),
}

impl RankGlyph {
    /// Is this one of the three podium places?
    pub fn is_podium(&self) -> bool {
        !matches!(self, Self::Ordinal(_))
    }
}

impl Display for RankGlyph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => write!(f, "🥇"),
            Self::Second => write!(f, "🥈"),
            Self::Third => write!(f, "🥉"),
            Self::Ordinal(n) => write!(f, "{n}"),
        }
    }
}

pub fn rank_glyph(display_index: usize) -> RankGlyph {
    match display_index {
        0 => RankGlyph::First,
        1 => RankGlyph::Second,
        2 => RankGlyph::Third,
        n => RankGlyph::Ordinal(n + 1),
    }
}

/// Which topics to list.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum PublicationFilter {
    #[default]
    All,
    Published,
    Unpublished,
}

impl PublicationFilter {
    pub fn matches(&self, topic: &Topic) -> bool {
        match self {
            Self::All => true,
            Self::Published => topic.is_published,
            Self::Unpublished => !topic.is_published,
        }
    }
}

impl FromStr for PublicationFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "published" => Ok(Self::Published),
            "unpublished" => Ok(Self::Unpublished),
            other => Err(format!("unknown filter '{other}'")),
        }
    }
}

pub fn filter_by_publication(topics: &[Topic], mode: PublicationFilter) -> Vec<&Topic> {
    topics.iter().filter(|topic| mode.matches(topic)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(votes: &[u32]) -> Vec<Answer> {
        votes
            .iter()
            .enumerate()
            .map(|(i, votes)| Answer {
                text: format!("answer {i}"),
                votes: *votes,
            })
            .collect()
    }

    fn positions(answers: &[Answer]) -> Vec<usize> {
        sorted_by_votes_descending(answers)
            .into_iter()
            .map(|(position, _)| position)
            .collect()
    }

    #[test]
    fn ties_keep_storage_order() {
        assert_eq!(positions(&answers(&[3, 1, 3, 2])), vec![0, 2, 3, 1]);
        assert_eq!(positions(&answers(&[0, 0, 0])), vec![0, 1, 2]);
        assert_eq!(positions(&answers(&[1, 2, 3])), vec![2, 1, 0]);
        assert!(positions(&[]).is_empty());
    }

    #[test]
    fn identical_text_is_told_apart_by_position() {
        let mut ledger = answers(&[1, 4]);
        ledger[0].text = "Same".to_string();
        ledger[1].text = "Same".to_string();
        let ranked = sorted_by_votes_descending(&ledger);
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[1].0, 0);
    }

    #[test]
    fn glyphs() {
        assert_eq!(rank_glyph(0).to_string(), "🥇");
        assert_eq!(rank_glyph(1).to_string(), "🥈");
        assert_eq!(rank_glyph(2).to_string(), "🥉");
        assert_eq!(rank_glyph(3).to_string(), "4");
        assert_eq!(rank_glyph(9).to_string(), "10");
        assert!(rank_glyph(2).is_podium());
        assert!(!rank_glyph(3).is_podium());
    }

    #[test]
    fn publication_partitions() {
        let mut published = Topic::example("Published", &[]);
        published.is_published = true;
        let draft = Topic::example("Draft", &[]);
        let topics = vec![published.clone(), draft.clone()];

        let titles = |mode| {
            filter_by_publication(&topics, mode)
                .into_iter()
                .map(|t| t.title.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(titles(PublicationFilter::All), vec!["Published", "Draft"]);
        assert_eq!(titles(PublicationFilter::Published), vec!["Published"]);
        assert_eq!(titles(PublicationFilter::Unpublished), vec!["Draft"]);
        assert_eq!(topics, vec![published, draft]);
    }

    #[test]
    fn filter_names() {
        assert_eq!("Published".parse(), Ok(PublicationFilter::Published));
        assert_eq!("unpublished".parse(), Ok(PublicationFilter::Unpublished));
        assert!("drafts".parse::<PublicationFilter>().is_err());
        assert_eq!(PublicationFilter::default(), PublicationFilter::All);
    }
}
