//! A simple CLI tool for printing the standings of every topic in an export
//! dump. Ranking uses the server's own implementation, so the output matches
//! what clients of the API are shown.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use livevote::model::{
    api::topic::TopicDesc,
    ranking::{filter_by_publication, rank_glyph, sorted_by_votes_descending, PublicationFilter},
    topic::Topic,
};

const PROGRAM_NAME: &str = "livevote-standings";

const ABOUT_TEXT: &str = "Print the standings of every topic in an export dump.

EXIT CODES:
     0: Success.
     1: The dump could not be read or decoded.";

const DUMP_PATH: &str = "DUMP_PATH";

const DUMP_PATH_HELP: &str = "The path to a JSON dump of all topics,\n\
as returned by `GET /topics/export`";

const FILTER: &str = "filter";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(DUMP_PATH)
                .help(DUMP_PATH_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(FILTER)
                .long(FILTER)
                .help("Which topics to show")
                .value_parser(["all", "published", "unpublished"])
                .default_value("all")
                .action(ArgAction::Set),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
}

/// One answer's line in the standings.
#[derive(Debug, Eq, PartialEq)]
struct Standing {
    rank: String,
    text: String,
    votes: u32,
}

impl Display for Standing {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: {} vote{}",
            self.rank,
            self.text,
            self.votes,
            if self.votes != 1 { "s" } else { "" }
        )
    }
}

/// A topic and its answers in display order.
#[derive(Debug, Eq, PartialEq)]
struct TopicStandings {
    title: String,
    published: bool,
    locked: bool,
    standings: Vec<Standing>,
}

impl TopicStandings {
    fn new(topic: &Topic) -> Self {
        let standings = sorted_by_votes_descending(&topic.answers)
            .into_iter()
            .enumerate()
            .map(|(display_index, (_, answer))| Standing {
                rank: rank_glyph(display_index).to_string(),
                text: answer.text.clone(),
                votes: answer.votes,
            })
            .collect();
        Self {
            title: topic.title.clone(),
            published: topic.is_published,
            locked: topic.is_locked,
            standings,
        }
    }
}

impl Display for TopicStandings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}{})",
            self.title,
            if self.published { "published" } else { "draft" },
            if self.locked { ", locked" } else { "" }
        )?;
        if self.standings.is_empty() {
            write!(f, "\n  no answers yet")?;
        }
        for standing in &self.standings {
            write!(f, "\n  {standing}")?;
        }
        Ok(())
    }
}

/// Load the dump and rank every matching topic.
fn standings(path: &str, filter: PublicationFilter) -> Result<Vec<TopicStandings>, Error> {
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let dump: Vec<TopicDesc> =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;
    let topics = dump.into_iter().map(TopicDesc::into_topic).collect::<Vec<_>>();

    Ok(filter_by_publication(&topics, filter)
        .into_iter()
        .map(TopicStandings::new)
        .collect())
}

/// Print the standings and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(DUMP_PATH).unwrap(); // Required argument is guaranteed to be present.
    let filter = args
        .get_one::<String>(FILTER)
        .and_then(|filter| filter.parse().ok())
        .unwrap_or_default();
    match standings(path, filter) {
        Ok(topics) => {
            if topics.is_empty() {
                println!("No topics.");
            }
            for topic in topics {
                println!("{topic}");
            }
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {msg}");
            1
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(rank: &str, text: &str, votes: u32) -> Standing {
        Standing {
            rank: rank.to_string(),
            text: text.to_string(),
            votes,
        }
    }

    #[test]
    fn ranks_dump() {
        let topics = standings("example_dumps/topics.json", PublicationFilter::All).unwrap();
        assert_eq!(
            topics,
            vec![
                TopicStandings {
                    title: "Lunch".to_string(),
                    published: true,
                    locked: false,
                    standings: vec![
                        standing("🥇", "Sushi", 3),
                        standing("🥈", "Pizza", 1),
                        standing("🥉", "Tacos", 1),
                        standing("4", "Curry", 0),
                    ],
                },
                TopicStandings {
                    title: "Team offsite".to_string(),
                    published: false,
                    locked: true,
                    standings: vec![],
                },
            ]
        );
        assert_eq!(
            topics[0].to_string(),
            "Lunch (published)\n  🥇 Sushi: 3 votes\n  🥈 Pizza: 1 vote\n  🥉 Tacos: 1 vote\n  4 Curry: 0 votes"
        );
        assert_eq!(
            topics[1].to_string(),
            "Team offsite (draft, locked)\n  no answers yet"
        );
    }

    #[test]
    fn filters_dump() {
        let titles = |filter| {
            standings("example_dumps/topics.json", filter)
                .unwrap()
                .into_iter()
                .map(|topic| topic.title)
                .collect::<Vec<_>>()
        };
        assert_eq!(titles(PublicationFilter::Published), vec!["Lunch"]);
        assert_eq!(titles(PublicationFilter::Unpublished), vec!["Team offsite"]);
    }

    #[test]
    fn unreadable_dumps() {
        assert!(matches!(
            standings("example_dumps/topics_malformed.json", PublicationFilter::All),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            standings("not a real file", PublicationFilter::All),
            Err(Error::IO(_))
        ));
    }

    #[test]
    fn correct_cli_usage() {
        let command_line = [PROGRAM_NAME, "example_dumps/topics.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let command_line = [
            PROGRAM_NAME,
            "example_dumps/topics.json",
            "--filter",
            "unpublished",
        ];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let command_line = [PROGRAM_NAME, "example_dumps/topics_malformed.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);

        let command_line = [PROGRAM_NAME, "not a real file"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);
    }

    #[test]
    fn bad_cli_usage() {
        // Unknown filter.
        let command_line = [PROGRAM_NAME, "example_dumps/topics.json", "--filter", "drafts"];
        cli().try_get_matches_from(command_line).unwrap_err();

        // No options at all.
        let command_line = [PROGRAM_NAME];
        cli().try_get_matches_from(command_line).unwrap_err();
    }
}
