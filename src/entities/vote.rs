//! # Roll-Call Vote Entity
//!
//! ## Purpose
//! Parses a clerk roll-call XML feed into a structured vote record:
//! congressional context, the question and its outcome, overall and
//! per-party tallies, and every member's recorded position.
//!
//! The feed's element names (`majority`, `congress`, `legis-num`,
//! `vote-question`, `totals-by-party`, `recorded-vote`, …) are a fixed
//! external contract. Known feed quirks are preserved: at least one vote
//! lists its chamber under a `committee` element, and votes deleted from
//! the record carry no `action-date`/`action-time` — those load with no
//! timestamp rather than failing.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::dates::{self, EpochSeconds};
use crate::errors::{PipelineError, Result};
use crate::text::strip_to_markup;

use super::{element_text, landmark, read_json, write_json, Sources};

/// One House roll-call vote. Identity is the `(congress, legis_num)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub congress_info: CongressInfo,
    pub vote_info: VoteInfo,
    pub totals: Totals,
    #[serde(default)]
    pub recorded: Vec<RecordedVote>,
    pub sources: Sources,
}

/// Congressional context of a vote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CongressInfo {
    pub majority: String,
    pub congress: u32,
    pub session: String,
    pub chamber: String,
    pub legis_num: String,
}

/// The question put to the chamber and its outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteInfo {
    pub question: String,
    pub kind: String,
    pub result: String,
    pub description: String,
    /// Absent for votes deleted from the record
    #[serde(default)]
    pub datetime: Option<EpochSeconds>,
}

/// Yea/Nay/Present/Not-Voting tally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub yea: u32,
    pub nay: u32,
    pub present: u32,
    pub not_voting: u32,
}

/// Overall and per-party tallies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Totals {
    pub overall: VoteCount,
    #[serde(default)]
    pub by_party: BTreeMap<String, VoteCount>,
}

/// One member's recorded position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedVote {
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub name: String,
    pub vote: String,
}

fn required_text(doc: &Html, tag: &'static str, field: &'static str) -> Result<String> {
    doc.select(&landmark(tag))
        .next()
        .map(element_text)
        .ok_or(PipelineError::MissingRequiredField {
            entity: "vote",
            field,
        })
}

fn optional_text(doc: &Html, tag: &'static str) -> Option<String> {
    doc.select(&landmark(tag)).next().map(element_text)
}

fn count_field(section: scraper::ElementRef<'_>, tag: &'static str) -> Result<u32> {
    let text = section
        .select(&landmark(tag))
        .next()
        .map(element_text)
        .ok_or(PipelineError::MissingRequiredField {
            entity: "vote",
            field: "totals",
        })?;
    text.parse().map_err(|_| PipelineError::UnrecognizedMarkup {
        entity: "vote",
        label: format!("{tag}={text:?}"),
    })
}

fn tally(section: scraper::ElementRef<'_>) -> Result<VoteCount> {
    Ok(VoteCount {
        yea: count_field(section, "yea-total")?,
        nay: count_field(section, "nay-total")?,
        present: count_field(section, "present-total")?,
        not_voting: count_field(section, "not-voting-total")?,
    })
}

impl Vote {
    /// Build a vote record from a clerk roll-call feed body
    pub fn from_xml(url: &str, raw: &str, cache_dir: &Path) -> Result<Self> {
        let doc = Html::parse_document(strip_to_markup(raw));

        let congress_text = required_text(&doc, "congress", "congress")?;
        let congress: u32 =
            congress_text
                .parse()
                .map_err(|_| PipelineError::UnrecognizedMarkup {
                    entity: "vote",
                    label: format!("congress={congress_text:?}"),
                })?;

        // one known vote lists its chamber under a committee element
        let chamber = optional_text(&doc, "chamber")
            .or_else(|| optional_text(&doc, "committee"))
            .ok_or(PipelineError::MissingRequiredField {
                entity: "vote",
                field: "chamber",
            })?;

        let congress_info = CongressInfo {
            majority: required_text(&doc, "majority", "majority")?,
            congress,
            session: required_text(&doc, "session", "session")?,
            chamber,
            legis_num: required_text(&doc, "legis-num", "legis-num")?,
        };

        // votes deleted from the record carry no action date or time
        let datetime = match (
            optional_text(&doc, "action-date"),
            doc.select(&landmark("action-time"))
                .next()
                .and_then(|e| e.value().attr("time-etz").map(str::to_string)),
        ) {
            (Some(date), Some(time)) => Some(dates::parse_clerk_stamp(&date, &time)?),
            _ => None,
        };

        let vote_info = VoteInfo {
            question: required_text(&doc, "vote-question", "vote-question")?,
            kind: required_text(&doc, "vote-type", "vote-type")?,
            result: required_text(&doc, "vote-result", "vote-result")?,
            description: required_text(&doc, "vote-desc", "vote-desc")?,
            datetime,
        };

        let mut by_party = BTreeMap::new();
        for section in doc.select(&landmark("totals-by-party")) {
            let party = section
                .select(&landmark("party"))
                .next()
                .map(element_text)
                .ok_or(PipelineError::MissingRequiredField {
                    entity: "vote",
                    field: "party",
                })?;
            by_party.insert(party, tally(section)?);
        }

        let overall = doc
            .select(&landmark("totals-by-vote"))
            .next()
            .map(tally)
            .transpose()?
            .ok_or(PipelineError::MissingRequiredField {
                entity: "vote",
                field: "totals-by-vote",
            })?;

        let mut recorded = Vec::new();
        for entry in doc.select(&landmark("recorded-vote")) {
            let legislator = entry.select(&landmark("legislator")).next().ok_or(
                PipelineError::MissingRequiredField {
                    entity: "vote",
                    field: "legislator",
                },
            )?;
            let position = entry.select(&landmark("vote")).next().ok_or(
                PipelineError::MissingRequiredField {
                    entity: "vote",
                    field: "vote",
                },
            )?;
            let attr = |name| legislator.value().attr(name).map(str::to_string);
            recorded.push(RecordedVote {
                party: attr("party"),
                role: attr("role"),
                state: attr("state"),
                name: element_text(legislator),
                vote: element_text(position),
            });
        }

        Ok(Self {
            congress_info,
            vote_info,
            totals: Totals { overall, by_party },
            recorded,
            sources: Sources::for_url(url, cache_dir),
        })
    }

    /// Identity-derived persistence filename
    pub fn filename(&self) -> String {
        format!(
            "house_{}_{}.json",
            self.congress_info.congress,
            self.congress_info.legis_num.replace(' ', "")
        )
    }

    /// Persist under the identity-derived filename, overwriting any
    /// previous version
    pub fn save(&mut self, json_dir: &Path) -> Result<PathBuf> {
        let path = json_dir.join(self.filename());
        self.sources.json_path = path.clone();
        write_json(&path, self)?;
        Ok(path)
    }

    /// Load a persisted vote document
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Per-key search predicate used by the query engine
    pub fn search(&self, key: &str, value: &crate::query::QueryValue) -> Result<bool> {
        use crate::query::QueryValue;
        Ok(match key {
            "source" => self.sources.url == value.as_text(),
            "congress" => match value {
                QueryValue::Int(n) => self.congress_info.congress as i64 == *n,
                other => self.congress_info.congress.to_string() == other.as_text(),
            },
            "legis num" => self.congress_info.legis_num == value.as_text(),
            "result" => self.vote_info.result == value.as_text(),
            "question" => self
                .vote_info
                .question
                .to_lowercase()
                .contains(&value.as_text().to_lowercase()),
            _ => {
                return Err(PipelineError::QueryKey {
                    group: "votes",
                    key: key.to_string(),
                })
            }
        })
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {}: {}-{} ({})",
            self.vote_info.question,
            self.congress_info.legis_num,
            self.totals.overall.yea,
            self.totals.overall.nay,
            self.vote_info.result
        )
    }
}
