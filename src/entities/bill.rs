//! # Bill Entity
//!
//! ## Purpose
//! Parses a bill detail page into a structured record: the overview table,
//! the progress bar, title variants, the action log, cosponsors, committee
//! referrals, related bills, subjects, bill text, and amendments.
//!
//! ## Extraction policy
//! The overview table dispatches on its row labels exhaustively: a label
//! with no case here is format drift and aborts the record
//! (`UnrecognizedMarkup`). Entirely absent sections are legitimate — a
//! fresh bill has no cosponsors and no summary yet — and land as `None` or
//! an empty collection.

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::dates::{self, EpochSeconds};
use crate::errors::{PipelineError, Result};
use crate::text;

use super::{element_text, landmark, read_json, write_json, Link, Sources};

/// One bill. Identity is the `(congress, title)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub title: String,
    pub congress: u32,
    #[serde(default)]
    pub summary: Option<String>,
    pub sources: Sources,
    pub overview: BillOverview,
    #[serde(default)]
    pub progress: Vec<ProgressStage>,
    #[serde(default)]
    pub titles: Vec<TitleVariant>,
    #[serde(default)]
    pub action_overview: Vec<ActionDigest>,
    #[serde(default)]
    pub actions: Vec<BillAction>,
    #[serde(default)]
    pub cosponsors: Vec<Cosponsor>,
    #[serde(default)]
    pub committee_referrals: Vec<CommitteeReferral>,
    #[serde(default)]
    pub related_bills: Vec<RelatedBill>,
    #[serde(default)]
    pub subjects: Subjects,
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub amendments: Vec<Amendment>,
}

/// Overview table contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillOverview {
    pub sponsor: Sponsor,
    #[serde(default)]
    pub committees: Vec<String>,
    #[serde(default)]
    pub committee_report: Option<Link>,
    #[serde(default)]
    pub latest_action: Option<String>,
    #[serde(default)]
    pub roll_call_count: Option<u32>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The member who introduced the bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sponsor {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Introduction date from the sponsor cell
    #[serde(default)]
    pub introduced: Option<EpochSeconds>,
}

/// A scheduled committee meeting from the overview table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub url: String,
    pub datetime: EpochSeconds,
}

/// One stage of the progress bar, in page order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStage {
    pub stage: String,
    pub state: ProgressState,
}

/// Progress bar state. Persisted as the source's `-1 / 0 / 1` encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    NotReached,
    Current,
    Passed,
}

impl ProgressState {
    fn as_i8(self) -> i8 {
        match self {
            ProgressState::NotReached => -1,
            ProgressState::Current => 0,
            ProgressState::Passed => 1,
        }
    }
}

impl Serialize for ProgressState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

impl<'de> Deserialize<'de> for ProgressState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match i8::deserialize(deserializer)? {
            -1 => Ok(ProgressState::NotReached),
            0 => Ok(ProgressState::Current),
            1 => Ok(ProgressState::Passed),
            other => Err(serde::de::Error::custom(format!(
                "invalid progress state {other}"
            ))),
        }
    }
}

/// Short/official title variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleVariant {
    pub kind: TitleKind,
    #[serde(default)]
    pub chamber: Option<Chamber>,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleKind {
    Short,
    Official,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chamber {
    House,
    Senate,
}

/// Date-grained entry from the action overview table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDigest {
    pub date: EpochSeconds,
    pub action: String,
}

/// Entry from the full action log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillAction {
    pub datetime: EpochSeconds,
    pub action: String,
    #[serde(default)]
    pub chamber: Option<String>,
}

/// One cosponsor row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cosponsor {
    pub date: EpochSeconds,
    pub representative: Link,
    /// Joined at introduction
    #[serde(default)]
    pub original: bool,
    #[serde(default)]
    pub withdrawn: Option<Withdrawal>,
}

/// Withdrawal details for a former cosponsor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub date: EpochSeconds,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// One committee-activity row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitteeReferral {
    pub committee: String,
    #[serde(default)]
    pub subcommittee: Option<String>,
    #[serde(default)]
    pub datetime: Option<EpochSeconds>,
    pub action: String,
    #[serde(default)]
    pub report: Option<String>,
}

/// One related-bill row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedBill {
    pub bill: Link,
    pub relationship: String,
    #[serde(default)]
    pub identified: Option<EpochSeconds>,
    #[serde(default)]
    pub latest_action: Option<String>,
}

/// Policy area plus legislative subject terms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subjects {
    #[serde(default)]
    pub main: Option<Link>,
    #[serde(default)]
    pub others: Vec<Link>,
}

/// One amendment box
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amendment {
    pub amendment: Link,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub latest_action: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub committees: Vec<String>,
}

/// Recognized overview table labels — the fixed external contract of the
/// bill page
enum OverviewLabel {
    Sponsor,
    Committees,
    CommitteeReports,
    LatestAction,
    RollCallVotes,
    CommitteeMeetings,
    Notes,
}

impl OverviewLabel {
    fn from_text(label: &str) -> Option<Self> {
        match label {
            "Sponsor:" => Some(Self::Sponsor),
            "Committees:" => Some(Self::Committees),
            "Committee Reports:" => Some(Self::CommitteeReports),
            "Latest Action:" => Some(Self::LatestAction),
            "Roll Call Votes:" => Some(Self::RollCallVotes),
            "Committee Meetings:" => Some(Self::CommitteeMeetings),
            "Notes:" => Some(Self::Notes),
            _ => None,
        }
    }
}

/// Recognized amendment detail labels
enum AmendmentLabel {
    Purpose,
    Sponsor,
    LatestAction,
    Description,
    Committees,
}

impl AmendmentLabel {
    fn from_text(label: &str) -> Option<Self> {
        match label {
            "Purpose:" => Some(Self::Purpose),
            "Sponsor:" => Some(Self::Sponsor),
            "Latest Action:" => Some(Self::LatestAction),
            "Description:" => Some(Self::Description),
            "Committees:" => Some(Self::Committees),
            _ => None,
        }
    }
}

fn absolutize(root_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}{}", root_url.trim_end_matches('/'), href)
    }
}

fn link_from_anchor(anchor: ElementRef<'_>, root_url: &str) -> Link {
    Link {
        title: element_text(anchor),
        url: anchor
            .value()
            .attr("href")
            .map(|href| absolutize(root_url, href))
            .unwrap_or_default(),
    }
}

/// First non-empty text node of an element, skipping nested markup
fn leading_text(element: ElementRef<'_>) -> Option<String> {
    element
        .text()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(text::clean_cell)
}

impl Bill {
    /// Build a bill record from a detail page. `root_url` absolutizes the
    /// page's relative links.
    pub fn from_html(url: &str, raw: &str, cache_dir: &Path, root_url: &str) -> Result<Self> {
        let doc = Html::parse_document(raw);

        let heading = doc.select(&landmark("h1.legDetail")).next().ok_or(
            PipelineError::MissingRequiredField {
                entity: "bill",
                field: "title",
            },
        )?;
        let title = leading_text(heading).ok_or(PipelineError::MissingRequiredField {
            entity: "bill",
            field: "title",
        })?;

        let congress_re = Regex::new(r"(\d+)(?:st|nd|rd|th) Congress").expect("static regex");
        let heading_text = element_text(heading);
        let congress: u32 = congress_re
            .captures(&heading_text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .ok_or(PipelineError::MissingRequiredField {
                entity: "bill",
                field: "congress",
            })?;

        // the summary section exists only once one has been written
        let summary = doc
            .select(&landmark("#bill-summary p"))
            .last()
            .map(element_text);

        let overview = Self::extract_overview(&doc, root_url)?;
        let progress = Self::extract_progress(&doc);
        let titles = Self::extract_titles(&doc)?;
        let action_overview = Self::extract_action_overview(&doc)?;
        let actions = Self::extract_actions(&doc)?;
        let cosponsors = Self::extract_cosponsors(&doc, root_url)?;
        let committee_referrals = Self::extract_referrals(&doc)?;
        let related_bills = Self::extract_related(&doc, root_url)?;
        let subjects = Self::extract_subjects(&doc, root_url);
        let full_text = doc
            .select(&landmark("#billTextContainer"))
            .next()
            .map(element_text);
        let amendments = Self::extract_amendments(&doc, root_url)?;

        Ok(Self {
            title,
            congress,
            summary,
            sources: Sources::for_url(url, cache_dir),
            overview,
            progress,
            titles,
            action_overview,
            actions,
            cosponsors,
            committee_referrals,
            related_bills,
            subjects,
            full_text,
            amendments,
        })
    }

    fn extract_overview(doc: &Html, root_url: &str) -> Result<BillOverview> {
        let mut sponsor = None;
        let mut committees = Vec::new();
        let mut committee_report = None;
        let mut latest_action = None;
        let mut roll_call_count = None;
        let mut meetings = Vec::new();
        let mut notes = None;

        let introduced_re =
            Regex::new(r"\(Introduced (\d{2}/\d{2}/\d{4})\)").expect("static regex");

        for row in doc.select(&landmark("div.overview table tr")) {
            let label = match row.select(&landmark("th")).next() {
                Some(th) => element_text(th),
                None => continue,
            };
            let cell = match row.select(&landmark("td")).next() {
                Some(td) => td,
                None => continue,
            };

            match OverviewLabel::from_text(&label) {
                Some(OverviewLabel::Sponsor) => {
                    let anchor = cell.select(&landmark("a")).next().ok_or(
                        PipelineError::MissingRequiredField {
                            entity: "bill",
                            field: "sponsor",
                        },
                    )?;
                    let name = element_text(anchor);
                    let title = if name.starts_with("Rep.") {
                        Some("Representative".to_string())
                    } else if name.starts_with("Sen.") {
                        Some("Senator".to_string())
                    } else {
                        None
                    };
                    let introduced = introduced_re
                        .captures(&element_text(cell))
                        .and_then(|caps| caps.get(1))
                        .map(|m| dates::parse_date(m.as_str()))
                        .transpose()?;
                    sponsor = Some(Sponsor {
                        url: anchor
                            .value()
                            .attr("href")
                            .map(|href| absolutize(root_url, href))
                            .unwrap_or_default(),
                        name,
                        title,
                        introduced,
                    });
                }
                Some(OverviewLabel::Committees) => {
                    committees = text::house_committees(&element_text(cell));
                }
                Some(OverviewLabel::CommitteeReports) => {
                    committee_report = cell
                        .select(&landmark("a"))
                        .next()
                        .map(|a| link_from_anchor(a, root_url));
                }
                Some(OverviewLabel::LatestAction) => {
                    latest_action = Some(text::clean_latest_action(
                        &cell.text().collect::<String>(),
                    ));
                }
                Some(OverviewLabel::RollCallVotes) => {
                    roll_call_count = element_text(cell)
                        .split_whitespace()
                        .find_map(|token| token.parse().ok());
                }
                Some(OverviewLabel::CommitteeMeetings) => {
                    for anchor in cell.select(&landmark("a")) {
                        let stamp = element_text(anchor);
                        if stamp == "(All Meetings)" {
                            continue;
                        }
                        meetings.push(Meeting {
                            url: anchor
                                .value()
                                .attr("href")
                                .map(|href| absolutize(root_url, href))
                                .unwrap_or_default(),
                            datetime: dates::parse_meeting_stamp(&stamp)?,
                        });
                    }
                }
                Some(OverviewLabel::Notes) => {
                    notes = Some(element_text(cell));
                }
                None => {
                    return Err(PipelineError::UnrecognizedMarkup {
                        entity: "bill",
                        label,
                    })
                }
            }
        }

        Ok(BillOverview {
            sponsor: sponsor.ok_or(PipelineError::MissingRequiredField {
                entity: "bill",
                field: "sponsor",
            })?,
            committees,
            committee_report,
            latest_action,
            roll_call_count,
            meetings,
            notes,
        })
    }

    fn extract_progress(doc: &Html) -> Vec<ProgressStage> {
        doc.select(&landmark("ol.bill_progress li"))
            .filter_map(|li| {
                let stage = leading_text(li)?;
                let classes = li.value().attr("class").unwrap_or_default();
                let state = if classes.contains("selected") {
                    ProgressState::Current
                } else if classes.contains("passed") {
                    ProgressState::Passed
                } else {
                    ProgressState::NotReached
                };
                Some(ProgressStage { stage, state })
            })
            .collect()
    }

    fn extract_titles(doc: &Html) -> Result<Vec<TitleVariant>> {
        let mut titles = Vec::new();

        for boxed in doc.select(&landmark("#titles div.titles-box")) {
            let heading = match boxed.select(&landmark("h4")).next() {
                Some(h4) => element_text(h4),
                None => continue,
            };

            let kind = if heading.starts_with("Short") {
                TitleKind::Short
            } else if heading.starts_with("Official") {
                TitleKind::Official
            } else {
                return Err(PipelineError::UnrecognizedMarkup {
                    entity: "bill",
                    label: heading,
                });
            };
            let chamber = if heading.contains("House") {
                Some(Chamber::House)
            } else if heading.contains("Senate") {
                Some(Chamber::Senate)
            } else {
                None
            };
            let location = heading
                .split_once(" as ")
                .map(|(_, loc)| loc.trim().to_string());

            for item in boxed.select(&landmark("li")) {
                titles.push(TitleVariant {
                    kind,
                    chamber,
                    title: element_text(item),
                    location: location.clone(),
                });
            }
        }

        Ok(titles)
    }

    fn extract_action_overview(doc: &Html) -> Result<Vec<ActionDigest>> {
        let mut digest = Vec::new();
        for row in doc.select(&landmark("#actionsOverview table tbody tr")) {
            let cells: Vec<String> = row.select(&landmark("td")).map(element_text).collect();
            if cells.len() < 2 {
                continue;
            }
            digest.push(ActionDigest {
                date: dates::parse_date(&cells[0])?,
                action: cells[1].clone(),
            });
        }
        Ok(digest)
    }

    fn extract_actions(doc: &Html) -> Result<Vec<BillAction>> {
        let mut actions = Vec::new();
        for row in doc.select(&landmark("#allActions table tbody tr")) {
            let cells: Vec<String> = row.select(&landmark("td")).map(element_text).collect();
            if cells.len() < 2 {
                continue;
            }

            // three-column rows carry the chamber between stamp and text
            let (stamp, chamber, action) = if cells.len() >= 3 {
                (&cells[0], Some(cells[1].clone()), cells[2].clone())
            } else {
                (&cells[0], None, cells[1].clone())
            };

            let datetime = if stamp.contains('-') {
                dates::parse_action_stamp(stamp)?
            } else {
                dates::parse_date(stamp)?
            };

            actions.push(BillAction {
                datetime,
                action,
                chamber: chamber.filter(|c| !c.is_empty()),
            });
        }
        Ok(actions)
    }

    fn extract_cosponsors(doc: &Html, root_url: &str) -> Result<Vec<Cosponsor>> {
        let mut cosponsors = Vec::new();
        for row in doc.select(&landmark("#cosponsors table tbody tr")) {
            let anchor = match row.select(&landmark("a")).next() {
                Some(a) => a,
                None => continue,
            };
            let cells: Vec<String> = row.select(&landmark("td")).map(element_text).collect();
            if cells.len() < 2 {
                continue;
            }

            let mut representative = link_from_anchor(anchor, root_url);
            // an asterisk marks an original cosponsor
            let original = representative.title.ends_with('*');
            if original {
                representative.title =
                    representative.title.trim_end_matches('*').trim().to_string();
            }

            // four-column rows are withdrawn cosponsors
            let withdrawn = if cells.len() >= 4 && !cells[2].is_empty() {
                Some(Withdrawal {
                    date: dates::parse_date(&cells[2])?,
                    explanation: Some(cells[3].clone()).filter(|e| !e.is_empty()),
                })
            } else {
                None
            };

            cosponsors.push(Cosponsor {
                date: dates::parse_date(&cells[1])?,
                representative,
                original,
                withdrawn,
            });
        }
        Ok(cosponsors)
    }

    fn extract_referrals(doc: &Html) -> Result<Vec<CommitteeReferral>> {
        let mut referrals = Vec::new();
        let mut current_committee: Option<String> = None;

        for row in doc.select(&landmark("#committees table tbody tr")) {
            let cells: Vec<String> = row.select(&landmark("td")).map(element_text).collect();
            if cells.len() < 3 {
                continue;
            }

            let classes = row.value().attr("class").unwrap_or_default();
            let is_sub = classes.contains("subcommittee");

            let (committee, subcommittee) = if is_sub {
                let parent = current_committee.clone().ok_or_else(|| {
                    PipelineError::UnrecognizedMarkup {
                        entity: "bill",
                        label: format!("subcommittee row without committee: {:?}", cells[0]),
                    }
                })?;
                (parent, Some(cells[0].clone()))
            } else {
                current_committee = Some(cells[0].clone());
                (cells[0].clone(), None)
            };

            let datetime = if cells[1].is_empty() {
                None
            } else if cells[1].contains('-') {
                Some(dates::parse_action_stamp(&cells[1])?)
            } else {
                Some(dates::parse_date(&cells[1])?)
            };

            referrals.push(CommitteeReferral {
                committee,
                subcommittee,
                datetime,
                action: cells[2].clone(),
                report: cells.get(3).cloned().filter(|r| !r.is_empty()),
            });
        }
        Ok(referrals)
    }

    fn extract_related(doc: &Html, root_url: &str) -> Result<Vec<RelatedBill>> {
        let mut related = Vec::new();
        for row in doc.select(&landmark("#relatedBills table tbody tr")) {
            let anchor = match row.select(&landmark("a")).next() {
                Some(a) => a,
                None => continue,
            };
            let cells: Vec<String> = row.select(&landmark("td")).map(element_text).collect();
            if cells.len() < 2 {
                continue;
            }

            let identified = cells
                .get(2)
                .filter(|d| !d.is_empty())
                .map(|d| dates::parse_date(d))
                .transpose()?;

            related.push(RelatedBill {
                bill: link_from_anchor(anchor, root_url),
                relationship: cells[1].clone(),
                identified,
                latest_action: cells.get(3).cloned().filter(|a| !a.is_empty()),
            });
        }
        Ok(related)
    }

    fn extract_subjects(doc: &Html, root_url: &str) -> Subjects {
        Subjects {
            main: doc
                .select(&landmark("#subjects div.policy-area a"))
                .next()
                .map(|a| link_from_anchor(a, root_url)),
            others: doc
                .select(&landmark("#subjects ul li a"))
                .map(|a| link_from_anchor(a, root_url))
                .collect(),
        }
    }

    fn extract_amendments(doc: &Html, root_url: &str) -> Result<Vec<Amendment>> {
        let mut amendments = Vec::new();

        for boxed in doc.select(&landmark("#amendments div.amendment")) {
            let anchor = match boxed.select(&landmark("h3 a")).next() {
                Some(a) => a,
                None => continue,
            };

            let mut amendment = Amendment {
                amendment: link_from_anchor(anchor, root_url),
                purpose: None,
                sponsor: None,
                latest_action: None,
                description: None,
                committees: Vec::new(),
            };

            let labels: Vec<String> = boxed.select(&landmark("dt")).map(element_text).collect();
            let values: Vec<String> = boxed.select(&landmark("dd")).map(element_text).collect();

            for (label, value) in labels.iter().zip(values.iter()) {
                match AmendmentLabel::from_text(label) {
                    Some(AmendmentLabel::Purpose) => amendment.purpose = Some(value.clone()),
                    Some(AmendmentLabel::Sponsor) => amendment.sponsor = Some(value.clone()),
                    Some(AmendmentLabel::LatestAction) => {
                        amendment.latest_action = Some(value.clone())
                    }
                    Some(AmendmentLabel::Description) => {
                        amendment.description = Some(value.clone())
                    }
                    Some(AmendmentLabel::Committees) => {
                        amendment.committees =
                            value.split(';').map(|c| c.trim().to_string()).collect();
                    }
                    None => {
                        return Err(PipelineError::UnrecognizedMarkup {
                            entity: "bill",
                            label: label.clone(),
                        })
                    }
                }
            }

            amendments.push(amendment);
        }

        Ok(amendments)
    }

    /// The unique stage currently in progress, or `None` when no stage is
    /// current (or the page marked more than one — an invariant breach
    /// treated as unknown)
    pub fn get_progress(&self) -> Option<&str> {
        let mut current = self
            .progress
            .iter()
            .filter(|p| p.state == ProgressState::Current);
        match (current.next(), current.next()) {
            (Some(stage), None) => Some(stage.stage.as_str()),
            _ => None,
        }
    }

    /// Sponsor introduction timestamp, the sort key used by presentation
    /// callers
    pub fn get_introduced_date(&self) -> Option<EpochSeconds> {
        self.overview.sponsor.introduced
    }

    /// The bill number prefix of the display title, e.g. `H.R.748`
    pub fn number(&self) -> &str {
        self.title.split(" - ").next().unwrap_or(&self.title)
    }

    /// Identity-derived persistence filename
    pub fn filename(&self) -> String {
        format!("{}_{}.json", self.congress, self.number())
    }

    /// Persist under the identity-derived filename
    pub fn save(&mut self, json_dir: &Path) -> Result<PathBuf> {
        let path = json_dir.join(self.filename());
        self.sources.json_path = path.clone();
        write_json(&path, self)?;
        Ok(path)
    }

    /// Load a persisted bill document
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Per-key search predicate used by the query engine
    pub fn search(&self, key: &str, value: &crate::query::QueryValue) -> Result<bool> {
        use crate::query::QueryValue;
        Ok(match key {
            "source" => self.sources.url == value.as_text(),
            "title" => self
                .title
                .to_lowercase()
                .contains(&value.as_text().to_lowercase()),
            "congress" => match value {
                QueryValue::Int(n) => self.congress as i64 == *n,
                other => self.congress.to_string() == other.as_text(),
            },
            "sponsor url" => self.overview.sponsor.url == value.as_text(),
            "cosponsor url" => {
                let url = value.as_text();
                self.cosponsors.iter().any(|c| c.representative.url == url)
            }
            _ => {
                return Err(PipelineError::QueryKey {
                    group: "bills",
                    key: key.to_string(),
                })
            }
        })
    }
}

impl fmt::Display for Bill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.summary {
            Some(summary) => {
                let preview: String = summary.chars().take(50).collect();
                write!(f, "{} ({preview}...)", self.title)
            }
            None => write!(f, "{}", self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> &'static str {
        r##"<html><body>
<h1 class="legDetail">H.R.748 - Middle Class Health Benefits Tax Repeal Act<span> 116th Congress (2019-2020)</span></h1>
<div class="overview">
  <table><tbody>
    <tr><th>Sponsor:</th><td><a href="/member/joe-courtney/C001069">Rep. Courtney, Joe [D-CT-2]</a> (Introduced 01/24/2019)</td></tr>
    <tr><th>Committees:</th><td>Senate - Finance | House - Ways and Means; Education and Labor</td></tr>
    <tr><th>Committee Reports:</th><td><a href="/congressional-report/116th-congress/house-report/138">H. Rept. 116-138</a></td></tr>
    <tr><th>Latest Action:</th><td>Became Public Law No: 116-136.&#160;(All Actions)</td></tr>
    <tr><th>Roll Call Votes:</th><td>There have been 2 roll call votes</td></tr>
    <tr><th>Committee Meetings:</th><td>
      <a href="/committee-meeting/1">07/11/19 9:00AM</a>
      <a href="/committees/all">(All Meetings)</a>
    </td></tr>
    <tr><th>Notes:</th><td>On 3/27/2020, this bill became the vehicle for the CARES Act.</td></tr>
  </tbody></table>
</div>
<ol class="bill_progress">
  <li class="passed">Introduced</li>
  <li class="selected">Passed House</li>
  <li>Passed Senate</li>
  <li>Signed</li>
</ol>
<div id="bill-summary"><p>Summary heading</p><p>This bill repeals the excise tax on employer-sponsored coverage.</p></div>
<div id="titles">
  <div class="titles-box"><h4>Short Titles as Passed House</h4><ul><li>CARES Act</li></ul></div>
  <div class="titles-box"><h4>Official Title as Introduced</h4><ul><li>To amend the Internal Revenue Code of 1986 to repeal the excise tax.</li></ul></div>
</div>
<div id="actionsOverview"><table><tbody>
  <tr><td>03/27/2020</td><td>Became Public Law No: 116-136.</td></tr>
  <tr><td>01/24/2019</td><td>Introduced in House</td></tr>
</tbody></table></div>
<div id="allActions"><table><tbody>
  <tr><td>03/27/2020-1:25PM</td><td>House</td><td>Signed by the Speaker.</td></tr>
  <tr><td>01/24/2019</td><td></td><td>Introduced in House</td></tr>
</tbody></table></div>
<div id="cosponsors"><table><tbody>
  <tr><td><a href="/member/dwight-evans/E000296">Rep. Evans, Dwight [D-PA-3]*</a></td><td>01/24/2019</td></tr>
  <tr><td><a href="/member/sample-member/S000001">Rep. Sample, Member [R-TX-1]</a></td><td>02/11/2019</td><td>05/20/2019</td><td>Withdrawn at member request</td></tr>
</tbody></table></div>
<div id="committees"><table><tbody>
  <tr><td>House Ways and Means</td><td>01/24/2019</td><td>Referred to</td><td></td></tr>
  <tr class="subcommittee"><td>Health</td><td>02/01/2019</td><td>Referred to</td><td></td></tr>
</tbody></table></div>
<div id="relatedBills"><table><tbody>
  <tr><td><a href="/bill/116th-congress/senate-bill/684">S.684</a></td><td>Identical bill</td><td>04/02/2019</td><td>Read twice and referred to the Committee on Finance.</td></tr>
</tbody></table></div>
<div id="subjects">
  <div class="policy-area"><a href="/policy-area/taxation">Taxation</a></div>
  <ul><li><a href="/subject/employee-benefits">Employee benefits and pensions</a></li>
      <li><a href="/subject/health-care-costs">Health care costs and insurance</a></li></ul>
</div>
<pre id="billTextContainer">Be it enacted by the Senate and House of Representatives...</pre>
<div id="amendments">
  <div class="amendment">
    <h3><a href="/amendment/116th-congress/house-amendment/321">H.Amdt.321</a></h3>
    <dl>
      <dt>Purpose:</dt><dd>To strike section 2.</dd>
      <dt>Sponsor:</dt><dd>Rep. Sample, Member [R-TX-1]</dd>
      <dt>Latest Action:</dt><dd>Agreed to by voice vote.</dd>
    </dl>
  </div>
</div>
</body></html>"##
    }

    fn parse_fixture() -> Bill {
        Bill::from_html(
            "https://www.congress.gov/bill/116th-congress/house-bill/748",
            fixture(),
            Path::new("/tmp/bills/web"),
            "https://www.congress.gov",
        )
        .unwrap()
    }

    #[test]
    fn parses_title_congress_and_summary() {
        let bill = parse_fixture();
        assert_eq!(
            bill.title,
            "H.R.748 - Middle Class Health Benefits Tax Repeal Act"
        );
        assert_eq!(bill.congress, 116);
        assert_eq!(
            bill.summary.as_deref(),
            Some("This bill repeals the excise tax on employer-sponsored coverage.")
        );
        assert_eq!(bill.number(), "H.R.748");
        assert_eq!(bill.filename(), "116_H.R.748.json");
    }

    #[test]
    fn overview_table_extracts_every_known_label() {
        let bill = parse_fixture();
        let overview = &bill.overview;

        assert_eq!(overview.sponsor.name, "Rep. Courtney, Joe [D-CT-2]");
        assert_eq!(
            overview.sponsor.url,
            "https://www.congress.gov/member/joe-courtney/C001069"
        );
        assert_eq!(overview.sponsor.title.as_deref(), Some("Representative"));
        assert_eq!(
            overview.sponsor.introduced,
            Some(crate::dates::parse_date("01/24/2019").unwrap())
        );
        // only the House segment of the committees cell is retained
        assert_eq!(
            overview.committees,
            vec!["Ways and Means".to_string(), "Education and Labor".to_string()]
        );
        assert_eq!(
            overview.committee_report.as_ref().unwrap().title,
            "H. Rept. 116-138"
        );
        assert_eq!(
            overview.latest_action.as_deref(),
            Some("Became Public Law No: 116-136.")
        );
        assert_eq!(overview.roll_call_count, Some(2));
        assert_eq!(overview.meetings.len(), 1);
        assert!(overview.notes.as_deref().unwrap().contains("CARES Act"));
    }

    #[test]
    fn unknown_overview_label_aborts_the_record() {
        let raw = fixture().replace("Roll Call Votes:", "Tally Sheet:");
        match Bill::from_html(
            "https://x/bill",
            &raw,
            Path::new("/tmp"),
            "https://www.congress.gov",
        ) {
            Err(PipelineError::UnrecognizedMarkup { label, .. }) => {
                assert_eq!(label, "Tally Sheet:")
            }
            other => panic!("expected UnrecognizedMarkup, got {other:?}"),
        }
    }

    #[test]
    fn missing_sponsor_is_a_required_field_error() {
        let raw = fixture().replace(
            "<tr><th>Sponsor:</th><td><a href=\"/member/joe-courtney/C001069\">Rep. Courtney, Joe [D-CT-2]</a> (Introduced 01/24/2019)</td></tr>",
            "",
        );
        match Bill::from_html(
            "https://x/bill",
            &raw,
            Path::new("/tmp"),
            "https://www.congress.gov",
        ) {
            Err(PipelineError::MissingRequiredField { field, .. }) => {
                assert_eq!(field, "sponsor")
            }
            other => panic!("expected MissingRequiredField, got {other:?}"),
        }
    }

    #[test]
    fn progress_bar_has_a_unique_current_stage() {
        let bill = parse_fixture();
        assert_eq!(
            bill.progress
                .iter()
                .map(|p| p.state.as_i8())
                .collect::<Vec<_>>(),
            vec![1, 0, -1, -1]
        );
        assert_eq!(bill.get_progress(), Some("Passed House"));
    }

    #[test]
    fn title_variants_carry_kind_chamber_and_location() {
        let bill = parse_fixture();
        assert_eq!(bill.titles.len(), 2);
        assert_eq!(
            bill.titles[0],
            TitleVariant {
                kind: TitleKind::Short,
                chamber: Some(Chamber::House),
                title: "CARES Act".to_string(),
                location: Some("Passed House".to_string()),
            }
        );
        assert_eq!(bill.titles[1].kind, TitleKind::Official);
        assert_eq!(bill.titles[1].chamber, None);
        assert_eq!(bill.titles[1].location.as_deref(), Some("Introduced"));
    }

    #[test]
    fn action_tables_parse_both_column_layouts() {
        let bill = parse_fixture();
        assert_eq!(bill.action_overview.len(), 2);
        assert_eq!(bill.actions.len(), 2);
        assert_eq!(bill.actions[0].chamber.as_deref(), Some("House"));
        assert_eq!(bill.actions[0].action, "Signed by the Speaker.");
        // blank chamber cells normalize to None
        assert_eq!(bill.actions[1].chamber, None);
    }

    #[test]
    fn cosponsors_track_original_and_withdrawn_flags() {
        let bill = parse_fixture();
        assert_eq!(bill.cosponsors.len(), 2);

        let original = &bill.cosponsors[0];
        assert!(original.original);
        assert_eq!(original.representative.title, "Rep. Evans, Dwight [D-PA-3]");
        assert!(original.withdrawn.is_none());

        let withdrawn = &bill.cosponsors[1];
        assert!(!withdrawn.original);
        let withdrawal = withdrawn.withdrawn.as_ref().unwrap();
        assert_eq!(
            withdrawal.explanation.as_deref(),
            Some("Withdrawn at member request")
        );
    }

    #[test]
    fn subcommittee_rows_attach_to_their_committee() {
        let bill = parse_fixture();
        assert_eq!(bill.committee_referrals.len(), 2);
        assert_eq!(bill.committee_referrals[0].committee, "House Ways and Means");
        assert_eq!(bill.committee_referrals[0].subcommittee, None);
        assert_eq!(bill.committee_referrals[1].committee, "House Ways and Means");
        assert_eq!(
            bill.committee_referrals[1].subcommittee.as_deref(),
            Some("Health")
        );
    }

    #[test]
    fn related_bills_subjects_text_and_amendments() {
        let bill = parse_fixture();

        assert_eq!(bill.related_bills.len(), 1);
        assert_eq!(bill.related_bills[0].bill.title, "S.684");
        assert_eq!(bill.related_bills[0].relationship, "Identical bill");

        assert_eq!(bill.subjects.main.as_ref().unwrap().title, "Taxation");
        assert_eq!(bill.subjects.others.len(), 2);

        assert!(bill.full_text.as_deref().unwrap().starts_with("Be it enacted"));

        assert_eq!(bill.amendments.len(), 1);
        assert_eq!(bill.amendments[0].amendment.title, "H.Amdt.321");
        assert_eq!(
            bill.amendments[0].purpose.as_deref(),
            Some("To strike section 2.")
        );
    }

    #[test]
    fn search_covers_the_documented_keys() {
        use crate::query::QueryValue;
        let bill = parse_fixture();
        let text = |s: &str| QueryValue::Text(s.to_string());

        assert!(bill
            .search(
                "source",
                &text("https://www.congress.gov/bill/116th-congress/house-bill/748")
            )
            .unwrap());
        assert!(bill.search("title", &text("health benefits")).unwrap());
        assert!(bill.search("congress", &QueryValue::Int(116)).unwrap());
        assert!(bill
            .search(
                "sponsor url",
                &text("https://www.congress.gov/member/joe-courtney/C001069")
            )
            .unwrap());
        assert!(bill
            .search(
                "cosponsor url",
                &text("https://www.congress.gov/member/dwight-evans/E000296")
            )
            .unwrap());
        assert!(matches!(
            bill.search("texture", &text("x")),
            Err(PipelineError::QueryKey { .. })
        ));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut bill = parse_fixture();
        let path = bill.save(dir.path()).unwrap();
        let loaded = Bill::load(&path).unwrap();

        assert_eq!(loaded.title, bill.title);
        assert_eq!(loaded.congress, bill.congress);
        assert_eq!(loaded.progress, bill.progress);
        assert_eq!(loaded.cosponsors.len(), bill.cosponsors.len());
        assert_eq!(loaded.get_progress(), Some("Passed House"));
        assert_eq!(loaded.sources.json_path, path);
    }
}
