//! # Representative Entity
//!
//! ## Purpose
//! Parses a member detail page into a representative record: the heading
//! basics (title, name, life years), the profile table (website, party,
//! contact — or a party-history list for members whose affiliation
//! changed), and the positions table of seats held.
//!
//! Derived views (current party, current seat, active flag, years of
//! service) compute from those records rather than being scraped.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::errors::{PipelineError, Result};
use crate::text;

use super::{element_text, landmark, read_json, write_json, Sources};

/// One member of Congress. Identity is the full name, unique within a
/// corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Representative {
    pub basics: Basics,
    pub overview: RepOverview,
    pub sources: Sources,
}

/// Heading basics from the detail page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Basics {
    /// `Representative` or `Senator`
    pub title: String,
    pub name: String,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub death_year: Option<i32>,
}

/// Profile and service history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepOverview {
    pub info: RepInfo,
    #[serde(default)]
    pub positions: Vec<Position>,
}

/// Profile table contents. Sitting members carry website/party/contact;
/// historical members carry a party-history list of `"Party Term"` strings
/// instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepInfo {
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub party_history: Vec<String>,
}

/// One seat held: chamber, state, optional district, and the years and
/// congresses covered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub chamber: String,
    pub state: String,
    #[serde(default)]
    pub district: Option<u32>,
    pub start_year: i32,
    /// `None` while the seat is currently held
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub congresses: Vec<u32>,
}

/// Recognized profile table labels. Anything else on a member page is
/// format drift and aborts the record.
enum ProfileLabel {
    Website,
    Party,
    Contact,
    PartyHistory,
}

impl ProfileLabel {
    fn from_text(label: &str) -> Option<Self> {
        match label {
            "Website:" => Some(Self::Website),
            "Party:" => Some(Self::Party),
            "Contact:" => Some(Self::Contact),
            "Party History:" => Some(Self::PartyHistory),
            _ => None,
        }
    }
}

impl Representative {
    /// Build a representative record from a member detail page
    pub fn from_html(url: &str, raw: &str, cache_dir: &Path) -> Result<Self> {
        let doc = Html::parse_document(raw);

        let heading = doc.select(&landmark("h1.legDetail")).next().ok_or(
            PipelineError::MissingRequiredField {
                entity: "representative",
                field: "name",
            },
        )?;

        // first text node is "<Title> <Name>"; life years follow in
        // a "(YYYY - YYYY?)" span
        let display = heading
            .text()
            .map(str::trim)
            .find(|t| !t.is_empty())
            .map(text::clean_cell)
            .filter(|t| !t.is_empty())
            .ok_or(PipelineError::MissingRequiredField {
                entity: "representative",
                field: "name",
            })?;

        let (title, name) = match display.split_once(' ') {
            Some((first, rest)) if matches!(first, "Representative" | "Senator") => {
                (first.to_string(), rest.to_string())
            }
            _ => {
                return Err(PipelineError::UnrecognizedMarkup {
                    entity: "representative",
                    label: display,
                })
            }
        };

        let full_heading = element_text(heading);
        let years_re = Regex::new(r"\((\d{4})\s*-\s*(\d{4})?\s*\)").expect("static regex");
        let (birth_year, death_year) = match years_re.captures(&full_heading) {
            Some(caps) => (
                caps.get(1).and_then(|m| m.as_str().parse().ok()),
                caps.get(2).and_then(|m| m.as_str().parse().ok()),
            ),
            None => (None, None),
        };

        let info = Self::extract_profile(&doc)?;
        let positions = Self::extract_positions(&doc)?;

        Ok(Self {
            basics: Basics {
                title,
                name,
                birth_year,
                death_year,
            },
            overview: RepOverview { info, positions },
            sources: Sources::for_url(url, cache_dir),
        })
    }

    fn extract_profile(doc: &Html) -> Result<RepInfo> {
        let mut info = RepInfo::default();

        for row in doc.select(&landmark("div.overview-member-column-profile table tr")) {
            let label = match row.select(&landmark("th")).next() {
                Some(th) => element_text(th),
                None => continue,
            };
            let cell = row.select(&landmark("td")).next();

            match ProfileLabel::from_text(&label) {
                Some(ProfileLabel::Website) => {
                    info.website = cell
                        .and_then(|td| td.select(&landmark("a")).next())
                        .and_then(|a| a.value().attr("href"))
                        .map(str::to_string)
                        .or_else(|| cell.map(element_text));
                }
                Some(ProfileLabel::Party) => {
                    info.party = cell.map(element_text);
                }
                Some(ProfileLabel::Contact) => {
                    info.contact = cell.map(element_text);
                }
                Some(ProfileLabel::PartyHistory) => {
                    if let Some(td) = cell {
                        let items: Vec<String> =
                            td.select(&landmark("li")).map(element_text).collect();
                        info.party_history = if items.is_empty() {
                            vec![element_text(td)]
                        } else {
                            items
                        };
                    }
                }
                None => {
                    return Err(PipelineError::UnrecognizedMarkup {
                        entity: "representative",
                        label,
                    })
                }
            }
        }

        Ok(info)
    }

    fn extract_positions(doc: &Html) -> Result<Vec<Position>> {
        let number_re = Regex::new(r"\d+").expect("static regex");
        let mut positions = Vec::new();

        for row in doc.select(&landmark("table.member-positions tbody tr")) {
            let cells: Vec<String> = row.select(&landmark("td")).map(element_text).collect();
            if cells.len() < 4 {
                continue;
            }

            let years = &cells[3];
            let (start, end) =
                years
                    .split_once('-')
                    .ok_or_else(|| PipelineError::UnrecognizedMarkup {
                        entity: "representative",
                        label: format!("position years {years:?}"),
                    })?;
            let start_year: i32 =
                start
                    .trim()
                    .parse()
                    .map_err(|_| PipelineError::UnrecognizedMarkup {
                        entity: "representative",
                        label: format!("position years {years:?}"),
                    })?;
            let end = end.trim();
            let end_year = if end.eq_ignore_ascii_case("present") {
                None
            } else {
                Some(
                    end.parse()
                        .map_err(|_| PipelineError::UnrecognizedMarkup {
                            entity: "representative",
                            label: format!("position years {years:?}"),
                        })?,
                )
            };

            let congresses = cells
                .get(4)
                .map(|cell| {
                    number_re
                        .find_iter(cell)
                        .filter_map(|m| m.as_str().parse().ok())
                        .collect()
                })
                .unwrap_or_default();

            positions.push(Position {
                chamber: cells[0].clone(),
                state: cells[1].clone(),
                district: cells[2].parse().ok(),
                start_year,
                end_year,
                congresses,
            });
        }

        Ok(positions)
    }

    /// Current party: the party-history entry whose term runs to
    /// `Present`, else the explicit party field
    pub fn current_party(&self) -> Option<String> {
        self.overview
            .info
            .party_history
            .iter()
            .rev()
            .find(|entry| entry.trim_end().ends_with("Present"))
            .and_then(|entry| entry.rsplit_once(' '))
            .map(|(party, _)| party.to_string())
            .or_else(|| self.overview.info.party.clone())
    }

    fn current_position(&self) -> Option<&Position> {
        self.overview
            .positions
            .iter()
            .find(|p| p.end_year.is_none())
    }

    /// State of the currently held seat
    pub fn current_state(&self) -> Option<&str> {
        self.current_position().map(|p| p.state.as_str())
    }

    /// District of the currently held seat (senators have none)
    pub fn current_district(&self) -> Option<u32> {
        self.current_position().and_then(|p| p.district)
    }

    /// Whether any seat is currently held
    pub fn is_active(&self) -> bool {
        self.current_position().is_some()
    }

    /// Age as of the given year; `None` without a birth year or after death
    pub fn age_as_of(&self, year: i32) -> Option<i32> {
        if self.basics.death_year.is_some() {
            return None;
        }
        self.basics.birth_year.map(|birth| year - birth)
    }

    /// Age as of the current year
    pub fn age(&self) -> Option<i32> {
        self.age_as_of(chrono::Utc::now().year())
    }

    /// Total years served across positions; open-ended seats count up to
    /// the given year
    pub fn years_of_service_as_of(&self, year: i32) -> i32 {
        self.overview
            .positions
            .iter()
            .map(|p| p.end_year.unwrap_or(year) - p.start_year)
            .sum()
    }

    /// Total years served as of the current year
    pub fn years_of_service(&self) -> i32 {
        self.years_of_service_as_of(chrono::Utc::now().year())
    }

    fn chamber(&self) -> Option<&'static str> {
        match self.basics.title.as_str() {
            "Representative" => Some("House"),
            "Senator" => Some("Senate"),
            _ => None,
        }
    }

    /// Identity-derived persistence filename
    pub fn filename(&self) -> String {
        format!("{}.json", self.basics.name)
    }

    /// Persist under the identity-derived filename
    pub fn save(&mut self, json_dir: &Path) -> Result<PathBuf> {
        let path = json_dir.join(self.filename());
        self.sources.json_path = path.clone();
        write_json(&path, self)?;
        Ok(path)
    }

    /// Load a persisted representative document
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Per-key search predicate used by the query engine
    pub fn search(&self, key: &str, value: &crate::query::QueryValue) -> Result<bool> {
        use crate::query::QueryValue;
        Ok(match key {
            "source" => self.sources.url == value.as_text(),
            "name" => text::is_name_match(&value.as_text(), &self.basics.name),
            "chamber" => self.chamber() == Some(value.as_text().as_str()),
            "alive" => match value {
                QueryValue::Flag(alive) => self.basics.death_year.is_none() == *alive,
                _ => false,
            },
            "party" => self.current_party().as_deref() == Some(value.as_text().as_str()),
            "state" => self.current_state() == Some(value.as_text().as_str()),
            "district" => match value {
                QueryValue::Int(n) => self.current_district() == Some(*n as u32),
                other => other
                    .as_text()
                    .parse::<u32>()
                    .map(|n| self.current_district() == Some(n))
                    .unwrap_or(false),
            },
            "active" => match value {
                QueryValue::Flag(active) => self.is_active() == *active,
                _ => false,
            },
            _ => {
                return Err(PipelineError::QueryKey {
                    group: "reps",
                    key: key.to_string(),
                })
            }
        })
    }
}

impl fmt::Display for Representative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.basics.title, self.basics.name)
    }
}
