//! # Floor Session Entity
//!
//! ## Purpose
//! Parses a clerk floor-proceedings XML document into a session record: one
//! `LegislativeActivity` per legislative day, each holding an ordered list
//! of timestamped floor actions.
//!
//! A floor action may point at a vote or a bill through the `rel` tag on
//! the anchor inside its description. Those pointers stay **lazy**: the
//! record stores the URL and kind only, and resolution happens through the
//! corpus URL indices. The same referenced vote is therefore fetched once
//! per scrape, not once per mentioning floor action.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::dates::{self, EpochSeconds};
use crate::errors::{PipelineError, Result};
use crate::text::strip_to_markup;

use super::{element_text, landmark, read_json, write_json, Sources};

/// One floor session, identified by its source document name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub congress: u32,
    pub session: String,
    /// Source document name, e.g. `HDoc-116-1-FloorProceedings.xml`
    pub source: String,
    pub sources: Sources,
    #[serde(default)]
    pub activities: Vec<LegislativeActivity>,
}

/// The floor record of a single legislative day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegislativeActivity {
    pub header: String,
    pub language: String,
    pub date: EpochSeconds,
    #[serde(default)]
    pub actions: Vec<FloorAction>,
}

/// A single dated event in a legislative day's record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorAction {
    pub time: EpochSeconds,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub act_id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub item: Option<ActionItemRef>,
}

/// Lazy pointer to the vote or bill a floor action references. Resolved on
/// demand through the corpus, never during parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItemRef {
    pub title: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub kind: Option<ActionKind>,
}

/// What an action item points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Vote,
    Bill,
}

impl LegislativeActivity {
    /// Floor actions that reference a roll-call vote
    pub fn votes(&self) -> Vec<&FloorAction> {
        self.actions
            .iter()
            .filter(|a| a.kind() == Some(ActionKind::Vote))
            .collect()
    }

    /// Floor actions that reference a bill
    pub fn bills(&self) -> Vec<&FloorAction> {
        self.actions
            .iter()
            .filter(|a| a.kind() == Some(ActionKind::Bill))
            .collect()
    }

    /// Distinct action item kinds seen this day (untyped actions included
    /// as `None`)
    pub fn action_kinds(&self) -> BTreeSet<Option<ActionKind>> {
        self.actions.iter().map(FloorAction::kind).collect()
    }
}

impl FloorAction {
    pub fn kind(&self) -> Option<ActionKind> {
        self.item.as_ref().and_then(|item| item.kind)
    }
}

impl Session {
    /// Build a session record from a floor-proceedings feed body. The cache
    /// file is named after the source document rather than the URL.
    pub fn from_xml(source: &str, url: &str, raw: &str, cache_dir: &Path) -> Result<Self> {
        let doc = Html::parse_document(strip_to_markup(raw));

        let congress_text = doc
            .select(&landmark("congress"))
            .next()
            .map(element_text)
            .ok_or(PipelineError::MissingRequiredField {
                entity: "session",
                field: "congress",
            })?;
        let congress: u32 =
            congress_text
                .parse()
                .map_err(|_| PipelineError::UnrecognizedMarkup {
                    entity: "session",
                    label: format!("congress={congress_text:?}"),
                })?;

        let session_num = doc
            .select(&landmark("session"))
            .next()
            .map(element_text)
            .ok_or(PipelineError::MissingRequiredField {
                entity: "session",
                field: "session",
            })?;

        let mut activities = Vec::new();
        for activity in doc.select(&landmark("legislative_activity")) {
            activities.push(Self::extract_activity(activity)?);
        }

        Ok(Self {
            congress,
            session: session_num,
            source: source.to_string(),
            sources: Sources {
                url: url.to_string(),
                cache_path: cache_dir.join(source),
                json_path: PathBuf::new(),
            },
            activities,
        })
    }

    fn extract_activity(activity: scraper::ElementRef<'_>) -> Result<LegislativeActivity> {
        let header = activity
            .select(&landmark("legislative_header"))
            .next()
            .map(element_text)
            .ok_or(PipelineError::MissingRequiredField {
                entity: "session",
                field: "legislative_header",
            })?;
        let language = activity
            .select(&landmark("language"))
            .next()
            .map(element_text)
            .unwrap_or_default();

        let date_attr = activity
            .select(&landmark("legislative_day"))
            .next()
            .and_then(|day| day.value().attr("date").map(str::to_string))
            .ok_or(PipelineError::MissingRequiredField {
                entity: "session",
                field: "legislative_day",
            })?;
        let date = dates::parse_compact_date(&date_attr)?;

        let mut actions = Vec::new();
        for action in activity.select(&landmark("floor_action")) {
            actions.push(Self::extract_action(action)?);
        }

        Ok(LegislativeActivity {
            header,
            language,
            date,
            actions,
        })
    }

    fn extract_action(action: scraper::ElementRef<'_>) -> Result<FloorAction> {
        let stamp = action
            .select(&landmark("action_time"))
            .next()
            .and_then(|t| t.value().attr("for-search").map(str::to_string))
            .ok_or(PipelineError::MissingRequiredField {
                entity: "session",
                field: "action_time",
            })?;
        let time = dates::parse_floor_stamp(&stamp)?;

        let description_el = action.select(&landmark("action_description")).next().ok_or(
            PipelineError::MissingRequiredField {
                entity: "session",
                field: "action_description",
            },
        )?;
        let description = element_text(description_el);

        // the typed pointer, when present, is the anchor inside the
        // description; its rel attribute carries the kind tag
        let item = action
            .select(&landmark("action_item"))
            .next()
            .map(|item_el| {
                let anchor = description_el.select(&landmark("a")).next();
                ActionItemRef {
                    title: element_text(item_el),
                    text: anchor.map(element_text),
                    url: anchor
                        .and_then(|a| a.value().attr("href"))
                        .map(str::to_string),
                    kind: anchor
                        .and_then(|a| a.value().attr("rel"))
                        .and_then(|rel| match rel {
                            "vote" => Some(ActionKind::Vote),
                            "bill" => Some(ActionKind::Bill),
                            _ => None,
                        }),
                }
            });

        let attr = |name| action.value().attr(name).map(str::to_string);
        Ok(FloorAction {
            time,
            unique_id: attr("unique-id"),
            act_id: attr("act-id"),
            description,
            item,
        })
    }

    /// Identity-derived persistence filename
    pub fn filename(&self) -> String {
        format!("{}.json", self.source.trim_end_matches(".xml"))
    }

    /// Persist under the identity-derived filename
    pub fn save(&mut self, json_dir: &Path) -> Result<PathBuf> {
        let path = json_dir.join(self.filename());
        self.sources.json_path = path.clone();
        write_json(&path, self)?;
        Ok(path)
    }

    /// Load a persisted session document
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "US House #{} - Session {}", self.congress, self.session)
    }
}
