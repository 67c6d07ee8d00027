//! # Query Engine Module
//!
//! ## Purpose
//! Resolves `(group, key, value)` queries into sets of matching entities
//! over an immutable corpus. The base case is a linear scan through the
//! group's collection with the entity's own search predicate; every result
//! is memoized under an explicit two-level `(group, key, value)` key and
//! never invalidated — the corpus is static after load, and a refresh
//! rebuilds engine and corpus together.
//!
//! ## Input/Output Specification
//! - **Input**: group (`reps` / `bills` / `votes`), field selector, value
//! - **Output**: plain `HashSet<EntityId>` so callers compose queries with
//!   `&` (AND) and `|` (OR) directly
//! - **Errors**: unknown group and unknown key surface as typed errors,
//!   never as a silently empty set
//!
//! Cross-entity joins are index reuse, not new scans: `(reps, sponsor,
//! url)` and `(reps, cosponsor, url)` resolve through the corresponding
//! `(bills, … url)` entries.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::corpus::Corpus;
use crate::errors::{PipelineError, Result};

/// Entity groups the engine serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Reps,
    Bills,
    Votes,
}

impl Group {
    fn parse(group: &str) -> Result<Self> {
        match group {
            "reps" => Ok(Group::Reps),
            "bills" => Ok(Group::Bills),
            "votes" => Ok(Group::Votes),
            other => Err(PipelineError::QueryGroup {
                group: other.to_string(),
            }),
        }
    }
}

/// Cheap tagged handle to one corpus entity; resolve through
/// [`Corpus::bill`], [`Corpus::rep`], or [`Corpus::vote`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Bill(u32),
    Rep(u32),
    Vote(u32),
}

/// A query value. Text, integer, and flag values cover every search key
/// the entities expose.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Int(i64),
    Flag(bool),
}

impl QueryValue {
    /// Text rendering used by string-typed predicates
    pub fn as_text(&self) -> String {
        match self {
            QueryValue::Text(s) => s.clone(),
            QueryValue::Int(n) => n.to_string(),
            QueryValue::Flag(b) => b.to_string(),
        }
    }

    /// Canonical memo-key form; tagged so `Text("1")` and `Int(1)` stay
    /// distinct entries
    fn canonical(&self) -> String {
        match self {
            QueryValue::Text(s) => format!("t:{s}"),
            QueryValue::Int(n) => format!("i:{n}"),
            QueryValue::Flag(b) => format!("b:{b}"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Int(value as i64)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Flag(value)
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// Memoizing query engine over an immutable corpus
pub struct QueryEngine {
    corpus: Arc<Corpus>,
    memo: DashMap<(Group, String, String), HashSet<EntityId>>,
    memo_enabled: bool,
}

impl QueryEngine {
    pub fn new(corpus: Arc<Corpus>, memo_enabled: bool) -> Self {
        Self {
            corpus,
            memo: DashMap::new(),
            memo_enabled,
        }
    }

    /// The corpus this engine answers from
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Resolve a `(group, key, value)` query to the set of matching
    /// entities
    pub fn search(
        &self,
        group: &str,
        key: &str,
        value: impl Into<QueryValue>,
    ) -> Result<HashSet<EntityId>> {
        let value = value.into();
        let group = Group::parse(group)?;

        // cross-entity joins reuse the bill-side index instead of scanning
        // representatives
        if group == Group::Reps {
            match key {
                "sponsor" => return self.run(Group::Bills, "sponsor url", &value),
                "cosponsor" => return self.run(Group::Bills, "cosponsor url", &value),
                _ => {}
            }
        }

        self.run(group, key, &value)
    }

    fn run(&self, group: Group, key: &str, value: &QueryValue) -> Result<HashSet<EntityId>> {
        let memo_key = (group, key.to_string(), value.canonical());
        if self.memo_enabled {
            if let Some(hit) = self.memo.get(&memo_key) {
                debug!(?group, key, %value, "query memo hit");
                return Ok(hit.clone());
            }
        }

        let result = self.scan(group, key, value)?;
        if self.memo_enabled {
            self.memo.insert(memo_key, result.clone());
        }
        Ok(result)
    }

    fn scan(&self, group: Group, key: &str, value: &QueryValue) -> Result<HashSet<EntityId>> {
        let mut matches = HashSet::new();
        match group {
            Group::Bills => {
                for (idx, bill) in self.corpus.bills().iter().enumerate() {
                    if bill.search(key, value)? {
                        matches.insert(EntityId::Bill(idx as u32));
                    }
                }
            }
            Group::Reps => {
                for (idx, rep) in self.corpus.reps().iter().enumerate() {
                    if rep.search(key, value)? {
                        matches.insert(EntityId::Rep(idx as u32));
                    }
                }
            }
            Group::Votes => {
                for (idx, vote) in self.corpus.votes().iter().enumerate() {
                    if vote.search(key, value)? {
                        matches.insert(EntityId::Vote(idx as u32));
                    }
                }
            }
        }
        debug!(?group, key, %value, count = matches.len(), "query scanned");
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Bill, Representative};
    use std::path::Path;

    fn bill_html(number: &str, name: &str, sponsor: &str, cosponsor: Option<&str>) -> String {
        let cosponsor_block = cosponsor
            .map(|url| {
                format!(
                    r#"<div id="cosponsors"><table><tbody>
<tr><td><a href="{url}">Rep. Cosponsor [D-NY-1]*</a></td><td>01/25/2019</td></tr>
</tbody></table></div>"#
                )
            })
            .unwrap_or_default();
        format!(
            r#"<html><body>
<h1 class="legDetail">{number} - {name}<span> 116th Congress (2019-2020)</span></h1>
<div class="overview"><table><tbody>
<tr><th>Sponsor:</th><td><a href="{sponsor}">Rep. Sponsor [D-PA-1]</a> (Introduced 01/24/2019)</td></tr>
</tbody></table></div>
{cosponsor_block}
</body></html>"#
        )
    }

    fn rep_html(name: &str, party: &str, state: &str, district: u32) -> String {
        format!(
            r#"<html><body>
<h1 class="legDetail">Representative {name}<span> (1954 - )</span></h1>
<div class="overview-member-column-profile"><table><tbody>
<tr><th>Party:</th><td>{party}</td></tr>
</tbody></table></div>
<table class="member-positions"><tbody>
<tr><td>House</td><td>{state}</td><td>{district}</td><td>2016 - Present</td><td>114th</td></tr>
</tbody></table>
</body></html>"#
        )
    }

    fn bill(number: &str, name: &str, sponsor: &str, cosponsor: Option<&str>) -> Bill {
        Bill::from_html(
            &format!("https://www.congress.gov/bill/116/{number}"),
            &bill_html(number, name, sponsor, cosponsor),
            Path::new("/tmp"),
            "https://www.congress.gov",
        )
        .unwrap()
    }

    fn rep(name: &str, party: &str, state: &str, district: u32) -> Representative {
        Representative::from_html(
            &format!("https://www.congress.gov/member/{}", name.replace(' ', "-")),
            &rep_html(name, party, state, district),
            Path::new("/tmp"),
        )
        .unwrap()
    }

    fn fixture_engine() -> QueryEngine {
        let reps = vec![
            rep("Dwight Evans", "Democratic", "Pennsylvania", 3),
            rep("Alice Albany", "Democratic", "New York", 1),
            rep("Bob Brooklyn", "Democratic", "New York", 2),
            rep("Carol Catskill", "Republican", "New York", 3),
            rep("Dan Dallas", "Republican", "Texas", 5),
        ];
        let bills = vec![
            bill("H.R.1", "First Bill", "/member/a", Some("/member/c")),
            bill("H.R.2", "Second Bill", "/member/b", None),
            bill("H.R.3", "Third Bill", "/member/a", None),
        ];
        QueryEngine::new(
            Arc::new(crate::corpus::Corpus::from_records(
                bills,
                reps,
                Vec::new(),
                Vec::new(),
            )),
            true,
        )
    }

    #[test]
    fn unknown_group_is_an_explicit_error() {
        let engine = fixture_engine();
        assert!(matches!(
            engine.search("senators", "name", "x"),
            Err(PipelineError::QueryGroup { .. })
        ));
    }

    #[test]
    fn unknown_key_is_an_explicit_error() {
        let engine = fixture_engine();
        assert!(matches!(
            engine.search("reps", "haircut", "bald"),
            Err(PipelineError::QueryKey { .. })
        ));
    }

    #[test]
    fn set_algebra_composes_and_filters() {
        let engine = fixture_engine();

        let democrats = engine.search("reps", "party", "Democratic").unwrap();
        let new_york = engine.search("reps", "state", "New York").unwrap();
        assert_eq!(democrats.len(), 3);
        assert_eq!(new_york.len(), 3);

        let ny_democrats: HashSet<_> = democrats.intersection(&new_york).copied().collect();
        assert_eq!(ny_democrats.len(), 2);

        let republicans = engine.search("reps", "party", "Republican").unwrap();
        let either: HashSet<_> = democrats.union(&republicans).copied().collect();
        assert_eq!(either.len(), 5);
    }

    #[test]
    fn name_queries_use_subsequence_matching() {
        let engine = fixture_engine();
        let hits = engine.search("reps", "name", "Evans").unwrap();
        assert_eq!(hits.len(), 1);
        let hits = engine.search("reps", "name", "Dwight").unwrap();
        assert_eq!(hits.len(), 1);
        // reversed order fails the subsequence test
        let hits = engine.search("reps", "name", "Evans Dwight").unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn search_is_deterministic_with_and_without_memo() {
        let memoized = fixture_engine();
        let first = memoized.search("reps", "party", "Democratic").unwrap();
        let second = memoized.search("reps", "party", "Democratic").unwrap();
        assert_eq!(first, second);

        let cold = QueryEngine::new(Arc::clone(&memoized.corpus), false);
        let third = cold.search("reps", "party", "Democratic").unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn sponsor_joins_reuse_the_bill_index() {
        let engine = fixture_engine();
        let sponsor_url = "https://www.congress.gov/member/a";

        let direct = engine.search("bills", "sponsor url", sponsor_url).unwrap();
        assert_eq!(direct.len(), 2);

        // the cross-entity derived query returns the same bill set
        let derived = engine.search("reps", "sponsor", sponsor_url).unwrap();
        assert_eq!(direct, derived);
        assert!(derived.iter().all(|id| matches!(id, EntityId::Bill(_))));

        let cosponsored = engine
            .search("reps", "cosponsor", "https://www.congress.gov/member/c")
            .unwrap();
        assert_eq!(cosponsored.len(), 1);
    }

    #[test]
    fn distinct_value_types_do_not_collide_in_the_memo() {
        let engine = fixture_engine();
        let by_int = engine.search("reps", "district", 3_u32).unwrap();
        let by_text = engine.search("reps", "district", "3").unwrap();
        assert_eq!(by_int, by_text);
        assert_eq!(by_int.len(), 2);
    }
}
