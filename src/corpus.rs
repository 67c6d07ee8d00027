//! # Corpus Module
//!
//! ## Purpose
//! Loads every persisted entity document into memory at startup and owns
//! the full record set for the process lifetime. After `load_all` returns,
//! the corpus is read-only: refreshes rebuild a new corpus rather than
//! mutating this one, which keeps the query layer lock-free.
//!
//! ## Input/Output Specification
//! - **Input**: per-entity `json/` directories of persisted documents
//! - **Output**: per-type ordered collections plus derived indices
//!   (reps by name/state/party, bills and votes by source URL)
//! - **Failure policy**: one malformed document aborts the whole load;
//!   the config-gated `skip_malformed` relaxation logs each skip
//!
//! Collection order is filesystem enumeration order and is not guaranteed
//! stable across platforms; queries return sets and must not depend on it.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::{CorpusConfig, DataConfig, EntityKind};
use crate::entities::session::{ActionItemRef, ActionKind};
use crate::entities::{Bill, Representative, Session, Vote};
use crate::errors::Result;

/// The full in-memory record set for one process lifetime
#[derive(Debug)]
pub struct Corpus {
    bills: Vec<Bill>,
    reps: Vec<Representative>,
    votes: Vec<Vote>,
    sessions: Vec<Session>,

    reps_by_name: HashMap<String, usize>,
    reps_by_state: HashMap<String, Vec<usize>>,
    reps_by_party: HashMap<String, Vec<usize>>,
    bills_by_url: HashMap<String, usize>,
    votes_by_url: HashMap<String, usize>,
}

/// What a floor action's lazy reference resolves to
#[derive(Debug)]
pub enum ResolvedItem<'a> {
    Vote(&'a Vote),
    Bill(&'a Bill),
}

impl Corpus {
    /// Load every persisted document under the configured data tree
    pub fn load_all(data: &DataConfig, config: &CorpusConfig) -> Result<Self> {
        if config.skip_malformed {
            warn!("corpus load will skip malformed documents instead of failing fast");
        }

        let bills = load_dir(&data.json_dir(EntityKind::Bill), config.skip_malformed)?;
        let reps = load_dir(&data.json_dir(EntityKind::Representative), config.skip_malformed)?;
        let votes = load_dir(&data.json_dir(EntityKind::Vote), config.skip_malformed)?;
        let sessions = load_dir(&data.json_dir(EntityKind::Session), config.skip_malformed)?;

        let corpus = Self::from_records(bills, reps, votes, sessions);
        info!(
            bills = corpus.bills.len(),
            reps = corpus.reps.len(),
            votes = corpus.votes.len(),
            sessions = corpus.sessions.len(),
            "corpus loaded"
        );
        Ok(corpus)
    }

    /// Assemble a corpus from already-built records and derive the indices
    pub fn from_records(
        bills: Vec<Bill>,
        reps: Vec<Representative>,
        votes: Vec<Vote>,
        sessions: Vec<Session>,
    ) -> Self {
        let mut reps_by_name = HashMap::new();
        let mut reps_by_state: HashMap<String, Vec<usize>> = HashMap::new();
        let mut reps_by_party: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, rep) in reps.iter().enumerate() {
            reps_by_name.insert(rep.basics.name.clone(), idx);
            if let Some(state) = rep.current_state() {
                reps_by_state.entry(state.to_string()).or_default().push(idx);
            }
            if let Some(party) = rep.current_party() {
                reps_by_party.entry(party).or_default().push(idx);
            }
        }

        let bills_by_url = bills
            .iter()
            .enumerate()
            .map(|(idx, bill)| (bill.sources.url.clone(), idx))
            .collect();
        let votes_by_url = votes
            .iter()
            .enumerate()
            .map(|(idx, vote)| (vote.sources.url.clone(), idx))
            .collect();

        Self {
            bills,
            reps,
            votes,
            sessions,
            reps_by_name,
            reps_by_state,
            reps_by_party,
            bills_by_url,
            votes_by_url,
        }
    }

    pub fn bills(&self) -> &[Bill] {
        &self.bills
    }

    pub fn reps(&self) -> &[Representative] {
        &self.reps
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn bill(&self, idx: usize) -> Option<&Bill> {
        self.bills.get(idx)
    }

    pub fn rep(&self, idx: usize) -> Option<&Representative> {
        self.reps.get(idx)
    }

    pub fn vote(&self, idx: usize) -> Option<&Vote> {
        self.votes.get(idx)
    }

    /// Exact-name member lookup
    pub fn lookup_rep(&self, name: &str) -> Option<&Representative> {
        self.reps_by_name.get(name).map(|&idx| &self.reps[idx])
    }

    /// Members holding a seat in the given state
    pub fn reps_in_state(&self, state: &str) -> Vec<&Representative> {
        self.reps_by_state
            .get(state)
            .map(|idxs| idxs.iter().map(|&i| &self.reps[i]).collect())
            .unwrap_or_default()
    }

    /// Members currently affiliated with the given party
    pub fn reps_in_party(&self, party: &str) -> Vec<&Representative> {
        self.reps_by_party
            .get(party)
            .map(|idxs| idxs.iter().map(|&i| &self.reps[i]).collect())
            .unwrap_or_default()
    }

    pub fn find_bill_by_url(&self, url: &str) -> Option<&Bill> {
        self.bills_by_url.get(url).map(|&idx| &self.bills[idx])
    }

    pub fn find_vote_by_url(&self, url: &str) -> Option<&Vote> {
        self.votes_by_url.get(url).map(|&idx| &self.votes[idx])
    }

    /// Resolve a floor action's lazy reference against the loaded records.
    /// Returns `None` for untyped items and for referenced documents not
    /// yet scraped.
    pub fn resolve_action(&self, item: &ActionItemRef) -> Option<ResolvedItem<'_>> {
        let url = item.url.as_deref()?;
        match item.kind? {
            ActionKind::Vote => self.find_vote_by_url(url).map(ResolvedItem::Vote),
            ActionKind::Bill => self.find_bill_by_url(url).map(ResolvedItem::Bill),
        }
    }

    /// Distinct sponsor and cosponsor URLs across loaded bills — the work
    /// list for a representative scrape pass
    pub fn sponsor_urls(&self) -> BTreeSet<String> {
        let mut urls = BTreeSet::new();
        for bill in &self.bills {
            urls.insert(bill.overview.sponsor.url.clone());
            for cosponsor in &bill.cosponsors {
                urls.insert(cosponsor.representative.url.clone());
            }
        }
        urls
    }
}

/// Enumerate and deserialize one entity directory. A missing directory is
/// an empty collection, not an error.
fn load_dir<T: DeserializeOwned + Send>(dir: &Path, skip_malformed: bool) -> Result<Vec<T>> {
    if !dir.exists() {
        debug!(?dir, "no documents directory, loading nothing");
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }

    debug!(?dir, count = paths.len(), "loading documents");
    if skip_malformed {
        Ok(paths
            .par_iter()
            .filter_map(|path| match crate::entities::read_json(path) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(?path, error = %e, "skipping malformed document");
                    None
                }
            })
            .collect())
    } else {
        paths
            .par_iter()
            .map(|path| crate::entities::read_json(path))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use std::path::PathBuf;

    fn bill_html(number: &str, name: &str, sponsor: &str) -> String {
        format!(
            r#"<html><body>
<h1 class="legDetail">{number} - {name}<span> 116th Congress (2019-2020)</span></h1>
<div class="overview"><table><tbody>
<tr><th>Sponsor:</th><td><a href="{sponsor}">Rep. Someone [D-PA-1]</a> (Introduced 01/24/2019)</td></tr>
</tbody></table></div>
</body></html>"#
        )
    }

    fn rep_html(name: &str, party: &str, state: &str) -> String {
        format!(
            r#"<html><body>
<h1 class="legDetail">Representative {name}<span> (1954 - )</span></h1>
<div class="overview-member-column-profile"><table><tbody>
<tr><th>Party:</th><td>{party}</td></tr>
</tbody></table></div>
<table class="member-positions"><tbody>
<tr><td>House</td><td>{state}</td><td>2</td><td>2016 - Present</td><td>114th</td></tr>
</tbody></table>
</body></html>"#
        )
    }

    fn seeded_data_dir() -> (tempfile::TempDir, DataConfig) {
        let dir = tempfile::tempdir().unwrap();
        let data = DataConfig {
            root_dir: dir.path().to_path_buf(),
        };

        let cache = PathBuf::from("/tmp/web");
        let mut bill = crate::entities::Bill::from_html(
            "https://www.congress.gov/bill/116th-congress/house-bill/1",
            &bill_html("H.R.1", "For the People Act", "/member/a/A000001"),
            &cache,
            "https://www.congress.gov",
        )
        .unwrap();
        bill.save(&data.json_dir(crate::config::EntityKind::Bill))
            .unwrap();

        let mut rep = crate::entities::Representative::from_html(
            "https://www.congress.gov/member/dwight-evans/E000296",
            &rep_html("Dwight Evans", "Democratic", "Pennsylvania"),
            &cache,
        )
        .unwrap();
        rep.save(&data.json_dir(crate::config::EntityKind::Representative))
            .unwrap();

        (dir, data)
    }

    #[test]
    fn load_all_collects_every_entity_directory() {
        let (_dir, data) = seeded_data_dir();
        let corpus = Corpus::load_all(&data, &CorpusConfig::default()).unwrap();

        assert_eq!(corpus.bills().len(), 1);
        assert_eq!(corpus.reps().len(), 1);
        assert_eq!(corpus.votes().len(), 0);
        assert_eq!(corpus.sessions().len(), 0);

        assert!(corpus.lookup_rep("Dwight Evans").is_some());
        assert!(corpus.lookup_rep("Nobody").is_none());
        assert_eq!(corpus.reps_in_state("Pennsylvania").len(), 1);
        assert_eq!(corpus.reps_in_party("Democratic").len(), 1);
        assert!(corpus
            .find_bill_by_url("https://www.congress.gov/bill/116th-congress/house-bill/1")
            .is_some());
    }

    #[test]
    fn a_malformed_document_fails_the_load() {
        let (_dir, data) = seeded_data_dir();
        let bills_dir = data.json_dir(crate::config::EntityKind::Bill);
        std::fs::write(bills_dir.join("116_broken.json"), "{not json").unwrap();

        match Corpus::load_all(&data, &CorpusConfig::default()) {
            Err(crate::errors::PipelineError::CorruptDocument { path, .. }) => {
                assert!(path.contains("116_broken.json"))
            }
            other => panic!("expected CorruptDocument, got {other:?}"),
        }
    }

    #[test]
    fn skip_malformed_loads_the_rest() {
        let (_dir, data) = seeded_data_dir();
        let bills_dir = data.json_dir(crate::config::EntityKind::Bill);
        std::fs::write(bills_dir.join("116_broken.json"), "{not json").unwrap();

        let config = CorpusConfig {
            skip_malformed: true,
        };
        let corpus = Corpus::load_all(&data, &config).unwrap();
        assert_eq!(corpus.bills().len(), 1);
    }

    #[test]
    fn sponsor_urls_cover_sponsors_and_cosponsors() {
        let (_dir, data) = seeded_data_dir();
        let corpus = Corpus::load_all(&data, &CorpusConfig::default()).unwrap();
        let urls = corpus.sponsor_urls();
        assert!(urls.contains("https://www.congress.gov/member/a/A000001"));
    }

    #[test]
    fn lazy_action_refs_resolve_through_url_indices() {
        let (_dir, data) = seeded_data_dir();
        let corpus = Corpus::load_all(&data, &CorpusConfig::default()).unwrap();

        let item = ActionItemRef {
            title: "H.R. 1".to_string(),
            text: None,
            url: Some("https://www.congress.gov/bill/116th-congress/house-bill/1".to_string()),
            kind: Some(ActionKind::Bill),
        };
        assert!(matches!(
            corpus.resolve_action(&item),
            Some(ResolvedItem::Bill(_))
        ));

        let unscraped = ActionItemRef {
            url: Some("https://clerk.house.gov/evs/2019/roll999.xml".to_string()),
            kind: Some(ActionKind::Vote),
            ..item
        };
        assert!(corpus.resolve_action(&unscraped).is_none());
    }
}
