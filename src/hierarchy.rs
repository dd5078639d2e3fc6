use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::persist::write_atomically;

/// A suite as exported in the tracker's flat suite list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suite {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_suite: Option<SuiteRef>,
}

/// `{id, name}` reference to a suite; also one entry of an ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteRef {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// Suite list document: `{"value": [...]}`.
#[derive(Debug, Deserialize)]
pub struct SuiteList {
    #[serde(default)]
    pub value: Vec<Suite>,
}

/// Ancestors of a suite, nearest parent first.
pub type AncestorChain = Vec<SuiteRef>;

/// Suite id → ancestor chain for every suite of a test plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HierarchyMap(BTreeMap<u64, AncestorChain>);

impl HierarchyMap {
    pub fn get(&self, suite_id: u64) -> Option<&AncestorChain> {
        self.0.get(&suite_id)
    }

    /// Distinct suite ids in ascending order.
    pub fn suite_ids(&self) -> Vec<u64> {
        self.0.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of suites that have at least one ancestor.
    pub fn with_parents(&self) -> usize {
        self.0.values().filter(|chain| !chain.is_empty()).count()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        write_atomically(path, contents.as_bytes())
    }
}

/// Reads a suite list document from disk.
pub fn load_suites(path: &Path) -> Result<Vec<Suite>> {
    let contents = fs::read_to_string(path)?;
    let list: SuiteList = serde_json::from_str(&contents)?;
    Ok(list.value)
}

/// Builds the ancestor chain of every suite in `suites`.
///
/// The root maps to an empty chain. Chains end early on a suite without a
/// parent, on a parent id missing from the list, or when a cycle is hit;
/// none of these is an error.
pub fn build_hierarchy_map(suites: &[Suite], root_id: u64) -> HierarchyMap {
    let lookup = index_suites(suites);

    let map: BTreeMap<u64, AncestorChain> = lookup
        .keys()
        .map(|&suite_id| {
            let chain = if suite_id == root_id {
                Vec::new()
            } else {
                ancestor_chain(suite_id, &lookup, root_id)
            };
            (suite_id, chain)
        })
        .collect();

    info!(
        "Resolved hierarchy for {} suites (root {root_id})",
        map.len()
    );

    HierarchyMap(map)
}

/// Id → suite lookup. Ids of zero are not addressable and are skipped; for a
/// duplicated id the entry with the lexicographically smallest name wins, so
/// the result does not depend on list order.
fn index_suites(suites: &[Suite]) -> HashMap<u64, &Suite> {
    let mut lookup: HashMap<u64, &Suite> = HashMap::new();
    for suite in suites.iter().filter(|s| s.id != 0) {
        lookup
            .entry(suite.id)
            .and_modify(|existing| {
                if suite.name < existing.name {
                    *existing = suite;
                }
            })
            .or_insert(suite);
    }
    lookup
}

fn ancestor_chain(suite_id: u64, lookup: &HashMap<u64, &Suite>, root_id: u64) -> AncestorChain {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current_id = suite_id;

    while current_id != root_id {
        if !visited.insert(current_id) {
            debug!("Cycle detected while resolving suite {suite_id} at suite {current_id}");
            break;
        }

        let Some(parent) = lookup
            .get(&current_id)
            .and_then(|suite| suite.parent_suite.as_ref())
            .filter(|parent| parent.id != 0)
        else {
            break;
        };

        chain.push(parent.clone());
        current_id = parent.id;
    }

    if current_id == root_id && chain.last().map_or(true, |last| last.id != root_id) {
        if let Some(root) = lookup.get(&root_id) {
            chain.push(SuiteRef {
                id: root_id,
                name: root.name.clone(),
            });
        }
    }

    chain
}
