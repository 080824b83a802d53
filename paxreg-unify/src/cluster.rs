//! Duplicate-cluster merge over the persisted registry
//!
//! Rows are linked when they share a travel document, share a loyalty
//! number, or agree on last name and birth date with compatible first names.
//! Each connected component collapses into its lowest PersonID.
//!
//! A merged row can link to rows it was not connected to before (its longest
//! first name may now equal a neighbour's), so partitioning repeats over the
//! merged in-memory state until no component has two members. Only the net
//! result is written, in one transaction.

use paxreg_common::db::{
    delete_persons, load_persons, split_tokens, update_person, Person, PersonRecord, RegistryStore,
};
use paxreg_common::normalize::{is_placeholder, normalize_name, normalize_token};
use paxreg_common::{Result, ScalarField, SetField};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;
use tracing::{debug, info};

/// Disjoint-set forest over row positions
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Root of `x`, compressing the path behind it
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Join the sets of `a` and `b`; false if they were already joined
    ///
    /// The lower-ranked root goes under the other; equal ranks put the
    /// higher position under the lower one.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }

        let (root, child) = match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Greater => (ra, rb),
            std::cmp::Ordering::Less => (rb, ra),
            std::cmp::Ordering::Equal => {
                let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
                self.rank[root] += 1;
                (root, child)
            }
        };
        self.parent[child] = root;
        true
    }

    /// All sets, each sorted, ordered by their smallest member
    pub fn components(&mut self) -> Vec<Vec<usize>> {
        let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
        for x in 0..self.len() {
            let root = self.find(x);
            by_root.entry(root).or_default().push(x);
        }

        let mut components: Vec<Vec<usize>> = by_root.into_values().collect();
        components.sort_by_key(|c| c[0]);
        components
    }
}

/// Connected components of `persons` under the three matching rules
///
/// Returned as positions into `persons`.
pub fn partition(persons: &[Person]) -> Vec<Vec<usize>> {
    let mut uf = UnionFind::new(persons.len());

    link_shared_tokens(&mut uf, persons, SetField::TravelDocuments);
    link_shared_tokens(&mut uf, persons, SetField::LoyaltyNumbers);
    link_name_and_birth(&mut uf, persons);

    uf.components()
}

fn link_shared_tokens(uf: &mut UnionFind, persons: &[Person], field: SetField) {
    let mut first_holder: HashMap<String, usize> = HashMap::new();
    for (pos, person) in persons.iter().enumerate() {
        for token in person.record.tokens(field) {
            let token = field.normalize_identifier(token);
            if token.is_empty() {
                continue;
            }
            match first_holder.get(&token) {
                Some(&holder) => {
                    uf.union(holder, pos);
                }
                None => {
                    first_holder.insert(token, pos);
                }
            }
        }
    }
}

/// Same non-empty (last name, birth date) and first names equal or one blank
fn link_name_and_birth(uf: &mut UnionFind, persons: &[Person]) {
    let mut groups: HashMap<(String, String), Vec<(usize, String)>> = HashMap::new();
    for (pos, person) in persons.iter().enumerate() {
        let last = normalize_name(person.record.scalar(ScalarField::LastName));
        let birth = normalize_token(person.record.scalar(ScalarField::BirthDate)).unwrap_or_default();
        if last.is_empty() || birth.is_empty() {
            continue;
        }
        let first = normalize_name(person.record.scalar(ScalarField::FirstName));
        groups.entry((last, birth)).or_default().push((pos, first));
    }

    for members in groups.values() {
        let mut by_first: HashMap<&str, usize> = HashMap::new();
        let mut blanks: Vec<usize> = Vec::new();

        for (pos, first) in members {
            if first.is_empty() {
                blanks.push(*pos);
                continue;
            }
            match by_first.get(first.as_str()) {
                Some(&holder) => {
                    uf.union(holder, *pos);
                }
                None => {
                    by_first.insert(first, *pos);
                }
            }
        }

        // A blank first name matches every row of the group
        if let Some((&anchor, rest)) = blanks.split_first() {
            for &pos in rest {
                uf.union(anchor, pos);
            }
            for &holder in by_first.values() {
                uf.union(anchor, holder);
            }
        }
    }
}

/// Collapse a cluster's rows into one record
///
/// `members` must be in PersonID order. Scalars take the longest non-empty
/// candidate, the earliest member winning ties. Sets take the union of
/// re-normalized tokens.
pub fn merge_records(members: &[&PersonRecord]) -> PersonRecord {
    let mut merged = PersonRecord::default();

    for field in ScalarField::ALL {
        let mut best = "";
        for record in members {
            let candidate = record.scalar(field).trim();
            if candidate.is_empty() || is_placeholder(candidate) {
                continue;
            }
            if candidate.chars().count() > best.chars().count() {
                best = candidate;
            }
        }
        merged.set_scalar(field, best);
    }

    for field in SetField::ALL {
        let mut union = BTreeSet::new();
        for record in members {
            union.extend(split_tokens(record.set(field)).filter_map(|t| clean_token(field, t)));
        }
        merged.set_set(field, union.into_iter().collect::<Vec<_>>().join(","));
    }

    merged
}

fn clean_token(field: SetField, token: &str) -> Option<String> {
    if field.is_identifier() {
        Some(field.normalize_identifier(token)).filter(|t| !t.is_empty())
    } else {
        normalize_token(token)
    }
}

/// Net writes needed to bring a registry to its merge fixed point
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// Survivor rows with their merged content
    pub updates: Vec<Person>,
    /// Rows absorbed into a survivor
    pub deletes: Vec<i64>,
    /// Partition rounds that found at least one cluster
    pub passes: usize,
}

impl MergePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Compute the merge plan for a set of persisted rows
pub fn plan_merge(mut persons: Vec<Person>) -> MergePlan {
    persons.sort_by_key(|p| p.person_id);
    // Row ids folded into each current row, survivor excluded
    let mut absorbed: Vec<Vec<i64>> = vec![Vec::new(); persons.len()];
    let mut passes = 0;

    loop {
        let components = partition(&persons);
        if components.iter().all(|c| c.len() < 2) {
            break;
        }
        passes += 1;

        let mut next_persons = Vec::with_capacity(components.len());
        let mut next_absorbed = Vec::with_capacity(components.len());
        for component in components {
            // Components are sorted, so the first position holds the lowest id
            let survivor = persons[component[0]].person_id;
            let mut folded = Vec::new();
            for &pos in &component {
                folded.extend(absorbed[pos].iter().copied());
                if pos != component[0] {
                    folded.push(persons[pos].person_id);
                }
            }

            let record = if component.len() == 1 {
                persons[component[0]].record.clone()
            } else {
                let members: Vec<&PersonRecord> =
                    component.iter().map(|&pos| &persons[pos].record).collect();
                merge_records(&members)
            };

            next_persons.push(Person {
                person_id: survivor,
                record,
            });
            next_absorbed.push(folded);
        }

        debug!(
            "Merge pass {}: {} rows -> {} rows",
            passes,
            persons.len(),
            next_persons.len()
        );
        persons = next_persons;
        absorbed = next_absorbed;
    }

    let mut plan = MergePlan {
        passes,
        ..Default::default()
    };
    for (person, folded) in persons.into_iter().zip(absorbed) {
        if folded.is_empty() {
            continue;
        }
        plan.deletes.extend(folded);
        plan.updates.push(person);
    }
    plan.deletes.sort_unstable();
    plan
}

/// Outcome of one merge run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub clusters_merged: usize,
    pub rows_deleted: usize,
    pub passes: usize,
    pub vacuumed: bool,
    pub duration_ms: u128,
}

/// Second-pass duplicate merge over the whole Person table
#[derive(Debug, Clone)]
pub struct ClusterMerger {
    vacuum: bool,
}

impl Default for ClusterMerger {
    fn default() -> Self {
        Self { vacuum: true }
    }
}

impl ClusterMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether to VACUUM after a merge that deleted rows
    pub fn with_vacuum(mut self, vacuum: bool) -> Self {
        self.vacuum = vacuum;
        self
    }

    /// Merge every duplicate cluster in the store
    ///
    /// Reading, updates and deletes share one transaction; any failure
    /// drops it and leaves the store as it was.
    pub async fn run(&self, store: &RegistryStore) -> Result<MergeReport> {
        let start = Instant::now();
        let mut tx = store.begin().await?;

        let persons = load_persons(&mut tx).await?;
        let rows_before = persons.len();
        info!("Merging duplicate clusters over {} persons", rows_before);

        let plan = plan_merge(persons);
        let mut report = MergeReport {
            rows_before,
            rows_after: rows_before - plan.deletes.len(),
            clusters_merged: plan.updates.len(),
            rows_deleted: plan.deletes.len(),
            passes: plan.passes,
            ..Default::default()
        };

        if plan.is_empty() {
            drop(tx);
            report.duration_ms = start.elapsed().as_millis();
            info!("No duplicate clusters found");
            return Ok(report);
        }

        for survivor in &plan.updates {
            update_person(&mut tx, survivor).await?;
        }
        delete_persons(&mut tx, &plan.deletes).await?;
        RegistryStore::commit(tx).await?;

        if self.vacuum {
            store.vacuum().await?;
            report.vacuumed = true;
        }

        report.duration_ms = start.elapsed().as_millis();
        info!(
            "Merged {} clusters: {} -> {} persons in {} passes ({}ms)",
            report.clusters_merged,
            report.rows_before,
            report.rows_after,
            report.passes,
            report.duration_ms
        );
        Ok(report)
    }
}
