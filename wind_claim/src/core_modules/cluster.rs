// THEORY:
// The duplicate clusterer collapses photos of the same view into a single
// representative before anything is sent to the vision service. Adjusters
// routinely receive the same shot several times (re-uploads, bursts, resized
// copies), and counting each copy would skew the per-area statistics.
//
// Key principles:
// 1.  **Grouping**: photos are grouped by their perceptual `Fingerprint`. The
//     default `ClusterMode::Exact` groups on exact fingerprint equality only;
//     two fingerprints one bit apart land in different clusters.
//     `ClusterMode::Tolerant` joins any two photos whose fingerprints are
//     within `max_distance` bits (union-find over all pairs), so chains of
//     near-duplicates merge into one cluster.
// 2.  **Representative**: the member with the highest quality score. On a tie
//     the first-discovered member stays representative.
// 3.  **Ordering**: clusters come out in the order their first member was
//     encountered in the input; members keep input order.
// 4.  **Ownership**: representatives are handed back as owned records; the
//     other members are dropped after their summary is copied into the
//     `Cluster`.

use crate::core_modules::fingerprint::Fingerprint;
use crate::core_modules::image_record::ImageRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hamming distance used by `ClusterMode::tolerant()`.
pub const DEFAULT_HAMMING_TOLERANCE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClusterMode {
    /// Group on exact fingerprint equality.
    #[default]
    Exact,
    /// Group fingerprints within `max_distance` differing bits, transitively.
    Tolerant { max_distance: u32 },
}

impl ClusterMode {
    pub fn tolerant() -> Self {
        ClusterMode::Tolerant {
            max_distance: DEFAULT_HAMMING_TOLERANCE,
        }
    }
}

/// The summary of one photo kept inside a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterMember {
    pub source_url: String,
    pub quality_score: f64,
    pub fingerprint: Fingerprint,
}

/// A set of photos judged visually equivalent.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Members in discovery order; never empty.
    pub members: Vec<ClusterMember>,
    /// Index into `members` of the representative.
    pub representative: usize,
}

impl Cluster {
    pub fn representative(&self) -> &ClusterMember {
        &self.members[self.representative]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Output of the clusterer.
#[derive(Debug, Default)]
pub struct Deduplicated {
    /// One record per cluster, in cluster order.
    pub representatives: Vec<ImageRecord>,
    pub clusters: Vec<Cluster>,
}

/// Groups `records` into clusters and selects one representative per cluster.
pub fn cluster(mut records: Vec<ImageRecord>, mode: ClusterMode) -> Deduplicated {
    let fingerprints: Vec<Fingerprint> = records.iter_mut().map(|r| r.fingerprint()).collect();

    let groups = match mode {
        ClusterMode::Exact => exact_groups(&fingerprints),
        ClusterMode::Tolerant { max_distance } => tolerant_groups(&fingerprints, max_distance),
    };

    let mut slots: Vec<Option<ImageRecord>> = records.into_iter().map(Some).collect();
    let mut deduplicated = Deduplicated::default();

    for group in groups {
        let members: Vec<ClusterMember> = group
            .iter()
            .filter_map(|&i| {
                slots[i].as_ref().map(|record| ClusterMember {
                    source_url: record.source_url.clone(),
                    quality_score: record.quality_score(),
                    fingerprint: fingerprints[i],
                })
            })
            .collect();

        let representative = best_member(&members);
        if let Some(record) = slots[group[representative]].take() {
            deduplicated.representatives.push(record);
        }
        deduplicated.clusters.push(Cluster {
            members,
            representative,
        });
    }

    deduplicated
}

/// Index of the highest-quality member; the earliest wins a tie.
fn best_member(members: &[ClusterMember]) -> usize {
    let mut best = 0;
    for (i, member) in members.iter().enumerate().skip(1) {
        if member.quality_score > members[best].quality_score {
            best = i;
        }
    }
    best
}

fn exact_groups(fingerprints: &[Fingerprint]) -> Vec<Vec<usize>> {
    let mut group_of: HashMap<Fingerprint, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (i, fp) in fingerprints.iter().enumerate() {
        match group_of.get(fp) {
            Some(&g) => groups[g].push(i),
            None => {
                group_of.insert(*fp, groups.len());
                groups.push(vec![i]);
            }
        }
    }

    groups
}

fn tolerant_groups(fingerprints: &[Fingerprint], max_distance: u32) -> Vec<Vec<usize>> {
    let mut sets = DisjointSet::new(fingerprints.len());
    for i in 0..fingerprints.len() {
        for j in (i + 1)..fingerprints.len() {
            if fingerprints[i].hamming_distance(&fingerprints[j]) <= max_distance {
                sets.union(i, j);
            }
        }
    }

    let mut group_of: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in 0..fingerprints.len() {
        let root = sets.find(i);
        match group_of.get(&root) {
            Some(&g) => groups[g].push(i),
            None => {
                group_of.insert(root, groups.len());
                groups.push(vec![i]);
            }
        }
    }

    groups
}

/// Union-find keyed by input index. The smaller index always becomes the
/// root, so roots are stable regardless of union order.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression.
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[high] = low;
        }
    }
}
