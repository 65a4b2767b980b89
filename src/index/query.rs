//! Read-only queries over the index: per-gene lookup, multi-gene AND, and
//! marker-gene mining.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::mining::{FpGrowth, FrequentPatternMiner, Pattern, Transaction};

use super::{sorted_relations, CellTypeId, IndexStore};

/// A frequent gene set scored against the index.
///
/// The score combines the rarity of the set's genes across the whole
/// database with the support of their co-expression, normalized by the
/// idf mass of the cell types carrying the full set.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGene {
    /// Genes of the set, sorted by name.
    pub genes: Vec<String>,
    /// Number of (cell, cell-type) atoms expressing the whole set.
    pub support: usize,
    /// TF-IDF style relevance of the set.
    pub score: f64,
    /// Number of cell types in which every gene of the set has a posting.
    pub cell_types: usize,
}

impl IndexStore {
    /// Decodes every posting of each requested gene.
    ///
    /// The result maps gene name to cell-type label to expressing-cell
    /// ordinals. Genes absent from the index are omitted with a warning;
    /// they never appear as keys.
    pub fn query_genes(&self, genes: &[&str]) -> BTreeMap<String, BTreeMap<String, Vec<u32>>> {
        let mut out = BTreeMap::new();
        for &gene in genes {
            let Some(relations) = self.metadata.get(gene) else {
                warn!(gene = %gene, "gene not found in the index");
                continue;
            };
            let mut decoded = BTreeMap::new();
            for (ct, pid) in sorted_relations(relations) {
                decoded.insert(
                    self.cell_type_name(ct).to_string(),
                    self.posting(pid).decode(),
                );
            }
            out.insert(gene.to_string(), decoded);
        }
        out
    }

    /// Finds the cell types in which *all* requested genes are expressed,
    /// with the ordinal-wise intersection of their postings.
    ///
    /// Cell types missing a posting for any requested gene are skipped,
    /// and so are empty intersections. Unknown genes are ignored with a
    /// warning; duplicates in the request count once.
    pub fn find_cell_types(&self, genes: &[&str]) -> BTreeMap<String, Vec<u32>> {
        let requested = self.known_genes(genes);
        if requested.is_empty() {
            return BTreeMap::new();
        }

        let mut out = BTreeMap::new();
        for ct in self.shared_cell_types(&requested) {
            let mut cells = self.posting(self.metadata[requested[0]][&ct]).decode();
            for &gene in &requested[1..] {
                cells = intersect_sorted(&cells, &self.posting(self.metadata[gene][&ct]).decode());
                if cells.is_empty() {
                    break;
                }
            }
            if !cells.is_empty() {
                out.insert(self.cell_type_name(ct).to_string(), cells);
            }
        }
        out
    }

    /// Mines frequently co-expressed subsets of the candidate genes with
    /// the built-in FP-growth miner and scores them against the index.
    ///
    /// See [`Self::find_marker_genes_with`] for the mining contract.
    pub fn find_marker_genes(&self, genes: &[&str], min_support: usize) -> Vec<MarkerGene> {
        self.find_marker_genes_with(&FpGrowth, genes, min_support)
    }

    /// Mines marker-gene sets with a caller-provided pattern miner.
    ///
    /// Every cell expressing at least one candidate gene contributes one
    /// transaction labelled by its (ordinal, cell-type entry) pair — the
    /// cell-type component keeps ordinals from colliding across slices.
    /// Each itemset the miner returns with support at least `min_support`
    /// is scored and emitted, ordered by decreasing score.
    pub fn find_marker_genes_with<M>(
        &self,
        miner: &M,
        genes: &[&str],
        min_support: usize,
    ) -> Vec<MarkerGene>
    where
        M: FrequentPatternMiner,
    {
        let transactions = self.build_transactions(genes);
        debug!(
            transactions = transactions.len(),
            "collected co-expression transactions"
        );

        let patterns = miner.mine(&transactions, min_support);
        let mut markers: Vec<MarkerGene> =
            patterns.into_iter().map(|p| self.score_pattern(p)).collect();
        markers.sort_by(|a, b| b.score.total_cmp(&a.score));
        markers
    }

    /// One transaction per (ordinal, cell-type entry) atom expressing any
    /// of the candidate genes.
    fn build_transactions(&self, genes: &[&str]) -> Vec<Transaction> {
        let requested = self.known_genes(genes);
        let mut atoms: HashMap<(u32, CellTypeId), Transaction> = HashMap::new();
        for &gene in &requested {
            for (&ct, &pid) in &self.metadata[gene] {
                for ordinal in self.posting(pid).decode() {
                    atoms.entry((ordinal, ct)).or_default().push(gene.to_string());
                }
            }
        }
        atoms.into_values().collect()
    }

    fn score_pattern(&self, pattern: Pattern) -> MarkerGene {
        let Pattern { items, support } = pattern;

        let mut score = (self.total_cells as f64).ln() * items.len() as f64;
        for gene in &items {
            score -= (self.gene_counts[gene] as f64).ln();
        }
        score *= (support as f64).ln();

        let shared = self.shared_cell_types(&items.iter().map(String::as_str).collect::<Vec<_>>());
        let mut idf_mass = 0.0;
        for gene in &items {
            let relations = &self.metadata[gene];
            for ct in &shared {
                idf_mass += self.posting(relations[ct]).idf();
            }
        }
        score /= idf_mass;

        MarkerGene {
            genes: items,
            support,
            score,
            cell_types: shared.len(),
        }
    }

    /// Filters the request down to indexed genes, warning on misses and
    /// dropping duplicates.
    fn known_genes<'a>(&self, genes: &[&'a str]) -> Vec<&'a str> {
        let mut known = Vec::with_capacity(genes.len());
        for &gene in genes {
            if known.contains(&gene) {
                continue;
            }
            if self.metadata.contains_key(gene) {
                known.push(gene);
            } else {
                warn!(gene = %gene, "gene ignored, not found in the index");
            }
        }
        known
    }

    /// Cell-type entries holding a posting for every one of `genes`.
    fn shared_cell_types(&self, genes: &[&str]) -> Vec<CellTypeId> {
        let mut counts: HashMap<CellTypeId, usize> = HashMap::new();
        for &gene in genes {
            for &ct in self.metadata[gene].keys() {
                *counts.entry(ct).or_insert(0) += 1;
            }
        }
        let mut shared: Vec<CellTypeId> = counts
            .into_iter()
            .filter(|&(_, count)| count == genes.len())
            .map(|(ct, _)| ct)
            .collect();
        shared.sort_unstable();
        shared
    }
}

/// Intersects two sorted ordinal lists, preserving order.
fn intersect_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}
