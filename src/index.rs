//! Two-level compressed index: gene → cell type → encoded posting.

pub mod query;

use std::collections::{BTreeMap, HashMap};
use std::mem::size_of;

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::matrix::{sparse_ids, ExpressionMatrix};
use crate::posting::PostingRecord;

/// Stable reference to an entry of the cell-type pool.
///
/// Identity is by pool entry, not by label value: two entries may carry
/// equal labels after a merge, and they keep separate postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellTypeId(u32);

/// Stable reference to a stored posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostingId(u32);

/// Append-only pool of cell-type labels.
///
/// Ingestion interns by value, so re-ingesting a label reuses its entry;
/// merging instead appends one fresh entry per source entry, preserving
/// pool-reference identity across databases.
#[derive(Debug, Default)]
struct CellTypePool {
    names: Vec<String>,
    interned: HashMap<String, CellTypeId>,
}

impl CellTypePool {
    fn intern(&mut self, name: &str) -> CellTypeId {
        if let Some(&id) = self.interned.get(name) {
            return id;
        }
        let id = CellTypeId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.interned.insert(name.to_string(), id);
        id
    }

    /// Appends a fresh entry without value deduplication. The label is
    /// registered for future interning only if it is new.
    fn append(&mut self, name: &str) -> CellTypeId {
        let id = CellTypeId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.interned.entry(name.to_string()).or_insert(id);
        id
    }

    fn name(&self, id: CellTypeId) -> &str {
        &self.names[id.0 as usize]
    }

    fn size_in_bytes(&self) -> usize {
        self.names.iter().map(String::len).sum()
    }
}

/// In-memory compressed index of single-cell gene expression.
///
/// For every (gene, cell-type) pair holding at least one expressing cell,
/// the store keeps one immutable [`PostingRecord`] in an append-only
/// container; a two-level map from gene name to [`CellTypeId`] relates the
/// records to the pool of cell-type labels by index, so the relations
/// survive container growth and merges.
///
/// Mutation is limited to whole-slice ingestion ([`Self::ingest_slice`])
/// and whole-database absorption ([`Self::merge`]); queries take `&self`.
///
/// # Examples
///
/// ```
/// use cellfind::{ExpressionMatrix, IndexStore};
///
/// let matrix = ExpressionMatrix::new(
///     vec!["CD3D".into(), "CD8A".into()],
///     4,
///     vec![
///         1.0, 2.0, 1.5, 0.0, // CD3D
///         0.0, 1.0, 2.0, 1.0, // CD8A
///     ],
/// )?;
///
/// let mut index = IndexStore::new();
/// index.ingest_slice("T cell", &matrix)?;
///
/// assert_eq!(index.db_size(), 2);
/// assert_eq!(index.genes(), vec!["CD3D", "CD8A"]);
///
/// let hits = index.find_cell_types(&["CD3D", "CD8A"]);
/// assert_eq!(hits["T cell"], vec![2, 3]);
/// # anyhow::Ok(())
/// ```
#[derive(Debug, Default)]
pub struct IndexStore {
    postings: Vec<PostingRecord>,
    metadata: BTreeMap<String, HashMap<CellTypeId, PostingId>>,
    cell_types: CellTypePool,
    gene_counts: BTreeMap<String, usize>,
    total_cells: usize,
    warnings: usize,
}

impl IndexStore {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests one slice: a cell-type label and the dense expression matrix
    /// of its cells.
    ///
    /// Every matrix row becomes one posting under `(gene, cell_type)`,
    /// built from the row's 1-based expressing ordinals. Rows without any
    /// expressing cell are counted in [`Self::warnings`] and skipped. The
    /// total-cell counter grows by the slice's column count regardless.
    ///
    /// # Errors
    ///
    /// An error is returned if `cell_type` is empty.
    pub fn ingest_slice(&mut self, cell_type: &str, matrix: &ExpressionMatrix) -> Result<()> {
        if cell_type.is_empty() {
            return Err(anyhow!("cell-type name must not be empty."));
        }
        let num_cells = matrix.num_cells();
        self.total_cells += num_cells;
        let ct = self.cell_types.intern(cell_type);

        for gene in matrix.gene_names() {
            self.gene_counts.entry(gene.clone()).or_insert(0);
        }

        for (row, gene) in matrix.gene_names().iter().enumerate() {
            let values = matrix.row(row);
            let ids = sparse_ids(values);
            if ids.is_empty() {
                self.warnings += 1;
                debug!(gene = %gene, cell_type = %cell_type, "row has no expressing cells, skipped");
                continue;
            }
            *self.gene_counts.get_mut(gene).unwrap() += ids.len();

            let posting = PostingRecord::encode(&ids, values, num_cells)?;
            let pid = PostingId(self.postings.len() as u32);
            self.postings.push(posting);
            self.metadata.entry(gene.clone()).or_default().insert(ct, pid);
        }
        Ok(())
    }

    /// Absorbs another index, consuming it.
    ///
    /// All source postings are copied into the local store first; only then
    /// are the gene relations rewritten through the id translations, so the
    /// receiver is never left pointing into the source. Each source
    /// cell-type entry becomes a fresh local pool entry: merging two
    /// databases that both ingested a slice labelled `"T"` yields two
    /// distinct cell-type entries under the shared genes.
    ///
    /// Total-cell and per-gene counters are summed, not deduplicated.
    pub fn merge(&mut self, other: IndexStore) {
        let IndexStore {
            postings,
            metadata,
            cell_types,
            gene_counts,
            total_cells,
            warnings: _,
        } = other;

        self.total_cells += total_cells;

        let posting_base = self.postings.len() as u32;
        self.postings.extend(postings);

        let ct_map: Vec<CellTypeId> = cell_types
            .names
            .iter()
            .map(|name| self.cell_types.append(name))
            .collect();

        let mut added = 0;
        for (gene, relations) in metadata {
            let bucket = self.metadata.entry(gene).or_default();
            for (ct_src, pid_src) in relations {
                bucket.insert(ct_map[ct_src.0 as usize], PostingId(posting_base + pid_src.0));
                added += 1;
            }
        }
        for (gene, count) in gene_counts {
            *self.gene_counts.entry(gene).or_insert(0) += count;
        }
        debug!(postings = added, "merged database");
    }

    /// Gets the indexed gene names, sorted.
    pub fn genes(&self) -> Vec<&str> {
        self.metadata.keys().map(String::as_str).collect()
    }

    /// Gets the number of stored postings.
    pub fn db_size(&self) -> usize {
        self.postings.len()
    }

    /// Checks if nothing has been ingested.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Decodes the `n`-th stored posting, in insertion order.
    ///
    /// An out-of-range index is answered with an empty list and a
    /// diagnostic, not an error.
    pub fn decode(&self, n: usize) -> Vec<u32> {
        match self.postings.get(n) {
            Some(posting) => posting.decode(),
            None => {
                tracing::warn!(
                    index = n,
                    db_size = self.postings.len(),
                    "invalid posting index"
                );
                Vec::new()
            }
        }
    }

    /// Gets the `n`-th indexed gene together with its decoded postings per
    /// cell-type label, or [`None`] if out of range.
    pub fn sample(&self, n: usize) -> Option<(&str, BTreeMap<&str, Vec<u32>>)> {
        let (gene, relations) = self.metadata.iter().nth(n)?;
        let mut decoded = BTreeMap::new();
        for (ct, pid) in sorted_relations(relations) {
            decoded.insert(self.cell_types.name(ct), self.posting(pid).decode());
        }
        Some((gene.as_str(), decoded))
    }

    /// Gets the total number of cells across all ingested slices and
    /// merged databases.
    pub const fn total_cells(&self) -> usize {
        self.total_cells
    }

    /// Gets the number of expressing cells recorded for `gene` across all
    /// cell types, or 0 for an unknown gene.
    pub fn gene_count(&self, gene: &str) -> usize {
        self.gene_counts.get(gene).copied().unwrap_or(0)
    }

    /// Gets the number of skipped rows accumulated by ingestion.
    pub const fn warnings(&self) -> usize {
        self.warnings
    }

    /// Estimates the heap bytes held by the encoded postings alone.
    pub fn posting_memory_footprint(&self) -> usize {
        self.postings.iter().map(PostingRecord::size_in_bytes).sum()
    }

    /// Estimates the heap bytes held by the whole index: postings plus the
    /// two-level map and the cell-type pool.
    pub fn memory_footprint(&self) -> usize {
        let mut bytes = self.posting_memory_footprint();
        for (gene, relations) in &self.metadata {
            bytes += gene.len() + relations.len() * size_of::<(CellTypeId, PostingId)>();
        }
        bytes + self.cell_types.size_in_bytes()
    }

    #[inline(always)]
    fn posting(&self, id: PostingId) -> &PostingRecord {
        &self.postings[id.0 as usize]
    }

    fn cell_type_name(&self, id: CellTypeId) -> &str {
        self.cell_types.name(id)
    }
}

/// A gene's relations in pool order, so the most recently appended
/// cell-type entry deterministically wins a label collision when the
/// postings are collected into name-keyed output.
fn sorted_relations(relations: &HashMap<CellTypeId, PostingId>) -> Vec<(CellTypeId, PostingId)> {
    let mut entries: Vec<(CellTypeId, PostingId)> =
        relations.iter().map(|(&ct, &pid)| (ct, pid)).collect();
    entries.sort_unstable_by_key(|&(ct, _)| ct);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(genes: &[&str], num_cells: usize, values: Vec<f64>) -> ExpressionMatrix {
        ExpressionMatrix::new(genes.iter().map(|s| s.to_string()).collect(), num_cells, values)
            .unwrap()
    }

    #[test]
    fn test_ingest_single_slice() {
        let mut index = IndexStore::new();
        index
            .ingest_slice(
                "T",
                &matrix(
                    &["A", "B"],
                    4,
                    vec![
                        1.0, 2.0, 3.0, 0.0, // A
                        0.0, 1.0, 1.0, 2.0, // B
                    ],
                ),
            )
            .unwrap();

        assert_eq!(index.db_size(), 2);
        assert_eq!(index.total_cells(), 4);
        assert_eq!(index.genes(), vec!["A", "B"]);
        assert_eq!(index.gene_count("A"), 3);
        assert_eq!(index.gene_count("B"), 3);
        assert_eq!(index.warnings(), 0);
        assert_eq!(index.decode(0), vec![1, 2, 3]);
        assert_eq!(index.decode(1), vec![2, 3, 4]);
    }

    #[test]
    fn test_empty_rows_are_skipped() {
        let mut index = IndexStore::new();
        index
            .ingest_slice(
                "T",
                &matrix(&["A", "B"], 2, vec![1.0, 0.0, 0.0, 0.0]),
            )
            .unwrap();

        assert_eq!(index.db_size(), 1);
        assert_eq!(index.warnings(), 1);
        assert_eq!(index.genes(), vec!["A"]);
        assert_eq!(index.gene_count("B"), 0);
        assert_eq!(index.total_cells(), 2);
    }

    #[test]
    fn test_empty_cell_type_rejected() {
        let mut index = IndexStore::new();
        assert!(index
            .ingest_slice("", &matrix(&["A"], 1, vec![1.0]))
            .is_err());
    }

    #[test]
    fn test_out_of_range_decode_is_empty() {
        let index = IndexStore::new();
        assert!(index.decode(3).is_empty());
    }

    #[test]
    fn test_ingest_interns_cell_types_by_value() {
        let mut index = IndexStore::new();
        index
            .ingest_slice("T", &matrix(&["A"], 2, vec![1.0, 0.0]))
            .unwrap();
        index
            .ingest_slice("T", &matrix(&["B"], 2, vec![0.0, 1.0]))
            .unwrap();
        assert_eq!(index.cell_types.names.len(), 1);
    }

    #[test]
    fn test_merge_counters_and_instances() {
        // First database: 10 cells, gene A expressing at [1, 5].
        let mut db1 = IndexStore::new();
        let mut values = vec![0.0; 10];
        values[0] = 1.0;
        values[4] = 2.0;
        db1.ingest_slice("T", &matrix(&["A"], 10, values)).unwrap();

        // Second database: 20 cells, gene A expressing at [2, 7, 9].
        let mut db2 = IndexStore::new();
        let mut values = vec![0.0; 20];
        values[1] = 1.0;
        values[6] = 1.0;
        values[8] = 3.0;
        db2.ingest_slice("T", &matrix(&["A"], 20, values)).unwrap();

        db1.merge(db2);

        assert_eq!(db1.total_cells(), 30);
        assert_eq!(db1.gene_count("A"), 5);
        assert_eq!(db1.db_size(), 2);
        // Pool-reference identity: one entry per source slice, even though
        // both were labelled "T".
        assert_eq!(db1.metadata["A"].len(), 2);
        assert_eq!(db1.cell_types.names, vec!["T", "T"]);

        let mut decoded: Vec<Vec<u32>> = db1.metadata["A"]
            .values()
            .map(|&pid| db1.posting(pid).decode())
            .collect();
        decoded.sort();
        assert_eq!(decoded, vec![vec![1, 5], vec![2, 7, 9]]);
    }

    #[test]
    fn test_merge_preserves_receiver_answers() {
        let mut db1 = IndexStore::new();
        db1.ingest_slice("T", &matrix(&["A"], 3, vec![1.0, 0.0, 2.0]))
            .unwrap();
        let before = db1.query_genes(&["A"]);

        let mut db2 = IndexStore::new();
        db2.ingest_slice("B cell", &matrix(&["B"], 2, vec![1.0, 1.0]))
            .unwrap();
        db1.merge(db2);

        assert_eq!(db1.query_genes(&["A"]), before);
        assert_eq!(db1.query_genes(&["B"])["B"]["B cell"], vec![1, 2]);
    }

    #[test]
    fn test_count_invariants_after_ingests_and_merges() {
        let mut db1 = IndexStore::new();
        db1.ingest_slice("T", &matrix(&["A", "B"], 3, vec![1.0, 1.0, 0.0, 0.0, 2.0, 2.0]))
            .unwrap();
        db1.ingest_slice("NK", &matrix(&["A"], 2, vec![3.0, 0.0]))
            .unwrap();

        let mut db2 = IndexStore::new();
        db2.ingest_slice("T", &matrix(&["B"], 4, vec![1.0, 0.0, 0.0, 1.0]))
            .unwrap();
        db1.merge(db2);

        assert_eq!(db1.total_cells(), 3 + 2 + 4);
        for (gene, relations) in &db1.metadata {
            let decoded_total: usize = relations
                .values()
                .map(|&pid| db1.posting(pid).decode().len())
                .sum();
            assert_eq!(decoded_total, db1.gene_counts[gene]);
        }
    }

    #[test]
    fn test_sample() {
        let mut index = IndexStore::new();
        index
            .ingest_slice("T", &matrix(&["A", "B"], 2, vec![1.0, 0.0, 1.0, 1.0]))
            .unwrap();

        let (gene, decoded) = index.sample(1).unwrap();
        assert_eq!(gene, "B");
        assert_eq!(decoded["T"], vec![1, 2]);
        assert!(index.sample(2).is_none());
    }

    #[test]
    fn test_memory_footprint_grows() {
        let mut index = IndexStore::new();
        assert_eq!(index.memory_footprint(), 0);
        index
            .ingest_slice("T", &matrix(&["A"], 2, vec![1.0, 0.0]))
            .unwrap();
        let small = index.memory_footprint();
        assert!(small > 0);
        assert!(index.posting_memory_footprint() <= small);

        index
            .ingest_slice("NK", &matrix(&["B"], 2, vec![1.0, 1.0]))
            .unwrap();
        assert!(index.memory_footprint() > small);
    }
}
