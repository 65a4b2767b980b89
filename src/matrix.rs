//! Dense input shape for ingestion: one gene per row, one cell per column.

use anyhow::{anyhow, Result};

/// Row-major dense expression matrix with named rows.
///
/// Rows are genes and columns are the cells `1..=n` of a single cell-type
/// slice. This is the only input shape the index ingests; sparsity is
/// recovered per row at encoding time with [`sparse_ids`].
///
/// # Examples
///
/// ```
/// use cellfind::ExpressionMatrix;
///
/// let matrix = ExpressionMatrix::new(
///     vec!["ACTB".into(), "CD8A".into()],
///     3,
///     vec![
///         1.0, 0.0, 2.0, // ACTB
///         0.0, 0.0, 4.5, // CD8A
///     ],
/// )?;
///
/// assert_eq!(matrix.num_genes(), 2);
/// assert_eq!(matrix.num_cells(), 3);
/// assert_eq!(matrix.row(1), &[0.0, 0.0, 4.5]);
/// # anyhow::Ok(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatrix {
    gene_names: Vec<String>,
    num_cells: usize,
    values: Vec<f64>,
}

impl ExpressionMatrix {
    /// Creates a matrix from row names, the column count, and row-major
    /// values.
    ///
    /// # Errors
    ///
    /// An error is returned if the value buffer does not hold exactly
    /// `gene_names.len() * num_cells` entries, or if a row name is empty.
    pub fn new(gene_names: Vec<String>, num_cells: usize, values: Vec<f64>) -> Result<Self> {
        if gene_names.len() * num_cells != values.len() {
            return Err(anyhow!(
                "expected {} x {} = {} values, got {}.",
                gene_names.len(),
                num_cells,
                gene_names.len() * num_cells,
                values.len()
            ));
        }
        if gene_names.iter().any(|name| name.is_empty()) {
            return Err(anyhow!("gene names must not be empty."));
        }
        Ok(Self {
            gene_names,
            num_cells,
            values,
        })
    }

    /// Gets the number of genes (rows).
    #[inline(always)]
    pub fn num_genes(&self) -> usize {
        self.gene_names.len()
    }

    /// Gets the number of cells (columns).
    #[inline(always)]
    pub const fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// Gets the gene names in row order.
    pub fn gene_names(&self) -> &[String] {
        &self.gene_names
    }

    /// Gets the expression values of the `row`-th gene.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.num_cells..(row + 1) * self.num_cells]
    }
}

/// Extracts the 1-based ordinals of the cells with positive expression,
/// in increasing order.
///
/// # Examples
///
/// ```
/// use cellfind::matrix::sparse_ids;
///
/// assert_eq!(sparse_ids(&[0.0, 1.5, 0.0, 0.2]), vec![2, 4]);
/// assert!(sparse_ids(&[0.0, 0.0]).is_empty());
/// ```
pub fn sparse_ids(values: &[f64]) -> Vec<u32> {
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > 0.0)
        .map(|(i, _)| (i + 1) as u32)
        .collect()
}
