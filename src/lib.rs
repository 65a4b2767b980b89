//! # Cellfind: compressed in-memory search over single-cell expression
//!
//! `cellfind` indexes single-cell gene-expression matrices one cell-type
//! slice at a time. For every (gene, cell-type) pair it stores the sparse
//! set of expressing cell ordinals as an Elias-Fano coded posting, plus a
//! 2-bit quantization of the expression magnitudes under a fitted normal
//! distribution, so large atlases fit in memory and stay queryable.
//!
//! Three query classes are supported:
//!
//! - recover the expressing cells of a gene per cell type
//!   ([`IndexStore::query_genes`]),
//! - find the cell types co-expressing a whole gene set
//!   ([`IndexStore::find_cell_types`]),
//! - mine frequently co-expressed marker-gene sets and score them
//!   ([`IndexStore::find_marker_genes`]).
//!
//! Databases built independently can be combined with
//! [`IndexStore::merge`]; there is no persisted format.
//!
//! # Example
//!
//! ```
//! use cellfind::{ExpressionMatrix, IndexStore};
//!
//! let matrix = ExpressionMatrix::new(
//!     vec!["CD3D".into(), "CD8A".into(), "NKG7".into()],
//!     5,
//!     vec![
//!         1.0, 2.0, 0.0, 1.5, 0.0, // CD3D
//!         0.0, 1.0, 0.0, 2.0, 0.0, // CD8A
//!         0.0, 0.0, 3.0, 0.0, 0.0, // NKG7
//!     ],
//! )?;
//!
//! let mut index = IndexStore::new();
//! index.ingest_slice("T cell", &matrix)?;
//!
//! let hits = index.find_cell_types(&["CD3D", "CD8A"]);
//! assert_eq!(hits["T cell"], vec![2, 4]);
//! # anyhow::Ok(())
//! ```
pub mod bit_vector;
pub mod broadword;
pub mod elias_fano;
pub mod index;
pub mod matrix;
pub mod mining;
pub mod posting;
pub mod quantile;

pub use crate::bit_vector::BitVector;
pub use crate::elias_fano::EliasFano;
pub use crate::index::query::MarkerGene;
pub use crate::index::IndexStore;
pub use crate::matrix::ExpressionMatrix;
pub use crate::posting::PostingRecord;
pub use crate::quantile::Quantile;
