//! Sparse matrix assembly helpers.
//!
//! nalgebra-sparse has no Kronecker products or block stacking,
//! so these are assembled here through [`CooMatrix`][nas::CooMatrix] triplets.

use fixedbitset as fb;
use nalgebra as na;
use nalgebra_sparse as nas;

use crate::{MeshError, MeshResult};

/// A CSR matrix with the given diagonal.
pub fn sdiag(diagonal: &na::DVector<f64>) -> nas::CsrMatrix<f64> {
    // nalgebra doesn't have a method to construct CSR directly from a diagonal.
    // construct an identity matrix to get the right sparsity pattern
    // and then replace the entries
    let mut csr = nas::CsrMatrix::identity(diagonal.len());
    for (&diag, mat_diag) in diagonal.iter().zip(csr.values_mut()) {
        *mat_diag = diag;
    }
    csr
}

/// The 1-D averaging stencil from `n + 1` nodes to `n` cell centers:
/// an `n x (n + 1)` matrix with 0.5 on the diagonal and superdiagonal.
pub fn average_1d(n: usize) -> nas::CsrMatrix<f64> {
    let mut coo = nas::CooMatrix::new(n, n + 1);
    for i in 0..n {
        coo.push(i, i, 0.5);
        coo.push(i, i + 1, 0.5);
    }
    nas::CsrMatrix::from(&coo)
}

/// Kronecker product `a ⊗ b`.
///
/// The index within `b` varies fastest in both rows and columns of the result.
pub fn kron(a: &nas::CsrMatrix<f64>, b: &nas::CsrMatrix<f64>) -> nas::CsrMatrix<f64> {
    let (b_rows, b_cols) = (b.nrows(), b.ncols());
    let mut coo = nas::CooMatrix::new(a.nrows() * b_rows, a.ncols() * b_cols);
    for (a_row, a_col, &a_val) in a.triplet_iter() {
        for (b_row, b_col, &b_val) in b.triplet_iter() {
            coo.push(a_row * b_rows + b_row, a_col * b_cols + b_col, a_val * b_val);
        }
    }
    nas::CsrMatrix::from(&coo)
}

/// Place matrices side by side. All blocks must have the same number of rows.
pub fn hstack(blocks: &[nas::CsrMatrix<f64>]) -> MeshResult<nas::CsrMatrix<f64>> {
    let nrows = blocks.first().map(|b| b.nrows()).unwrap_or(0);
    if let Some(bad) = blocks.iter().find(|b| b.nrows() != nrows) {
        return Err(MeshError::InternalInvariant(format!(
            "cannot hstack a block with {} rows next to one with {nrows}",
            bad.nrows()
        )));
    }
    let ncols = blocks.iter().map(|b| b.ncols()).sum();
    let mut coo = nas::CooMatrix::new(nrows, ncols);
    let mut col_offset = 0;
    for block in blocks {
        for (row, col, &val) in block.triplet_iter() {
            coo.push(row, col_offset + col, val);
        }
        col_offset += block.ncols();
    }
    Ok(nas::CsrMatrix::from(&coo))
}

/// Place matrices on top of each other. All blocks must have the same number of columns.
pub fn vstack(blocks: &[nas::CsrMatrix<f64>]) -> MeshResult<nas::CsrMatrix<f64>> {
    let ncols = blocks.first().map(|b| b.ncols()).unwrap_or(0);
    if let Some(bad) = blocks.iter().find(|b| b.ncols() != ncols) {
        return Err(MeshError::InternalInvariant(format!(
            "cannot vstack a block with {} columns onto one with {ncols}",
            bad.ncols()
        )));
    }
    let nrows = blocks.iter().map(|b| b.nrows()).sum();
    let mut coo = nas::CooMatrix::new(nrows, ncols);
    let mut row_offset = 0;
    for block in blocks {
        for (row, col, &val) in block.triplet_iter() {
            coo.push(row_offset + row, col, val);
        }
        row_offset += block.nrows();
    }
    Ok(nas::CsrMatrix::from(&coo))
}

/// `diag(left) * mat * diag(right)`, with a missing factor standing for the identity.
pub fn scale_rows_cols(
    mat: &nas::CsrMatrix<f64>,
    left: Option<&na::DVector<f64>>,
    right: Option<&na::DVector<f64>>,
) -> nas::CsrMatrix<f64> {
    let mut ret = mat.clone();
    for (row_idx, mut row) in ret.row_iter_mut().enumerate() {
        let row_scale = left.map_or(1.0, |l| l[row_idx]);
        let (cols, vals) = row.cols_and_values_mut();
        for (&col, val) in cols.iter().zip(vals) {
            *val *= row_scale * right.map_or(1.0, |r| r[col]);
        }
    }
    ret
}

/// Place matrices on the diagonal of a larger matrix, with zeros elsewhere.
pub fn block_diag(blocks: &[nas::CsrMatrix<f64>]) -> nas::CsrMatrix<f64> {
    let nrows = blocks.iter().map(|b| b.nrows()).sum();
    let ncols = blocks.iter().map(|b| b.ncols()).sum();
    let mut coo = nas::CooMatrix::new(nrows, ncols);
    let (mut row_offset, mut col_offset) = (0, 0);
    for block in blocks {
        for (row, col, &val) in block.triplet_iter() {
            coo.push(row_offset + row, col_offset + col, val);
        }
        row_offset += block.nrows();
        col_offset += block.ncols();
    }
    nas::CsrMatrix::from(&coo)
}

/// An all-zero matrix of the given size.
#[inline]
pub fn zeros(nrows: usize, ncols: usize) -> nas::CsrMatrix<f64> {
    nas::CsrMatrix::zeros(nrows, ncols)
}

/// Remove all entries on the given rows of a CSR matrix,
/// leaving its dimensions unchanged.
pub fn drop_csr_rows(
    mat: nas::CsrMatrix<f64>,
    set_to_drop: &fb::FixedBitSet,
) -> MeshResult<nas::CsrMatrix<f64>> {
    let num_rows = mat.nrows();
    let num_cols = mat.ncols();
    // disassemble to reuse allocated memory
    let (mut row_offsets, mut col_indices, mut values) = mat.disassemble();

    // loop through the rows while keeping track of the number of retained values,
    // moving col_indices and values left by the appropriate amounts
    // and rebuilding row_offsets from scratch
    let mut retained_value_idx = 0;
    // row_offsets[row_idx + 1] gets overwritten during the loop,
    // so we need to keep the old value of that as state
    let mut prev_row_offset = 0;
    for row_idx in 0..num_rows {
        let old_row_range = prev_row_offset..row_offsets[row_idx + 1];
        prev_row_offset = row_offsets[row_idx + 1];

        if set_to_drop.contains(row_idx) {
            row_offsets[row_idx + 1] = row_offsets[row_idx];
        } else {
            for old_val_idx in old_row_range {
                col_indices[retained_value_idx] = col_indices[old_val_idx];
                values[retained_value_idx] = values[old_val_idx];
                retained_value_idx += 1;
            }
            row_offsets[row_idx + 1] = retained_value_idx;
        }
    }

    col_indices.truncate(retained_value_idx);
    values.truncate(retained_value_idx);

    nas::CsrMatrix::try_from_csr_data(num_rows, num_cols, row_offsets, col_indices, values)
        .map_err(|e| MeshError::InternalInvariant(format!("dropping CSR rows: {e}")))
}

/// Dense copy of a sparse matrix, for tests and small debugging outputs.
pub fn to_dense(mat: &nas::CsrMatrix<f64>) -> na::DMatrix<f64> {
    na::DMatrix::from(mat)
}
