//! Point containment and linear interpolation on tensor meshes.

use fixedbitset as fb;
use itertools::Itertools;
use nalgebra as na;
use nalgebra_sparse as nas;

use crate::{
    sparse, CoordinateSystem, GridSource, Location, MeshError, MeshResult, TensorMesh, Topology,
};

/// Indices and weights of the two points of a sorted 1-D tensor
/// that linearly interpolate to `x`.
///
/// Points outside the tensor get the full weight of the nearest end.
pub(crate) fn linear_weights_1d(tensor: &[f64], x: f64) -> [(usize, f64); 2] {
    let n = tensor.len();
    if n < 2 || x <= tensor[0] {
        return [(0, 1.0), (0, 0.0)];
    }
    if x >= tensor[n - 1] {
        return [(n - 1, 1.0), (n - 1, 0.0)];
    }
    // first index with tensor[i] > x, which is in 1..n here
    let upper = tensor.partition_point(|&t| t <= x);
    let lower = upper - 1;
    let span = tensor[upper] - tensor[lower];
    let t = (x - tensor[lower]) / span;
    [(lower, 1.0 - t), (upper, t)]
}

/// Multilinear interpolation weights from a tensor-product grid to arbitrary points,
/// as a `(points, grid points)` matrix.
pub(crate) fn tensor_interpolation(
    points: &na::DMatrix<f64>,
    tensors: &[na::DVector<f64>],
) -> nas::CsrMatrix<f64> {
    let extents = tensors.iter().map(|t| t.len()).collect_vec();
    let n_grid: usize = extents.iter().product();
    let mut coo = nas::CooMatrix::new(points.nrows(), n_grid);

    for (row_idx, point) in points.row_iter().enumerate() {
        let per_axis = tensors
            .iter()
            .zip(point.iter())
            .map(|(tensor, &x)| linear_weights_1d(tensor.as_slice(), x))
            .collect_vec();
        for corner in per_axis.iter().multi_cartesian_product() {
            let weight: f64 = corner.iter().map(|(_, w)| w).product();
            if weight == 0.0 {
                continue;
            }
            let multi = corner.iter().map(|(i, _)| *i).collect_vec();
            coo.push(row_idx, Topology::flat_index(&extents, &multi), weight);
        }
    }

    nas::CsrMatrix::from(&coo)
}

impl TensorMesh {
    /// Check which of the given points (one per row) lie within the bounds
    /// of the grid of `location`, with a tolerance of `1e-10` times
    /// the smallest spacing along each axis.
    ///
    /// On cylindrical meshes the nodal bounds are extended
    /// to include the axis (radius 0) and the full circle (angle 2π).
    ///
    /// Returns the set of indices of inside points.
    pub fn is_inside(
        &self,
        points: &na::DMatrix<f64>,
        location: Location,
    ) -> MeshResult<fb::FixedBitSet> {
        self.check_points(points)?;
        let mut tensors = self.axis_tensors(location)?;
        if location == Location::Nodes
            && self.coordinate_system() == CoordinateSystem::Cylindrical
            && tensors.len() >= 2
        {
            tensors[0] = prepend(0.0, &tensors[0]);
            tensors[1] = append(&tensors[1], std::f64::consts::TAU);
        }

        let bounds = tensors
            .iter()
            .map(|tensor| {
                let min = tensor.min();
                let max = tensor.max();
                let min_spacing = tensor
                    .as_slice()
                    .windows(2)
                    .map(|w| w[1] - w[0])
                    .fold(f64::INFINITY, f64::min);
                let tol = if min_spacing.is_finite() {
                    min_spacing * 1e-10
                } else {
                    0.0
                };
                (min - tol, max + tol)
            })
            .collect_vec();

        let mut inside = fb::FixedBitSet::with_capacity(points.nrows());
        for (row_idx, point) in points.row_iter().enumerate() {
            if point
                .iter()
                .zip(&bounds)
                .all(|(&x, &(lo, hi))| x >= lo && x <= hi)
            {
                inside.insert(row_idx);
            }
        }
        Ok(inside)
    }

    /// Build a sparse matrix that linearly interpolates values at `location`
    /// to the given points (one per row).
    ///
    /// `Faces*`/`Edges*` components produce matrices acting on the full stacked
    /// face or edge vector, with zeros for the other components,
    /// and `CellVectors*` ones act on a stacked cell-centered vector field.
    ///
    /// If `zeros_outside` is false, any point outside the mesh is an
    /// [`OutOfDomain`][MeshError::OutOfDomain] error.
    /// Otherwise rows of outside points are all zero.
    pub fn interpolation_matrix(
        &self,
        points: &na::DMatrix<f64>,
        location: Location,
        zeros_outside: bool,
    ) -> MeshResult<nas::CsrMatrix<f64>> {
        let inside = self.is_inside(points, Location::Nodes)?;
        let mut outside = fb::FixedBitSet::with_capacity(points.nrows());
        for row_idx in (0..points.nrows()).filter(|&i| !inside.contains(i)) {
            outside.insert(row_idx);
        }
        let mut points = points.clone();

        if let Some(first_index) = outside.ones().next() {
            if !zeros_outside {
                return Err(MeshError::OutOfDomain {
                    count: outside.count_ones(..),
                    first_index,
                });
            }
            // snap outside points somewhere harmless before zeroing their rows
            let center = self
                .axis_tensors(Location::CellCenters)?
                .iter()
                .map(|t| t.mean())
                .collect_vec();
            for row_idx in outside.ones() {
                for (col, &c) in center.iter().enumerate() {
                    points[(row_idx, col)] = c;
                }
            }
        }

        let topo = self.topology();
        let n_points = points.nrows();
        let mat = match location {
            Location::CellCenters | Location::Nodes => {
                tensor_interpolation(&points, &self.axis_tensors(location)?)
            }
            Location::FacesX
            | Location::FacesY
            | Location::FacesZ
            | Location::EdgesX
            | Location::EdgesY
            | Location::EdgesZ => {
                let q = tensor_interpolation(&points, &self.axis_tensors(location)?);
                let (kind, axis) = match (location.element_kind(), location.axis()) {
                    (Some(kind), Some(axis)) => (kind, axis),
                    _ => {
                        return Err(MeshError::InternalInvariant(format!(
                            "{location} has no component axis"
                        )))
                    }
                };
                let blocks = (0..topo.dim())
                    .filter_map(|a| {
                        if a == axis {
                            Some(q.clone())
                        } else {
                            let n = topo.location_count(kind.component(a)?)?;
                            Some(sparse::zeros(n_points, n))
                        }
                    })
                    .collect_vec();
                sparse::hstack(&blocks)?
            }
            Location::CellVectorsX | Location::CellVectorsY | Location::CellVectorsZ => {
                let axis = location.axis().filter(|&a| a < topo.dim()).ok_or_else(|| {
                    MeshError::Dimension(format!(
                        "cannot interpolate {location} on a mesh with {} axes",
                        topo.dim()
                    ))
                })?;
                let q = tensor_interpolation(&points, &self.axis_tensors(Location::CellCenters)?);
                let blocks = (0..topo.dim())
                    .map(|a| {
                        if a == axis {
                            q.clone()
                        } else {
                            sparse::zeros(n_points, topo.cell_count())
                        }
                    })
                    .collect_vec();
                sparse::hstack(&blocks)?
            }
            Location::Faces | Location::Edges => {
                return Err(MeshError::Shape(format!(
                    "interpolation needs a single component, not all of {location}"
                )))
            }
        };

        log::trace!("interpolation matrix to {location} of shape {:?}", (mat.nrows(), mat.ncols()));
        if outside.count_ones(..) == 0 {
            Ok(mat)
        } else {
            sparse::drop_csr_rows(mat, &outside)
        }
    }

    fn check_points(&self, points: &na::DMatrix<f64>) -> MeshResult<()> {
        if points.ncols() != self.topology().dim() {
            return Err(MeshError::Shape(format!(
                "points must have {} coordinates, got {}",
                self.topology().dim(),
                points.ncols()
            )));
        }
        Ok(())
    }
}

fn prepend(x: f64, v: &na::DVector<f64>) -> na::DVector<f64> {
    na::DVector::from_iterator(v.len() + 1, std::iter::once(x).chain(v.iter().cloned()))
}

fn append(v: &na::DVector<f64>, x: f64) -> na::DVector<f64> {
    na::DVector::from_iterator(v.len() + 1, v.iter().cloned().chain(std::iter::once(x)))
}
