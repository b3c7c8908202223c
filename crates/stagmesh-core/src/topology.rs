//! Counting cells, nodes, faces and edges of tensor-product meshes.
//!
//! Everything here is a pure function of the mesh shape.
//! Both [`TensorMesh`][crate::TensorMesh] and
//! [`CurvilinearMesh`][crate::CurvilinearMesh] share this bookkeeping,
//! since a curvilinear mesh has the same logical structure
//! as a tensor mesh of the same shape.

use nalgebra as na;

use crate::{Location, MeshError, MeshResult};

/// The logical structure of a mesh with 1 to 3 axes.
///
/// Elements of every location are numbered in column-major order,
/// i.e. the index along the first axis varies fastest.
/// Face and edge components are stacked in axis order
/// (all x-faces, then all y-faces, then all z-faces).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topology {
    shape: Vec<usize>,
}

impl Topology {
    /// Create a topology from the number of cells along each axis.
    ///
    /// Fails with [`MeshError::Dimension`] if there are no axes or more than 3,
    /// and with [`MeshError::Shape`] if any axis has zero cells.
    pub fn new(shape: &[usize]) -> MeshResult<Self> {
        if shape.is_empty() || shape.len() > 3 {
            return Err(MeshError::Dimension(format!(
                "meshes must have 1 to 3 axes, got shape {shape:?}"
            )));
        }
        if let Some(axis) = shape.iter().position(|&n| n == 0) {
            return Err(MeshError::Shape(format!(
                "every axis needs at least one cell, axis {axis} of {shape:?} has none"
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
        })
    }

    /// Number of axes (1, 2 or 3).
    #[inline]
    pub fn dim(&self) -> usize {
        self.shape.len()
    }

    /// Number of cells along each axis.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Total number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.shape.iter().map(|n| n + 1).product()
    }

    /// Number of cells along each axis (`vnC`).
    #[inline]
    pub fn cell_shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    /// Number of nodes along each axis (`vnN`).
    #[inline]
    pub fn node_shape(&self) -> Vec<usize> {
        self.shape.iter().map(|n| n + 1).collect()
    }

    /// Number of faces normal to `axis` along each axis
    /// (`vnFx`, `vnFy`, `vnFz`).
    ///
    /// Returns None if `axis` is not an axis of the mesh.
    pub fn face_shape(&self, axis: usize) -> Option<Vec<usize>> {
        (axis < self.dim()).then(|| {
            self.shape
                .iter()
                .enumerate()
                .map(|(i, &n)| if i == axis { n + 1 } else { n })
                .collect()
        })
    }

    /// Number of edges parallel to `axis` along each axis
    /// (`vnEx`, `vnEy`, `vnEz`).
    ///
    /// Returns None if `axis` is not an axis of the mesh.
    pub fn edge_shape(&self, axis: usize) -> Option<Vec<usize>> {
        (axis < self.dim()).then(|| {
            self.shape
                .iter()
                .enumerate()
                .map(|(i, &n)| if i == axis { n } else { n + 1 })
                .collect()
        })
    }

    /// Number of faces normal to `axis`, or None if the axis doesn't exist.
    #[inline]
    pub fn face_count_axis(&self, axis: usize) -> Option<usize> {
        self.face_shape(axis).map(|s| s.iter().product())
    }

    /// Number of edges parallel to `axis`, or None if the axis doesn't exist.
    #[inline]
    pub fn edge_count_axis(&self, axis: usize) -> Option<usize> {
        self.edge_shape(axis).map(|s| s.iter().product())
    }

    /// Face counts for every axis of the mesh (`vnF`).
    pub fn face_counts(&self) -> Vec<usize> {
        (0..self.dim()).filter_map(|a| self.face_count_axis(a)).collect()
    }

    /// Edge counts for every axis of the mesh (`vnE`).
    pub fn edge_counts(&self) -> Vec<usize> {
        (0..self.dim()).filter_map(|a| self.edge_count_axis(a)).collect()
    }

    /// Total number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.face_counts().iter().sum()
    }

    /// Total number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_counts().iter().sum()
    }

    /// Per-axis extents of the logical grid of a single-component location.
    ///
    /// `Faces` and `Edges` have no single grid shape and give None,
    /// as do components along axes the mesh doesn't have.
    pub fn location_shape(&self, location: Location) -> Option<Vec<usize>> {
        use Location::*;
        match location {
            CellCenters => Some(self.cell_shape()),
            Nodes => Some(self.node_shape()),
            CellVectorsX | CellVectorsY | CellVectorsZ => {
                location.axis().filter(|&a| a < self.dim())?;
                Some(self.cell_shape())
            }
            FacesX | FacesY | FacesZ => self.face_shape(location.axis()?),
            EdgesX | EdgesY | EdgesZ => self.edge_shape(location.axis()?),
            Faces | Edges => None,
        }
    }

    /// Number of values a scalar field at `location` has.
    ///
    /// For the `CellVectors*` components this is the cell count;
    /// the stacked vector field has `dim` times as many.
    pub fn location_count(&self, location: Location) -> Option<usize> {
        match location {
            Location::Faces => Some(self.face_count()),
            Location::Edges => Some(self.edge_count()),
            _ => self.location_shape(location).map(|s| s.iter().product()),
        }
    }

    /// Unit normals of every face of an axis-aligned mesh,
    /// as a `(face_count, dim)` matrix with the x-face block first.
    pub fn face_normals(&self) -> na::DMatrix<f64> {
        self.axis_unit_rows(&self.face_counts())
    }

    /// Unit tangents of every edge of an axis-aligned mesh,
    /// as an `(edge_count, dim)` matrix with the x-edge block first.
    pub fn edge_tangents(&self) -> na::DMatrix<f64> {
        self.axis_unit_rows(&self.edge_counts())
    }

    fn axis_unit_rows(&self, counts: &[usize]) -> na::DMatrix<f64> {
        let total = counts.iter().sum();
        let mut ret = na::DMatrix::zeros(total, self.dim());
        let mut start = 0;
        for (axis, &count) in counts.iter().enumerate() {
            ret.view_mut((start, axis), (count, 1)).fill(1.0);
            start += count;
        }
        ret
    }

    /// Flat column-major index of a multi-index into a grid of the given extents.
    #[inline]
    pub(crate) fn flat_index(extents: &[usize], multi: &[usize]) -> usize {
        let mut idx = 0;
        let mut stride = 1;
        for (&i, &n) in multi.iter().zip(extents) {
            idx += i * stride;
            stride *= n;
        }
        idx
    }
}

/// Project rows of a `(count, dim)` vector field onto unit directions of the same shape,
/// giving one scalar per row.
pub(crate) fn project_rows(
    field: &na::DMatrix<f64>,
    directions: &na::DMatrix<f64>,
    what: &str,
) -> MeshResult<na::DVector<f64>> {
    if field.shape() != directions.shape() {
        return Err(MeshError::Shape(format!(
            "{what} vector must have shape {:?}, got {:?}",
            directions.shape(),
            field.shape()
        )));
    }
    Ok(field.component_mul(directions).column_sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_in_2d() {
        let topo = Topology::new(&[2, 2]).unwrap();
        assert_eq!(topo.dim(), 2);
        assert_eq!(topo.cell_count(), 4);
        assert_eq!(topo.node_count(), 9);
        assert_eq!(topo.face_count_axis(0), Some(6));
        assert_eq!(topo.face_count_axis(1), Some(6));
        assert_eq!(topo.face_count_axis(2), None);
        assert_eq!(topo.face_count(), 12);
        assert_eq!(topo.edge_count(), 12);
    }

    #[test]
    fn counts_in_3d() {
        let topo = Topology::new(&[2, 3, 4]).unwrap();
        assert_eq!(topo.cell_count(), 24);
        assert_eq!(topo.node_count(), 3 * 4 * 5);
        assert_eq!(topo.face_shape(1), Some(vec![2, 4, 4]));
        assert_eq!(topo.edge_shape(2), Some(vec![3, 4, 4]));
        assert_eq!(topo.face_counts(), vec![3 * 3 * 4, 2 * 4 * 4, 2 * 3 * 5]);
        assert_eq!(topo.edge_counts(), vec![2 * 4 * 5, 3 * 3 * 5, 3 * 4 * 4]);
        // totals are always the sums of the per-axis counts
        assert_eq!(topo.face_count(), topo.face_counts().iter().sum::<usize>());
        assert_eq!(topo.edge_count(), topo.edge_counts().iter().sum::<usize>());
    }

    #[test]
    fn counts_in_1d() {
        let topo = Topology::new(&[4]).unwrap();
        assert_eq!(topo.node_count(), 5);
        assert_eq!(topo.face_count(), 5);
        assert_eq!(topo.edge_count(), 4);
        assert_eq!(topo.edge_count_axis(1), None);
        assert_eq!(topo.location_shape(Location::FacesY), None);
        assert_eq!(topo.location_count(Location::CellVectorsX), Some(4));
        assert_eq!(topo.location_count(Location::CellVectorsY), None);
    }

    #[test]
    fn invalid_shapes() {
        assert!(matches!(
            Topology::new(&[1, 2, 3, 4]),
            Err(MeshError::Dimension(_))
        ));
        assert!(matches!(Topology::new(&[]), Err(MeshError::Dimension(_))));
        assert!(matches!(Topology::new(&[3, 0]), Err(MeshError::Shape(_))));
    }

    #[test]
    fn normals_and_tangents_are_axis_blocks() {
        let topo = Topology::new(&[2, 3]).unwrap();
        let normals = topo.face_normals();
        assert_eq!(normals.shape(), (topo.face_count(), 2));
        let n_fx = topo.face_count_axis(0).unwrap();
        for (row_idx, row) in normals.row_iter().enumerate() {
            let expected = if row_idx < n_fx { [1., 0.] } else { [0., 1.] };
            assert_eq!(row.iter().cloned().collect::<Vec<_>>(), expected);
        }

        let tangents = topo.edge_tangents();
        let n_ex = topo.edge_count_axis(0).unwrap();
        assert_eq!(tangents.column(0).sum(), n_ex as f64);
        assert_eq!(tangents.column(1).sum(), (topo.edge_count() - n_ex) as f64);
    }

    #[test]
    fn projection_checks_shape() {
        let topo = Topology::new(&[1, 1]).unwrap();
        let normals = topo.face_normals();
        let field = na::DMatrix::from_element(4, 2, 2.0);
        let projected = project_rows(&field, &normals, "face").unwrap();
        assert_eq!(projected, na::DVector::from_element(4, 2.0));
        let wrong = na::DMatrix::zeros(3, 2);
        assert!(matches!(
            project_rows(&wrong, &normals, "face"),
            Err(MeshError::Shape(_))
        ));
    }
}
