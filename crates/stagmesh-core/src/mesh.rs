//! Structured meshes: axis-aligned tensor meshes and curvilinear meshes.

mod curvilinear;
mod fields;
mod tensor;
/// Small meshes used in tests.
mod tiny;

pub use curvilinear::{CurvilinearMesh, CurvilinearMeshBuilder};
pub use fields::{AnyMesh, MeshFields, NodeArray, OriginAnchor, OriginEntry};
pub use tensor::{TensorMesh, TensorMeshBuilder};
/// re-export the testing meshes for use in other modules' tests
#[doc(hidden)]
pub use tiny::{
    tiny_curvilinear_mesh_2d, tiny_curvilinear_mesh_3d, tiny_tensor_mesh_2d, tiny_tensor_mesh_3d,
};

//

use nalgebra as na;
use std::sync::OnceLock;

use crate::{
    inner_product::OperatorBuilder, topology::project_rows, Averaging, CoordinateSystem, Location,
    MeshError, MeshResult, ReferenceFrame, Topology,
};

/// Geometry shared by every kind of structured mesh.
///
/// Operators in [`OperatorBuilder`] and the mesh-independent queries
/// (projections, rotations) are written against this trait,
/// so they work the same on tensor and curvilinear meshes.
pub trait GridSource {
    /// Counts and shapes of the mesh.
    fn topology(&self) -> &Topology;
    /// The coordinate system the mesh is expressed in.
    fn coordinate_system(&self) -> CoordinateSystem;
    /// Position of the first node.
    fn origin(&self) -> &[f64];
    /// Orientation of the mesh axes.
    fn reference_frame(&self) -> &ReferenceFrame;
    /// Volume (area in 2-D, length in 1-D) of every cell.
    fn cell_volumes(&self) -> &na::DVector<f64>;
    /// Coordinates of the points of a location, one row per point,
    /// in the same order as values of fields at that location.
    fn grid(&self, location: Location) -> MeshResult<&na::DMatrix<f64>>;
    /// Area of every face (length in 2-D), stacked by axis.
    fn face_areas(&self) -> &na::DVector<f64>;
    /// Unit normal of every face as a `(face_count, dim)` matrix.
    fn face_normals(&self) -> &na::DMatrix<f64>;
    /// Length of every edge, stacked by axis.
    fn edge_lengths(&self) -> &na::DVector<f64>;
    /// Unit tangent of every edge as an `(edge_count, dim)` matrix.
    fn edge_tangents(&self) -> &na::DMatrix<f64>;
    /// Averaging operators for the mesh shape.
    fn averaging(&self) -> &Averaging;

    /// Number of cells along each axis.
    fn shape(&self) -> &[usize] {
        self.topology().shape()
    }

    /// The leading `dim x dim` block of the reference frame's rotation matrix,
    /// whose rows are the local axis directions.
    fn rotation_matrix(&self) -> na::DMatrix<f64> {
        let dim = self.topology().dim();
        let full = self.reference_frame().rotation_matrix();
        na::DMatrix::from_fn(dim, dim, |row, col| full[(row, col)])
    }

    /// Whether the reference frame differs from the standard axes.
    fn is_rotated(&self) -> bool {
        self.reference_frame().is_rotated()
    }

    /// Whether this is a rotationally symmetric cylindrical mesh,
    /// i.e. a 3-D cylindrical mesh with a single cell in the azimuthal direction.
    ///
    /// Only the radial and vertical face components
    /// and the azimuthal edge component contribute to inner products on such meshes.
    fn is_axisymmetric(&self) -> bool {
        let topo = self.topology();
        self.coordinate_system() == CoordinateSystem::Cylindrical
            && topo.dim() == 3
            && topo.shape()[1] == 1
    }

    /// Project a `(face_count, dim)` vector field onto the face normals,
    /// giving the normal component on every face.
    fn project_face_vector(&self, face_vectors: &na::DMatrix<f64>) -> MeshResult<na::DVector<f64>> {
        project_rows(face_vectors, self.face_normals(), "face")
    }

    /// Project an `(edge_count, dim)` vector field onto the edge tangents,
    /// giving the tangential component on every edge.
    fn project_edge_vector(&self, edge_vectors: &na::DMatrix<f64>) -> MeshResult<na::DVector<f64>> {
        project_rows(edge_vectors, self.edge_tangents(), "edge")
    }

    /// Get an [`OperatorBuilder`] for this mesh.
    fn operators(&self) -> OperatorBuilder<'_, Self>
    where
        Self: Sized,
    {
        OperatorBuilder::new(self)
    }
}

/// Fields common to every mesh kind.
#[derive(Clone, Debug)]
pub(crate) struct MeshBase {
    pub topology: Topology,
    pub origin: Vec<f64>,
    pub frame: ReferenceFrame,
    pub coordinate_system: CoordinateSystem,
}

impl MeshBase {
    /// Check that a new origin fits the mesh.
    pub fn check_origin(&self, origin: &[f64]) -> MeshResult<()> {
        if origin.len() != self.topology.dim() {
            return Err(MeshError::Shape(format!(
                "origin must have {} entries, got {}",
                self.topology.dim(),
                origin.len()
            )));
        }
        if let Some(bad) = origin.iter().find(|x| !x.is_finite()) {
            return Err(MeshError::Geometry(format!("origin must be finite, got {bad}")));
        }
        Ok(())
    }

    /// Check that a reassigned shape agrees with the mesh.
    ///
    /// Both mesh kinds are backed by arrays that fix the shape,
    /// so this only succeeds for the current shape.
    pub fn check_shape(&self, shape: &[usize]) -> MeshResult<()> {
        if shape.len() != self.topology.dim() {
            return Err(MeshError::Dimension(format!(
                "cannot change a {}-D mesh into a {}-D one",
                self.topology.dim(),
                shape.len()
            )));
        }
        if shape != self.topology.shape() {
            return Err(MeshError::Shape(format!(
                "shape {shape:?} disagrees with the mesh's {:?}",
                self.topology.shape()
            )));
        }
        Ok(())
    }
}

/// Lazily computed point grids, one slot per [`Location`].
#[derive(Clone, Debug, Default)]
pub(crate) struct GridCache {
    slots: [OnceLock<na::DMatrix<f64>>; 13],
}

impl GridCache {
    /// Get the grid of a location, computing it with `compute` on first access.
    pub fn get_or_try_init(
        &self,
        location: Location,
        compute: impl FnOnce() -> MeshResult<na::DMatrix<f64>>,
    ) -> MeshResult<&na::DMatrix<f64>> {
        let slot = &self.slots[location.index()];
        if let Some(grid) = slot.get() {
            return Ok(grid);
        }
        let grid = compute()?;
        log::debug!("computed {location} grid with {} points", grid.nrows());
        Ok(slot.get_or_init(|| grid))
    }
}

/// Points of every component of faces or edges, stacked by axis.
pub(crate) fn stacked_grid<'a>(
    components: impl Iterator<Item = MeshResult<&'a na::DMatrix<f64>>>,
    dim: usize,
) -> MeshResult<na::DMatrix<f64>> {
    let blocks = components.collect::<MeshResult<Vec<_>>>()?;
    let nrows = blocks.iter().map(|b| b.nrows()).sum();
    let mut ret = na::DMatrix::zeros(nrows, dim);
    let mut start = 0;
    for block in blocks {
        ret.rows_mut(start, block.nrows()).copy_from(block);
        start += block.nrows();
    }
    Ok(ret)
}

/// The error for a component location the mesh doesn't have.
pub(crate) fn missing_component(location: Location, dim: usize) -> MeshError {
    MeshError::Dimension(format!("a mesh with {dim} axes has no {location}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rotation_block_matches_dimension() {
        let frame =
            ReferenceFrame::from_arrays([0., 1., 0.], [-1., 0., 0.], [0., 0., 1.]).unwrap();
        let mesh = TensorMesh::builder()
            .h(vec![vec![1.0], vec![1.0]])
            .reference_frame(frame)
            .build()
            .unwrap();
        assert!(mesh.is_rotated());
        let rot = mesh.rotation_matrix();
        assert_eq!(rot.shape(), (2, 2));
        assert_relative_eq!(rot[(0, 1)], 1.0);
        assert_relative_eq!(rot[(1, 0)], -1.0);
    }

    #[test]
    fn projections_pick_normal_components() {
        let mesh = tiny_tensor_mesh_2d();
        let topo = mesh.topology();
        let n_fx = topo.face_count_axis(0).unwrap();
        let field = na::DMatrix::from_fn(topo.face_count(), 2, |_, col| (col + 1) as f64);
        let projected = mesh.project_face_vector(&field).unwrap();
        assert!(projected.rows(0, n_fx).iter().all(|&v| v == 1.0));
        assert!(projected.rows(n_fx, topo.face_count() - n_fx).iter().all(|&v| v == 2.0));

        let curvi = tiny_curvilinear_mesh_2d();
        let edges = na::DMatrix::from_element(curvi.topology().edge_count(), 2, 1.0);
        let projected = curvi.project_edge_vector(&edges).unwrap();
        assert_eq!(projected.len(), curvi.topology().edge_count());
        assert!(curvi
            .project_edge_vector(&na::DMatrix::zeros(1, 2))
            .is_err());
    }

    #[test]
    fn shape_reassignment() {
        let mut mesh = tiny_tensor_mesh_2d();
        let shape = mesh.shape().to_vec();
        assert!(mesh.set_shape(&shape).is_ok());
        assert!(matches!(mesh.set_shape(&[3]), Err(MeshError::Dimension(_))));
        assert!(matches!(mesh.set_shape(&[9, 9]), Err(MeshError::Shape(_))));

        let mut curvi = tiny_curvilinear_mesh_3d();
        assert!(matches!(curvi.set_shape(&[1, 1]), Err(MeshError::Dimension(_))));
        assert!(matches!(curvi.set_origin(&[0.0, 0.0]), Err(MeshError::Shape(_))));
    }
}
