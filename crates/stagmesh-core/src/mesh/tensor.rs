//! Axis-aligned meshes defined by cell widths along each axis.

use itertools::Itertools;
use nalgebra as na;
use std::sync::OnceLock;

use super::{missing_component, stacked_grid, GridCache, GridSource, MeshBase};
use crate::{
    error::Validator, Averaging, CoordinateSystem, ElementKind, Location, MeshError, MeshFields,
    MeshResult, OriginEntry, ReferenceFrame, Topology, ValidationErrors,
};

/// A mesh whose cells are the tensor product of 1-D cell widths along each axis.
///
/// Construct with [`TensorMesh::builder`] or from [`MeshFields`].
/// Geometric quantities are computed the first time they are asked for
/// and cached for the lifetime of the mesh.
#[derive(Clone, Debug)]
pub struct TensorMesh {
    base: MeshBase,
    h: Vec<na::DVector<f64>>,
    averaging: Averaging,
    grids: GridCache,
    cell_volumes: OnceLock<na::DVector<f64>>,
    h_gridded: OnceLock<na::DMatrix<f64>>,
    face_areas: OnceLock<na::DVector<f64>>,
    edge_lengths: OnceLock<na::DVector<f64>>,
    face_normals: OnceLock<na::DMatrix<f64>>,
    edge_tangents: OnceLock<na::DMatrix<f64>>,
}

impl TensorMesh {
    /// Start building a tensor mesh.
    pub fn builder() -> TensorMeshBuilder {
        TensorMeshBuilder::default()
    }

    fn from_parts(base: MeshBase, h: Vec<na::DVector<f64>>) -> Self {
        let averaging = Averaging::new(base.topology.clone());
        Self {
            base,
            h,
            averaging,
            grids: GridCache::default(),
            cell_volumes: OnceLock::new(),
            h_gridded: OnceLock::new(),
            face_areas: OnceLock::new(),
            edge_lengths: OnceLock::new(),
            face_normals: OnceLock::new(),
            edge_tangents: OnceLock::new(),
        }
    }

    /// Cell widths along each axis.
    #[inline]
    pub fn h(&self) -> &[na::DVector<f64>] {
        &self.h
    }

    /// Positions of the nodes along one axis,
    /// or None if the mesh doesn't have that axis.
    pub fn node_vector(&self, axis: usize) -> Option<na::DVector<f64>> {
        let h = self.h.get(axis)?;
        let x0 = self.base.origin[axis];
        let positions = std::iter::once(x0).chain(h.iter().scan(x0, |acc, &w| {
            *acc += w;
            Some(*acc)
        }));
        Some(na::DVector::from_iterator(h.len() + 1, positions))
    }

    /// Positions of the cell centers along one axis,
    /// or None if the mesh doesn't have that axis.
    pub fn center_vector(&self, axis: usize) -> Option<na::DVector<f64>> {
        let nodes = self.node_vector(axis)?;
        let h = &self.h[axis];
        Some(na::DVector::from_fn(h.len(), |i, _| nodes[i] + 0.5 * h[i]))
    }

    /// The per-axis coordinate vectors whose tensor product gives
    /// the grid of a single-component location.
    ///
    /// `CellVectors*` locations give the cell-center tensors.
    /// Fails for `Faces` and `Edges`, which aren't tensor products,
    /// and for components along axes the mesh doesn't have.
    pub fn axis_tensors(&self, location: Location) -> MeshResult<Vec<na::DVector<f64>>> {
        let dim = self.base.topology.dim();
        let nodal = location.nodal_axes().ok_or_else(|| {
            MeshError::Shape(format!(
                "{location} has several components, which don't form a single tensor grid"
            ))
        })?;
        if location.axis().is_some_and(|a| a >= dim) {
            return Err(missing_component(location, dim));
        }
        (0..dim)
            .map(|axis| {
                if nodal[axis] {
                    self.node_vector(axis)
                } else {
                    self.center_vector(axis)
                }
                .ok_or_else(|| {
                    MeshError::InternalInvariant(format!("cell widths missing for axis {axis}"))
                })
            })
            .collect()
    }

    /// Width of every cell along every axis, as a `(cell_count, dim)` matrix.
    pub fn h_gridded(&self) -> &na::DMatrix<f64> {
        self.h_gridded.get_or_init(|| {
            log::debug!("computing gridded cell widths");
            ndgrid(&self.h)
        })
    }

    /// Move the mesh so that its first node is at `origin`.
    ///
    /// Fails with [`MeshError::Shape`] if `origin` has the wrong length.
    /// Cached point grids are discarded.
    pub fn set_origin(&mut self, origin: &[f64]) -> MeshResult<()> {
        self.base.check_origin(origin)?;
        self.base.origin = origin.to_vec();
        self.grids = GridCache::default();
        Ok(())
    }

    /// Reassign the shape of the mesh.
    ///
    /// The shape is fixed by the cell widths, so this only succeeds
    /// for the current shape. A different number of axes is a
    /// [`MeshError::Dimension`] error, any other difference a [`MeshError::Shape`] error.
    pub fn set_shape(&mut self, shape: &[usize]) -> MeshResult<()> {
        self.base.check_shape(shape)
    }

    /// The fields that rebuild this mesh with [`MeshFields::build`].
    pub fn to_fields(&self) -> MeshFields {
        let frame = &self.base.frame;
        MeshFields {
            shape: Some(self.base.topology.shape().to_vec()),
            origin: Some(self.base.origin.iter().map(|&x| OriginEntry::Value(x)).collect()),
            h: Some(self.h.iter().map(|h| h.iter().cloned().collect()).collect()),
            nodes: None,
            axis_u: Some(frame.u().into()),
            axis_v: Some(frame.v().into()),
            axis_w: Some(frame.w().into()),
            coordinate_system: Some(self.base.coordinate_system.name().to_string()),
        }
    }

    /// Product of the cell widths over the axes where `location` is not nodal,
    /// i.e. face areas or edge lengths of one component.
    fn component_measure(&self, location: Location) -> MeshResult<na::DVector<f64>> {
        let dim = self.base.topology.dim();
        let nodal = location
            .nodal_axes()
            .ok_or_else(|| missing_component(location, dim))?;
        let factors = (0..dim)
            .map(|axis| {
                if nodal[axis] {
                    na::DVector::from_element(self.h[axis].len() + 1, 1.0)
                } else {
                    self.h[axis].clone()
                }
            })
            .collect_vec();
        Ok(tensor_product(&factors))
    }

    fn stacked_measure(&self, kind: ElementKind) -> na::DVector<f64> {
        let parts = (0..self.base.topology.dim())
            .filter_map(|axis| kind.component(axis))
            .filter_map(|loc| self.component_measure(loc).ok())
            .collect_vec();
        let len = parts.iter().map(|p| p.len()).sum();
        na::DVector::from_iterator(len, parts.iter().flat_map(|p| p.iter().cloned()))
    }
}

impl GridSource for TensorMesh {
    #[inline]
    fn topology(&self) -> &Topology {
        &self.base.topology
    }

    #[inline]
    fn coordinate_system(&self) -> CoordinateSystem {
        self.base.coordinate_system
    }

    #[inline]
    fn origin(&self) -> &[f64] {
        &self.base.origin
    }

    #[inline]
    fn reference_frame(&self) -> &ReferenceFrame {
        &self.base.frame
    }

    /// Products of the cell widths.
    ///
    /// The widths are used as they are for every coordinate system:
    /// no `r dθ` or spherical metric factors are applied,
    /// so on cylindrical and spherical meshes these are volumes
    /// in the space of the coordinates, not physical volumes.
    fn cell_volumes(&self) -> &na::DVector<f64> {
        self.cell_volumes.get_or_init(|| {
            log::debug!("computing tensor mesh cell volumes");
            tensor_product(&self.h)
        })
    }

    fn grid(&self, location: Location) -> MeshResult<&na::DMatrix<f64>> {
        let dim = self.base.topology.dim();
        match location {
            Location::Faces | Location::Edges => self.grids.get_or_try_init(location, || {
                let kind = location.element_kind().ok_or_else(|| {
                    MeshError::InternalInvariant(format!("{location} is not faces or edges"))
                })?;
                stacked_grid(
                    (0..dim)
                        .filter_map(|axis| kind.component(axis))
                        .map(|loc| self.grid(loc)),
                    dim,
                )
            }),
            Location::CellVectorsX | Location::CellVectorsY | Location::CellVectorsZ => {
                if location.axis().is_some_and(|a| a >= dim) {
                    return Err(missing_component(location, dim));
                }
                self.grid(Location::CellCenters)
            }
            _ => self
                .grids
                .get_or_try_init(location, || Ok(ndgrid(&self.axis_tensors(location)?))),
        }
    }

    fn face_areas(&self) -> &na::DVector<f64> {
        self.face_areas.get_or_init(|| {
            log::debug!("computing tensor mesh face areas");
            self.stacked_measure(ElementKind::Face)
        })
    }

    fn face_normals(&self) -> &na::DMatrix<f64> {
        self.face_normals
            .get_or_init(|| self.base.topology.face_normals())
    }

    fn edge_lengths(&self) -> &na::DVector<f64> {
        self.edge_lengths.get_or_init(|| {
            log::debug!("computing tensor mesh edge lengths");
            self.stacked_measure(ElementKind::Edge)
        })
    }

    fn edge_tangents(&self) -> &na::DMatrix<f64> {
        self.edge_tangents
            .get_or_init(|| self.base.topology.edge_tangents())
    }

    #[inline]
    fn averaging(&self) -> &Averaging {
        &self.averaging
    }
}

/// All combinations of the entries of per-axis vectors,
/// one row per combination with the first axis varying fastest.
pub(crate) fn ndgrid(tensors: &[na::DVector<f64>]) -> na::DMatrix<f64> {
    let extents = tensors.iter().map(|t| t.len()).collect_vec();
    let count: usize = extents.iter().product();
    let mut ret = na::DMatrix::zeros(count, tensors.len());
    let mut stride = 1;
    for (axis, tensor) in tensors.iter().enumerate() {
        for (row, val) in ret.column_mut(axis).iter_mut().enumerate() {
            *val = tensor[(row / stride) % extents[axis]];
        }
        stride *= extents[axis];
    }
    ret
}

/// Products of all combinations of the entries of per-axis vectors,
/// with the first axis varying fastest.
pub(crate) fn tensor_product(factors: &[na::DVector<f64>]) -> na::DVector<f64> {
    let grid = ndgrid(factors);
    na::DVector::from_iterator(grid.nrows(), grid.row_iter().map(|row| row.product()))
}

/// Builder for [`TensorMesh`].
///
/// Every field is validated when [`build`][Self::build] is called,
/// and all problems are reported together.
#[derive(Clone, Debug, Default)]
pub struct TensorMeshBuilder {
    h: Option<Vec<Vec<f64>>>,
    shape: Option<Vec<usize>>,
    origin: Option<Vec<OriginEntry>>,
    axes: [Option<[f64; 3]>; 3],
    frame: Option<ReferenceFrame>,
    coordinate_system: CoordinateSystem,
}

impl TensorMeshBuilder {
    /// Set the cell widths along each axis. Required.
    pub fn h(mut self, h: Vec<Vec<f64>>) -> Self {
        self.h = Some(h);
        self
    }

    /// Require the mesh to have this shape.
    /// The shape is otherwise taken from the cell widths.
    pub fn shape(mut self, shape: Vec<usize>) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Set the position of the first node. Defaults to zero.
    pub fn origin(mut self, origin: Vec<f64>) -> Self {
        self.origin = Some(origin.into_iter().map(OriginEntry::Value).collect());
        self
    }

    /// Set the origin with per-axis entries that may be anchors
    /// relative to the total mesh size.
    pub fn origin_entries(mut self, origin: Vec<OriginEntry>) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Set the direction of the first local axis.
    pub fn axis_u(mut self, u: [f64; 3]) -> Self {
        self.axes[0] = Some(u);
        self
    }

    /// Set the direction of the second local axis.
    pub fn axis_v(mut self, v: [f64; 3]) -> Self {
        self.axes[1] = Some(v);
        self
    }

    /// Set the direction of the third local axis.
    pub fn axis_w(mut self, w: [f64; 3]) -> Self {
        self.axes[2] = Some(w);
        self
    }

    /// Set an already validated reference frame,
    /// overriding any individual axes.
    pub fn reference_frame(mut self, frame: ReferenceFrame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Set the coordinate system. Defaults to cartesian.
    pub fn coordinate_system(mut self, cs: CoordinateSystem) -> Self {
        self.coordinate_system = cs;
        self
    }

    /// Validate the fields and create the mesh.
    pub fn build(self) -> Result<TensorMesh, ValidationErrors> {
        let mut v = Validator::default();

        let h = match self.h {
            Some(h) => v.check("h", validate_widths(h)),
            None => {
                v.push("h", MeshError::Shape("cell widths are required".into()));
                None
            }
        };
        let topology = h.as_ref().and_then(|h| {
            let shape = h.iter().map(|w| w.len()).collect_vec();
            v.check("h", Topology::new(&shape))
        });

        if let (Some(wanted), Some(topo)) = (&self.shape, &topology) {
            if wanted.as_slice() != topo.shape() {
                v.push(
                    "shape",
                    MeshError::Shape(format!(
                        "shape {wanted:?} disagrees with the cell widths' {:?}",
                        topo.shape()
                    )),
                );
            }
        }

        let origin = match (&h, self.origin) {
            (Some(h), Some(entries)) => v.check("origin", resolve_origin(&entries, h)),
            (Some(h), None) => Some(vec![0.0; h.len()]),
            (None, _) => None,
        };

        let frame = self
            .frame
            .map(Some)
            .unwrap_or_else(|| super::fields::frame_from_axes(&mut v, self.axes));

        v.finish(|| {
            let base = MeshBase {
                topology: topology?,
                origin: origin?,
                frame: frame?,
                coordinate_system: self.coordinate_system,
            };
            Some(TensorMesh::from_parts(base, h?))
        })
    }
}

fn validate_widths(h: Vec<Vec<f64>>) -> MeshResult<Vec<na::DVector<f64>>> {
    if h.is_empty() || h.len() > 3 {
        return Err(MeshError::Dimension(format!(
            "cell widths must be given for 1 to 3 axes, got {}",
            h.len()
        )));
    }
    for (axis, widths) in h.iter().enumerate() {
        if widths.is_empty() {
            return Err(MeshError::Shape(format!("axis {axis} has no cell widths")));
        }
        if let Some(bad) = widths.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(MeshError::Geometry(format!(
                "cell widths must be positive and finite, axis {axis} has {bad}"
            )));
        }
    }
    Ok(h.into_iter().map(na::DVector::from_vec).collect())
}

fn resolve_origin(entries: &[OriginEntry], h: &[na::DVector<f64>]) -> MeshResult<Vec<f64>> {
    if entries.len() != h.len() {
        return Err(MeshError::Shape(format!(
            "origin must have {} entries, got {}",
            h.len(),
            entries.len()
        )));
    }
    let origin = entries
        .iter()
        .zip(h)
        .map(|(entry, widths)| entry.resolve(widths.sum()))
        .collect_vec();
    if let Some(bad) = origin.iter().find(|x| !x.is_finite()) {
        return Err(MeshError::Geometry(format!("origin must be finite, got {bad}")));
    }
    Ok(origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mesh::tiny_tensor_mesh_3d, OriginAnchor};
    use approx::assert_relative_eq;

    #[test]
    fn unit_1d_mesh() {
        let mesh = TensorMesh::builder().h(vec![vec![1.0; 4]]).build().unwrap();
        let topo = mesh.topology();
        assert_eq!(topo.shape(), &[4]);
        assert_eq!(topo.cell_count(), 4);
        assert_eq!(topo.node_count(), 5);
        assert_eq!(
            mesh.node_vector(0).unwrap().as_slice(),
            &[0.0, 1.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(
            mesh.center_vector(0).unwrap().as_slice(),
            &[0.5, 1.5, 2.5, 3.5]
        );
        assert_eq!(mesh.node_vector(1), None);
    }

    #[test]
    fn unit_2d_counts() {
        let mesh = TensorMesh::builder()
            .h(vec![vec![1.0, 1.0], vec![1.0, 1.0]])
            .build()
            .unwrap();
        let topo = mesh.topology();
        assert_eq!(topo.cell_count(), 4);
        assert_eq!(topo.face_count_axis(0), Some(6));
        assert_eq!(topo.face_count_axis(1), Some(6));
        assert_eq!(topo.face_count(), 12);
    }

    #[test]
    fn grids_are_column_major() {
        let mesh = TensorMesh::builder()
            .h(vec![vec![1.0, 2.0], vec![1.0, 1.0, 1.0]])
            .origin(vec![10.0, 0.0])
            .build()
            .unwrap();
        let cc = mesh.grid(Location::CellCenters).unwrap();
        assert_eq!(cc.shape(), (6, 2));
        assert_eq!(cc.row(0).iter().cloned().collect_vec(), vec![10.5, 0.5]);
        assert_eq!(cc.row(1).iter().cloned().collect_vec(), vec![12.0, 0.5]);
        assert_eq!(cc.row(2).iter().cloned().collect_vec(), vec![10.5, 1.5]);

        let fy = mesh.grid(Location::FacesY).unwrap();
        assert_eq!(fy.nrows(), mesh.topology().face_count_axis(1).unwrap());
        assert_eq!(fy.row(2).iter().cloned().collect_vec(), vec![10.5, 1.0]);

        let faces = mesh.grid(Location::Faces).unwrap();
        assert_eq!(faces.nrows(), mesh.topology().face_count());
        assert_eq!(
            mesh.grid(Location::CellVectorsY).unwrap(),
            mesh.grid(Location::CellCenters).unwrap()
        );
        assert!(matches!(
            mesh.grid(Location::EdgesZ),
            Err(MeshError::Dimension(_))
        ));
    }

    #[test]
    fn cell_centers_are_inside_node_ranges() {
        let mesh = tiny_tensor_mesh_3d();
        let cc = mesh.grid(Location::CellCenters).unwrap();
        assert_eq!(cc.shape(), (mesh.topology().cell_count(), 3));
        for axis in 0..3 {
            let nodes = mesh.node_vector(axis).unwrap();
            assert!(cc
                .column(axis)
                .iter()
                .all(|&x| x > nodes.min() && x < nodes.max()));
        }
    }

    #[test]
    fn measures() {
        let mesh = tiny_tensor_mesh_3d();
        let topo = mesh.topology();
        let vol = mesh.cell_volumes();
        let total: f64 = mesh.h().iter().map(|h| h.sum()).product();
        assert_relative_eq!(vol.sum(), total, epsilon = 1e-12);

        assert_eq!(mesh.face_areas().len(), topo.face_count());
        assert_eq!(mesh.edge_lengths().len(), topo.edge_count());
        // x-faces of every node plane cover the y-z cross section
        let n_fx = topo.face_count_axis(0).unwrap();
        let yz: f64 = mesh.h()[1].sum() * mesh.h()[2].sum();
        assert_relative_eq!(
            mesh.face_areas().rows(0, n_fx).sum(),
            yz * (topo.shape()[0] + 1) as f64,
            epsilon = 1e-12
        );

        let hg = mesh.h_gridded();
        assert_eq!(hg.shape(), (topo.cell_count(), 3));
        let products = na::DVector::from_iterator(hg.nrows(), hg.row_iter().map(|r| r.product()));
        assert_relative_eq!(products, vol.clone(), epsilon = 1e-12);
    }

    #[test]
    fn cylindrical_volumes_are_width_products() {
        let h = vec![vec![1.0, 2.0], vec![0.5, 1.0], vec![3.0]];
        let cyl = TensorMesh::builder()
            .h(h.clone())
            .origin(vec![1.0, 0.0, 0.0])
            .coordinate_system(CoordinateSystem::Cylindrical)
            .build()
            .unwrap();
        let cart = TensorMesh::builder().h(h).build().unwrap();
        assert_eq!(cyl.cell_volumes(), cart.cell_volumes());
        // no radius factor, even away from the axis
        assert_relative_eq!(cyl.cell_volumes()[1], 2.0 * 0.5 * 3.0);
        assert_relative_eq!(cyl.cell_volumes().sum(), 3.0 * 1.5 * 3.0, epsilon = 1e-12);
    }

    #[test]
    fn origin_anchors_and_reassignment() {
        let mut mesh = TensorMesh::builder()
            .h(vec![vec![1.0, 3.0], vec![2.0]])
            .origin_entries(vec![
                OriginEntry::Anchor(OriginAnchor::Center),
                OriginEntry::Anchor(OriginAnchor::Negative),
            ])
            .build()
            .unwrap();
        assert_eq!(mesh.origin(), &[-2.0, -2.0]);
        let first = mesh.grid(Location::Nodes).unwrap().row(0).into_owned();
        assert_eq!(first.iter().cloned().collect_vec(), vec![-2.0, -2.0]);

        mesh.set_origin(&[1.0, 1.0]).unwrap();
        let first = mesh.grid(Location::Nodes).unwrap().row(0).into_owned();
        assert_eq!(first.iter().cloned().collect_vec(), vec![1.0, 1.0]);
        assert!(matches!(mesh.set_origin(&[0.0]), Err(MeshError::Shape(_))));
    }

    #[test]
    fn builder_reports_every_problem() {
        let errors = TensorMesh::builder()
            .h(vec![vec![1.0, -1.0]])
            .axis_u([1.0, 0.0, 0.0])
            .axis_v([0.0, 1.0, 0.0])
            .axis_w([1.0, 0.0, 0.0])
            .build()
            .unwrap_err();
        assert!(matches!(errors.for_field("h"), Some(MeshError::Geometry(_))));
        assert!(errors.any(|e| matches!(e, MeshError::Geometry(_))));
        assert_eq!(errors.errors().len(), 2);

        let errors = TensorMesh::builder()
            .h(vec![vec![1.0]; 4])
            .build()
            .unwrap_err();
        assert!(matches!(errors.for_field("h"), Some(MeshError::Dimension(_))));

        let errors = TensorMesh::builder()
            .h(vec![vec![1.0], vec![1.0]])
            .origin(vec![0.0])
            .shape(vec![2, 1])
            .build()
            .unwrap_err();
        assert!(errors.for_field("origin").is_some());
        assert!(errors.for_field("shape").is_some());

        assert!(TensorMesh::builder().build().is_err());
    }
}
