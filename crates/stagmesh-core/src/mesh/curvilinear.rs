//! Logically rectangular meshes with arbitrary node positions.
//!
//! Cells are quadrilaterals in 2-D and hexahedra in 3-D, given by the
//! node coordinates at their corners. Corners of the cell (or face, edge)
//! at logical index `(i, j, k)` are named by their offsets:
//!
//! ```text
//!     A (0,0,0)  B (0,1,0)  C (1,1,0)  D (1,0,0)
//!     E (0,0,1)  F (0,1,1)  G (1,1,1)  H (1,0,1)
//! ```

use itertools::Itertools;
use nalgebra as na;
use ndarray as nd;
use std::sync::OnceLock;

use super::{missing_component, stacked_grid, GridCache, GridSource, MeshBase};
use crate::{
    error::Validator, reshape::flatten_column_major, Averaging, CoordinateSystem, Location,
    MeshError, MeshFields, MeshResult, NodeArray, OriginEntry, ReferenceFrame, Topology,
    ValidationErrors,
};

/// A structured mesh defined by the positions of its nodes.
///
/// Construct with [`CurvilinearMesh::new`], [`CurvilinearMesh::builder`]
/// or from [`MeshFields`]. Volumes, face areas and normals, and edge lengths and tangents
/// are computed from the node positions the first time they are asked for.
#[derive(Clone, Debug)]
pub struct CurvilinearMesh {
    base: MeshBase,
    nodes: Vec<nd::ArrayD<f64>>,
    /// Node positions, one row per node in column-major order.
    grid_n: na::DMatrix<f64>,
    averaging: Averaging,
    grids: GridCache,
    cell_volumes: OnceLock<na::DVector<f64>>,
    faces: OnceLock<(na::DVector<f64>, na::DMatrix<f64>)>,
    edges: OnceLock<(na::DVector<f64>, na::DMatrix<f64>)>,
}

#[derive(Clone, Copy, Debug)]
enum Corner {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl Corner {
    fn offset(self) -> [usize; 3] {
        match self {
            Corner::A => [0, 0, 0],
            Corner::B => [0, 1, 0],
            Corner::C => [1, 1, 0],
            Corner::D => [1, 0, 0],
            Corner::E => [0, 0, 1],
            Corner::F => [0, 1, 1],
            Corner::G => [1, 1, 1],
            Corner::H => [1, 0, 1],
        }
    }

    /// The corner one step along `axis` from A.
    fn along(axis: usize) -> Self {
        match axis {
            0 => Corner::D,
            1 => Corner::B,
            _ => Corner::E,
        }
    }
}

impl CurvilinearMesh {
    /// Create a mesh from node coordinate arrays with default settings.
    ///
    /// Equivalent to `CurvilinearMesh::builder(nodes).build()`.
    pub fn new(nodes: Vec<nd::ArrayD<f64>>) -> Result<Self, ValidationErrors> {
        Self::builder(nodes).build()
    }

    /// Start building a mesh from node coordinate arrays,
    /// one per axis, each indexed by the logical node index.
    pub fn builder(nodes: Vec<nd::ArrayD<f64>>) -> CurvilinearMeshBuilder {
        CurvilinearMeshBuilder {
            nodes,
            shape: None,
            origin: None,
            axes: [None; 3],
            frame: None,
            coordinate_system: CoordinateSystem::default(),
        }
    }

    fn from_parts(base: MeshBase, nodes: Vec<nd::ArrayD<f64>>) -> Self {
        let averaging = Averaging::new(base.topology.clone());
        let grid_n = node_grid(&nodes, base.topology.node_count());
        Self {
            base,
            nodes,
            grid_n,
            averaging,
            grids: GridCache::default(),
            cell_volumes: OnceLock::new(),
            faces: OnceLock::new(),
            edges: OnceLock::new(),
        }
    }

    /// Node coordinate arrays, one per axis.
    #[inline]
    pub fn nodes(&self) -> &[nd::ArrayD<f64>] {
        &self.nodes
    }

    /// Translate the mesh so that its first node is at `origin`.
    ///
    /// Fails with [`MeshError::Shape`] if `origin` has the wrong length.
    pub fn set_origin(&mut self, origin: &[f64]) -> MeshResult<()> {
        self.base.check_origin(origin)?;
        for (axis, (&new, old)) in origin.iter().zip(&self.base.origin).enumerate() {
            let shift = new - old;
            self.nodes[axis].mapv_inplace(|x| x + shift);
            self.grid_n.column_mut(axis).add_scalar_mut(shift);
        }
        self.base.origin = origin.to_vec();
        self.grids = GridCache::default();
        Ok(())
    }

    /// Reassign the shape of the mesh.
    ///
    /// The shape is fixed by the node arrays, so this only succeeds
    /// for the current shape.
    pub fn set_shape(&mut self, shape: &[usize]) -> MeshResult<()> {
        self.base.check_shape(shape)
    }

    /// The fields that rebuild this mesh with [`MeshFields::build`].
    pub fn to_fields(&self) -> MeshFields {
        let frame = &self.base.frame;
        MeshFields {
            shape: Some(self.base.topology.shape().to_vec()),
            origin: Some(self.base.origin.iter().map(|&x| OriginEntry::Value(x)).collect()),
            h: None,
            nodes: Some(self.nodes.iter().map(NodeArray::from_array).collect()),
            axis_u: Some(frame.u().into()),
            axis_v: Some(frame.v().into()),
            axis_w: Some(frame.w().into()),
            coordinate_system: Some(self.base.coordinate_system.name().to_string()),
        }
    }

    /// Position of one corner of every element in a logical grid of the given extents,
    /// padded with zeros to three components.
    fn corner_points(&self, extents: &[usize], corner: Corner) -> Vec<na::Vector3<f64>> {
        let node_shape = self.base.topology.node_shape();
        let dim = node_shape.len();
        let offset = corner.offset();
        column_major_indices(extents)
            .map(|idx| {
                let multi = idx.iter().zip(offset).map(|(i, o)| i + o).collect_vec();
                let row = Topology::flat_index(&node_shape, &multi);
                na::Vector3::from_fn(|axis, _| {
                    if axis < dim {
                        self.grid_n[(row, axis)]
                    } else {
                        0.0
                    }
                })
            })
            .collect()
    }

    /// Points of a single-component location, each the mean of the nodes
    /// it lies between along its non-nodal axes.
    fn corner_average(&self, location: Location) -> MeshResult<na::DMatrix<f64>> {
        let topo = &self.base.topology;
        let dim = topo.dim();
        let (Some(extents), Some(nodal)) = (topo.location_shape(location), location.nodal_axes())
        else {
            return Err(missing_component(location, dim));
        };
        let offsets = (0..dim)
            .map(|axis| if nodal[axis] { 0..1 } else { 0..2 })
            .multi_cartesian_product()
            .collect_vec();
        let node_shape = topo.node_shape();

        let mut ret = na::DMatrix::zeros(extents.iter().product(), dim);
        for (row, idx) in column_major_indices(&extents).enumerate() {
            for offset in &offsets {
                let multi = idx.iter().zip(offset).map(|(i, o)| i + o).collect_vec();
                let node = Topology::flat_index(&node_shape, &multi);
                for axis in 0..dim {
                    ret[(row, axis)] += self.grid_n[(node, axis)];
                }
            }
        }
        ret /= offsets.len() as f64;
        Ok(ret)
    }

    fn compute_volumes(&self) -> na::DVector<f64> {
        let extents = self.base.topology.cell_shape();
        let corner = |c| self.corner_points(&extents, c);
        if extents.len() == 2 {
            let polygon = [Corner::A, Corner::D, Corner::C, Corner::B].map(corner);
            let vols = (0..extents.iter().product()).map(|cell| {
                let doubled: f64 = (0..4)
                    .map(|i| {
                        let (p, q) = (polygon[i][cell], polygon[(i + 1) % 4][cell]);
                        p.x * q.y - q.x * p.y
                    })
                    .sum();
                doubled / 2.0
            });
            return na::DVector::from_iterator(self.base.topology.cell_count(), vols);
        }

        use Corner::*;
        let pts = [A, B, C, D, E, F, G, H].map(corner);
        let p = |c: Corner, cell: usize| pts[c as usize][cell];
        let tets = |list: &[[Corner; 4]], cell: usize| -> f64 {
            list.iter()
                .map(|t| tetra_volume(p(t[0], cell), p(t[1], cell), p(t[2], cell), p(t[3], cell)))
                .sum()
        };
        let first = [
            [A, B, D, E],
            [B, E, F, G],
            [B, D, E, G],
            [B, C, D, G],
            [D, E, G, H],
        ];
        let second = [
            [A, F, B, C],
            [A, E, F, H],
            [A, H, F, C],
            [C, H, D, A],
            [C, G, H, F],
        ];
        let vols = (0..extents.iter().product())
            .map(|cell| (tets(&first, cell) + tets(&second, cell)) / 2.0);
        na::DVector::from_iterator(self.base.topology.cell_count(), vols)
    }

    /// Areas and unit normals of every face.
    fn face_info(&self) -> &(na::DVector<f64>, na::DMatrix<f64>) {
        self.faces.get_or_init(|| {
            log::debug!("computing curvilinear face areas and normals");
            let topo = &self.base.topology;
            let dim = topo.dim();
            let parts = (0..dim)
                .map(|axis| {
                    let extents = topo.face_shape(axis).unwrap_or_default();
                    if dim == 2 {
                        // the face is the edge between two nodes, rotated clockwise
                        let (from, to) = match axis {
                            0 => (Corner::A, Corner::B),
                            _ => (Corner::D, Corner::A),
                        };
                        self.segments(&extents, from, to)
                            .into_iter()
                            .map(|e| (e.norm(), na::Vector3::new(e.y, -e.x, 0.0)))
                            .collect_vec()
                    } else {
                        use Corner::*;
                        let quad = match axis {
                            0 => [A, E, F, B],
                            1 => [A, D, H, E],
                            _ => [A, B, C, D],
                        };
                        self.quad_info(&extents, quad)
                    }
                })
                .collect_vec();
            stack_directions(parts, dim)
        })
    }

    /// Lengths and unit tangents of every edge.
    fn edge_info(&self) -> &(na::DVector<f64>, na::DMatrix<f64>) {
        self.edges.get_or_init(|| {
            log::debug!("computing curvilinear edge lengths and tangents");
            let topo = &self.base.topology;
            let dim = topo.dim();
            let parts = (0..dim)
                .map(|axis| {
                    let extents = topo.edge_shape(axis).unwrap_or_default();
                    self.segments(&extents, Corner::A, Corner::along(axis))
                        .into_iter()
                        .map(|e| (e.norm(), e))
                        .collect_vec()
                })
                .collect_vec();
            stack_directions(parts, dim)
        })
    }

    fn segments(&self, extents: &[usize], from: Corner, to: Corner) -> Vec<na::Vector3<f64>> {
        let start = self.corner_points(extents, from);
        let end = self.corner_points(extents, to);
        end.iter().zip(&start).map(|(e, s)| e - s).collect()
    }

    /// Area and summed corner normal of quadrilaterals with corners in order `quad`.
    ///
    /// The area is the mean of the parallelogram areas at the four corners.
    fn quad_info(&self, extents: &[usize], quad: [Corner; 4]) -> Vec<(f64, na::Vector3<f64>)> {
        let pts = quad.map(|c| self.corner_points(extents, c));
        (0..pts[0].len())
            .map(|face| {
                let corner_normals = (0..4).map(|i| {
                    let cur = pts[i][face];
                    let prev = pts[(i + 3) % 4][face];
                    let next = pts[(i + 1) % 4][face];
                    (prev - cur).cross(&(next - cur))
                });
                let (area, normal) = corner_normals.fold(
                    (0.0, na::Vector3::zeros()),
                    |(area, normal), n| (area + n.norm(), normal + n),
                );
                (area / 4.0, normal)
            })
            .collect()
    }
}

impl GridSource for CurvilinearMesh {
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

    fn cell_volumes(&self) -> &na::DVector<f64> {
        self.cell_volumes.get_or_init(|| {
            log::debug!("computing curvilinear cell volumes");
            self.compute_volumes()
        })
    }

    fn grid(&self, location: Location) -> MeshResult<&na::DMatrix<f64>> {
        let dim = self.base.topology.dim();
        if location.axis().is_some_and(|a| a >= dim) {
            return Err(missing_component(location, dim));
        }
        match location {
            Location::Nodes => Ok(&self.grid_n),
            Location::CellCenters => self.grids.get_or_try_init(location, || {
                Ok(self.averaging.node_to_cc() * &self.grid_n)
            }),
            Location::CellVectorsX | Location::CellVectorsY | Location::CellVectorsZ => {
                self.grid(Location::CellCenters)
            }
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
            _ => self
                .grids
                .get_or_try_init(location, || self.corner_average(location)),
        }
    }

    /// In 3-D, the area of a face is the mean of the magnitudes
    /// of the cross products at its four corners.
    fn face_areas(&self) -> &na::DVector<f64> {
        &self.face_info().0
    }

    fn face_normals(&self) -> &na::DMatrix<f64> {
        &self.face_info().1
    }

    fn edge_lengths(&self) -> &na::DVector<f64> {
        &self.edge_info().0
    }

    fn edge_tangents(&self) -> &na::DMatrix<f64> {
        &self.edge_info().1
    }

    #[inline]
    fn averaging(&self) -> &Averaging {
        &self.averaging
    }
}

/// Multi-indices of a grid in column-major order.
fn column_major_indices(extents: &[usize]) -> impl Iterator<Item = Vec<usize>> + '_ {
    extents
        .iter()
        .rev()
        .map(|&n| 0..n)
        .multi_cartesian_product()
        .map(|mut idx| {
            idx.reverse();
            idx
        })
}

fn node_grid(nodes: &[nd::ArrayD<f64>], node_count: usize) -> na::DMatrix<f64> {
    let mut ret = na::DMatrix::zeros(node_count, nodes.len());
    for (axis, arr) in nodes.iter().enumerate() {
        ret.set_column(axis, &flatten_column_major(arr));
    }
    ret
}

/// Volume of the tetrahedron with the given corners.
fn tetra_volume(
    a: na::Vector3<f64>,
    b: na::Vector3<f64>,
    c: na::Vector3<f64>,
    d: na::Vector3<f64>,
) -> f64 {
    na::Matrix3::from_columns(&[a - d, b - d, c - d])
        .determinant()
        .abs()
        / 6.0
}

/// Stack per-axis measures and directions into a vector of magnitudes
/// and a `(count, dim)` matrix of unit directions.
fn stack_directions(
    parts: Vec<Vec<(f64, na::Vector3<f64>)>>,
    dim: usize,
) -> (na::DVector<f64>, na::DMatrix<f64>) {
    let count = parts.iter().map(|p| p.len()).sum();
    let mut measures = na::DVector::zeros(count);
    let mut directions = na::DMatrix::zeros(count, dim);
    for (row, (measure, dir)) in parts.into_iter().flatten().enumerate() {
        measures[row] = measure;
        let norm = dir.norm();
        if norm > 0.0 {
            for axis in 0..dim {
                directions[(row, axis)] = dir[axis] / norm;
            }
        }
    }
    (measures, directions)
}

/// Builder for [`CurvilinearMesh`].
///
/// Every field is validated when [`build`][Self::build] is called,
/// and all problems are reported together.
#[derive(Clone, Debug)]
pub struct CurvilinearMeshBuilder {
    nodes: Vec<nd::ArrayD<f64>>,
    shape: Option<Vec<usize>>,
    origin: Option<Vec<f64>>,
    axes: [Option<[f64; 3]>; 3],
    frame: Option<ReferenceFrame>,
    coordinate_system: CoordinateSystem,
}

impl CurvilinearMeshBuilder {
    /// Require the mesh to have this shape,
    /// i.e. one less than the node arrays' shape along every axis.
    pub fn shape(mut self, shape: Vec<usize>) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Translate the nodes so that the first one is at `origin`.
    pub fn origin(mut self, origin: Vec<f64>) -> Self {
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
    pub fn build(self) -> Result<CurvilinearMesh, ValidationErrors> {
        let mut v = Validator::default();

        let nodes = v.check("nodes", validate_nodes(self.nodes));
        let topology = nodes.as_ref().and_then(|nodes| {
            let shape = nodes[0].shape().iter().map(|n| n - 1).collect_vec();
            v.check("nodes", Topology::new(&shape))
        });

        if let (Some(wanted), Some(topo)) = (&self.shape, &topology) {
            if wanted.as_slice() != topo.shape() {
                v.push(
                    "shape",
                    MeshError::Shape(format!(
                        "shape {wanted:?} disagrees with the node arrays' {:?} cells",
                        topo.shape()
                    )),
                );
            }
        }

        let frame = self
            .frame
            .map(Some)
            .unwrap_or_else(|| super::fields::frame_from_axes(&mut v, self.axes));

        let mut nodes = nodes;
        let origin = match (&mut nodes, self.origin) {
            (Some(nodes), Some(origin)) => v
                .check("origin", translate_nodes(nodes, &origin))
                .map(|_| origin),
            (Some(nodes), None) => Some(
                nodes
                    .iter()
                    .map(|arr| arr.first().copied().unwrap_or_default())
                    .collect_vec(),
            ),
            (None, _) => None,
        };

        v.finish(|| {
            let base = MeshBase {
                topology: topology?,
                origin: origin?,
                frame: frame?,
                coordinate_system: self.coordinate_system,
            };
            Some(CurvilinearMesh::from_parts(base, nodes?))
        })
    }
}

fn validate_nodes(nodes: Vec<nd::ArrayD<f64>>) -> MeshResult<Vec<nd::ArrayD<f64>>> {
    let dim = nodes.len();
    if !(2..=3).contains(&dim) {
        return Err(MeshError::Dimension(format!(
            "node coordinates must be given for 2 or 3 axes, got {dim}"
        )));
    }
    let shape = nodes[0].shape().to_vec();
    for (axis, arr) in nodes.iter().enumerate() {
        if arr.ndim() != dim {
            return Err(MeshError::Dimension(format!(
                "node array {axis} has {} axes, expected {dim}",
                arr.ndim()
            )));
        }
        if arr.shape() != shape.as_slice() {
            return Err(MeshError::Shape(format!(
                "node array {axis} has shape {:?}, expected {shape:?}",
                arr.shape()
            )));
        }
        if let Some(bad) = arr.iter().find(|x| !x.is_finite()) {
            return Err(MeshError::Geometry(format!(
                "node coordinates must be finite, array {axis} has {bad}"
            )));
        }
    }
    if shape.iter().any(|&n| n < 2) {
        return Err(MeshError::Shape(format!(
            "every axis needs at least two nodes, got {shape:?}"
        )));
    }
    Ok(nodes)
}

fn translate_nodes(nodes: &mut [nd::ArrayD<f64>], origin: &[f64]) -> MeshResult<()> {
    if origin.len() != nodes.len() {
        return Err(MeshError::Shape(format!(
            "origin must have {} entries, got {}",
            nodes.len(),
            origin.len()
        )));
    }
    if let Some(bad) = origin.iter().find(|x| !x.is_finite()) {
        return Err(MeshError::Geometry(format!("origin must be finite, got {bad}")));
    }
    for (arr, &x0) in nodes.iter_mut().zip(origin) {
        let shift = x0 - arr.first().copied().unwrap_or_default();
        arr.mapv_inplace(|x| x + shift);
    }
    Ok(())
}
