//! Named construction fields of a mesh, and the mesh they build.
//!
//! [`MeshFields`] is the serializable description of a mesh:
//! building it gives back a mesh equal to the one it was taken from,
//! with none of the cached geometry carried over.

use nalgebra as na;
use ndarray::{self as nd, ShapeBuilder};
use serde::{Deserialize, Serialize};

use super::{CurvilinearMesh, GridSource, TensorMesh};
use crate::{
    error::Validator, frame::normalize_axis, reshape::flatten_column_major, Averaging,
    CoordinateSystem, Location, MeshError, MeshResult, ReferenceFrame, Topology, ValidationErrors,
};

/// A named origin position relative to the total extent of an axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OriginAnchor {
    /// The mesh starts at zero.
    #[serde(rename = "0")]
    Zero,
    /// The mesh is centered on zero.
    #[serde(rename = "C", alias = "c")]
    Center,
    /// The mesh ends at zero.
    #[serde(rename = "N", alias = "n")]
    Negative,
}

impl OriginAnchor {
    /// The origin coordinate for an axis with the given total width.
    pub fn resolve(self, total_width: f64) -> f64 {
        match self {
            OriginAnchor::Zero => 0.0,
            OriginAnchor::Center => -total_width / 2.0,
            OriginAnchor::Negative => -total_width,
        }
    }
}

impl std::str::FromStr for OriginAnchor {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(OriginAnchor::Zero),
            "C" | "c" => Ok(OriginAnchor::Center),
            "N" | "n" => Ok(OriginAnchor::Negative),
            other => Err(MeshError::Geometry(format!(
                "origin anchor {other:?} not recognized, must be '0', 'C' or 'N'"
            ))),
        }
    }
}

/// One coordinate of a mesh origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OriginEntry {
    /// An explicit coordinate.
    Value(f64),
    /// A coordinate derived from the extent of the axis.
    Anchor(OriginAnchor),
}

impl OriginEntry {
    /// The coordinate for an axis with the given total width.
    pub fn resolve(&self, total_width: f64) -> f64 {
        match self {
            OriginEntry::Value(x) => *x,
            OriginEntry::Anchor(anchor) => anchor.resolve(total_width),
        }
    }
}

impl From<f64> for OriginEntry {
    fn from(x: f64) -> Self {
        OriginEntry::Value(x)
    }
}

/// One coordinate of the nodes of a curvilinear mesh,
/// as a logical grid with its values in column-major order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeArray {
    /// Number of nodes along each logical axis.
    pub shape: Vec<usize>,
    /// Coordinate values with the first logical index varying fastest.
    pub values: Vec<f64>,
}

impl NodeArray {
    /// Store an array of node coordinates.
    pub fn from_array(arr: &nd::ArrayD<f64>) -> Self {
        Self {
            shape: arr.shape().to_vec(),
            values: flatten_column_major(arr).iter().cloned().collect(),
        }
    }

    /// Turn the stored values back into an array.
    pub fn to_array(&self) -> MeshResult<nd::ArrayD<f64>> {
        nd::ArrayD::from_shape_vec(nd::IxDyn(&self.shape).f(), self.values.clone()).map_err(|e| {
            MeshError::Shape(format!(
                "{} node values don't fit shape {:?}: {e}",
                self.values.len(),
                self.shape
            ))
        })
    }
}

/// The named fields a mesh is constructed from.
///
/// Either `h` (for a [`TensorMesh`]) or `nodes` (for a [`CurvilinearMesh`])
/// must be given. Everything else is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshFields {
    /// Number of cells along each axis.
    /// Checked against `h` or `nodes` if given.
    pub shape: Option<Vec<usize>>,
    /// Position of the first node, defaulting to zero.
    /// Anchors are only allowed with `h`.
    pub origin: Option<Vec<OriginEntry>>,
    /// Cell widths along each axis.
    pub h: Option<Vec<Vec<f64>>>,
    /// Node coordinates, one array per axis.
    pub nodes: Option<Vec<NodeArray>>,
    /// Direction of the first local axis.
    pub axis_u: Option<[f64; 3]>,
    /// Direction of the second local axis.
    pub axis_v: Option<[f64; 3]>,
    /// Direction of the third local axis.
    pub axis_w: Option<[f64; 3]>,
    /// Name of the coordinate system, possibly abbreviated.
    pub coordinate_system: Option<String>,
}

impl MeshFields {
    /// Validate the fields and build the mesh they describe.
    pub fn build(self) -> Result<AnyMesh, ValidationErrors> {
        let mut v = Validator::default();
        let coordinate_system = match &self.coordinate_system {
            Some(name) => v.check("coordinate_system", name.parse()),
            None => Some(CoordinateSystem::default()),
        }
        .unwrap_or_default();
        let axes = [self.axis_u, self.axis_v, self.axis_w];

        match (self.h, self.nodes) {
            (Some(_), Some(_)) => {
                v.push(
                    "nodes",
                    MeshError::Shape("give either cell widths or nodes, not both".into()),
                );
                v.finish(|| None)
            }
            (Some(h), None) => {
                let mut builder = TensorMesh::builder().h(h).coordinate_system(coordinate_system);
                builder = with_axes(builder, axes, |b, i, a| match i {
                    0 => b.axis_u(a),
                    1 => b.axis_v(a),
                    _ => b.axis_w(a),
                });
                if let Some(shape) = self.shape {
                    builder = builder.shape(shape);
                }
                if let Some(origin) = self.origin {
                    builder = builder.origin_entries(origin);
                }
                let mesh = match builder.build() {
                    Ok(mesh) => Some(mesh),
                    Err(errors) => {
                        v.absorb(errors);
                        None
                    }
                };
                v.finish(|| mesh.map(AnyMesh::Tensor))
            }
            (None, Some(nodes)) => {
                let arrays = nodes
                    .iter()
                    .map(NodeArray::to_array)
                    .collect::<MeshResult<Vec<_>>>();
                let Some(arrays) = v.check("nodes", arrays) else {
                    return v.finish(|| None);
                };
                let mut builder =
                    CurvilinearMesh::builder(arrays).coordinate_system(coordinate_system);
                builder = with_axes(builder, axes, |b, i, a| match i {
                    0 => b.axis_u(a),
                    1 => b.axis_v(a),
                    _ => b.axis_w(a),
                });
                if let Some(shape) = self.shape {
                    builder = builder.shape(shape);
                }
                if let Some(origin) = self.origin {
                    let values = origin
                        .iter()
                        .map(|entry| match entry {
                            OriginEntry::Value(x) => Ok(*x),
                            OriginEntry::Anchor(a) => Err(MeshError::Geometry(format!(
                                "origin anchor {a:?} needs cell widths, use a coordinate with nodes"
                            ))),
                        })
                        .collect::<MeshResult<Vec<_>>>();
                    if let Some(values) = v.check("origin", values) {
                        builder = builder.origin(values);
                    }
                }
                let mesh = match builder.build() {
                    Ok(mesh) => Some(mesh),
                    Err(errors) => {
                        v.absorb(errors);
                        None
                    }
                };
                v.finish(|| mesh.map(AnyMesh::Curvilinear))
            }
            (None, None) => {
                v.push(
                    "h",
                    MeshError::Shape("either cell widths or nodes are required".into()),
                );
                v.finish(|| None)
            }
        }
    }
}

fn with_axes<B>(
    mut builder: B,
    axes: [Option<[f64; 3]>; 3],
    set: impl Fn(B, usize, [f64; 3]) -> B,
) -> B {
    for (i, axis) in axes.into_iter().enumerate() {
        if let Some(axis) = axis {
            builder = set(builder, i, axis);
        }
    }
    builder
}

/// Validate optional axis directions into a reference frame,
/// defaulting missing axes to the standard ones.
pub(crate) fn frame_from_axes(
    v: &mut Validator,
    axes: [Option<[f64; 3]>; 3],
) -> Option<ReferenceFrame> {
    const FIELDS: [&str; 3] = ["axis_u", "axis_v", "axis_w"];
    let defaults = [
        ReferenceFrame::IDENTITY.u(),
        ReferenceFrame::IDENTITY.v(),
        ReferenceFrame::IDENTITY.w(),
    ];

    let mut normalized = [na::Vector3::zeros(); 3];
    let mut clean = true;
    for (i, axis) in axes.iter().enumerate() {
        let axis = axis.map(na::Vector3::from).unwrap_or(defaults[i]);
        match v.check(FIELDS[i], normalize_axis(FIELDS[i], axis)) {
            Some(n) => normalized[i] = n,
            None => clean = false,
        }
    }
    if !clean {
        return None;
    }
    let [u, v_axis, w] = normalized;
    v.check("reference_frame", ReferenceFrame::new(u, v_axis, w))
}

/// Either kind of mesh, as built from [`MeshFields`].
#[derive(Clone, Debug)]
pub enum AnyMesh {
    /// A mesh built from cell widths.
    Tensor(TensorMesh),
    /// A mesh built from node coordinates.
    Curvilinear(CurvilinearMesh),
}

impl AnyMesh {
    /// The fields that rebuild this mesh.
    pub fn to_fields(&self) -> MeshFields {
        match self {
            AnyMesh::Tensor(m) => m.to_fields(),
            AnyMesh::Curvilinear(m) => m.to_fields(),
        }
    }

    /// The tensor mesh, if this is one.
    pub fn as_tensor(&self) -> Option<&TensorMesh> {
        match self {
            AnyMesh::Tensor(m) => Some(m),
            AnyMesh::Curvilinear(_) => None,
        }
    }

    /// The curvilinear mesh, if this is one.
    pub fn as_curvilinear(&self) -> Option<&CurvilinearMesh> {
        match self {
            AnyMesh::Curvilinear(m) => Some(m),
            AnyMesh::Tensor(_) => None,
        }
    }

    fn inner(&self) -> &dyn GridSource {
        match self {
            AnyMesh::Tensor(m) => m,
            AnyMesh::Curvilinear(m) => m,
        }
    }
}

impl From<TensorMesh> for AnyMesh {
    fn from(m: TensorMesh) -> Self {
        AnyMesh::Tensor(m)
    }
}

impl From<CurvilinearMesh> for AnyMesh {
    fn from(m: CurvilinearMesh) -> Self {
        AnyMesh::Curvilinear(m)
    }
}

impl GridSource for AnyMesh {
    fn topology(&self) -> &Topology {
        self.inner().topology()
    }

    fn coordinate_system(&self) -> CoordinateSystem {
        self.inner().coordinate_system()
    }

    fn origin(&self) -> &[f64] {
        self.inner().origin()
    }

    fn reference_frame(&self) -> &ReferenceFrame {
        self.inner().reference_frame()
    }

    fn cell_volumes(&self) -> &na::DVector<f64> {
        self.inner().cell_volumes()
    }

    fn grid(&self, location: Location) -> MeshResult<&na::DMatrix<f64>> {
        self.inner().grid(location)
    }

    fn face_areas(&self) -> &na::DVector<f64> {
        self.inner().face_areas()
    }

    fn face_normals(&self) -> &na::DMatrix<f64> {
        self.inner().face_normals()
    }

    fn edge_lengths(&self) -> &na::DVector<f64> {
        self.inner().edge_lengths()
    }

    fn edge_tangents(&self) -> &na::DMatrix<f64> {
        self.inner().edge_tangents()
    }

    fn averaging(&self) -> &Averaging {
        self.inner().averaging()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_parse() {
        assert_eq!("C".parse::<OriginAnchor>().unwrap(), OriginAnchor::Center);
        assert_eq!("n".parse::<OriginAnchor>().unwrap(), OriginAnchor::Negative);
        assert!("X".parse::<OriginAnchor>().is_err());
        assert_eq!(OriginEntry::Anchor(OriginAnchor::Center).resolve(4.0), -2.0);
        assert_eq!(OriginEntry::from(1.5).resolve(4.0), 1.5);
    }

    #[test]
    fn tensor_fields() {
        let fields = MeshFields {
            h: Some(vec![vec![1.0, 1.0], vec![2.0]]),
            origin: Some(vec![OriginEntry::Anchor(OriginAnchor::Center), 0.5.into()]),
            coordinate_system: Some("CART".into()),
            ..Default::default()
        };
        let mesh = fields.build().unwrap();
        let tensor = mesh.as_tensor().unwrap();
        assert_eq!(tensor.origin(), &[-1.0, 0.5]);
        assert_eq!(mesh.coordinate_system(), CoordinateSystem::Cartesian);

        let rebuilt = mesh.to_fields().build().unwrap();
        assert_eq!(
            rebuilt.grid(Location::Nodes).unwrap(),
            mesh.grid(Location::Nodes).unwrap()
        );
    }

    #[test]
    fn field_errors_are_collected() {
        let fields = MeshFields {
            h: Some(vec![vec![1.0]]),
            origin: Some(vec![0.0.into(), 0.0.into()]),
            axis_v: Some([0.0, 0.0, 0.0]),
            coordinate_system: Some("polar".into()),
            ..Default::default()
        };
        let errors = fields.build().unwrap_err();
        assert!(errors.for_field("coordinate_system").is_some());
        assert!(matches!(errors.for_field("origin"), Some(MeshError::Shape(_))));
        assert!(matches!(errors.for_field("axis_v"), Some(MeshError::Geometry(_))));

        let errors = MeshFields::default().build().unwrap_err();
        assert!(errors.for_field("h").is_some());

        let both = MeshFields {
            h: Some(vec![vec![1.0]]),
            nodes: Some(vec![]),
            ..Default::default()
        };
        assert!(both.build().unwrap_err().for_field("nodes").is_some());
    }

    #[test]
    fn node_arrays() {
        let arr = nd::ArrayD::from_shape_fn(nd::IxDyn(&[2, 3]), |idx| (idx[0] + 10 * idx[1]) as f64);
        let stored = NodeArray::from_array(&arr);
        assert_eq!(stored.values[..3], [0.0, 1.0, 10.0]);
        assert_eq!(stored.to_array().unwrap(), arr);

        let broken = NodeArray {
            shape: vec![2, 2],
            values: vec![0.0; 3],
        };
        assert!(matches!(broken.to_array(), Err(MeshError::Shape(_))));
    }

    #[test]
    fn anchors_need_widths() {
        let arr = nd::ArrayD::from_shape_fn(nd::IxDyn(&[2, 2]), |idx| idx[0] as f64);
        let arr_y = nd::ArrayD::from_shape_fn(nd::IxDyn(&[2, 2]), |idx| idx[1] as f64);
        let fields = MeshFields {
            nodes: Some(vec![NodeArray::from_array(&arr), NodeArray::from_array(&arr_y)]),
            origin: Some(vec![OriginEntry::Anchor(OriginAnchor::Zero), 0.0.into()]),
            ..Default::default()
        };
        let errors = fields.build().unwrap_err();
        assert!(matches!(errors.for_field("origin"), Some(MeshError::Geometry(_))));
    }
}
