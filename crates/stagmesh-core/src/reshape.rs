//! Converting flat field vectors to and from per-axis grid arrays,
//! and extracting single components of face and edge fields.
//!
//! All flat vectors are in column-major order
//! (first axis index varies fastest),
//! the same order [`grid`][crate::GridSource::grid] produces points in.

use nalgebra as na;
use ndarray::{self as nd, ShapeBuilder};

use crate::{ElementKind, Location, MeshError, MeshResult, Topology};

/// Output shape of a reshape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// A flat vector.
    #[default]
    Vector,
    /// An N-dimensional array with one axis per mesh axis.
    Matrix,
}

/// A valid reshape from one location to another.
///
/// Construct with [`Conversion::new`], which rejects conversions
/// that would change what the values represent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// Cell-centered or nodal values kept as they are.
    Scalar(Location),
    /// A single face or edge component kept as it is.
    Component(Location),
    /// One component taken out of a full face or edge vector.
    Extract {
        /// Faces or edges.
        kind: ElementKind,
        /// Which component to take.
        axis: usize,
    },
    /// A full face or edge vector split into all its components.
    Split(ElementKind),
}

impl Conversion {
    /// Determine the conversion from `source` to `target`.
    ///
    /// `target` must be `source` itself
    /// or, for `Faces` and `Edges`, one of its components.
    /// Anything else fails with [`MeshError::Shape`].
    pub fn new(source: Location, target: Location) -> MeshResult<Self> {
        use Location::*;
        let conv = match (source, target) {
            (CellCenters, CellCenters) | (Nodes, Nodes) => Some(Conversion::Scalar(source)),
            (FacesX | FacesY | FacesZ | EdgesX | EdgesY | EdgesZ, _) if source == target => {
                Some(Conversion::Component(source))
            }
            (Faces, Faces) => Some(Conversion::Split(ElementKind::Face)),
            (Edges, Edges) => Some(Conversion::Split(ElementKind::Edge)),
            (Faces, FacesX | FacesY | FacesZ) | (Edges, EdgesX | EdgesY | EdgesZ) => {
                match (source.element_kind(), target.axis()) {
                    (Some(kind), Some(axis)) => Some(Conversion::Extract { kind, axis }),
                    _ => None,
                }
            }
            _ => None,
        };
        conv.ok_or_else(|| {
            MeshError::Shape(format!(
                "cannot reshape values on {source} into {target}, \
                 the type or component of a field cannot change"
            ))
        })
    }
}

/// One array produced by a reshape.
#[derive(Clone, Debug, PartialEq)]
pub enum Reshaped {
    /// A flat column-major vector.
    Vector(na::DVector<f64>),
    /// A column-major array with one axis per mesh axis.
    Matrix(nd::ArrayD<f64>),
}

impl Reshaped {
    /// Flatten into a column-major vector regardless of format.
    pub fn into_vector(self) -> na::DVector<f64> {
        match self {
            Reshaped::Vector(v) => v,
            Reshaped::Matrix(arr) => flatten_column_major(&arr),
        }
    }

    /// The array, if this is in matrix format.
    pub fn as_matrix(&self) -> Option<&nd::ArrayD<f64>> {
        match self {
            Reshaped::Matrix(arr) => Some(arr),
            Reshaped::Vector(_) => None,
        }
    }
}

/// Flatten an array so that its first axis varies fastest.
pub fn flatten_column_major(arr: &nd::ArrayD<f64>) -> na::DVector<f64> {
    // the transposed view iterates with the original first axis fastest
    na::DVector::from_iterator(arr.len(), arr.t().iter().cloned())
}

impl Topology {
    /// Reshape a field vector located on `source` into values located on `target`.
    ///
    /// Returns one array per output component:
    /// a single one for everything except `Faces -> Faces` and `Edges -> Edges`,
    /// which split the field into `dim` components.
    pub fn reshape(
        &self,
        x: &na::DVector<f64>,
        source: Location,
        target: Location,
        format: Format,
    ) -> MeshResult<Vec<Reshaped>> {
        let conversion = Conversion::new(source, target)?;
        match conversion {
            Conversion::Scalar(loc) | Conversion::Component(loc) => {
                let shape = self.location_shape(loc).ok_or_else(|| {
                    MeshError::Dimension(format!("the mesh has no {loc} with {} axes", self.dim()))
                })?;
                Ok(vec![output(x.as_slice(), &shape, format)?])
            }
            Conversion::Extract { kind, axis } => Ok(vec![self.extract(x, kind, axis, format)?]),
            Conversion::Split(kind) => (0..self.dim())
                .map(|axis| self.extract(x, kind, axis, format))
                .collect(),
        }
    }

    /// Reshape every column of a `(n, dim)` vector quantity separately,
    /// returning one array per column.
    ///
    /// Splitting targets (`Faces`, `Edges`) aren't allowed here.
    pub fn reshape_columns(
        &self,
        x: &na::DMatrix<f64>,
        source: Location,
        target: Location,
        format: Format,
    ) -> MeshResult<Vec<Reshaped>> {
        if x.ncols() != self.dim() {
            return Err(MeshError::Shape(format!(
                "a vector quantity needs {} columns, got {}",
                self.dim(),
                x.ncols()
            )));
        }
        if let Conversion::Split(_) = Conversion::new(source, target)? {
            return Err(MeshError::Shape(format!(
                "cannot split a vector quantity on {source} into components"
            )));
        }
        let mut ret = Vec::with_capacity(x.ncols());
        for col in x.column_iter() {
            let col = col.into_owned();
            ret.extend(self.reshape(&col, source, target, format)?);
        }
        Ok(ret)
    }

    fn extract(
        &self,
        x: &na::DVector<f64>,
        kind: ElementKind,
        axis: usize,
        format: Format,
    ) -> MeshResult<Reshaped> {
        let counts = match kind {
            ElementKind::Face => self.face_counts(),
            ElementKind::Edge => self.edge_counts(),
        };
        let shape = match kind {
            ElementKind::Face => self.face_shape(axis),
            ElementKind::Edge => self.edge_shape(axis),
        }
        .ok_or_else(|| {
            MeshError::Dimension(format!(
                "cannot take component {axis} of {} on a mesh with {} axes",
                kind.all(),
                self.dim()
            ))
        })?;

        let total: usize = counts.iter().sum();
        if x.len() != total {
            return Err(MeshError::Shape(format!(
                "a vector on {} must have {total} values, got {}",
                kind.all(),
                x.len()
            )));
        }
        let start: usize = counts[..axis].iter().sum();
        let end = start + counts[axis];
        output(&x.as_slice()[start..end], &shape, format)
    }
}

fn output(values: &[f64], shape: &[usize], format: Format) -> MeshResult<Reshaped> {
    let expected: usize = shape.iter().product();
    if values.len() != expected {
        return Err(MeshError::Shape(format!(
            "expected {expected} values for grid shape {shape:?}, got {}",
            values.len()
        )));
    }
    match format {
        Format::Vector => Ok(Reshaped::Vector(na::DVector::from_column_slice(values))),
        Format::Matrix => nd::ArrayD::from_shape_vec(nd::IxDyn(shape).f(), values.to_vec())
            .map(Reshaped::Matrix)
            .map_err(|e| MeshError::InternalInvariant(format!("building grid array: {e}"))),
    }
}
