//! This is the core crate containing all of `stagmesh`'s functionality.
//! See the `stagmesh` crate's documentation for an introduction.

#![warn(missing_docs)]

mod error;
pub use error::{FieldError, MeshError, MeshResult, ValidationErrors};

mod location;
pub use location::{ElementKind, Location};

mod frame;
pub use frame::{CoordinateSystem, ReferenceFrame, ORTHOGONALITY_TOLERANCE};

pub mod topology;
#[doc(inline)]
pub use topology::Topology;

pub mod sparse;

mod averaging;
pub use averaging::Averaging;

pub mod operator;
#[doc(inline)]
pub use operator::{DiagonalMatrix, InnerProductDerivative};

pub mod inner_product;
#[doc(inline)]
pub use inner_product::{Inversion, OperatorBuilder, PropertyKind};

pub mod reshape;
#[doc(inline)]
pub use reshape::{Conversion, Format, Reshaped};

mod interpolate;

pub mod mesh;
#[doc(inline)]
pub use mesh::{
    AnyMesh, CurvilinearMesh, CurvilinearMeshBuilder, GridSource, MeshFields, NodeArray,
    OriginAnchor, OriginEntry, TensorMesh, TensorMeshBuilder,
};

// re-exports of the linear algebra crates appearing in the public API

pub use nalgebra as na;
pub use nalgebra_sparse as nas;
pub use ndarray as nd;
