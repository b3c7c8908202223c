//! Geometry and discrete operators for structured meshes.
//!
//! `stagmesh` handles the bookkeeping of staggered-grid discretizations:
//! where the values of a discrete field live (cell centers, nodes,
//! faces, edges), how many there are and in what order,
//! and the geometric quantities needed to build operators from them.
//!
//! # Meshes
//!
//! Two kinds of mesh are provided:
//!
//! - [`TensorMesh`], an axis-aligned mesh defined by cell widths along each axis,
//! - [`CurvilinearMesh`], a logically rectangular mesh with arbitrary node positions.
//!
//! Both implement [`GridSource`], which gives access to
//! cell volumes, face areas and normals, edge lengths and tangents,
//! and the point grids of every [`Location`].
//! All of these are computed on first access and cached.
//!
//! Meshes can also be described by serializable [`MeshFields`]
//! and rebuilt from them with [`MeshFields::build`].
//!
//! # Numbering
//!
//! Every location is numbered in column-major order,
//! with the index along the first axis varying fastest.
//! Face and edge quantities are stacked by axis, x-components first.
//! [`Topology`] gives the counts and shapes,
//! and [`Topology::reshape`] converts between flat vectors and per-axis grids.
//!
//! # Operators
//!
//! [`GridSource::operators`] returns an [`OperatorBuilder`] that assembles
//! diagonal inner-product matrices weighted by a material property,
//! along with their derivatives with respect to the property.
//! Tensor meshes can additionally build interpolation matrices
//! from any location to arbitrary points.
//!
//! ```
//! use stagmesh::{na, ElementKind, GridSource, Inversion, Location, TensorMesh};
//!
//! let mesh = TensorMesh::builder()
//!     .h(vec![vec![1.0; 4], vec![0.5; 2]])
//!     .build()?;
//! assert_eq!(mesh.grid(Location::CellCenters)?.nrows(), 8);
//!
//! let sigma = na::DVector::from_element(8, 2.0);
//! let mass = mesh
//!     .operators()
//!     .inner_product(ElementKind::Face, Some(&sigma), Inversion::NONE)?;
//! assert_eq!(mass.map(|m| m.size()), Some(mesh.topology().face_count()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub use stagmesh_core::*;
