//! Averaging operators from nodes, faces and edges to cell centers.
//!
//! Each operator is a Kronecker product of 1-D stencils,
//! averaging along every axis where the source location is nodal
//! and passing values through along the others.
//! They only depend on the mesh shape, so curvilinear meshes use the same ones.

use nalgebra_sparse as nas;
use std::sync::OnceLock;

use crate::{sparse, ElementKind, Location, MeshResult, Topology};

/// Lazily built averaging operators for one mesh shape.
#[derive(Clone, Debug)]
pub struct Averaging {
    topology: Topology,
    node_to_cc: OnceLock<nas::CsrMatrix<f64>>,
    face_to_cc: OnceLock<nas::CsrMatrix<f64>>,
    face_to_ccv: OnceLock<nas::CsrMatrix<f64>>,
    edge_to_cc: OnceLock<nas::CsrMatrix<f64>>,
    edge_to_ccv: OnceLock<nas::CsrMatrix<f64>>,
}

impl Averaging {
    /// Averaging operators for meshes with the given topology.
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            node_to_cc: OnceLock::new(),
            face_to_cc: OnceLock::new(),
            face_to_ccv: OnceLock::new(),
            edge_to_cc: OnceLock::new(),
            edge_to_ccv: OnceLock::new(),
        }
    }

    /// The topology these operators were built for.
    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Operator from a single-component location to cell centers.
    ///
    /// Returns None for `Faces` and `Edges`,
    /// which have several components (see [`element_to_cc`][Self::element_to_cc]),
    /// and for components along axes the mesh doesn't have.
    pub fn component_to_cc(&self, location: Location) -> Option<nas::CsrMatrix<f64>> {
        let nodal = location.nodal_axes()?;
        if location.axis().is_some_and(|a| a >= self.topology.dim()) {
            return None;
        }
        Some(self.stencil(nodal))
    }

    /// Kronecker product of 1-D stencils, averaging along the `nodal` axes.
    fn stencil(&self, nodal: [bool; 3]) -> nas::CsrMatrix<f64> {
        let shape = self.topology.shape();
        // kron(z, kron(y, x)) so that x varies fastest
        (0..shape.len())
            .rev()
            .fold(nas::CsrMatrix::identity(1), |acc, axis| {
                let factor = if nodal[axis] {
                    sparse::average_1d(shape[axis])
                } else {
                    nas::CsrMatrix::identity(shape[axis])
                };
                sparse::kron(&acc, &factor)
            })
    }

    /// `(nC, nN)` operator averaging the `2^dim` corners of every cell.
    pub fn node_to_cc(&self) -> &nas::CsrMatrix<f64> {
        self.node_to_cc.get_or_init(|| {
            log::debug!(
                "building node to cell center averaging for {:?}",
                self.topology.shape()
            );
            self.stencil([true; 3])
        })
    }

    /// `(nC, nF)` or `(nC, nE)` operator averaging all components into one scalar per cell.
    ///
    /// This is `1/dim` times the horizontal stack of the component averages.
    pub fn element_to_cc(&self, kind: ElementKind) -> MeshResult<&nas::CsrMatrix<f64>> {
        let cell = match kind {
            ElementKind::Face => &self.face_to_cc,
            ElementKind::Edge => &self.edge_to_cc,
        };
        if let Some(mat) = cell.get() {
            return Ok(mat);
        }
        let blocks = self.component_blocks(kind);
        let mut mat = sparse::hstack(&blocks)?;
        let scale = 1.0 / self.topology.dim() as f64;
        for val in mat.values_mut() {
            *val *= scale;
        }
        log::debug!("built {kind:?} to cell center averaging for {:?}", self.topology.shape());
        Ok(cell.get_or_init(|| mat))
    }

    /// `(nC * dim, nF)` or `(nC * dim, nE)` block-diagonal operator
    /// averaging each component separately into a cell-centered vector.
    pub fn element_to_ccv(&self, kind: ElementKind) -> &nas::CsrMatrix<f64> {
        let cell = match kind {
            ElementKind::Face => &self.face_to_ccv,
            ElementKind::Edge => &self.edge_to_ccv,
        };
        cell.get_or_init(|| {
            log::debug!("building {kind:?} to cell vector averaging for {:?}", self.topology.shape());
            sparse::block_diag(&self.component_blocks(kind))
        })
    }

    fn component_blocks(&self, kind: ElementKind) -> Vec<nas::CsrMatrix<f64>> {
        (0..self.topology.dim())
            .filter_map(|axis| kind.component(axis))
            .filter_map(|loc| self.component_to_cc(loc))
            .collect()
    }
}
