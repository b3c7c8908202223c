//! Material-property-weighted inner products on faces and edges.
//!
//! The inner-product matrices built here are the diagonal
//! "mass lumped" approximations `M = diag(Avᵀ (vol ∘ p))`,
//! where `Av` averages face or edge values to cell centers
//! and `p` is a material property given per cell.

use nalgebra as na;
use nalgebra_sparse as nas;

use crate::{
    operator::{DiagonalMatrix, InnerProductDerivative},
    sparse, ElementKind, GridSource, MeshResult, Topology,
};

/// Whether to invert the material property and/or the resulting matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Inversion {
    /// Use the reciprocal of the property.
    pub property: bool,
    /// Return the inverse of the inner-product matrix.
    pub matrix: bool,
}

impl Inversion {
    /// Invert nothing.
    pub const NONE: Self = Self {
        property: false,
        matrix: false,
    };
    /// Invert only the property.
    pub const PROPERTY: Self = Self {
        property: true,
        matrix: false,
    };
    /// Invert only the matrix.
    pub const MATRIX: Self = Self {
        property: false,
        matrix: true,
    };
    /// Invert both the property and the matrix.
    pub const BOTH: Self = Self {
        property: true,
        matrix: true,
    };
}

/// How a material property vector is interpreted, determined by its length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// A single value shared by every cell.
    Constant,
    /// One value per cell.
    Isotropic,
    /// One value per cell per axis, stacked by axis
    /// (all x-values first).
    Anisotropic,
}

impl PropertyKind {
    /// Classify a property of the given length for a mesh.
    ///
    /// Per-cell interpretation takes precedence,
    /// so on a single-cell mesh a length of 1 is `Isotropic`.
    /// Returns None for lengths that match nothing.
    pub fn classify(len: usize, topology: &Topology) -> Option<Self> {
        let n_cells = topology.cell_count();
        if len == n_cells {
            Some(PropertyKind::Isotropic)
        } else if len == 1 {
            Some(PropertyKind::Constant)
        } else if len == n_cells * topology.dim() {
            Some(PropertyKind::Anisotropic)
        } else {
            None
        }
    }
}

/// Builder for inner-product operators of a mesh.
///
/// Obtained with [`GridSource::operators`].
pub struct OperatorBuilder<'a, G: GridSource + ?Sized> {
    source: &'a G,
}

impl<'a, G: GridSource + ?Sized> OperatorBuilder<'a, G> {
    /// Create a builder for the given mesh.
    pub fn new(source: &'a G) -> Self {
        Self { source }
    }

    /// Which components of `kind` contribute to inner products.
    fn included_components(&self, kind: ElementKind) -> Vec<bool> {
        let dim = self.source.topology().dim();
        if self.source.is_axisymmetric() {
            match kind {
                ElementKind::Face => vec![true, false, true],
                ElementKind::Edge => vec![false, true, false],
            }
        } else {
            vec![true; dim]
        }
    }

    /// `A_cᵀ diag(vol)` for every component `c`,
    /// with excluded components replaced by zero blocks.
    fn volume_weighted_blocks(&self, kind: ElementKind) -> Vec<nas::CsrMatrix<f64>> {
        let topo = self.source.topology();
        let vol = self.source.cell_volumes();
        let avg = self.source.averaging();
        let n_cells = topo.cell_count();

        self.included_components(kind)
            .into_iter()
            .enumerate()
            .filter_map(|(axis, included)| {
                let loc = kind.component(axis)?;
                let count = topo.location_count(loc)?;
                if !included {
                    return Some(sparse::zeros(count, n_cells));
                }
                let av = avg.component_to_cc(loc)?;
                let mut coo = nas::CooMatrix::new(count, n_cells);
                for (cell, elem, &val) in av.triplet_iter() {
                    coo.push(elem, cell, val * vol[cell]);
                }
                Some(nas::CsrMatrix::from(&coo))
            })
            .collect()
    }

    /// Jacobian of the diagonal of an un-inverted inner-product matrix
    /// with respect to a property of the given kind.
    fn property_jacobian(
        &self,
        kind: ElementKind,
        prop_kind: PropertyKind,
    ) -> MeshResult<nas::CsrMatrix<f64>> {
        let blocks = self.volume_weighted_blocks(kind);
        let per_cell = || sparse::vstack(&blocks);
        match prop_kind {
            PropertyKind::Isotropic => per_cell(),
            PropertyKind::Anisotropic => Ok(sparse::block_diag(&blocks)),
            PropertyKind::Constant => {
                // every cell shares the one value, so the columns collapse into their sum
                let iso = per_cell()?;
                let ones = na::DVector::from_element(iso.ncols(), 1.0);
                let col: na::DVector<f64> = &iso * &ones;
                let mut coo = nas::CooMatrix::new(col.len(), 1);
                for (row, &val) in col.iter().enumerate() {
                    if val != 0.0 {
                        coo.push(row, 0, val);
                    }
                }
                Ok(nas::CsrMatrix::from(&coo))
            }
        }
    }

    /// The property as applied, after optional reciprocation.
    fn effective_property(prop: &na::DVector<f64>, inversion: Inversion) -> na::DVector<f64> {
        if inversion.property {
            prop.map(f64::recip)
        } else {
            prop.clone()
        }
    }

    /// Build the inner-product matrix of faces or edges weighted by a material property.
    ///
    /// `property` may be absent (meaning all ones), a single constant,
    /// one value per cell, or `dim` values per cell stacked by axis.
    /// Returns `Ok(None)` if the property has any other length.
    ///
    /// Cells are weighted by [`GridSource::cell_volumes`],
    /// which for tensor meshes are width products in every coordinate system.
    pub fn inner_product(
        &self,
        kind: ElementKind,
        property: Option<&na::DVector<f64>>,
        inversion: Inversion,
    ) -> MeshResult<Option<DiagonalMatrix>> {
        let topo = self.source.topology();
        let prop = match property {
            Some(p) => p.clone(),
            None => na::DVector::from_element(topo.cell_count(), 1.0),
        };
        let Some(prop_kind) = PropertyKind::classify(prop.len(), topo) else {
            return Ok(None);
        };

        let jac = self.property_jacobian(kind, prop_kind)?;
        let diag: na::DVector<f64> = &jac * &Self::effective_property(&prop, inversion);
        log::trace!(
            "{kind:?} inner product with {prop_kind:?} property, {} elements",
            diag.len()
        );

        let mat = DiagonalMatrix::from(diag);
        Ok(Some(if inversion.matrix { mat.inverse() } else { mat }))
    }

    /// Build the derivative of an inner-product matrix
    /// with respect to its property.
    ///
    /// Returns `Ok(None)` when `property` is absent or has an unsupported length.
    pub fn inner_product_deriv(
        &self,
        kind: ElementKind,
        property: Option<&na::DVector<f64>>,
        inversion: Inversion,
    ) -> MeshResult<Option<InnerProductDerivative>> {
        let Some(prop) = property else {
            return Ok(None);
        };
        let topo = self.source.topology();
        let Some(prop_kind) = PropertyKind::classify(prop.len(), topo) else {
            return Ok(None);
        };

        let jac = self.property_jacobian(kind, prop_kind)?;

        // chain rule factors: d(1/p)/dp = -1/p², d(1/m)/dm = -1/m²
        let prop_factor = inversion
            .property
            .then(|| prop.map(|p| -1.0 / (p * p)));
        let mat_factor = if inversion.matrix {
            let Some(mi) = self.inner_product(kind, Some(prop), inversion)? else {
                return Ok(None);
            };
            Some(mi.diagonal().map(|m| -m * m))
        } else {
            None
        };

        let deriv = sparse::scale_rows_cols(&jac, mat_factor.as_ref(), prop_factor.as_ref());
        log::trace!(
            "{kind:?} inner product derivative with {prop_kind:?} property, shape {:?}",
            (deriv.nrows(), deriv.ncols())
        );
        Ok(Some(InnerProductDerivative::new(deriv)))
    }
}
