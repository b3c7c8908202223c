//! Locations on a staggered grid where values can live.

/// A place on the mesh where a discrete field is defined.
///
/// The per-axis variants (`FacesX`, `EdgesY`, ...) hold one component of a
/// face or edge quantity, while [`Faces`][Location::Faces] and
/// [`Edges`][Location::Edges] stand for all components stacked in axis order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    /// Cell centers (`CC`).
    CellCenters,
    /// Nodes (`N`).
    Nodes,
    /// Faces normal to the x-axis (`Fx`).
    FacesX,
    /// Faces normal to the y-axis (`Fy`).
    FacesY,
    /// Faces normal to the z-axis (`Fz`).
    FacesZ,
    /// All faces (`F`).
    Faces,
    /// Edges parallel to the x-axis (`Ex`).
    EdgesX,
    /// Edges parallel to the y-axis (`Ey`).
    EdgesY,
    /// Edges parallel to the z-axis (`Ez`).
    EdgesZ,
    /// All edges (`E`).
    Edges,
    /// x-component of a vector field at cell centers (`CCVx`).
    CellVectorsX,
    /// y-component of a vector field at cell centers (`CCVy`).
    CellVectorsY,
    /// z-component of a vector field at cell centers (`CCVz`).
    CellVectorsZ,
}

/// The kind of mesh element carrying a vector component,
/// used by operators that only make sense on faces or edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Faces, with values representing normal components.
    Face,
    /// Edges, with values representing tangential components.
    Edge,
}

impl ElementKind {
    /// The location of the `axis` component of this element kind.
    ///
    /// Returns None for axes beyond z.
    pub fn component(self, axis: usize) -> Option<Location> {
        use Location::*;
        match (self, axis) {
            (ElementKind::Face, 0) => Some(FacesX),
            (ElementKind::Face, 1) => Some(FacesY),
            (ElementKind::Face, 2) => Some(FacesZ),
            (ElementKind::Edge, 0) => Some(EdgesX),
            (ElementKind::Edge, 1) => Some(EdgesY),
            (ElementKind::Edge, 2) => Some(EdgesZ),
            _ => None,
        }
    }

    /// The location standing for all components of this element kind.
    pub fn all(self) -> Location {
        match self {
            ElementKind::Face => Location::Faces,
            ElementKind::Edge => Location::Edges,
        }
    }
}

impl Location {
    /// Every location, in declaration order.
    pub const ALL: [Location; 13] = [
        Location::CellCenters,
        Location::Nodes,
        Location::FacesX,
        Location::FacesY,
        Location::FacesZ,
        Location::Faces,
        Location::EdgesX,
        Location::EdgesY,
        Location::EdgesZ,
        Location::Edges,
        Location::CellVectorsX,
        Location::CellVectorsY,
        Location::CellVectorsZ,
    ];

    /// The short name conventionally used for this location (`"CC"`, `"Fx"`, ...).
    pub fn short_name(self) -> &'static str {
        use Location::*;
        match self {
            CellCenters => "CC",
            Nodes => "N",
            FacesX => "Fx",
            FacesY => "Fy",
            FacesZ => "Fz",
            Faces => "F",
            EdgesX => "Ex",
            EdgesY => "Ey",
            EdgesZ => "Ez",
            Edges => "E",
            CellVectorsX => "CCVx",
            CellVectorsY => "CCVy",
            CellVectorsZ => "CCVz",
        }
    }

    /// Position of this location in [`ALL`][Self::ALL].
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Parse a short name as produced by [`short_name`][Self::short_name].
    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.short_name() == name)
    }

    /// The axis this location is a single component of, if any.
    ///
    /// `FacesY`, `EdgesY` and `CellVectorsY` all give `Some(1)`;
    /// whole-field locations give None.
    pub fn axis(self) -> Option<usize> {
        use Location::*;
        match self {
            FacesX | EdgesX | CellVectorsX => Some(0),
            FacesY | EdgesY | CellVectorsY => Some(1),
            FacesZ | EdgesZ | CellVectorsZ => Some(2),
            CellCenters | Nodes | Faces | Edges => None,
        }
    }

    /// The face or edge kind this location belongs to, if any.
    pub fn element_kind(self) -> Option<ElementKind> {
        use Location::*;
        match self {
            FacesX | FacesY | FacesZ | Faces => Some(ElementKind::Face),
            EdgesX | EdgesY | EdgesZ | Edges => Some(ElementKind::Edge),
            _ => None,
        }
    }

    /// For each axis, whether points of this location sit on nodes (`true`)
    /// or on cell centers (`false`) along that axis.
    ///
    /// Only defined for the single-component point locations,
    /// i.e. everything except `Faces` and `Edges`.
    pub(crate) fn nodal_axes(self) -> Option<[bool; 3]> {
        use Location::*;
        match self {
            CellCenters | CellVectorsX | CellVectorsY | CellVectorsZ => Some([false; 3]),
            Nodes => Some([true; 3]),
            FacesX => Some([true, false, false]),
            FacesY => Some([false, true, false]),
            FacesZ => Some([false, false, true]),
            EdgesX => Some([false, true, true]),
            EdgesY => Some([true, false, true]),
            EdgesZ => Some([true, true, false]),
            Faces | Edges => None,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_round_trip() {
        for loc in Location::ALL {
            assert_eq!(Location::from_short_name(loc.short_name()), Some(loc));
        }
        assert_eq!(Location::from_short_name("Fw"), None);
        for (i, loc) in Location::ALL.into_iter().enumerate() {
            assert_eq!(loc.index(), i);
        }
    }

    #[test]
    fn components_agree_with_axes() {
        for kind in [ElementKind::Face, ElementKind::Edge] {
            for axis in 0..3 {
                let loc = kind.component(axis).unwrap();
                assert_eq!(loc.axis(), Some(axis));
                assert_eq!(loc.element_kind(), Some(kind));
            }
            assert_eq!(kind.component(3), None);
            assert_eq!(kind.all().element_kind(), Some(kind));
        }
    }
}
