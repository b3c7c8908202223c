//! Local reference frames and coordinate system tags.

use nalgebra as na;

use crate::{MeshError, MeshResult};

/// Tolerance for the pairwise dot products of frame axes.
pub const ORTHOGONALITY_TOLERANCE: f64 = 1e-6;

/// The coordinate system a mesh's axes are expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CoordinateSystem {
    /// Axes are x, y, z.
    #[default]
    Cartesian,
    /// Axes are radius, azimuth (in radians), z.
    Cylindrical,
    /// Axes are radius, polar angle, azimuth.
    Spherical,
}

impl CoordinateSystem {
    /// Full lowercase name of the coordinate system.
    pub fn name(self) -> &'static str {
        match self {
            CoordinateSystem::Cartesian => "cartesian",
            CoordinateSystem::Cylindrical => "cylindrical",
            CoordinateSystem::Spherical => "spherical",
        }
    }
}

impl std::str::FromStr for CoordinateSystem {
    type Err = MeshError;

    /// Parse a coordinate system name.
    /// Case is ignored and the abbreviations
    /// `car`, `cart`, `cy`, `cyl` and `sph` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cartesian" | "car" | "cart" => Ok(CoordinateSystem::Cartesian),
            "cylindrical" | "cy" | "cyl" => Ok(CoordinateSystem::Cylindrical),
            "spherical" | "sph" => Ok(CoordinateSystem::Spherical),
            other => Err(MeshError::Geometry(format!(
                "unknown coordinate system {other:?}, \
                 expected cartesian, cylindrical or spherical"
            ))),
        }
    }
}

impl std::fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Three mutually orthogonal unit vectors `u`, `v`, `w`
/// giving the directions of a mesh's local axes in global coordinates.
///
/// Construct with [`new`][Self::new], which normalizes the vectors
/// and rejects frames that aren't orthogonal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReferenceFrame {
    u: na::Vector3<f64>,
    v: na::Vector3<f64>,
    w: na::Vector3<f64>,
}

impl Default for ReferenceFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ReferenceFrame {
    /// The conventional x, y, z frame.
    pub const IDENTITY: Self = Self {
        u: na::Vector3::new(1.0, 0.0, 0.0),
        v: na::Vector3::new(0.0, 1.0, 0.0),
        w: na::Vector3::new(0.0, 0.0, 1.0),
    };

    /// Create a frame from three axis directions.
    ///
    /// The vectors are normalized. Fails with [`MeshError::Geometry`]
    /// if any of them has zero length
    /// or if any pair has a dot product larger than [`ORTHOGONALITY_TOLERANCE`].
    pub fn new(
        u: na::Vector3<f64>,
        v: na::Vector3<f64>,
        w: na::Vector3<f64>,
    ) -> MeshResult<Self> {
        let u = normalize_axis("axis_u", u)?;
        let v = normalize_axis("axis_v", v)?;
        let w = normalize_axis("axis_w", w)?;

        for (name, dot) in [
            ("axis_u . axis_v", u.dot(&v)),
            ("axis_u . axis_w", u.dot(&w)),
            ("axis_v . axis_w", v.dot(&w)),
        ] {
            if dot.abs() > ORTHOGONALITY_TOLERANCE {
                return Err(MeshError::Geometry(format!(
                    "axis_u, axis_v and axis_w must be orthogonal, but {name} = {dot}"
                )));
            }
        }

        Ok(Self { u, v, w })
    }

    /// Create a frame from plain arrays, as used in [`MeshFields`][crate::MeshFields].
    pub fn from_arrays(u: [f64; 3], v: [f64; 3], w: [f64; 3]) -> MeshResult<Self> {
        Self::new(u.into(), v.into(), w.into())
    }

    /// Direction of the first local axis.
    #[inline]
    pub fn u(&self) -> na::Vector3<f64> {
        self.u
    }

    /// Direction of the second local axis.
    #[inline]
    pub fn v(&self) -> na::Vector3<f64> {
        self.v
    }

    /// Direction of the third local axis.
    #[inline]
    pub fn w(&self) -> na::Vector3<f64> {
        self.w
    }

    /// The matrix whose rows are `u`, `v` and `w`.
    ///
    /// Multiplying its transpose with a vector in local coordinates
    /// gives the vector in global coordinates.
    pub fn rotation_matrix(&self) -> na::Matrix3<f64> {
        na::Matrix3::from_rows(&[self.u.transpose(), self.v.transpose(), self.w.transpose()])
    }

    /// Whether this frame differs from [`IDENTITY`][Self::IDENTITY]
    /// beyond floating point tolerance.
    pub fn is_rotated(&self) -> bool {
        let close = |a: &na::Vector3<f64>, b: &na::Vector3<f64>| {
            a.iter()
                .zip(b.iter())
                .all(|(x, y)| (x - y).abs() <= 1e-8 + 1e-5 * y.abs())
        };
        !(close(&self.u, &Self::IDENTITY.u)
            && close(&self.v, &Self::IDENTITY.v)
            && close(&self.w, &Self::IDENTITY.w))
    }
}

pub(crate) fn normalize_axis(name: &str, axis: na::Vector3<f64>) -> MeshResult<na::Vector3<f64>> {
    let norm = axis.norm();
    if norm == 0.0 || !norm.is_finite() {
        return Err(MeshError::Geometry(format!(
            "{name} must have a finite nonzero length, got {norm}"
        )));
    }
    if norm < 1e-16 {
        log::warn!("{name} has a length of {norm:e}, which is close to zero");
    }
    Ok(axis / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn non_orthogonal_frame_is_rejected() {
        let res = ReferenceFrame::from_arrays([1., 0., 0.], [0., 1., 0.], [1., 0., 0.]);
        assert!(matches!(res, Err(MeshError::Geometry(_))));
    }

    #[test]
    fn zero_axis_is_rejected() {
        let res = ReferenceFrame::from_arrays([0., 0., 0.], [0., 1., 0.], [0., 0., 1.]);
        assert!(matches!(res, Err(MeshError::Geometry(_))));
    }

    #[test]
    fn axes_are_normalized_and_rotation_detected() {
        let frame = ReferenceFrame::from_arrays([2., 2., 0.], [-1., 1., 0.], [0., 0., 3.]).unwrap();
        assert_relative_eq!(frame.u().norm(), 1.0);
        assert_relative_eq!(frame.w(), na::Vector3::z());
        assert!(frame.is_rotated());
        assert!(!ReferenceFrame::default().is_rotated());

        let rot = frame.rotation_matrix();
        assert_relative_eq!(rot * rot.transpose(), na::Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(rot.row(1).transpose(), frame.v());
    }

    #[test]
    fn coordinate_system_abbreviations() {
        for (name, expected) in [
            ("cart", CoordinateSystem::Cartesian),
            ("CYL", CoordinateSystem::Cylindrical),
            ("cy", CoordinateSystem::Cylindrical),
            ("Spherical", CoordinateSystem::Spherical),
        ] {
            assert_eq!(name.parse::<CoordinateSystem>().unwrap(), expected);
        }
        assert!("polar".parse::<CoordinateSystem>().is_err());
    }
}
