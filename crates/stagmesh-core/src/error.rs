//! Error types shared by every mesh and operator in the crate.

/// Error raised by mesh construction, geometric queries and operator assembly.
///
/// None of these are transient; they all indicate bad input
/// or a bug, and are reported at the point where they are detected.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum MeshError {
    /// The number of axes is outside `1..=3`,
    /// an axis index exceeds the mesh dimension,
    /// or an operation attempted to change the dimension of a mesh.
    #[error("Dimension error: {0}")]
    Dimension(String),
    /// The size or shape of an array disagrees with what the mesh expects.
    #[error("Shape error: {0}")]
    Shape(String),
    /// Degenerate or inconsistent geometry,
    /// e.g. a non-orthogonal reference frame or a zero-length axis vector.
    #[error("Geometry error: {0}")]
    Geometry(String),
    /// Interpolation was requested at points outside the mesh
    /// while out-of-domain points were not allowed.
    #[error("{count} point(s) lie outside the mesh, first at index {first_index}")]
    OutOfDomain {
        /// Number of points found outside the mesh.
        count: usize,
        /// Index of the first offending point.
        first_index: usize,
    },
    /// An internal consistency check failed.
    /// This is a bug in stagmesh.
    #[error("Internal invariant violated: {0}. This is a bug in stagmesh")]
    InternalInvariant(String),
}

/// Convenience alias for results of mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// A validation failure attached to the name of the field that caused it.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    /// Name of the offending construction field, e.g. `"origin"`.
    pub field: &'static str,
    /// What went wrong with it.
    pub error: MeshError,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.error)
    }
}

/// Every problem found while validating the fields of a mesh.
///
/// Mesh builders check all fields before giving up,
/// so this can contain more than one error.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[error("Mesh validation failed: {}", format_field_errors(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// The individual field errors.
    #[inline]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Check whether any of the errors matches the given predicate.
    pub fn any(&self, pred: impl Fn(&MeshError) -> bool) -> bool {
        self.0.iter().any(|e| pred(&e.error))
    }

    /// Look up the first error reported for a field.
    pub fn for_field(&self, field: &str) -> Option<&MeshError> {
        self.0.iter().find(|e| e.field == field).map(|e| &e.error)
    }
}

/// Accumulator used by the builders to collect field errors.
#[derive(Debug, Default)]
pub(crate) struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    /// Record the error of `res` under `field`, returning the success value if any.
    pub fn check<T>(&mut self, field: &'static str, res: MeshResult<T>) -> Option<T> {
        match res {
            Ok(val) => Some(val),
            Err(error) => {
                self.errors.push(FieldError { field, error });
                None
            }
        }
    }

    pub fn push(&mut self, field: &'static str, error: MeshError) {
        self.errors.push(FieldError { field, error });
    }

    /// Take over the errors reported by a nested builder.
    pub fn absorb(&mut self, errors: ValidationErrors) {
        self.errors.extend(errors.0);
    }

    /// Finish validation, producing `val` if no errors were recorded.
    pub fn finish<T>(self, val: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        if !self.errors.is_empty() {
            return Err(ValidationErrors(self.errors));
        }
        match val() {
            Some(v) => Ok(v),
            // a field was missing without an error being recorded for it
            None => Err(ValidationErrors(vec![FieldError {
                field: "<mesh>",
                error: MeshError::InternalInvariant(
                    "validated fields were missing after a clean validation pass".into(),
                ),
            }])),
        }
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(e: FieldError) -> Self {
        Self(vec![e])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_collects_everything() {
        let mut v = Validator::default();
        let ok: Option<usize> = v.check("shape", Ok(3));
        assert_eq!(ok, Some(3));
        let bad: Option<usize> = v.check("origin", Err(MeshError::Shape("too short".into())));
        assert_eq!(bad, None);
        v.push("axis_u", MeshError::Geometry("zero length".into()));

        let errors = v.finish(|| ok).unwrap_err();
        assert_eq!(errors.errors().len(), 2);
        assert!(matches!(errors.for_field("origin"), Some(MeshError::Shape(_))));
        assert!(errors.any(|e| matches!(e, MeshError::Geometry(_))));
        assert_eq!(errors.for_field("shape"), None);
        assert_eq!(
            errors.to_string(),
            "Mesh validation failed: origin: Shape error: too short; \
             axis_u: Geometry error: zero length"
        );
    }

    #[test]
    fn clean_validation_needs_a_value() {
        assert_eq!(Validator::default().finish(|| Some(1)), Ok(1));
        let errors = Validator::default().finish(|| None::<()>).unwrap_err();
        assert!(matches!(
            errors.errors()[0].error,
            MeshError::InternalInvariant(_)
        ));
    }
}
