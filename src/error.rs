use thiserror::Error;

/// Result type for geometry construction.
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Errors raised while building geometries.
///
/// Variants split into two classes: fatal errors abort the whole geometry
/// definition, recoverable ones make the factory produce no geometry.
/// See [`GeometryError::is_fatal`].
#[derive(Error, Debug)]
pub enum GeometryError {
    // fatal
    #[error("{geometry}: zero regions")]
    NoRegions { geometry: String },

    #[error("{geometry}: the tip is too close to the base (distance {distance:e})")]
    TipTooCloseToBase { geometry: String, distance: f64 },

    #[error("{geometry}: side {side} has a normal inconsistent with the base polygon")]
    InconsistentSideNormal { geometry: String, side: usize },

    #[error("{geometry}: angles must be strictly increasing (angle {index} = {angle})")]
    AnglesNotIncreasing {
        geometry: String,
        index: usize,
        angle: f64,
    },

    #[error("{geometry}: angles must span less than 180 degrees (span {span})")]
    AngleSpanTooLarge { geometry: String, span: f64 },

    #[error("triangle mesh has zero triangles")]
    NoTriangles,

    #[error("duplicate node {0}")]
    DuplicateNode(i64),

    // recoverable
    #[error("missing or invalid input `{key}`")]
    MissingKey { key: String },

    #[error("invalid input `{key}`: {reason}")]
    InvalidInput { key: String, reason: String },

    #[error("geometry `{0}` is not defined")]
    UnknownGeometry(String),

    #[error("a geometry named `{0}` already exists")]
    DuplicateName(String),

    #[error("unknown geometry library `{0}`")]
    UnknownLibrary(String),

    #[error("STL file `{0}` does not exist or is not readable")]
    UnreadableFile(String),

    #[error("STL file `{0}` has 0 triangles")]
    EmptyStl(String),

    #[error("failed to parse STL file `{0}`")]
    MalformedStl(String),

    #[error("failed to parse TetGen file `{file}`: {reason}")]
    MalformedTetgen { file: String, reason: String },

    #[error("scale factor must be greater than zero, got {0}")]
    NonPositiveScale(f64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeometryError {
    /// Whether this error must terminate the whole geometry definition.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GeometryError::NoRegions { .. }
                | GeometryError::TipTooCloseToBase { .. }
                | GeometryError::InconsistentSideNormal { .. }
                | GeometryError::AnglesNotIncreasing { .. }
                | GeometryError::AngleSpanTooLarge { .. }
                | GeometryError::NoTriangles
                | GeometryError::DuplicateNode(_)
        )
    }

    pub fn missing(key: &str) -> Self {
        GeometryError::MissingKey {
            key: key.to_string(),
        }
    }

    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        GeometryError::InvalidInput {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_and_recoverable_classes() {
        assert!(GeometryError::NoTriangles.is_fatal());
        assert!(GeometryError::DuplicateNode(3).is_fatal());
        assert!(!GeometryError::missing("axis").is_fatal());
        assert!(!GeometryError::NonPositiveScale(0.0).is_fatal());
        assert!(!GeometryError::EmptyStl("a.stl".to_string()).is_fatal());
    }

    #[test]
    fn messages_name_the_file() {
        let err = GeometryError::UnreadableFile("mesh.stl".to_string());
        assert_eq!(
            err.to_string(),
            "STL file `mesh.stl` does not exist or is not readable"
        );
        assert_eq!(
            GeometryError::MalformedStl("m.stl".into()).to_string(),
            "failed to parse STL file `m.stl`"
        );
    }
}
