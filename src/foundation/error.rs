use std::fmt;

pub type PlaneviewResult<T> = Result<T, PlaneviewError>;

/// A pixel buffer a renderer checks against the frame dimensions: one of the
/// three sample planes, or a packed RGBA8 image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Plane {
    Y,
    U,
    V,
    Rgba,
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Plane::Y => "Y",
            Plane::U => "U",
            Plane::V => "V",
            Plane::Rgba => "RGBA",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PlaneviewError {
    #[error("initialization failure: {0}")]
    Initialization(String),

    #[error("dimension mismatch: {plane} plane has {actual} bytes, expected {expected}")]
    DimensionMismatch {
        plane: Plane,
        expected: usize,
        actual: usize,
    },

    #[error("geometry construction failure: {0}")]
    Geometry(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlaneviewError {
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn dimension_mismatch(plane: Plane, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            plane,
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            PlaneviewError::initialization("x")
                .to_string()
                .contains("initialization failure:")
        );
        assert!(
            PlaneviewError::geometry("x")
                .to_string()
                .contains("geometry construction failure:")
        );
        assert!(
            PlaneviewError::config("x")
                .to_string()
                .contains("configuration error:")
        );
        assert!(
            PlaneviewError::dimension_mismatch(Plane::U, 4, 3)
                .to_string()
                .contains("dimension mismatch:")
        );
    }

    #[test]
    fn dimension_mismatch_names_the_plane() {
        let msg = PlaneviewError::dimension_mismatch(Plane::Y, 16, 15).to_string();
        assert_eq!(msg, "dimension mismatch: Y plane has 15 bytes, expected 16");
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = PlaneviewError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
