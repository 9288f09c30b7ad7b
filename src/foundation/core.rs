use crate::foundation::error::{Plane, PlaneviewError, PlaneviewResult};

/// Luma dimensions of a frame. Chroma planes are half size in each direction,
/// rounded toward zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameDims {
    pub width: u32,
    pub height: u32,
}

impl FrameDims {
    pub fn new(width: u32, height: u32) -> PlaneviewResult<Self> {
        if width < 2 || height < 2 {
            return Err(PlaneviewError::initialization(format!(
                "frame dimensions must be at least 2x2, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn is_even(self) -> bool {
        self.width.is_multiple_of(2) && self.height.is_multiple_of(2)
    }

    pub fn chroma_width(self) -> u32 {
        self.width / 2
    }

    pub fn chroma_height(self) -> u32 {
        self.height / 2
    }

    pub fn luma_len(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn chroma_len(self) -> usize {
        self.chroma_width() as usize * self.chroma_height() as usize
    }

    pub fn rgba_len(self) -> usize {
        self.luma_len() * 4
    }

    pub fn expected_len(self, plane: Plane) -> usize {
        match plane {
            Plane::Y => self.luma_len(),
            Plane::U | Plane::V => self.chroma_len(),
            Plane::Rgba => self.rgba_len(),
        }
    }
}

/// Borrowed Y, U and V planes of one frame.
///
/// The planes are only borrowed for the duration of a single render call.
#[derive(Clone, Copy, Debug)]
pub struct YuvPlanes<'a> {
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
}

impl<'a> YuvPlanes<'a> {
    pub fn new(y: &'a [u8], u: &'a [u8], v: &'a [u8]) -> Self {
        Self { y, u, v }
    }

    /// Checks every plane against `dims` before anything is consumed, so a
    /// rejected frame never reaches the surface.
    pub fn check(&self, dims: FrameDims) -> PlaneviewResult<()> {
        check_len(Plane::Y, self.y, dims)?;
        check_len(Plane::U, self.u, dims)?;
        check_len(Plane::V, self.v, dims)
    }
}

pub fn check_len(plane: Plane, data: &[u8], dims: FrameDims) -> PlaneviewResult<()> {
    let expected = dims.expected_len(plane);
    if data.len() != expected {
        return Err(PlaneviewError::dimension_mismatch(
            plane,
            expected,
            data.len(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chroma_halves_round_toward_zero() {
        let dims = FrameDims::new(7, 5).unwrap();
        assert_eq!(dims.chroma_width(), 3);
        assert_eq!(dims.chroma_height(), 2);
        assert_eq!(dims.luma_len(), 35);
        assert_eq!(dims.chroma_len(), 6);
        assert!(!dims.is_even());
    }

    #[test]
    fn degenerate_dims_are_rejected() {
        assert!(FrameDims::new(0, 4).is_err());
        assert!(FrameDims::new(4, 1).is_err());
        assert!(FrameDims::new(2, 2).is_ok());
    }

    #[test]
    fn check_reports_first_bad_plane() {
        let dims = FrameDims::new(4, 4).unwrap();
        let y = [0u8; 16];
        let u = [0u8; 4];
        let short_v = [0u8; 3];

        assert!(YuvPlanes::new(&y, &u, &u).check(dims).is_ok());

        let err = YuvPlanes::new(&y, &u, &short_v).check(dims).unwrap_err();
        assert!(matches!(
            err,
            PlaneviewError::DimensionMismatch {
                plane: Plane::V,
                expected: 4,
                actual: 3
            }
        ));

        let err = YuvPlanes::new(&y[..15], &u, &short_v)
            .check(dims)
            .unwrap_err();
        assert!(matches!(
            err,
            PlaneviewError::DimensionMismatch {
                plane: Plane::Y,
                ..
            }
        ));
    }
}
