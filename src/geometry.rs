//! Fixed-size matrix helpers for projecting the presentation quad.
//!
//! Matrices are stored row-major (`rows[r][c]`) and flattened column-major
//! when handed to the shader.

use crate::foundation::error::{PlaneviewError, PlaneviewResult};

/// Quad corners in triangle-strip order: top-right, top-left, bottom-right, bottom-left.
pub const QUAD_POSITIONS: [f32; 12] = [
    1.0, 1.0, 0.0, //
    -1.0, 1.0, 0.0, //
    1.0, -1.0, 0.0, //
    -1.0, -1.0, 0.0,
];

/// Texture coordinates matching [`QUAD_POSITIONS`]; `v = 0` is the first texture row.
pub const QUAD_TEX_COORDS: [f32; 8] = [
    1.0, 0.0, //
    0.0, 0.0, //
    1.0, 1.0, //
    0.0, 1.0,
];

pub const QUAD_VERTEX_COUNT: u32 = 4;

pub const FIELD_OF_VIEW_DEG: f32 = 45.0;
pub const ASPECT: f32 = 1.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;
pub const CAMERA_DISTANCE: f32 = 2.4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4 {
    pub rows: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, znear: f32, zfar: f32) -> Self {
        let x = 2.0 * znear / (right - left);
        let y = 2.0 * znear / (top - bottom);
        let a = (right + left) / (right - left);
        let b = (top + bottom) / (top - bottom);
        let c = -(zfar + znear) / (zfar - znear);
        let d = -2.0 * zfar * znear / (zfar - znear);
        Self {
            rows: [
                [x, 0.0, a, 0.0],
                [0.0, y, b, 0.0],
                [0.0, 0.0, c, d],
                [0.0, 0.0, -1.0, 0.0],
            ],
        }
    }

    /// Symmetric perspective frustum; `fovy_deg` is the full vertical angle.
    pub fn perspective(fovy_deg: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        let ymax = znear * (fovy_deg * std::f32::consts::PI / 360.0).tan();
        let ymin = -ymax;
        let xmin = ymin * aspect;
        let xmax = ymax * aspect;
        Self::frustum(xmin, xmax, ymin, ymax, znear, zfar)
    }

    pub fn mul(&self, rhs: &Mat4) -> Mat4 {
        let mut rows = [[0.0f32; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, out) in row.iter_mut().enumerate() {
                *out = (0..4).map(|k| self.rows[r][k] * rhs.rows[k][c]).sum();
            }
        }
        Mat4 { rows }
    }
}

/// Variable-size matrix used on the way to a homogeneous [`Mat4`].
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: Vec<Vec<f32>>,
}

impl Matrix {
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Self {
        Self { rows }
    }

    pub fn identity(n: usize) -> Self {
        let rows = (0..n)
            .map(|r| (0..n).map(|c| if r == c { 1.0 } else { 0.0 }).collect())
            .collect();
        Self { rows }
    }

    /// Homogeneous translation: a 2-vector yields a 3x3 matrix with the offset
    /// in the last row, a 3-vector yields a 4x4 matrix with the offset in the
    /// last column.
    pub fn translation(v: &[f32]) -> PlaneviewResult<Self> {
        match *v {
            [x, y] => {
                let mut m = Self::identity(3);
                m.rows[2][0] = x;
                m.rows[2][1] = y;
                Ok(m)
            }
            [x, y, z] => {
                let mut m = Self::identity(4);
                m.rows[0][3] = x;
                m.rows[1][3] = y;
                m.rows[2][3] = z;
                Ok(m)
            }
            _ => Err(PlaneviewError::geometry(format!(
                "translation needs a 2- or 3-component vector, got {}",
                v.len()
            ))),
        }
    }

    /// Pads the matrix out to 4x4: missing entries are 1 on the diagonal and 0
    /// elsewhere. Anything wider or taller than 4 is rejected.
    pub fn ensure_4x4(&self) -> PlaneviewResult<Mat4> {
        if self.rows.len() > 4 {
            return Err(PlaneviewError::geometry(format!(
                "cannot pad a matrix with {} rows into 4x4",
                self.rows.len()
            )));
        }
        if let Some(wide) = self.rows.iter().find(|row| row.len() > 4) {
            return Err(PlaneviewError::geometry(format!(
                "cannot pad a matrix with {} columns into 4x4",
                wide.len()
            )));
        }

        let mut out = Mat4::IDENTITY;
        for (r, row) in self.rows.iter().enumerate() {
            for c in 0..4 {
                out.rows[r][c] = match row.get(c) {
                    Some(&v) => v,
                    None if r == c => 1.0,
                    None => 0.0,
                };
            }
        }
        Ok(out)
    }

    /// Column-major flattening of an arbitrary matrix, column count taken from
    /// the first row.
    pub fn flatten(&self) -> Vec<f32> {
        let Some(first) = self.rows.first() else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(first.len() * self.rows.len());
        for c in 0..first.len() {
            for row in &self.rows {
                out.push(row.get(c).copied().unwrap_or(0.0));
            }
        }
        out
    }
}

impl From<Mat4> for Matrix {
    fn from(m: Mat4) -> Self {
        Self {
            rows: m.rows.iter().map(|row| row.to_vec()).collect(),
        }
    }
}

/// Projection and model-view matrices for the presentation quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneMatrices {
    pub projection: Mat4,
    pub model_view: Mat4,
}

impl SceneMatrices {
    pub fn standard() -> PlaneviewResult<Self> {
        let projection = Mat4::perspective(FIELD_OF_VIEW_DEG, ASPECT, Z_NEAR, Z_FAR);
        let translation = Matrix::translation(&[0.0, 0.0, -CAMERA_DISTANCE])?;
        let model_view = Mat4::IDENTITY.mul(&translation.ensure_4x4()?);
        Ok(Self {
            projection,
            model_view,
        })
    }

    /// Uniform block contents: projection then model-view, each column-major.
    pub fn uniform_floats(&self) -> [f32; 32] {
        let mut out = [0.0f32; 32];
        let projection = Matrix::from(self.projection).flatten();
        let model_view = Matrix::from(self.model_view).flatten();
        out[..16].copy_from_slice(&projection);
        out[16..].copy_from_slice(&model_view);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn transform_point(m: &Mat4, p: [f32; 3]) -> [f32; 4] {
        let v = [p[0], p[1], p[2], 1.0];
        let mut out = [0.0f32; 4];
        for (r, o) in out.iter_mut().enumerate() {
            *o = (0..4).map(|k| m.rows[r][k] * v[k]).sum();
        }
        out
    }

    #[test]
    fn pads_2x2_with_identity() {
        let m = Matrix::from_rows(vec![vec![2.0, 3.0], vec![4.0, 5.0]]);
        let padded = m.ensure_4x4().unwrap();
        assert_eq!(
            padded.rows,
            [
                [2.0, 3.0, 0.0, 0.0],
                [4.0, 5.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]
        );
    }

    #[test]
    fn pads_3x3_translation() {
        let m = Matrix::translation(&[0.5, -0.5]).unwrap();
        let padded = m.ensure_4x4().unwrap();
        assert_eq!(padded.rows[2], [0.5, -0.5, 1.0, 0.0]);
        assert_eq!(padded.rows[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn full_4x4_is_untouched() {
        let m = Matrix::translation(&[1.0, 2.0, 3.0]).unwrap();
        let padded = m.ensure_4x4().unwrap();
        assert_eq!(padded.rows[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(padded.rows[1], [0.0, 1.0, 0.0, 2.0]);
        assert_eq!(padded.rows[2], [0.0, 0.0, 1.0, 3.0]);
    }

    #[test]
    fn oversized_matrices_are_rejected() {
        let err = Matrix::identity(5).ensure_4x4().unwrap_err();
        assert!(matches!(err, PlaneviewError::Geometry(_)));

        let wide = Matrix::from_rows(vec![vec![0.0; 5]]);
        assert!(matches!(
            wide.ensure_4x4(),
            Err(PlaneviewError::Geometry(_))
        ));
    }

    #[test]
    fn translation_rejects_other_arities() {
        assert!(Matrix::translation(&[1.0]).is_err());
        assert!(Matrix::translation(&[1.0, 2.0, 3.0, 4.0]).is_err());
    }

    #[test]
    fn flatten_is_column_major() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(m.flatten(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(Matrix::from_rows(vec![]).flatten().is_empty());

        let t = Mat4::frustum(-1.0, 1.0, -1.0, 1.0, 1.0, 3.0);
        let cols = Matrix::from(t).flatten();
        assert_eq!(cols.len(), 16);
        assert_eq!(cols[11], -1.0);
        assert_eq!(cols[14], t.rows[2][3]);
    }

    #[test]
    fn perspective_matches_frustum_terms() {
        let p = Mat4::perspective(45.0, 1.0, 0.1, 100.0);
        assert!(approx(p.rows[0][0], 2.414_213_5));
        assert!(approx(p.rows[1][1], 2.414_213_5));
        assert!(approx(p.rows[0][2], 0.0));
        assert!(approx(p.rows[1][2], 0.0));
        assert!(approx(p.rows[2][2], -1.002_002));
        assert!(approx(p.rows[2][3], -0.200_200_2));
        assert_eq!(p.rows[3], [0.0, 0.0, -1.0, 0.0]);
    }

    #[test]
    fn quad_covers_the_viewport() {
        let scene = SceneMatrices::standard().unwrap();
        let mvp = scene.projection.mul(&scene.model_view);
        for corner in QUAD_POSITIONS.chunks_exact(3) {
            let clip = transform_point(&mvp, [corner[0], corner[1], corner[2]]);
            let ndc_x = clip[0] / clip[3];
            let ndc_y = clip[1] / clip[3];
            assert!(ndc_x.abs() >= 1.0, "corner x {ndc_x} inside viewport");
            assert!(ndc_y.abs() >= 1.0, "corner y {ndc_y} inside viewport");
        }
    }

    #[test]
    fn uniform_floats_concatenate_both_matrices() {
        let scene = SceneMatrices::standard().unwrap();
        let floats = scene.uniform_floats();
        let projection = Matrix::from(scene.projection).flatten();
        assert_eq!(floats[..16], projection[..]);
        assert!(approx(floats[16 + 14], -CAMERA_DISTANCE));
    }
}
