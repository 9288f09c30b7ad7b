//! BT.601 YUV to RGB conversion.
//!
//! The GPU path applies [`ConversionMatrix::BT601`] to normalized samples in
//! the fragment shader. The CPU path uses [`ScalarCoefficients`] on 8-bit
//! samples with truncation toward zero at every step, which is the arithmetic
//! the planar CPU renderer has to reproduce bit for bit.

use crate::foundation::core::{FrameDims, YuvPlanes};

/// 4x4 transform applied to `(Y, U, V, 1)` with samples normalized to `[0, 1]`.
/// Row `r` produces output channel `r` (R, G, B, A); the fourth column folds
/// in the 16/128 offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConversionMatrix {
    pub rows: [[f32; 4]; 4],
}

impl ConversionMatrix {
    pub const BT601: Self = Self {
        rows: [
            [1.164_382_8, 0.0, 1.596_027_3, -0.870_785_15],
            [1.164_382_8, -0.391_761_72, -0.812_968_75, 0.529_593_75],
            [1.164_382_8, 2.017_234_4, 0.0, -1.081_390_6],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Normalized RGBA, unclamped.
    pub fn apply(&self, y: f32, u: f32, v: f32) -> [f32; 4] {
        let input = [y, u, v, 1.0];
        let mut out = [0.0f32; 4];
        for (channel, row) in out.iter_mut().zip(self.rows.iter()) {
            *channel = row.iter().zip(input.iter()).map(|(k, s)| k * s).sum();
        }
        out
    }

    /// What a `Rgba8Unorm` render target stores for one shaded sample: the
    /// clamped result rounded to nearest, alpha forced opaque.
    pub fn shade_u8(&self, y: u8, u: u8, v: u8) -> [u8; 4] {
        let [r, g, b, _] = self.apply(
            f32::from(y) / 255.0,
            f32::from(u) / 255.0,
            f32::from(v) / 255.0,
        );
        let unorm = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [unorm(r), unorm(g), unorm(b), 255]
    }
}

impl Default for ConversionMatrix {
    fn default() -> Self {
        Self::BT601
    }
}

/// Scalar multiply-add form of the BT.601 matrix used by the CPU renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalarCoefficients {
    pub luma: f64,
    pub r_from_v: f64,
    pub g_from_u: f64,
    pub g_from_v: f64,
    pub b_from_u: f64,
}

impl ScalarCoefficients {
    pub const BT601: Self = Self {
        luma: 1.164,
        r_from_v: 1.596,
        g_from_u: 0.391,
        g_from_v: 0.813,
        b_from_u: 2.018,
    };

    /// Converts one sample triple. Every intermediate is truncated toward
    /// zero; the final channels saturate to `0..=255`.
    #[inline]
    pub fn convert(&self, y: u8, u: u8, v: u8) -> [u8; 4] {
        let x = (self.luma * (f64::from(y) - 16.0)).trunc();
        let d = f64::from(u) - 128.0;
        let e = f64::from(v) - 128.0;
        let r = (x + self.r_from_v * e).trunc();
        let g = (x - self.g_from_u * d - self.g_from_v * e).trunc();
        let b = (x + self.b_from_u * d).trunc();
        [saturate(r), saturate(g), saturate(b), 255]
    }
}

impl Default for ScalarCoefficients {
    fn default() -> Self {
        Self::BT601
    }
}

#[inline]
fn saturate(c: f64) -> u8 {
    c.clamp(0.0, 255.0) as u8
}

/// How a luma position maps to its chroma sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChromaAddressing {
    /// `((row * width) >> 2) + (col >> 1)`, the addressing of the reference
    /// converter. Indices past the end of the plane read its last sample.
    #[default]
    Reference,
    /// `(row / 2) * (width / 2) + col / 2`, true 4:2:0 siting. Odd edges reuse
    /// the last chroma row or column.
    Standard,
}

impl ChromaAddressing {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" => Some(Self::Reference),
            "standard" => Some(Self::Standard),
            _ => None,
        }
    }

    #[inline]
    fn row_base(self, row: usize, dims: FrameDims) -> usize {
        let width = dims.width as usize;
        match self {
            Self::Reference => (row * width) >> 2,
            Self::Standard => {
                let chroma_rows = dims.chroma_height() as usize;
                (row / 2).min(chroma_rows - 1) * dims.chroma_width() as usize
            }
        }
    }

    #[inline]
    fn col_offset(self, col: usize, dims: FrameDims) -> usize {
        match self {
            Self::Reference => col >> 1,
            Self::Standard => (col / 2).min(dims.chroma_width() as usize - 1),
        }
    }

    /// Chroma sample index for luma position `(row, col)`, always in bounds.
    pub fn chroma_index(self, row: usize, col: usize, dims: FrameDims) -> usize {
        let idx = self.row_base(row, dims) + self.col_offset(col, dims);
        idx.min(dims.chroma_len() - 1)
    }
}

/// Converts a whole frame into packed row-major RGBA8.
///
/// `planes` must already match `dims` and `out` must hold `dims.rgba_len()`
/// bytes.
pub fn yuv_to_rgba(
    dims: FrameDims,
    planes: &YuvPlanes<'_>,
    addressing: ChromaAddressing,
    coeffs: &ScalarCoefficients,
    out: &mut [u8],
) {
    debug_assert_eq!(out.len(), dims.rgba_len());
    let width = dims.width as usize;
    let chroma_last = dims.chroma_len() - 1;

    for (row, dst_row) in out.chunks_exact_mut(width * 4).enumerate() {
        let luma_row = &planes.y[row * width..(row + 1) * width];
        let base = addressing.row_base(row, dims);
        for (col, (dst, &y)) in dst_row.chunks_exact_mut(4).zip(luma_row).enumerate() {
            let c = (base + addressing.col_offset(col, dims)).min(chroma_last);
            dst.copy_from_slice(&coeffs.convert(y, planes.u[c], planes.v[c]));
        }
    }
}
