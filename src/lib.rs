#![forbid(unsafe_code)]

pub mod colorspace;
pub mod foundation;
pub mod frame_source;
pub mod geometry;
pub mod render;
pub mod render_cpu;
#[cfg(feature = "gpu")]
pub mod render_gpu;
pub mod surface;

pub use colorspace::{ChromaAddressing, ConversionMatrix, ScalarCoefficients, yuv_to_rgba};
pub use foundation::core::{FrameDims, YuvPlanes};
pub use foundation::error::{Plane, PlaneviewError, PlaneviewResult};
pub use frame_source::{I420Frame, I420Reader};
pub use geometry::{Mat4, Matrix, SceneMatrices};
pub use render::{
    BackendKind, GpuPower, PlanarRenderer, RenderSettings, Renderer, create_renderer,
};
pub use render_cpu::CpuPlanarRenderer;
#[cfg(feature = "gpu")]
pub use render_gpu::GpuPlanarRenderer;
pub use surface::{Canvas, Surface};
