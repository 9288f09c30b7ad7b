use std::path::Path;

use crate::{
    colorspace::ChromaAddressing,
    foundation::core::FrameDims,
    foundation::error::{PlaneviewError, PlaneviewResult},
    render_cpu::CpuPlanarRenderer,
    surface::Surface,
};

pub const ENV_CHROMA_ADDRESSING: &str = "PLANEVIEW_CHROMA_ADDRESSING";
pub const ENV_GPU_POWER: &str = "PLANEVIEW_GPU_POWER";

/// Displays planar YUV 4:2:0 frames on a surface.
///
/// A renderer is initialized once, then fed one frame per call from the
/// thread that owns the surface. Nothing is buffered: every
/// [`render_frame`](Renderer::render_frame) replaces what is on screen.
pub trait Renderer {
    type Target: Surface;

    /// Binds `surface` and allocates every per-frame resource for
    /// `width x height` frames. A renderer accepts exactly one successful
    /// call.
    fn initialize(&mut self, surface: Self::Target, width: u32, height: u32)
    -> PlaneviewResult<()>;

    /// Converts and displays one frame. All three planes are validated before
    /// anything is uploaded, so a rejected frame leaves the previous one on
    /// screen.
    ///
    /// # Panics
    ///
    /// Panics if the renderer has not been successfully initialized.
    fn render_frame(&mut self, y: &[u8], u: &[u8], v: &[u8]) -> PlaneviewResult<()>;

    /// Whether the output carries a real per-pixel alpha channel.
    fn produces_alpha_channel(&self) -> bool;

    /// Frame size fixed at initialization, `None` before.
    fn dims(&self) -> Option<FrameDims>;

    fn surface(&self) -> Option<&Self::Target>;

    fn is_ready(&self) -> bool {
        self.dims().is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GpuPower {
    LowPower,
    #[default]
    HighPerformance,
}

impl GpuPower {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low-power" | "low" => Some(Self::LowPower),
            "high-performance" | "high" => Some(Self::HighPerformance),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSettings {
    pub chroma_addressing: ChromaAddressing,
    /// Color the GPU target is cleared to before the quad is drawn.
    pub clear_rgba: [u8; 4],
    pub power_preference: GpuPower,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            chroma_addressing: ChromaAddressing::Reference,
            clear_rgba: [0, 0, 0, 255],
            power_preference: GpuPower::HighPerformance,
        }
    }
}

impl RenderSettings {
    pub fn from_json_str(s: &str) -> PlaneviewResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| PlaneviewError::config(format!("invalid render settings: {e}")))
    }

    pub fn from_json_path(path: &Path) -> PlaneviewResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            PlaneviewError::config(format!(
                "invalid render settings in '{}': {e}",
                path.display()
            ))
        })
    }

    /// Applies `PLANEVIEW_CHROMA_ADDRESSING` and `PLANEVIEW_GPU_POWER` when set.
    pub fn with_env_overrides(self) -> PlaneviewResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> PlaneviewResult<Self> {
        if let Some(v) = lookup(ENV_CHROMA_ADDRESSING) {
            self.chroma_addressing = ChromaAddressing::parse(&v).ok_or_else(|| {
                PlaneviewError::config(format!("{ENV_CHROMA_ADDRESSING}: unknown value '{v}'"))
            })?;
        }
        if let Some(v) = lookup(ENV_GPU_POWER) {
            self.power_preference = GpuPower::parse(&v).ok_or_else(|| {
                PlaneviewError::config(format!("{ENV_GPU_POWER}: unknown value '{v}'"))
            })?;
        }
        Ok(self)
    }
}

/// The renderer chosen at startup. The variant never changes for the life of
/// the value.
pub enum PlanarRenderer<S: Surface> {
    Cpu(CpuPlanarRenderer<S>),
    #[cfg(feature = "gpu")]
    Gpu(crate::render_gpu::GpuPlanarRenderer<S>),
}

impl<S: Surface> PlanarRenderer<S> {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Cpu(_) => BackendKind::Cpu,
            #[cfg(feature = "gpu")]
            Self::Gpu(_) => BackendKind::Gpu,
        }
    }
}

impl<S: Surface> Renderer for PlanarRenderer<S> {
    type Target = S;

    fn initialize(&mut self, surface: S, width: u32, height: u32) -> PlaneviewResult<()> {
        match self {
            Self::Cpu(r) => r.initialize(surface, width, height),
            #[cfg(feature = "gpu")]
            Self::Gpu(r) => r.initialize(surface, width, height),
        }
    }

    fn render_frame(&mut self, y: &[u8], u: &[u8], v: &[u8]) -> PlaneviewResult<()> {
        match self {
            Self::Cpu(r) => r.render_frame(y, u, v),
            #[cfg(feature = "gpu")]
            Self::Gpu(r) => r.render_frame(y, u, v),
        }
    }

    fn produces_alpha_channel(&self) -> bool {
        match self {
            Self::Cpu(r) => r.produces_alpha_channel(),
            #[cfg(feature = "gpu")]
            Self::Gpu(r) => r.produces_alpha_channel(),
        }
    }

    fn dims(&self) -> Option<FrameDims> {
        match self {
            Self::Cpu(r) => r.dims(),
            #[cfg(feature = "gpu")]
            Self::Gpu(r) => r.dims(),
        }
    }

    fn surface(&self) -> Option<&S> {
        match self {
            Self::Cpu(r) => r.surface(),
            #[cfg(feature = "gpu")]
            Self::Gpu(r) => r.surface(),
        }
    }
}

pub fn create_renderer<S: Surface>(
    kind: BackendKind,
    settings: &RenderSettings,
) -> PlanarRenderer<S> {
    tracing::info!(?kind, "creating renderer");
    match kind {
        BackendKind::Cpu => PlanarRenderer::Cpu(CpuPlanarRenderer::new(settings.clone())),
        #[cfg(feature = "gpu")]
        BackendKind::Gpu => {
            PlanarRenderer::Gpu(crate::render_gpu::GpuPlanarRenderer::new(settings.clone()))
        }
    }
}
