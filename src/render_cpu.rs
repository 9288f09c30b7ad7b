use crate::{
    colorspace::{ScalarCoefficients, yuv_to_rgba},
    foundation::core::{FrameDims, YuvPlanes, check_len},
    foundation::error::{Plane, PlaneviewError, PlaneviewResult},
    render::{RenderSettings, Renderer},
    surface::Surface,
};

/// Converts frames on the host into a packed RGBA8 buffer and blits it.
pub struct CpuPlanarRenderer<S> {
    settings: RenderSettings,
    coeffs: ScalarCoefficients,
    ready: Option<CpuTarget<S>>,
}

struct CpuTarget<S> {
    surface: S,
    dims: FrameDims,
    /// Last frame the surface accepted.
    rgba: Vec<u8>,
    scratch: Vec<u8>,
}

impl<S: Surface> CpuPlanarRenderer<S> {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            coeffs: ScalarCoefficients::BT601,
            ready: None,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// The most recently presented frame.
    pub fn rgba(&self) -> Option<&[u8]> {
        self.ready.as_ref().map(|t| t.rgba.as_slice())
    }

    /// Blits an already converted packed RGBA8 frame.
    ///
    /// # Panics
    ///
    /// Panics if the renderer has not been successfully initialized.
    pub fn render_rgba(&mut self, rgba: &[u8]) -> PlaneviewResult<()> {
        let target = self.target_mut();
        check_len(Plane::Rgba, rgba, target.dims)?;
        target
            .surface
            .put_image_data(rgba, target.dims.width, target.dims.height)?;
        target.rgba.copy_from_slice(rgba);
        Ok(())
    }

    fn target_mut(&mut self) -> &mut CpuTarget<S> {
        match self.ready.as_mut() {
            Some(t) => t,
            None => panic!("cpu renderer used before a successful initialize"),
        }
    }
}

impl<S: Surface> Renderer for CpuPlanarRenderer<S> {
    type Target = S;

    #[tracing::instrument(skip(self, surface))]
    fn initialize(&mut self, surface: S, width: u32, height: u32) -> PlaneviewResult<()> {
        if self.ready.is_some() {
            return Err(PlaneviewError::initialization(
                "cpu renderer is already initialized",
            ));
        }
        let dims = FrameDims::new(width, height)?;
        if !dims.is_even() {
            tracing::warn!(width, height, "odd frame size, chroma planes round down");
        }

        self.ready = Some(CpuTarget {
            surface,
            dims,
            rgba: vec![0; dims.rgba_len()],
            scratch: vec![0; dims.rgba_len()],
        });
        tracing::info!(
            width,
            height,
            addressing = ?self.settings.chroma_addressing,
            "cpu renderer ready"
        );
        Ok(())
    }

    fn render_frame(&mut self, y: &[u8], u: &[u8], v: &[u8]) -> PlaneviewResult<()> {
        let addressing = self.settings.chroma_addressing;
        let coeffs = self.coeffs;
        let target = self.target_mut();

        let planes = YuvPlanes::new(y, u, v);
        planes.check(target.dims)?;

        yuv_to_rgba(
            target.dims,
            &planes,
            addressing,
            &coeffs,
            &mut target.scratch,
        );
        target
            .surface
            .put_image_data(&target.scratch, target.dims.width, target.dims.height)?;
        std::mem::swap(&mut target.rgba, &mut target.scratch);
        tracing::debug!(
            width = target.dims.width,
            height = target.dims.height,
            "cpu frame presented"
        );
        Ok(())
    }

    fn produces_alpha_channel(&self) -> bool {
        true
    }

    fn dims(&self) -> Option<FrameDims> {
        self.ready.as_ref().map(|t| t.dims)
    }

    fn surface(&self) -> Option<&S> {
        self.ready.as_ref().map(|t| &t.surface)
    }
}
