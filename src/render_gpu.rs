use anyhow::anyhow;
use wgpu::util::DeviceExt as _;

use crate::{
    foundation::core::{FrameDims, YuvPlanes},
    foundation::error::{PlaneviewError, PlaneviewResult},
    geometry::{QUAD_POSITIONS, QUAD_TEX_COORDS, QUAD_VERTEX_COUNT, SceneMatrices},
    render::{GpuPower, RenderSettings, Renderer},
    surface::Surface,
};

const SHADER_SOURCE: &str = include_str!("shaders/planar.wgsl");

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const TEX_COORD_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Single-channel texture holding one sample plane.
struct PlaneTexture {
    width: u32,
    height: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl PlaneTexture {
    fn new(device: &wgpu::Device, label: &'static str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            width,
            height,
            texture,
            view,
        }
    }

    /// Replaces the whole texture with `data`, which must hold exactly
    /// `width * height` bytes.
    fn fill(&self, queue: &wgpu::Queue, data: &[u8]) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }
}

struct GpuTarget<S> {
    surface: S,
    dims: FrameDims,

    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    matrices_bind_group: wgpu::BindGroup,
    planes_bind_group: wgpu::BindGroup,
    positions: wgpu::Buffer,
    tex_coords: wgpu::Buffer,

    y: PlaneTexture,
    u: PlaneTexture,
    v: PlaneTexture,

    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    readback: wgpu::Buffer,
    readback_bytes_per_row: u32,
    frame: Vec<u8>,
}

/// Uploads Y, U and V as separate textures and converts to RGB in a fragment
/// shader drawn over a full-surface quad.
///
/// The shaded image is read back from an offscreen target and blitted to the
/// surface.
pub struct GpuPlanarRenderer<S> {
    settings: RenderSettings,
    ready: Option<GpuTarget<S>>,
}

impl<S: Surface> GpuPlanarRenderer<S> {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            ready: None,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    fn build(&self, surface: S, dims: FrameDims) -> PlaneviewResult<GpuTarget<S>> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: power_preference(self.settings.power_preference),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                PlaneviewError::initialization("no gpu adapter available")
            }
            other => {
                PlaneviewError::initialization(format!("wgpu request_adapter failed: {other:?}"))
            }
        })?;
        tracing::info!(adapter = %adapter.get_info().name, "gpu adapter selected");

        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                label: Some("planeview_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            }))
            .map_err(|e| {
                PlaneviewError::initialization(format!("wgpu request_device failed: {e:?}"))
            })?;

        let limits = device.limits();
        let max_side = limits.max_texture_dimension_2d;
        if dims.width > max_side || dims.height > max_side {
            return Err(PlaneviewError::initialization(format!(
                "{}x{} frame exceeds the device texture limit of {max_side}",
                dims.width, dims.height
            )));
        }

        let bytes_per_row_unpadded = dims
            .width
            .checked_mul(4)
            .ok_or_else(|| PlaneviewError::initialization("render target width overflow"))?;
        let readback_bytes_per_row =
            align_to(bytes_per_row_unpadded, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback_size = u64::from(readback_bytes_per_row) * u64::from(dims.height);
        if readback_size > limits.max_buffer_size {
            return Err(PlaneviewError::initialization(format!(
                "readback buffer of {readback_size} bytes exceeds the device limit of {}",
                limits.max_buffer_size
            )));
        }

        let scene = SceneMatrices::standard()?;

        // Everything below is validated as one unit so a rejected descriptor
        // surfaces as an error instead of reaching the uncaptured handler.
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let program = Program::new(&device);

        let y = PlaneTexture::new(&device, "planeview_y_plane", dims.width, dims.height);
        let u = PlaneTexture::new(
            &device,
            "planeview_u_plane",
            dims.chroma_width(),
            dims.chroma_height(),
        );
        let v = PlaneTexture::new(
            &device,
            "planeview_v_plane",
            dims.chroma_width(),
            dims.chroma_height(),
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("planeview_plane_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let matrices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("planeview_matrices"),
            contents: bytemuck::cast_slice(&scene.uniform_floats()),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("planeview_quad_positions"),
            contents: bytemuck::cast_slice(&QUAD_POSITIONS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let tex_coords = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("planeview_quad_tex_coords"),
            contents: bytemuck::cast_slice(&QUAD_TEX_COORDS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let matrices_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("planeview_matrices_bg"),
            layout: &program.matrices_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: matrices.as_entire_binding(),
            }],
        });
        let planes_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("planeview_planes_bg"),
            layout: &program.planes_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&y.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&u.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&v.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("planeview_target"),
            size: wgpu::Extent3d {
                width: dims.width,
                height: dims.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("planeview_readback"),
            size: readback_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(PlaneviewError::initialization(format!(
                "gpu resource creation failed: {err}"
            )));
        }

        Ok(GpuTarget {
            surface,
            dims,
            device,
            queue,
            pipeline: program.pipeline,
            matrices_bind_group,
            planes_bind_group,
            positions,
            tex_coords,
            y,
            u,
            v,
            target,
            target_view,
            readback,
            readback_bytes_per_row,
            frame: vec![0; dims.rgba_len()],
        })
    }
}

impl<S: Surface> Renderer for GpuPlanarRenderer<S> {
    type Target = S;

    #[tracing::instrument(skip(self, surface))]
    fn initialize(&mut self, surface: S, width: u32, height: u32) -> PlaneviewResult<()> {
        if self.ready.is_some() {
            return Err(PlaneviewError::initialization(
                "gpu renderer is already initialized",
            ));
        }
        let dims = FrameDims::new(width, height)?;
        if !dims.is_even() {
            tracing::warn!(width, height, "odd frame size, chroma planes round down");
        }

        let target = self.build(surface, dims).inspect_err(|e| {
            tracing::error!(error = %e, "gpu renderer initialization failed");
        })?;
        self.ready = Some(target);
        tracing::info!(width, height, "gpu renderer ready");
        Ok(())
    }

    fn render_frame(&mut self, y: &[u8], u: &[u8], v: &[u8]) -> PlaneviewResult<()> {
        let Some(t) = self.ready.as_mut() else {
            panic!("gpu renderer used before a successful initialize");
        };
        YuvPlanes::new(y, u, v).check(t.dims)?;

        t.y.fill(&t.queue, y);
        t.u.fill(&t.queue, u);
        t.v.fill(&t.queue, v);

        let [r, g, b, a] = self.settings.clear_rgba;
        let clear = wgpu::Color {
            r: f64::from(r) / 255.0,
            g: f64::from(g) / 255.0,
            b: f64::from(b) / 255.0,
            a: f64::from(a) / 255.0,
        };

        let mut encoder = t
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("planeview_frame_encoder"),
            });
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("planeview_frame_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &t.target_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_pipeline(&t.pipeline);
            rp.set_bind_group(0, &t.matrices_bind_group, &[]);
            rp.set_bind_group(1, &t.planes_bind_group, &[]);
            rp.set_vertex_buffer(0, t.positions.slice(..));
            rp.set_vertex_buffer(1, t.tex_coords.slice(..));
            rp.draw(0..QUAD_VERTEX_COUNT, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &t.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &t.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(t.readback_bytes_per_row),
                    rows_per_image: Some(t.dims.height),
                },
            },
            wgpu::Extent3d {
                width: t.dims.width,
                height: t.dims.height,
                depth_or_array_layers: 1,
            },
        );
        t.queue.submit(Some(encoder.finish()));

        let buffer_slice = t.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        t.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| PlaneviewError::Other(anyhow!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| PlaneviewError::Other(anyhow!("readback channel closed")))?
            .map_err(|e| PlaneviewError::Other(anyhow!("readback map failed: {e:?}")))?;

        {
            let mapped = buffer_slice.get_mapped_range();
            let row_bytes = t.dims.width as usize * 4;
            let padded_row_bytes = t.readback_bytes_per_row as usize;
            for (row, dst) in t.frame.chunks_exact_mut(row_bytes).enumerate() {
                let start = row * padded_row_bytes;
                dst.copy_from_slice(&mapped[start..start + row_bytes]);
            }
        }
        t.readback.unmap();

        t.surface
            .put_image_data(&t.frame, t.dims.width, t.dims.height)?;
        tracing::debug!(
            width = t.dims.width,
            height = t.dims.height,
            "gpu frame presented"
        );
        Ok(())
    }

    fn produces_alpha_channel(&self) -> bool {
        false
    }

    fn dims(&self) -> Option<FrameDims> {
        self.ready.as_ref().map(|t| t.dims)
    }

    fn surface(&self) -> Option<&S> {
        self.ready.as_ref().map(|t| &t.surface)
    }
}

/// Compiled shader stages and the layouts their bind groups follow.
struct Program {
    pipeline: wgpu::RenderPipeline,
    matrices_layout: wgpu::BindGroupLayout,
    planes_layout: wgpu::BindGroupLayout,
}

impl Program {
    fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("planeview_planar_shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let matrices_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("planeview_matrices_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let plane_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        };
        let planes_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("planeview_planes_bgl"),
            entries: &[
                plane_entry(0),
                plane_entry(1),
                plane_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("planeview_pl"),
            bind_group_layouts: &[&matrices_layout, &planes_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("planeview_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: 3 * 4,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &POSITION_ATTRS,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: 2 * 4,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &TEX_COORD_ATTRS,
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            matrices_layout,
            planes_layout,
        }
    }
}

fn power_preference(p: GpuPower) -> wgpu::PowerPreference {
    match p {
        GpuPower::LowPower => wgpu::PowerPreference::LowPower,
        GpuPower::HighPerformance => wgpu::PowerPreference::HighPerformance,
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}
