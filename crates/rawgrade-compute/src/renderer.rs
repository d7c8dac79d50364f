//! The dispatcher.
//!
//! [`Renderer`] owns the compute pipeline and bind group layouts, binds a
//! frame's textures, uploads the uniform, and walks an 8x8 workgroup grid
//! over each tile. Output is read back as rgba8 rows.
//!
//! A dispatch is a pure function of its inputs: identical planes and
//! parameters produce identical bytes, and nothing is retained between
//! calls except the pipeline objects themselves. Images wider or taller
//! than the device's 2D texture limit are split into tiles; per-tile
//! inputs represent the absolute pixels at the tile offset carried in the
//! uniform, so seams cannot show.

use std::sync::Arc;
use std::time::Duration;

use half::f16;
use rawgrade_core::{Adjustments, Lut3D};
use wgpu::util::DeviceExt;

use crate::input::{slice_region, FlarePlane, FrameInput};
use crate::shaders;
use crate::uniform::{FrameDesc, PipelineParams};
use crate::{GpuContext, RenderError, RenderResult};

/// How long a readback may block before the host gives up.
const READBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Internal per-tile view of the frame planes.
struct TileData<'a> {
    image: &'a [f32],
    blurs: [&'a [f32]; 4],
    masks: Vec<&'a [f32]>,
    width: u32,
    height: u32,
}

/// The GPU render pipeline.
pub struct Renderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::ComputePipeline,
    io_layout: wgpu::BindGroupLayout,
    blur_layout: wgpu::BindGroupLayout,
    mask_layout: wgpu::BindGroupLayout,
    aux_layout: wgpu::BindGroupLayout,
    lut_sampler: wgpu::Sampler,
    flare_sampler: wgpu::Sampler,
    max_dim: u32,
}

fn sampled_texture_entry(binding: u32, dim: wgpu::TextureViewDimension, filterable: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: dim,
            multisampled: false,
        },
        count: None,
    }
}

impl Renderer {
    /// Builds the pipeline on the given context.
    pub fn new(context: &GpuContext) -> RenderResult<Self> {
        let device = Arc::clone(&context.device);
        let queue = Arc::clone(&context.queue);
        let max_dim = context.limits().max_texture_dimension_2d;

        let shader = context.create_shader("rawgrade kernel", &shaders::kernel_source());

        let io_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rawgrade io layout"),
            entries: &[
                sampled_texture_entry(0, wgpu::TextureViewDimension::D2, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let blur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rawgrade blur layout"),
            entries: &[
                sampled_texture_entry(0, wgpu::TextureViewDimension::D2, false),
                sampled_texture_entry(1, wgpu::TextureViewDimension::D2, false),
                sampled_texture_entry(2, wgpu::TextureViewDimension::D2, false),
                sampled_texture_entry(3, wgpu::TextureViewDimension::D2, false),
            ],
        });

        let mask_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rawgrade mask layout"),
            entries: &[sampled_texture_entry(0, wgpu::TextureViewDimension::D2Array, false)],
        });

        let aux_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rawgrade aux layout"),
            entries: &[
                sampled_texture_entry(0, wgpu::TextureViewDimension::D3, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                sampled_texture_entry(2, wgpu::TextureViewDimension::D2, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("rawgrade pipeline layout"),
            bind_group_layouts: &[&io_layout, &blur_layout, &mask_layout, &aux_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("rawgrade pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let clamp_linear = wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        };
        let lut_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("rawgrade lut sampler"),
            ..clamp_linear.clone()
        });
        let flare_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("rawgrade flare sampler"),
            ..clamp_linear
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            io_layout,
            blur_layout,
            mask_layout,
            aux_layout,
            lut_sampler,
            flare_sampler,
            max_dim,
        })
    }

    /// Renders a frame to rgba8 bytes.
    ///
    /// Validates the bundle and every plane, then dispatches the whole
    /// frame at once when it fits the device's texture limit, or walks it
    /// in tiles otherwise. Either way the returned buffer is
    /// `width * height * 4` bytes of final sRGB output.
    pub fn render(&self, frame: &FrameInput<'_>, adjustments: &Adjustments) -> RenderResult<Vec<u8>> {
        frame.validate(adjustments)?;

        let (width, height) = (frame.image.width, frame.image.height);
        let desc = FrameDesc {
            is_raw: frame.is_raw,
            has_lut: frame.lut.is_some(),
            full_size: (width, height),
        };
        let params = PipelineParams::build(adjustments, &desc)?;

        if width <= self.max_dim && height <= self.max_dim {
            log::debug!("rendering {width}x{height} in a single dispatch");
            let tile = TileData {
                image: frame.image.data,
                blurs: [
                    frame.blurs.sharpness.data,
                    frame.blurs.tonal.data,
                    frame.blurs.clarity.data,
                    frame.blurs.structure.data,
                ],
                masks: frame.masks.iter().map(|m| m.data).collect(),
                width,
                height,
            };
            return self.dispatch_tile(&tile, frame.lut, frame.flare, &params);
        }

        let tile_size = (self.max_dim / 2).min(2048).max(256);
        let tiles_x = width.div_ceil(tile_size);
        let tiles_y = height.div_ceil(tile_size);
        log::debug!(
            "rendering {width}x{height} as {}x{} tiles of {tile_size}px",
            tiles_x,
            tiles_y
        );

        let mut output = vec![0u8; (width as usize) * (height as usize) * 4];
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let x = tx * tile_size;
                let y = ty * tile_size;
                let tw = tile_size.min(width - x);
                let th = tile_size.min(height - y);
                log::trace!("tile ({tx},{ty}) at {x},{y} size {tw}x{th}");

                let image = slice_region(frame.image.data, width, x, y, tw, th, 4);
                let blur_slices: Vec<Vec<f32>> = [
                    frame.blurs.sharpness.data,
                    frame.blurs.tonal.data,
                    frame.blurs.clarity.data,
                    frame.blurs.structure.data,
                ]
                .iter()
                .map(|d| slice_region(d, width, x, y, tw, th, 4))
                .collect();
                let mask_slices: Vec<Vec<f32>> = frame
                    .masks
                    .iter()
                    .map(|m| slice_region(m.data, width, x, y, tw, th, 1))
                    .collect();

                let tile = TileData {
                    image: &image,
                    blurs: [
                        &blur_slices[0],
                        &blur_slices[1],
                        &blur_slices[2],
                        &blur_slices[3],
                    ],
                    masks: mask_slices.iter().map(|v| v.as_slice()).collect(),
                    width: tw,
                    height: th,
                };
                let tile_params = params.with_tile_offset(x, y);
                let pixels = self.dispatch_tile(&tile, frame.lut, frame.flare, &tile_params)?;

                let row_bytes = (tw as usize) * 4;
                for row in 0..th as usize {
                    let dst = ((y as usize + row) * width as usize + x as usize) * 4;
                    let src = row * row_bytes;
                    output[dst..dst + row_bytes].copy_from_slice(&pixels[src..src + row_bytes]);
                }
            }
        }
        Ok(output)
    }

    /// Binds one tile's inputs and dispatches the kernel over it.
    fn dispatch_tile(
        &self,
        tile: &TileData<'_>,
        lut: Option<&Lut3D>,
        flare: Option<FlarePlane<'_>>,
        params: &PipelineParams,
    ) -> RenderResult<Vec<u8>> {
        let (width, height) = (tile.width, tile.height);
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let input_texture = self.create_rgba32f(tile.image, width, height, "rawgrade input");
        let blur_textures: Vec<wgpu::Texture> = tile
            .blurs
            .iter()
            .zip(["sharpness", "tonal", "clarity", "structure"])
            .map(|(data, name)| self.create_rgba32f(data, width, height, name))
            .collect();
        let mask_texture = self.create_mask_array(&tile.masks, width, height);
        let lut_texture = self.create_lut_texture(lut);
        let flare_texture = self.create_flare_texture(flare);

        let output_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("rawgrade output"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("rawgrade params"),
                contents: bytemuck::bytes_of(params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let io_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rawgrade io group"),
            layout: &self.io_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(
                        &input_texture.create_view(&Default::default()),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        &output_texture.create_view(&Default::default()),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let blur_views: Vec<wgpu::TextureView> = blur_textures
            .iter()
            .map(|t| t.create_view(&Default::default()))
            .collect();
        let blur_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rawgrade blur group"),
            layout: &self.blur_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&blur_views[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&blur_views[1]),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&blur_views[2]),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&blur_views[3]),
                },
            ],
        });

        let mask_view = mask_texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let mask_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rawgrade mask group"),
            layout: &self.mask_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&mask_view),
            }],
        });

        let aux_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rawgrade aux group"),
            layout: &self.aux_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(
                        &lut_texture.create_view(&wgpu::TextureViewDescriptor {
                            dimension: Some(wgpu::TextureViewDimension::D3),
                            ..Default::default()
                        }),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.lut_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(
                        &flare_texture.create_view(&Default::default()),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.flare_sampler),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("rawgrade encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("rawgrade pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &io_group, &[]);
            pass.set_bind_group(1, &blur_group, &[]);
            pass.set_bind_group(2, &mask_group, &[]);
            pass.set_bind_group(3, &aux_group, &[]);
            pass.dispatch_workgroups(width.div_ceil(8), height.div_ceil(8), 1);
        }

        self.read_texture(encoder, &output_texture, extent)
    }

    fn create_rgba32f(&self, data: &[f32], width: u32, height: u32, label: &str) -> wgpu::Texture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(16 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        texture
    }

    /// One r32float layer per mask; a single zero layer when no masks are
    /// bound so the layout stays constant.
    fn create_mask_array(&self, masks: &[&[f32]], width: u32, height: u32) -> wgpu::Texture {
        let layers = masks.len().max(1) as u32;
        let (w, h) = if masks.is_empty() { (1, 1) } else { (width, height) };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("rawgrade mask influences"),
            size: wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        if masks.is_empty() {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                bytemuck::bytes_of(&0.0f32),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4),
                    rows_per_image: Some(1),
                },
                wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
            );
            return texture;
        }
        for (layer, data) in masks.iter().enumerate() {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                bytemuck::cast_slice(data),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
        texture
    }

    /// Uploads the LUT cube as rgba16float, or a tiny zero cube when none
    /// is bound (`has_lut = 0` gates every read).
    fn create_lut_texture(&self, lut: Option<&Lut3D>) -> wgpu::Texture {
        let (size, texels) = match lut {
            Some(cube) => {
                let texels: Vec<f16> = cube
                    .to_rgba_f32()
                    .into_iter()
                    .map(f16::from_f32)
                    .collect();
                (cube.size, texels)
            }
            None => (2, vec![f16::from_f32(0.0); 2 * 2 * 2 * 4]),
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("rawgrade lut"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: size,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(8 * size),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: size,
            },
        );
        texture
    }

    fn create_flare_texture(&self, flare: Option<FlarePlane<'_>>) -> wgpu::Texture {
        let placeholder = [0u8; 4];
        let (w, h, data): (u32, u32, &[u8]) = match &flare {
            Some(plane) => (plane.width, plane.height, plane.data),
            None => (1, 1, placeholder.as_slice()),
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("rawgrade flare"),
            size: wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );
        texture
    }

    /// Copies the output texture into a mapped buffer and strips the row
    /// padding the copy alignment forces on it.
    fn read_texture(
        &self,
        mut encoder: wgpu::CommandEncoder,
        texture: &wgpu::Texture,
        extent: wgpu::Extent3d,
    ) -> RenderResult<Vec<u8>> {
        let unpadded = 4 * extent.width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;
        let buffer_size = (padded * extent.height) as u64;

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rawgrade readback"),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(extent.height),
                },
            },
            extent,
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);

        match rx.recv_timeout(READBACK_TIMEOUT) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RenderError::Readback(e.to_string())),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                return Err(RenderError::Timeout {
                    seconds: READBACK_TIMEOUT.as_secs(),
                });
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                return Err(RenderError::DeviceLost(
                    "map callback dropped before completion".into(),
                ));
            }
        }

        let padded_data = slice.get_mapped_range().to_vec();
        readback.unmap();

        if padded == unpadded {
            return Ok(padded_data);
        }
        let mut pixels = Vec::with_capacity((unpadded * extent.height) as usize);
        for row in padded_data.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        Ok(pixels)
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("max_dim", &self.max_dim)
            .finish()
    }
}
