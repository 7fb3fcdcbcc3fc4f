//! [`GpuDevice`] backed by a real `wgpu` device presenting to a window.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc;

use winit::window::Window;

use crate::config::Config;
use crate::error::NanoError;
use crate::error::NanoResult;
use crate::gpu::BindGroupDesc;
use crate::gpu::BindGroupHandle;
use crate::gpu::BindGroupLayoutDesc;
use crate::gpu::BindGroupLayoutHandle;
use crate::gpu::BufferDesc;
use crate::gpu::BufferHandle;
use crate::gpu::ComputePipelineDesc;
use crate::gpu::ComputePipelineHandle;
use crate::gpu::DispatchDesc;
use crate::gpu::DrawDesc;
use crate::gpu::GpuDevice;
use crate::gpu::GpuObject;
use crate::gpu::PendingMap;
use crate::gpu::PipelineLayoutHandle;
use crate::gpu::RenderPipelineDesc;
use crate::gpu::RenderPipelineHandle;
use crate::gpu::ShaderModuleHandle;
use crate::gpu::VertexLayout;
use crate::gpu::surface::SurfaceManager;

/// The surface texture, encoder and queued draws of the frame being recorded.
#[derive(Debug)]
struct FrameContext
{
        output: wgpu::SurfaceTexture,
        view: wgpu::TextureView,
        encoder: wgpu::CommandEncoder,
        draws: Vec<DrawDesc>,
}

#[derive(Debug)]
pub struct WgpuDevice
{
        pub instance: wgpu::Instance,

        /// The handle to a physical graphics device.
        pub adapter: wgpu::Adapter,

        pub device: wgpu::Device,

        pub queue: wgpu::Queue,

        pub surface: SurfaceManager,

        next_handle: u64,

        buffers: HashMap<u64, wgpu::Buffer>,

        modules: HashMap<u64, wgpu::ShaderModule>,

        bind_group_layouts: HashMap<u64, wgpu::BindGroupLayout>,

        pipeline_layouts: HashMap<u64, wgpu::PipelineLayout>,

        compute_pipelines: HashMap<u64, wgpu::ComputePipeline>,

        render_pipelines: HashMap<u64, wgpu::RenderPipeline>,

        bind_groups: HashMap<u64, wgpu::BindGroup>,

        frame: Option<FrameContext>,
}

fn missing(
        kind: &str,
        raw: u64,
) -> NanoError
{
        NanoError::Gpu(format!("unknown {kind} handle {raw}"))
}

impl WgpuDevice
{
        pub async fn new(
                window: Arc<Window>,
                config: &Config,
        ) -> NanoResult<Self>
        {
                let instance = Self::instance();

                let surface = instance
                        .create_surface(window.clone())
                        .map_err(|e| NanoError::Surface(e.to_string()))?;

                let adapter = instance
                        .request_adapter(&wgpu::RequestAdapterOptions {
                                power_preference: wgpu::PowerPreference::HighPerformance,
                                compatible_surface: Some(&surface),
                                force_fallback_adapter: false,
                        })
                        .await
                        .map_err(|e| NanoError::Gpu(e.to_string()))?;

                log::info!("Adapter Info: {:#?}", adapter.get_info());

                let (device, queue) = adapter
                        .request_device(&wgpu::DeviceDescriptor {
                                label: Some("nano device"),
                                required_features: wgpu::Features::empty(),
                                required_limits: if cfg!(target_arch = "wasm32")
                                {
                                        wgpu::Limits::downlevel_webgl2_defaults()
                                }
                                else
                                {
                                        wgpu::Limits::default()
                                },
                                memory_hints: Default::default(),
                                trace: wgpu::Trace::Off,
                        })
                        .await
                        .map_err(|e| NanoError::Gpu(e.to_string()))?;

                device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
                        log::error!("Uncaptured wgpu error: {e}");
                }));

                let surface = SurfaceManager::new(
                        surface,
                        &window,
                        &adapter,
                        &device,
                        config.vsync,
                        config.sample_count,
                )?;

                Ok(Self {
                        instance,
                        adapter,
                        device,
                        queue,
                        surface,
                        next_handle: 1,
                        buffers: HashMap::new(),
                        modules: HashMap::new(),
                        bind_group_layouts: HashMap::new(),
                        pipeline_layouts: HashMap::new(),
                        compute_pipelines: HashMap::new(),
                        render_pipelines: HashMap::new(),
                        bind_groups: HashMap::new(),
                        frame: None,
                })
        }

        fn instance() -> wgpu::Instance
        {
                wgpu::Instance::new(&wgpu::InstanceDescriptor {
                        #[cfg(not(target_arch = "wasm32"))]
                        backends: wgpu::Backends::PRIMARY,
                        #[cfg(target_arch = "wasm32")]
                        backends: wgpu::Backends::GL,
                        ..Default::default()
                })
        }

        fn next_handle(&mut self) -> u64
        {
                let raw = self.next_handle;

                self.next_handle += 1;

                raw
        }

        /// Runs `create` inside a validation error scope so a bad shader or
        /// pipeline is reported as an error instead of aborting.
        fn scoped<T>(
                &self,
                what: &str,
                create: impl FnOnce(&wgpu::Device) -> T,
        ) -> NanoResult<T>
        {
                self.device.push_error_scope(wgpu::ErrorFilter::Validation);

                let value = create(&self.device);

                let error = self.device.pop_error_scope();

                #[cfg(not(target_arch = "wasm32"))]
                {
                        if let Some(e) = pollster::block_on(error)
                        {
                                return Err(NanoError::Gpu(format!("{what}: {e}")));
                        }
                }

                #[cfg(target_arch = "wasm32")]
                {
                        let what = what.to_owned();

                        wasm_bindgen_futures::spawn_local(async move {
                                if let Some(e) = error.await
                                {
                                        log::error!("{what}: {e}");
                                }
                        });
                }

                Ok(value)
        }

        fn buffer(
                &self,
                handle: BufferHandle,
        ) -> NanoResult<&wgpu::Buffer>
        {
                self.buffers
                        .get(&handle.raw())
                        .ok_or_else(|| missing("buffer", handle.raw()))
        }

        pub fn sample_count(&self) -> u32
        {
                self.surface.sample_count
        }

        /// Changes the MSAA sample count. Render pipelines must be rebuilt
        /// afterwards.
        pub fn set_sample_count(
                &mut self,
                sample_count: u32,
        ) -> NanoResult<()>
        {
                self.surface
                        .set_sample_count(&self.adapter, &self.device, sample_count)
        }

        pub fn resize(
                &mut self,
                width: u32,
                height: u32,
        )
        {
                self.surface.resize(&self.device, width, height);
        }

        pub fn size(&self) -> (u32, u32)
        {
                self.surface.size()
        }

        pub fn is_frame_open(&self) -> bool
        {
                self.frame.is_some()
        }

        /// Acquires the next surface texture and clears it.
        pub fn begin_frame(
                &mut self,
                clear: wgpu::Color,
        ) -> NanoResult<()>
        {
                if self.frame.is_some()
                {
                        log::warn!("Frame already open, ignoring begin_frame");
                        return Ok(());
                }

                let (output, view) = match self.surface.acquire()
                {
                        Ok(parts) => parts,
                        Err(e) =>
                        {
                                // Lost or outdated surfaces recover on the next frame.
                                self.surface.reconfigure(&self.device);
                                return Err(e);
                        }
                };

                let mut encoder = self
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                                label: Some("nano frame encoder"),
                        });

                {
                        let (target, resolve_target) = self.surface.targets(&view);

                        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                                label: Some("nano clear pass"),
                                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                        view: target,
                                        resolve_target,
                                        ops: wgpu::Operations {
                                                load: wgpu::LoadOp::Clear(clear),
                                                store: wgpu::StoreOp::Store,
                                        },
                                })],
                                depth_stencil_attachment: None,
                                timestamp_writes: None,
                                occlusion_query_set: None,
                        });
                }

                self.frame = Some(FrameContext {
                        output,
                        view,
                        encoder,
                        draws: Vec::new(),
                });

                Ok(())
        }

        /// Records every queued draw into one render pass that loads the
        /// cleared frame.
        pub fn flush_draws(&mut self) -> NanoResult<()>
        {
                let frame = self.frame.as_mut().ok_or(NanoError::NoFrame)?;

                if frame.draws.is_empty()
                {
                        return Ok(());
                }

                let draws = std::mem::take(&mut frame.draws);

                let (target, resolve_target) = self.surface.targets(&frame.view);

                let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("nano shader pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: target,
                                resolve_target,
                                ops: wgpu::Operations {
                                        load: wgpu::LoadOp::Load,
                                        store: wgpu::StoreOp::Store,
                                },
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                });

                for draw in &draws
                {
                        let Some(pipeline) = self.render_pipelines.get(&draw.pipeline.raw())
                        else
                        {
                                log::warn!("Draw '{}' skipped, pipeline was released", draw.label);
                                continue;
                        };

                        pass.set_pipeline(pipeline);

                        for (index, group) in draw.bind_groups.iter().enumerate()
                        {
                                if let Some(group) = self.bind_groups.get(&group.raw())
                                {
                                        pass.set_bind_group(index as u32, group, &[]);
                                }
                        }

                        for (slot, buffer) in draw.vertex_buffers.iter().enumerate()
                        {
                                if let Some(buffer) = self.buffers.get(&buffer.raw())
                                {
                                        pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                                }
                        }

                        match &draw.index
                        {
                                Some(index) =>
                                {
                                        if let Some(buffer) = self.buffers.get(&index.buffer.raw())
                                        {
                                                pass.set_index_buffer(buffer.slice(..), index.format);
                                                pass.draw_indexed(0..index.count, 0, 0..1);
                                        }
                                }
                                None => pass.draw(0..draw.vertex_count, 0..1),
                        }
                }

                Ok(())
        }

        /// Hands the frame's encoder and resolved surface view to `record`,
        /// for overlays drawn after the shaders.
        pub fn with_frame<R>(
                &mut self,
                record: impl FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView) -> R,
        ) -> NanoResult<R>
        {
                let frame = self.frame.as_mut().ok_or(NanoError::NoFrame)?;

                Ok(record(&self.device, &self.queue, &mut frame.encoder, &frame.view))
        }

        /// Submits the frame's commands and presents it.
        pub fn end_frame(&mut self) -> NanoResult<()>
        {
                self.flush_draws()?;

                let frame = self.frame.take().ok_or(NanoError::NoFrame)?;

                self.queue.submit(std::iter::once(frame.encoder.finish()));

                frame.output.present();

                Ok(())
        }

        /// Drops every remaining object, then the surface, device, adapter and
        /// instance, in that order.
        pub fn shutdown(mut self)
        {
                if let Some(frame) = self.frame.take()
                {
                        log::warn!("Shutting down with an open frame, {} draw(s) dropped", frame.draws.len());
                }

                self.bind_groups.clear();
                self.render_pipelines.clear();
                self.compute_pipelines.clear();
                self.pipeline_layouts.clear();
                self.bind_group_layouts.clear();
                self.modules.clear();

                for (_, buffer) in self.buffers.drain()
                {
                        buffer.destroy();
                }

                drop(self.surface);
                drop(self.queue);
                drop(self.device);
                drop(self.adapter);
                drop(self.instance);

                log::info!("GPU device released");
        }

        /// Number of live objects of every kind, for the debug overlay.
        pub fn object_count(&self) -> usize
        {
                self.buffers.len()
                        + self.modules.len()
                        + self.bind_group_layouts.len()
                        + self.pipeline_layouts.len()
                        + self.compute_pipelines.len()
                        + self.render_pipelines.len()
                        + self.bind_groups.len()
        }
}

impl GpuDevice for WgpuDevice
{
        fn create_buffer(
                &mut self,
                desc: &BufferDesc<'_>,
        ) -> NanoResult<BufferHandle>
        {
                let buffer = self.scoped(desc.label, |device| {
                        device.create_buffer(&wgpu::BufferDescriptor {
                                label: Some(desc.label),
                                size: desc.size,
                                usage: desc.usage,
                                mapped_at_creation: false,
                        })
                })?;

                let raw = self.next_handle();

                self.buffers.insert(raw, buffer);

                Ok(BufferHandle::new(raw))
        }

        fn write_buffer(
                &mut self,
                buffer: BufferHandle,
                offset: u64,
                data: &[u8],
        ) -> NanoResult<()>
        {
                let target = self.buffer(buffer)?;

                let padded_len = (data.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

                if offset + padded_len > target.size()
                {
                        return Err(NanoError::Gpu(format!(
                                "write of {} bytes at offset {} overflows a {} byte buffer",
                                data.len(),
                                offset,
                                target.size()
                        )));
                }

                if padded_len == data.len() as u64
                {
                        self.queue.write_buffer(target, offset, data);
                }
                else
                {
                        let mut padded = data.to_vec();

                        padded.resize(padded_len as usize, 0);

                        self.queue.write_buffer(target, offset, &padded);
                }

                Ok(())
        }

        fn create_shader_module(
                &mut self,
                label: &str,
                source: &str,
        ) -> NanoResult<ShaderModuleHandle>
        {
                let module = self.scoped(label, |device| {
                        device.create_shader_module(wgpu::ShaderModuleDescriptor {
                                label: Some(label),
                                source: wgpu::ShaderSource::Wgsl(source.into()),
                        })
                })?;

                let raw = self.next_handle();

                self.modules.insert(raw, module);

                Ok(ShaderModuleHandle::new(raw))
        }

        fn create_bind_group_layout(
                &mut self,
                desc: &BindGroupLayoutDesc<'_>,
        ) -> NanoResult<BindGroupLayoutHandle>
        {
                let entries: Vec<wgpu::BindGroupLayoutEntry> = desc.entries.iter().map(|e| e.to_wgpu()).collect();

                let layout = self.scoped(desc.label, |device| {
                        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                                label: Some(desc.label),
                                entries: &entries,
                        })
                })?;

                let raw = self.next_handle();

                self.bind_group_layouts.insert(raw, layout);

                Ok(BindGroupLayoutHandle::new(raw))
        }

        fn create_pipeline_layout(
                &mut self,
                label: &str,
                bind_group_layouts: &[BindGroupLayoutHandle],
        ) -> NanoResult<PipelineLayoutHandle>
        {
                let layouts = bind_group_layouts
                        .iter()
                        .map(|h| {
                                self.bind_group_layouts
                                        .get(&h.raw())
                                        .ok_or_else(|| missing("bind group layout", h.raw()))
                        })
                        .collect::<NanoResult<Vec<_>>>()?;

                let layout = self.scoped(label, |device| {
                        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                                label: Some(label),
                                bind_group_layouts: &layouts,
                                push_constant_ranges: &[],
                        })
                })?;

                let raw = self.next_handle();

                self.pipeline_layouts.insert(raw, layout);

                Ok(PipelineLayoutHandle::new(raw))
        }

        fn create_compute_pipeline(
                &mut self,
                desc: &ComputePipelineDesc<'_>,
        ) -> NanoResult<ComputePipelineHandle>
        {
                let layout = self
                        .pipeline_layouts
                        .get(&desc.layout.raw())
                        .ok_or_else(|| missing("pipeline layout", desc.layout.raw()))?;

                let module = self
                        .modules
                        .get(&desc.module.raw())
                        .ok_or_else(|| missing("shader module", desc.module.raw()))?;

                let pipeline = self.scoped(desc.label, |device| {
                        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                                label: Some(desc.label),
                                layout: Some(layout),
                                module,
                                entry_point: Some(desc.entry_point),
                                compilation_options: wgpu::PipelineCompilationOptions::default(),
                                cache: None,
                        })
                })?;

                let raw = self.next_handle();

                self.compute_pipelines.insert(raw, pipeline);

                Ok(ComputePipelineHandle::new(raw))
        }

        fn create_render_pipeline(
                &mut self,
                desc: &RenderPipelineDesc<'_>,
        ) -> NanoResult<RenderPipelineHandle>
        {
                let layout = self
                        .pipeline_layouts
                        .get(&desc.layout.raw())
                        .ok_or_else(|| missing("pipeline layout", desc.layout.raw()))?;

                let module = self
                        .modules
                        .get(&desc.module.raw())
                        .ok_or_else(|| missing("shader module", desc.module.raw()))?;

                let buffers: Vec<wgpu::VertexBufferLayout> = desc.vertex_buffers.iter().map(VertexLayout::as_wgpu).collect();

                let format = self.surface.format();

                let sample_count = self.surface.sample_count;

                let pipeline = self.scoped(desc.label, |device| {
                        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                                label: Some(desc.label),
                                layout: Some(layout),
                                vertex: wgpu::VertexState {
                                        module,
                                        entry_point: Some(desc.vertex_entry),
                                        buffers: &buffers,
                                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                                },
                                fragment: Some(wgpu::FragmentState {
                                        module,
                                        entry_point: Some(desc.fragment_entry),
                                        targets: &[Some(wgpu::ColorTargetState {
                                                format,
                                                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                                                write_mask: wgpu::ColorWrites::ALL,
                                        })],
                                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                                }),
                                primitive: wgpu::PrimitiveState {
                                        topology: wgpu::PrimitiveTopology::TriangleList,
                                        strip_index_format: None,
                                        front_face: wgpu::FrontFace::Ccw,
                                        cull_mode: None,
                                        polygon_mode: wgpu::PolygonMode::Fill,
                                        conservative: false,
                                        unclipped_depth: false,
                                },
                                depth_stencil: None,
                                multisample: wgpu::MultisampleState {
                                        count: sample_count,
                                        mask: !0,
                                        alpha_to_coverage_enabled: false,
                                },
                                multiview: None,
                                cache: None,
                        })
                })?;

                let raw = self.next_handle();

                self.render_pipelines.insert(raw, pipeline);

                Ok(RenderPipelineHandle::new(raw))
        }

        fn create_bind_group(
                &mut self,
                desc: &BindGroupDesc<'_>,
        ) -> NanoResult<BindGroupHandle>
        {
                let layout = self
                        .bind_group_layouts
                        .get(&desc.layout.raw())
                        .ok_or_else(|| missing("bind group layout", desc.layout.raw()))?;

                let mut entries = Vec::with_capacity(desc.entries.len());

                for entry in desc.entries
                {
                        let buffer = self.buffer(entry.buffer)?;

                        entries.push(wgpu::BindGroupEntry {
                                binding: entry.binding,
                                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                        buffer,
                                        offset: entry.offset,
                                        size: wgpu::BufferSize::new(entry.size),
                                }),
                        });
                }

                let group = self.scoped(desc.label, |device| {
                        device.create_bind_group(&wgpu::BindGroupDescriptor {
                                label: Some(desc.label),
                                layout,
                                entries: &entries,
                        })
                })?;

                let raw = self.next_handle();

                self.bind_groups.insert(raw, group);

                Ok(BindGroupHandle::new(raw))
        }

        fn release(
                &mut self,
                object: GpuObject,
        )
        {
                match object
                {
                        GpuObject::Buffer(h) =>
                        {
                                if let Some(buffer) = self.buffers.remove(&h.raw())
                                {
                                        buffer.destroy();
                                }
                        }
                        GpuObject::ShaderModule(h) =>
                        {
                                self.modules.remove(&h.raw());
                        }
                        GpuObject::BindGroupLayout(h) =>
                        {
                                self.bind_group_layouts.remove(&h.raw());
                        }
                        GpuObject::PipelineLayout(h) =>
                        {
                                self.pipeline_layouts.remove(&h.raw());
                        }
                        GpuObject::ComputePipeline(h) =>
                        {
                                self.compute_pipelines.remove(&h.raw());
                        }
                        GpuObject::RenderPipeline(h) =>
                        {
                                self.render_pipelines.remove(&h.raw());
                        }
                        GpuObject::BindGroup(h) =>
                        {
                                self.bind_groups.remove(&h.raw());
                        }
                }
        }

        fn dispatch(
                &mut self,
                desc: &DispatchDesc<'_>,
        ) -> NanoResult<()>
        {
                let limit = self.device.limits().max_compute_workgroups_per_dimension;

                if desc.workgroups.iter().any(|&n| n > limit)
                {
                        return Err(NanoError::Gpu(format!(
                                "'{}' dispatch of {:?} workgroups exceeds the device limit of {limit}",
                                desc.label, desc.workgroups
                        )));
                }

                let pipeline = self
                        .compute_pipelines
                        .get(&desc.pipeline.raw())
                        .ok_or_else(|| missing("compute pipeline", desc.pipeline.raw()))?;

                let mut encoder = self
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                                label: Some(desc.label),
                        });

                {
                        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                                label: Some(desc.label),
                                timestamp_writes: None,
                        });

                        pass.set_pipeline(pipeline);

                        for (index, group) in desc.bind_groups.iter().enumerate()
                        {
                                let group = self
                                        .bind_groups
                                        .get(&group.raw())
                                        .ok_or_else(|| missing("bind group", group.raw()))?;

                                pass.set_bind_group(index as u32, group, &[]);
                        }

                        let [x, y, z] = desc.workgroups;

                        pass.dispatch_workgroups(x, y, z);
                }

                self.queue.submit(std::iter::once(encoder.finish()));

                Ok(())
        }

        fn draw(
                &mut self,
                desc: DrawDesc,
        ) -> NanoResult<()>
        {
                let frame = self.frame.as_mut().ok_or(NanoError::NoFrame)?;

                frame.draws.push(desc);

                Ok(())
        }

        fn copy_to_staging(
                &mut self,
                source: BufferHandle,
                src_offset: u64,
                dst_offset: u64,
                size: u64,
                staging: Option<BufferHandle>,
        ) -> NanoResult<PendingMap>
        {
                let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

                let staging = match staging
                {
                        Some(handle) => handle,
                        None => self.create_buffer(&BufferDesc {
                                label: "nano readback staging",
                                size: dst_offset + size,
                                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                        })?,
                };

                let src = self.buffer(source)?;

                let dst = self.buffer(staging)?;

                let mut encoder = self
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                                label: Some("nano readback encoder"),
                        });

                encoder.copy_buffer_to_buffer(src, src_offset, dst, dst_offset, size);

                self.queue.submit(std::iter::once(encoder.finish()));

                let (sender, receiver) = mpsc::channel();

                dst.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                        let _ = sender.send(result.map_err(|e| e.to_string()));
                });

                Ok(PendingMap {
                        staging,
                        receiver,
                })
        }

        fn read_mapped(
                &mut self,
                staging: BufferHandle,
                offset: u64,
                size: u64,
        ) -> NanoResult<Vec<u8>>
        {
                let buffer = self.buffer(staging)?;

                let data = {
                        let mapped = buffer.slice(..).get_mapped_range();

                        mapped
                                .get(offset as usize..(offset + size) as usize)
                                .map(<[u8]>::to_vec)
                };

                buffer.unmap();

                data.ok_or_else(|| NanoError::ReadbackFailed(format!("{size} bytes at {offset} exceed the staging buffer")))
        }

        fn poll(&mut self)
        {
                if let Err(e) = self.device.poll(wgpu::PollType::Poll)
                {
                        log::warn!("Device poll failed: {e}");
                }
        }
}
