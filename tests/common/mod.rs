#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::mpsc;

use nano::NanoError;
use nano::NanoResult;
use nano::gpu::BindGroupDesc;
use nano::gpu::BindGroupHandle;
use nano::gpu::BindGroupLayoutDesc;
use nano::gpu::BindGroupLayoutHandle;
use nano::gpu::BufferDesc;
use nano::gpu::BufferHandle;
use nano::gpu::ComputePipelineDesc;
use nano::gpu::ComputePipelineHandle;
use nano::gpu::DispatchDesc;
use nano::gpu::DrawDesc;
use nano::gpu::GpuDevice;
use nano::gpu::GpuObject;
use nano::gpu::MapResult;
use nano::gpu::PendingMap;
use nano::gpu::PipelineLayoutHandle;
use nano::gpu::RenderPipelineDesc;
use nano::gpu::RenderPipelineHandle;
use nano::gpu::ShaderModuleHandle;
use nano::shader::layout::LayoutEntry;

pub const DOUBLE_WGSL: &str = r#"
@group(0) @binding(0) var<storage, read_write> data: array<f32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>)
{
        data[id.x] = data[id.x] * 2.0;
}
"#;

pub const TRIANGLE_WGSL: &str = r#"
struct VertexOut
{
        @builtin(position) position: vec4<f32>,
        @location(0) color: vec4<f32>,
};

@group(0) @binding(0) var<uniform> tint: vec4<f32>;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VertexOut
{
        var out: VertexOut;
        out.position = vec4<f32>(position, 0.0, 1.0);
        out.color = tint;
        return out;
}

@fragment
fn fs_main(input: VertexOut) -> @location(0) vec4<f32>
{
        return input.color;
}
"#;

/// A compute shader whose source differs only by a comment, so every label
/// hashes to its own id.
pub fn labelled_compute(label: &str) -> String
{
        format!("// {label}\n{DOUBLE_WGSL}")
}

#[derive(Debug, Clone)]
pub struct MockBuffer
{
        pub label: String,
        pub usage: wgpu::BufferUsages,
        pub contents: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDispatch
{
        pub label: String,
        pub workgroups: [u32; 3],
        pub bind_groups: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite
{
        pub buffer: BufferHandle,
        pub offset: u64,
        pub data: Vec<u8>,
}

/// Records every call and keeps buffer contents in memory. Map requests stay
/// pending until [`MockDevice::complete_maps`] or [`MockDevice::fail_maps`].
#[derive(Debug, Default)]
pub struct MockDevice
{
        next: u64,
        pub live: BTreeMap<u64, &'static str>,
        pub buffers: BTreeMap<u64, MockBuffer>,
        pub layouts: Vec<Vec<LayoutEntry>>,
        pub compute_pipelines: Vec<String>,
        pub render_pipelines: Vec<(String, String, usize)>,
        pub bind_groups: Vec<Vec<(u32, u64)>>,
        pub dispatches: Vec<RecordedDispatch>,
        pub draws: Vec<DrawDesc>,
        pub writes: Vec<RecordedWrite>,
        pub polls: usize,
        pub fail_render_pipelines: bool,
        pending: Vec<mpsc::Sender<MapResult>>,
}

impl MockDevice
{
        pub fn new() -> Self
        {
                Self::default()
        }

        fn issue(
                &mut self,
                kind: &'static str,
        ) -> u64
        {
                self.next += 1;

                self.live.insert(self.next, kind);

                self.next
        }

        pub fn live_count(&self) -> usize
        {
                self.live.len()
        }

        pub fn live_of(
                &self,
                kind: &str,
        ) -> usize
        {
                self.live.values().filter(|k| **k == kind).count()
        }

        pub fn contents(
                &self,
                buffer: BufferHandle,
        ) -> &[u8]
        {
                &self.buffers[&buffer.raw()].contents
        }

        /// Simulates a shader writing into a buffer.
        pub fn set_contents(
                &mut self,
                buffer: BufferHandle,
                bytes: &[u8],
        )
        {
                let target = &mut self.buffers.get_mut(&buffer.raw()).unwrap().contents;

                target[..bytes.len()].copy_from_slice(bytes);
        }

        pub fn complete_maps(&mut self)
        {
                for sender in self.pending.drain(..)
                {
                        let _ = sender.send(Ok(()));
                }
        }

        pub fn fail_maps(
                &mut self,
                message: &str,
        )
        {
                for sender in self.pending.drain(..)
                {
                        let _ = sender.send(Err(message.to_owned()));
                }
        }

        fn check(
                &self,
                raw: u64,
                kind: &str,
        ) -> NanoResult<()>
        {
                match self.live.get(&raw)
                {
                        Some(k) if *k == kind => Ok(()),
                        _ => Err(NanoError::Gpu(format!("unknown {kind} handle {raw}"))),
                }
        }
}

impl GpuDevice for MockDevice
{
        fn create_buffer(
                &mut self,
                desc: &BufferDesc<'_>,
        ) -> NanoResult<BufferHandle>
        {
                let raw = self.issue("buffer");

                self.buffers.insert(
                        raw,
                        MockBuffer {
                                label: desc.label.to_owned(),
                                usage: desc.usage,
                                contents: vec![0; desc.size as usize],
                        },
                );

                Ok(BufferHandle::new(raw))
        }

        fn write_buffer(
                &mut self,
                buffer: BufferHandle,
                offset: u64,
                data: &[u8],
        ) -> NanoResult<()>
        {
                self.check(buffer.raw(), "buffer")?;

                let contents = &mut self.buffers.get_mut(&buffer.raw()).unwrap().contents;

                let start = offset as usize;

                contents[start..start + data.len()].copy_from_slice(data);

                self.writes.push(RecordedWrite {
                        buffer,
                        offset,
                        data: data.to_vec(),
                });

                Ok(())
        }

        fn create_shader_module(
                &mut self,
                _label: &str,
                _source: &str,
        ) -> NanoResult<ShaderModuleHandle>
        {
                Ok(ShaderModuleHandle::new(self.issue("module")))
        }

        fn create_bind_group_layout(
                &mut self,
                desc: &BindGroupLayoutDesc<'_>,
        ) -> NanoResult<BindGroupLayoutHandle>
        {
                self.layouts.push(desc.entries.to_vec());

                Ok(BindGroupLayoutHandle::new(self.issue("bind group layout")))
        }

        fn create_pipeline_layout(
                &mut self,
                _label: &str,
                bind_group_layouts: &[BindGroupLayoutHandle],
        ) -> NanoResult<PipelineLayoutHandle>
        {
                for layout in bind_group_layouts
                {
                        self.check(layout.raw(), "bind group layout")?;
                }

                Ok(PipelineLayoutHandle::new(self.issue("pipeline layout")))
        }

        fn create_compute_pipeline(
                &mut self,
                desc: &ComputePipelineDesc<'_>,
        ) -> NanoResult<ComputePipelineHandle>
        {
                self.check(desc.layout.raw(), "pipeline layout")?;
                self.check(desc.module.raw(), "module")?;

                self.compute_pipelines.push(desc.entry_point.to_owned());

                Ok(ComputePipelineHandle::new(self.issue("compute pipeline")))
        }

        fn create_render_pipeline(
                &mut self,
                desc: &RenderPipelineDesc<'_>,
        ) -> NanoResult<RenderPipelineHandle>
        {
                if self.fail_render_pipelines
                {
                        return Err(NanoError::Gpu("render pipeline rejected".to_owned()));
                }

                self.check(desc.layout.raw(), "pipeline layout")?;
                self.check(desc.module.raw(), "module")?;

                self.render_pipelines.push((
                        desc.vertex_entry.to_owned(),
                        desc.fragment_entry.to_owned(),
                        desc.vertex_buffers.len(),
                ));

                Ok(RenderPipelineHandle::new(self.issue("render pipeline")))
        }

        fn create_bind_group(
                &mut self,
                desc: &BindGroupDesc<'_>,
        ) -> NanoResult<BindGroupHandle>
        {
                self.check(desc.layout.raw(), "bind group layout")?;

                for entry in desc.entries
                {
                        self.check(entry.buffer.raw(), "buffer")?;
                }

                self.bind_groups
                        .push(desc.entries.iter().map(|e| (e.binding, e.buffer.raw())).collect());

                Ok(BindGroupHandle::new(self.issue("bind group")))
        }

        fn release(
                &mut self,
                object: GpuObject,
        )
        {
                let raw = match object
                {
                        GpuObject::Buffer(h) =>
                        {
                                self.buffers.remove(&h.raw());
                                h.raw()
                        }
                        GpuObject::ShaderModule(h) => h.raw(),
                        GpuObject::BindGroupLayout(h) => h.raw(),
                        GpuObject::PipelineLayout(h) => h.raw(),
                        GpuObject::ComputePipeline(h) => h.raw(),
                        GpuObject::RenderPipeline(h) => h.raw(),
                        GpuObject::BindGroup(h) => h.raw(),
                };

                self.live.remove(&raw);
        }

        fn dispatch(
                &mut self,
                desc: &DispatchDesc<'_>,
        ) -> NanoResult<()>
        {
                self.check(desc.pipeline.raw(), "compute pipeline")?;

                self.dispatches.push(RecordedDispatch {
                        label: desc.label.to_owned(),
                        workgroups: desc.workgroups,
                        bind_groups: desc.bind_groups.len(),
                });

                Ok(())
        }

        fn draw(
                &mut self,
                desc: DrawDesc,
        ) -> NanoResult<()>
        {
                self.check(desc.pipeline.raw(), "render pipeline")?;

                self.draws.push(desc);

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
                self.check(source.raw(), "buffer")?;

                let staging = match staging
                {
                        Some(handle) => handle,
                        None => self.create_buffer(&BufferDesc {
                                label: "staging",
                                size: dst_offset + size,
                                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                        })?,
                };

                let (src, len) = (src_offset as usize, size as usize);

                let bytes = self.buffers[&source.raw()].contents[src..src + len].to_vec();

                let dst = dst_offset as usize;

                self.buffers.get_mut(&staging.raw()).unwrap().contents[dst..dst + len].copy_from_slice(&bytes);

                let (sender, receiver) = mpsc::channel();

                self.pending.push(sender);

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
                self.check(staging.raw(), "buffer")?;

                let start = offset as usize;

                Ok(self.buffers[&staging.raw()].contents[start..start + size as usize].to_vec())
        }

        fn poll(&mut self)
        {
                self.polls += 1;
        }
}
