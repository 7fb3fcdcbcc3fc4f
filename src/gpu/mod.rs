//! The device capability the registry drives.
//!
//! [`GpuDevice`] is the seam between resource bookkeeping and the graphics
//! API. Objects live inside the device implementation and are addressed by
//! opaque handles; the [`crate::resources::ResourceManager`] is the only
//! caller that releases them.

pub mod surface;
pub mod wgpu_device;

use std::sync::mpsc::Receiver;

use crate::error::NanoResult;
use crate::shader::layout::LayoutEntry;

macro_rules! gpu_handle {
        ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
                $(
                        $(#[$meta])*
                        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
                        pub struct $name(u64);

                        impl $name
                        {
                                pub fn new(raw: u64) -> Self
                                {
                                        Self(raw)
                                }

                                pub fn raw(&self) -> u64
                                {
                                        self.0
                                }
                        }
                )*
        };
}

gpu_handle!(
        BufferHandle,
        ShaderModuleHandle,
        BindGroupLayoutHandle,
        PipelineLayoutHandle,
        ComputePipelineHandle,
        RenderPipelineHandle,
        BindGroupHandle,
);

/// Any object a device hands out, for release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuObject
{
        Buffer(BufferHandle),
        ShaderModule(ShaderModuleHandle),
        BindGroupLayout(BindGroupLayoutHandle),
        PipelineLayout(PipelineLayoutHandle),
        ComputePipeline(ComputePipelineHandle),
        RenderPipeline(RenderPipelineHandle),
        BindGroup(BindGroupHandle),
}

#[derive(Debug, Clone)]
pub struct BufferDesc<'a>
{
        pub label: &'a str,
        pub size: u64,
        pub usage: wgpu::BufferUsages,
}

#[derive(Debug, Clone)]
pub struct BindGroupLayoutDesc<'a>
{
        pub label: &'a str,
        pub entries: &'a [LayoutEntry],
}

#[derive(Debug, Clone)]
pub struct ComputePipelineDesc<'a>
{
        pub label: &'a str,
        pub layout: PipelineLayoutHandle,
        pub module: ShaderModuleHandle,
        pub entry_point: &'a str,
}

/// Owned copy of a vertex-buffer layout, one per bound vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout
{
        pub stride: u64,
        pub step_mode: wgpu::VertexStepMode,
        pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout
{
        pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_>
        {
                wgpu::VertexBufferLayout {
                        array_stride: self.stride,
                        step_mode: self.step_mode,
                        attributes: &self.attributes,
                }
        }
}

#[derive(Debug, Clone)]
pub struct RenderPipelineDesc<'a>
{
        pub label: &'a str,
        pub layout: PipelineLayoutHandle,
        pub module: ShaderModuleHandle,
        pub vertex_entry: &'a str,
        pub fragment_entry: &'a str,
        pub vertex_buffers: &'a [VertexLayout],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupBufferEntry
{
        pub binding: u32,
        pub buffer: BufferHandle,
        pub offset: u64,
        pub size: u64,
}

#[derive(Debug, Clone)]
pub struct BindGroupDesc<'a>
{
        pub label: &'a str,
        pub layout: BindGroupLayoutHandle,
        pub entries: &'a [BindGroupBufferEntry],
}

#[derive(Debug, Clone)]
pub struct DispatchDesc<'a>
{
        pub label: &'a str,
        pub pipeline: ComputePipelineHandle,
        /// Indexed by group.
        pub bind_groups: &'a [BindGroupHandle],
        pub workgroups: [u32; 3],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBinding
{
        pub buffer: BufferHandle,
        pub format: wgpu::IndexFormat,
        pub count: u32,
}

/// One draw queued into the frame's shared render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawDesc
{
        pub label: String,
        pub pipeline: RenderPipelineHandle,
        pub bind_groups: Vec<BindGroupHandle>,
        pub vertex_buffers: Vec<BufferHandle>,
        pub index: Option<IndexBinding>,
        pub vertex_count: u32,
}

/// Completion signal of an asynchronous map, as delivered by the device.
pub type MapResult = Result<(), String>;

/// A staging copy whose map request has been issued.
#[derive(Debug)]
pub struct PendingMap
{
        pub staging: BufferHandle,
        pub receiver: Receiver<MapResult>,
}

pub trait GpuDevice
{
        fn create_buffer(
                &mut self,
                desc: &BufferDesc<'_>,
        ) -> NanoResult<BufferHandle>;

        fn write_buffer(
                &mut self,
                buffer: BufferHandle,
                offset: u64,
                data: &[u8],
        ) -> NanoResult<()>;

        fn create_shader_module(
                &mut self,
                label: &str,
                source: &str,
        ) -> NanoResult<ShaderModuleHandle>;

        fn create_bind_group_layout(
                &mut self,
                desc: &BindGroupLayoutDesc<'_>,
        ) -> NanoResult<BindGroupLayoutHandle>;

        fn create_pipeline_layout(
                &mut self,
                label: &str,
                bind_group_layouts: &[BindGroupLayoutHandle],
        ) -> NanoResult<PipelineLayoutHandle>;

        fn create_compute_pipeline(
                &mut self,
                desc: &ComputePipelineDesc<'_>,
        ) -> NanoResult<ComputePipelineHandle>;

        fn create_render_pipeline(
                &mut self,
                desc: &RenderPipelineDesc<'_>,
        ) -> NanoResult<RenderPipelineHandle>;

        fn create_bind_group(
                &mut self,
                desc: &BindGroupDesc<'_>,
        ) -> NanoResult<BindGroupHandle>;

        /// Frees the object. Unknown handles are ignored.
        fn release(
                &mut self,
                object: GpuObject,
        );

        /// Records one compute pass on its own encoder and submits it.
        fn dispatch(
                &mut self,
                desc: &DispatchDesc<'_>,
        ) -> NanoResult<()>;

        /// Queues a draw into the current frame's render pass.
        fn draw(
                &mut self,
                desc: DrawDesc,
        ) -> NanoResult<()>;

        /// Copies `size` bytes of `source` from `src_offset` to `dst_offset` of
        /// a staging buffer and requests that it be mapped for reading. A
        /// caller-supplied staging buffer is used as is, otherwise one is
        /// created.
        fn copy_to_staging(
                &mut self,
                source: BufferHandle,
                src_offset: u64,
                dst_offset: u64,
                size: u64,
                staging: Option<BufferHandle>,
        ) -> NanoResult<PendingMap>;

        /// Reads `size` bytes at `offset` of a mapped staging buffer and
        /// unmaps it.
        fn read_mapped(
                &mut self,
                staging: BufferHandle,
                offset: u64,
                size: u64,
        ) -> NanoResult<Vec<u8>>;

        /// Lets the device run pending callbacks without blocking.
        fn poll(&mut self);
}
