pub mod info;
pub mod layout;
pub mod parser;

use std::collections::BTreeMap;

use crate::gpu::BindGroupHandle;
use crate::gpu::BindGroupLayoutHandle;
use crate::gpu::ComputePipelineHandle;
use crate::gpu::GpuDevice;
use crate::gpu::GpuObject;
use crate::gpu::PipelineLayoutHandle;
use crate::gpu::RenderPipelineHandle;
use crate::gpu::ShaderModuleHandle;
use crate::gpu::VertexLayout;
use crate::pool::BufferId;
use crate::pool::ShaderId;
use crate::shader::info::ShaderInfo;

/// Vertex buffers a single render shader may bind.
pub const MAX_VERTEX_BUFFERS: usize = 8;

/// Non-instanced draws default to one triangle.
pub const DEFAULT_VERTEX_COUNT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderState
{
        /// Source stored, not parsed.
        Created,
        /// Parsed, entry points known.
        Validated,
        /// Layouts, bind groups and pipelines exist.
        Built,
        /// Built and present in the active list.
        Active,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexBinding
{
        pub buffer: BufferId,
        pub layout: VertexLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferBinding
{
        pub buffer: BufferId,
        pub format: wgpu::IndexFormat,
}

/// GPU objects produced by a build. Handles only; the device owns the objects.
#[derive(Debug, Default)]
pub struct BuildArtifacts
{
        pub module: Option<ShaderModuleHandle>,
        pub bind_group_layouts: Vec<BindGroupLayoutHandle>,
        pub pipeline_layout: Option<PipelineLayoutHandle>,
        pub compute_pipeline: Option<ComputePipelineHandle>,
        pub render_pipeline: Option<RenderPipelineHandle>,
        pub bind_groups: Vec<BindGroupHandle>,
}

impl BuildArtifacts
{
        /// Releases whatever has been created so far. Safe to call repeatedly.
        pub fn release<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
        )
        {
                for handle in self.bind_groups.drain(..)
                {
                        device.release(GpuObject::BindGroup(handle));
                }

                if let Some(handle) = self.render_pipeline.take()
                {
                        device.release(GpuObject::RenderPipeline(handle));
                }

                if let Some(handle) = self.compute_pipeline.take()
                {
                        device.release(GpuObject::ComputePipeline(handle));
                }

                if let Some(handle) = self.pipeline_layout.take()
                {
                        device.release(GpuObject::PipelineLayout(handle));
                }

                for handle in self.bind_group_layouts.drain(..)
                {
                        device.release(GpuObject::BindGroupLayout(handle));
                }

                if let Some(handle) = self.module.take()
                {
                        device.release(GpuObject::ShaderModule(handle));
                }
        }
}

/// Shader record stored in the shader pool.
#[derive(Debug)]
pub struct Shader
{
        pub id: ShaderId,

        pub label: String,

        pub source: String,

        pub state: ShaderState,

        /// `None` until validated.
        pub info: Option<ShaderInfo>,

        /// `(group, binding)` to the buffer assigned there.
        pub buffers: BTreeMap<(u32, u32), BufferId>,

        pub uniform_buffer: Option<BufferId>,

        pub vertex_buffers: Vec<VertexBinding>,

        pub index_buffer: Option<IndexBufferBinding>,

        /// Buffer whose element count sizes the compute dispatch.
        pub output_buffer: Option<BufferId>,

        /// Overrides the output buffer's element count when set.
        pub element_count: Option<u32>,

        pub vertex_count: u32,

        pub artifacts: BuildArtifacts,
}

impl Shader
{
        pub fn new(
                id: ShaderId,
                label: impl Into<String>,
                source: impl Into<String>,
        ) -> Self
        {
                Self {
                        id,
                        label: label.into(),
                        source: source.into(),
                        state: ShaderState::Created,
                        info: None,
                        buffers: BTreeMap::new(),
                        uniform_buffer: None,
                        vertex_buffers: Vec::new(),
                        index_buffer: None,
                        output_buffer: None,
                        element_count: None,
                        vertex_count: DEFAULT_VERTEX_COUNT,
                        artifacts: BuildArtifacts::default(),
                }
        }

        pub fn is_built(&self) -> bool
        {
                matches!(self.state, ShaderState::Built | ShaderState::Active)
        }

        pub fn is_active(&self) -> bool
        {
                self.state == ShaderState::Active
        }

        /// Drops a built but inactive shader back to `Validated`, so the next
        /// activation rebuilds it. Active shaders are left alone.
        pub fn invalidate(&mut self) -> bool
        {
                if self.state != ShaderState::Built
                {
                        return false;
                }

                self.state = ShaderState::Validated;

                true
        }

        pub fn is_compute(&self) -> bool
        {
                self.artifacts.compute_pipeline.is_some()
        }

        pub fn is_render(&self) -> bool
        {
                self.artifacts.render_pipeline.is_some()
        }

        /// Every buffer this shader reads or writes.
        pub fn bound_buffers(&self) -> Vec<BufferId>
        {
                let mut ids: Vec<BufferId> = self.buffers.values().copied().collect();

                ids.extend(self.vertex_buffers.iter().map(|v| v.buffer));

                ids.extend(self.index_buffer.map(|i| i.buffer));

                ids.sort_unstable();
                ids.dedup();

                ids
        }
}
