//! The registry owning every buffer and shader record.
//!
//! [`ResourceManager`] holds the two pools and the ordered list of active
//! shaders. Every operation that touches the GPU takes the device explicitly,
//! which keeps the registry usable with any [`GpuDevice`].

use std::path::Path;

use bytemuck::Pod;

use crate::config::Config;
use crate::error::NanoError;
use crate::error::NanoResult;
use crate::gpu::BindGroupBufferEntry;
use crate::gpu::BindGroupDesc;
use crate::gpu::BindGroupLayoutDesc;
use crate::gpu::BufferDesc;
use crate::gpu::BufferHandle;
use crate::gpu::ComputePipelineDesc;
use crate::gpu::DispatchDesc;
use crate::gpu::DrawDesc;
use crate::gpu::GpuDevice;
use crate::gpu::GpuObject;
use crate::gpu::IndexBinding;
use crate::gpu::RenderPipelineDesc;
use crate::gpu::RenderPipelineHandle;
use crate::gpu::VertexLayout;
use crate::pool::ActiveList;
use crate::pool::BufferId;
use crate::pool::Pool;
use crate::pool::ShaderId;
use crate::shader::BuildArtifacts;
use crate::shader::IndexBufferBinding;
use crate::shader::MAX_VERTEX_BUFFERS;
use crate::shader::Shader;
use crate::shader::ShaderState;
use crate::shader::VertexBinding;
use crate::shader::info::BindingInfo;
use crate::shader::info::BindingKind;
use crate::shader::info::MAX_BINDINGS;
use crate::shader::info::MAX_GROUPS;
use crate::shader::info::ShaderInfo;
use crate::shader::info::WorkgroupSize;
use crate::shader::layout::GroupLayout;
use crate::shader::layout::PipelinePlan;
use crate::shader::layout::plan_bind_group_layouts;
use crate::shader::layout::plan_pipelines;
use crate::shader::parser::parse_shader;

/// Buffer sizes are rounded up to this many bytes.
pub const BUFFER_ALIGNMENT: u64 = 32;

/// Offsets of uniform and storage bindings must be multiples of this, the
/// default `min_uniform_buffer_offset_alignment` and
/// `min_storage_buffer_offset_alignment`.
pub const BINDING_OFFSET_ALIGNMENT: u64 = 256;

/// The alignment `offset` needs for a buffer with `usage`.
pub fn offset_alignment(usage: wgpu::BufferUsages) -> u64
{
        if usage.intersects(wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::STORAGE)
        {
                BINDING_OFFSET_ALIGNMENT
        }
        else
        {
                wgpu::COPY_BUFFER_ALIGNMENT
        }
}

pub fn align_size(size: u64) -> u64
{
        (size.max(1) + BUFFER_ALIGNMENT - 1) & !(BUFFER_ALIGNMENT - 1)
}

/// `ceil(elements / invocations per workgroup)`.
pub fn workgroup_count(
        elements: u32,
        size: WorkgroupSize,
) -> u32
{
        elements.div_ceil(size.invocations().max(1))
}

/// Buffer record stored in the buffer pool.
#[derive(Debug)]
pub struct Buffer
{
        pub id: BufferId,
        pub label: String,
        pub handle: BufferHandle,
        /// Aligned byte size of the GPU allocation.
        pub size: u64,
        pub count: u32,
        pub offset: u64,
        pub usage: wgpu::BufferUsages,
        data: Option<Vec<u8>>,
        dirty: bool,
}

impl Buffer
{
        /// CPU-side bytes last written or staged for upload.
        pub fn data(&self) -> Option<&[u8]>
        {
                self.data.as_deref()
        }

        pub fn is_dirty(&self) -> bool
        {
                self.dirty
        }

        /// Bytes visible to a binding, from `offset` to the end.
        pub fn binding_size(&self) -> u64
        {
                self.size - self.offset
        }
}

/// Size, element count and optional initial contents of a new buffer.
#[derive(Debug, Clone, Copy)]
pub struct BufferInit<'a>
{
        pub size: u64,
        pub count: u32,
        pub offset: u64,
        pub data: Option<&'a [u8]>,
}

impl<'a> BufferInit<'a>
{
        pub fn from_slice<T: Pod>(items: &'a [T]) -> Self
        {
                Self {
                        size: std::mem::size_of_val(items) as u64,
                        count: items.len() as u32,
                        offset: 0,
                        data: Some(bytemuck::cast_slice(items)),
                }
        }

        pub fn from_value<T: Pod>(value: &'a T) -> Self
        {
                Self {
                        size: std::mem::size_of::<T>() as u64,
                        count: 1,
                        offset: 0,
                        data: Some(bytemuck::bytes_of(value)),
                }
        }

        /// Room for `count` elements of `T`, left uninitialised.
        pub fn zeroed<T: Pod>(count: u32) -> Self
        {
                Self {
                        size: std::mem::size_of::<T>() as u64 * u64::from(count),
                        count,
                        offset: 0,
                        data: None,
                }
        }

        pub fn with_offset(
                mut self,
                offset: u64,
        ) -> Self
        {
                self.offset = offset;
                self
        }
}

/// Everything needed to create a shader's GPU objects, resolved up front so
/// a missing buffer fails before anything is allocated.
#[derive(Debug)]
struct BuildPlan
{
        label: String,
        source: String,
        pipelines: PipelinePlan,
        groups: Vec<GroupLayout>,
        bind_entries: Vec<Vec<BindGroupBufferEntry>>,
        vertex_layouts: Vec<VertexLayout>,
}

impl BuildPlan
{
        fn realize<D: GpuDevice + ?Sized>(
                &self,
                device: &mut D,
                artifacts: &mut BuildArtifacts,
        ) -> NanoResult<()>
        {
                let label = self.label.as_str();

                artifacts.module = Some(device.create_shader_module(label, &self.source)?);

                for group in &self.groups
                {
                        let layout = device.create_bind_group_layout(&BindGroupLayoutDesc {
                                label,
                                entries: &group.entries,
                        })?;

                        artifacts.bind_group_layouts.push(layout);
                }

                let layout = device.create_pipeline_layout(label, &artifacts.bind_group_layouts)?;

                artifacts.pipeline_layout = Some(layout);

                let Some(module) = artifacts.module
                else
                {
                        return Err(NanoError::Gpu(format!("shader module for '{label}' missing")));
                };

                if let Some(entry_point) = &self.pipelines.compute
                {
                        let pipeline = device.create_compute_pipeline(&ComputePipelineDesc {
                                label,
                                layout,
                                module,
                                entry_point,
                        })?;

                        artifacts.compute_pipeline = Some(pipeline);
                }

                if let Some((vertex_entry, fragment_entry)) = &self.pipelines.render
                {
                        let pipeline = device.create_render_pipeline(&RenderPipelineDesc {
                                label,
                                layout,
                                module,
                                vertex_entry,
                                fragment_entry,
                                vertex_buffers: &self.vertex_layouts,
                        })?;

                        artifacts.render_pipeline = Some(pipeline);
                }

                for (layout, entries) in artifacts.bind_group_layouts.iter().zip(&self.bind_entries)
                {
                        let group = device.create_bind_group(&BindGroupDesc {
                                label,
                                layout: *layout,
                                entries,
                        })?;

                        artifacts.bind_groups.push(group);
                }

                Ok(())
        }
}

#[derive(Debug)]
pub struct ResourceManager
{
        buffers: Pool<BufferId, Buffer>,

        shaders: Pool<ShaderId, Shader>,

        active: ActiveList<ShaderId>,

        /// Suffix for buffers created without a label.
        anonymous_buffers: u32,
}

impl ResourceManager
{
        pub fn new(
                max_shaders: usize,
                max_buffers: usize,
        ) -> Self
        {
                Self {
                        buffers: Pool::new("buffer", max_buffers.min(32), max_buffers),
                        shaders: Pool::new("shader", max_shaders.min(16), max_shaders),
                        active: ActiveList::new(max_shaders),
                        anonymous_buffers: 0,
                }
        }

        pub fn from_config(config: &Config) -> Self
        {
                Self::new(config.max_shaders, config.max_buffers)
        }

        // ---------------------------------------------------------------- shaders

        /// Stores and parses `source`. Creating the same source twice returns
        /// the existing shader.
        pub fn create_shader(
                &mut self,
                source: &str,
                label: Option<&str>,
        ) -> NanoResult<ShaderId>
        {
                let id = ShaderId::from_source(source);

                if self.shaders.contains(id)
                {
                        log::warn!("Shader {id} already exists, reusing it");
                        return Ok(id);
                }

                let label = label.map_or_else(|| format!("shader {id}"), str::to_owned);

                self.shaders.insert(id, Shader::new(id, label.as_str(), source))?;

                if let Err(e) = self.validate_shader(id)
                {
                        log::error!("Shader '{label}' rejected: {e}");
                        self.shaders.remove(id);
                        return Err(e);
                }

                log::info!("Shader '{label}' ({id}) added to pool");

                Ok(id)
        }

        pub fn create_shader_from_file(
                &mut self,
                path: impl AsRef<Path>,
                label: Option<&str>,
        ) -> NanoResult<ShaderId>
        {
                let path = path.as_ref();

                let source = std::fs::read_to_string(path).map_err(|source| NanoError::Io {
                        path: path.to_path_buf(),
                        source,
                })?;

                let fallback = path.file_name().map(|f| f.to_string_lossy().into_owned());

                self.create_shader(&source, label.or(fallback.as_deref()))
        }

        /// Re-parses the source, failing on parse errors or a missing entry
        /// point.
        pub fn validate_shader(
                &mut self,
                id: ShaderId,
        ) -> NanoResult<()>
        {
                let shader = self
                        .shaders
                        .get_mut(id)
                        .ok_or(NanoError::ShaderNotFound(id))?;

                let output = parse_shader(&shader.source, id);

                for diagnostic in &output.diagnostics
                {
                        log::warn!("Shader '{}': {}", shader.label, diagnostic);
                }

                if output.has_errors()
                {
                        return Err(NanoError::Parse {
                                shader: id,
                                diagnostics: output.diagnostics,
                        });
                }

                if output.info.entry_points.is_empty()
                {
                        return Err(NanoError::NoEntryPoints(id));
                }

                let mut info = output.info;

                for (&(group, binding), buffer) in &shader.buffers
                {
                        if let (Some(b), Some(buffer)) = (info.binding_mut(group, binding), self.buffers.get(*buffer))
                        {
                                b.size = buffer.size;
                        }
                }

                shader.info = Some(info);

                if shader.state == ShaderState::Created
                {
                        shader.state = ShaderState::Validated;
                }

                Ok(())
        }

        pub fn shader(
                &self,
                id: ShaderId,
        ) -> NanoResult<&Shader>
        {
                self.shaders.get(id).ok_or(NanoError::ShaderNotFound(id))
        }

        pub fn shader_info(
                &self,
                id: ShaderId,
        ) -> NanoResult<&ShaderInfo>
        {
                self.shader(id)?
                        .info
                        .as_ref()
                        .ok_or(NanoError::ShaderNotBuilt(id))
        }

        pub fn binding(
                &self,
                id: ShaderId,
                group: u32,
                binding: u32,
        ) -> NanoResult<&BindingInfo>
        {
                self.shader_info(id)?
                        .binding(group, binding)
                        .ok_or(NanoError::BindingNotFound {
                                shader: id,
                                group,
                                binding,
                        })
        }

        pub fn binding_by_name(
                &self,
                id: ShaderId,
                name: &str,
        ) -> NanoResult<&BindingInfo>
        {
                self.shader_info(id)?
                        .binding_by_name(name)
                        .ok_or_else(|| NanoError::BindingNameNotFound {
                                shader: id,
                                name: name.to_owned(),
                        })
        }

        pub fn log_shader_info(
                &self,
                id: ShaderId,
        ) -> NanoResult<()>
        {
                let shader = self.shader(id)?;

                let info = self.shader_info(id)?;

                log::info!("Shader '{}' ({}):\n{}", shader.label, id, info);

                Ok(())
        }

        pub fn shaders(&self) -> impl Iterator<Item = &Shader>
        {
                self.shaders.iter().map(|(_, s)| s)
        }

        pub fn shader_count(&self) -> usize
        {
                self.shaders.len()
        }

        // ---------------------------------------------------------------- buffers

        /// Creates the buffer backing a declared binding and records its size
        /// on the binding. The buffer is not assigned to the shader; use one of
        /// the `bind_*` calls for that.
        pub fn create_buffer<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                shader: ShaderId,
                group: u32,
                binding: u32,
                init: BufferInit<'_>,
        ) -> NanoResult<BufferId>
        {
                let info = self.binding(shader, group, binding)?;

                let parsed = match (info.kind, info.buffer_usage())
                {
                        (BindingKind::Buffer, Some(usage)) => usage,
                        _ =>
                        {
                                return Err(NanoError::UnsupportedBinding {
                                        shader,
                                        name: info.name.clone(),
                                });
                        }
                };

                let mut usage = parsed | wgpu::BufferUsages::COPY_DST;

                if parsed.contains(wgpu::BufferUsages::STORAGE)
                {
                        usage |= wgpu::BufferUsages::COPY_SRC;
                }

                let label = info.name.clone();

                let id = BufferId::from_label(&format!("{shader}/{group}/{binding}/{label}"));

                self.insert_buffer(device, id, label, usage, init)?;

                let size = self.buffer(id)?.size;

                if let Some(b) = self
                        .shaders
                        .get_mut(shader)
                        .and_then(|s| s.info.as_mut())
                        .and_then(|i| i.binding_mut(group, binding))
                {
                        b.size = size;
                }

                Ok(id)
        }

        pub fn create_vertex_buffer<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                init: BufferInit<'_>,
                label: Option<&str>,
        ) -> NanoResult<BufferId>
        {
                let label = self.buffer_label("vertex", label);

                let usage = wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST;

                self.insert_buffer(device, BufferId::from_label(&label), label, usage, init)
        }

        pub fn create_index_buffer<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                init: BufferInit<'_>,
                label: Option<&str>,
        ) -> NanoResult<BufferId>
        {
                let label = self.buffer_label("index", label);

                let usage = wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST;

                self.insert_buffer(device, BufferId::from_label(&label), label, usage, init)
        }

        fn buffer_label(
                &mut self,
                kind: &str,
                label: Option<&str>,
        ) -> String
        {
                match label
                {
                        Some(label) => label.to_owned(),
                        None =>
                        {
                                self.anonymous_buffers += 1;
                                format!("{kind} buffer #{}", self.anonymous_buffers)
                        }
                }
        }

        fn insert_buffer<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                id: BufferId,
                label: String,
                usage: wgpu::BufferUsages,
                init: BufferInit<'_>,
        ) -> NanoResult<BufferId>
        {
                if self.buffers.contains(id)
                {
                        return Err(NanoError::AlreadyExists(id));
                }

                let alignment = offset_alignment(usage);

                if init.offset % alignment != 0
                {
                        log::error!("Buffer '{label}' rejected: offset {} is misaligned", init.offset);

                        return Err(NanoError::MisalignedOffset {
                                offset: init.offset,
                                alignment,
                        });
                }

                let size = align_size(init.offset + init.size);

                let handle = device.create_buffer(&BufferDesc {
                        label: &label,
                        size,
                        usage,
                })?;

                if let Some(bytes) = init.data
                {
                        if let Err(e) = device.write_buffer(handle, init.offset, bytes)
                        {
                                device.release(GpuObject::Buffer(handle));
                                return Err(e);
                        }
                }

                let record = Buffer {
                        id,
                        label,
                        handle,
                        size,
                        count: init.count,
                        offset: init.offset,
                        usage,
                        data: init.data.map(<[u8]>::to_vec),
                        dirty: false,
                };

                log::info!(
                        "Buffer '{}' ({}) added to pool: {} bytes, {} elements",
                        record.label,
                        id,
                        size,
                        record.count
                );

                if let Err(e) = self.buffers.insert(id, record)
                {
                        device.release(GpuObject::Buffer(handle));
                        return Err(e);
                }

                Ok(id)
        }

        pub fn buffer(
                &self,
                id: BufferId,
        ) -> NanoResult<&Buffer>
        {
                self.buffers.get(id).ok_or(NanoError::BufferNotFound(id))
        }

        pub fn buffer_count(&self) -> usize
        {
                self.buffers.len()
        }

        /// Replaces the CPU copy of a buffer. The upload happens the next
        /// time a shader using it executes, or on [`Self::write_buffer`].
        pub fn update_buffer(
                &mut self,
                id: BufferId,
                bytes: &[u8],
        ) -> NanoResult<()>
        {
                let buffer = self
                        .buffers
                        .get_mut(id)
                        .ok_or(NanoError::BufferNotFound(id))?;

                if bytes.len() as u64 > buffer.binding_size()
                {
                        log::warn!("Update of buffer '{}' rejected: {} bytes", buffer.label, bytes.len());

                        return Err(NanoError::DataTooLarge {
                                buffer: id,
                                len: bytes.len(),
                                capacity: buffer.binding_size(),
                        });
                }

                buffer.data = Some(bytes.to_vec());
                buffer.dirty = true;

                Ok(())
        }

        pub fn update_buffer_with<T: Pod>(
                &mut self,
                id: BufferId,
                items: &[T],
        ) -> NanoResult<()>
        {
                self.update_buffer(id, bytemuck::cast_slice(items))
        }

        /// Uploads the CPU copy now.
        pub fn write_buffer<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                id: BufferId,
        ) -> NanoResult<()>
        {
                let buffer = self
                        .buffers
                        .get_mut(id)
                        .ok_or(NanoError::BufferNotFound(id))?;

                if let Some(data) = &buffer.data
                {
                        device.write_buffer(buffer.handle, buffer.offset, data)?;
                }

                buffer.dirty = false;

                Ok(())
        }

        fn sync_buffers<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                ids: &[BufferId],
        ) -> NanoResult<()>
        {
                for id in ids
                {
                        if self.buffer(*id)?.dirty
                        {
                                self.write_buffer(device, *id)?;
                        }
                }

                Ok(())
        }

        /// Frees the GPU buffer. Shaders referring to it lose their build, and
        /// active ones leave the active list, until they are given another
        /// buffer.
        pub fn release_buffer<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                id: BufferId,
        ) -> NanoResult<()>
        {
                let buffer = self
                        .buffers
                        .remove(id)
                        .ok_or(NanoError::BufferNotFound(id))?;

                device.release(GpuObject::Buffer(buffer.handle));

                for shader_id in self.shaders.keys()
                {
                        let Some(shader) = self.shaders.get_mut(shader_id)
                        else
                        {
                                continue;
                        };

                        if shader.output_buffer != Some(id) && !shader.bound_buffers().contains(&id)
                        {
                                continue;
                        }

                        if shader.is_active()
                        {
                                log::warn!("Shader '{}' deactivated, its buffer {} was released", shader.label, id);

                                shader.state = ShaderState::Validated;

                                self.active.remove(shader_id);
                        }
                        else
                        {
                                shader.invalidate();
                        }
                }

                log::info!("Buffer '{}' ({}) released", buffer.label, id);

                Ok(())
        }

        // ---------------------------------------------------------------- binding

        fn inactive_shader_mut(
                &mut self,
                id: ShaderId,
        ) -> NanoResult<&mut Shader>
        {
                let shader = self
                        .shaders
                        .get_mut(id)
                        .ok_or(NanoError::ShaderNotFound(id))?;

                if shader.is_active()
                {
                        log::warn!("Shader '{}' is active, deactivate it before binding", shader.label);
                        return Err(NanoError::ShaderActive(id));
                }

                Ok(shader)
        }

        /// Assigns `buffer` to `@group(group) @binding(binding)` of `shader`.
        pub fn bind_buffer(
                &mut self,
                shader: ShaderId,
                buffer: BufferId,
                group: u32,
                binding: u32,
        ) -> NanoResult<()>
        {
                if group as usize >= MAX_GROUPS || binding as usize >= MAX_BINDINGS
                {
                        return Err(NanoError::IndexOutOfRange {
                                group,
                                binding,
                        });
                }

                let size = self.buffer(buffer)?.size;

                let record = self.inactive_shader_mut(shader)?;

                let declared = record
                        .info
                        .as_mut()
                        .and_then(|i| i.binding_mut(group, binding))
                        .ok_or(NanoError::BindingNotFound {
                                shader,
                                group,
                                binding,
                        })?;

                declared.size = size;

                if record.buffers.insert((group, binding), buffer) != Some(buffer)
                {
                        record.invalidate();
                }

                Ok(())
        }

        pub fn bind_uniforms(
                &mut self,
                shader: ShaderId,
                buffer: BufferId,
                group: u32,
                binding: u32,
        ) -> NanoResult<()>
        {
                self.bind_buffer(shader, buffer, group, binding)?;

                self.inactive_shader_mut(shader)?.uniform_buffer = Some(buffer);

                Ok(())
        }

        /// Binds `buffer` and uses its element count to size dispatches.
        pub fn bind_output_buffer(
                &mut self,
                shader: ShaderId,
                buffer: BufferId,
                group: u32,
                binding: u32,
        ) -> NanoResult<()>
        {
                self.bind_buffer(shader, buffer, group, binding)?;

                let record = self.inactive_shader_mut(shader)?;

                if record.output_buffer.replace(buffer) != Some(buffer)
                {
                        record.invalidate();
                }

                Ok(())
        }

        /// Adds a vertex buffer slot. Slots are numbered in call order.
        pub fn bind_vertex_buffer(
                &mut self,
                shader: ShaderId,
                buffer: BufferId,
                attributes: &[wgpu::VertexAttribute],
                stride: u64,
        ) -> NanoResult<()>
        {
                self.buffer(buffer)?;

                let record = self.inactive_shader_mut(shader)?;

                if record.vertex_buffers.len() >= MAX_VERTEX_BUFFERS
                {
                        return Err(NanoError::VertexBufferLimit(shader, MAX_VERTEX_BUFFERS));
                }

                record.vertex_buffers.push(VertexBinding {
                        buffer,
                        layout: VertexLayout {
                                stride,
                                step_mode: wgpu::VertexStepMode::Vertex,
                                attributes: attributes.to_vec(),
                        },
                });

                record.invalidate();

                Ok(())
        }

        pub fn bind_index_buffer(
                &mut self,
                shader: ShaderId,
                buffer: BufferId,
                format: wgpu::IndexFormat,
        ) -> NanoResult<()>
        {
                self.buffer(buffer)?;

                let record = self.inactive_shader_mut(shader)?;

                let binding = IndexBufferBinding {
                        buffer,
                        format,
                };

                if record.index_buffer.replace(binding) != Some(binding)
                {
                        record.invalidate();
                }

                Ok(())
        }

        pub fn set_vertex_count(
                &mut self,
                shader: ShaderId,
                count: u32,
        ) -> NanoResult<()>
        {
                self.shaders
                        .get_mut(shader)
                        .ok_or(NanoError::ShaderNotFound(shader))?
                        .vertex_count = count;

                Ok(())
        }

        pub fn set_element_count(
                &mut self,
                shader: ShaderId,
                count: u32,
        ) -> NanoResult<()>
        {
                self.shaders
                        .get_mut(shader)
                        .ok_or(NanoError::ShaderNotFound(shader))?
                        .element_count = Some(count);

                Ok(())
        }

        // ---------------------------------------------------------------- lifecycle

        fn plan_build(
                &self,
                id: ShaderId,
        ) -> NanoResult<BuildPlan>
        {
                let shader = self.shader(id)?;

                let info = self.shader_info(id)?;

                let pipelines = plan_pipelines(id, info)?;

                let groups = plan_bind_group_layouts(id, info)?;

                let mut bind_entries = Vec::with_capacity(groups.len());

                for group in &groups
                {
                        let mut entries = Vec::with_capacity(group.entries.len());

                        for entry in &group.entries
                        {
                                let buffer_id = shader
                                        .buffers
                                        .get(&(group.group, entry.binding))
                                        .ok_or(NanoError::UnboundBinding {
                                                shader: id,
                                                group: group.group,
                                                binding: entry.binding,
                                        })?;

                                let buffer = self.buffer(*buffer_id)?;

                                entries.push(BindGroupBufferEntry {
                                        binding: entry.binding,
                                        buffer: buffer.handle,
                                        offset: buffer.offset,
                                        size: buffer.binding_size(),
                                });
                        }

                        bind_entries.push(entries);
                }

                Ok(BuildPlan {
                        label: shader.label.clone(),
                        source: shader.source.clone(),
                        pipelines,
                        groups,
                        bind_entries,
                        vertex_layouts: shader.vertex_buffers.iter().map(|v| v.layout.clone()).collect(),
                })
        }

        /// Validates the shader and (re)creates its layouts, pipelines and
        /// bind groups. Nothing is replaced unless every object was created.
        pub fn build_shader<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                id: ShaderId,
        ) -> NanoResult<()>
        {
                self.validate_shader(id)?;

                let plan = self.plan_build(id).inspect_err(|e| {
                        log::error!("Shader {id} cannot be built: {e}");
                })?;

                let mut artifacts = BuildArtifacts::default();

                if let Err(e) = plan.realize(device, &mut artifacts)
                {
                        log::error!("Shader '{}' failed to build: {e}", plan.label);
                        artifacts.release(device);
                        return Err(e);
                }

                let shader = self
                        .shaders
                        .get_mut(id)
                        .ok_or(NanoError::ShaderNotFound(id))?;

                shader.artifacts.release(device);
                shader.artifacts = artifacts;

                if shader.state != ShaderState::Active
                {
                        shader.state = ShaderState::Built;
                }

                log::info!(
                        "Shader '{}' built: {} bind group(s), compute: {}, render: {}",
                        shader.label,
                        shader.artifacts.bind_groups.len(),
                        shader.is_compute(),
                        shader.is_render()
                );

                Ok(())
        }

        /// Builds when needed (or when `rebuild` is set), then appends the
        /// shader to the active list. Activating an active shader only
        /// rebuilds it if asked to.
        pub fn activate<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                id: ShaderId,
                rebuild: bool,
        ) -> NanoResult<()>
        {
                if rebuild || !self.shader(id)?.is_built()
                {
                        self.build_shader(device, id)?;
                }

                if self.shader(id)?.is_active()
                {
                        return Ok(());
                }

                self.active.push(id)?;

                let shader = self
                        .shaders
                        .get_mut(id)
                        .ok_or(NanoError::ShaderNotFound(id))?;

                shader.state = ShaderState::Active;

                log::info!("Shader '{}' activated", shader.label);

                Ok(())
        }

        pub fn deactivate(
                &mut self,
                id: ShaderId,
        ) -> NanoResult<()>
        {
                let shader = self
                        .shaders
                        .get_mut(id)
                        .ok_or(NanoError::ShaderNotFound(id))?;

                if !shader.is_active()
                {
                        return Ok(());
                }

                shader.state = ShaderState::Built;

                self.active.remove(id);

                log::info!("Shader '{}' deactivated", shader.label);

                Ok(())
        }

        /// Frees the shader's GPU objects and vacates its slot. Buffers it
        /// referenced stay in the buffer pool.
        pub fn release_shader<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                id: ShaderId,
        ) -> NanoResult<()>
        {
                let mut shader = self
                        .shaders
                        .remove(id)
                        .ok_or(NanoError::ShaderNotFound(id))?;

                self.active.remove(id);

                shader.artifacts.release(device);

                log::info!("Shader '{}' ({}) released", shader.label, id);

                Ok(())
        }

        /// Releases every shader, then every buffer.
        pub fn release_all<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
        )
        {
                for id in self.shaders.keys()
                {
                        if let Err(e) = self.release_shader(device, id)
                        {
                                log::warn!("{e}");
                        }
                }

                for id in self.buffers.keys()
                {
                        if let Err(e) = self.release_buffer(device, id)
                        {
                                log::warn!("{e}");
                        }
                }

                self.active.clear();
        }

        /// Rebuilds every active shader, for example after the sample count
        /// changed.
        pub fn rebuild_active<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
        ) -> NanoResult<()>
        {
                let order: Vec<ShaderId> = self.active.iter().collect();

                for id in order
                {
                        self.build_shader(device, id)?;
                }

                Ok(())
        }

        /// Call after the surface sample count changed. Active shaders are
        /// rebuilt now; inactive render shaders rebuild on their next
        /// activation.
        pub fn sample_count_changed<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
        ) -> NanoResult<()>
        {
                for id in self.shaders.keys()
                {
                        if let Some(shader) = self.shaders.get_mut(id)
                        {
                                if shader.is_render() && shader.invalidate()
                                {
                                        log::debug!("Shader '{}' will rebuild on activation", shader.label);
                                }
                        }
                }

                self.rebuild_active(device)
        }

        // ---------------------------------------------------------------- active list

        pub fn active_shaders(&self) -> &[ShaderId]
        {
                self.active.as_slice()
        }

        pub fn active_count(&self) -> usize
        {
                self.active.len()
        }

        pub fn active_shader(
                &self,
                index: usize,
        ) -> Option<ShaderId>
        {
                self.active.get(index)
        }

        // ---------------------------------------------------------------- execution

        fn element_count(
                &self,
                shader: &Shader,
        ) -> NanoResult<u32>
        {
                if let Some(count) = shader.element_count
                {
                        return Ok(count);
                }

                match shader.output_buffer
                {
                        Some(id) => Ok(self.buffer(id)?.count),
                        None => Err(NanoError::MissingElementCount(shader.id)),
                }
        }

        fn draw_desc(
                &self,
                shader: &Shader,
                pipeline: RenderPipelineHandle,
        ) -> NanoResult<DrawDesc>
        {
                let vertex_buffers = shader
                        .vertex_buffers
                        .iter()
                        .map(|v| self.buffer(v.buffer).map(|b| b.handle))
                        .collect::<NanoResult<Vec<_>>>()?;

                let index = match shader.index_buffer
                {
                        Some(binding) =>
                        {
                                let buffer = self.buffer(binding.buffer)?;

                                Some(IndexBinding {
                                        buffer: buffer.handle,
                                        format: binding.format,
                                        count: buffer.count,
                                })
                        }
                        None => None,
                };

                Ok(DrawDesc {
                        label: shader.label.clone(),
                        pipeline,
                        bind_groups: shader.artifacts.bind_groups.clone(),
                        vertex_buffers,
                        index,
                        vertex_count: shader.vertex_count,
                })
        }

        /// Uploads dirty buffers, then dispatches the compute pipeline and/or
        /// queues the draw.
        pub fn execute_shader<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
                id: ShaderId,
        ) -> NanoResult<()>
        {
                let bound = {
                        let shader = self.shader(id)?;

                        if !shader.is_built()
                        {
                                return Err(NanoError::ShaderNotBuilt(id));
                        }

                        shader.bound_buffers()
                };

                self.sync_buffers(device, &bound)?;

                let shader = self.shader(id)?;

                if let Some(pipeline) = shader.artifacts.compute_pipeline
                {
                        let elements = self.element_count(shader)?;

                        let size = shader
                                .info
                                .as_ref()
                                .and_then(ShaderInfo::compute_entry)
                                .map(|e| e.workgroup_size)
                                .unwrap_or_default();

                        let workgroups = workgroup_count(elements, size);

                        log::trace!("Dispatching '{}': {} workgroups", shader.label, workgroups);

                        device.dispatch(&DispatchDesc {
                                label: &shader.label,
                                pipeline,
                                bind_groups: &shader.artifacts.bind_groups,
                                workgroups: [workgroups, 1, 1],
                        })?;
                }

                if let Some(pipeline) = shader.artifacts.render_pipeline
                {
                        let draw = self.draw_desc(shader, pipeline)?;

                        device.draw(draw)?;
                }

                Ok(())
        }

        /// Executes every active shader in activation order. A failing shader
        /// does not stop the others; the first error is returned.
        pub fn execute_shaders<D: GpuDevice + ?Sized>(
                &mut self,
                device: &mut D,
        ) -> NanoResult<()>
        {
                let order: Vec<ShaderId> = self.active.iter().collect();

                let mut first_error = None;

                for id in order
                {
                        if let Err(e) = self.execute_shader(device, id)
                        {
                                log::error!("Shader {id} failed to execute: {e}");
                                first_error.get_or_insert(e);
                        }
                }

                first_error.map_or(Ok(()), Err)
        }
}
