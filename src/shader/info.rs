use std::fmt;

use crate::pool::ShaderId;

/// Longest identifier the parser keeps; longer ones are cut short.
pub const MAX_IDENT_LENGTH: usize = 256;

pub const MAX_GROUPS: usize = 4;

pub const MAX_BINDINGS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind
{
        Buffer,
        Texture,
        StorageTexture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo
{
        pub sample_type: wgpu::TextureSampleType,
        pub view_dimension: wgpu::TextureViewDimension,
        pub usage: wgpu::TextureUsages,
}

impl Default for TextureInfo
{
        fn default() -> Self
        {
                Self {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        usage: wgpu::TextureUsages::TEXTURE_BINDING,
                }
        }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingDetails
{
        Buffer
        {
                usage: wgpu::BufferUsages,
        },
        Texture(TextureInfo),
}

/// One `@group(g) @binding(b) var<...> name: type` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo
{
        pub group: u32,
        pub binding: u32,
        pub shader: ShaderId,
        pub kind: BindingKind,
        pub details: BindingDetails,
        /// Byte size of the buffer created for this binding, zero until then.
        pub size: u64,
        pub name: String,
        pub data_type: String,
}

impl BindingInfo
{
        pub fn buffer_usage(&self) -> Option<wgpu::BufferUsages>
        {
                match self.details
                {
                        BindingDetails::Buffer { usage } => Some(usage),
                        BindingDetails::Texture(_) => None,
                }
        }

        pub fn is_uniform(&self) -> bool
        {
                self.buffer_usage()
                        .is_some_and(|usage| usage.contains(wgpu::BufferUsages::UNIFORM))
        }

        /// Storage buffers are writable only when declared `write` or `read_write`.
        pub fn is_read_only_storage(&self) -> bool
        {
                self.buffer_usage().is_some_and(|usage| {
                        usage.contains(wgpu::BufferUsages::STORAGE)
                                && !usage.contains(wgpu::BufferUsages::COPY_DST)
                })
        }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind
{
        Compute,
        Vertex,
        Fragment,
}

impl EntryKind
{
        pub fn stage(&self) -> wgpu::ShaderStages
        {
                match self
                {
                        EntryKind::Compute => wgpu::ShaderStages::COMPUTE,
                        EntryKind::Vertex => wgpu::ShaderStages::VERTEX,
                        EntryKind::Fragment => wgpu::ShaderStages::FRAGMENT,
                }
        }

        fn attribute(&self) -> &'static str
        {
                match self
                {
                        EntryKind::Compute => "compute",
                        EntryKind::Vertex => "vertex",
                        EntryKind::Fragment => "fragment",
                }
        }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize
{
        pub x: u32,
        pub y: u32,
        pub z: u32,
}

impl WorkgroupSize
{
        /// Zero axes are coerced to 1.
        pub fn new(
                x: u32,
                y: u32,
                z: u32,
        ) -> Self
        {
                Self {
                        x: x.max(1),
                        y: y.max(1),
                        z: z.max(1),
                }
        }

        /// Saturates at `u32::MAX` for absurd literals.
        pub fn invocations(&self) -> u32
        {
                self.x.saturating_mul(self.y).saturating_mul(self.z)
        }
}

impl Default for WorkgroupSize
{
        fn default() -> Self
        {
                Self::new(1, 1, 1)
        }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint
{
        pub kind: EntryKind,
        pub name: String,
        pub workgroup_size: WorkgroupSize,
}

/// Reflection result for one shader module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderInfo
{
        /// Declaration order.
        pub bindings: Vec<BindingInfo>,

        pub entry_points: Vec<EntryPoint>,

        group_indices: [[Option<usize>; MAX_BINDINGS]; MAX_GROUPS],

        compute: Option<usize>,

        vertex: Option<usize>,

        fragment: Option<usize>,
}

impl Default for ShaderInfo
{
        fn default() -> Self
        {
                Self {
                        bindings: Vec::new(),
                        entry_points: Vec::new(),
                        group_indices: [[None; MAX_BINDINGS]; MAX_GROUPS],
                        compute: None,
                        vertex: None,
                        fragment: None,
                }
        }
}

impl ShaderInfo
{
        /// Recomputes the entry-point indices and the group/binding table.
        pub fn index(&mut self)
        {
                self.compute = self.position_of(EntryKind::Compute);
                self.vertex = self.position_of(EntryKind::Vertex);
                self.fragment = self.position_of(EntryKind::Fragment);

                self.group_indices = [[None; MAX_BINDINGS]; MAX_GROUPS];

                for (index, info) in self.bindings.iter().enumerate()
                {
                        let (group, binding) = (info.group as usize, info.binding as usize);

                        if group < MAX_GROUPS && binding < MAX_BINDINGS
                        {
                                self.group_indices[group][binding] = Some(index);
                        }
                }
        }

        fn position_of(
                &self,
                kind: EntryKind,
        ) -> Option<usize>
        {
                self.entry_points.iter().position(|e| e.kind == kind)
        }

        pub fn compute_entry(&self) -> Option<&EntryPoint>
        {
                self.compute.and_then(|i| self.entry_points.get(i))
        }

        pub fn vertex_entry(&self) -> Option<&EntryPoint>
        {
                self.vertex.and_then(|i| self.entry_points.get(i))
        }

        pub fn fragment_entry(&self) -> Option<&EntryPoint>
        {
                self.fragment.and_then(|i| self.entry_points.get(i))
        }

        /// Union of the stages this shader has entry points for.
        pub fn stages(&self) -> wgpu::ShaderStages
        {
                [self.compute_entry(), self.vertex_entry(), self.fragment_entry()]
                        .into_iter()
                        .flatten()
                        .fold(wgpu::ShaderStages::NONE, |acc, e| acc | e.kind.stage())
        }

        pub fn binding_index(
                &self,
                group: u32,
                binding: u32,
        ) -> Option<usize>
        {
                self.group_indices
                        .get(group as usize)?
                        .get(binding as usize)
                        .copied()
                        .flatten()
        }

        pub fn binding(
                &self,
                group: u32,
                binding: u32,
        ) -> Option<&BindingInfo>
        {
                self.binding_index(group, binding)
                        .and_then(|i| self.bindings.get(i))
        }

        pub fn binding_mut(
                &mut self,
                group: u32,
                binding: u32,
        ) -> Option<&mut BindingInfo>
        {
                self.binding_index(group, binding)
                        .and_then(|i| self.bindings.get_mut(i))
        }

        pub fn binding_by_name(
                &self,
                name: &str,
        ) -> Option<&BindingInfo>
        {
                self.bindings.iter().find(|b| b.name == name)
        }
}

impl fmt::Display for ShaderInfo
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                writeln!(f, "Bindings ({}):", self.bindings.len())?;

                for b in &self.bindings
                {
                        let qualifier = match b.details
                        {
                                BindingDetails::Buffer { usage } => buffer_qualifier(usage),
                                BindingDetails::Texture(_) => String::new(),
                        };

                        writeln!(
                                f,
                                "  @group({}) @binding({}) var{} {}: {} [{:?}, size {}]",
                                b.group, b.binding, qualifier, b.name, b.data_type, b.kind, b.size
                        )?;
                }

                writeln!(f, "Entry points ({}):", self.entry_points.len())?;

                for e in &self.entry_points
                {
                        match e.kind
                        {
                                EntryKind::Compute => writeln!(
                                        f,
                                        "  @compute @workgroup_size({}, {}, {}) fn {}",
                                        e.workgroup_size.x,
                                        e.workgroup_size.y,
                                        e.workgroup_size.z,
                                        e.name
                                )?,
                                kind => writeln!(f, "  @{} fn {}", kind.attribute(), e.name)?,
                        }
                }

                Ok(())
        }
}

fn buffer_qualifier(usage: wgpu::BufferUsages) -> String
{
        let class = if usage.contains(wgpu::BufferUsages::UNIFORM)
        {
                "uniform"
        }
        else
        {
                "storage"
        };

        let read = usage.contains(wgpu::BufferUsages::COPY_SRC);

        let write = usage.contains(wgpu::BufferUsages::COPY_DST);

        match (read, write)
        {
                (true, true) => format!("<{class}, read_write>"),
                (true, false) => format!("<{class}, read>"),
                (false, true) => format!("<{class}, write>"),
                (false, false) => format!("<{class}>"),
        }
}
