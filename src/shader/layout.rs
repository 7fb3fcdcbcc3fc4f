//! Turns reflected bindings into bind-group-layout plans.
//!
//! Groups and the bindings inside each group must be numbered from 0 without
//! holes. A declaration that sits after a hole fails the plan instead of being
//! dropped from the layout.

use crate::error::NanoError;
use crate::error::NanoResult;
use crate::pool::ShaderId;
use crate::shader::info::BindingKind;
use crate::shader::info::MAX_BINDINGS;
use crate::shader::info::MAX_GROUPS;
use crate::shader::info::ShaderInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry
{
        pub binding: u32,
        pub visibility: wgpu::ShaderStages,
        pub ty: wgpu::BufferBindingType,
}

impl LayoutEntry
{
        pub fn to_wgpu(&self) -> wgpu::BindGroupLayoutEntry
        {
                wgpu::BindGroupLayoutEntry {
                        binding: self.binding,
                        visibility: self.visibility,
                        ty: wgpu::BindingType::Buffer {
                                ty: self.ty,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                        },
                        count: None,
                }
        }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLayout
{
        pub group: u32,
        pub entries: Vec<LayoutEntry>,
}

/// Which pipelines a shader can produce, with their entry-point names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan
{
        pub compute: Option<String>,
        pub render: Option<(String, String)>,
}

pub fn plan_pipelines(
        shader: ShaderId,
        info: &ShaderInfo,
) -> NanoResult<PipelinePlan>
{
        if info.entry_points.is_empty()
        {
                return Err(NanoError::NoEntryPoints(shader));
        }

        let compute = info.compute_entry().map(|e| e.name.clone());

        let render = match (info.vertex_entry(), info.fragment_entry())
        {
                (Some(vs), Some(fs)) => Some((vs.name.clone(), fs.name.clone())),
                (None, None) => None,
                _ => return Err(NanoError::IncompleteRenderStages(shader)),
        };

        if compute.is_none() && render.is_none()
        {
                return Err(NanoError::NoPipeline(shader));
        }

        Ok(PipelinePlan {
                compute,
                render,
        })
}

pub fn plan_bind_group_layouts(
        shader: ShaderId,
        info: &ShaderInfo,
) -> NanoResult<Vec<GroupLayout>>
{
        let stages = info.stages();

        let mut groups = Vec::new();

        let mut groups_ended = false;

        for group in 0..MAX_GROUPS as u32
        {
                let mut entries = Vec::new();

                let mut gap = false;

                for binding in 0..MAX_BINDINGS as u32
                {
                        let Some(declared) = info.binding(group, binding)
                        else
                        {
                                gap = true;
                                continue;
                        };

                        if gap || groups_ended
                        {
                                return Err(NanoError::NonContiguousBindings {
                                        shader,
                                        group,
                                        binding,
                                });
                        }

                        if declared.kind != BindingKind::Buffer
                        {
                                return Err(NanoError::UnsupportedBinding {
                                        shader,
                                        name: declared.name.clone(),
                                });
                        }

                        let (ty, visibility) = if declared.is_uniform()
                        {
                                (wgpu::BufferBindingType::Uniform, stages)
                        }
                        else if declared.is_read_only_storage()
                        {
                                (wgpu::BufferBindingType::Storage { read_only: true }, stages)
                        }
                        else
                        {
                                // Vertex stages may not write storage buffers.
                                (
                                        wgpu::BufferBindingType::Storage { read_only: false },
                                        stages - wgpu::ShaderStages::VERTEX,
                                )
                        };

                        entries.push(LayoutEntry {
                                binding,
                                visibility,
                                ty,
                        });
                }

                if entries.is_empty()
                {
                        groups_ended = true;
                }
                else
                {
                        groups.push(GroupLayout {
                                group,
                                entries,
                        });
                }
        }

        Ok(groups)
}
