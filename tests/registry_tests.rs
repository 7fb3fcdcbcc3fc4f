mod common;

use common::DOUBLE_WGSL;
use common::MockDevice;
use common::TRIANGLE_WGSL;
use common::labelled_compute;
use nano::BufferInit;
use nano::NanoError;
use nano::ResourceManager;
use nano::shader::ShaderState;

fn manager() -> ResourceManager
{
        ResourceManager::new(16, 256)
}

#[test]
fn compute_dispatch_covers_every_element()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, Some("double")).unwrap();

        let data = vec![1.0f32; 65536];
        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::from_slice(&data))
                .unwrap();

        resources.bind_output_buffer(shader, buffer, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();
        resources.execute_shaders(&mut device).unwrap();

        assert_eq!(device.dispatches.len(), 1);
        assert_eq!(device.dispatches[0].workgroups, [1024, 1, 1]);
        assert_eq!(device.dispatches[0].bind_groups, 1);
        assert_eq!(device.compute_pipelines, vec!["main".to_owned()]);
}

#[test]
fn storage_buffers_can_be_copied_back()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(10))
                .unwrap();

        let record = resources.buffer(buffer).unwrap();

        assert!(record.usage.contains(wgpu::BufferUsages::STORAGE));
        assert!(record.usage.contains(wgpu::BufferUsages::COPY_DST));
        assert!(record.usage.contains(wgpu::BufferUsages::COPY_SRC));
        assert_eq!(record.size, 64);
        assert_eq!(resources.binding(shader, 0, 0).unwrap().size, 64);
}

#[test]
fn vertex_only_shader_does_not_build()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources
                .create_shader("@vertex fn vs() -> @builtin(position) vec4<f32> { return vec4<f32>(); }", None)
                .unwrap();

        let err = resources.build_shader(&mut device, shader).unwrap_err();

        assert!(matches!(err, NanoError::IncompleteRenderStages(_)));
        assert_eq!(device.live_count(), 0);
        assert!(!resources.shader(shader).unwrap().is_built());
}

#[test]
fn undeclared_binding_is_not_found()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        assert!(matches!(
                resources.binding(shader, 0, 5),
                Err(NanoError::BindingNotFound { group: 0, binding: 5, .. })
        ));
        assert!(matches!(
                resources.create_buffer(&mut device, shader, 0, 5, BufferInit::zeroed::<f32>(4)),
                Err(NanoError::BindingNotFound { .. })
        ));
        assert_eq!(resources.binding_by_name(shader, "data").unwrap().binding, 0);
        assert!(matches!(
                resources.binding_by_name(shader, "missing"),
                Err(NanoError::BindingNameNotFound { .. })
        ));
}

#[test]
fn out_of_range_indices_are_rejected()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(4))
                .unwrap();

        assert!(matches!(
                resources.bind_buffer(shader, buffer, 4, 0),
                Err(NanoError::IndexOutOfRange { group: 4, binding: 0 })
        ));
        assert!(matches!(
                resources.bind_buffer(shader, buffer, 0, 16),
                Err(NanoError::IndexOutOfRange { .. })
        ));
}

#[test]
fn activation_is_idempotent_and_cheap_to_toggle()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(64))
                .unwrap();

        resources.bind_output_buffer(shader, buffer, 0, 0).unwrap();

        resources.activate(&mut device, shader, false).unwrap();
        resources.activate(&mut device, shader, false).unwrap();

        assert_eq!(resources.active_count(), 1);
        assert_eq!(resources.shader(shader).unwrap().state, ShaderState::Active);

        resources.deactivate(shader).unwrap();
        resources.deactivate(shader).unwrap();

        assert_eq!(resources.active_count(), 0);
        assert_eq!(resources.shader(shader).unwrap().state, ShaderState::Built);

        resources.activate(&mut device, shader, false).unwrap();

        assert_eq!(device.compute_pipelines.len(), 1);

        resources.deactivate(shader).unwrap();
        resources.activate(&mut device, shader, true).unwrap();

        assert_eq!(device.compute_pipelines.len(), 2);
        assert_eq!(device.live_of("compute pipeline"), 1);
}

#[test]
fn binding_while_active_is_rejected()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(64))
                .unwrap();

        resources.bind_output_buffer(shader, buffer, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();

        assert!(matches!(
                resources.bind_buffer(shader, buffer, 0, 0),
                Err(NanoError::ShaderActive(_))
        ));
        assert!(matches!(
                resources.bind_output_buffer(shader, buffer, 0, 0),
                Err(NanoError::ShaderActive(_))
        ));

        resources.deactivate(shader).unwrap();
        resources.bind_buffer(shader, buffer, 0, 0).unwrap();
}

#[test]
fn releasing_twice_reports_not_found()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(64))
                .unwrap();

        resources.bind_output_buffer(shader, buffer, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();

        resources.release_shader(&mut device, shader).unwrap();

        assert!(matches!(
                resources.release_shader(&mut device, shader),
                Err(NanoError::ShaderNotFound(_))
        ));
        assert_eq!(resources.active_count(), 0);
        assert_eq!(device.live_count(), 1, "only the buffer outlives its shader");

        resources.release_buffer(&mut device, buffer).unwrap();
        assert_eq!(device.live_count(), 0);
}

#[test]
fn active_shaders_run_in_activation_order()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let mut ids = Vec::new();

        for label in ["A", "B", "C"]
        {
                let shader = resources
                        .create_shader(&labelled_compute(label), Some(label))
                        .unwrap();

                let buffer = resources
                        .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(64))
                        .unwrap();

                resources.bind_output_buffer(shader, buffer, 0, 0).unwrap();
                resources.activate(&mut device, shader, false).unwrap();

                ids.push(shader);
        }

        let run = |resources: &mut ResourceManager, device: &mut MockDevice| {
                device.dispatches.clear();
                resources.execute_shaders(device).unwrap();
                device.dispatches.iter().map(|d| d.label.clone()).collect::<Vec<_>>()
        };

        assert_eq!(run(&mut resources, &mut device), ["A", "B", "C"]);

        resources.deactivate(ids[1]).unwrap();
        assert_eq!(run(&mut resources, &mut device), ["A", "C"]);

        resources.activate(&mut device, ids[1], false).unwrap();
        assert_eq!(run(&mut resources, &mut device), ["A", "C", "B"]);
        assert_eq!(resources.active_shader(2), Some(ids[1]));
}

#[test]
fn layouts_are_deterministic()
{
        let source = r#"
@group(0) @binding(0) var<storage, read> input: array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;
@group(1) @binding(0) var<uniform> scale: f32;
@compute @workgroup_size(8, 8) fn main() {}
"#;

        let build = || {
                let mut device = MockDevice::new();
                let mut resources = manager();

                let shader = resources.create_shader(source, None).unwrap();

                for (group, binding) in [(0, 0), (0, 1), (1, 0)]
                {
                        let buffer = resources
                                .create_buffer(&mut device, shader, group, binding, BufferInit::zeroed::<f32>(16))
                                .unwrap();

                        resources.bind_buffer(shader, buffer, group, binding).unwrap();
                }

                resources.build_shader(&mut device, shader).unwrap();

                device.layouts
        };

        let first = build();

        assert_eq!(first.len(), 2);
        assert_eq!(first, build());
        assert_eq!(first[0][0].ty, wgpu::BufferBindingType::Storage { read_only: true });
        assert_eq!(first[0][1].ty, wgpu::BufferBindingType::Storage { read_only: false });
        assert_eq!(first[1][0].ty, wgpu::BufferBindingType::Uniform);
}

#[test]
fn unbound_binding_fails_without_leaking()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        assert!(matches!(
                resources.build_shader(&mut device, shader),
                Err(NanoError::UnboundBinding { group: 0, binding: 0, .. })
        ));
        assert_eq!(device.live_count(), 0);
}

#[test]
fn failed_pipeline_releases_partial_build()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(TRIANGLE_WGSL, None).unwrap();

        let tint = [1.0f32, 0.0, 0.0, 1.0];
        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::from_slice(&tint))
                .unwrap();

        resources.bind_uniforms(shader, buffer, 0, 0).unwrap();

        device.fail_render_pipelines = true;

        assert!(resources.build_shader(&mut device, shader).is_err());
        assert_eq!(device.live_count(), 1);
}

#[test]
fn compute_without_element_count_is_an_error()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(64))
                .unwrap();

        resources.bind_buffer(shader, buffer, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();

        assert!(matches!(
                resources.execute_shader(&mut device, shader),
                Err(NanoError::MissingElementCount(_))
        ));

        resources.set_element_count(shader, 100).unwrap();
        resources.execute_shader(&mut device, shader).unwrap();

        assert_eq!(device.dispatches[0].workgroups, [2, 1, 1]);
}

#[test]
fn executing_unbuilt_shader_fails()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        assert!(matches!(
                resources.execute_shader(&mut device, shader),
                Err(NanoError::ShaderNotBuilt(_))
        ));
}

#[test]
fn render_shader_queues_indexed_draw()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(TRIANGLE_WGSL, Some("triangle")).unwrap();

        let tint = [1.0f32, 0.5, 0.0, 1.0];
        let uniform = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::from_slice(&tint))
                .unwrap();

        let vertices = [[-0.5f32, -0.5], [0.5, -0.5], [0.0, 0.5], [0.5, 0.5]];
        let vertex = resources
                .create_vertex_buffer(&mut device, BufferInit::from_slice(&vertices), None)
                .unwrap();

        let indices = [0u16, 1, 2, 1, 3, 2];
        let index = resources
                .create_index_buffer(&mut device, BufferInit::from_slice(&indices), None)
                .unwrap();

        let attributes = wgpu::vertex_attr_array![0 => Float32x2];

        resources.bind_uniforms(shader, uniform, 0, 0).unwrap();
        resources.bind_vertex_buffer(shader, vertex, &attributes, 8).unwrap();
        resources.bind_index_buffer(shader, index, wgpu::IndexFormat::Uint16).unwrap();
        resources.activate(&mut device, shader, false).unwrap();

        resources.execute_shaders(&mut device).unwrap();

        assert!(device.dispatches.is_empty());
        assert_eq!(device.render_pipelines, vec![("vs_main".to_owned(), "fs_main".to_owned(), 1)]);
        assert_eq!(device.draws.len(), 1);

        let draw = &device.draws[0];
        assert_eq!(draw.label, "triangle");
        assert_eq!(draw.vertex_buffers.len(), 1);
        assert_eq!(draw.index.as_ref().map(|i| i.count), Some(6));
        assert_eq!(draw.bind_groups.len(), 1);
}

#[test]
fn render_shader_defaults_to_three_vertices()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(TRIANGLE_WGSL, None).unwrap();

        let uniform = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<[f32; 4]>(1))
                .unwrap();

        resources.bind_uniforms(shader, uniform, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();
        resources.execute_shaders(&mut device).unwrap();

        assert_eq!(device.draws[0].vertex_count, 3);
        assert!(device.draws[0].index.is_none());

        resources.set_vertex_count(shader, 6).unwrap();
        resources.execute_shaders(&mut device).unwrap();

        assert_eq!(device.draws[1].vertex_count, 6);
}

#[test]
fn vertex_buffer_slots_are_bounded()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(TRIANGLE_WGSL, None).unwrap();

        let vertex = resources
                .create_vertex_buffer(&mut device, BufferInit::zeroed::<[f32; 2]>(3), Some("quad"))
                .unwrap();

        let attributes = wgpu::vertex_attr_array![0 => Float32x2];

        for _ in 0..8
        {
                resources.bind_vertex_buffer(shader, vertex, &attributes, 8).unwrap();
        }

        assert!(matches!(
                resources.bind_vertex_buffer(shader, vertex, &attributes, 8),
                Err(NanoError::VertexBufferLimit(_, 8))
        ));
}

#[test]
fn dirty_buffers_upload_before_execution()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(4))
                .unwrap();

        resources.bind_output_buffer(shader, buffer, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();

        assert!(device.writes.is_empty());

        resources.update_buffer_with(buffer, &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
        assert!(resources.buffer(buffer).unwrap().is_dirty());

        resources.execute_shaders(&mut device).unwrap();
        resources.execute_shaders(&mut device).unwrap();

        assert_eq!(device.writes.len(), 1);
        assert!(!resources.buffer(buffer).unwrap().is_dirty());

        let handle = resources.buffer(buffer).unwrap().handle;
        assert_eq!(&device.contents(handle)[..16], bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0, 3.0, 4.0]));
}

#[test]
fn oversized_update_is_rejected()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(4))
                .unwrap();

        assert!(matches!(
                resources.update_buffer(buffer, &[0u8; 33]),
                Err(NanoError::DataTooLarge { len: 33, capacity: 32, .. })
        ));
        assert!(resources.update_buffer(buffer, &[0u8; 32]).is_ok());
}

#[test]
fn identical_source_reuses_the_shader()
{
        let mut resources = manager();

        let a = resources.create_shader(DOUBLE_WGSL, Some("a")).unwrap();
        let b = resources.create_shader(DOUBLE_WGSL, Some("b")).unwrap();

        assert_eq!(a, b);
        assert_eq!(resources.shader_count(), 1);
        assert_eq!(resources.shader(a).unwrap().label, "a");
}

#[test]
fn parse_errors_reject_the_shader()
{
        let mut resources = manager();

        let err = resources
                .create_shader("@group(9) @binding(0) var<storage> x: array<f32>; @compute fn main() {}", None)
                .unwrap_err();

        assert!(matches!(err, NanoError::Parse { .. }));
        assert_eq!(resources.shader_count(), 0);

        assert!(matches!(
                resources.create_shader("fn helper() {}", None),
                Err(NanoError::NoEntryPoints(_))
        ));
}

#[test]
fn shader_pool_has_a_ceiling()
{
        let mut resources = ResourceManager::new(2, 8);

        resources.create_shader(&labelled_compute("one"), None).unwrap();
        resources.create_shader(&labelled_compute("two"), None).unwrap();

        assert!(matches!(
                resources.create_shader(&labelled_compute("three"), None),
                Err(NanoError::PoolFull { pool: "shader", .. })
        ));
}

#[test]
fn duplicate_buffer_for_binding_is_rejected()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(4))
                .unwrap();

        assert!(matches!(
                resources.create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(4)),
                Err(NanoError::AlreadyExists(_))
        ));
        assert_eq!(device.live_of("buffer"), 1);
}

#[test]
fn release_all_frees_everything()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        for label in ["x", "y"]
        {
                let shader = resources.create_shader(&labelled_compute(label), None).unwrap();

                let buffer = resources
                        .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(64))
                        .unwrap();

                resources.bind_output_buffer(shader, buffer, 0, 0).unwrap();
                resources.activate(&mut device, shader, false).unwrap();
        }

        assert!(device.live_count() > 0);

        resources.release_all(&mut device);

        assert_eq!(device.live_count(), 0);
        assert_eq!(resources.shader_count(), 0);
        assert_eq!(resources.buffer_count(), 0);
        assert_eq!(resources.active_count(), 0);
}

#[test]
fn shaders_load_from_files()
{
        let mut resources = manager();

        let path = std::env::temp_dir().join(format!("nano-registry-{}.wgsl", std::process::id()));

        std::fs::write(&path, DOUBLE_WGSL).unwrap();

        let shader = resources.create_shader_from_file(&path, None).unwrap();

        std::fs::remove_file(&path).unwrap();

        assert!(resources.shader(shader).unwrap().label.ends_with(".wgsl"));

        assert!(matches!(
                resources.create_shader_from_file(&path, None),
                Err(NanoError::Io { .. })
        ));
}

#[test]
fn rebinding_after_release_forces_a_rebuild()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let old = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(64))
                .unwrap();

        resources.bind_output_buffer(shader, old, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();
        resources.deactivate(shader).unwrap();

        let old_handle = resources.buffer(old).unwrap().handle;

        resources.release_buffer(&mut device, old).unwrap();

        assert_eq!(resources.shader(shader).unwrap().state, ShaderState::Validated);

        let values = vec![1.0f32; 128];
        let new = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::from_slice(&values))
                .unwrap();

        resources.bind_output_buffer(shader, new, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();
        resources.execute_shaders(&mut device).unwrap();

        let new_handle = resources.buffer(new).unwrap().handle;

        assert_eq!(device.compute_pipelines.len(), 2);
        assert_eq!(device.bind_groups.last(), Some(&vec![(0, new_handle.raw())]));
        assert_ne!(new_handle, old_handle);
        assert_eq!(device.dispatches[0].workgroups, [2, 1, 1]);
}

#[test]
fn rebinding_the_same_buffer_keeps_the_build()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(64))
                .unwrap();

        resources.bind_output_buffer(shader, buffer, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();
        resources.deactivate(shader).unwrap();

        resources.bind_output_buffer(shader, buffer, 0, 0).unwrap();

        assert_eq!(resources.shader(shader).unwrap().state, ShaderState::Built);

        resources.activate(&mut device, shader, false).unwrap();

        assert_eq!(device.compute_pipelines.len(), 1);
}

#[test]
fn new_vertex_slot_forces_a_rebuild()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(TRIANGLE_WGSL, None).unwrap();

        let uniform = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<[f32; 4]>(1))
                .unwrap();

        resources.bind_uniforms(shader, uniform, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();
        resources.deactivate(shader).unwrap();

        let vertex = resources
                .create_vertex_buffer(&mut device, BufferInit::zeroed::<[f32; 2]>(3), None)
                .unwrap();

        resources
                .bind_vertex_buffer(shader, vertex, &wgpu::vertex_attr_array![0 => Float32x2], 8)
                .unwrap();
        resources.activate(&mut device, shader, false).unwrap();

        assert_eq!(device.render_pipelines.len(), 2);
        assert_eq!(device.render_pipelines[1].2, 1);
}

#[test]
fn releasing_a_bound_buffer_deactivates_its_shader()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(64))
                .unwrap();

        resources.bind_output_buffer(shader, buffer, 0, 0).unwrap();
        resources.activate(&mut device, shader, false).unwrap();

        resources.release_buffer(&mut device, buffer).unwrap();

        assert_eq!(resources.active_count(), 0);
        assert!(!resources.shader(shader).unwrap().is_built());

        resources.execute_shaders(&mut device).unwrap();
        assert!(device.dispatches.is_empty());
}

#[test]
fn sample_count_change_invalidates_inactive_render_shaders()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let triangle = resources.create_shader(TRIANGLE_WGSL, None).unwrap();

        let uniform = resources
                .create_buffer(&mut device, triangle, 0, 0, BufferInit::zeroed::<[f32; 4]>(1))
                .unwrap();

        resources.bind_uniforms(triangle, uniform, 0, 0).unwrap();
        resources.activate(&mut device, triangle, false).unwrap();
        resources.deactivate(triangle).unwrap();

        let compute = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        let data = resources
                .create_buffer(&mut device, compute, 0, 0, BufferInit::zeroed::<f32>(64))
                .unwrap();

        resources.bind_output_buffer(compute, data, 0, 0).unwrap();
        resources.activate(&mut device, compute, false).unwrap();

        resources.sample_count_changed(&mut device).unwrap();

        assert_eq!(resources.shader(triangle).unwrap().state, ShaderState::Validated);
        assert_eq!(resources.shader(compute).unwrap().state, ShaderState::Active);
        assert_eq!(device.compute_pipelines.len(), 2);

        resources.activate(&mut device, triangle, false).unwrap();

        assert_eq!(device.render_pipelines.len(), 2);
        assert_eq!(device.live_of("render pipeline"), 1);
}

#[test]
fn misaligned_offsets_are_rejected()
{
        let mut device = MockDevice::new();
        let mut resources = manager();

        let shader = resources.create_shader(DOUBLE_WGSL, None).unwrap();

        assert!(matches!(
                resources.create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(4).with_offset(4)),
                Err(NanoError::MisalignedOffset { offset: 4, alignment: 256 })
        ));
        assert_eq!(device.live_count(), 0);

        let buffer = resources
                .create_buffer(&mut device, shader, 0, 0, BufferInit::zeroed::<f32>(4).with_offset(256))
                .unwrap();

        assert_eq!(resources.buffer(buffer).unwrap().binding_size(), 32);

        assert!(matches!(
                resources.create_vertex_buffer(&mut device, BufferInit::zeroed::<f32>(4).with_offset(2), None),
                Err(NanoError::MisalignedOffset { offset: 2, alignment: 4 })
        ));
}
