use nano::BufferId;
use nano::BufferInit;
use nano::EventListener;
use nano::Nano;
use nano::NanoHandler;
use nano::Readback;
use nano::ShaderId;
use winit::keyboard::KeyCode;

const WAVE: &str = r#"
struct Uniforms
{
        time: f32,
        @align(8) resolution: vec2<f32>,
};

@group(0) @binding(0) var<uniform> uniforms: Uniforms;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32>
{
        let x = f32((index << 1u) & 2u);
        let y = f32(index & 2u);
        return vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32>
{
        let uv = position.xy / uniforms.resolution;
        let wave = 0.5 + 0.5 * sin(uv.x * 20.0 + uniforms.time);
        let glow = smoothstep(0.02, 0.0, abs(uv.y - wave));
        return vec4<f32>(glow * 0.3, glow * 0.8, glow, 1.0);
}
"#;

const DOUBLE: &str = r#"
@group(0) @binding(0) var<storage, read_write> data: array<f32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>)
{
        if (id.x < arrayLength(&data))
        {
                data[id.x] = data[id.x] * 2.0;
        }
}
"#;

const ELEMENTS: usize = 1024;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms
{
        time: f32,
        padding: f32,
        resolution: [f32; 2],
}

#[derive(Default)]
struct Demo
{
        uniforms: Uniforms,
        uniform_buffer: Option<BufferId>,
        readback: Option<Readback>,
        doubling: Option<ShaderId>,
}

impl EventListener for Demo
{
        fn on_key_down(
                &mut self,
                nano: &mut Nano,
                key: KeyCode,
                repeat: bool,
        )
        {
                if repeat
                {
                        return;
                }

                match key
                {
                        KeyCode::KeyR =>
                        {
                                if let Some(readback) = self.readback.as_mut()
                                {
                                        if let Err(e) = nano.copy_to_cpu(readback)
                                        {
                                                log::warn!("Readback not issued: {e}");
                                        }
                                }
                        }
                        KeyCode::Space =>
                        {
                                let Some(shader) = self.doubling
                                else
                                {
                                        return;
                                };

                                let result = match nano.resources.shader(shader).map(|s| s.is_active())
                                {
                                        Ok(true) => nano.deactivate(shader),
                                        Ok(false) => nano.activate(shader, false),
                                        Err(e) => Err(e),
                                };

                                if let Err(e) = result
                                {
                                        log::warn!("{e}");
                                }
                        }
                        _ => (),
                }
        }

        fn on_resize(
                &mut self,
                _nano: &mut Nano,
                width: u32,
                height: u32,
        )
        {
                self.uniforms.resolution = [width as f32, height as f32];
        }
}

impl NanoHandler for Demo
{
        fn init(
                &mut self,
                nano: &mut Nano,
        ) -> anyhow::Result<()>
        {
                let (width, height) = nano.gpu.size();

                self.uniforms.resolution = [width as f32, height as f32];

                let wave = nano.create_shader(WAVE, Some("wave"))?;

                let uniforms = nano.create_buffer(wave, 0, 0, BufferInit::from_value(&self.uniforms))?;

                nano.resources.bind_uniforms(wave, uniforms, 0, 0)?;
                nano.resources.log_shader_info(wave)?;
                nano.activate(wave, true)?;

                let doubling = nano.create_shader(DOUBLE, Some("double"))?;

                let values: Vec<f32> = (0..ELEMENTS).map(|i| i as f32).collect();

                let data = nano.create_buffer(doubling, 0, 0, BufferInit::from_slice(&values))?;

                nano.resources.bind_output_buffer(doubling, data, 0, 0)?;
                nano.activate(doubling, false)?;

                self.uniform_buffer = Some(uniforms);
                self.readback = Some(Readback::new(data, 16));
                self.doubling = Some(doubling);

                log::info!("[R] reads back the first values, [Space] pauses the compute pass");

                Ok(())
        }

        fn frame(
                &mut self,
                nano: &mut Nano,
        ) -> anyhow::Result<()>
        {
                self.uniforms.time += nano.stats.delta;

                if let Some(buffer) = self.uniform_buffer
                {
                        nano.resources.update_buffer_with(buffer, &[self.uniforms])?;
                }

                nano.execute_shaders()?;

                if let Some(readback) = self.readback.as_mut()
                {
                        if nano.poll_readback(readback)?
                        {
                                if let Some(values) = readback.data_as::<f32>()
                                {
                                        log::info!("First values: {values:?}");
                                }

                                nano.release_readback(readback);
                        }
                }

                Ok(())
        }

        fn shutdown(
                &mut self,
                nano: &mut Nano,
        )
        {
                if let Some(mut readback) = self.readback.take()
                {
                        nano.release_readback(&mut readback);
                }
        }
}

fn main() -> anyhow::Result<()>
{
        nano::NanoBuilder::new(Demo::default())
                .build()?
                .run()
}
