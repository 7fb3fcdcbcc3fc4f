//! The per-frame driver.
//!
//! A frame always runs in this order: clear, shader dispatches and draws,
//! readback copies issued by the application, the debug overlay, then submit
//! and present. Settings that invalidate pipelines or the font atlas are
//! queued and applied after presentation.

use std::sync::Arc;

use winit::event::WindowEvent;
use winit::window::Window;

use crate::config::Config;
use crate::error::NanoResult;
use crate::gpu::wgpu_device::WgpuDevice;
use crate::pool::BufferId;
use crate::pool::ShaderId;
use crate::readback::Readback;
use crate::resources::BufferInit;
use crate::resources::ResourceManager;
use crate::shader::Shader;
use crate::ui::debug::DebugInfo;
use crate::ui::debug::DebugOverlay;
use crate::ui::debug::DebugRequests;
use crate::ui::debug::ShaderRow;
use crate::ui::fonts::FontBook;
use crate::ui::fonts::FontSource;
use crate::ui::renderer::GuiRenderer;

/// Frame counter and smoothed timing.
#[derive(Debug, Clone)]
pub struct FrameStats
{
        pub frame_count: u64,
        last: Option<instant::Instant>,
        /// Seconds since the previous frame.
        pub delta: f32,
        pub fps: f32,
}

impl Default for FrameStats
{
        fn default() -> Self
        {
                Self {
                        frame_count: 0,
                        last: None,
                        delta: 0.0,
                        fps: 0.0,
                }
        }
}

impl FrameStats
{
        const SMOOTHING: f32 = 0.9;

        pub fn tick(
                &mut self,
                now: instant::Instant,
        )
        {
                if let Some(last) = self.last
                {
                        self.delta = now.duration_since(last).as_secs_f32();

                        if self.delta > 0.0
                        {
                                let fps = 1.0 / self.delta;

                                self.fps = if self.fps == 0.0
                                {
                                        fps
                                }
                                else
                                {
                                        self.fps * Self::SMOOTHING + fps * (1.0 - Self::SMOOTHING)
                                };
                        }
                }

                self.last = Some(now);

                self.frame_count += 1;
        }

        pub fn frame_ms(&self) -> f32
        {
                self.delta * 1000.0
        }
}

#[derive(Debug)]
pub struct Nano
{
        pub config: Config,

        pub gpu: WgpuDevice,

        pub resources: ResourceManager,

        pub stats: FrameStats,

        window: Arc<Window>,

        gui: GuiRenderer,

        fonts: FontBook,

        debug: DebugOverlay,

        clear_color: wgpu::Color,

        ui_scale: f32,

        pending_sample_count: Option<u32>,
}

impl Nano
{
        pub fn new(
                window: Arc<Window>,
                gpu: WgpuDevice,
                config: Config,
                fonts: Vec<FontSource>,
        ) -> Self
        {
                let gui = GuiRenderer::new(&gpu.device, gpu.surface.format(), &window);

                let mut fonts = FontBook::new(fonts, config.font_size);

                fonts.apply(gui.context());

                Self {
                        resources: ResourceManager::from_config(&config),
                        stats: FrameStats::default(),
                        debug: DebugOverlay::new(config.show_debug),
                        clear_color: config.clear_color(),
                        ui_scale: config.ui_scale,
                        pending_sample_count: None,
                        window,
                        gui,
                        fonts,
                        gpu,
                        config,
                }
        }

        pub fn window(&self) -> &Arc<Window>
        {
                &self.window
        }

        /// The overlay's egui context, for application panels.
        pub fn egui(&self) -> &egui::Context
        {
                self.gui.context()
        }

        pub fn set_clear_color(
                &mut self,
                color: wgpu::Color,
        )
        {
                self.clear_color = color;
        }

        /// Takes effect after the current frame; every active shader is
        /// rebuilt for the new sample count.
        pub fn set_sample_count(
                &mut self,
                sample_count: u32,
        )
        {
                self.pending_sample_count = Some(sample_count);
        }

        /// Selects a font loaded at startup. Applied after the current frame.
        pub fn set_font(
                &mut self,
                index: usize,
        ) -> NanoResult<()>
        {
                self.fonts.set_font(index)
        }

        pub fn set_font_size(
                &mut self,
                size: f32,
        )
        {
                self.fonts.set_font_size(size);
        }

        pub fn toggle_debug(&mut self)
        {
                self.debug.toggle();
        }

        pub fn is_debug_visible(&self) -> bool
        {
                self.debug.visible
        }

        /// Forwards the event to the overlay. Returns true when the overlay
        /// captured it.
        pub fn handle_window_event(
                &mut self,
                event: &WindowEvent,
        ) -> bool
        {
                self.gui.handle_input(&self.window, event)
        }

        pub fn resize(
                &mut self,
                width: u32,
                height: u32,
        )
        {
                self.gpu.resize(width, height);
        }

        // ---------------------------------------------------------------- shortcuts

        pub fn create_shader(
                &mut self,
                source: &str,
                label: Option<&str>,
        ) -> NanoResult<ShaderId>
        {
                self.resources.create_shader(source, label)
        }

        pub fn create_buffer(
                &mut self,
                shader: ShaderId,
                group: u32,
                binding: u32,
                init: BufferInit<'_>,
        ) -> NanoResult<BufferId>
        {
                self.resources
                        .create_buffer(&mut self.gpu, shader, group, binding, init)
        }

        pub fn activate(
                &mut self,
                shader: ShaderId,
                rebuild: bool,
        ) -> NanoResult<()>
        {
                self.resources.activate(&mut self.gpu, shader, rebuild)
        }

        pub fn deactivate(
                &mut self,
                shader: ShaderId,
        ) -> NanoResult<()>
        {
                self.resources.deactivate(shader)
        }

        pub fn release_shader(
                &mut self,
                shader: ShaderId,
        ) -> NanoResult<()>
        {
                self.resources.release_shader(&mut self.gpu, shader)
        }

        pub fn copy_to_cpu(
                &mut self,
                readback: &mut Readback,
        ) -> NanoResult<()>
        {
                readback.copy_to_cpu(&mut self.gpu, &self.resources, None)
        }

        pub fn poll_readback(
                &mut self,
                readback: &mut Readback,
        ) -> NanoResult<bool>
        {
                readback.poll(&mut self.gpu)
        }

        pub fn release_readback(
                &mut self,
                readback: &mut Readback,
        )
        {
                readback.release(&mut self.gpu);
        }

        // ---------------------------------------------------------------- frame

        /// Acquires the surface texture, clears it and starts the overlay.
        pub fn start_frame(&mut self) -> NanoResult<()>
        {
                self.stats.tick(instant::Instant::now());

                self.gpu.begin_frame(self.clear_color)?;

                self.gui.begin_frame(&self.window, self.ui_scale);

                Ok(())
        }

        /// Executes every active shader in activation order.
        pub fn execute_shaders(&mut self) -> NanoResult<()>
        {
                self.resources.execute_shaders(&mut self.gpu)
        }

        pub fn execute_shader(
                &mut self,
                shader: ShaderId,
        ) -> NanoResult<()>
        {
                self.resources.execute_shader(&mut self.gpu, shader)
        }

        fn debug_info(&self) -> DebugInfo
        {
                let row = |s: &Shader| ShaderRow {
                        id: s.id,
                        label: s.label.clone(),
                        compute: s.is_compute(),
                        render: s.is_render(),
                        active: s.is_active(),
                };

                let mut rows: Vec<ShaderRow> = self
                        .resources
                        .active_shaders()
                        .iter()
                        .filter_map(|id| self.resources.shader(*id).ok())
                        .map(row)
                        .collect();

                rows.extend(self.resources.shaders().filter(|s| !s.is_active()).map(row));

                let c = self.clear_color;

                DebugInfo {
                        fps: self.stats.fps,
                        frame_ms: self.stats.frame_ms(),
                        frame_count: self.stats.frame_count,
                        surface_size: self.gpu.size(),
                        shaders: self.resources.shader_count(),
                        shader_limit: self.config.max_shaders,
                        buffers: self.resources.buffer_count(),
                        buffer_limit: self.config.max_buffers,
                        gpu_objects: self.gpu.object_count(),
                        rows,
                        sample_count: self.gpu.sample_count(),
                        fonts: self.fonts.names().map(str::to_owned).collect(),
                        current_font: self.fonts.current(),
                        font_size: self.fonts.size(),
                        clear_color: [c.r as f32, c.g as f32, c.b as f32, c.a as f32],
                }
        }

        fn apply_requests(
                &mut self,
                requests: DebugRequests,
        )
        {
                if let Some(count) = requests.sample_count
                {
                        self.set_sample_count(count);
                }

                if let Some([r, g, b, a]) = requests.clear_color
                {
                        self.clear_color = wgpu::Color {
                                r: f64::from(r),
                                g: f64::from(g),
                                b: f64::from(b),
                                a: f64::from(a),
                        };
                }

                if let Some(size) = requests.font_size
                {
                        self.set_font_size(size);
                }

                if let Some(index) = requests.font
                {
                        if let Err(e) = self.set_font(index)
                        {
                                log::warn!("{e}");
                        }
                }

                if let Some(id) = requests.toggle_shader
                {
                        let result = match self.resources.shader(id).map(|s| s.is_active())
                        {
                                Ok(true) => self.deactivate(id),
                                Ok(false) => self.activate(id, false),
                                Err(e) => Err(e),
                        };

                        if let Err(e) = result
                        {
                                log::warn!("Unable to toggle shader {id}: {e}");
                        }
                }
        }

        /// Records queued draws, draws the overlay, presents, then applies
        /// deferred sample-count and font changes.
        pub fn end_frame(&mut self) -> NanoResult<()>
        {
                self.gpu.flush_draws()?;

                let info = self.debug_info();

                let requests = self.debug.show(self.gui.context(), &info);

                let (width, height) = self.gpu.size();

                let screen = egui_wgpu::ScreenDescriptor {
                        size_in_pixels: [width, height],
                        pixels_per_point: self.gui.context().pixels_per_point(),
                };

                let gui = &mut self.gui;

                let window = &self.window;

                self.gpu.with_frame(|device, queue, encoder, view| {
                        gui.end_frame_and_draw(device, queue, encoder, window, view, screen);
                })?;

                self.gpu.end_frame()?;

                self.apply_requests(requests);

                self.apply_pending()
        }

        fn apply_pending(&mut self) -> NanoResult<()>
        {
                if let Some(count) = self.pending_sample_count.take()
                {
                        if count != self.gpu.sample_count()
                        {
                                self.gpu.set_sample_count(count)?;

                                self.resources.sample_count_changed(&mut self.gpu)?;
                        }
                }

                if self.fonts.has_pending()
                {
                        self.fonts.apply(self.gui.context());
                }

                Ok(())
        }

        /// Releases every shader and buffer, then the overlay, then the device,
        /// adapter and instance.
        pub fn shutdown(mut self)
        {
                self.resources.release_all(&mut self.gpu);

                drop(self.gui);

                self.gpu.shutdown();

                log::info!("nano shut down after {} frames", self.stats.frame_count);
        }
}
