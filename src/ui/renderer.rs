use derivative::Derivative;
use egui::Context;
use egui_wgpu::Renderer;
use egui_wgpu::ScreenDescriptor;
use egui_winit::State;
use wgpu::CommandEncoder;
use wgpu::Device;
use wgpu::Queue;
use wgpu::TextureFormat;
use wgpu::TextureView;
use winit::event::WindowEvent;
use winit::window::Window;

/// egui state and renderer. The overlay is drawn last, straight onto the
/// resolved surface texture.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct GuiRenderer
{
        #[derivative(Debug = "ignore")]
        state: State,

        #[derivative(Debug = "ignore")]
        renderer: Renderer,

        frame_started: bool,
}

impl GuiRenderer
{
        pub fn context(&self) -> &Context
        {
                self.state.egui_ctx()
        }

        pub fn new(
                device: &Device,
                output_color_format: TextureFormat,
                window: &Window,
        ) -> GuiRenderer
        {
                let egui_context = Context::default();

                let egui_state = State::new(
                        egui_context,
                        egui::viewport::ViewportId::ROOT,
                        &window,
                        Some(window.scale_factor() as f32),
                        None,
                        Some(2 * 1024),
                );

                let egui_renderer = Renderer::new(device, output_color_format, None, 1, true);

                GuiRenderer {
                        state: egui_state,
                        renderer: egui_renderer,
                        frame_started: false,
                }
        }

        /// Returns true when egui wants the event for itself.
        pub fn handle_input(
                &mut self,
                window: &Window,
                event: &WindowEvent,
        ) -> bool
        {
                self.state.on_window_event(window, event).consumed
        }

        pub fn begin_frame(
                &mut self,
                window: &Window,
                ui_scale: f32,
        )
        {
                self.context()
                        .set_pixels_per_point(current_pixels_per_point(window, ui_scale));

                let raw_input = self.state.take_egui_input(window);

                self.state.egui_ctx().begin_pass(raw_input);

                self.frame_started = true;
        }

        pub fn end_frame_and_draw(
                &mut self,
                device: &Device,
                queue: &Queue,
                encoder: &mut CommandEncoder,
                window: &Window,
                window_surface_view: &TextureView,
                screen_descriptor: ScreenDescriptor,
        )
        {
                if !self.frame_started
                {
                        log::warn!("GUI frame was not started, skipping overlay draw");
                        return;
                }

                let full_output = self.state.egui_ctx().end_pass();

                self.state
                        .handle_platform_output(window, full_output.platform_output);

                let tris = self
                        .state
                        .egui_ctx()
                        .tessellate(full_output.shapes, self.context().pixels_per_point());

                for (id, image_delta) in &full_output.textures_delta.set
                {
                        self.renderer
                                .update_texture(device, queue, *id, image_delta);
                }

                self.renderer
                        .update_buffers(device, queue, encoder, &tris, &screen_descriptor);

                let rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: window_surface_view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                        load: wgpu::LoadOp::Load,
                                        store: wgpu::StoreOp::Store,
                                },
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        label: Some("egui overlay pass"),
                        occlusion_query_set: None,
                });

                self.renderer
                        .render(&mut rpass.forget_lifetime(), &tris, &screen_descriptor);

                for x in &full_output.textures_delta.free
                {
                        self.renderer.free_texture(x)
                }

                self.frame_started = false;
        }
}

#[cfg(target_arch = "wasm32")]
fn current_pixels_per_point(
        _window: &Window,
        ui_scale: f32,
) -> f32
{
        web_sys::window().map_or(1.0, |w| w.device_pixel_ratio() as f32) * ui_scale
}

#[cfg(not(target_arch = "wasm32"))]
fn current_pixels_per_point(
        window: &Window,
        ui_scale: f32,
) -> f32
{
        window.scale_factor() as f32 * ui_scale
}
