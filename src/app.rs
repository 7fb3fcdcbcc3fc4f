//! Window and event-loop glue.
//!
//! Applications implement [`NanoHandler`], hand it to [`NanoBuilder`] and
//! call [`NanoRunner::run`]. The GPU is only available once the event loop
//! has resumed, so all setup that needs it belongs in [`NanoHandler::init`].

use std::sync::Arc;

#[cfg(target_arch = "wasm32")]
use winit::platform::web::EventLoopExtWebSys;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::event_loop::EventLoop;
use winit::keyboard::KeyCode;
use winit::window::Window;
use winit::window::WindowId;

use crate::config::Config;
use crate::frame::Nano;
use crate::gpu::wgpu_device::WgpuDevice;
use crate::input::EventListener;
use crate::input::InputEvent;
use crate::ui::fonts::FontSource;
use crate::utils::bootstrap;

/// Application callbacks. Input arrives through the [`EventListener`]
/// methods; Escape always exits and F1 toggles the debug overlay before the
/// listener sees the key.
pub trait NanoHandler: EventListener
{
        /// Called once, after the device is ready and before the first frame.
        fn init(
                &mut self,
                nano: &mut Nano,
        ) -> anyhow::Result<()>;

        /// Called every frame between the clear and the overlay.
        fn frame(
                &mut self,
                nano: &mut Nano,
        ) -> anyhow::Result<()>;

        #[allow(unused_variables)]
        fn shutdown(
                &mut self,
                nano: &mut Nano,
        )
        {
        }
}

pub struct NanoBuilder<H>
{
        handler: H,
        config: Option<Config>,
        fonts: Vec<FontSource>,
}

impl<H: NanoHandler + 'static> NanoBuilder<H>
{
        pub fn new(handler: H) -> Self
        {
                Self {
                        handler,
                        config: None,
                        fonts: Vec::new(),
                }
        }

        /// Replaces the configuration otherwise read from `nano.toml`.
        pub fn with_config(
                mut self,
                config: Config,
        ) -> Self
        {
                self.config = Some(config);
                self
        }

        /// Fonts for the overlay. They can only be supplied here; afterwards
        /// [`Nano::set_font`] picks among them.
        pub fn with_fonts(
                mut self,
                fonts: Vec<FontSource>,
        ) -> Self
        {
                self.fonts = fonts;
                self
        }

        /// Installs logging and prepares the event loop. The window and device
        /// are created once the loop runs.
        pub fn build(self) -> anyhow::Result<NanoRunner<H>>
        {
                bootstrap::config_logging();

                let config = self.config.unwrap_or_else(bootstrap::create_config);

                bootstrap::show_start_message(&config);

                let event_loop: EventLoop<WgpuDevice> = EventLoop::with_user_event().build()?;

                #[allow(unused_mut)]
                let mut app = NanoApp {
                        #[cfg(target_arch = "wasm32")]
                        proxy: None,
                        handler: self.handler,
                        config,
                        fonts: self.fonts,
                        window: None,
                        nano: None,
                };

                #[cfg(target_arch = "wasm32")]
                {
                        app.proxy = Some(event_loop.create_proxy());
                }

                Ok(NanoRunner {
                        app,
                        event_loop,
                })
        }
}

pub struct NanoRunner<H: NanoHandler + 'static>
{
        app: NanoApp<H>,
        event_loop: EventLoop<WgpuDevice>,
}

impl<H: NanoHandler + 'static> NanoRunner<H>
{
        pub fn run(self) -> anyhow::Result<()>
        {
                #[allow(unused_mut)]
                let mut app = self.app;

                #[cfg(target_arch = "wasm32")]
                {
                        self.event_loop.spawn_app(app);
                }

                #[cfg(not(target_arch = "wasm32"))]
                self.event_loop.run_app(&mut app)?;

                Ok(())
        }
}

struct NanoApp<H: NanoHandler>
{
        /// Carries the device back into the loop once the async setup in the
        /// browser completes.
        #[cfg(target_arch = "wasm32")]
        proxy: Option<winit::event_loop::EventLoopProxy<WgpuDevice>>,

        handler: H,

        config: Config,

        fonts: Vec<FontSource>,

        window: Option<Arc<Window>>,

        nano: Option<Nano>,
}

impl<H: NanoHandler> NanoApp<H>
{
        fn finish_setup(
                &mut self,
                event_loop: &ActiveEventLoop,
                gpu: WgpuDevice,
        )
        {
                let Some(window) = self.window.clone()
                else
                {
                        log::error!("Device ready without a window");
                        event_loop.exit();
                        return;
                };

                let mut nano = Nano::new(
                        window.clone(),
                        gpu,
                        self.config.clone(),
                        std::mem::take(&mut self.fonts),
                );

                if let Err(e) = self.handler.init(&mut nano)
                {
                        log::error!("Initialisation failed: {e:#}");
                        nano.shutdown();
                        event_loop.exit();
                        return;
                }

                self.nano = Some(nano);

                window.request_redraw();
        }

        fn redraw(&mut self)
        {
                let Some(nano) = self.nano.as_mut()
                else
                {
                        return;
                };

                if let Err(e) = nano.start_frame()
                {
                        log::warn!("Frame skipped: {e}");
                        nano.window().request_redraw();
                        return;
                }

                if let Err(e) = self.handler.frame(nano)
                {
                        log::error!("Frame callback failed: {e:#}");
                }

                if let Err(e) = nano.end_frame()
                {
                        log::error!("Unable to finish frame: {e}");
                }

                nano.window().request_redraw();
        }
}

impl<H: NanoHandler> ApplicationHandler<WgpuDevice> for NanoApp<H>
{
        fn resumed(
                &mut self,
                event_loop: &ActiveEventLoop,
        )
        {
                if self.window.is_some()
                {
                        log::info!("Already resumed, skipping initialisation.");
                        return;
                }

                #[allow(unused_mut)]
                let mut window_attributes = Window::default_attributes()
                        .with_title(self.config.title.clone())
                        .with_inner_size(winit::dpi::LogicalSize::new(self.config.width, self.config.height));

                #[cfg(target_arch = "wasm32")]
                {
                        use wasm_bindgen::JsCast;
                        use winit::platform::web::WindowAttributesExtWebSys;

                        const CANVAS_ID: &str = "canvas";

                        let canvas = web_sys::window()
                                .and_then(|w| w.document())
                                .and_then(|d| d.get_element_by_id(CANVAS_ID))
                                .and_then(|c| c.dyn_into::<web_sys::HtmlCanvasElement>().ok());

                        window_attributes = window_attributes.with_canvas(canvas);
                }

                let window = match event_loop.create_window(window_attributes)
                {
                        Ok(window) => Arc::new(window),
                        Err(e) =>
                        {
                                log::error!("Unable to create window: {e}");
                                event_loop.exit();
                                return;
                        }
                };

                self.window = Some(window.clone());

                #[cfg(not(target_arch = "wasm32"))]
                {
                        match pollster::block_on(WgpuDevice::new(window, &self.config))
                        {
                                Ok(gpu) => self.finish_setup(event_loop, gpu),
                                Err(e) =>
                                {
                                        log::error!("GPU setup failed: {e}");
                                        event_loop.exit();
                                }
                        }
                }

                #[cfg(target_arch = "wasm32")]
                {
                        let Some(proxy) = self.proxy.take()
                        else
                        {
                                log::warn!("Proxy is None, skipping async init");
                                return;
                        };

                        let config = self.config.clone();

                        wasm_bindgen_futures::spawn_local(async move {
                                match WgpuDevice::new(window, &config).await
                                {
                                        Ok(gpu) =>
                                        {
                                                if proxy.send_event(gpu).is_err()
                                                {
                                                        log::error!("Event loop closed before the device was ready");
                                                }
                                        }
                                        Err(e) => log::error!("GPU setup failed: {e}"),
                                }
                        });
                }
        }

        /// On wasm the device is created asynchronously and delivered here.
        fn user_event(
                &mut self,
                event_loop: &ActiveEventLoop,
                gpu: WgpuDevice,
        )
        {
                self.finish_setup(event_loop, gpu);
        }

        fn window_event(
                &mut self,
                event_loop: &ActiveEventLoop,
                _id: WindowId,
                event: WindowEvent,
        )
        {
                match event
                {
                        WindowEvent::CloseRequested =>
                        {
                                event_loop.exit();
                                return;
                        }
                        WindowEvent::RedrawRequested =>
                        {
                                self.redraw();
                                return;
                        }
                        _ => (),
                }

                let Some(nano) = self.nano.as_mut()
                else
                {
                        return;
                };

                let captured = nano.handle_window_event(&event);

                for input in InputEvent::from_window_event(&event)
                {
                        match input
                        {
                                InputEvent::KeyDown { key: KeyCode::Escape, .. } =>
                                {
                                        event_loop.exit();
                                        return;
                                }
                                InputEvent::KeyDown { key: KeyCode::F1, repeat: false } =>
                                {
                                        nano.toggle_debug();
                                        continue;
                                }
                                InputEvent::Resize { width, height } => nano.resize(width, height),
                                _ => (),
                        }

                        if captured && input.is_pointer_or_key()
                        {
                                continue;
                        }

                        input.deliver(&mut self.handler, nano);
                }
        }

        fn exiting(
                &mut self,
                _event_loop: &ActiveEventLoop,
        )
        {
                if let Some(mut nano) = self.nano.take()
                {
                        self.handler.shutdown(&mut nano);

                        nano.shutdown();
                }

                self.window = None;
        }
}
