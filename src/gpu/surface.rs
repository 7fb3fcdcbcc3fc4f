use std::sync::Arc;

use winit::window::Window;

use crate::error::NanoError;
use crate::error::NanoResult;

/// The swapchain surface plus the multisampled color target drawn into when
/// MSAA is enabled.
#[derive(Debug)]
pub struct SurfaceManager
{
        pub surface: wgpu::Surface<'static>,
        pub configuration: wgpu::SurfaceConfiguration,
        pub capabilities: wgpu::SurfaceCapabilities,
        /// `None` when `sample_count` is 1.
        pub msaa: Option<wgpu::TextureView>,
        pub sample_count: u32,
        pub is_surface_configured: bool,
}

impl SurfaceManager
{
        pub fn new(
                surface: wgpu::Surface<'static>,
                window: &Arc<Window>,
                adapter: &wgpu::Adapter,
                device: &wgpu::Device,
                vsync: bool,
                sample_count: u32,
        ) -> NanoResult<Self>
        {
                let size = window.inner_size();

                let capabilities = surface.get_capabilities(adapter);

                let format = Self::texture_format(&capabilities)?;

                let configuration = wgpu::SurfaceConfiguration {
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                        format,
                        width: size.width.max(1),
                        height: size.height.max(1),
                        present_mode: Self::present_mode(&capabilities, vsync),
                        desired_maximum_frame_latency: 2,
                        alpha_mode: capabilities
                                .alpha_modes
                                .first()
                                .copied()
                                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                        view_formats: vec![],
                };

                surface.configure(device, &configuration);

                let mut manager = Self {
                        surface,
                        configuration,
                        capabilities,
                        msaa: None,
                        sample_count: 1,
                        is_surface_configured: true,
                };

                manager.set_sample_count(adapter, device, sample_count)?;

                Ok(manager)
        }

        fn texture_format(capabilities: &wgpu::SurfaceCapabilities) -> NanoResult<wgpu::TextureFormat>
        {
                capabilities
                        .formats
                        .iter()
                        .find(|f| f.is_srgb())
                        .or_else(|| capabilities.formats.first())
                        .copied()
                        .ok_or_else(|| NanoError::Surface("surface reports no formats".to_owned()))
        }

        fn present_mode(
                capabilities: &wgpu::SurfaceCapabilities,
                vsync: bool,
        ) -> wgpu::PresentMode
        {
                if vsync
                {
                        return wgpu::PresentMode::Fifo;
                }

                [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
                        .into_iter()
                        .find(|m| capabilities.present_modes.contains(m))
                        .unwrap_or(wgpu::PresentMode::Fifo)
        }

        pub fn format(&self) -> wgpu::TextureFormat
        {
                self.configuration.format
        }

        pub fn size(&self) -> (u32, u32)
        {
                (self.configuration.width, self.configuration.height)
        }

        /// Switches MSAA on or off. Pipelines created before the change no
        /// longer match the color target and must be rebuilt.
        pub fn set_sample_count(
                &mut self,
                adapter: &wgpu::Adapter,
                device: &wgpu::Device,
                sample_count: u32,
        ) -> NanoResult<()>
        {
                let supported = adapter
                        .get_texture_format_features(self.format())
                        .flags
                        .sample_count_supported(sample_count);

                if !supported
                {
                        return Err(NanoError::UnsupportedSampleCount(sample_count));
                }

                self.sample_count = sample_count;

                self.msaa = Self::create_msaa_view(device, &self.configuration, sample_count);

                log::info!("Surface sample count set to {sample_count}");

                Ok(())
        }

        pub fn resize(
                &mut self,
                device: &wgpu::Device,
                width: u32,
                height: u32,
        )
        {
                if width == 0 || height == 0
                {
                        return;
                }

                let max_dim = device.limits().max_texture_dimension_2d;

                self.configuration.width = width.min(max_dim);
                self.configuration.height = height.min(max_dim);

                self.surface.configure(device, &self.configuration);

                self.msaa = Self::create_msaa_view(device, &self.configuration, self.sample_count);

                self.is_surface_configured = true;
        }

        /// Reconfigures with the current settings, after the surface was lost.
        pub fn reconfigure(
                &mut self,
                device: &wgpu::Device,
        )
        {
                self.surface.configure(device, &self.configuration);
        }

        pub fn acquire(&self) -> NanoResult<(wgpu::SurfaceTexture, wgpu::TextureView)>
        {
                let output = self
                        .surface
                        .get_current_texture()
                        .map_err(|e| NanoError::Surface(e.to_string()))?;

                let view = output
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());

                Ok((output, view))
        }

        /// `(render target, resolve target)` for a frame drawn into `frame`.
        pub fn targets<'a>(
                &'a self,
                frame: &'a wgpu::TextureView,
        ) -> (&'a wgpu::TextureView, Option<&'a wgpu::TextureView>)
        {
                match &self.msaa
                {
                        Some(msaa) => (msaa, Some(frame)),
                        None => (frame, None),
                }
        }

        fn create_msaa_view(
                device: &wgpu::Device,
                config: &wgpu::SurfaceConfiguration,
                sample_count: u32,
        ) -> Option<wgpu::TextureView>
        {
                if sample_count <= 1
                {
                        return None;
                }

                let texture = device.create_texture(&wgpu::TextureDescriptor {
                        label: Some("MSAA Color Texture"),
                        size: wgpu::Extent3d {
                                width: config.width,
                                height: config.height,
                                depth_or_array_layers: 1,
                        },
                        mip_level_count: 1,
                        sample_count,
                        dimension: wgpu::TextureDimension::D2,
                        format: config.format,
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                        view_formats: &[],
                });

                Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
        }
}
