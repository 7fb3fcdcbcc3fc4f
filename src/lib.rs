//! nano: a thin compute and render framework over `wgpu`.
//!
//! Shaders are plain WGSL source. Their `@group`/`@binding` declarations and
//! entry points are read straight from the text, and bind group layouts,
//! pipeline layouts and pipelines are derived from that. Buffers are created
//! from the reflected bindings and addressed by stable ids, so application
//! code never touches a `wgpu` object directly.
//!
//! ```ignore
//! struct Sum;
//!
//! impl nano::EventListener for Sum {}
//!
//! impl nano::NanoHandler for Sum
//! {
//!         fn init(&mut self, nano: &mut nano::Nano) -> anyhow::Result<()>
//!         {
//!                 let shader = nano.create_shader(include_str!("sum.wgsl"), Some("sum"))?;
//!                 let data = vec![1.0f32; 65536];
//!                 let buffer = nano.create_buffer(shader, 0, 0, nano::BufferInit::from_slice(&data))?;
//!                 nano.resources.bind_output_buffer(shader, buffer, 0, 0)?;
//!                 nano.activate(shader, false)?;
//!                 Ok(())
//!         }
//!
//!         fn frame(&mut self, nano: &mut nano::Nano) -> anyhow::Result<()>
//!         {
//!                 nano.execute_shaders()?;
//!                 Ok(())
//!         }
//! }
//!
//! nano::NanoBuilder::new(Sum).build()?.run()?;
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod input;
pub mod pool;
pub mod readback;
pub mod resources;
pub mod shader;
pub mod ui;
pub mod utils;

pub use app::NanoBuilder;
pub use app::NanoHandler;
pub use app::NanoRunner;
pub use config::Config;
pub use error::NanoError;
pub use error::NanoResult;
pub use frame::Nano;
pub use input::EventListener;
pub use input::InputEvent;
pub use pool::BufferId;
pub use pool::ShaderId;
pub use readback::Readback;
pub use resources::BufferInit;
pub use resources::ResourceManager;
pub use ui::fonts::FontSource;
