pub mod debug;
pub mod fonts;
pub mod renderer;
