use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Environment variable naming the configuration file to load.
pub const CONFIG_ENV: &str = "NANO_CONFIG";

/// Configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "nano.toml";

/// Window, surface and pool settings. Every field may be omitted from the
/// TOML file; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
        pub title: String,
        pub width: u32,
        pub height: u32,
        /// MSAA samples, 1 disables multisampling.
        pub sample_count: u32,
        pub clear_color: [f64; 4],
        pub show_debug: bool,
        pub font_size: f32,
        pub ui_scale: f32,
        pub vsync: bool,
        pub max_shaders: usize,
        pub max_buffers: usize,
        pub show_start_message: bool,
}

impl Default for Config
{
        fn default() -> Self
        {
                Self {
                        title: "nano".to_owned(),
                        width: 1280,
                        height: 720,
                        sample_count: 1,
                        clear_color: [0.1, 0.1, 0.1, 1.0],
                        show_debug: false,
                        font_size: 16.0,
                        ui_scale: 1.0,
                        vsync: true,
                        max_shaders: 16,
                        max_buffers: 256,
                        show_start_message: true,
                }
        }
}

impl Config
{
        pub fn from_toml_str(text: &str) -> anyhow::Result<Self>
        {
                let config: Config = toml::from_str(text)?;

                if config.max_shaders == 0 || config.max_buffers == 0
                {
                        anyhow::bail!("max_shaders and max_buffers must be at least 1");
                }

                Ok(config)
        }

        /// Loads the file named by `NANO_CONFIG`, or `nano.toml`.
        pub fn from_file() -> anyhow::Result<Self>
        {
                let path = std::env::var_os(CONFIG_ENV)
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

                Self::from_path(&path)
        }

        pub fn from_path(path: &Path) -> anyhow::Result<Self>
        {
                let text = std::fs::read_to_string(path)
                        .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;

                Self::from_toml_str(&text)
        }

        pub fn clear_color(&self) -> wgpu::Color
        {
                let [r, g, b, a] = self.clear_color;

                wgpu::Color { r, g, b, a }
        }
}
