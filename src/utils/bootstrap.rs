use crate::config::Config;

pub fn show_start_message(config: &Config)
{
        if !config.show_start_message
        {
                return;
        }

        let banner = r#"

    ░███    ░██    ░███    ░███    ░██   ░██████
    ░████   ░██   ░██░██   ░████   ░██  ░██   ░██
    ░██░██  ░██  ░██  ░██  ░██░██  ░██ ░██     ░██
    ░██ ░██ ░██ ░█████████ ░██ ░██ ░██ ░██     ░██
    ░██  ░██░██ ░██    ░██ ░██  ░██░██ ░██     ░██
    ░██   ░████ ░██    ░██ ░██   ░████  ░██   ░██
    ░██    ░███ ░██    ░██ ░██    ░███   ░██████

 Minimal WGSL compute and render framework built on wgpu.

            "#;

        log::info!("{banner}");
        log::info!(
                "'{}' {}x{}, {} sample(s), pools: {} shaders / {} buffers",
                config.title,
                config.width,
                config.height,
                config.sample_count,
                config.max_shaders,
                config.max_buffers
        );
}

/// Installs the platform logger. Safe to call more than once.
pub fn config_logging()
{
        #[cfg(not(target_arch = "wasm32"))]
        {
                if env_logger::try_init().is_ok()
                {
                        log::info!("Running on native.");
                }
        }

        #[cfg(target_arch = "wasm32")]
        {
                console_error_panic_hook::set_once();

                if console_log::init_with_level(log::Level::Info).is_ok()
                {
                        log::info!("Running on wasm32.");
                }
        }
}

/// Browsers have no config file to read, so wasm builds always start from
/// the defaults.
#[cfg(target_arch = "wasm32")]
pub fn create_config() -> Config
{
        Config::default()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn create_config() -> Config
{
        Config::from_file().unwrap_or_else(|err| {
                log::warn!("Failed to load config: {err}, falling back to default");
                Config::default()
        })
}
