use std::sync::Arc;
use winit::error::OsError;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Green Hill".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

impl PlatformConfig {
    /// Inner size in logical pixels, never zero on either axis.
    pub fn logical_size(&self) -> (u32, u32) {
        (self.width.max(1), self.height.max(1))
    }
}

pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
) -> Result<Arc<Window>, OsError> {
    let (width, height) = config.logical_size();
    let attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_resizable(config.resizable)
        .with_inner_size(winit::dpi::LogicalSize::new(width, height));

    let window = event_loop.create_window(attrs)?;
    log::debug!("Platform window '{}' {}x{}", config.title, width, height);
    Ok(Arc::new(window))
}
