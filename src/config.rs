use std::path::PathBuf;

use crate::look_controls::LookConfig;
use crate::tour::{FadeConfig, HotspotConfig};

/// Everything the viewer needs besides the tour itself.
#[derive(Clone, Debug)]
pub struct TourConfig {
    /// Window title shown until the first scene is ready.
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Overrides the tour's own `imageDirectory`.
    pub image_directory: Option<PathBuf>,
    pub fade: FadeConfig,
    pub hotspots: HotspotConfig,
    pub look: LookConfig,
    /// Image drawn on hotspot markers. A procedural dot is used when unset or unreadable.
    pub marker_image: Option<PathBuf>,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            title: "Panotour".to_string(),
            width: 1280,
            height: 720,
            image_directory: None,
            fade: FadeConfig::default(),
            hotspots: HotspotConfig::default(),
            look: LookConfig::default(),
            marker_image: None,
        }
    }
}

impl TourConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn image_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.image_directory = Some(directory.into());
        self
    }

    pub fn fade(mut self, fade: FadeConfig) -> Self {
        self.fade = fade;
        self
    }

    pub fn hotspots(mut self, hotspots: HotspotConfig) -> Self {
        self.hotspots = hotspots;
        self
    }

    pub fn look(mut self, look: LookConfig) -> Self {
        self.look = look;
        self
    }

    pub fn marker_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.marker_image = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = TourConfig::new()
            .title("Museum")
            .size(640, 480)
            .image_directory("/srv/panos")
            .hotspots(HotspotConfig::default().exclude_hidden_from_hit_test(true));

        assert_eq!(config.title, "Museum");
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.image_directory, Some(PathBuf::from("/srv/panos")));
        assert!(config.hotspots.exclude_hidden_from_hit_test);
        assert_eq!(config.fade.opacity_step, 0.06);
        assert_eq!(config.look.rotate_speed, -0.4);
    }
}
