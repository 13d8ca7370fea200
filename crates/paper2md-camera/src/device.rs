use crate::pattern::{TestPatternCamera, DEFAULT_PATTERN_SIZE};
use crate::still::StillImageCamera;
use crate::stream::CameraDevice;
use paper2md_core::{CameraConfig, CameraError};

/// Resolves camera configuration into a concrete [`CameraDevice`].
pub struct DeviceManager {
    backends: Vec<&'static str>,
}

impl DeviceManager {
    pub fn new() -> Self {
        let mut backends = vec!["pattern", "still"];
        if cfg!(feature = "v4l") {
            backends.push("v4l");
        }
        Self { backends }
    }

    pub fn list_backends(&self) -> &[&'static str] {
        &self.backends
    }

    /// Devices visible to the compiled-in backends, as `(backend, device)` pairs.
    pub fn list_devices(&self) -> Vec<(String, String)> {
        let mut result = vec![("pattern".to_string(), "test card".to_string())];
        result.extend(v4l_devices());
        result
    }

    pub fn get_device(&self, config: &CameraConfig) -> Result<Box<dyn CameraDevice>, CameraError> {
        match config.backend.as_str() {
            "pattern" => {
                let width = config.width.unwrap_or(DEFAULT_PATTERN_SIZE.0);
                let height = config.height.unwrap_or(DEFAULT_PATTERN_SIZE.1);
                Ok(Box::new(TestPatternCamera::new(width, height)))
            }
            "still" => Ok(Box::new(StillImageCamera::new(&config.device))),
            #[cfg(feature = "v4l")]
            "v4l" => {
                let requested = config.width.zip(config.height);
                Ok(Box::new(crate::v4l_capture::V4lCamera::new(
                    &config.device,
                    requested,
                )))
            }
            #[cfg(not(feature = "v4l"))]
            "v4l" => Err(CameraError::BackendUnavailable(
                "v4l (rebuild with the `v4l` feature)".to_string(),
            )),
            other => Err(CameraError::BackendUnavailable(other.to_string())),
        }
    }
}

#[cfg(feature = "v4l")]
fn v4l_devices() -> Vec<(String, String)> {
    crate::v4l_capture::list_devices()
        .into_iter()
        .map(|(name, path)| ("v4l".to_string(), format!("{} ({})", path.display(), name)))
        .collect()
}

#[cfg(not(feature = "v4l"))]
fn v4l_devices() -> Vec<(String, String)> {
    Vec::new()
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper2md_core::AppConfig;

    fn config(backend: &str, device: &str) -> CameraConfig {
        CameraConfig {
            backend: backend.to_string(),
            device: device.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pattern_backend_uses_default_size() {
        let manager = DeviceManager::new();
        let device = manager.get_device(&config("pattern", "")).unwrap();
        assert_eq!(device.name(), "pattern");
        let stream = device.open().unwrap();
        assert_eq!(
            stream.video_track().unwrap().resolution(),
            DEFAULT_PATTERN_SIZE
        );
    }

    #[test]
    fn test_pattern_backend_honours_requested_size() {
        let manager = DeviceManager::new();
        let mut cfg = config("pattern", "");
        cfg.width = Some(320);
        cfg.height = Some(200);
        let stream = manager.get_device(&cfg).unwrap().open().unwrap();
        assert_eq!(stream.video_track().unwrap().resolution(), (320, 200));
    }

    #[test]
    fn test_still_backend_named_after_path() {
        let manager = DeviceManager::new();
        let device = manager.get_device(&config("still", "/tmp/page.png")).unwrap();
        assert_eq!(device.name(), "still:/tmp/page.png");
    }

    #[test]
    fn test_unknown_backend_is_unavailable() {
        let manager = DeviceManager::new();
        match manager.get_device(&config("gstreamer", "")) {
            Err(CameraError::BackendUnavailable(name)) => assert_eq!(name, "gstreamer"),
            _ => panic!("expected BackendUnavailable"),
        }
    }

    #[cfg(not(feature = "v4l"))]
    #[test]
    fn test_v4l_backend_without_feature_is_unavailable() {
        let manager = DeviceManager::new();
        assert!(!manager.list_backends().contains(&"v4l"));
        assert!(matches!(
            manager.get_device(&config("v4l", "/dev/video0")),
            Err(CameraError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn test_default_config_backend_is_compiled_in() {
        let config = AppConfig::default();
        let device = DeviceManager::new().get_device(&config.camera).unwrap();
        assert!(DeviceManager::new()
            .list_backends()
            .contains(&config.camera.backend.as_str()));
        if cfg!(not(feature = "v4l")) {
            assert_eq!(device.name(), "pattern");
        }
    }

    #[test]
    fn test_list_devices_includes_pattern() {
        let manager = DeviceManager::new();
        let devices = manager.list_devices();
        assert!(devices.iter().any(|(backend, _)| backend == "pattern"));
    }
}
