use crate::utils::error::BetclickResult;
use image::RgbImage;
use std::path::PathBuf;

/// One captured screen image and the desktop position of its top-left pixel.
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbImage,
    pub origin: (i32, i32),
}

impl Frame {
    pub fn new(image: RgbImage, origin: (i32, i32)) -> Self {
        Frame { image, origin }
    }

    /// Translates frame pixel coordinates to desktop coordinates.
    pub fn to_desktop(&self, x: u32, y: u32) -> (i32, i32) {
        (
            self.origin.0.saturating_add_unsigned(x),
            self.origin.1.saturating_add_unsigned(y),
        )
    }
}

/// Source of frames for the live resolver. Chosen once at startup and passed
/// down explicitly.
pub trait ScreenCapture {
    fn capture(&self) -> BetclickResult<Frame>;
}

/// A frame taken once and handed out for every lookup.
impl ScreenCapture for Frame {
    fn capture(&self) -> BetclickResult<Frame> {
        Ok(self.clone())
    }
}

/// Replays a still image, used for dry runs and template checks.
pub struct FileCapture {
    path: PathBuf,
    origin: (i32, i32),
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>, origin: (i32, i32)) -> Self {
        FileCapture {
            path: path.into(),
            origin,
        }
    }
}

impl ScreenCapture for FileCapture {
    fn capture(&self) -> BetclickResult<Frame> {
        let image = image::open(&self.path)?.to_rgb8();
        log::trace!("loaded frame {:?} from {}", image.dimensions(), self.path.display());
        Ok(Frame::new(image, self.origin))
    }
}

#[cfg(feature = "desktop")]
pub use self::desktop::MonitorCapture;

#[cfg(feature = "desktop")]
mod desktop {
    use super::{Frame, ScreenCapture};
    use crate::utils::error::{BetclickError, BetclickResult};
    use crate::utils::monitor::{self, Monitor, MonitorLike};
    use image::{DynamicImage, RgbImage};

    /// Captures the whole of one display.
    pub struct MonitorCapture {
        monitor: Monitor,
    }

    impl MonitorCapture {
        pub fn select(name: Option<String>) -> BetclickResult<Self> {
            let monitor = monitor::select_monitor(name)?;
            Ok(MonitorCapture { monitor })
        }
    }

    impl ScreenCapture for MonitorCapture {
        fn capture(&self) -> BetclickResult<Frame> {
            let bounds = self.monitor.bounds()?;
            let capture = self.monitor.capture_image()?;
            let (w, h) = capture.dimensions();
            let image: RgbImage = DynamicImage::ImageRgba8(capture).to_rgb8();
            if w == 0 || h == 0 {
                return Err(BetclickError::InvalidFrame(w, h));
            }
            Ok(Frame::new(image, (bounds.x, bounds.y)))
        }
    }
}
