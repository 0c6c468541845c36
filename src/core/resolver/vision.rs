use super::{PositionResolver, ResolvedTarget, ResolverKind, Side, VisionSettings};
use crate::core::capture::{Frame, ScreenCapture};
use crate::core::probe;
use crate::core::reason::Reason;
use crate::core::templates::{Template, TemplateSet};

/// Locates targets on a fresh capture for every lookup.
pub struct VisionResolver<C: ScreenCapture> {
    capture: C,
    templates: TemplateSet,
    settings: VisionSettings,
}

impl<C: ScreenCapture> VisionResolver<C> {
    pub fn new(capture: C, templates: TemplateSet, mut settings: VisionSettings) -> Self {
        if let Some(threshold) = templates.threshold {
            settings.threshold = threshold;
        }
        VisionResolver {
            capture,
            templates,
            settings,
        }
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    fn frame(&self) -> Option<Frame> {
        match self.capture.capture() {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::error!("screen capture failed: {e}");
                None
            }
        }
    }

    /// Searches one template, optionally in the bottom part of the frame only.
    pub fn locate(&self, template: &Template, roi: Option<f32>) -> Option<ResolvedTarget> {
        let frame = self.frame()?;
        let (found, offset) = match roi {
            Some(ratio) => {
                let (region, offset) = probe::bottom_roi(&frame.image, ratio);
                (self.search(&region, template), offset)
            }
            None => (self.search(&frame.image, template), 0),
        };
        let Some(m) = found else {
            log::debug!("{} not found", template.name);
            return None;
        };

        let (x, y) = frame.to_desktop(m.x, m.y + offset);
        log::debug!(
            "{} found at ({x}, {y}) {}x{} score {:.3} scale {}",
            template.name,
            m.width,
            m.height,
            m.score,
            m.scale
        );
        Some(ResolvedTarget {
            x,
            y,
            width: m.width,
            height: m.height,
            confidence: Some(m.score),
            point: (x, y),
        })
    }

    fn search(&self, image: &image::RgbImage, template: &Template) -> Option<probe::ProbeMatch> {
        let found = probe::match_multiscale(
            image,
            &template.image,
            template.mask.as_ref(),
            &self.settings.scales,
            self.settings.threshold,
        );
        match found {
            Ok(m) => m,
            Err(e) => {
                log::error!("matching {} failed: {e}", template.name);
                None
            }
        }
    }
}

impl<C: ScreenCapture> PositionResolver for VisionResolver<C> {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Vision
    }

    fn is_configured(&self) -> bool {
        self.templates.player.is_some() && self.templates.banker.is_some()
    }

    fn denominations(&self) -> Vec<u64> {
        self.templates.chips.keys().rev().copied().collect()
    }

    fn resolve_area(&self, side: Side) -> Option<ResolvedTarget> {
        let template = match side {
            Side::Player => self.templates.player.as_ref(),
            Side::Banker => self.templates.banker.as_ref(),
        }?;
        self.locate(template, None)
    }

    fn resolve_chip(&self, amount: u64) -> Option<ResolvedTarget> {
        let template = self.templates.chips.get(&amount)?;
        self.locate(template, Some(self.settings.chip_roi))
    }

    fn resolve_cancel(&self) -> Result<ResolvedTarget, Reason> {
        let template = self.templates.cancel.as_ref().ok_or(Reason::CancelUnavailable)?;
        self.locate(template, None).ok_or(Reason::CancelNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::templates::MaskKind;
    use crate::utils::error::{BetclickError, BetclickResult};
    use image::imageops;
    use image::{DynamicImage, Rgb, RgbImage};
    use rstest::{fixture, rstest};
    use std::cell::Cell;

    fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let mut h = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503) ^ seed.wrapping_mul(97_531);
            h ^= h >> 16;
            h = h.wrapping_mul(0x45d9_f3b);
            h ^= h >> 16;
            Rgb([(h & 0xff) as u8, ((h >> 8) & 0xff) as u8, ((h >> 16) & 0xff) as u8])
        })
    }

    struct StillCapture {
        frame: RgbImage,
        origin: (i32, i32),
        calls: Cell<usize>,
    }

    impl ScreenCapture for StillCapture {
        fn capture(&self) -> BetclickResult<Frame> {
            self.calls.set(self.calls.get() + 1);
            Ok(Frame::new(self.frame.clone(), self.origin))
        }
    }

    struct BrokenCapture;

    impl ScreenCapture for BrokenCapture {
        fn capture(&self) -> BetclickResult<Frame> {
            Err(BetclickError::InvalidFrame(0, 0))
        }
    }

    fn template(name: &str, image: RgbImage) -> Template {
        Template::from_image(name, DynamicImage::ImageRgb8(image), MaskKind::None)
    }

    #[fixture]
    fn table() -> (RgbImage, TemplateSet) {
        let mut frame = noise(160, 120, 50);
        let player = noise(16, 10, 1);
        let banker = noise(16, 10, 2);
        let chip = noise(10, 10, 3);
        let hidden_chip = noise(10, 10, 4);
        imageops::replace(&mut frame, &player, 20, 30);
        imageops::replace(&mut frame, &chip, 40, 100);
        imageops::replace(&mut frame, &chip, 70, 10);

        let mut set = TemplateSet::default();
        set.player = Some(template("player_area", player));
        set.banker = Some(template("banker_area", banker));
        set.chips.insert(25, template("chip_25", chip));
        set.chips.insert(100, template("chip_100", hidden_chip));
        (frame, set)
    }

    fn resolver(frame: RgbImage, set: TemplateSet) -> VisionResolver<StillCapture> {
        let capture = StillCapture {
            frame,
            origin: (1920, 0),
            calls: Cell::new(0),
        };
        VisionResolver::new(capture, set, VisionSettings::default())
    }

    #[rstest]
    fn test_area_clicks_match_origin_in_desktop_space(table: (RgbImage, TemplateSet)) {
        let resolver = resolver(table.0, table.1);
        let area = resolver.resolve_area(Side::Player).unwrap();
        assert_eq!((area.x, area.y), (1940, 30));
        assert_eq!((area.width, area.height), (16, 10));
        assert_eq!(area.point, (1940, 30));
        assert!(area.confidence.unwrap() > 0.99);
        assert!(resolver.resolve_area(Side::Banker).is_none());
        assert_eq!(resolver.capture.calls.get(), 2);
    }

    #[rstest]
    fn test_chip_search_is_limited_to_bottom(table: (RgbImage, TemplateSet)) {
        let resolver = resolver(table.0, table.1);
        let chip = resolver.resolve_chip(25).unwrap();
        assert_eq!((chip.x, chip.y), (1960, 100));
        assert_eq!(chip.point, (1960, 100));
        assert!(resolver.resolve_chip(100).is_none());
        assert!(resolver.resolve_chip(5).is_none());
    }

    #[rstest]
    fn test_configured_and_denominations(table: (RgbImage, TemplateSet)) {
        let (frame, mut set) = table;
        let full = resolver(frame.clone(), set.clone());
        assert!(full.is_configured());
        assert_eq!(full.denominations(), vec![100, 25]);

        set.banker = None;
        assert!(!resolver(frame, set).is_configured());
    }

    #[rstest]
    fn test_cancel_reasons(table: (RgbImage, TemplateSet)) {
        let (frame, mut set) = table;
        let unavailable = resolver(frame.clone(), set.clone());
        assert_eq!(unavailable.resolve_cancel(), Err(Reason::CancelUnavailable));

        set.cancel = Some(template("cancel_button", noise(12, 12, 9)));
        let missing = resolver(frame, set);
        assert_eq!(missing.resolve_cancel(), Err(Reason::CancelNotFound));
    }

    #[rstest]
    fn test_template_threshold_overrides_settings(table: (RgbImage, TemplateSet)) {
        let (frame, mut set) = table;
        set.threshold = Some(0.5);
        assert_eq!(resolver(frame, set).settings.threshold, 0.5);
    }

    #[rstest]
    fn test_capture_failure_is_not_found(table: (RgbImage, TemplateSet)) {
        let resolver = VisionResolver::new(BrokenCapture, table.1, VisionSettings::default());
        assert!(resolver.resolve_area(Side::Player).is_none());
        assert_eq!(resolver.resolve_cancel(), Err(Reason::CancelUnavailable));
    }
}
