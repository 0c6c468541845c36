use image::{DynamicImage, GrayImage, RgbImage};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::probe::{self, WHITE_THRESHOLD};
use crate::utils::error::BetclickResult;

pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.8;

/// Template image with its background mask, prepared once at load.
#[derive(Clone, Debug)]
pub struct Template {
    pub name: String,
    pub image: RgbImage,
    pub mask: Option<GrayImage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskKind {
    /// Alpha channel when the file has one, near-white exclusion otherwise.
    Area,
    /// Near-white exclusion, combined with alpha.
    Chip,
    None,
}

impl Template {
    pub fn from_image(name: &str, image: DynamicImage, kind: MaskKind) -> Self {
        let rgba = image.to_rgba8();
        let mask = match kind {
            MaskKind::Area => probe::alpha_mask(&rgba).or_else(|| Some(probe::nonwhite_mask(&rgba, WHITE_THRESHOLD))),
            MaskKind::Chip => Some(probe::nonwhite_mask(&rgba, WHITE_THRESHOLD)),
            MaskKind::None => None,
        };
        Template {
            name: name.to_string(),
            image: DynamicImage::ImageRgba8(rgba).to_rgb8(),
            mask,
        }
    }

    /// Loads a template file; failures are logged and yield `None`.
    pub fn load(name: &str, path: &Path, kind: MaskKind) -> Option<Self> {
        match image::open(path) {
            Ok(image) => {
                let template = Template::from_image(name, image, kind);
                log::debug!("loaded template {name} {:?} from {}", template.image.dimensions(), path.display());
                Some(template)
            }
            Err(e) => {
                log::warn!("template {name} unavailable ({}): {e}", path.display());
                None
            }
        }
    }
}

/// `templates.json` layout.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct TemplateManifest {
    pub player_area: Option<PathBuf>,
    pub banker_area: Option<PathBuf>,
    pub cancel_button: Option<PathBuf>,
    #[serde(default)]
    pub chips: BTreeMap<u64, PathBuf>,
    pub match_threshold: Option<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct TemplateSet {
    pub player: Option<Template>,
    pub banker: Option<Template>,
    pub cancel: Option<Template>,
    pub chips: BTreeMap<u64, Template>,
    pub threshold: Option<f32>,
}

impl TemplateSet {
    pub fn from_manifest(manifest: &TemplateManifest, base: &Path) -> Self {
        let resolve = |p: &PathBuf| if p.is_absolute() { p.clone() } else { base.join(p) };
        let load = |name: &str, path: &Option<PathBuf>, kind| match path {
            Some(p) => Template::load(name, &resolve(p), kind),
            None => {
                log::warn!("no template configured for {name}");
                None
            }
        };

        let chips = manifest
            .chips
            .iter()
            .filter_map(|(&amount, path)| {
                Template::load(&format!("chip_{amount}"), &resolve(path), MaskKind::Chip).map(|t| (amount, t))
            })
            .collect();

        TemplateSet {
            player: load("player_area", &manifest.player_area, MaskKind::Area),
            banker: load("banker_area", &manifest.banker_area, MaskKind::Area),
            cancel: load("cancel_button", &manifest.cancel_button, MaskKind::None),
            chips,
            threshold: manifest.match_threshold,
        }
    }

    /// Reads the manifest and every template it names.
    pub fn load(manifest_path: &Path) -> BetclickResult<Self> {
        let data = std::fs::read_to_string(manifest_path)?;
        let manifest: TemplateManifest = serde_json::from_str(&data)?;
        let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        let set = TemplateSet::from_manifest(&manifest, base);
        log::info!(
            "templates: player {}, banker {}, cancel {}, {} chip(s)",
            set.player.is_some(),
            set.banker.is_some(),
            set.cancel.is_some(),
            set.chips.len()
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn chip_image() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(12, 12, Rgba([255, 255, 255, 255]));
        for y in 2..10 {
            for x in 2..10 {
                img.put_pixel(x, y, Rgba([200, 20, 20, 255]));
            }
        }
        img
    }

    #[test]
    fn test_area_mask_prefers_alpha() {
        let mut img = chip_image();
        img.put_pixel(0, 0, Rgba([255, 255, 255, 0]));
        let template = Template::from_image("player_area", DynamicImage::ImageRgba8(img), MaskKind::Area);
        let mask = template.mask.unwrap();
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(1, 1).0[0], 255);
    }

    #[test]
    fn test_opaque_area_uses_nonwhite_mask() {
        let template = Template::from_image("player_area", DynamicImage::ImageRgba8(chip_image()), MaskKind::Area);
        let mask = template.mask.unwrap();
        assert_eq!(mask.get_pixel(1, 1).0[0], 0);
        assert_eq!(mask.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn test_cancel_is_unmasked() {
        let template = Template::from_image("cancel_button", DynamicImage::ImageRgba8(chip_image()), MaskKind::None);
        assert!(template.mask.is_none());
        assert_eq!(template.image.dimensions(), (12, 12));
    }

    #[test]
    fn test_manifest_missing_files_are_soft() {
        let dir = tempfile::tempdir().unwrap();
        chip_image().save(dir.path().join("player.png")).unwrap();
        chip_image().save(dir.path().join("chip_25.png")).unwrap();
        let manifest = r#"{
            "player_area": "player.png",
            "banker_area": "missing.png",
            "chips": {"25": "chip_25.png", "100": "missing.png"},
            "match_threshold": 0.85
        }"#;
        let path = dir.path().join("templates.json");
        std::fs::write(&path, manifest).unwrap();

        let set = TemplateSet::load(&path).unwrap();
        assert!(set.player.is_some());
        assert!(set.banker.is_none());
        assert!(set.cancel.is_none());
        assert_eq!(set.chips.keys().copied().collect::<Vec<_>>(), vec![25]);
        assert_eq!(set.threshold, Some(0.85));
    }

    #[test]
    fn test_missing_manifest_is_error() {
        assert!(TemplateSet::load(Path::new("/nonexistent/templates.json")).is_err());
    }
}
