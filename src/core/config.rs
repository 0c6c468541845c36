//! Position map shared by the fixed resolver and the configuration editor.
//! The editor works on a snapshot and swaps it in only after the file is saved.

pub mod editor;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::utils::error::BetclickResult;
use crate::utils::file_system::FileSystem;

pub const CONFIG_FILE: &str = "macro_config.json";

pub const PLAYER_AREA: &str = "player_area";
pub const BANKER_AREA: &str = "banker_area";
pub const CANCEL_BUTTON: &str = "cancel_button";

/// Chip rack offered before anything has been configured.
pub const PREDEFINED_CHIPS: [u64; 8] = [
    1_000, 25_000, 125_000, 500_000, 1_250_000, 2_500_000, 5_000_000, 50_000_000,
];

pub const DEFAULT_SIZE: u32 = 50;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_size")]
    pub width: u32,
    #[serde(default = "default_size")]
    pub height: u32,
    #[serde(default)]
    pub name: String,
}

fn default_size() -> u32 {
    DEFAULT_SIZE
}

impl Position {
    pub fn new(x: i32, y: i32, width: u32, height: u32, name: &str) -> Self {
        Position {
            x,
            y,
            width,
            height,
            name: name.to_string(),
        }
    }

    /// Placeholder for a target nobody has pointed at yet.
    pub fn unset(name: &str) -> Self {
        Position::new(0, 0, DEFAULT_SIZE, DEFAULT_SIZE, name)
    }

    /// Position recorded from a pointer location.
    pub fn captured(name: &str, x: i32, y: i32) -> Self {
        Position::new(x, y, DEFAULT_SIZE, DEFAULT_SIZE, name)
    }

    // Points at or left of / above the desktop origin read as unset, which
    // also hides targets on displays placed at negative offsets.
    pub fn is_set(&self) -> bool {
        self.x > 0 && self.y > 0
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChipConfig {
    pub amount: u64,
    pub position: Position,
}

impl ChipConfig {
    pub fn unset(amount: u64) -> Self {
        ChipConfig {
            amount,
            position: Position::unset(&chip_name(amount)),
        }
    }
}

pub fn chip_name(amount: u64) -> String {
    format!("chip_{amount}")
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MacroConfig {
    #[serde(default)]
    pub positions: BTreeMap<String, Position>,
    #[serde(default)]
    pub chips: Vec<ChipConfig>,
}

impl MacroConfig {
    /// Empty position map with the predefined chip rack.
    pub fn seeded() -> Self {
        MacroConfig {
            positions: BTreeMap::new(),
            chips: PREDEFINED_CHIPS.iter().map(|&a| ChipConfig::unset(a)).collect(),
        }
    }

    pub fn position(&self, name: &str) -> Option<&Position> {
        self.positions.get(name)
    }

    pub fn chip(&self, amount: u64) -> Option<&ChipConfig> {
        self.chips.iter().find(|c| c.amount == amount)
    }

    /// Configured chip amounts, largest first.
    pub fn denominations(&self) -> Vec<u64> {
        let mut amounts: Vec<u64> = self.chips.iter().map(|c| c.amount).collect();
        amounts.sort_unstable_by(|a, b| b.cmp(a));
        amounts
    }

    pub fn is_configured(&self) -> bool {
        [PLAYER_AREA, BANKER_AREA, CANCEL_BUTTON]
            .iter()
            .all(|name| self.positions.contains_key(*name))
    }

    /// Keeps the first entry for every chip amount.
    fn dedupe_chips(&mut self) {
        let mut seen = HashSet::new();
        self.chips.retain(|chip| {
            let fresh = seen.insert(chip.amount);
            if !fresh {
                log::warn!("duplicate chip {} in configuration, keeping the first", chip.amount);
            }
            fresh
        });
    }
}

/// Reads the configuration file. `Ok(None)` means there is no file yet.
pub fn load_config(path: &Path, fs: &dyn FileSystem) -> BetclickResult<Option<MacroConfig>> {
    if !fs.exists(path) {
        return Ok(None);
    }
    let data = fs.read_to_string(path)?;
    let mut config: MacroConfig = serde_json::from_str(&data)?;
    config.dedupe_chips();
    Ok(Some(config))
}

/// Writes the whole file next to the target and renames it into place.
pub fn save_config(config: &MacroConfig, path: &Path, fs: &mut dyn FileSystem) -> BetclickResult<()> {
    let data = serde_json::to_string_pretty(config)?;
    let tmp = temp_path(path);
    {
        let mut file = fs.open(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.flush()?;
    }
    fs.rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Current configuration, readable from any thread.
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<MacroConfig>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: MacroConfig) -> Self {
        ConfigStore {
            path: path.into(),
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Loads the file, seeding the predefined chip rack when there is none.
    /// A broken file is left untouched and the seeded rack is used in memory.
    pub fn open(path: impl Into<PathBuf>, fs: &mut dyn FileSystem) -> Self {
        let path = path.into();
        let config = match load_config(&path, fs) {
            Ok(Some(config)) => {
                log::info!(
                    "loaded {} position(s) and {} chip(s) from {}",
                    config.positions.len(),
                    config.chips.len(),
                    path.display()
                );
                config
            }
            Ok(None) => {
                let config = MacroConfig::seeded();
                match save_config(&config, &path, fs) {
                    Ok(()) => log::info!("created {} with the default chip rack", path.display()),
                    Err(e) => log::error!("could not create {}: {e}", path.display()),
                }
                config
            }
            Err(e) => {
                log::error!("could not read {}: {e}; using the default chip rack", path.display());
                MacroConfig::seeded()
            }
        };
        ConfigStore::new(path, config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Arc<MacroConfig> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Persists `config` and only then makes it visible to readers.
    pub fn commit(&self, config: MacroConfig, fs: &mut dyn FileSystem) -> BetclickResult<()> {
        save_config(&config, &self.path, fs)?;
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(config);
        log::info!("configuration saved to {}", self.path.display());
        Ok(())
    }
}
