use std::sync::Arc;

use super::{PositionResolver, ResolvedTarget, ResolverKind, Side};
use crate::core::config::{ConfigStore, MacroConfig, Position, BANKER_AREA, CANCEL_BUTTON, PLAYER_AREA};
use crate::core::reason::Reason;

/// Looks positions up in the stored configuration.
pub struct FixedResolver {
    store: Arc<ConfigStore>,
    config: Arc<MacroConfig>,
}

impl FixedResolver {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        let config = store.snapshot();
        FixedResolver { store, config }
    }

    fn target(position: &Position) -> Option<ResolvedTarget> {
        position.is_set().then(|| ResolvedTarget {
            x: position.x,
            y: position.y,
            width: position.width,
            height: position.height,
            confidence: None,
            point: (position.x, position.y),
        })
    }
}

impl PositionResolver for FixedResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Fixed
    }

    fn begin(&mut self) {
        self.config = self.store.snapshot();
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn denominations(&self) -> Vec<u64> {
        self.config.denominations()
    }

    fn resolve_area(&self, side: Side) -> Option<ResolvedTarget> {
        let name = match side {
            Side::Player => PLAYER_AREA,
            Side::Banker => BANKER_AREA,
        };
        self.config.position(name).and_then(Self::target)
    }

    fn resolve_chip(&self, amount: u64) -> Option<ResolvedTarget> {
        self.config.chip(amount).and_then(|c| Self::target(&c.position))
    }

    fn resolve_cancel(&self) -> Result<ResolvedTarget, Reason> {
        self.config
            .position(CANCEL_BUTTON)
            .and_then(Self::target)
            .ok_or(Reason::CancelButtonNotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ChipConfig, CONFIG_FILE};
    use crate::utils::file_system::TestFileSystem;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> Arc<ConfigStore> {
        let mut config = MacroConfig::seeded();
        config
            .positions
            .insert(PLAYER_AREA.into(), Position::new(410, 700, 80, 40, PLAYER_AREA));
        config.positions.insert(BANKER_AREA.into(), Position::unset(BANKER_AREA));
        config.chips[0] = ChipConfig {
            amount: 1000,
            position: Position::captured("chip_1000", 90, 950),
        };
        Arc::new(ConfigStore::new(CONFIG_FILE, config))
    }

    #[rstest]
    fn test_resolves_stored_point(store: Arc<ConfigStore>) {
        let resolver = FixedResolver::new(store);
        let area = resolver.resolve_area(Side::Player).unwrap();
        assert_eq!(area.point, (410, 700));
        assert_eq!((area.width, area.height), (80, 40));
        assert_eq!(area.confidence, None);
        assert_eq!(resolver.resolve_chip(1000).unwrap().point, (90, 950));
    }

    #[rstest]
    fn test_unset_or_missing_positions_do_not_resolve(store: Arc<ConfigStore>) {
        let resolver = FixedResolver::new(store);
        assert!(resolver.resolve_area(Side::Banker).is_none());
        assert!(resolver.resolve_chip(25_000).is_none());
        assert!(resolver.resolve_chip(7).is_none());
        assert_eq!(resolver.resolve_cancel(), Err(Reason::CancelButtonNotConfigured));
        assert!(!resolver.is_configured());
        assert_eq!(resolver.denominations().len(), 8);
    }

    #[rstest]
    fn test_begin_picks_up_committed_edits(store: Arc<ConfigStore>) {
        let mut resolver = FixedResolver::new(store.clone());
        let mut edited = (*store.snapshot()).clone();
        edited
            .positions
            .insert(CANCEL_BUTTON.into(), Position::captured(CANCEL_BUTTON, 30, 30));
        store.commit(edited, &mut TestFileSystem::new()).unwrap();

        assert!(resolver.resolve_cancel().is_err());
        resolver.begin();
        assert_eq!(resolver.resolve_cancel().unwrap().point, (30, 30));
    }
}
