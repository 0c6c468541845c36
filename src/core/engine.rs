//! Turns one place or cancel request into a click sequence.
//!
//! A request walks `Validating -> ResolvingArea -> ResolvingChip -> Clicking`
//! and ends in either a [`Placed`]/[`Cancelled`] outcome or a [`Reason`].
//! Nothing here is retried except the cancel re-probe loop.

use std::fmt;
use std::thread;
use std::time::Duration;

use crate::core::actuator::{Actuator, ClickTiming};
use crate::core::composer::{group_picks, Composer};
use crate::core::reason::Reason;
use crate::core::resolver::{PositionResolver, ResolvedTarget, ResolverKind, Side};

/// Pauses between clicks of one sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceTiming {
    pub chip_settle: Duration,
    pub area_settle: Duration,
    pub cancel_settle: Duration,
}

impl SequenceTiming {
    pub fn zero() -> Self {
        SequenceTiming {
            chip_settle: Duration::ZERO,
            area_settle: Duration::ZERO,
            cancel_settle: Duration::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelMode {
    /// One click per chip of the last composition, `fallback` without one.
    Counted { fallback: usize },
    /// Click and re-probe until the button is gone.
    UntilGone { max_attempts: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct EngineSettings {
    pub sequence: SequenceTiming,
    pub click: ClickTiming,
    pub cancel: CancelMode,
    pub composer: Composer,
}

impl EngineSettings {
    pub fn fixed() -> Self {
        EngineSettings {
            sequence: SequenceTiming {
                chip_settle: Duration::from_millis(50),
                area_settle: Duration::from_millis(50),
                cancel_settle: Duration::from_millis(50),
            },
            click: ClickTiming::default(),
            cancel: CancelMode::Counted { fallback: 3 },
            composer: Composer::default(),
        }
    }

    pub fn vision() -> Self {
        EngineSettings {
            sequence: SequenceTiming {
                chip_settle: Duration::from_millis(200),
                area_settle: Duration::from_millis(150),
                cancel_settle: Duration::from_millis(250),
            },
            click: ClickTiming::default(),
            cancel: CancelMode::UntilGone { max_attempts: 20 },
            composer: Composer::default(),
        }
    }

    pub fn for_kind(kind: ResolverKind) -> Self {
        match kind {
            ResolverKind::Fixed => EngineSettings::fixed(),
            ResolverKind::Vision => EngineSettings::vision(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Validating,
    ResolvingArea,
    ResolvingChip,
    Clicking,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Validating => "validating",
            Stage::ResolvingArea => "resolving area",
            Stage::ResolvingChip => "resolving chip",
            Stage::Clicking => "clicking",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placed {
    pub amount: u64,
    pub side: Side,
    pub composition: Vec<u64>,
    pub clicks: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cancelled {
    pub clicks: usize,
}

pub struct BetEngine<R, A> {
    resolver: R,
    actuator: A,
    settings: EngineSettings,
    last_composition: Option<Vec<u64>>,
}

impl<R: PositionResolver, A: Actuator> BetEngine<R, A> {
    pub fn new(resolver: R, actuator: A, settings: EngineSettings) -> Self {
        BetEngine {
            resolver,
            actuator,
            settings,
            last_composition: None,
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn last_composition(&self) -> Option<&[u64]> {
        self.last_composition.as_deref()
    }

    pub fn place_bet(&mut self, amount: i64, side: &str) -> Result<Placed, Reason> {
        log::info!("place bet {amount} on {side}");
        let result = self.run_place(amount, side);
        match &result {
            Ok(placed) => log::info!(
                "bet {} on {} placed with {:?} ({} clicks)",
                placed.amount,
                placed.side,
                placed.composition,
                placed.clicks
            ),
            Err(reason) => log::warn!("bet {amount} on {side} failed: {reason}"),
        }
        result
    }

    fn run_place(&mut self, amount: i64, side: &str) -> Result<Placed, Reason> {
        self.enter(Stage::Validating);
        let side = Side::parse(side).ok_or(Reason::InvalidSide)?;
        let amount = u64::try_from(amount)
            .ok()
            .filter(|&a| a > 0)
            .ok_or(Reason::InvalidAmount)?;

        self.resolver.begin();
        if !self.resolver.is_configured() {
            return Err(Reason::NotConfigured);
        }

        self.enter(Stage::ResolvingArea);
        let area = self.resolve_area(side)?;

        self.enter(Stage::ResolvingChip);
        let denominations = self.resolver.denominations();
        if denominations.is_empty() {
            return Err(Reason::NoChipsConfigured);
        }

        if denominations.contains(&amount) {
            if let Some(chip) = self.resolver.resolve_chip(amount) {
                self.last_composition = Some(vec![amount]);
                self.enter(Stage::Clicking);
                self.click(&chip, "chip")?;
                thread::sleep(self.settings.sequence.chip_settle);
                self.click(&area, "area")?;
                return Ok(Placed {
                    amount,
                    side,
                    composition: vec![amount],
                    clicks: 2,
                });
            }
            log::debug!("exact chip {amount} not resolvable, composing");
        }

        let composition = self
            .settings
            .composer
            .compose(amount, &denominations)
            .ok_or(Reason::CannotComposeAmount)?;
        let groups = group_picks(&composition);
        log::debug!("composition {composition:?} grouped as {groups:?}");
        self.last_composition = Some(composition.clone());

        let mut clicks = 0;
        for (chip_amount, count) in groups {
            self.enter(Stage::ResolvingChip);
            let chip = self
                .resolver
                .resolve_chip(chip_amount)
                .ok_or_else(|| self.resolver.kind().chip_absent())?;

            self.enter(Stage::Clicking);
            self.click(&chip, "chip")?;
            clicks += 1;
            thread::sleep(self.settings.sequence.chip_settle);
            for _ in 0..count {
                self.click(&area, "area")?;
                clicks += 1;
                thread::sleep(self.settings.sequence.area_settle);
            }
        }

        Ok(Placed {
            amount,
            side,
            composition,
            clicks,
        })
    }

    fn resolve_area(&self, side: Side) -> Result<ResolvedTarget, Reason> {
        if let Some(area) = self.resolver.resolve_area(side) {
            return Ok(area);
        }
        match self.resolver.kind() {
            ResolverKind::Fixed => Err(Reason::BetAreaNotFound),
            ResolverKind::Vision => {
                if self.resolver.resolve_area(side.other()).is_some() {
                    Err(Reason::NotBettingTime)
                } else {
                    Err(Reason::WrongTab)
                }
            }
        }
    }

    pub fn cancel_bet(&mut self) -> Result<Cancelled, Reason> {
        log::info!("cancel bet");
        let result = self.run_cancel();
        match &result {
            Ok(done) => log::info!("bet cancelled with {} click(s)", done.clicks),
            Err(reason) => log::warn!("cancel failed: {reason}"),
        }
        result
    }

    fn run_cancel(&mut self) -> Result<Cancelled, Reason> {
        self.resolver.begin();
        self.enter(Stage::ResolvingArea);
        let button = self.resolver.resolve_cancel()?;
        let settle = self.settings.sequence.cancel_settle;

        self.enter(Stage::Clicking);
        match self.settings.cancel {
            CancelMode::Counted { fallback } => {
                let count = match self.last_composition.as_deref() {
                    Some(picks) if !picks.is_empty() => picks.len(),
                    _ => fallback,
                };
                for i in 0..count {
                    self.click(&button, "cancel")?;
                    if i + 1 < count {
                        thread::sleep(settle);
                    }
                }
                Ok(Cancelled { clicks: count })
            }
            CancelMode::UntilGone { max_attempts } => {
                let mut target = button;
                let mut clicks = 0;
                while clicks < max_attempts {
                    self.click(&target, "cancel")?;
                    clicks += 1;
                    thread::sleep(settle);
                    match self.resolver.resolve_cancel() {
                        Ok(next) => target = next,
                        Err(_) => {
                            log::debug!("cancel button gone after {clicks} click(s)");
                            break;
                        }
                    }
                }
                Ok(Cancelled { clicks })
            }
        }
    }

    /// Clicks one chip without touching the bet area.
    pub fn test_chip_click(&mut self, amount: u64) -> Result<ResolvedTarget, Reason> {
        self.resolver.begin();
        let chip = self
            .resolver
            .resolve_chip(amount)
            .ok_or_else(|| self.resolver.kind().chip_absent())?;
        self.click(&chip, "chip")?;
        Ok(chip)
    }

    fn click(&mut self, target: &ResolvedTarget, what: &str) -> Result<(), Reason> {
        log::debug!(
            "click {what} at ({}, {}){}",
            target.point.0,
            target.point.1,
            target
                .confidence
                .map(|c| format!(" confidence {c:.3}"))
                .unwrap_or_default()
        );
        self.actuator
            .click(target.point, &self.settings.click)
            .map_err(|e| {
                log::error!("{what} click failed: {e}");
                Reason::ClickFailed
            })
    }

    fn enter(&self, stage: Stage) {
        log::trace!("bet engine: {stage}");
    }
}
