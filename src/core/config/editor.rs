use std::sync::mpsc::Receiver;

use super::{chip_name, ChipConfig, ConfigStore, MacroConfig, Position};
use super::{BANKER_AREA, CANCEL_BUTTON, PLAYER_AREA};
use crate::utils::error::{BetclickError, BetclickResult};
use crate::utils::file_system::FileSystem;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditTarget {
    PlayerArea,
    BankerArea,
    CancelButton,
    Chip(u64),
}

impl EditTarget {
    pub fn name(&self) -> String {
        match self {
            EditTarget::PlayerArea => PLAYER_AREA.to_string(),
            EditTarget::BankerArea => BANKER_AREA.to_string(),
            EditTarget::CancelButton => CANCEL_BUTTON.to_string(),
            EditTarget::Chip(amount) => chip_name(*amount),
        }
    }
}

/// Messages emitted by whatever front end collects positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorEvent {
    PositionCaptured { target: EditTarget, x: i32, y: i32 },
    ChipAdded(u64),
    ChipAmountChanged { from: u64, to: u64 },
    ChipRemoved(u64),
    Save,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    Saved,
    Cancelled,
}

/// Draft copy of the configuration taken when editing starts.
pub struct EditSession<'a> {
    store: &'a ConfigStore,
    draft: MacroConfig,
}

impl<'a> EditSession<'a> {
    pub fn begin(store: &'a ConfigStore) -> Self {
        EditSession {
            store,
            draft: (*store.snapshot()).clone(),
        }
    }

    pub fn draft(&self) -> &MacroConfig {
        &self.draft
    }

    pub fn apply(&mut self, event: &EditorEvent) -> BetclickResult<()> {
        match event {
            EditorEvent::PositionCaptured { target, x, y } => {
                let name = target.name();
                let position = Position::captured(&name, *x, *y);
                log::info!("{name} set to ({x}, {y})");
                match target {
                    EditTarget::Chip(amount) => match self.draft.chips.iter_mut().find(|c| c.amount == *amount) {
                        Some(chip) => chip.position = position,
                        None => self.draft.chips.push(ChipConfig {
                            amount: *amount,
                            position,
                        }),
                    },
                    _ => {
                        self.draft.positions.insert(name, position);
                    }
                }
            }
            EditorEvent::ChipAdded(amount) => {
                validate_amount(*amount)?;
                if self.draft.chip(*amount).is_some() {
                    return Err(BetclickError::InvalidEdit(format!("chip {amount} already exists")));
                }
                self.draft.chips.push(ChipConfig::unset(*amount));
            }
            EditorEvent::ChipAmountChanged { from, to } => {
                validate_amount(*to)?;
                if from != to && self.draft.chip(*to).is_some() {
                    return Err(BetclickError::InvalidEdit(format!("chip {to} already exists")));
                }
                let chip = self
                    .draft
                    .chips
                    .iter_mut()
                    .find(|c| c.amount == *from)
                    .ok_or_else(|| BetclickError::InvalidEdit(format!("no chip {from}")))?;
                chip.amount = *to;
                chip.position.name = chip_name(*to);
            }
            EditorEvent::ChipRemoved(amount) => {
                let before = self.draft.chips.len();
                self.draft.chips.retain(|c| c.amount != *amount);
                if self.draft.chips.len() == before {
                    return Err(BetclickError::InvalidEdit(format!("no chip {amount}")));
                }
            }
            EditorEvent::Save | EditorEvent::Cancel => {}
        }
        Ok(())
    }

    pub fn commit(self, fs: &mut dyn FileSystem) -> BetclickResult<()> {
        self.store.commit(self.draft, fs)
    }

    pub fn cancel(self) {
        log::info!("configuration edit discarded");
    }
}

fn validate_amount(amount: u64) -> BetclickResult<()> {
    if amount == 0 {
        return Err(BetclickError::InvalidEdit("chip amount must be positive".to_string()));
    }
    Ok(())
}

/// Applies events until the editor saves, cancels or hangs up.
pub fn drain_editor_events(
    mut session: EditSession<'_>,
    events: &Receiver<EditorEvent>,
    fs: &mut dyn FileSystem,
) -> BetclickResult<EditOutcome> {
    while let Ok(event) = events.recv() {
        match event {
            EditorEvent::Save => {
                session.commit(fs)?;
                return Ok(EditOutcome::Saved);
            }
            EditorEvent::Cancel => break,
            other => {
                if let Err(e) = session.apply(&other) {
                    log::warn!("{e}");
                }
            }
        }
    }
    session.cancel();
    Ok(EditOutcome::Cancelled)
}

/// Reads one terminal command. Capture commands record the pointer location.
pub fn parse_command<P>(line: &str, pointer: P) -> BetclickResult<EditorEvent>
where
    P: FnOnce() -> BetclickResult<(i32, i32)>,
{
    let words: Vec<&str> = line.split_whitespace().collect();
    let amount = |word: Option<&&str>| -> BetclickResult<u64> {
        word.and_then(|w| w.parse::<u64>().ok())
            .ok_or_else(|| BetclickError::InvalidEdit(format!("expected a chip amount in `{line}`")))
    };
    let captured = |target: EditTarget, pointer: P| -> BetclickResult<EditorEvent> {
        let (x, y) = pointer()?;
        Ok(EditorEvent::PositionCaptured { target, x, y })
    };

    match words.first().copied() {
        Some("player") => captured(EditTarget::PlayerArea, pointer),
        Some("banker") => captured(EditTarget::BankerArea, pointer),
        Some("cancel") => captured(EditTarget::CancelButton, pointer),
        Some("chip") => captured(EditTarget::Chip(amount(words.get(1))?), pointer),
        Some("add") => Ok(EditorEvent::ChipAdded(amount(words.get(1))?)),
        Some("remove") => Ok(EditorEvent::ChipRemoved(amount(words.get(1))?)),
        Some("amount") => Ok(EditorEvent::ChipAmountChanged {
            from: amount(words.get(1))?,
            to: amount(words.get(2))?,
        }),
        Some("save") => Ok(EditorEvent::Save),
        Some("quit") => Ok(EditorEvent::Cancel),
        _ => Err(BetclickError::InvalidEdit(format!("unknown command `{}`", line.trim()))),
    }
}
