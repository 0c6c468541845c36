use std::fmt;

/// Terminal failure of one place or cancel request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reason {
    InvalidSide,
    InvalidAmount,
    NotConfigured,
    BetAreaNotFound,
    WrongTab,
    NotBettingTime,
    NoChipsConfigured,
    CannotComposeAmount,
    ChipNotFound,
    NoChipsFound,
    CancelButtonNotConfigured,
    CancelUnavailable,
    CancelNotFound,
    ClickFailed,
    /// A code this build does not know about, kept verbatim.
    Other(String),
}

const KNOWN: [Reason; 14] = [
    Reason::InvalidSide,
    Reason::InvalidAmount,
    Reason::NotConfigured,
    Reason::BetAreaNotFound,
    Reason::WrongTab,
    Reason::NotBettingTime,
    Reason::NoChipsConfigured,
    Reason::CannotComposeAmount,
    Reason::ChipNotFound,
    Reason::NoChipsFound,
    Reason::CancelButtonNotConfigured,
    Reason::CancelUnavailable,
    Reason::CancelNotFound,
    Reason::ClickFailed,
];

impl Reason {
    pub fn code(&self) -> &str {
        match self {
            Reason::InvalidSide => "invalid_side",
            Reason::InvalidAmount => "invalid_amount",
            Reason::NotConfigured => "not_configured",
            Reason::BetAreaNotFound => "bet_area_not_found",
            Reason::WrongTab => "wrong_tab",
            Reason::NotBettingTime => "not_betting_time",
            Reason::NoChipsConfigured => "no_chips_configured",
            Reason::CannotComposeAmount => "cannot_compose_amount",
            Reason::ChipNotFound => "chip_not_found",
            Reason::NoChipsFound => "no_chips_found",
            Reason::CancelButtonNotConfigured => "cancel_button_not_configured",
            Reason::CancelUnavailable => "cancel_unavailable",
            Reason::CancelNotFound => "cancel_not_found",
            Reason::ClickFailed => "click_failed",
            Reason::Other(code) => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Reason::InvalidSide => "Invalid bet side",
            Reason::InvalidAmount => "Invalid bet amount",
            Reason::NotConfigured => {
                "Macro positions not configured. Please configure positions first."
            }
            Reason::BetAreaNotFound => "Bet area position not found in configuration",
            Reason::WrongTab => {
                "Cannot place bet: You are not on the betting tab. Please navigate to the casino game."
            }
            Reason::NotBettingTime => {
                "Cannot place bet: You are on the right tab but it is not betting time. Please wait for the betting phase."
            }
            Reason::NoChipsConfigured => {
                "No chips are configured. Please configure at least one chip position."
            }
            Reason::CannotComposeAmount => "Cannot compose amount with available chips",
            Reason::ChipNotFound => "Chip position not found in configuration",
            Reason::NoChipsFound => "No chip templates found on screen",
            Reason::CancelButtonNotConfigured => "Cancel button position not configured",
            Reason::CancelUnavailable => "Cancel button not configured",
            Reason::CancelNotFound => "Cancel button not found",
            Reason::ClickFailed => "Pointer actuation failed",
            Reason::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Reason {
        KNOWN
            .iter()
            .find(|r| r.code() == code)
            .cloned()
            .unwrap_or_else(|| Reason::Other(code.to_string()))
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
