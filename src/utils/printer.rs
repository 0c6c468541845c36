use std::io::Write;

use crate::core::config::{MacroConfig, Position, BANKER_AREA, CANCEL_BUTTON, PLAYER_AREA};
use crate::core::resolver::ResolvedTarget;

/// Short chip label: `500`, `25K`, `1.25M`.
pub fn format_amount(amount: u64) -> String {
    if amount >= 1_000_000 {
        let millions = format!("{:.2}", amount as f64 / 1_000_000.0);
        let trimmed = millions.trim_end_matches('0').trim_end_matches('.');
        format!("{trimmed}M")
    } else if amount >= 1000 {
        format!("{}K", amount / 1000)
    } else {
        amount.to_string()
    }
}

fn position_line(label: &str, position: Option<&Position>) -> String {
    match position {
        Some(p) if p.is_set() => format!("{label:<14} ({}, {}) {}x{}", p.x, p.y, p.width, p.height),
        Some(_) => format!("{label:<14} not captured"),
        None => format!("{label:<14} missing"),
    }
}

pub fn config_summary(config: &MacroConfig) -> Vec<String> {
    let mut lines: Vec<String> = [PLAYER_AREA, BANKER_AREA, CANCEL_BUTTON]
        .iter()
        .map(|name| position_line(name, config.position(name)))
        .collect();
    for chip in &config.chips {
        lines.push(position_line(&format!("chip {}", format_amount(chip.amount)), Some(&chip.position)));
    }
    lines
}

pub fn print_config(config: &MacroConfig, writer: &mut dyn Write) {
    for line in config_summary(config) {
        let _ = writeln!(writer, "{line}");
    }
    let _ = writer.flush();
}

pub fn target_line(name: &str, target: Option<&ResolvedTarget>) -> String {
    match target {
        Some(t) => match t.confidence {
            Some(score) => format!("{name:<14} at ({}, {}) click {:?} score {score:.3}", t.x, t.y, t.point),
            None => format!("{name:<14} at ({}, {}) click {:?}", t.x, t.y, t.point),
        },
        None => format!("{name:<14} not found"),
    }
}
