//! Exact-sum chip decomposition.
//!
//! Every value from 1 up to the target gets extended from the first
//! denomination, tried largest first, whose remainder is already reachable.
//! The result is a valid decomposition, not necessarily the shortest one.

/// Upper bound on the table size walked for one target.
pub const DEFAULT_MAX_STEPS: u64 = 10_000_000;

#[derive(Clone, Copy, Debug)]
pub struct Composer {
    pub max_steps: u64,
}

impl Default for Composer {
    fn default() -> Self {
        Composer {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl Composer {
    pub fn new(max_steps: u64) -> Self {
        Composer { max_steps }
    }

    /// Picks chips summing exactly to `target`, or `None` when no combination
    /// (with repetition) reaches it or the search would exceed `max_steps`.
    pub fn compose(&self, target: u64, denominations: &[u64]) -> Option<Vec<u64>> {
        if target == 0 {
            return Some(Vec::new());
        }

        let mut chips: Vec<u64> = denominations.iter().copied().filter(|&d| d > 0).collect();
        chips.sort_unstable_by(|a, b| b.cmp(a));
        chips.dedup();
        if chips.is_empty() || chips.len() >= usize::from(u16::MAX) {
            return None;
        }

        // Values off the gcd lattice are never reachable, and the reduced table
        // yields the same choices.
        let step = chips.iter().copied().fold(0, gcd);
        if target % step != 0 {
            return None;
        }
        let reduced_target = target / step;
        if reduced_target > self.max_steps {
            log::warn!(
                "amount {target} needs {reduced_target} composition steps, limit is {}",
                self.max_steps
            );
            return None;
        }
        let reduced: Vec<u64> = chips.iter().map(|c| c / step).collect();

        let len = usize::try_from(reduced_target).ok()?;
        // choice[v] = index + 1 of the chip that completes v, 0 when unreachable.
        let mut choice = vec![0u16; len + 1];
        for value in 1..=len {
            for (i, &chip) in reduced.iter().enumerate() {
                let Ok(chip) = usize::try_from(chip) else {
                    continue;
                };
                if chip > value {
                    continue;
                }
                let rest = value - chip;
                if rest == 0 || choice[rest] != 0 {
                    choice[value] = (i + 1) as u16;
                    break;
                }
            }
        }

        if choice[len] == 0 {
            return None;
        }

        let mut picks = Vec::new();
        let mut value = len;
        while value > 0 {
            let index = usize::from(choice[value] - 1);
            picks.push(chips[index]);
            value -= reduced[index] as usize;
        }
        picks.reverse();
        Some(picks)
    }
}

/// Composition with the default step bound.
pub fn compose(target: u64, denominations: &[u64]) -> Option<Vec<u64>> {
    Composer::default().compose(target, denominations)
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Collapses a composition into (denomination, count) pairs in order of first
/// appearance.
pub fn group_picks(picks: &[u64]) -> Vec<(u64, usize)> {
    let mut groups: Vec<(u64, usize)> = Vec::new();
    for &pick in picks {
        match groups.iter_mut().find(|(amount, _)| *amount == pick) {
            Some((_, count)) => *count += 1,
            None => groups.push((pick, 1)),
        }
    }
    groups
}
