use crate::utils::error::BetclickResult;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickTiming {
    /// Time spent travelling to the target before pressing.
    pub move_delay: Duration,
    /// Pause after the click so the table UI can react.
    pub post_click: Duration,
}

impl Default for ClickTiming {
    fn default() -> Self {
        ClickTiming {
            move_delay: Duration::from_millis(100),
            post_click: Duration::from_millis(150),
        }
    }
}

impl ClickTiming {
    pub fn zero() -> Self {
        ClickTiming {
            move_delay: Duration::ZERO,
            post_click: Duration::ZERO,
        }
    }
}

pub trait Actuator {
    /// Moves to the desktop point, clicks the left button and waits.
    fn click(&mut self, point: (i32, i32), timing: &ClickTiming) -> BetclickResult<()>;
}

/// Logs clicks instead of performing them.
#[derive(Default)]
pub struct DryRunActuator {
    pub clicks: usize,
}

impl Actuator for DryRunActuator {
    fn click(&mut self, point: (i32, i32), timing: &ClickTiming) -> BetclickResult<()> {
        self.clicks += 1;
        log::info!("[dry run] click #{} at ({}, {})", self.clicks, point.0, point.1);
        std::thread::sleep(timing.move_delay + timing.post_click);
        Ok(())
    }
}

#[cfg(feature = "desktop")]
pub use self::desktop::PointerActuator;

#[cfg(feature = "desktop")]
mod desktop {
    use super::{Actuator, ClickTiming};
    use crate::utils::error::BetclickResult;
    use crate::utils::monitor::{self, Monitor};
    use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
    use std::thread;
    use std::time::Duration;

    const MOVE_STEP: Duration = Duration::from_millis(10);

    /// Drives the real OS pointer.
    pub struct PointerActuator {
        enigo: Enigo,
        monitors: Vec<Monitor>,
    }

    impl PointerActuator {
        pub fn new() -> BetclickResult<Self> {
            let enigo = Enigo::new(&Settings::default())?;
            let monitors = Monitor::all()?;
            log::debug!("pointer actuator ready, {} display(s)", monitors.len());
            Ok(PointerActuator { enigo, monitors })
        }

        pub fn location(&self) -> BetclickResult<(i32, i32)> {
            Ok(self.enigo.location()?)
        }

        fn travel(&mut self, to: (i32, i32), duration: Duration) -> BetclickResult<()> {
            let steps = (duration.as_millis() / MOVE_STEP.as_millis()).max(1) as i32;
            let from = self.enigo.location().unwrap_or(to);
            for i in 1..=steps {
                let x = from.0 + (to.0 - from.0) * i / steps;
                let y = from.1 + (to.1 - from.1) * i / steps;
                self.enigo.move_mouse(x, y, Coordinate::Abs)?;
                if i < steps {
                    thread::sleep(duration / steps as u32);
                }
            }
            Ok(())
        }
    }

    impl Actuator for PointerActuator {
        fn click(&mut self, point: (i32, i32), timing: &ClickTiming) -> BetclickResult<()> {
            if let Some(display) = monitor::display_for_point(&self.monitors, point.0, point.1) {
                log::trace!(
                    "click at ({}, {}) on display {}",
                    point.0,
                    point.1,
                    display.name().unwrap_or_default()
                );
            }
            if timing.move_delay.is_zero() {
                self.enigo.move_mouse(point.0, point.1, Coordinate::Abs)?;
            } else {
                self.travel(point, timing.move_delay)?;
            }
            self.enigo.button(Button::Left, Direction::Click)?;
            thread::sleep(timing.post_click);
            Ok(())
        }
    }
}
