use crate::utils::error::{BetclickError, BetclickResult};
#[cfg(feature = "desktop")]
pub use xcap::Monitor;

/// Desktop-space rectangle occupied by one display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayBounds {
    pub fn contains(&self, px: i32, py: i32) -> bool {
        let (px, py) = (i64::from(px), i64::from(py));
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        px >= x && px < x + i64::from(self.width) && py >= y && py < y + i64::from(self.height)
    }
}

pub trait MonitorLike {
    fn name(&self) -> BetclickResult<String>;
    fn is_primary(&self) -> BetclickResult<bool>;
    fn bounds(&self) -> BetclickResult<DisplayBounds>;
}

#[cfg(feature = "desktop")]
impl MonitorLike for Monitor {
    fn name(&self) -> BetclickResult<String> {
        Ok(self.name()?)
    }

    fn is_primary(&self) -> BetclickResult<bool> {
        Ok(self.is_primary()?)
    }

    fn bounds(&self) -> BetclickResult<DisplayBounds> {
        Ok(DisplayBounds {
            x: self.x()?,
            y: self.y()?,
            width: self.width()?,
            height: self.height()?,
        })
    }
}

/// Selects a monitor by its name. If no name is provided, selects the primary monitor.
/// To see available monitor names, run `xrandr`.
#[cfg(feature = "desktop")]
pub fn select_monitor(name: Option<String>) -> BetclickResult<Monitor> {
    select_monitor_from_iterable(name, Monitor::all()?)
}

pub fn select_monitor_from_iterable<M: MonitorLike>(
    name: Option<String>,
    monitors: Vec<M>,
) -> BetclickResult<M> {
    match name {
        Some(n) => {
            if let Some(m) = monitors
                .into_iter()
                .find(|m| m.name().unwrap_or_default() == n)
            {
                log::info!("used monitor with name: {}", n);
                return Ok(m);
            }
        }
        None => {
            if let Some(m) = monitors
                .into_iter()
                .find(|m| m.is_primary().unwrap_or(false))
            {
                log::warn!("selected primary monitor by default");
                return Ok(m);
            }
        }
    }

    Err(BetclickError::MonitorNotFound)
}

/// Finds the display whose bounds contain the point, falling back to the
/// primary display and then to the first one.
pub fn display_for_point<M: MonitorLike>(monitors: &[M], x: i32, y: i32) -> Option<&M> {
    monitors
        .iter()
        .find(|m| m.bounds().map(|b| b.contains(x, y)).unwrap_or(false))
        .or_else(|| {
            log::debug!("no display contains ({x}, {y}), using the primary one");
            monitors.iter().find(|m| m.is_primary().unwrap_or(false))
        })
        .or_else(|| monitors.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    struct MockMonitor {
        name: String,
        is_primary: bool,
        bounds: DisplayBounds,
    }

    impl MonitorLike for MockMonitor {
        fn name(&self) -> BetclickResult<String> {
            Ok(self.name.clone())
        }

        fn is_primary(&self) -> BetclickResult<bool> {
            Ok(self.is_primary)
        }

        fn bounds(&self) -> BetclickResult<DisplayBounds> {
            Ok(self.bounds)
        }
    }

    fn mock(name: &str, is_primary: bool, x: i32, y: i32) -> MockMonitor {
        MockMonitor {
            name: name.to_string(),
            is_primary,
            bounds: DisplayBounds {
                x,
                y,
                width: 1920,
                height: 1080,
            },
        }
    }

    #[fixture]
    fn monitors() -> Vec<MockMonitor> {
        vec![
            mock("Left", false, -1920, 0),
            mock("Right", false, 1920, 0),
            mock("Center", true, 0, 0),
        ]
    }

    #[rstest]
    fn test_select_monitor_by_name(monitors: Vec<MockMonitor>) {
        let selected_monitor =
            select_monitor_from_iterable(Some("Right".to_string()), monitors).unwrap();
        assert_eq!(selected_monitor.name().unwrap(), "Right");
    }

    #[rstest]
    fn test_select_primary_monitor(monitors: Vec<MockMonitor>) {
        let selected_monitor = select_monitor_from_iterable(None, monitors).unwrap();
        assert_eq!(selected_monitor.name().unwrap(), "Center");
    }

    #[rstest]
    fn test_select_nonexisting_monitor(monitors: Vec<MockMonitor>) {
        let selected_monitor = select_monitor_from_iterable(Some("xxx".to_string()), monitors);

        assert!(matches!(
            selected_monitor.err(),
            Some(BetclickError::MonitorNotFound)
        ));
    }

    #[rstest]
    #[case(-100, 500, "Left")]
    #[case(0, 0, "Center")]
    #[case(1919, 1079, "Center")]
    #[case(1920, 10, "Right")]
    #[case(5000, 5000, "Center")]
    fn test_display_for_point(
        monitors: Vec<MockMonitor>,
        #[case] x: i32,
        #[case] y: i32,
        #[case] expected: &str,
    ) {
        let display = display_for_point(&monitors, x, y).unwrap();
        assert_eq!(display.name, expected);
    }

    #[test]
    fn test_display_for_point_without_primary_uses_first() {
        let monitors = vec![mock("A", false, 0, 0), mock("B", false, 1920, 0)];
        assert_eq!(display_for_point(&monitors, -5, -5).unwrap().name, "A");
        assert!(display_for_point::<MockMonitor>(&[], 0, 0).is_none());
    }
}
