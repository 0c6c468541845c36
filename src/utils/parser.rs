use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::{Args, FromArgMatches, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::core::actuator::ClickTiming;
use crate::core::composer::DEFAULT_MAX_STEPS;
use crate::core::config::CONFIG_FILE;
use crate::core::engine::{CancelMode, EngineSettings, SequenceTiming};
use crate::core::resolver::{ResolverKind, VisionSettings};
use crate::core::templates::DEFAULT_MATCH_THRESHOLD;
use crate::remote::ControllerSettings;

#[derive(Parser, Debug, Clone)]
#[clap(
    version = "0.1.0",
    override_usage = "betclick [--mode <MODE>] [monitor ..] [resolver ..] [timing ..] [controller ..] [probe ..]"
)]
/// Places table-game bets on request by clicking chips and bet areas on screen.
/// Positions come either from a saved configuration or from template matching.
struct RawArgs {
    #[command(subcommand)]
    subparser: Option<Subparser>,

    #[arg(short, long, default_value_t = Mode::Serve)]
    pub mode: Mode,

    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

#[derive(Debug, Clone, Subcommand)]
enum Subparser {
    Monitor(ReClap<MonitorArgs, Self>),
    Resolver(ReClap<ResolverArgs, Self>),
    Timing(ReClap<TimingArgs, Self>),
    Controller(ReClap<ControllerArgs, Self>),
    Probe(ReClap<ProbeArgs, Self>),
}

#[derive(Debug, Clone, Parser)]
/// Monitor configuration. Allows to specify the display used for capture
pub struct MonitorArgs {
    #[arg(short, long, default_value = None)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Args)]
/// Position resolution. Fixed positions from a file or live template matching
pub struct ResolverArgs {
    #[arg(short, long, value_enum, default_value_t = Kind::Fixed)]
    pub kind: Kind,

    #[arg(short, long, default_value = CONFIG_FILE)]
    /// Saved positions for the fixed resolver and the configure mode
    pub config: PathBuf,

    #[arg(short, long, default_value = "templates.json")]
    /// Template manifest for the vision resolver
    pub templates: PathBuf,

    #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
    /// Minimum match score
    pub threshold: f32,

    #[arg(long, value_delimiter = ',', default_value = "1.0")]
    /// Template scales tried during matching
    pub scales: Vec<f32>,

    #[arg(long, default_value_t = 0.5)]
    /// Bottom fraction of the screen searched for chips
    pub chip_roi: f32,

    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    /// Search step limit when composing an amount from chips
    pub max_compose_steps: u64,
}

impl ResolverArgs {
    pub fn vision_settings(&self) -> VisionSettings {
        VisionSettings {
            threshold: self.threshold,
            scales: self.scales.clone(),
            chip_roi: self.chip_roi,
        }
    }
}

#[derive(Debug, Clone, Args)]
/// Click timing. Settle delays default to the values of the selected resolver
pub struct TimingArgs {
    #[arg(long, default_value_t = 100)]
    /// Pause after moving the pointer, before pressing
    pub move_delay_ms: u64,

    #[arg(long, default_value_t = 150)]
    /// Pause after every click
    pub post_click_ms: u64,

    #[arg(long)]
    pub chip_settle_ms: Option<u64>,

    #[arg(long)]
    pub area_settle_ms: Option<u64>,

    #[arg(long)]
    pub cancel_settle_ms: Option<u64>,

    #[arg(long, default_value_t = 3)]
    /// Cancel clicks when no previous composition is known (fixed resolver)
    pub cancel_fallback: usize,

    #[arg(long, default_value_t = 20)]
    /// Upper bound on cancel clicks while the button stays visible (vision resolver)
    pub cancel_attempts: usize,

    #[arg(long, default_value_t = false)]
    /// Log clicks instead of moving the pointer
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
/// Controller connection. Login endpoint and websocket command channel
pub struct ControllerArgs {
    #[arg(long, default_value = "http://localhost:3000")]
    pub http: String,

    #[arg(long, default_value = "ws://localhost:8080")]
    pub ws: String,

    #[arg(short, long, default_value = "")]
    pub username: String,

    #[arg(short, long, default_value = "")]
    pub password: String,

    #[arg(long, default_value_t = 3000)]
    /// Delay before reconnecting after the session ends
    pub reconnect_ms: u64,
}

impl ControllerArgs {
    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            http_url: self.http.clone(),
            ws_url: self.ws.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            reconnect_delay: Duration::from_millis(self.reconnect_ms),
        }
    }
}

#[derive(Debug, Clone, Parser)]
/// Test mode options
pub struct ProbeArgs {
    #[arg(long)]
    /// Chip amount to test click
    pub chip: Option<u64>,

    #[arg(long)]
    /// Screenshot to probe instead of a live capture
    pub frame: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum, Default)]
pub enum Kind {
    #[default]
    Fixed,
    Vision,
}

impl From<Kind> for ResolverKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Fixed => ResolverKind::Fixed,
            Kind::Vision => ResolverKind::Vision,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum, Default)]
pub enum Mode {
    #[default]
    Serve,
    Test,
    Configure,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Serve => "serve",
            Mode::Test => "test",
            Mode::Configure => "configure",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub struct BetclickArgs {
    pub verbose: Verbosity<InfoLevel>,
    pub mode: Mode,
    pub monitor: MonitorArgs,
    pub resolver: ResolverArgs,
    pub timing: TimingArgs,
    pub controller: ControllerArgs,
    pub probe: ProbeArgs,
}

impl BetclickArgs {
    /// Resolver defaults with any timing overrides from the command line.
    pub fn engine_settings(&self) -> EngineSettings {
        let kind = ResolverKind::from(self.resolver.kind);
        let mut settings = EngineSettings::for_kind(kind);
        let t = &self.timing;
        settings.sequence = SequenceTiming {
            chip_settle: t.chip_settle_ms.map(Duration::from_millis).unwrap_or(settings.sequence.chip_settle),
            area_settle: t.area_settle_ms.map(Duration::from_millis).unwrap_or(settings.sequence.area_settle),
            cancel_settle: t
                .cancel_settle_ms
                .map(Duration::from_millis)
                .unwrap_or(settings.sequence.cancel_settle),
        };
        settings.click = ClickTiming {
            move_delay: Duration::from_millis(t.move_delay_ms),
            post_click: Duration::from_millis(t.post_click_ms),
        };
        settings.cancel = match kind {
            ResolverKind::Fixed => CancelMode::Counted {
                fallback: t.cancel_fallback,
            },
            ResolverKind::Vision => CancelMode::UntilGone {
                max_attempts: t.cancel_attempts,
            },
        };
        settings.composer.max_steps = self.resolver.max_compose_steps;
        settings
    }
}

pub fn parse_args_from<I: IntoIterator<Item = T>, T: Into<String>>(iterator: I) -> BetclickArgs {
    let mut updated: Vec<String> = iterator.into_iter().map(Into::into).collect();

    for subparser in ["monitor", "resolver", "timing", "controller", "probe"] {
        if !updated.contains(&subparser.to_string()) {
            updated.push(subparser.to_string());
        }
    }

    let args = RawArgs::parse_from(updated);

    let mut monitor: Option<MonitorArgs> = None;
    let mut resolver: Option<ResolverArgs> = None;
    let mut timing: Option<TimingArgs> = None;
    let mut controller: Option<ControllerArgs> = None;
    let mut probe: Option<ProbeArgs> = None;

    let mut next = args.subparser;
    while let Some(sub) = next {
        next = match sub {
            Subparser::Monitor(rec) => {
                monitor = Some(rec.inner);
                (rec.next).map(|d| *d)
            }
            Subparser::Resolver(rec) => {
                resolver = Some(rec.inner);
                (rec.next).map(|d| *d)
            }
            Subparser::Timing(rec) => {
                timing = Some(rec.inner);
                (rec.next).map(|d| *d)
            }
            Subparser::Controller(rec) => {
                controller = Some(rec.inner);
                (rec.next).map(|d| *d)
            }
            Subparser::Probe(rec) => {
                probe = Some(rec.inner);
                (rec.next).map(|d| *d)
            }
        }
    }

    BetclickArgs {
        monitor: monitor.expect("Monitor hasn't been extracted"),
        resolver: resolver.expect("Resolver hasn't been extracted"),
        timing: timing.expect("Timing hasn't been extracted"),
        controller: controller.expect("Controller hasn't been extracted"),
        probe: probe.expect("Probe hasn't been extracted"),
        verbose: args.verbose,
        mode: args.mode,
    }
}

// Implementation for many subcommands for clap
// https://github.com/clap-rs/clap/issues/2222#issuecomment-2524152894

#[allow(dead_code)]
#[derive(Debug, Clone)]
struct ReClap<T, U>
where
    T: Args,
    U: Subcommand,
{
    pub inner: T,
    pub next: Option<Box<U>>,
}

impl<T, U> Args for ReClap<T, U>
where
    T: Args,
    U: Subcommand,
{
    fn augment_args(cmd: clap::Command) -> clap::Command {
        T::augment_args(cmd).defer(|cmd| U::augment_subcommands(cmd.disable_help_subcommand(true)))
    }
    fn augment_args_for_update(_cmd: clap::Command) -> clap::Command {
        unimplemented!()
    }
}

impl<T, U> FromArgMatches for ReClap<T, U>
where
    T: Args,
    U: Subcommand,
{
    fn from_arg_matches(matches: &clap::ArgMatches) -> Result<Self, clap::Error> {
        let inner = T::from_arg_matches(matches)?;
        let next = if let Some((_name, _sub)) = matches.subcommand() {
            Some(U::from_arg_matches(matches)?)
        } else {
            None
        };
        Ok(Self {
            inner,
            next: next.map(Box::new),
        })
    }
    fn update_from_arg_matches(&mut self, _matches: &clap::ArgMatches) -> Result<(), clap::Error> {
        unimplemented!()
    }
}
