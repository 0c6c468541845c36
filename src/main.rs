use std::io::{self, BufRead};
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread;

use betclick::core::actuator::{DryRunActuator, PointerActuator};
use betclick::core::capture::{FileCapture, Frame, MonitorCapture, ScreenCapture};
use betclick::core::config::editor::{self, EditOutcome, EditSession, EditorEvent};
use betclick::core::config::ConfigStore;
use betclick::core::engine::BetEngine;
use betclick::core::resolver::{FixedResolver, PositionResolver, Side, VisionResolver};
use betclick::core::templates::TemplateSet;
use betclick::remote::{self, EngineWorker};
use betclick::utils::error::BetclickResult;
use betclick::utils::file_system::RealFileSystem;
use betclick::utils::parser::{self, BetclickArgs, Kind, Mode};
use betclick::utils::{logger, printer};

fn main() -> BetclickResult<()> {
    let env_args: Vec<String> = std::env::args().collect();
    let args = parser::parse_args_from(env_args);

    if let Err(e) = logger::init_stdout(args.verbose.log_level_filter()) {
        eprintln!("logger already initialised: {e}");
    }
    log::debug!("starting in {} mode", args.mode);

    match args.mode {
        Mode::Serve => serve(args),
        Mode::Test => test_mode(args),
        Mode::Configure => configure_mode(args),
    }
}

fn open_store(path: &Path) -> Arc<ConfigStore> {
    let mut fs = RealFileSystem;
    Arc::new(ConfigStore::open(path, &mut fs))
}

/// Starts the engine worker with the actuator selected on the command line.
fn spawn_worker<F, R>(args: &BetclickArgs, resolver: F) -> BetclickResult<EngineWorker>
where
    F: FnOnce() -> BetclickResult<R> + Send + 'static,
    R: PositionResolver + 'static,
{
    let settings = args.engine_settings();
    if args.timing.dry_run {
        EngineWorker::spawn(move || Ok(BetEngine::new(resolver()?, DryRunActuator::default(), settings)))
    } else {
        EngineWorker::spawn(move || Ok(BetEngine::new(resolver()?, PointerActuator::new()?, settings)))
    }
}

fn serve(args: BetclickArgs) -> BetclickResult<()> {
    let worker = match args.resolver.kind {
        Kind::Fixed => {
            let store = open_store(&args.resolver.config);
            spawn_worker(&args, move || Ok(FixedResolver::new(store)))?
        }
        Kind::Vision => {
            let manifest = args.resolver.templates.clone();
            let settings = args.resolver.vision_settings();
            let monitor = args.monitor.name.clone();
            spawn_worker(&args, move || {
                let capture = MonitorCapture::select(monitor)?;
                Ok(VisionResolver::new(capture, TemplateSet::load(&manifest)?, settings))
            })?
        }
    };
    log::info!("bet engine ready ({:?} resolver)", args.resolver.kind);

    let runtime = tokio::runtime::Runtime::new()?;
    let handle = worker.handle();
    let result = runtime.block_on(remote::run(args.controller.settings(), &handle));
    drop(handle);
    worker.shutdown();
    result
}

fn test_mode(args: BetclickArgs) -> BetclickResult<()> {
    log::info!("Interactive check of positions, templates and clicks.");

    log::info!("\n[Step 1/3] Collected invoke parameters:");
    log::info!("{:?}", args.monitor);
    log::info!("{:?}", args.resolver);
    log::info!("{:?}", args.timing);

    let store = open_store(&args.resolver.config);
    let config = store.snapshot();
    log::info!("\n[Step 2/3] Saved positions in {}:", store.path().display());
    for line in printer::config_summary(&config) {
        log::info!("{line}");
    }

    match args.resolver.kind {
        Kind::Fixed => {
            let resolver = FixedResolver::new(store);
            log::info!("configured: {}", resolver.is_configured());
            if let Some(amount) = args.probe.chip {
                chip_test(&args, resolver, amount)?;
            }
        }
        Kind::Vision => {
            let templates = TemplateSet::load(&args.resolver.templates)?;
            let frame = match &args.probe.frame {
                Some(path) => FileCapture::new(path, (0, 0)).capture()?,
                None => MonitorCapture::select(args.monitor.name.clone())?.capture()?,
            };
            log::info!(
                "\n[Step 3/3] Probing templates on a {}x{} frame at {:?}:",
                frame.image.width(),
                frame.image.height(),
                frame.origin
            );
            let still = VisionResolver::new(frame, templates.clone(), args.resolver.vision_settings());
            probe_templates(&still);

            if let Some(amount) = args.probe.chip {
                match &args.probe.frame {
                    Some(path) => {
                        let capture = FileCapture::new(path, (0, 0));
                        let resolver = VisionResolver::new(capture, templates, args.resolver.vision_settings());
                        chip_test(&args, resolver, amount)?
                    }
                    None => {
                        let capture = MonitorCapture::select(args.monitor.name.clone())?;
                        let resolver = VisionResolver::new(capture, templates, args.resolver.vision_settings());
                        chip_test(&args, resolver, amount)?
                    }
                }
            }
        }
    }
    Ok(())
}

fn probe_templates(resolver: &VisionResolver<Frame>) {
    log::info!("configured: {}", resolver.is_configured());
    for side in [Side::Player, Side::Banker] {
        let name = format!("{side} area");
        log::info!("{}", printer::target_line(&name, resolver.resolve_area(side).as_ref()));
    }
    match resolver.resolve_cancel() {
        Ok(target) => log::info!("{}", printer::target_line("cancel", Some(&target))),
        Err(reason) => log::info!("{:<14} {}", "cancel", reason.message()),
    }
    for amount in resolver.denominations() {
        let name = format!("chip {}", printer::format_amount(amount));
        log::info!("{}", printer::target_line(&name, resolver.resolve_chip(amount).as_ref()));
    }
}

fn chip_test<R: PositionResolver>(args: &BetclickArgs, resolver: R, amount: u64) -> BetclickResult<()> {
    log::info!("test click on chip {}", printer::format_amount(amount));
    let settings = args.engine_settings();
    let result = if args.timing.dry_run {
        BetEngine::new(resolver, DryRunActuator::default(), settings).test_chip_click(amount)
    } else {
        BetEngine::new(resolver, PointerActuator::new()?, settings).test_chip_click(amount)
    };
    match result {
        Ok(target) => log::info!("{}", printer::target_line("clicked", Some(&target))),
        Err(reason) => log::error!("chip test failed: {}", reason.message()),
    }
    Ok(())
}

fn configure_mode(args: BetclickArgs) -> BetclickResult<()> {
    let store = open_store(&args.resolver.config);
    let pointer = PointerActuator::new()?;
    printer::print_config(&store.snapshot(), &mut io::stdout());

    log::info!("Hover a target and type: player | banker | cancel | chip <amount>");
    log::info!("Chip rack: add <amount> | amount <from> <to> | remove <amount>");
    log::info!("Finish with save or quit");

    let (tx, rx) = mpsc::channel::<EditorEvent>();
    let session = EditSession::begin(&store);
    let outcome = thread::scope(|scope| {
        let drain = scope.spawn(move || {
            let mut fs = RealFileSystem;
            editor::drain_editor_events(session, &rx, &mut fs)
        });

        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match editor::parse_command(&line, || pointer.location()) {
                Ok(event) => {
                    let done = matches!(event, EditorEvent::Save | EditorEvent::Cancel);
                    if tx.send(event).is_err() || done {
                        break;
                    }
                }
                Err(e) => log::warn!("{e}"),
            }
        }
        drop(tx);
        drain.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })?;

    match outcome {
        EditOutcome::Saved => {
            log::info!("saved to {}", store.path().display());
            printer::print_config(&store.snapshot(), &mut io::stdout());
        }
        EditOutcome::Cancelled => log::info!("nothing saved"),
    }
    Ok(())
}
