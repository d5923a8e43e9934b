use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::Sender;

use sortline_core::actuation::actuator_controller::ActuatorController;
use sortline_core::capture::domain::capture_backend::CaptureBackend;
use sortline_core::capture::frame_source::FrameSource;
use sortline_core::capture::infrastructure::ffmpeg_device_backend::FfmpegDeviceBackend;
use sortline_core::capture::infrastructure::media_fallback::MediaFileFallback;
use sortline_core::color::infrastructure::classifier_factory::{create_classifier, ColorStrategy};
use sortline_core::detection::domain::material_detector::MaterialDetector;
use sortline_core::detection::infrastructure::label_dataset::LabelDataset;
use sortline_core::detection::infrastructure::model_resolver;
use sortline_core::detection::infrastructure::onnx_material_detector::OnnxMaterialDetector;
use sortline_core::pipeline::control_command::ControlCommand;
use sortline_core::pipeline::infrastructure::tick_scheduler::TickScheduler;
use sortline_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use sortline_core::pipeline::sorting_orchestrator::SortingOrchestrator;
use sortline_core::routing::bin_router::BinRegistry;
use sortline_core::shared::config::{DetectorConfig, SorterConfig};
use sortline_core::shared::constants::{IMAGE_EXTENSIONS, MATERIAL_MODEL_NAME};
use sortline_core::tracking::identity_tracker::IdentityTracker;
use sortline_core::tracking::infrastructure::iou_scorer::IouScorer;

const LOG_THROTTLE_TICKS: usize = 500;

/// Vision-guided plastic waste sorting line.
#[derive(Parser)]
#[command(name = "sortline")]
struct Cli {
    /// JSON configuration file (defaults to the per-user config file).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port of the robotic arm.
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(long)]
    baud: Option<u32>,

    /// Preferred camera device index.
    #[arg(long)]
    camera: Option<u32>,

    /// Video clip looped when no camera opens.
    #[arg(long)]
    clip: Option<PathBuf>,

    /// Still image used when neither a camera nor the clip opens.
    #[arg(long)]
    image: Option<PathBuf>,

    /// ONNX material detection model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Color strategy: histogram or clustering.
    #[arg(long)]
    color_strategy: Option<ColorStrategy>,

    /// Milliseconds between pipeline ticks.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Do not open the serial port; log arm commands instead.
    #[arg(long)]
    simulate_arm: bool,

    /// Start sorting immediately instead of waiting for `start`.
    #[arg(long)]
    autostart: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = SorterConfig::load_or_default(cli.config.as_deref())?;
    apply_overrides(&cli, &mut config);
    config.validate()?;
    validate(&config)?;

    let backends: Vec<Box<dyn CaptureBackend>> = FfmpegDeviceBackend::platform_default()
        .into_iter()
        .map(|b| Box::new(b) as Box<dyn CaptureBackend>)
        .collect();
    let source = FrameSource::initialize(
        backends,
        Box::new(MediaFileFallback::from_config(&config.camera)),
        config.camera.probe_start..config.camera.probe_end,
        config.camera.preferred_index,
    );
    // Missing camera media only disables sorting; configuration faults abort.
    if let Err(e) = &source {
        if e.is_fatal() {
            return Err(e.to_string().into());
        }
        log::error!("{e}");
    }

    let detector = build_detector(&config.detector);
    let tracker = IdentityTracker::from_config(Box::new(IouScorer::new()), &config.tracker);
    let classifier = create_classifier(config.color.strategy);
    let registry = BinRegistry::from_config(&config.bins)?;
    let actuator = ActuatorController::open_serial(&config.arm, registry).shared();

    let mut orchestrator = SortingOrchestrator::new(
        source,
        detector,
        tracker,
        classifier,
        actuator,
        Box::new(StdoutPipelineLogger::new(LOG_THROTTLE_TICKS)),
        config.detector.confidence_threshold,
    );
    println!("{}", orchestrator.status());

    let (tx, rx) = crossbeam_channel::unbounded();
    if cli.autostart {
        tx.send(ControlCommand::Start)?;
    }
    spawn_console(tx);

    let scheduler = TickScheduler::new(Duration::from_millis(config.tick_interval_ms));
    let ticks = scheduler.run(&mut orchestrator, rx);
    log::info!("Exited after {ticks} ticks");
    println!("{}", orchestrator.status());
    Ok(())
}

fn apply_overrides(cli: &Cli, config: &mut SorterConfig) {
    if let Some(port) = &cli.port {
        config.arm.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.arm.baud_rate = baud;
    }
    if cli.simulate_arm {
        config.arm.simulate = true;
    }
    if cli.camera.is_some() {
        config.camera.preferred_index = cli.camera;
    }
    if cli.clip.is_some() {
        config.camera.fallback_clip = cli.clip.clone();
    }
    if cli.image.is_some() {
        config.camera.fallback_image = cli.image.clone();
    }
    if cli.model.is_some() {
        config.detector.model_path = cli.model.clone();
    }
    if let Some(strategy) = cli.color_strategy {
        config.color.strategy = strategy;
    }
    if let Some(ms) = cli.tick_ms {
        config.tick_interval_ms = ms;
    }
}

fn validate(config: &SorterConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(image) = &config.camera.fallback_image {
        if !is_image(image) {
            return Err(format!(
                "Fallback image has an unsupported extension: {}",
                image.display()
            )
            .into());
        }
    }
    if config.detector.class_names.is_empty() {
        return Err("At least one material class name is required".into());
    }
    Ok(())
}

/// A missing or broken model leaves the sorter idle-only rather than
/// aborting, so the camera and arm can still be checked.
fn build_detector(config: &DetectorConfig) -> Option<Box<dyn MaterialDetector>> {
    let Some(model_path) =
        model_resolver::resolve(config.model_path.as_deref(), MATERIAL_MODEL_NAME, None)
    else {
        log::error!("Material model {MATERIAL_MODEL_NAME} not found");
        return None;
    };

    let detector = match OnnxMaterialDetector::new(
        &model_path,
        config.class_names.clone(),
        config.candidate_threshold,
        config.input_size,
    ) {
        Ok(detector) => detector,
        Err(e) => {
            log::error!("Failed to load {}: {e}", model_path.display());
            return None;
        }
    };

    let detector = match config.dataset_dir.as_deref().map(LabelDataset::open) {
        Some(Ok(dataset)) => detector.with_dataset(dataset),
        Some(Err(e)) => {
            log::warn!("Label capture disabled: {e}");
            detector
        }
        None => detector,
    };
    Some(Box::new(detector))
}

/// Reads operator commands from stdin until EOF or `quit`.
fn spawn_console(tx: Sender<ControlCommand>) {
    thread::spawn(move || {
        print_help();
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(msg) => {
                    eprintln!("{msg}");
                    continue;
                }
            };
            let shutdown = matches!(command, ControlCommand::Shutdown);
            if !dispatch(&tx, command) || shutdown {
                return;
            }
        }
        let _ = tx.send(ControlCommand::Shutdown);
    });
}

/// Sends `command`, printing any reply. Returns false once the loop is gone.
fn dispatch(tx: &Sender<ControlCommand>, command: ControlCommand) -> bool {
    match command {
        ControlCommand::Status(_) => {
            let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
            if tx.send(ControlCommand::Status(reply_tx)).is_err() {
                return false;
            }
            if let Ok(status) = reply_rx.recv() {
                println!("{status}");
            }
            true
        }
        ControlCommand::Cameras(_) => {
            let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
            if tx.send(ControlCommand::Cameras(reply_tx)).is_err() {
                return false;
            }
            if let Ok(cameras) = reply_rx.recv() {
                if cameras.is_empty() {
                    println!("No cameras discovered");
                }
                for (i, camera) in cameras.iter().enumerate() {
                    println!("[{i}] {}", camera.label);
                }
            }
            true
        }
        command => tx.send(command).is_ok(),
    }
}

/// Parses one console line. `Ok(None)` for blank input.
fn parse_command(line: &str) -> Result<Option<ControlCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_lowercase().as_str(), args.as_slice()) {
        ("start", []) => ControlCommand::Start,
        ("stop", []) => ControlCommand::Stop,
        ("quit" | "exit", []) => ControlCommand::Shutdown,
        ("status", []) => ControlCommand::Status(crossbeam_channel::bounded(1).0),
        ("cameras", []) => ControlCommand::Cameras(crossbeam_channel::bounded(1).0),
        ("camera", [n]) => ControlCommand::SelectCamera(
            n.parse().map_err(|_| format!("Invalid camera number '{n}'"))?,
        ),
        ("jog", [x, y, z]) => ControlCommand::Jog {
            x: parse_coord(x)?,
            y: parse_coord(y)?,
            z: parse_coord(z)?,
        },
        ("label", words) if !words.is_empty() => ControlCommand::CaptureLabel(words.join(" ")),
        ("help", []) => {
            print_help();
            return Ok(None);
        }
        _ => return Err(format!("Unrecognized command '{}' (try 'help')", line.trim())),
    };
    Ok(Some(command))
}

fn parse_coord(s: &str) -> Result<i32, String> {
    s.parse().map_err(|_| format!("Invalid coordinate '{s}'"))
}

fn print_help() {
    eprintln!(
        "Commands: start | stop | status | cameras | camera <n> | jog <x> <y> <z> \
         | label <text> | quit"
    );
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("start")]
    #[case("  START ")]
    fn test_parse_start(#[case] line: &str) {
        assert!(matches!(parse_command(line), Ok(Some(ControlCommand::Start))));
    }

    #[rstest]
    #[case("quit")]
    #[case("exit")]
    fn test_parse_shutdown(#[case] line: &str) {
        assert!(matches!(
            parse_command(line),
            Ok(Some(ControlCommand::Shutdown))
        ));
    }

    #[test]
    fn test_parse_jog() {
        assert!(matches!(
            parse_command("jog 100 -20 5"),
            Ok(Some(ControlCommand::Jog { x: 100, y: -20, z: 5 }))
        ));
    }

    #[test]
    fn test_parse_camera_selection() {
        assert!(matches!(
            parse_command("camera 2"),
            Ok(Some(ControlCommand::SelectCamera(2)))
        ));
    }

    #[test]
    fn test_parse_label_keeps_spaces() {
        match parse_command("label PET clear") {
            Ok(Some(ControlCommand::CaptureLabel(label))) => assert_eq!(label, "PET clear"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_blank_lines_are_ignored(#[case] line: &str) {
        assert!(matches!(parse_command(line), Ok(None)));
    }

    #[rstest]
    #[case("jog 1 2")]
    #[case("jog a b c")]
    #[case("camera")]
    #[case("camera -1")]
    #[case("label")]
    #[case("dance")]
    fn test_invalid_commands_are_rejected(#[case] line: &str) {
        assert!(parse_command(line).is_err());
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let cli = Cli::parse_from([
            "sortline",
            "--port",
            "/dev/ttyACM0",
            "--baud",
            "115200",
            "--simulate-arm",
            "--color-strategy",
            "clustering",
            "--tick-ms",
            "25",
        ]);
        let mut config = SorterConfig::default();
        apply_overrides(&cli, &mut config);

        assert_eq!(config.arm.port, "/dev/ttyACM0");
        assert_eq!(config.arm.baud_rate, 115200);
        assert!(config.arm.simulate);
        assert_eq!(config.color.strategy, ColorStrategy::Clustering);
        assert_eq!(config.tick_interval_ms, 25);
        assert_eq!(config.camera.preferred_index, None);
    }

    #[rstest]
    #[case("fallback.png", true)]
    #[case("fallback.JPG", true)]
    #[case("fallback.mp4", false)]
    fn test_is_image(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_image(Path::new(path)), expected);
    }
}
