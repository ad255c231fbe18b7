//! End-to-end scan runs through the orchestrator with mock hardware.

use galvo_scan::config::Settings;
use galvo_scan::display::display_channels;
use galvo_scan::error::{Axis, ScanError};
use galvo_scan::executor::ScanOutcome;
use galvo_scan::hardware::{MockGalvoPair, SimulatedDetector};
use galvo_scan::orchestrator::Orchestrator;
use galvo_scan::path::load_path;
use galvo_scan::transform::TransformParams;
use galvo_scan::viewport::ViewCommand;
use std::time::Duration;

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.scan.settle = Duration::ZERO;
    settings.display.viewer_refresh = Duration::from_millis(1);
    settings
}

fn params(settings: &Settings) -> TransformParams {
    TransformParams {
        step_size_deg: settings.optics.step_size_deg,
        voltage_range_v: settings.device.voltage_range_v,
        angle_range_deg: settings.optics.angle_range_deg,
    }
}

#[tokio::test]
async fn full_run_writes_every_point_and_releases_device() {
    let settings = settings();
    let galvo = MockGalvoPair::new();
    let detector = SimulatedDetector::with_seed(10..=255, 11);

    let rows: String = (0..8)
        .flat_map(|y| (0..8).map(move |x| format!("{x},{y}\n")))
        .collect();
    let path = load_path(format!("x,y\n{rows}").as_bytes(), &params(&settings)).unwrap();

    let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, None);
    let report = orchestrator.run(&path).await.unwrap();

    assert_eq!(report.outcome, ScanOutcome::Completed);
    assert_eq!(galvo.writes().await.len(), 64);
    assert_eq!(
        galvo.channels().await,
        Some(("Dev1/ao0".to_string(), "Dev1/ao1".to_string()))
    );
    assert!(!galvo.is_started().await);
    assert_eq!(galvo.stop_count().await, 1);

    // Every scanned cell received a sample in the simulated range.
    for y in 0..8 {
        for x in 0..8 {
            assert!(report.buffer.get(x, y).unwrap() >= 10);
        }
    }
}

#[tokio::test]
async fn out_of_range_point_fails_fast_with_no_writes() {
    let settings = settings();
    let galvo = MockGalvoPair::new();
    let detector = SimulatedDetector::with_seed(10..=255, 12);

    // 2700 * 0.01 deg = 27 deg maps to 6.0 V against a 5.0 V limit.
    let path = load_path("x,y\n2700,0\n1,1\n".as_bytes(), &params(&settings)).unwrap();

    let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, None);
    let err = orchestrator.run(&path).await.unwrap_err();

    match err {
        ScanError::RangeViolation {
            index,
            axis,
            value,
            limit,
        } => {
            assert_eq!(index, 0);
            assert_eq!(axis, Axis::X);
            assert!((value - 6.0).abs() < 1e-9);
            assert_eq!(limit, 5.0);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing reached the device, and it was still released.
    assert!(galvo.writes().await.is_empty());
    assert_eq!(galvo.stop_count().await, 1);
}

#[tokio::test]
async fn device_fault_mid_path_leaves_partial_buffer_and_idle_device() {
    let settings = settings();
    let galvo = MockGalvoPair::failing_at_write(2);
    let detector = SimulatedDetector::with_seed(10..=255, 13);

    let rows: String = (0..10).map(|i| format!("{i},0\n")).collect();
    let path = load_path(format!("x,y\n{rows}").as_bytes(), &params(&settings)).unwrap();

    let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, None);
    let err = orchestrator.run(&path).await.unwrap_err();

    assert!(matches!(err, ScanError::Device(_)));
    assert!(err.to_string().contains("injected write failure"));
    // Points 0 and 1 reached the device before the fault; point 2 never did.
    assert_eq!(galvo.writes().await.len(), 2);
    assert_eq!(galvo.stop_count().await, 1);
    assert!(!galvo.is_started().await);
}

#[tokio::test]
async fn exit_during_scan_stops_at_point_granularity() {
    let settings = settings();
    let galvo = MockGalvoPair::new();
    let detector = SimulatedDetector::with_seed(10..=255, 14);

    let rows: String = (0..100).map(|i| format!("{i},0\n")).collect();
    let path = load_path(format!("x,y\n{rows}").as_bytes(), &params(&settings)).unwrap();

    let (link, ui) = display_channels();
    // First exit aborts the scan; the second ends the viewer phase that
    // follows an abort.
    ui.commands.send(ViewCommand::Exit).unwrap();
    ui.commands.send(ViewCommand::Exit).unwrap();

    let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, Some(link));
    let report = orchestrator.run(&path).await.unwrap();

    assert_eq!(report.outcome, ScanOutcome::Aborted);
    // The exit was already queued, so exactly one point executed.
    assert_eq!(galvo.writes().await.len(), 1);
    assert_eq!(galvo.stop_count().await, 1);

    // The single executed point produced a preview frame.
    let frame = ui.frames.try_recv().unwrap();
    assert_eq!(frame.width, frame.height);
    assert!(!frame.rgba.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scan_task_runs_from_a_spawned_worker() {
    // Mirrors the binary's wiring: the run future moves onto a runtime
    // worker while the display surface owns the other side.
    let settings = settings();
    let rows: String = (0..20).map(|i| format!("{i},0\n")).collect();
    let path = load_path(format!("x,y\n{rows}").as_bytes(), &params(&settings)).unwrap();

    let (link, ui) = display_channels();
    drop(ui);

    let handle = tokio::spawn(async move {
        let galvo = MockGalvoPair::new();
        let detector = SimulatedDetector::with_seed(10..=255, 15);
        let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, Some(link));
        orchestrator.run(&path).await.map(|report| report.outcome)
    });

    // The display was gone before the first point, so the scan aborts.
    assert_eq!(handle.await.unwrap().unwrap(), ScanOutcome::Aborted);
}
