//! Top-level run sequencing and device lifecycle.
//!
//! A run has two sequential, non-resumable phases:
//!
//! 1. **Scan phase** — the executor walks the path, rendering the intensity
//!    buffer after every point for live feedback. Preview is best-effort;
//!    only an exit command (or a vanished display surface) stops the scan.
//! 2. **Viewer phase** — passive loop at a fixed refresh cadence, applying
//!    zoom/pan commands with no further buffer mutation. Entered after
//!    completion and after an abort alike: an aborted scan drops into the
//!    viewer over the partial heatmap, and a second exit ends the run.
//!    Skipped when running headless.
//!
//! The device bracket spans the whole run: configure + start before the
//! scan, and an unconditional best-effort stop when the orchestrator exits
//! by any path — completion, abort, or fatal error. No half-configured
//! device handle survives this function.

use crate::buffer::IntensityBuffer;
use crate::config::Settings;
use crate::display::{CommandPoll, DisplayLink};
use crate::error::{ScanError, ScanResult};
use crate::executor::{ScanControl, ScanExecutor, ScanOutcome};
use crate::hardware::{AnalogOutput, IntensitySource};
use crate::path::ScanPath;
use crate::viewport::{render, ViewCommand, ViewportState};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// What a finished run produced.
#[derive(Debug)]
pub struct ScanReport {
    /// How the scan phase ended.
    pub outcome: ScanOutcome,
    /// The accumulated intensity grid.
    pub buffer: IntensityBuffer,
}

/// Sequences the scan and viewer phases and owns the device lifecycle.
pub struct Orchestrator<'a> {
    device: &'a dyn AnalogOutput,
    detector: &'a dyn IntensitySource,
    settings: &'a Settings,
    display: Option<DisplayLink>,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator. `display` of `None` runs headless: no
    /// preview frames and no viewer phase.
    pub fn new(
        device: &'a dyn AnalogOutput,
        detector: &'a dyn IntensitySource,
        settings: &'a Settings,
        display: Option<DisplayLink>,
    ) -> Self {
        Self {
            device,
            detector,
            settings,
            display,
        }
    }

    /// Execute one full run over `path`.
    ///
    /// The device is released before this returns, whatever the outcome.
    pub async fn run(&mut self, path: &ScanPath) -> ScanResult<ScanReport> {
        if path.is_empty() {
            return Err(ScanError::Load(
                "point source produced no scan points".to_string(),
            ));
        }

        let result = self.run_phases(path).await;

        // Release is best-effort on every exit path; a stop failure must
        // not mask the run's own error.
        if let Err(e) = self.device.stop().await {
            warn!("device release failed: {e:#}");
        } else {
            debug!("device released");
        }

        result
    }

    async fn run_phases(&mut self, path: &ScanPath) -> ScanResult<ScanReport> {
        let settings = self.settings;
        let device_cfg = &settings.device;
        self.device
            .configure(
                &device_cfg.channel_x,
                &device_cfg.channel_y,
                device_cfg.voltage_range_v,
            )
            .await
            .map_err(|e| ScanError::Device(format!("{e:#}")))?;
        self.device
            .start()
            .await
            .map_err(|e| ScanError::Device(format!("{e:#}")))?;
        info!(
            channel_x = %device_cfg.channel_x,
            channel_y = %device_cfg.channel_y,
            points = path.len(),
            "device armed, scan starting"
        );

        let display_cfg = &settings.display;
        let mut buffer = IntensityBuffer::new(display_cfg.buffer_size);
        let mut viewport = ViewportState::new(display_cfg.initial_scale);

        let executor = ScanExecutor::new(
            self.device,
            self.detector,
            device_cfg.voltage_range_v,
            device_cfg.write_timeout,
            settings.scan.settle,
        );

        let mut link = self.display.as_mut();
        let window_size = display_cfg.window_size;
        let outcome = executor
            .run(path, &mut buffer, |_, buf| {
                let Some(link) = link.as_deref_mut() else {
                    return ScanControl::Continue;
                };
                // Present before polling so the last executed point is
                // visible even when this iteration aborts.
                link.present(render(buf, &viewport, window_size));
                loop {
                    match link.poll_command() {
                        CommandPoll::Command(ViewCommand::Exit) | CommandPoll::Closed => {
                            return ScanControl::Abort;
                        }
                        CommandPoll::Command(cmd) => {
                            debug!(?cmd, "navigation ignored during scan phase");
                        }
                        CommandPoll::Empty => break,
                    }
                }
                ScanControl::Continue
            })
            .await?;

        match outcome {
            ScanOutcome::Completed => info!("scan complete, viewer mode active"),
            ScanOutcome::Aborted => info!("scan aborted, viewer mode over partial data"),
        }
        self.viewer_phase(&buffer, &mut viewport).await;

        Ok(ScanReport { outcome, buffer })
    }

    /// Passive render/navigate loop; returns on exit command or when the
    /// display surface disappears.
    async fn viewer_phase(&mut self, buffer: &IntensityBuffer, viewport: &mut ViewportState) {
        let settings = self.settings;
        let display_cfg = &settings.display;
        let Some(link) = self.display.as_mut() else {
            return;
        };

        let mut ticker = tokio::time::interval(display_cfg.viewer_refresh);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            loop {
                match link.poll_command() {
                    CommandPoll::Command(ViewCommand::Exit) | CommandPoll::Closed => {
                        info!("viewer exit");
                        return;
                    }
                    CommandPoll::Command(cmd) => viewport.apply(
                        cmd,
                        buffer.size(),
                        display_cfg.window_size,
                        display_cfg.zoom_factor,
                        display_cfg.pan_step,
                    ),
                    CommandPoll::Empty => break,
                }
            }
            link.present(render(buffer, viewport, display_cfg.window_size));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::display_channels;
    use crate::hardware::{MockGalvoPair, SimulatedDetector};
    use crate::path::{load_path, ScanPath};
    use crate::transform::TransformParams;
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

    #[test]
    fn run_future_is_spawnable() {
        fn assert_send<T: Send>(_: &T) {}
        let settings = settings();
        let galvo = MockGalvoPair::new();
        let detector = SimulatedDetector::with_seed(10..=255, 0);
        let (link, _ui) = display_channels();
        let path = ScanPath::default();
        let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, Some(link));
        let future = orchestrator.run(&path);
        assert_send(&future);
    }

    #[tokio::test]
    async fn empty_path_aborts_before_device_acquisition() {
        let settings = settings();
        let galvo = MockGalvoPair::new();
        let detector = SimulatedDetector::with_seed(10..=255, 1);
        let path = load_path("x,y\n".as_bytes(), &params(&settings)).unwrap();

        let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, None);
        let err = orchestrator.run(&path).await.unwrap_err();

        assert!(matches!(err, ScanError::Load(_)));
        assert!(galvo.channels().await.is_none());
        assert_eq!(galvo.stop_count().await, 0);
    }

    #[tokio::test]
    async fn headless_run_completes_and_releases_device() {
        let settings = settings();
        let galvo = MockGalvoPair::new();
        let detector = SimulatedDetector::with_seed(10..=255, 2);
        let path = load_path("x,y\n0,0\n1,1\n2,2\n".as_bytes(), &params(&settings)).unwrap();

        let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, None);
        let report = orchestrator.run(&path).await.unwrap();

        assert_eq!(report.outcome, ScanOutcome::Completed);
        assert!(format!("{report:?}").contains("Completed"));
        assert_eq!(galvo.writes().await.len(), 3);
        assert!(!galvo.is_started().await);
        assert_eq!(galvo.stop_count().await, 1);
        assert!(report.buffer.get(1, 1).unwrap() > 0);
    }

    #[tokio::test]
    async fn device_fault_still_releases_device() {
        let settings = settings();
        let galvo = MockGalvoPair::failing_at_write(1);
        let detector = SimulatedDetector::with_seed(10..=255, 3);
        let path = load_path("x,y\n0,0\n1,1\n2,2\n".as_bytes(), &params(&settings)).unwrap();

        let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, None);
        let err = orchestrator.run(&path).await.unwrap_err();

        assert!(matches!(err, ScanError::Device(_)));
        assert_eq!(galvo.stop_count().await, 1);
        assert!(!galvo.is_started().await);
    }

    #[tokio::test]
    async fn abort_drops_into_viewer_over_partial_data() {
        let settings = settings();
        let galvo = MockGalvoPair::new();
        let detector = SimulatedDetector::with_seed(10..=255, 4);
        let rows: String = (0..50).map(|i| format!("{i},0\n")).collect();
        let path = load_path(format!("x,y\n{rows}").as_bytes(), &params(&settings)).unwrap();

        let (link, ui) = display_channels();
        // The first exit aborts the scan; the second, delivered once the
        // viewer loop is ticking, ends the run.
        ui.commands.send(ViewCommand::Exit).unwrap();
        let commands = ui.commands.clone();
        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = commands.send(ViewCommand::Exit);
        });

        let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, Some(link));
        let report = orchestrator.run(&path).await.unwrap();
        sender.await.unwrap();

        assert_eq!(report.outcome, ScanOutcome::Aborted);
        // The exit was already queued, so exactly one point executed.
        assert_eq!(galvo.writes().await.len(), 1);
        assert_eq!(galvo.stop_count().await, 1);

        // The scan preview plus viewer refreshes of the partial heatmap.
        let mut frames = 0;
        while ui.frames.try_recv().is_ok() {
            frames += 1;
        }
        assert!(frames >= 2);
    }

    #[tokio::test]
    async fn closed_display_reads_as_abort() {
        let settings = settings();
        let galvo = MockGalvoPair::new();
        let detector = SimulatedDetector::with_seed(10..=255, 5);
        let rows: String = (0..50).map(|i| format!("{i},0\n")).collect();
        let path = load_path(format!("x,y\n{rows}").as_bytes(), &params(&settings)).unwrap();

        let (link, ui) = display_channels();
        drop(ui);

        let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, Some(link));
        let report = orchestrator.run(&path).await.unwrap();

        assert_eq!(report.outcome, ScanOutcome::Aborted);
        assert_eq!(galvo.stop_count().await, 1);
    }

    #[tokio::test]
    async fn viewer_phase_applies_navigation_then_exits() {
        let settings = settings();
        let galvo = MockGalvoPair::new();
        let detector = SimulatedDetector::with_seed(10..=255, 6);
        let path = load_path("x,y\n0,0\n".as_bytes(), &params(&settings)).unwrap();

        let (link, ui) = display_channels();

        // Commands sent while the scan runs would be drained (and the exit
        // honoured) by the scan phase; deliver them once the viewer loop
        // is ticking instead.
        let commands = ui.commands.clone();
        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = commands.send(ViewCommand::ZoomIn);
            let _ = commands.send(ViewCommand::Exit);
        });

        let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, Some(link));
        let report = orchestrator.run(&path).await.unwrap();
        sender.await.unwrap();

        assert_eq!(report.outcome, ScanOutcome::Completed);
        assert_eq!(galvo.stop_count().await, 1);
        // Frames were published (scan preview and viewer refreshes).
        assert!(ui.frames.try_recv().is_ok());
    }
}
