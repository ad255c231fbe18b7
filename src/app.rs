//! egui display surface for the heatmap.
//!
//! The app owns the UI ends of the display channels: it drains rendered
//! frames (keeping only the newest), uploads them as a nearest-filtered
//! texture, and translates key presses into [`ViewCommand`]s for the scan
//! task. All rendering decisions (palette, scale, crop) happen on the scan
//! side; this surface only blits.

use crate::display::UiLink;
use crate::viewport::{ColorFrame, PanDirection, ViewCommand};
use eframe::egui;
use std::sync::mpsc;
use tracing::debug;

/// Heatmap viewer window.
pub struct HeatmapApp {
    ui: UiLink,
    texture: Option<egui::TextureHandle>,
}

impl HeatmapApp {
    /// Wrap the UI-side channel endpoints.
    pub fn new(ui: UiLink) -> Self {
        Self { ui, texture: None }
    }

    /// Drain the frame queue; returns the most recent frame and whether
    /// the scan side has hung up.
    fn drain_frames(&self) -> (Option<ColorFrame>, bool) {
        let mut latest = None;
        loop {
            match self.ui.frames.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(mpsc::TryRecvError::Empty) => return (latest, false),
                Err(mpsc::TryRecvError::Disconnected) => return (latest, true),
            }
        }
    }

    fn upload(&mut self, ctx: &egui::Context, frame: &ColorFrame) {
        let image = egui::ColorImage::from_rgba_unmultiplied(
            [frame.width, frame.height],
            &frame.rgba,
        );
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture =
                    Some(ctx.load_texture("heatmap", image, egui::TextureOptions::NEAREST));
            }
        }
    }

    fn send(&self, command: ViewCommand) {
        if self.ui.commands.send(command).is_err() {
            debug!("scan task gone, command dropped");
        }
    }

    /// Map key presses to commands. Escape only *requests* an exit: during
    /// a scan it aborts into the viewer over the partial heatmap, and in
    /// the viewer it ends the run. The window closes once the scan task
    /// hangs up the frame channel.
    fn handle_input(&self, ctx: &egui::Context) {
        let mut exit = false;
        ctx.input(|input| {
            for (key, command) in [
                (egui::Key::Plus, ViewCommand::ZoomIn),
                (egui::Key::Equals, ViewCommand::ZoomIn),
                (egui::Key::Minus, ViewCommand::ZoomOut),
                (egui::Key::ArrowUp, ViewCommand::Pan(PanDirection::Up)),
                (egui::Key::W, ViewCommand::Pan(PanDirection::Up)),
                (egui::Key::ArrowDown, ViewCommand::Pan(PanDirection::Down)),
                (egui::Key::S, ViewCommand::Pan(PanDirection::Down)),
                (egui::Key::ArrowLeft, ViewCommand::Pan(PanDirection::Left)),
                (egui::Key::A, ViewCommand::Pan(PanDirection::Left)),
                (egui::Key::ArrowRight, ViewCommand::Pan(PanDirection::Right)),
                (egui::Key::D, ViewCommand::Pan(PanDirection::Right)),
            ] {
                if input.key_pressed(key) {
                    self.send(command);
                }
            }
            if input.key_pressed(egui::Key::Escape) {
                exit = true;
            }
        });
        if exit {
            self.send(ViewCommand::Exit);
        }
    }
}

impl eframe::App for HeatmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_input(ctx);

        let (frame, scan_gone) = self.drain_frames();
        if let Some(frame) = frame {
            self.upload(ctx, &frame);
        }
        if scan_gone {
            // The run is over; nothing more will arrive.
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                if let Some(texture) = &self.texture {
                    ui.centered_and_justified(|ui| {
                        ui.image((texture.id(), texture.size_vec2()));
                    });
                } else {
                    ui.centered_and_justified(|ui| {
                        ui.label("waiting for scan data…");
                    });
                }
            });

        // Frames arrive from another task; poll at a steady cadence rather
        // than waiting for input events.
        ctx.request_repaint_after(std::time::Duration::from_millis(16));
    }
}

/// Open the viewer window and block until it closes.
pub fn run_viewer(ui: UiLink, window_size: usize) -> eframe::Result {
    let side = window_size as f32;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("galvo-scan")
            .with_inner_size([side, side]),
        ..Default::default()
    };
    eframe::run_native(
        "galvo-scan",
        options,
        Box::new(move |_cc| Ok(Box::new(HeatmapApp::new(ui)))),
    )
}
