//! Viewport state, navigation commands, and the heatmap renderer.
//!
//! [`render`] is a pure function from `(buffer, viewport)` to an RGBA frame:
//! apply the fixed inferno-style palette, scale by `scale_factor` using
//! nearest-neighbour (per-point cells stay crisp; interpolating across
//! independently sampled points would invent data), then crop the display
//! window at the viewport offsets. Rendering the same inputs twice yields
//! identical output.
//!
//! Offsets are re-clamped on every mutation — including zoom changes, since
//! the valid offset range depends on the scale.

/// Pan directions accepted by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    /// Move the window up.
    Up,
    /// Move the window down.
    Down,
    /// Move the window left.
    Left,
    /// Move the window right.
    Right,
}

/// Interactive commands from the display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    /// Multiply the scale factor (no upper bound).
    ZoomIn,
    /// Divide the scale factor, floored at 1.0.
    ZoomOut,
    /// Shift the visible window by one pan step.
    Pan(PanDirection),
    /// Leave the current phase (aborts a running scan).
    Exit,
}

/// Zoom/pan state of the visible window over the scaled heatmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    scale_factor: f64,
    offset_x: usize,
    offset_y: usize,
}

impl ViewportState {
    /// Create a viewport at the origin with the given initial zoom (≥ 1.0).
    pub fn new(initial_scale: f64) -> Self {
        Self {
            scale_factor: initial_scale.max(1.0),
            offset_x: 0,
            offset_y: 0,
        }
    }

    /// Current scale factor.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Current crop origin in scaled pixels.
    pub fn offsets(&self) -> (usize, usize) {
        (self.offset_x, self.offset_y)
    }

    /// Buffer extent after scaling.
    pub fn scaled_extent(&self, buffer_size: usize) -> usize {
        (buffer_size as f64 * self.scale_factor).round() as usize
    }

    /// Apply one navigation command and re-clamp the offsets.
    ///
    /// `Exit` is not a viewport mutation and is ignored here; phase handling
    /// belongs to the orchestrator.
    pub fn apply(
        &mut self,
        command: ViewCommand,
        buffer_size: usize,
        window_size: usize,
        zoom_factor: f64,
        pan_step: usize,
    ) {
        match command {
            ViewCommand::ZoomIn => self.scale_factor *= zoom_factor,
            ViewCommand::ZoomOut => self.scale_factor = (self.scale_factor / zoom_factor).max(1.0),
            ViewCommand::Pan(direction) => {
                match direction {
                    PanDirection::Up => self.offset_y = self.offset_y.saturating_sub(pan_step),
                    PanDirection::Down => self.offset_y += pan_step,
                    PanDirection::Left => self.offset_x = self.offset_x.saturating_sub(pan_step),
                    PanDirection::Right => self.offset_x += pan_step,
                }
            }
            ViewCommand::Exit => {}
        }
        self.clamp(buffer_size, window_size);
    }

    /// Clamp offsets so the window never runs past the scaled extent.
    fn clamp(&mut self, buffer_size: usize, window_size: usize) {
        let scaled = self.scaled_extent(buffer_size);
        let window = window_size.min(scaled);
        let max_offset = scaled - window;
        self.offset_x = self.offset_x.min(max_offset);
        self.offset_y = self.offset_y.min(max_offset);
    }
}

/// A rendered RGBA frame ready for texture upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorFrame {
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
    /// Row-major RGBA bytes, `width * height * 4` long.
    pub rgba: Vec<u8>,
}

/// Render the buffer through the viewport into a cropped colour frame.
pub fn render(
    buffer: &crate::buffer::IntensityBuffer,
    viewport: &ViewportState,
    window_size: usize,
) -> ColorFrame {
    let size = buffer.size();
    if size == 0 {
        return ColorFrame {
            width: 0,
            height: 0,
            rgba: Vec::new(),
        };
    }
    let scale = viewport.scale_factor();
    let scaled = viewport.scaled_extent(size);
    let view = window_size.min(scaled);

    // Offsets are kept clamped by `apply`, but the render itself never
    // trusts that: a stale viewport must still produce a valid crop.
    let (offset_x, offset_y) = viewport.offsets();
    let start_x = offset_x.min(scaled - view);
    let start_y = offset_y.min(scaled - view);

    let mut rgba = vec![255u8; view * view * 4];
    for wy in 0..view {
        let src_y = (((start_y + wy) as f64 / scale) as usize).min(size - 1);
        for wx in 0..view {
            let src_x = (((start_x + wx) as f64 / scale) as usize).min(size - 1);
            let intensity = buffer.get(src_x, src_y).unwrap_or(0);
            let [r, g, b] = INFERNO_LUT[intensity as usize];
            let at = (wy * view + wx) * 4;
            rgba[at] = r;
            rgba[at + 1] = g;
            rgba[at + 2] = b;
        }
    }

    ColorFrame {
        width: view,
        height: view,
        rgba,
    }
}

// Fixed palette: 256-entry inferno-style LUT, piecewise-linear between
// anchor colours, computed at compile time.

const INFERNO_ANCHORS: [[f64; 3]; 5] = [
    [0.0, 0.0, 4.0],
    [87.0, 16.0, 110.0],
    [188.0, 55.0, 84.0],
    [249.0, 142.0, 9.0],
    [252.0, 255.0, 164.0],
];

/// Intensity-to-colour lookup table for the heatmap.
pub static INFERNO_LUT: [[u8; 3]; 256] = compute_inferno_lut();

const fn compute_inferno_lut() -> [[u8; 3]; 256] {
    let mut lut = [[0u8; 3]; 256];
    let segments = INFERNO_ANCHORS.len() - 1;
    let mut i = 0;
    while i < 256 {
        let position = i as f64 / 255.0 * segments as f64;
        let mut segment = position as usize;
        if segment >= segments {
            segment = segments - 1;
        }
        let t = position - segment as f64;
        let lo = INFERNO_ANCHORS[segment];
        let hi = INFERNO_ANCHORS[segment + 1];
        lut[i] = [
            lerp_u8(lo[0], hi[0], t),
            lerp_u8(lo[1], hi[1], t),
            lerp_u8(lo[2], hi[2], t),
        ];
        i += 1;
    }
    lut
}

const fn lerp_u8(lo: f64, hi: f64, t: f64) -> u8 {
    let v = lo + (hi - lo) * t;
    if v <= 0.0 {
        0
    } else if v >= 255.0 {
        255
    } else {
        v as u8
    }
}
