//! Frame timing, the pixel buffer and the per-frame render loop.
//!
//! The loop is written against three small collaborator traits so the same
//! driver runs in a window and headless:
//! - [`Clock`] supplies monotonic elapsed time
//! - [`Surface`] receives finished frames and signals when to stop
//! - [`Surface::report`] receives the periodic [`Status`] line
//!
//! Each frame is fully rendered before it is presented, and termination is
//! only checked between frames.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::hull::PlaneSet;
use crate::orientation::Tumble;
use crate::output;
use crate::settings::Settings;
use crate::trace::{self, Scene};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::geom::Solid;
    use crate::settings::{load_default_config, Headless};

    /// Records presented frames and stops after a fixed number.
    struct CountingSurface {
        limit: u64,
        presented: Vec<Vec<u32>>,
        reports: Vec<Status>,
    }

    impl Surface for CountingSurface {
        fn present(&mut self, frame: &PixelBuffer) -> Result<()> {
            self.presented.push(frame.pixels().to_vec());
            Ok(())
        }

        fn termination_requested(&mut self) -> bool {
            self.presented.len() as u64 >= self.limit
        }

        fn report(&mut self, status: &Status) {
            self.reports.push(status.clone());
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    /// Reports into a sink that always fails.
    struct ClosedOutputSurface {
        limit: u64,
        presented: u64,
        reports: u64,
        sink: BrokenPipe,
    }

    impl Surface for ClosedOutputSurface {
        fn present(&mut self, _frame: &PixelBuffer) -> Result<()> {
            self.presented += 1;
            Ok(())
        }

        fn termination_requested(&mut self) -> bool {
            self.presented >= self.limit
        }

        fn report(&mut self, status: &Status) {
            self.reports += 1;
            emit_status(&mut self.sink, status);
        }
    }

    fn small_settings() -> Settings {
        let mut settings = load_default_config().unwrap();
        settings.width = 40;
        settings.height = 30;
        settings.screen_scale = 15.0;
        settings
    }

    #[test]
    fn buffer_indexing() {
        let mut buffer = PixelBuffer::new(4, 3);
        assert_eq!(buffer.pixels().len(), 12);
        buffer.set(3, 2, 0xABCDEF);
        assert_eq!(buffer.get(3, 2), Some(0xABCDEF));
        assert_eq!(buffer.pixels()[11], 0xABCDEF);
        assert_eq!(buffer.get(4, 0), None);

        let mut rgba = Vec::new();
        buffer.write_rgba8(&mut rgba);
        assert_eq!(rgba.len(), 48);
        assert_eq!(&rgba[44..], &[0xAB, 0xCD, 0xEF, 0xFF]);
    }

    #[test]
    fn warns_on_plane_count() {
        let planes = PlaneSet::extract(&Solid::Dodecahedron.scaled_vertices(0.5), 30);
        assert!(plane_count_warning(&planes, 12).is_none());
        assert!(plane_count_warning(&planes, 20).is_some());

        let truncated = PlaneSet::extract(&Solid::Dodecahedron.scaled_vertices(0.5), 10);
        let warning = plane_count_warning(&truncated, 12).unwrap();
        assert!(warning.contains("dropped"), "warning: {}", warning);
    }

    #[test]
    fn stats_report_once_per_interval() {
        let mut stats = FrameStats::new(1.0, 0.0);
        assert!(stats.tick(0.25, 0.25, 12).is_none());
        assert!(stats.tick(0.5, 0.5, 12).is_none());
        assert!(stats.tick(0.75, 0.75, 12).is_none());
        let status = stats.tick(1.0, 1.0, 12).unwrap();
        assert_eq!(status.frames, 4);
        assert!((status.fps - 4.0).abs() < 1e-12);
        assert_eq!(status.planes, 12);
        // counter starts over after a report
        assert!(stats.tick(1.5, 1.5, 12).is_none());
        let status = stats.tick(2.0, 2.0, 12).unwrap();
        assert_eq!(status.frames, 2);
    }

    #[test]
    fn status_line() {
        let status = Status {
            fps: 59.876,
            angle: 3.14159,
            frames: 60,
            planes: 12,
        };
        assert_eq!(
            status.to_string(),
            "FPS: 59.88 | Angle: 3.14 rad | Frames: 60 | Planes: 12"
        );
    }

    #[test]
    fn fixed_step_clock() {
        let mut clock = FixedStepClock::new(0.5);
        assert_eq!(clock.elapsed_seconds(), 0.0);
        clock.advance();
        clock.advance();
        assert_eq!(clock.elapsed_seconds(), 1.0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.elapsed_seconds();
        let second = clock.elapsed_seconds();
        assert!(first >= 0.0);
        assert!(second >= first);
    }

    #[test]
    fn draw_uses_elapsed_time_as_angle() {
        let settings = small_settings();
        let renderer = Renderer::new(&settings);
        let mut buffer = PixelBuffer::new(settings.width, settings.height);
        let tumble = renderer.draw(2.0, &mut buffer);
        assert_eq!(tumble.angle, 2.0);

        let expected = renderer.base_planes().rotated(&Tumble::new(2.0));
        let mut reference = PixelBuffer::new(settings.width, settings.height);
        trace::render(expected.as_slice(), renderer.scene(), &mut reference, false);
        assert_eq!(buffer, reference);
    }

    #[test]
    fn driver_stops_cooperatively() {
        let settings = small_settings();
        let mut driver = FrameDriver::new(Renderer::new(&settings), 0.5, 0.0);
        let mut clock = FixedStepClock::new(0.25);
        let mut surface = CountingSurface {
            limit: 5,
            presented: Vec::new(),
            reports: Vec::new(),
        };
        let mut buffer = PixelBuffer::new(settings.width, settings.height);

        let frames = driver.run(&mut clock, &mut surface, &mut buffer).unwrap();
        assert_eq!(frames, 5);
        assert_eq!(surface.presented.len(), 5);
        // the solid moves between frames
        assert_ne!(surface.presented[0], surface.presented[4]);
        // frames at t = 0, .25, .5, .75, 1 report at .5 and 1
        assert_eq!(surface.reports.len(), 2);
        assert!(surface.reports.iter().all(|s| s.planes == 12));
    }

    #[test]
    fn failed_reports_do_not_stop_rendering() {
        let settings = small_settings();
        let mut driver = FrameDriver::new(Renderer::new(&settings), 0.25, 0.0);
        let mut clock = FixedStepClock::new(0.25);
        let mut surface = ClosedOutputSurface {
            limit: 10,
            presented: 0,
            reports: 0,
            sink: BrokenPipe,
        };
        let mut buffer = PixelBuffer::new(settings.width, settings.height);

        let frames = driver.run(&mut clock, &mut surface, &mut buffer).unwrap();
        assert_eq!(frames, 10);
        assert_eq!(surface.presented, 10);
        // every frame after the first closes an interval
        assert_eq!(surface.reports, 9);
    }

    #[test]
    fn wall_clock_paces_reports() {
        let settings = small_settings();
        // a whole second of animation per frame, rendered far faster than that
        let mut driver =
            FrameDriver::new(Renderer::new(&settings), 1.0, 0.0).with_wall_clock(SystemClock::new());
        let mut clock = FixedStepClock::new(1.0);
        let mut surface = CountingSurface {
            limit: 5,
            presented: Vec::new(),
            reports: Vec::new(),
        };
        let mut buffer = PixelBuffer::new(settings.width, settings.height);

        assert_eq!(driver.run(&mut clock, &mut surface, &mut buffer).unwrap(), 5);
        assert!(surface.reports.is_empty());
        // the solid still advances by the animation step
        assert_ne!(surface.presented[0], surface.presented[1]);
    }

    #[test]
    fn headless_snapshots() {
        let dir = std::env::temp_dir().join(format!("dodeca-frames-{}", std::process::id()));
        let mut settings = small_settings();
        settings.headless = Some(Headless {
            frames: 4,
            step: 0.1,
            snapshot_dir: Some(dir.clone()),
            snapshot_every: 2,
        });
        let renderer = Renderer::new(&settings);
        let frames = run_headless(renderer, &settings).unwrap();
        assert_eq!(frames, 4);
        assert!(dir.join("frame_00000.ppm").exists());
        assert!(!dir.join("frame_00001.ppm").exists());
        assert!(dir.join("frame_00002.ppm").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

/// A packed `0x00RRGGBB` image, row-major from the top-left corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    pub fn set(&mut self, x: usize, y: usize, color: u32) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({}, {}) outside {}x{} buffer",
            x,
            y,
            self.width,
            self.height
        );
        self.pixels[y * self.width + x] = color;
    }

    /// Writes the frame as opaque RGBA bytes into `out`, reusing its allocation.
    pub fn write_rgba8(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.pixels.len() * 4);
        for &p in &self.pixels {
            out.extend_from_slice(&[(p >> 16) as u8, (p >> 8) as u8, p as u8, 0xFF]);
        }
    }
}

/// Source of monotonic elapsed time in seconds.
pub trait Clock {
    fn elapsed_seconds(&self) -> f64;

    /// Called once after every presented frame.
    fn advance(&mut self) {}
}

/// Wall-clock time since construction.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Simulated time advancing by a fixed step per frame.
pub struct FixedStepClock {
    step: f64,
    ticks: u64,
}

impl FixedStepClock {
    pub fn new(step: f64) -> Self {
        Self { step, ticks: 0 }
    }
}

impl Clock for FixedStepClock {
    fn elapsed_seconds(&self) -> f64 {
        self.ticks as f64 * self.step
    }

    fn advance(&mut self) {
        self.ticks += 1;
    }
}

/// Where finished frames go.
pub trait Surface {
    /// Hands a completed frame to the display. Errors abort the run.
    fn present(&mut self, frame: &PixelBuffer) -> Result<()>;

    /// Non-blocking check for a quit request.
    fn termination_requested(&mut self) -> bool;

    /// Best-effort diagnostic output.
    fn report(&mut self, status: &Status) {
        emit_status(&mut io::stdout().lock(), status);
    }
}

/// Writes `status` as one line to `out`. Write failures are ignored so a
/// closed terminal never interrupts rendering.
pub fn emit_status<W: Write + ?Sized>(out: &mut W, status: &Status) {
    let _ = writeln!(out, "{}", status);
}

/// Periodic frame-rate summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub fps: f64,
    pub angle: f64,
    pub frames: u64,
    pub planes: usize,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FPS: {:.2} | Angle: {:.2} rad | Frames: {} | Planes: {}",
            self.fps, self.angle, self.frames, self.planes
        )
    }
}

/// Counts frames and produces a [`Status`] at most once per interval.
#[derive(Debug, Clone)]
pub struct FrameStats {
    interval: f64,
    last_report: f64,
    frames: u64,
}

impl FrameStats {
    pub fn new(interval: f64, start: f64) -> Self {
        Self {
            interval,
            last_report: start,
            frames: 0,
        }
    }

    /// Records a frame drawn at time `now`.
    pub fn tick(&mut self, now: f64, angle: f64, planes: usize) -> Option<Status> {
        self.frames += 1;
        let elapsed = now - self.last_report;
        if elapsed < self.interval {
            return None;
        }

        let status = Status {
            fps: self.frames as f64 / elapsed,
            angle,
            frames: self.frames,
            planes,
        };
        self.last_report = now;
        self.frames = 0;
        Some(status)
    }
}

/// The base planes of the solid and everything needed to shade them.
#[derive(Debug, Clone)]
pub struct Renderer {
    base: PlaneSet,
    scene: Scene,
    parallel: bool,
}

impl Renderer {
    /// Extracts the solid's planes once and warns if the count looks wrong.
    pub fn new(settings: &Settings) -> Self {
        let points = settings.points();
        let base = PlaneSet::extract(&points, settings.max_planes);
        println!(
            "Extracted {} planes from {} vertices of a {}",
            base.len(),
            points.len(),
            settings.solid
        );
        if let Some(warning) = plane_count_warning(&base, settings.solid.expected_faces()) {
            eprintln!("Warning: {}", warning);
        }

        Self::from_planes(base, settings.scene(), settings.parallel)
    }

    pub fn from_planes(base: PlaneSet, scene: Scene, parallel: bool) -> Self {
        Self {
            base,
            scene,
            parallel,
        }
    }

    pub fn base_planes(&self) -> &PlaneSet {
        &self.base
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Renders the solid as it appears `elapsed` seconds into the animation.
    /// Elapsed time is used directly as the tumble angle in radians.
    pub fn draw(&self, elapsed: f64, buffer: &mut PixelBuffer) -> Tumble {
        let tumble = Tumble::new(elapsed);
        let rotated = self.base.rotated(&tumble);
        trace::render(rotated.as_slice(), &self.scene, buffer, self.parallel);
        tumble
    }
}

/// Describes what is wrong with an extracted plane set, if anything.
pub fn plane_count_warning(planes: &PlaneSet, expected: usize) -> Option<String> {
    if planes.dropped() > 0 {
        return Some(format!(
            "Expected {} planes, but got {} ({} dropped at capacity {})",
            expected,
            planes.len() + planes.dropped(),
            planes.dropped(),
            planes.capacity()
        ));
    }
    if planes.len() != expected {
        return Some(format!(
            "Expected {} planes, but got {}",
            expected,
            planes.len()
        ));
    }
    None
}

/// Runs frames until the surface asks to stop.
pub struct FrameDriver {
    renderer: Renderer,
    stats: FrameStats,
    frames: u64,
    wall: Option<SystemClock>,
}

impl FrameDriver {
    pub fn new(renderer: Renderer, report_interval: f64, start: f64) -> Self {
        Self {
            renderer,
            stats: FrameStats::new(report_interval, start),
            frames: 0,
            wall: None,
        }
    }

    /// Times the frame rate against `wall` instead of the animation clock.
    pub fn with_wall_clock(mut self, wall: SystemClock) -> Self {
        self.stats = FrameStats::new(self.stats.interval, wall.elapsed_seconds());
        self.wall = Some(wall);
        self
    }

    /// Total frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Draws and presents one frame. Returns `false` without drawing once
    /// the surface has asked to stop.
    pub fn step<C, S>(&mut self, clock: &mut C, surface: &mut S, buffer: &mut PixelBuffer) -> Result<bool>
    where
        C: Clock + ?Sized,
        S: Surface + ?Sized,
    {
        if surface.termination_requested() {
            return Ok(false);
        }

        let now = clock.elapsed_seconds();
        let tumble = self.renderer.draw(now, buffer);
        surface.present(buffer)?;
        clock.advance();
        self.frames += 1;

        let stamp = self.wall.as_ref().map_or(now, |wall| wall.elapsed_seconds());
        if let Some(status) = self.stats.tick(stamp, tumble.angle, self.renderer.base.len()) {
            surface.report(&status);
        }

        Ok(true)
    }

    pub fn run<C, S>(&mut self, clock: &mut C, surface: &mut S, buffer: &mut PixelBuffer) -> Result<u64>
    where
        C: Clock + ?Sized,
        S: Surface + ?Sized,
    {
        while self.step(clock, surface, buffer)? {}
        Ok(self.frames)
    }
}

/// Headless surface: counts frames, shows progress and writes snapshots.
struct SnapshotSurface {
    total: u64,
    presented: u64,
    every: u64,
    dir: Option<PathBuf>,
    pb: ProgressBar,
}

impl Surface for SnapshotSurface {
    fn present(&mut self, frame: &PixelBuffer) -> Result<()> {
        if let Some(dir) = &self.dir {
            if self.presented % self.every == 0 {
                let path = dir.join(format!("frame_{:05}.ppm", self.presented));
                output::write_ppm(&path, frame)?;
            }
        }
        self.presented += 1;
        self.pb.inc(1);
        Ok(())
    }

    fn termination_requested(&mut self) -> bool {
        self.presented >= self.total
    }

    fn report(&mut self, status: &Status) {
        self.pb.println(status.to_string());
    }
}

/// Renders the configured number of frames at a fixed time step, without a
/// window. Returns the number of frames rendered.
pub fn run_headless(renderer: Renderer, settings: &Settings) -> Result<u64> {
    let headless = settings.headless.clone().unwrap_or_default();
    let start = Instant::now();

    if let Some(dir) = &headless.snapshot_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create snapshot directory {:?}", dir))?;
    }

    let pb = ProgressBar::new(headless.frames);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
        )?
        .progress_chars("█▇▆▅▄▃▂▁"),
    );
    pb.set_message("frame".to_string());

    let mut surface = SnapshotSurface {
        total: headless.frames,
        presented: 0,
        every: headless.snapshot_every.max(1),
        dir: headless.snapshot_dir.clone(),
        pb,
    };
    let mut clock = FixedStepClock::new(headless.step);
    let mut buffer = PixelBuffer::new(settings.width, settings.height);
    // animation advances by the fixed step, the reported rate is real
    let mut driver = FrameDriver::new(renderer, settings.report_interval, clock.elapsed_seconds())
        .with_wall_clock(SystemClock::new());

    let frames = driver.run(&mut clock, &mut surface, &mut buffer)?;
    surface.pb.finish();

    let duration = start.elapsed();
    if frames > 0 {
        println!(
            "Time taken: {:.2?}, Time per frame: {:.2?}",
            duration,
            duration.div_f64(frames as f64)
        );
    }

    Ok(frames)
}

/// One-line summary of what is being rendered.
pub fn describe(settings: &Settings) -> String {
    let threads = if settings.parallel {
        rayon::current_num_threads()
    } else {
        1
    };
    format!(
        "{} at {}x{} on {} thread(s)",
        settings.solid, settings.width, settings.height, threads
    )
}
