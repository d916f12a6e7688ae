//! Window presentation with macroquad.
//!
//! Each rendered [`PixelBuffer`] is uploaded into one streaming texture and
//! stretched over the window. Escape or Q closes the window after the current
//! frame.

use anyhow::{Context, Result};
use macroquad::prelude::*;
use macroquad::Window;

use crate::frame::{Clock, FrameDriver, PixelBuffer, Renderer, Surface};
use crate::settings::Settings;

/// Seconds since the window opened, as reported by macroquad.
pub struct WindowClock;

impl Clock for WindowClock {
    fn elapsed_seconds(&self) -> f64 {
        get_time()
    }
}

/// Presents frames through a texture the size of the pixel buffer.
pub struct WindowSurface {
    texture: Texture2D,
    rgba: Vec<u8>,
    width: u16,
    height: u16,
}

impl WindowSurface {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let (width, height) = texture_size(width, height)?;
        let rgba = vec![0; width as usize * height as usize * 4];
        let texture = Texture2D::from_rgba8(width, height, &rgba);
        texture.set_filter(FilterMode::Nearest);

        Ok(Self {
            texture,
            rgba,
            width,
            height,
        })
    }
}

impl Surface for WindowSurface {
    fn present(&mut self, frame: &PixelBuffer) -> Result<()> {
        frame.write_rgba8(&mut self.rgba);
        self.texture
            .update_from_bytes(self.width as u32, self.height as u32, &self.rgba);

        clear_background(BLACK);
        draw_texture_ex(
            &self.texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(screen_width(), screen_height())),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn termination_requested(&mut self) -> bool {
        is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q)
    }
}

fn texture_size(width: usize, height: usize) -> Result<(u16, u16)> {
    let w = u16::try_from(width).context("Window width does not fit a texture")?;
    let h = u16::try_from(height).context("Window height does not fit a texture")?;
    Ok((w, h))
}

fn window_conf(settings: &Settings) -> Result<Conf> {
    let (width, height) = texture_size(settings.width, settings.height)?;
    Ok(Conf {
        window_title: "Dodecahedron".to_owned(),
        window_width: width as i32,
        window_height: height as i32,
        window_resizable: false,
        ..Default::default()
    })
}

/// Opens a window and renders into it until it is closed.
/// Failures inside the window loop are fatal for the process.
pub fn open_window(renderer: Renderer, settings: Settings) -> Result<()> {
    let conf = window_conf(&settings)?;

    Window::from_config(conf, async move {
        if let Err(err) = run_window(renderer, &settings).await {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    });

    Ok(())
}

async fn run_window(renderer: Renderer, settings: &Settings) -> Result<()> {
    let mut surface = WindowSurface::new(settings.width, settings.height)?;
    let mut clock = WindowClock;
    let mut buffer = PixelBuffer::new(settings.width, settings.height);
    let mut driver = FrameDriver::new(renderer, settings.report_interval, clock.elapsed_seconds());

    while driver.step(&mut clock, &mut surface, &mut buffer)? {
        next_frame().await;
    }

    println!("Closed after {} frames", driver.frames());
    Ok(())
}
