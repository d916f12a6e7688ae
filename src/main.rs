use anyhow::Result;
use dodeca::frame::{self, Renderer};
use dodeca::settings::{self, Settings};

fn main() -> Result<()> {
    let settings = settings::load_config()?;
    println!("{}", settings);
    println!("Rendering {}", frame::describe(&settings));

    let renderer = Renderer::new(&settings);

    if settings.headless.is_some() {
        frame::run_headless(renderer, &settings)?;
        return Ok(());
    }

    run_windowed(renderer, settings)
}

#[cfg(feature = "visualization")]
fn run_windowed(renderer: Renderer, settings: Settings) -> Result<()> {
    dodeca::helpers::open_window(renderer, settings)
}

#[cfg(not(feature = "visualization"))]
fn run_windowed(_renderer: Renderer, _settings: Settings) -> Result<()> {
    anyhow::bail!("built without the `visualization` feature, run with --headless")
}
