use std::path::Path;
use std::{fs::File, io::BufWriter};

use anyhow::{Context, Result};
use std::io::Write;

use crate::frame::PixelBuffer;


/// Writes a frame as a binary (P6) PPM image.
pub fn write_ppm(path: &Path, buffer: &PixelBuffer) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);

    write!(writer, "P6\n{} {}\n255\n", buffer.width(), buffer.height())?;
    for &p in buffer.pixels() {
        writer.write_all(&[(p >> 16) as u8, (p >> 8) as u8, p as u8])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {:?}", path))?;

    Ok(())
}
