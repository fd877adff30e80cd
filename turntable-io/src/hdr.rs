//! Radiance `.hdr` environment maps

use crate::{IoError, Result};
use image::codecs::hdr::HdrDecoder;
use std::io::Cursor;
use tracing::debug;
use turntable_core::EnvironmentMap;

/// Width the equirectangular image is reduced to before SH projection
pub const PROBE_WIDTH: u32 = 256;

/// Decode an equirectangular RGBE image into a diffuse lighting probe
pub fn read_environment(bytes: &[u8]) -> Result<EnvironmentMap> {
    let decoder = HdrDecoder::new(Cursor::new(bytes))?;
    let meta = decoder.metadata();
    let (width, height) = (meta.width, meta.height);
    let pixels: Vec<[f32; 3]> = decoder.read_image_hdr()?.into_iter().map(|p| p.0).collect();

    let (w, h, reduced) = downsample(width, height, &pixels, PROBE_WIDTH);
    debug!(width, height, probe_width = w, probe_height = h, "projecting environment");

    EnvironmentMap::from_equirect(w, h, &reduced)
        .map(|mut env| {
            env.source_size = (width, height);
            env
        })
        .ok_or_else(|| IoError::parse(format!("environment image {}x{} has no pixels", width, height)))
}

/// Box-filter by an integer factor so the width is at most `max_width`
fn downsample(width: u32, height: u32, pixels: &[[f32; 3]], max_width: u32) -> (u32, u32, Vec<[f32; 3]>) {
    let factor = width.div_ceil(max_width.max(1)).max(1);
    if factor == 1 {
        return (width, height, pixels.to_vec());
    }

    let (w, h) = ((width / factor).max(1), (height / factor).max(1));
    let mut out = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let mut sum = [0.0f32; 3];
            let mut count = 0.0;
            for sy in y * factor..((y + 1) * factor).min(height) {
                for sx in x * factor..((x + 1) * factor).min(width) {
                    let p = pixels[(sy * width + sx) as usize];
                    if p.iter().all(|c| c.is_finite()) {
                        sum.iter_mut().zip(p).for_each(|(s, c)| *s += c);
                        count += 1.0;
                    }
                }
            }
            out.push(if count > 0.0 { sum.map(|s| s / count) } else { [0.0; 3] });
        }
    }
    (w, h, out)
}
