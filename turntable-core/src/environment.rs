//! Image-based environment lighting reduced to a spherical-harmonic probe

use crate::point::Vector3f;
use std::f32::consts::PI;

/// Number of coefficients in an order-2 (three band) SH expansion
pub const SH_COEFFICIENTS: usize = 9;

/// Diffuse environment lighting as nine pre-convolved RGB SH coefficients.
///
/// `irradiance(n)` returns the outgoing radiance of a white Lambertian surface
/// with normal `n`, so a uniform environment of radiance `L` evaluates to `L`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentMap {
    pub coefficients: [[f32; 3]; SH_COEFFICIENTS],
    /// Pixel size of the equirectangular source the probe was built from
    pub source_size: (u32, u32),
}

fn sh_basis(d: &Vector3f) -> [f32; SH_COEFFICIENTS] {
    let (x, y, z) = (d.x, d.y, d.z);
    [
        0.282_095,
        0.488_603 * y,
        0.488_603 * z,
        0.488_603 * x,
        1.092_548 * x * y,
        1.092_548 * y * z,
        0.315_392 * (3.0 * z * z - 1.0),
        1.092_548 * x * z,
        0.546_274 * (x * x - y * y),
    ]
}

/// Cosine-lobe convolution per band, divided by PI
const BAND_WEIGHTS: [f32; SH_COEFFICIENTS] = [
    1.0,
    2.0 / 3.0,
    2.0 / 3.0,
    2.0 / 3.0,
    0.25,
    0.25,
    0.25,
    0.25,
    0.25,
];

/// Direction through the centre of an equirectangular texel.
/// Row 0 is the zenith (+Y); column 0 starts at azimuth -PI.
pub fn equirect_direction(col: u32, row: u32, width: u32, height: u32) -> Vector3f {
    let theta = PI * (row as f32 + 0.5) / height as f32;
    let phi = 2.0 * PI * (col as f32 + 0.5) / width as f32 - PI;
    Vector3f::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
}

impl EnvironmentMap {
    /// Uniform environment of the given linear radiance
    pub fn uniform(radiance: [f32; 3]) -> Self {
        let mut coefficients = [[0.0; 3]; SH_COEFFICIENTS];
        // L00 of a constant field; band 0 has unit weight
        for (c, r) in coefficients[0].iter_mut().zip(radiance) {
            *c = r * 4.0 * PI * 0.282_095;
        }
        Self {
            coefficients,
            source_size: (1, 1),
        }
    }

    /// Project an equirectangular image of linear RGB radiance.
    ///
    /// Returns `None` when `pixels` does not match `width * height`.
    pub fn from_equirect(width: u32, height: u32, pixels: &[[f32; 3]]) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != (width as usize) * (height as usize) {
            return None;
        }

        let mut coefficients = [[0.0f32; 3]; SH_COEFFICIENTS];
        let texel_angle = (2.0 * PI / width as f32) * (PI / height as f32);

        for row in 0..height {
            let theta = PI * (row as f32 + 0.5) / height as f32;
            let weight = texel_angle * theta.sin();
            for col in 0..width {
                let radiance = pixels[(row * width + col) as usize];
                if !radiance.iter().all(|c| c.is_finite()) {
                    continue;
                }
                let basis = sh_basis(&equirect_direction(col, row, width, height));
                for (coefficient, y) in coefficients.iter_mut().zip(basis) {
                    for channel in 0..3 {
                        coefficient[channel] += radiance[channel] * y * weight;
                    }
                }
            }
        }

        for (coefficient, band) in coefficients.iter_mut().zip(BAND_WEIGHTS) {
            for channel in coefficient.iter_mut() {
                *channel *= band;
            }
        }

        Some(Self {
            coefficients,
            source_size: (width, height),
        })
    }

    /// Diffuse radiance for a surface facing `normal`
    pub fn irradiance(&self, normal: &Vector3f) -> [f32; 3] {
        let n = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::y);
        let basis = sh_basis(&n);
        let mut out = [0.0; 3];
        for (coefficient, y) in self.coefficients.iter().zip(basis) {
            for channel in 0..3 {
                out[channel] += coefficient[channel] * y;
            }
        }
        out.map(|c| c.max(0.0))
    }
}
