//! Training-time augmentation on normalized, channel-major samples.

use rand::Rng;

use crate::data::dataset::ImageShape;

/// Random crop with padding followed by a random horizontal flip.
#[derive(Debug, Clone)]
pub struct Augmentation {
    pub padding: usize,
    pub flip_probability: f64,
    /// Per-channel value used for padded pixels. For normalized data this is
    /// the normalized value of black, so padding looks like a zero pixel.
    pub fill: Vec<f64>,
}

impl Augmentation {
    pub fn standard(fill: Vec<f64>) -> Self {
        Augmentation { padding: 4, flip_probability: 0.5, fill }
    }

    pub fn apply<R: Rng + ?Sized>(&self, sample: &[f64], shape: ImageShape, rng: &mut R) -> Vec<f64> {
        let top = rng.gen_range(0..=2 * self.padding);
        let left = rng.gen_range(0..=2 * self.padding);
        let cropped = self.crop(sample, shape, top, left);
        if rng.gen::<f64>() < self.flip_probability {
            horizontal_flip(&cropped, shape)
        } else {
            cropped
        }
    }

    /// Crops the padded image at offset (top, left) back to the original size.
    fn crop(&self, sample: &[f64], shape: ImageShape, top: usize, left: usize) -> Vec<f64> {
        let ImageShape { channels, height, width } = shape;
        let pad = self.padding as isize;
        let mut out = Vec::with_capacity(sample.len());
        for c in 0..channels {
            let fill = self.fill.get(c).copied().unwrap_or(0.0);
            for y in 0..height {
                let sy = y as isize + top as isize - pad;
                for x in 0..width {
                    let sx = x as isize + left as isize - pad;
                    let inside = sy >= 0 && sy < height as isize && sx >= 0 && sx < width as isize;
                    out.push(if inside {
                        sample[c * height * width + sy as usize * width + sx as usize]
                    } else {
                        fill
                    });
                }
            }
        }
        out
    }
}

/// Mirrors every row of every channel.
pub fn horizontal_flip(sample: &[f64], shape: ImageShape) -> Vec<f64> {
    let ImageShape { channels, height, width } = shape;
    let mut out = Vec::with_capacity(sample.len());
    for c in 0..channels {
        for y in 0..height {
            let row = c * height * width + y * width;
            out.extend(sample[row..row + width].iter().rev());
        }
    }
    out
}
