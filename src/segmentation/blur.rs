use image::Luma;

use crate::frame::BinaryMask;

/// Binomial kernels used for sizes 3, 5 and 7 when no sigma is given, in Q16.
const SMALL_KERNELS_Q16: [&[u32]; 3] = [
    &[16384, 32768, 16384],
    &[4096, 16384, 24576, 16384, 4096],
    &[2048, 7168, 14336, 18432, 14336, 7168, 2048],
];

/// Gaussian blur of a single-channel mask with a `ksize` x `ksize` kernel.
///
/// Sizes 3, 5 and 7 use fixed binomial weights; larger sizes derive sigma
/// from the kernel size (`0.3 * ((k - 1) / 2 - 1) + 0.8`). Borders are
/// mirrored without repeating the edge pixel. Even sizes are bumped to the
/// next odd size; 0 and 1 return the input unchanged.
pub fn gaussian_blur_mask(mask: &BinaryMask, ksize: u32) -> BinaryMask {
    if ksize <= 1 {
        return mask.clone();
    }
    let kernel = kernel_for_size(ksize | 1);

    let (w, h) = mask.dimensions();
    let tmp = BinaryMask::from_fn(w, h, |x, y| {
        Luma([convolve(&kernel, |d| {
            mask.get_pixel(reflect_101(i64::from(x) + d, w), y)[0]
        })])
    });
    BinaryMask::from_fn(w, h, |x, y| {
        Luma([convolve(&kernel, |d| {
            tmp.get_pixel(x, reflect_101(i64::from(y) + d, h))[0]
        })])
    })
}

pub fn auto_sigma(ksize: u32) -> f64 {
    0.3 * ((f64::from(ksize) - 1.0) * 0.5 - 1.0) + 0.8
}

fn kernel_for_size(ksize: u32) -> Vec<u32> {
    match ksize {
        3 | 5 | 7 => SMALL_KERNELS_Q16[(ksize / 2 - 1) as usize].to_vec(),
        _ => gaussian_kernel_q16(ksize / 2, auto_sigma(ksize)),
    }
}

fn convolve(kernel: &[u32], sample: impl Fn(i64) -> u8) -> u8 {
    let radius = (kernel.len() / 2) as i64;
    let acc: u64 = kernel
        .iter()
        .enumerate()
        .map(|(ki, &kw)| u64::from(kw) * u64::from(sample(ki as i64 - radius)))
        .sum();
    q16_to_u8(acc)
}

/// Mirror `i` into `0..len` without duplicating the border sample.
fn reflect_101(mut i: i64, len: u32) -> u32 {
    let len = i64::from(len);
    if len == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * len - 2 - i;
        } else {
            return i as u32;
        }
    }
}

fn gaussian_kernel_q16(radius: u32, sigma: f64) -> Vec<u32> {
    let r = radius as i32;
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();

    // keep the kernel summing to exactly 1.0 in Q16
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    weights
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}
