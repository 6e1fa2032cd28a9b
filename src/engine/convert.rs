use rayon::prelude::*;

use crate::foundation::error::{EncoderError, EncoderResult};

/// Byte length of a planar YUV 4:2:0 frame.
pub fn yuv420_len(width: usize, height: usize) -> usize {
    width * height * 3 / 2
}

/// Convert packed RGB(A) into planar YUV 4:2:0 (BT.601, studio swing).
///
/// Output layout is the full Y plane followed by the U and V quarter planes. Chroma is taken
/// from the top-left pixel of each 2x2 block rather than averaged. With `flip_y` the input is
/// read bottom-up. Row pairs are converted in parallel.
pub fn rgb_to_yuv420(
    rgb: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    flip_y: bool,
    yuv: &mut [u8],
) -> EncoderResult<()> {
    if width == 0 || height == 0 || !width.is_multiple_of(2) || !height.is_multiple_of(2) {
        return Err(EncoderError::config(format!(
            "yuv420 conversion needs even, non-zero dimensions (got {width}x{height})"
        )));
    }
    if stride < 3 {
        return Err(EncoderError::config(format!(
            "rgb stride must be >= 3, got {stride}"
        )));
    }
    let rgb_len = width * height * stride;
    let yuv_len = yuv420_len(width, height);
    if rgb.len() < rgb_len || yuv.len() < yuv_len {
        return Err(EncoderError::contract(format!(
            "conversion buffers too small: rgb {} < {rgb_len} or yuv {} < {yuv_len}",
            rgb.len(),
            yuv.len()
        )));
    }

    let row_bytes = width * stride;
    let chroma_width = width / 2;
    let (y_plane, chroma) = yuv[..yuv_len].split_at_mut(width * height);
    let (u_plane, v_plane) = chroma.split_at_mut(chroma_width * (height / 2));

    y_plane
        .par_chunks_mut(2 * width)
        .zip(u_plane.par_chunks_mut(chroma_width))
        .zip(v_plane.par_chunks_mut(chroma_width))
        .enumerate()
        .for_each(|(pair, ((y_rows, u_row), v_row))| {
            for dy in 0..2 {
                let row = pair * 2 + dy;
                let src_row = if flip_y { height - 1 - row } else { row };
                let src = &rgb[src_row * row_bytes..(src_row + 1) * row_bytes];
                let y_out = &mut y_rows[dy * width..(dy + 1) * width];

                for (y, px) in y_out.iter_mut().zip(src.chunks_exact(stride)) {
                    *y = luma(px[0], px[1], px[2]);
                }
                if dy == 0 {
                    for (cx, (u, v)) in u_row.iter_mut().zip(v_row.iter_mut()).enumerate() {
                        let px = &src[2 * cx * stride..2 * cx * stride + 3];
                        *u = chroma_u(px[0], px[1], px[2]);
                        *v = chroma_v(px[0], px[1], px[2]);
                    }
                }
            }
        });
    Ok(())
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    clamp_u8(((66 * r as i32 + 129 * g as i32 + 25 * b as i32) >> 8) + 16)
}

fn chroma_u(r: u8, g: u8, b: u8) -> u8 {
    clamp_u8(((-38 * r as i32 - 74 * g as i32 + 112 * b as i32) >> 8) + 128)
}

fn chroma_v(r: u8, g: u8, b: u8) -> u8 {
    clamp_u8(((112 * r as i32 - 94 * g as i32 - 18 * b as i32) >> 8) + 128)
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/engine/convert.rs"]
mod tests;
