//! Sample coding used by the reference engine: PackBits run-length coding over either the raw
//! frame (key frames) or its XOR against the previous frame (delta frames).

use crate::foundation::error::{EncoderError, EncoderResult};

const MAX_RUN: usize = 128;

/// Append the PackBits encoding of `src` to `out`.
pub(crate) fn packbits_encode(src: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < src.len() {
        let mut run = 1;
        while i + run < src.len() && run < MAX_RUN && src[i + run] == src[i] {
            run += 1;
        }
        if run >= 2 {
            out.push((1 - run as i16) as i8 as u8);
            out.push(src[i]);
            i += run;
            continue;
        }

        let start = i;
        while i < src.len() && i - start < MAX_RUN {
            if i + 2 < src.len() && src[i] == src[i + 1] && src[i] == src[i + 2] {
                break;
            }
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&src[start..i]);
    }
}

/// Append the decoding of a PackBits stream to `out`.
pub(crate) fn packbits_decode(src: &[u8], out: &mut Vec<u8>) -> EncoderResult<()> {
    let mut i = 0;
    while i < src.len() {
        let header = src[i] as i8;
        i += 1;
        match header {
            0..=127 => {
                let len = header as usize + 1;
                let literal = src.get(i..i + len).ok_or_else(truncated)?;
                out.extend_from_slice(literal);
                i += len;
            }
            -128 => {}
            _ => {
                let count = (1 - header as i16) as usize;
                let byte = *src.get(i).ok_or_else(truncated)?;
                out.resize(out.len() + count, byte);
                i += 1;
            }
        }
    }
    Ok(())
}

/// `dst[i] = a[i] ^ b[i]`.
pub(crate) fn xor_into(dst: &mut [u8], a: &[u8], b: &[u8]) {
    for ((d, x), y) in dst.iter_mut().zip(a).zip(b) {
        *d = x ^ y;
    }
}

fn truncated() -> EncoderError {
    EncoderError::engine("truncated run-length sample")
}

#[cfg(test)]
#[path = "../../tests/unit/engine/codec.rs"]
mod tests;
