//! ISO-BMFF style box layout written by the reference engine.
//!
//! ```text
//! ftyp                       brand `isom`
//! mdat                       one box, size patched at finalize (or one box per sample when
//!                            the stream is written sequentially)
//! moov
//!   rhdr                     width, height, fps, gop, frame count
//!   stsz                     per-sample byte sizes
//!   stss                     1-based key frame numbers
//! ```

use crate::foundation::error::{EncoderError, EncoderResult};

use super::codec::{packbits_decode, xor_into};

pub(crate) const BOX_HEADER_LEN: u64 = 8;
pub(crate) const FTYP_LEN: u64 = 24;
pub(crate) const SAMPLE_KEY: u8 = 0x01;
pub(crate) const SAMPLE_DELTA: u8 = 0x00;

/// Stream parameters stored in the `rhdr` box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamHeader {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Key frame interval.
    pub group_of_pictures: u32,
    /// Number of samples in the stream.
    pub frame_count: u32,
}

pub(crate) fn box_header(kind: &[u8; 4], size: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&size.to_be_bytes());
    out[4..].copy_from_slice(kind);
    out
}

fn full_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let size = BOX_HEADER_LEN as usize + 4 + payload.len();
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&box_header(kind, size as u32));
    // version 0, flags 0
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(payload);
    out
}

pub(crate) fn ftyp() -> Vec<u8> {
    let mut out = Vec::with_capacity(FTYP_LEN as usize);
    out.extend_from_slice(&box_header(b"ftyp", FTYP_LEN as u32));
    out.extend_from_slice(b"isom");
    out.extend_from_slice(&0x200u32.to_be_bytes());
    out.extend_from_slice(b"isom");
    out.extend_from_slice(b"mp41");
    out
}

pub(crate) fn moov(header: &StreamHeader, sample_sizes: &[u32], sync_samples: &[u32]) -> Vec<u8> {
    let words = |values: &[u32]| -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    };

    let rhdr = full_box(
        b"rhdr",
        &words(&[
            header.width,
            header.height,
            header.fps,
            header.group_of_pictures,
            header.frame_count,
        ]),
    );
    let mut stsz_payload = words(&[0, sample_sizes.len() as u32]);
    stsz_payload.extend(words(sample_sizes));
    let stsz = full_box(b"stsz", &stsz_payload);
    let mut stss_payload = words(&[sync_samples.len() as u32]);
    stss_payload.extend(words(sync_samples));
    let stss = full_box(b"stss", &stss_payload);

    let size = BOX_HEADER_LEN as usize + rhdr.len() + stsz.len() + stss.len();
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&box_header(b"moov", size as u32));
    out.extend(rhdr);
    out.extend(stsz);
    out.extend(stss);
    out
}

/// Parsed reference-engine output.
#[derive(Clone, Debug)]
pub struct ReferenceContainer {
    /// Major brand from `ftyp`.
    pub major_brand: [u8; 4],
    /// Stream parameters from `moov/rhdr`.
    pub header: StreamHeader,
    /// 1-based key frame numbers from `moov/stss`.
    pub sync_samples: Vec<u32>,
    samples: Vec<Vec<u8>>,
}

impl ReferenceContainer {
    /// Parse a complete stream produced by [`ReferenceEngine`](super::reference::ReferenceEngine).
    pub fn parse(bytes: &[u8]) -> EncoderResult<Self> {
        let mut major_brand = None;
        let mut mdat = Vec::new();
        let mut header = None;
        let mut sample_sizes = None;
        let mut sync_samples = None;

        for (kind, payload) in boxes(bytes)? {
            match &kind {
                b"ftyp" => major_brand = payload.get(..4).and_then(|b| b.try_into().ok()),
                b"mdat" => mdat.extend_from_slice(payload),
                b"moov" => {
                    for (child, body) in boxes(payload)? {
                        let body = body.get(4..).ok_or_else(|| malformed("full box"))?;
                        let values = read_words(body)?;
                        match &child {
                            b"rhdr" => {
                                let [width, height, fps, group_of_pictures, frame_count] =
                                    values[..]
                                else {
                                    return Err(malformed("rhdr"));
                                };
                                header = Some(StreamHeader {
                                    width,
                                    height,
                                    fps,
                                    group_of_pictures,
                                    frame_count,
                                });
                            }
                            b"stsz" => sample_sizes = Some(counted(&values, 1)?),
                            b"stss" => sync_samples = Some(counted(&values, 0)?),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        let major_brand = major_brand.ok_or_else(|| malformed("missing ftyp"))?;
        let header = header.ok_or_else(|| malformed("missing moov/rhdr"))?;
        let sample_sizes = sample_sizes.ok_or_else(|| malformed("missing moov/stsz"))?;
        let sync_samples = sync_samples.ok_or_else(|| malformed("missing moov/stss"))?;

        let mut samples = Vec::with_capacity(sample_sizes.len());
        let mut pos = 0usize;
        for size in sample_sizes {
            let end = pos + size as usize;
            let sample = mdat.get(pos..end).ok_or_else(|| malformed("sample past mdat"))?;
            samples.push(sample.to_vec());
            pos = end;
        }

        Ok(Self {
            major_brand,
            header,
            sync_samples,
            samples,
        })
    }

    /// Number of samples.
    pub fn frame_count(&self) -> usize {
        self.samples.len()
    }

    /// Return `true` when sample `index` (0-based) is a key frame.
    pub fn is_key(&self, index: usize) -> bool {
        self.samples
            .get(index)
            .and_then(|s| s.first())
            .is_some_and(|flag| *flag == SAMPLE_KEY)
    }

    /// Reconstruct every frame as planar YUV 4:2:0.
    pub fn decode_frames(&self) -> EncoderResult<Vec<Vec<u8>>> {
        let frame_len = self.header.width as usize * self.header.height as usize * 3 / 2;
        let mut frames: Vec<Vec<u8>> = Vec::with_capacity(self.samples.len());
        let mut decoded = Vec::with_capacity(frame_len);

        for (i, sample) in self.samples.iter().enumerate() {
            let (flag, body) = sample
                .split_first()
                .ok_or_else(|| malformed("empty sample"))?;
            decoded.clear();
            packbits_decode(body, &mut decoded)?;
            if decoded.len() != frame_len {
                return Err(malformed(&format!(
                    "sample {i} decodes to {} bytes, expected {frame_len}",
                    decoded.len()
                )));
            }
            let frame = match (*flag, frames.last()) {
                (SAMPLE_KEY, _) => decoded.clone(),
                (SAMPLE_DELTA, Some(prev)) => {
                    let mut frame = vec![0u8; frame_len];
                    xor_into(&mut frame, &decoded, prev);
                    frame
                }
                _ => return Err(malformed(&format!("sample {i} has no reference frame"))),
            };
            frames.push(frame);
        }
        Ok(frames)
    }
}

fn boxes(mut bytes: &[u8]) -> EncoderResult<Vec<([u8; 4], &[u8])>> {
    let mut out = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < BOX_HEADER_LEN as usize {
            return Err(malformed("truncated box header"));
        }
        let size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let kind = [bytes[4], bytes[5], bytes[6], bytes[7]];
        if size < BOX_HEADER_LEN as usize || size > bytes.len() {
            return Err(malformed(&format!(
                "box '{}' has invalid size {size}",
                String::from_utf8_lossy(&kind)
            )));
        }
        out.push((kind, &bytes[BOX_HEADER_LEN as usize..size]));
        bytes = &bytes[size..];
    }
    Ok(out)
}

fn read_words(bytes: &[u8]) -> EncoderResult<Vec<u32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(malformed("payload is not a whole number of words"));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
        .collect())
}

/// Entries following a count word that sits at `values[count_at]`.
fn counted(values: &[u32], count_at: usize) -> EncoderResult<Vec<u32>> {
    let count = *values.get(count_at).ok_or_else(|| malformed("missing count"))? as usize;
    let entries = &values[count_at + 1..];
    if entries.len() != count {
        return Err(malformed("table length does not match its count"));
    }
    Ok(entries.to_vec())
}

fn malformed(what: &str) -> EncoderError {
    EncoderError::engine(format!("malformed reference container: {what}"))
}

#[cfg(test)]
#[path = "../../tests/unit/engine/container.rs"]
mod tests;
