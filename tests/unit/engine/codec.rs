use super::*;

fn decode(packed: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    packbits_decode(packed, &mut out).unwrap();
    out
}

#[test]
fn encodes_classic_packbits_example() {
    let src = [
        0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0x22, 0xAA,
        0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
    ];
    let mut packed = Vec::new();
    packbits_encode(&src, &mut packed);
    assert_eq!(
        packed,
        vec![
            0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22, 0xF7,
            0xAA
        ]
    );
    assert_eq!(decode(&packed), src);
}

#[test]
fn long_runs_and_literals_are_split_at_128() {
    let mut src = vec![5u8; 300];
    src.extend((0..=255u8).cycle().take(300));
    let mut packed = Vec::new();
    packbits_encode(&src, &mut packed);
    assert_eq!(decode(&packed), src);
    assert!(packed.len() < src.len());
}

#[test]
fn uniform_frames_compress_hard() {
    let src = vec![0u8; 64 * 64];
    let mut packed = Vec::new();
    packbits_encode(&src, &mut packed);
    assert_eq!(packed.len(), 2 * 32);
}

#[test]
fn noop_header_is_skipped_and_truncation_detected() {
    assert_eq!(decode(&[0x80, 0x00, 0x07]), vec![7]);
    let mut out = Vec::new();
    assert!(packbits_decode(&[0x02, 0x01], &mut out).is_err());
    assert!(packbits_decode(&[0xFE], &mut out).is_err());
}

#[test]
fn xor_delta_is_its_own_inverse() {
    let a = [1u8, 2, 3, 4];
    let b = [1u8, 0, 3, 9];
    let mut d = [0u8; 4];
    xor_into(&mut d, &a, &b);
    assert_eq!(d, [0, 2, 0, 13]);
    let mut back = [0u8; 4];
    xor_into(&mut back, &d, &b);
    assert_eq!(back, a);
}
