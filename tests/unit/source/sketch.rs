use super::*;

#[test]
fn rejects_bad_shapes() {
    assert!(RadialSketch::new(0, 8, 3, 1).is_err());
    assert!(RadialSketch::new(8, 8, 2, 1).is_err());
}

#[test]
fn frames_animate_and_rgba_is_opaque() {
    let mut sketch = RadialSketch::new(16, 16, 4, 10).unwrap();
    let mut a = vec![0u8; sketch.frame_len()];
    let mut b = vec![0u8; sketch.frame_len()];
    sketch.read_into(0, &mut a).unwrap();
    sketch.read_into(3, &mut b).unwrap();
    assert_ne!(a, b);
    assert!(a.chunks_exact(4).all(|px| px[3] == 255));

    // t = 0: blue sits at the middle of its range everywhere.
    assert!(a.chunks_exact(4).all(|px| px[2] == 127));
}

#[test]
fn vertical_fade_blacks_out_the_top_row() {
    let mut sketch = RadialSketch::new(8, 8, 3, 4)
        .unwrap()
        .with_vertical_fade(true);
    let mut frame = vec![0u8; sketch.frame_len()];
    sketch.read_into(1, &mut frame).unwrap();
    assert!(frame[..8 * 3].iter().all(|b| *b == 0));
    assert!(frame[7 * 8 * 3..].iter().any(|b| *b > 0));
}

#[test]
fn read_checks_index_and_buffer() {
    let mut sketch = RadialSketch::new(4, 4, 3, 2).unwrap();
    let mut frame = vec![0u8; 48];
    assert!(sketch.read_into(2, &mut frame).is_err());
    assert!(sketch.read_into(0, &mut frame[..47]).is_err());
    assert_eq!(sketch.encoder_config().stride, 3);
}
