use super::*;
use crate::session::config::EncoderConfig;

#[derive(Default)]
struct VecSink(Vec<u8>);

impl WriteCallback for VecSink {
    fn accept(&mut self, offset: u64, bytes: &[u8]) -> usize {
        let offset = offset as usize;
        if self.0.len() < offset + bytes.len() {
            self.0.resize(offset + bytes.len(), 0);
        }
        self.0[offset..offset + bytes.len()].copy_from_slice(bytes);
        bytes.len()
    }
}

fn engine_config(sequential: bool) -> EngineConfig {
    let mut config = EncoderConfig::new(4, 4).engine_config();
    config.group_of_pictures = 3;
    config.sequential = sequential;
    config
}

fn gradient(frame: u8) -> Vec<u8> {
    (0..yuv420_len(4, 4) as u8).map(|i| i.wrapping_mul(frame)).collect()
}

fn encode_all(sequential: bool, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut engine = ReferenceEngine::new();
    let mut sink = VecSink::default();
    let handle = engine
        .create_encoder(&engine_config(sequential), &mut sink)
        .unwrap();
    let yuv = engine.allocate(yuv420_len(4, 4)).unwrap();
    for frame in frames {
        engine.memory_mut().write(yuv, frame).unwrap();
        engine.encode_yuv(handle, yuv, &mut sink).unwrap();
    }
    engine.finalize_encoder(handle, &mut sink).unwrap();
    assert_eq!(engine.active_encoders(), 0);
    sink.0
}

#[test]
fn yuv_frames_round_trip_with_key_frames_every_gop() {
    let frames: Vec<Vec<u8>> = (1..=7).map(gradient).collect();
    let bytes = encode_all(false, &frames);
    assert_eq!(&bytes[4..8], b"ftyp");
    assert_eq!(&bytes[28..32], b"mdat");

    let parsed = ReferenceContainer::parse(&bytes).unwrap();
    assert_eq!(parsed.header.frame_count, 7);
    assert_eq!(parsed.sync_samples, vec![1, 4, 7]);
    assert_eq!(parsed.decode_frames().unwrap(), frames);
}

#[test]
fn sequential_mode_decodes_to_the_same_frames() {
    let frames: Vec<Vec<u8>> = (1..=5).map(gradient).collect();
    let patched = ReferenceContainer::parse(&encode_all(false, &frames)).unwrap();
    let sequential = ReferenceContainer::parse(&encode_all(true, &frames)).unwrap();
    assert_eq!(
        patched.decode_frames().unwrap(),
        sequential.decode_frames().unwrap()
    );
}

#[test]
fn rgb_frames_are_converted_through_the_scratch_region() {
    let mut engine = ReferenceEngine::new();
    let mut sink = VecSink::default();
    let handle = engine
        .create_encoder(&engine_config(false), &mut sink)
        .unwrap();
    let rgb = engine.allocate(4 * 4 * 3).unwrap();
    let yuv = engine.allocate(yuv420_len(4, 4)).unwrap();
    engine.memory_mut().write(rgb, &[255u8; 48]).unwrap();

    engine.encode_rgb(handle, rgb, 3, yuv, &mut sink).unwrap();
    let converted = engine.memory().slice(yuv, 24).unwrap().to_vec();
    assert_eq!(&converted[..16], &[235u8; 16]);
    assert_eq!(&converted[16..], &[128u8; 8]);

    engine.finalize_encoder(handle, &mut sink).unwrap();
    let frames = ReferenceContainer::parse(&sink.0)
        .unwrap()
        .decode_frames()
        .unwrap();
    assert_eq!(frames, vec![converted]);
}

#[test]
fn invalid_configs_and_handles_are_rejected() {
    let mut engine = ReferenceEngine::new();
    let mut sink = VecSink::default();

    let odd = EncoderConfig::new(3, 4).engine_config();
    assert!(matches!(
        engine.create_encoder(&odd, &mut sink),
        Err(EncoderError::Config(_))
    ));
    let mut no_gop = engine_config(false);
    no_gop.group_of_pictures = 0;
    assert!(engine.create_encoder(&no_gop, &mut sink).is_err());

    let bogus = EncoderHandle::new(99);
    assert!(engine.finalize_encoder(bogus, &mut sink).is_err());
}

#[test]
fn memory_limit_surfaces_as_resource_error() {
    let mut engine = ReferenceEngine::with_memory_limit(100);
    assert!(engine.allocate(64).is_ok());
    assert!(matches!(
        engine.allocate(64),
        Err(EncoderError::Resource(_))
    ));
}
