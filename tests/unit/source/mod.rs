use super::*;
use crate::engine::reference::{ReferenceContainer, ReferenceEngine};
use crate::pipeline::{PipelineOpts, TransferMode};
use sketch::RadialSketch;

fn sketch() -> RadialSketch {
    RadialSketch::new(16, 8, 3, 5).unwrap()
}

#[test]
fn session_and_pipeline_paths_agree() {
    let mut source = sketch();
    let mut session =
        EncoderSession::create(ReferenceEngine::new(), source.encoder_config()).unwrap();
    assert_eq!(encode_with_session(&mut session, &mut source).unwrap(), 5);
    let direct = session.end().unwrap();

    let mut pipeline = PipelineCoordinator::spawn(
        || Ok(ReferenceEngine::new()),
        PipelineOpts {
            mode: TransferMode::Shared,
            channel_capacity: 1,
        },
    )
    .unwrap();
    pipeline.start(source.encoder_config()).unwrap();
    assert_eq!(encode_with_pipeline(&mut pipeline, &mut source).unwrap(), 5);
    let threaded = pipeline.finish().unwrap();

    assert_eq!(direct, threaded);
    assert_eq!(ReferenceContainer::parse(&direct).unwrap().frame_count(), 5);
}

#[test]
fn mismatched_source_is_a_config_error() {
    let mut source = sketch();
    let config = EncoderConfig::new(16, 8).with_stride(4);
    let mut session = EncoderSession::create(ReferenceEngine::new(), config).unwrap();
    assert!(matches!(
        encode_with_session(&mut session, &mut source),
        Err(EncoderError::Config(_))
    ));
}
