use super::*;

#[test]
fn defaults_match_engine_option_defaults() {
    let cfg = EncoderConfig::new(64, 32);
    assert_eq!(cfg.stride, 4);
    assert_eq!(cfg.fps, 30);
    assert_eq!(cfg.speed, 10);
    assert_eq!(cfg.quantization_parameter, 10);
    assert_eq!(cfg.group_of_pictures, 20);
    assert_eq!((cfg.qp_min, cfg.qp_max), (10, 50));
    assert!(!cfg.rgb_flip_y);
}

#[test]
fn validation_catches_bad_dimensions_and_stride() {
    assert!(EncoderConfig::new(0, 10).validate().is_err());
    assert!(EncoderConfig::new(10, 0).validate().is_err());
    assert!(EncoderConfig::new(10, 10).with_stride(2).validate().is_err());
    assert!(EncoderConfig::new(10, 10).with_stride(3).validate().is_ok());
    assert!(matches!(
        EncoderConfig::new(0, 0).validate().unwrap_err(),
        EncoderError::Config(_)
    ));
}

#[test]
fn frame_lengths_follow_layout() {
    let cfg = EncoderConfig::new(256, 256).with_stride(3);
    assert_eq!(cfg.rgb_frame_len(), 256 * 256 * 3);
    assert_eq!(cfg.yuv_frame_len(), 256 * 256 * 3 / 2);
}

#[test]
fn json_uses_camel_case_keys_and_fills_defaults() {
    let cfg = EncoderConfig::from_json_str(
        r#"{ "width": 640, "height": 480, "stride": 3, "groupOfPictures": 30, "rgbFlipY": true, "qpMax": 40 }"#,
    )
    .unwrap();
    assert_eq!(cfg.width, 640);
    assert_eq!(cfg.stride, 3);
    assert_eq!(cfg.group_of_pictures, 30);
    assert_eq!(cfg.qp_max, 40);
    assert!(cfg.rgb_flip_y);
    assert_eq!(cfg.fps, 30);

    assert!(matches!(
        EncoderConfig::from_json_str("{ not json").unwrap_err(),
        EncoderError::Config(_)
    ));
}

#[test]
fn engine_config_strips_stride() {
    let cfg = EncoderConfig::new(8, 8).with_stride(3).with_fps(60);
    let engine = cfg.engine_config();
    let json = serde_json::to_value(&engine).unwrap();
    assert!(json.get("stride").is_none());
    assert_eq!(json["fps"], 60);
    assert_eq!(json["width"], 8);
}
