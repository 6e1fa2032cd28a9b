use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        EncoderError::config("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        EncoderError::contract("x")
            .to_string()
            .contains("contract violation:")
    );
    assert!(
        EncoderError::resource("x")
            .to_string()
            .contains("resource exhaustion:")
    );
    assert!(EncoderError::engine("x").to_string().contains("engine error:"));
    assert!(
        EncoderError::pipeline("x")
            .to_string()
            .contains("pipeline error:")
    );
}

#[test]
fn only_contract_variant_reports_contract_violation() {
    assert!(EncoderError::contract("x").is_contract_violation());
    assert!(!EncoderError::config("x").is_contract_violation());
    assert!(!EncoderError::engine("x").is_contract_violation());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = EncoderError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
