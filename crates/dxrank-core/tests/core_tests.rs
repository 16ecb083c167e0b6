use std::fs;
use std::path::Path;
use tempfile::TempDir;

use dxrank_core::config::{resolve_with_base, Config, RankingConfig};
use dxrank_core::types::{AbsenceReason, AttributeEvidence, EntitySignal, ExtractedEntities, SpecificityAttribute};
use dxrank_core::Error;

#[test]
fn load_without_files_yields_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = Config::load_from(tmp.path(), "test").expect("load");
    let settings = config.settings().expect("settings");
    assert_eq!(settings.ranking, RankingConfig::default());
    assert_eq!(settings.embedding.dimension, 384);
}

#[test]
fn env_file_overrides_base_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[ranking]\nalpha = 0.6\ntop_k = 3\n").unwrap();
    fs::write(tmp.path().join("config.test.toml"), "[ranking]\ntop_k = 8\n").unwrap();

    let config = Config::load_from(tmp.path(), "test").expect("load");
    let ranking: RankingConfig = config.get("ranking").expect("ranking");
    assert!((ranking.alpha - 0.6).abs() < 1e-12);
    assert_eq!(ranking.top_k, 8, "env-specific file wins");
    assert!((ranking.chapter_weight - 0.4).abs() < 1e-12, "unset keys keep defaults");
}

#[test]
fn out_of_range_values_are_rejected_at_load() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[ranking]\nalpha = 1.5\n").unwrap();
    assert!(Config::load_from(tmp.path(), "test").is_err());
}

#[test]
fn ranking_config_validation() {
    assert!(RankingConfig::default().validate().is_ok());

    let inverted = RankingConfig { category_weight: 0.3, chapter_weight: 0.4, ..RankingConfig::default() };
    assert!(matches!(inverted.validate(), Err(Error::InvalidConfiguration(_))));

    let zero_chapter = RankingConfig { chapter_weight: 0.0, ..RankingConfig::default() };
    assert!(zero_chapter.validate().is_err());

    let nan_alpha = RankingConfig { alpha: f64::NAN, ..RankingConfig::default() };
    assert!(nan_alpha.validate().is_err());

    let zero_k = RankingConfig { top_k: 0, ..RankingConfig::default() };
    assert!(zero_k.validate().is_err());

    let negative_bonus = RankingConfig { fusion_bonus: -0.1, ..RankingConfig::default() };
    assert!(negative_bonus.validate().is_err());

    let edge = RankingConfig { alpha: 1.0, min_confidence: 0.0, ..RankingConfig::default() };
    assert!(edge.validate().is_ok(), "interval bounds are inclusive");
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = Path::new("/srv/dxrank");
    assert_eq!(resolve_with_base(base, "data/icd10.json"), base.join("data/icd10.json"));
    assert_eq!(resolve_with_base(base, "/abs/set.json"), Path::new("/abs/set.json"));
}

#[test]
fn json_payload_accepts_scalar_and_null_fields() {
    let payload = serde_json::json!({
        "primary_diagnosis": "diabetic foot ulcer",
        "symptoms": ["Foot  Pain"],
        "anatomical_sites": ["Heel"],
        "laterality": "LEFT",
        "severity": null
    });
    let signal = EntitySignal::from_json(&payload);
    let entities = signal.entities().expect("present");
    assert!(entities.symptoms.contains("foot pain"));
    assert!(entities.laterality.contains("left"));
    assert_eq!(entities.evidence(SpecificityAttribute::Severity), AttributeEvidence::Absent);
}

#[test]
fn malformed_payloads_degrade_to_absent() {
    for payload in [
        serde_json::json!(["left"]),
        serde_json::json!({ "laterality": 3 }),
        serde_json::json!({ "symptoms": ["cough", 7] }),
        serde_json::json!({ "laterality": "upper" }),
        serde_json::json!({ "laterality": ["left", "unspecified"] }),
        serde_json::json!({ "severity": ["  "] }),
    ] {
        let signal = EntitySignal::from_json(&payload);
        assert!(
            matches!(signal, EntitySignal::Absent(AbsenceReason::Malformed(_))),
            "payload {} should be malformed, got {:?}",
            payload,
            signal
        );
    }
}

#[test]
fn provider_failure_is_absent_not_error() {
    let signal = EntitySignal::from_extraction(Err(anyhow::anyhow!("timeout after 3s")));
    match signal {
        EntitySignal::Absent(AbsenceReason::ProviderFailed(msg)) => assert!(msg.contains("timeout")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn unspecified_markers_are_their_own_evidence() {
    let entities = ExtractedEntities::new().with_laterality("Unspecified").with_severity("severe");
    assert_eq!(entities.evidence(SpecificityAttribute::Laterality), AttributeEvidence::Unspecified);
    match entities.evidence(SpecificityAttribute::Severity) {
        AttributeEvidence::Specified(v) => assert!(v.contains("severe")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn placeholder_values_read_as_not_mentioned() {
    let payload = serde_json::json!({
        "laterality": "null",
        "severity": "None",
        "anatomical_sites": ["heel", "N/A"]
    });
    let signal = EntitySignal::from_json(&payload);
    let entities = signal.entities().expect("placeholders do not discard the extraction");
    assert_eq!(entities.evidence(SpecificityAttribute::Laterality), AttributeEvidence::Absent);
    assert_eq!(entities.evidence(SpecificityAttribute::Severity), AttributeEvidence::Absent);
    assert_eq!(entities.anatomical_sites.len(), 1);
    assert!(entities.anatomical_sites.contains("heel"));
}
