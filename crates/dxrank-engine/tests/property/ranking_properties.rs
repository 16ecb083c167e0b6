use proptest::prelude::*;
use std::collections::BTreeMap;

use dxrank_core::types::ExtractedEntities;
use dxrank_engine::calibrate::{fused_confidence, rank_order, sort_candidates};
use dxrank_engine::consistency::{score_agreement, AgreementWeights};
use dxrank_engine::fusion::{fuse, FusionParams};
use dxrank_engine::Candidate;
use dxrank_hierarchy::dataset::parse;
use dxrank_hierarchy::Hierarchy;

const CODES: [&str; 8] = ["E10.9", "E11.9", "E11.65", "E11.621", "L89.60", "L89.012", "L97.411", "J45.909"];

const FIXTURE: &str = r#"{
  "chapters": [
    { "id": "IV", "title": "Endocrine", "range": "E00-E89" },
    { "id": "X", "title": "Respiratory", "range": "J00-J99" },
    { "id": "XII", "title": "Skin", "range": "L00-L99" }
  ],
  "categories": [
    { "id": "E10", "chapter": "IV" },
    { "id": "E11", "chapter": "IV" },
    { "id": "J45", "chapter": "X" },
    { "id": "L89", "chapter": "XII" },
    { "id": "L97", "chapter": "XII" }
  ],
  "codes": [
    { "code": "E10.9", "description": "Type 1 diabetes mellitus without complications", "category": "E10" },
    { "code": "E11.9", "description": "Type 2 diabetes mellitus without complications", "category": "E11" },
    { "code": "E11.65", "description": "Type 2 diabetes mellitus with hyperglycemia", "category": "E11" },
    { "code": "E11.621", "description": "Type 2 diabetes mellitus with foot ulcer", "category": "E11" },
    { "code": "L89.60", "description": "Pressure ulcer of unspecified heel", "category": "L89", "requires": ["laterality"] },
    { "code": "L89.012", "description": "Pressure ulcer of right elbow, stage 2", "category": "L89" },
    { "code": "L97.411", "description": "Non-pressure chronic ulcer of right heel, severe", "category": "L97" },
    { "code": "J45.909", "description": "Unspecified asthma, uncomplicated", "category": "J45" }
  ]
}"#;

fn fixture() -> Hierarchy {
    Hierarchy::load(parse(FIXTURE).expect("parse")).expect("load")
}

fn build(h: &Hierarchy, picks: &BTreeMap<usize, f64>) -> Vec<Candidate> {
    picks
        .iter()
        .map(|(&i, &s)| Candidate::new(h.lookup(CODES[i]).unwrap(), CODES[i], s))
        .collect()
}

fn arb_picks(max: usize) -> impl Strategy<Value = BTreeMap<usize, f64>> {
    prop::collection::btree_map(0..CODES.len(), -1.0f64..1.0, 0..=max)
}

fn arb_entities() -> impl Strategy<Value = ExtractedEntities> {
    (
        prop::sample::subsequence(vec!["left", "right", "bilateral", "unspecified"], 0..=1),
        prop::sample::subsequence(vec!["mild", "severe"], 0..=2),
        prop::sample::subsequence(vec!["heel", "elbow", "foot"], 0..=2),
    )
        .prop_map(|(lat, sev, site)| {
            let mut e = ExtractedEntities::new();
            for v in lat {
                e = e.with_laterality(v);
            }
            for v in sev {
                e = e.with_severity(v);
            }
            for v in site {
                e = e.with_site(v);
            }
            e
        })
}

const WEIGHTS: AgreementWeights = AgreementWeights { category: 1.0, chapter: 0.4 };

proptest! {
    #[test]
    fn agreement_is_zero_without_peers(picks in arb_picks(1)) {
        let h = fixture();
        let mut cands = build(&h, &picks);
        score_agreement(&mut cands, &h, WEIGHTS);
        for c in &cands {
            prop_assert_eq!(c.agreement, 0.0);
        }
    }

    #[test]
    fn agreement_stays_in_unit_interval(picks in arb_picks(CODES.len())) {
        let h = fixture();
        let mut cands = build(&h, &picks);
        score_agreement(&mut cands, &h, WEIGHTS);
        for c in &cands {
            prop_assert!((0.0..=1.0).contains(&c.agreement), "{} out of range", c.agreement);
        }
    }

    #[test]
    fn confidence_is_monotonic(
        s in 0.0f64..1.0,
        a in 0.0f64..1.0,
        ds in 0.0f64..0.5,
        da in 0.0f64..0.5,
        alpha in 0.0f64..=1.0,
    ) {
        let base = fused_confidence(s, a, alpha);
        prop_assert!(fused_confidence(s + ds, a, alpha) >= base);
        prop_assert!(fused_confidence(s, a + da, alpha) >= base);
        prop_assert!((0.0..=1.0).contains(&base));
    }

    #[test]
    fn sort_is_total_and_idempotent(
        picks in arb_picks(CODES.len()),
        confidences in prop::collection::vec(prop_oneof![Just(0.5f64), Just(0.75), 0.0f64..1.0], CODES.len()),
    ) {
        let h = fixture();
        let mut cands = build(&h, &picks);
        for (c, conf) in cands.iter_mut().zip(confidences) {
            c.confidence = conf;
        }
        let mut reversed = cands.clone();
        reversed.reverse();

        sort_candidates(&mut cands);
        sort_candidates(&mut reversed);
        let ids: Vec<&str> = cands.iter().map(|c| c.code_id.as_str()).collect();
        let ids_rev: Vec<&str> = reversed.iter().map(|c| c.code_id.as_str()).collect();
        prop_assert_eq!(&ids, &ids_rev);

        for pair in cands.windows(2) {
            prop_assert_ne!(rank_order(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
        }

        let again = {
            let mut v = cands.clone();
            sort_candidates(&mut v);
            v
        };
        prop_assert_eq!(again, cands);
    }

    #[test]
    fn fusion_is_idempotent_and_bounded(
        picks in arb_picks(CODES.len()),
        base in 0.0f64..=1.0,
        entities in arb_entities(),
    ) {
        let h = fixture();
        let params = FusionParams { bonus: 0.05, penalty: 0.05, cap: 0.15 };
        let mut cands = build(&h, &picks);
        for c in cands.iter_mut() {
            c.base_confidence = base;
            c.confidence = base;
        }
        fuse(&mut cands, &h, &entities, params);
        let once = cands.clone();
        fuse(&mut cands, &h, &entities, params);
        prop_assert_eq!(&cands, &once);

        for c in &cands {
            prop_assert!((c.confidence - c.base_confidence).abs() <= params.cap + 1e-12);
            prop_assert!((0.0..=1.0).contains(&c.confidence));
        }
    }
}
