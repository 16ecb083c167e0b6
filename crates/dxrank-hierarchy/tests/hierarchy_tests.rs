use std::fs;
use tempfile::TempDir;

use dxrank_core::types::SpecificityAttribute;
use dxrank_core::Error;
use dxrank_hierarchy::dataset::parse;
use dxrank_hierarchy::{load_path, Hierarchy};

const STRUCTURED: &str = r#"{
  "chapters": [
    { "id": "IV", "title": "Endocrine, nutritional and metabolic diseases", "range": "E00-E89",
      "categories": ["E11", "E10"], "keywords": ["diabetes", "thyroid"] },
    { "id": "XII", "title": "Diseases of the skin and subcutaneous tissue", "range": "L00-L99",
      "keywords": ["skin", "ulcer"] }
  ],
  "categories": [
    { "id": "E10", "chapter": "IV", "title": "Type 1 diabetes mellitus" },
    { "id": "E11", "chapter": "IV", "title": "Type 2 diabetes mellitus" },
    { "id": "L89", "chapter": "XII", "title": "Pressure ulcer" }
  ],
  "codes": [
    { "code": "E11.621", "description": "Type 2 diabetes mellitus with foot ulcer", "category": "E11" },
    { "code": "e119", "description": "Type 2 diabetes mellitus without complications", "category": "E11",
      "synonyms": ["T2DM"] },
    { "code": "E10.9", "description": "Type 1 diabetes mellitus without complications", "category": "E10" },
    { "code": "L89.60", "description": "Pressure ulcer of unspecified heel, unstageable", "category": "L89",
      "requires": ["laterality"] }
  ]
}"#;

fn structured() -> Hierarchy {
    Hierarchy::load(parse(STRUCTURED).expect("parse")).expect("load")
}

fn integrity_message(json: &str) -> String {
    match parse(json).and_then(Hierarchy::load) {
        Err(Error::DataIntegrity(msg)) => msg,
        other => panic!("expected integrity error, got {:?}", other.map(|h| h.code_count())),
    }
}

#[test]
fn structured_dataset_builds_strict_tree() {
    let h = structured();
    assert_eq!((h.code_count(), h.category_count(), h.chapter_count()), (4, 3, 2));

    let idx = h.lookup("E11621").expect("undotted lookup");
    let (category, chapter) = h.ancestors(idx);
    assert_eq!(category.id, "E11");
    assert_eq!(chapter.id, "IV");
    assert_eq!(chapter.display_name(), "IV. Endocrine, nutritional and metabolic diseases");

    let iv = h.chapter_by_id("IV").unwrap();
    let order: Vec<&str> = iv.categories.iter().map(|&c| h.category(c).id.as_str()).collect();
    assert_eq!(order, ["E11", "E10"], "declared order is kept");

    assert!(h.get("L89.60").unwrap().requires(SpecificityAttribute::Laterality));
    assert_eq!(h.get("E11.9").unwrap().synonyms, ["T2DM"]);
}

#[test]
fn siblings_exclude_the_code_itself() {
    let h = structured();
    let idx = h.lookup("E11.621").unwrap();
    let siblings: Vec<&str> = h.siblings(idx).map(|c| c.id.as_str()).collect();
    assert_eq!(siblings, ["E11.9"]);

    let lonely = h.lookup("E10.9").unwrap();
    assert_eq!(h.siblings(lonely).count(), 0);
}

#[test]
fn validity_predicate() {
    let h = structured();
    assert!(h.is_valid("E11.621"));
    assert!(h.is_valid(" e11.621 "));
    assert!(!h.is_valid("E11.622"));
    assert!(!h.is_valid(""));
}

#[test]
fn integrity_violations_are_rejected() {
    let unknown_category = r#"{ "chapters": [{ "id": "IV", "title": "Endocrine" }],
        "categories": [{ "id": "E11", "chapter": "IV" }],
        "codes": [{ "code": "E11.9", "description": "x", "category": "E12" }] }"#;
    assert!(integrity_message(unknown_category).contains("unknown category"));

    let unknown_chapter = r#"{ "chapters": [],
        "categories": [{ "id": "E11", "chapter": "IV" }],
        "codes": [{ "code": "E11.9", "description": "x", "category": "E11" }] }"#;
    assert!(integrity_message(unknown_chapter).contains("unknown chapter"));

    let cross_link = r#"{ "chapters": [
            { "id": "IV", "title": "Endocrine", "categories": ["E11"] },
            { "id": "IX", "title": "Circulatory", "categories": ["E11"] }],
        "categories": [{ "id": "E11", "chapter": "IV" }],
        "codes": [{ "code": "E11.9", "description": "x", "category": "E11" }] }"#;
    assert!(integrity_message(cross_link).contains("belongs to chapter"));

    let duplicate = r#"{ "chapters": [{ "id": "IV", "title": "Endocrine" }],
        "categories": [{ "id": "E11", "chapter": "IV" }],
        "codes": [{ "code": "E11.9", "description": "x", "category": "E11" },
                  { "code": "E119", "description": "y", "category": "E11" }] }"#;
    assert!(integrity_message(duplicate).contains("duplicate code"));

    let malformed = r#"{ "chapters": [{ "id": "IV", "title": "Endocrine" }],
        "categories": [{ "id": "E11", "chapter": "IV" }],
        "codes": [{ "code": "11E.9", "description": "x", "category": "E11" }] }"#;
    assert!(integrity_message(malformed).contains("malformed"));

    let wrong_chapter = r#"{ "chapters": [{ "id": "IV", "title": "Endocrine" }, { "id": "IX", "title": "Circulatory" }],
        "categories": [{ "id": "E11", "chapter": "IV" }],
        "codes": [{ "code": "E11.9", "description": "x", "category": "E11", "chapter": "IX" }] }"#;
    assert!(integrity_message(wrong_chapter).contains("declares chapter"));

    assert!(integrity_message("[]").contains("no codes"));
    assert!(integrity_message("{ \"codes\": 3 }").contains("unreadable"));
}

#[test]
fn flat_records_are_placed_by_code() {
    let flat = r#"[
        { "code": "E11621", "description": "Type 2 diabetes mellitus with foot ulcer",
          "chapter": "IV. Endocrine, nutritional and metabolic diseases", "synonyms": ["diabetic foot ulcer"] },
        { "code": "D52.0", "description": "Dietary folate deficiency anemia" },
        { "code": "D20.1", "description": "Benign neoplasm of soft tissue of peritoneum" },
        { "code": "H60.0", "description": "Abscess of external ear", "category_title": "Otitis externa" }
    ]"#;
    let h = Hierarchy::load(parse(flat).unwrap()).expect("load");
    let chapter_of = |id: &str| h.ancestors(h.lookup(id).unwrap()).1.id.clone();
    assert_eq!(chapter_of("E11.621"), "IV");
    assert_eq!(chapter_of("D52.0"), "III");
    assert_eq!(chapter_of("D20.1"), "II");
    assert_eq!(chapter_of("H60.0"), "VIII");
    assert_eq!(h.category_by_id("H60").unwrap().title, "Otitis externa");
    assert!(h.chapter_by_id("IV").unwrap().keywords.iter().any(|k| k == "diabetes"));

    let contradicting = r#"[{ "code": "E11.9", "description": "x", "chapter": "IX" }]"#;
    assert!(integrity_message(contradicting).contains("declares chapter"));
}

#[test]
fn chapter_detection_uses_whole_words() {
    let h = structured();
    let iv = h.detect_chapter("Patient with poorly controlled diabetes").unwrap();
    assert_eq!(h.chapter(iv).id, "IV");

    let skin = h.detect_chapter("non-healing skin ulcer").unwrap();
    assert_eq!(h.chapter(skin).id, "XII");

    assert!(h.detect_chapter("thyroidectomy scar").is_none(), "no partial-word hits");
    assert!(h.detect_chapter("").is_none());

    let tie = h.detect_chapter("diabetes with ulcer").unwrap();
    assert_eq!(h.chapter(tie).id, "IV", "ties go to the earlier chapter");
}

#[test]
fn directory_shards_merge_in_path_order() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("a.json"),
        r#"[{ "code": "E11.9", "description": "Type 2 diabetes mellitus without complications" }]"#,
    )
    .unwrap();
    fs::create_dir(tmp.path().join("more")).unwrap();
    fs::write(
        tmp.path().join("more/b.json"),
        r#"[{ "code": "J45.909", "description": "Unspecified asthma, uncomplicated" }]"#,
    )
    .unwrap();
    fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

    let h = load_path(tmp.path()).expect("load dir");
    assert_eq!(h.code_count(), 2);
    let first = h.codes().next().unwrap().1;
    assert_eq!(first.id, "E11.9");
}

#[test]
fn single_file_and_missing_path() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("set.json");
    fs::write(&file, STRUCTURED).unwrap();
    assert_eq!(load_path(&file).expect("file").code_count(), 4);

    let missing = tmp.path().join("absent.json");
    assert!(matches!(load_path(&missing), Err(Error::DataIntegrity(_))));

    let empty_dir = tmp.path().join("empty");
    fs::create_dir(&empty_dir).unwrap();
    assert!(matches!(load_path(&empty_dir), Err(Error::DataIntegrity(_))));
}

#[test]
fn bundled_sample_dataset_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/icd10.json");
    let h = load_path(&path).expect("sample dataset");
    assert_eq!(h.code_count(), 24);

    let (category, chapter) = h.ancestors(h.lookup("E11.65").unwrap());
    assert_eq!(category.title, "Type 2 diabetes mellitus");
    assert_eq!(chapter.id, "IV");
    assert_eq!(h.ancestors(h.lookup("M17.0").unwrap()).1.id, "XIII");
    assert!(h.get("L89.60").unwrap().requires(SpecificityAttribute::Laterality));
}
