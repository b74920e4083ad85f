use std::collections::BTreeSet;

use sift_testkit::data_gen::DocumentGenerator;
use sift_text_index::{
    FieldTextConfig, Key, Language, PositionGranularity, SchemaTextConfig, TextFieldIndex,
    TextIndexSchema, TextPredicate,
};

fn search(field: &TextFieldIndex, pattern: &str) -> BTreeSet<Key> {
    let predicate = TextPredicate::parse(pattern).unwrap();
    field.search(&predicate, false).unwrap().collect()
}

#[test]
fn test_round_trip_through_schema_fields() {
    let schema_config: SchemaTextConfig = serde_json::from_str(
        r#"{
            "with_suffix_trie": true,
            "position_granularity": "word",
            "limits": { "max_term_length": 64 }
        }"#,
    )
    .unwrap();
    let field_config: FieldTextConfig =
        serde_json::from_str(r#"{ "with_suffix_trie": true, "min_stem_size": 5 }"#).unwrap();

    let source_schema = TextIndexSchema::new(schema_config.clone()).unwrap();
    let _other = source_schema.create_field(&FieldTextConfig::default()).unwrap();
    let source = source_schema.create_field(&field_config).unwrap();
    assert_eq!(source.field_number(), 1);
    assert_eq!(source.config().position_granularity, PositionGranularity::Word);

    let mut generator = DocumentGenerator::new(77);
    for (key, text) in generator.documents(150, 12) {
        source.add_record(&Key::from(key), text.as_bytes()).unwrap();
    }

    let mut buf = Vec::new();
    source.save_index(&mut buf).unwrap();

    // The target schema allocates a different field number; the snapshot is
    // re-tagged on load.
    let target_schema = TextIndexSchema::new(schema_config).unwrap();
    let target = target_schema.create_field(&field_config).unwrap();
    assert_eq!(target.field_number(), 0);
    assert_eq!(target.load_index(&mut buf.as_slice()).unwrap(), source.record_count());

    for pattern in ["dog", "jump*", "*ing", "s*g", "*ors*", "the"] {
        assert_eq!(search(&target, pattern), search(&source, pattern), "{pattern}");
    }
    assert_eq!(
        target.snapshot().unwrap().records,
        source.snapshot().unwrap().records
    );
    assert_eq!(target.info().num_field_terms, source.info().num_field_terms);
    target.check_consistency().unwrap();
}

#[test]
fn test_field_info_reports_configuration() {
    let field = TextFieldIndex::new(
        &SchemaTextConfig {
            language: Language::German,
            ..Default::default()
        },
        &FieldTextConfig {
            no_stem: Some(true),
            ..Default::default()
        },
    )
    .unwrap();
    field.add_record(&Key::from("a"), b"eins zwei drei").unwrap();
    field.add_record(&Key::from("b"), b"zwei").unwrap();

    let info = field.info();
    assert_eq!(info.num_records, 2);
    assert_eq!(info.num_corpus_terms, 3);
    assert_eq!(info.num_field_terms, 3);
    assert_eq!(info.num_term_occurrences, 4);
    assert_eq!(info.config.language, Language::German);
    assert!(!info.config.stemming);

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["num_records"], 2);
    assert_eq!(json["config"]["language"], "german");
}
