use std::{collections::BTreeSet, sync::Arc};

use sift_testkit::data_gen::DocumentGenerator;
use sift_text_index::{
    DeletionType, FieldTextConfig, Key, SchemaTextConfig, TextFieldIndex, TextIndexSchema,
    TextPredicate, Term,
};

fn nostem_field(with_suffix: bool) -> TextFieldIndex {
    TextFieldIndex::new(
        &SchemaTextConfig {
            with_suffix_trie: with_suffix,
            ..Default::default()
        },
        &FieldTextConfig {
            no_stem: Some(true),
            ..Default::default()
        },
    )
    .unwrap()
}

fn search(field: &TextFieldIndex, predicate: TextPredicate, negate: bool) -> BTreeSet<String> {
    field
        .search(&predicate, negate)
        .unwrap()
        .map(|key| key.to_string())
        .collect()
}

fn set(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn corpus_terms(field: &TextFieldIndex) -> Vec<Term> {
    field.corpus().all_terms().map(|(term, _)| term).collect()
}

#[test]
fn test_red_fox_scenario() {
    let schema = TextIndexSchema::new(SchemaTextConfig::default()).unwrap();
    let title = schema
        .create_field(&FieldTextConfig {
            no_stem: Some(true),
            ..Default::default()
        })
        .unwrap();
    title.add_record(&Key::from("K1"), b"red fox").unwrap();
    title.add_record(&Key::from("K2"), b"red fish").unwrap();
    title.add_record(&Key::from("K3"), b"blue fox").unwrap();

    assert_eq!(
        search(&title, TextPredicate::Term("red".into()), false),
        set(&["K1", "K2"])
    );
    assert_eq!(
        search(&title, TextPredicate::Prefix("f".into()), false),
        set(&["K1", "K2", "K3"])
    );

    assert!(title.remove_record(&Key::from("K1"), DeletionType::Deleted).unwrap());
    assert_eq!(
        search(&title, TextPredicate::Term("red".into()), false),
        set(&["K2"])
    );
    title.check_consistency().unwrap();
}

#[test]
fn test_stop_words_and_stemming_scenario() {
    let field = TextFieldIndex::new(
        &SchemaTextConfig {
            stop_words: vec!["the".to_string()],
            min_stem_size: 4,
            ..Default::default()
        },
        &FieldTextConfig::default(),
    )
    .unwrap();
    let key = Key::from("doc");
    field.add_record(&key, b"the running dogs").unwrap();
    assert_eq!(corpus_terms(&field), vec![b"dog".to_vec(), b"run".to_vec()]);
    assert!(field.corpus().lookup(b"the").is_none());
}

#[test]
fn test_prefix_and_suffix_correctness() {
    let field = TextFieldIndex::new(
        &SchemaTextConfig {
            with_suffix_trie: true,
            ..Default::default()
        },
        &FieldTextConfig {
            no_stem: Some(true),
            with_suffix_trie: Some(true),
            ..Default::default()
        },
    )
    .unwrap();
    for (key, text) in [
        ("k1", "search"),
        ("k2", "sea"),
        ("k3", "seahorse"),
        ("k4", "horse"),
        ("k5", "house"),
        ("k6", "cat"),
    ] {
        field.add_record(&Key::from(key), text.as_bytes()).unwrap();
    }
    assert_eq!(
        search(&field, TextPredicate::Prefix("sea".into()), false),
        set(&["k1", "k2", "k3"])
    );
    assert_eq!(
        search(&field, TextPredicate::Suffix("se".into()), false),
        set(&["k3", "k4", "k5"])
    );
    assert_eq!(
        search(&field, TextPredicate::Suffix("orse".into()), false),
        set(&["k3", "k4"])
    );
}

#[test]
fn test_tries_share_posting_lists() {
    let field = TextFieldIndex::new(
        &SchemaTextConfig {
            with_suffix_trie: true,
            ..Default::default()
        },
        &FieldTextConfig::default(),
    )
    .unwrap();
    let mut generator = DocumentGenerator::new(11);
    for (key, text) in generator.documents(200, 10) {
        field.add_record(&Key::from(key), text.as_bytes()).unwrap();
    }
    let corpus = field.corpus();
    for (term, postings) in corpus.all_terms() {
        let via_suffix = corpus
            .suffix_terms(&term)
            .unwrap()
            .find(|(candidate, _)| *candidate == term)
            .map(|(_, postings)| postings)
            .unwrap();
        assert!(Arc::ptr_eq(&postings, &via_suffix));
    }
    field.check_consistency().unwrap();
}

#[test]
fn test_add_remove_round_trip() {
    let field = nostem_field(true);
    let mut generator = DocumentGenerator::new(3);
    for (key, text) in generator.documents(50, 8) {
        field.add_record(&Key::from(key), text.as_bytes()).unwrap();
    }
    let terms_before = corpus_terms(&field);
    let snapshot_before = field.snapshot().unwrap();

    let key = Key::from("extra");
    assert!(field.add_record(&key, b"brand new vocabulary words, apple").unwrap());
    assert!(field.remove_record(&key, DeletionType::None).unwrap());

    assert_eq!(corpus_terms(&field), terms_before);
    assert_eq!(field.snapshot().unwrap(), snapshot_before);
    field.check_consistency().unwrap();
}

#[test]
fn test_add_is_idempotent() {
    let field = nostem_field(false);
    let key = Key::from("k");
    let text = b"alpha beta alpha gamma";
    assert!(field.add_record(&key, text).unwrap());
    let before = field.snapshot().unwrap();
    assert!(!field.add_record(&key, text).unwrap());
    assert_eq!(field.snapshot().unwrap(), before);
    assert_eq!(field.record_count(), 1);
    let alpha = field.corpus().lookup(b"alpha").unwrap();
    assert_eq!(alpha.positions(&key, 0), Some(vec![0, 11]));
}

#[test]
fn test_negation_partitions_tracked_keys() {
    let field = nostem_field(true);
    let mut generator = DocumentGenerator::new(5);
    for (key, text) in generator.documents(120, 6) {
        field.add_record(&Key::from(key), text.as_bytes()).unwrap();
    }
    let mut tracked = BTreeSet::new();
    field.for_each_tracked_key(|key| {
        tracked.insert(key.to_string());
    });

    for pattern in ["dog", "run*", "*ing", "s*g", "*an*", "the", "absent"] {
        let predicate = TextPredicate::parse(pattern).unwrap();
        let positive = search(&field, predicate.clone(), false);
        let negative = search(&field, predicate, true);
        assert!(positive.is_disjoint(&negative), "{pattern}");
        let union: BTreeSet<String> = positive.union(&negative).cloned().collect();
        assert_eq!(union, tracked, "{pattern}");
    }
}

#[test]
fn test_modify_matches_remove_then_add() {
    let modified = nostem_field(true);
    let rebuilt = nostem_field(true);
    let mut generator = DocumentGenerator::new(9);
    let docs = generator.documents(80, 8);
    for (key, text) in &docs {
        modified.add_record(&Key::from(key.as_str()), text.as_bytes()).unwrap();
    }
    for (i, (key, _)) in docs.iter().enumerate() {
        let key = Key::from(key.as_str());
        let text = generator.text(0, 8);
        if i % 2 == 0 {
            assert!(modified.modify_record(&key, text.as_bytes()).unwrap());
        } else {
            assert!(modified.remove_record(&key, DeletionType::None).unwrap());
            assert!(modified.add_record(&key, text.as_bytes()).unwrap());
        }
        rebuilt.add_record(&key, text.as_bytes()).unwrap();
    }
    assert_eq!(modified.snapshot().unwrap(), rebuilt.snapshot().unwrap());
    assert_eq!(corpus_terms(&modified), corpus_terms(&rebuilt));
    modified.check_consistency().unwrap();
}

#[test]
fn test_untracked_operations_are_noops() {
    let field = nostem_field(false);
    let ghost = Key::from("ghost");
    assert!(!field.remove_record(&ghost, DeletionType::Expired).unwrap());
    assert!(!field.modify_record(&ghost, b"text").unwrap());
    assert!(!field.is_tracked(&ghost));
    assert_eq!(field.info().records_expired, 0);
    assert_eq!(field.corpus().term_count(), 0);
}

#[test]
fn test_invalid_utf8_is_indexed_bytewise() {
    let field = nostem_field(false);
    let key = Key::from("bin");
    assert!(field.add_record(&key, b"caf\xe9 au lait\xff").unwrap());
    assert!(field.corpus().lookup(b"caf\xe9").is_some());
    assert!(field.corpus().lookup(b"lait\xff").is_some());
    assert_eq!(
        search(&field, TextPredicate::Term("au".into()), false),
        set(&["bin"])
    );
}

#[test]
fn test_schema_fields_are_isolated() {
    let schema = TextIndexSchema::new(SchemaTextConfig::default()).unwrap();
    let title = schema.create_field(&FieldTextConfig::default()).unwrap();
    let body = schema
        .create_field(&FieldTextConfig {
            stop_words: Some(vec![]),
            ..Default::default()
        })
        .unwrap();
    let key = Key::from("doc:1");
    title.add_record(&key, b"the quick fox").unwrap();
    body.add_record(&key, b"the slow turtle").unwrap();

    assert!(search(&title, TextPredicate::Term("turtle".into()), false).is_empty());
    assert_eq!(
        search(&body, TextPredicate::Term("the".into()), false),
        set(&["doc:1"])
    );
    assert!(search(&title, TextPredicate::Term("the".into()), false).is_empty());

    body.remove_record(&key, DeletionType::Deleted).unwrap();
    assert!(title.is_tracked(&key));
    assert_eq!(
        search(&title, TextPredicate::Term("fox".into()), false),
        set(&["doc:1"])
    );
    let info = schema.info();
    assert_eq!(info.num_text_fields, 2);
    assert_eq!(info.num_terms, 2);
}
