use std::{
    collections::BTreeSet,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use sift_testkit::data_gen::DocumentGenerator;
use sift_text_index::{
    DeletionType, FieldTextConfig, IndexLimits, Key, SchemaTextConfig, TextFieldIndex,
    TextIndexSchema, TextPredicate,
};

const WRITERS: usize = 4;
const KEYS_PER_WRITER: usize = 60;
const ROUNDS: usize = 400;

fn schema_config() -> SchemaTextConfig {
    SchemaTextConfig {
        with_suffix_trie: true,
        // Few shards so that unrelated terms collide on purpose.
        limits: IndexLimits {
            lock_shards: 7,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn keys_of(field: &TextFieldIndex, predicate: &TextPredicate) -> BTreeSet<Key> {
    field.search(predicate, false).unwrap().collect()
}

/// Every writer owns a disjoint key range and remembers the last text it wrote
/// for each key. After the run the index must answer exactly like an index
/// built sequentially from those final texts.
#[test]
fn test_concurrent_writers_and_readers() {
    let schema = TextIndexSchema::new(schema_config()).unwrap();
    let field = schema.create_field(&FieldTextConfig::default()).unwrap();

    let finals: Vec<Vec<(Key, Option<String>)>> = std::thread::scope(|s| {
        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let field = &field;
                s.spawn(move || {
                    let mut generator = DocumentGenerator::new(100 + w as u64);
                    let keys: Vec<Key> = (0..KEYS_PER_WRITER)
                        .map(|i| Key::from(DocumentGenerator::key(w * KEYS_PER_WRITER + i)))
                        .collect();
                    let mut state: Vec<Option<String>> = vec![None; KEYS_PER_WRITER];
                    for _ in 0..ROUNDS {
                        let slot = generator.index(KEYS_PER_WRITER);
                        let key = &keys[slot];
                        if generator.chance(1, 4) {
                            let removed = field.remove_record(key, DeletionType::Deleted).unwrap();
                            assert_eq!(removed, state[slot].is_some());
                            state[slot] = None;
                        } else {
                            let text = generator.text(0, 8);
                            if state[slot].is_some() && generator.chance(1, 2) {
                                assert!(field.modify_record(key, text.as_bytes()).unwrap());
                            } else {
                                let added = field.add_record(key, text.as_bytes()).unwrap();
                                assert_eq!(added, state[slot].is_none());
                            }
                            state[slot] = Some(text);
                        }
                    }
                    keys.into_iter().zip(state).collect::<Vec<_>>()
                })
            })
            .collect();

        let field = &field;
        s.spawn(move || {
            let predicates = [
                TextPredicate::parse("dog").unwrap(),
                TextPredicate::parse("run*").unwrap(),
                TextPredicate::parse("*ing").unwrap(),
                TextPredicate::parse("app*").unwrap(),
            ];
            for round in 0..200 {
                let predicate = &predicates[round % predicates.len()];
                let keys: Vec<Key> = field.search(predicate, round % 3 == 0).unwrap().collect();
                let distinct: BTreeSet<&Key> = keys.iter().collect();
                assert_eq!(distinct.len(), keys.len());
            }
        });

        writers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    field.check_consistency().unwrap();

    let reference = TextFieldIndex::new(&schema_config(), &FieldTextConfig::default()).unwrap();
    for (key, text) in finals.into_iter().flatten() {
        if let Some(text) = text {
            reference.add_record(&key, text.as_bytes()).unwrap();
        }
    }
    assert_eq!(field.record_count(), reference.record_count());
    assert_eq!(field.snapshot().unwrap().records, reference.snapshot().unwrap().records);

    for word in DocumentGenerator::new(0).vocabulary() {
        for predicate in [
            TextPredicate::Term(word.clone()),
            TextPredicate::Prefix(word.clone()),
            TextPredicate::Suffix(word.clone()),
        ] {
            assert_eq!(
                keys_of(&field, &predicate),
                keys_of(&reference, &predicate),
                "{predicate}"
            );
        }
    }
}

/// A key that keeps one term for the whole run must show up in every search
/// for that term, while its other terms are rewritten and neighbouring terms
/// are created and destroyed around it in both tries.
#[test]
fn test_stable_key_never_missed_under_churn() {
    const NEIGHBOURS: [&str; 8] = [
        "harb", "harbors", "harbour", "harborside", "arbor", "barbor", "har", "bor",
    ];
    let field = TextFieldIndex::new(
        &schema_config(),
        &FieldTextConfig {
            no_stem: Some(true),
            with_suffix_trie: Some(true),
            ..Default::default()
        },
    )
    .unwrap();
    let anchor = Key::from("anchor");
    field.add_record(&anchor, b"harbor").unwrap();

    let predicates = [
        TextPredicate::parse("harbor").unwrap(),
        TextPredicate::parse("harb*").unwrap(),
        TextPredicate::parse("harbor*").unwrap(),
        TextPredicate::parse("*arbor").unwrap(),
        TextPredicate::parse("*bor").unwrap(),
        TextPredicate::parse("h*or").unwrap(),
    ];
    let done = AtomicBool::new(false);
    let searches = AtomicUsize::new(0);

    std::thread::scope(|s| {
        for _ in 0..2 {
            let (field, anchor, predicates, done, searches) =
                (&field, &anchor, &predicates, &done, &searches);
            s.spawn(move || {
                let mut round = 0;
                while !done.load(Ordering::Acquire) || round < 200 {
                    let predicate = &predicates[round % predicates.len()];
                    let keys = keys_of(field, predicate);
                    assert!(keys.contains(anchor), "{predicate} missed {anchor}");
                    round += 1;
                }
                searches.fetch_add(round, Ordering::Relaxed);
            });
        }

        let writers: Vec<_> = (0..4u64)
            .map(|w| {
                let field = &field;
                s.spawn(move || {
                    let mut generator = DocumentGenerator::new(900 + w);
                    let keys: Vec<Key> = (0..6)
                        .map(|i| Key::from(format!("churn:{w}:{i}")))
                        .collect();
                    for _ in 0..500 {
                        let key = &keys[generator.index(keys.len())];
                        if generator.chance(1, 3) {
                            field.remove_record(key, DeletionType::Deleted).unwrap();
                        } else {
                            let first = NEIGHBOURS[generator.index(NEIGHBOURS.len())];
                            let second = NEIGHBOURS[generator.index(NEIGHBOURS.len())];
                            field
                                .add_record(key, format!("{first} {second}").as_bytes())
                                .unwrap();
                        }
                    }
                    for key in &keys {
                        field.remove_record(key, DeletionType::None).unwrap();
                    }
                })
            })
            .collect();

        {
            let (field, anchor) = (&field, &anchor);
            s.spawn(move || {
                let mut generator = DocumentGenerator::new(42);
                for _ in 0..500 {
                    let extra = NEIGHBOURS[generator.index(NEIGHBOURS.len())];
                    let text = format!("{} harbor {extra}", generator.word());
                    assert!(field.modify_record(anchor, text.as_bytes()).unwrap());
                }
            })
            .join()
            .unwrap();
        }
        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);
    });

    assert!(searches.load(Ordering::Relaxed) >= 400);
    field.check_consistency().unwrap();
    assert_eq!(field.record_count(), 1);
    assert!(keys_of(&field, &TextPredicate::parse("harbor").unwrap()).contains(&anchor));
}

/// Several threads hammer the same keys with overlapping texts. Only the
/// per-key serialization keeps the reverse index and the corpus in sync.
#[test]
fn test_contended_keys() {
    let field = TextFieldIndex::new(&schema_config(), &FieldTextConfig::default()).unwrap();
    let keys: Vec<Key> = (0..8).map(|i| Key::from(format!("hot:{i}"))).collect();

    std::thread::scope(|s| {
        for t in 0..6u64 {
            let (field, keys) = (&field, &keys);
            s.spawn(move || {
                let mut generator = DocumentGenerator::new(t);
                for _ in 0..300 {
                    let key = &keys[generator.index(keys.len())];
                    match generator.index(3) {
                        0 => {
                            field.add_record(key, generator.text(1, 6).as_bytes()).unwrap();
                        }
                        1 => {
                            field.modify_record(key, generator.text(0, 6).as_bytes()).unwrap();
                        }
                        _ => {
                            field.remove_record(key, DeletionType::Expired).unwrap();
                        }
                    }
                }
            });
        }
    });

    field.check_consistency().unwrap();
    for key in &keys {
        field.remove_record(key, DeletionType::None).unwrap();
    }
    assert_eq!(field.corpus().term_count(), 0);
    assert_eq!(field.record_count(), 0);
    field.check_consistency().unwrap();
}

/// Fields sharing one corpus mutate the same terms from different threads.
#[test]
fn test_fields_sharing_corpus_concurrently() {
    let schema = TextIndexSchema::new(schema_config()).unwrap();
    let fields: Vec<TextFieldIndex> = (0..3)
        .map(|_| schema.create_field(&FieldTextConfig::default()).unwrap())
        .collect();

    std::thread::scope(|s| {
        for (f, field) in fields.iter().enumerate() {
            s.spawn(move || {
                let mut generator = DocumentGenerator::new(500 + f as u64);
                for (key, text) in generator.documents(100, 6) {
                    field.add_record(&Key::from(key), text.as_bytes()).unwrap();
                }
                for i in (0..100).step_by(2) {
                    let key = Key::from(DocumentGenerator::key(i));
                    field.remove_record(&key, DeletionType::Deleted).unwrap();
                }
            });
        }
    });

    for field in &fields {
        assert_eq!(field.record_count(), 50);
        field.check_consistency().unwrap();
    }
    for field in &fields {
        for i in (1..100).step_by(2) {
            field
                .remove_record(&Key::from(DocumentGenerator::key(i)), DeletionType::None)
                .unwrap();
        }
    }
    assert_eq!(schema.info().num_terms, 0);
}
