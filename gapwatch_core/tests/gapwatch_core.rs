use gapwatch_core::*;
use proptest::prelude::*;

fn o(n: i64) -> Outcome {
    Outcome::new(n).unwrap()
}

fn seq(ns: &[i64]) -> Vec<Outcome> {
    ns.iter().map(|&n| o(n)).collect()
}

fn entity(id: &str, numbers: &[i64], multiplier: f64) -> TrackableEntity {
    let numbers: OutcomeSet = seq(numbers).into_iter().collect();
    let def = EntityDefinition {
        id: id.to_string(),
        name: id.to_string(),
        tags: TagSet::default(),
        numbers,
        score: numbers.len(),
    };
    TrackableEntity::from_definition(&def, multiplier, false)
}

#[test]
fn every_attribute_partitions_the_domain() {
    for attr in Attribute::ALL {
        let cells = partition(attr);
        let mut seen = OutcomeSet::EMPTY;
        let mut total = 0;
        for (_, members) in &cells {
            assert!(members.intersection(seen).is_empty(), "{attr:?} cells overlap");
            seen = seen.union(*members);
            total += members.len();
        }
        assert_eq!(total, DOMAIN_SIZE, "{attr:?}");
        assert_eq!(seen, OutcomeSet::full());
    }
}

#[test]
fn classify_agrees_with_partitions() {
    for (outcome, props) in master_table() {
        for attr in Attribute::ALL {
            assert!(props.tag(attr).members().contains(outcome));
        }
    }
}

#[test]
fn resolver_agrees_with_master_table_query() {
    for def in generate_lexicon() {
        let scanned: OutcomeSet = master_table()
            .into_iter()
            .filter(|(_, p)| p.matches(&def.tags))
            .map(|(o, _)| o)
            .collect();
        assert_eq!(scanned, def.numbers, "{}", def.id);
    }
}

#[test]
fn lexicon_is_deterministic_and_non_empty() {
    let a = generate_lexicon();
    let b = generate_lexicon();
    assert_eq!(a, b);
    assert_eq!(serde_json::to_vec(&a).unwrap(), serde_json::to_vec(&b).unwrap());
    assert!(!a.is_empty());
    assert!(a.iter().all(|e| !e.numbers.is_empty() && e.score == e.numbers.len()));
}

#[test]
fn lexicon_ids_are_unique_and_tag_counts_bounded() {
    let lex = generate_lexicon();
    let mut ids: Vec<&str> = lex.iter().map(|e| e.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), lex.len());
    assert!(lex.iter().all(|e| (1..=3).contains(&e.tags.tags().len())));
    // singles come first, in curated axis order
    assert_eq!(lex[0].name, "Red");
    assert_eq!(lex[0].score, 18);
}

#[test]
fn lexicon_zero_entities_keep_distinct_ids() {
    let lex = generate_lexicon();
    let zeros: Vec<&EntityDefinition> = lex.iter().filter(|e| e.name == "Zero").collect();
    assert_eq!(zeros.len(), 3); // range, dozen, column
    assert!(zeros.iter().all(|e| e.numbers == OutcomeSet::from(vec![Outcome::ZERO])));
}

#[test]
fn never_hit_last_seen_equals_length() {
    let history = seq(&[1, 2, 3, 4, 5]);
    let e = entity("zero", &[0], 3.0);
    let map = recompute(&history, &[e]);
    assert_eq!(map["zero"].stats, GapStats { last_seen_ago: 5, longest_gap: 5 });
}

#[test]
fn empty_history_is_zero() {
    let map = recompute(&[], &[entity("one", &[1], 3.0)]);
    assert_eq!(map["one"].stats, GapStats::default());
    assert!(map["one"].hit_miss.is_empty());
}

#[test]
fn redo_branch_is_discarded_on_append() {
    let (a, b, c, d) = (o(1), o(2), o(3), o(4));
    let mut h = OutcomeHistory::default();
    for x in [a, b, c] {
        h.append(x);
    }
    h.undo();
    h.undo();
    assert_eq!(h.pointer(), Some(0));
    h.append(d);
    assert_eq!(h.active(), &[a, d][..]);
    assert!(!h.redo());
    assert_eq!(h.active(), &[a, d][..]);
}

#[test]
fn two_alerts_never_intersect() {
    let sets = vec![OutcomeSet::from(seq(&[1, 2])); 2];
    assert!(intersect(sets, IntersectionRule::ALERTS).is_empty());
}

#[test]
fn three_alerts_share_one_outcome() {
    let sets = vec![
        OutcomeSet::from(seq(&[5, 1])),
        OutcomeSet::from(seq(&[5, 2])),
        OutcomeSet::from(seq(&[5, 3])),
    ];
    let hits = intersect(sets, IntersectionRule::ALERTS);
    assert_eq!(hits, vec![Intersection { outcome: o(5), count: 3 }]);
}

#[test]
fn intersection_sorted_by_count_then_outcome() {
    let sets = vec![
        OutcomeSet::from(seq(&[9, 4, 7])),
        OutcomeSet::from(seq(&[9, 4, 7])),
        OutcomeSet::from(seq(&[9, 4])),
        OutcomeSet::from(seq(&[9, 7])),
    ];
    let hits = intersect(sets, IntersectionRule::ALERTS);
    let flat: Vec<(u8, usize)> = hits.iter().map(|h| (h.outcome.value(), h.count)).collect();
    assert_eq!(flat, vec![(9, 4), (4, 3), (7, 3)]);
}

#[test]
fn alerts_rank_by_score_then_gap() {
    let mut a = entity("a", &[1, 2], 0.0);
    a.last_seen_ago = 3;
    let mut b = entity("b", &[3], 0.0);
    b.last_seen_ago = 1;
    let mut c = entity("c", &[4, 5], 0.0);
    c.last_seen_ago = 9;
    let mut wide = entity("wide", &[6, 7, 8, 9, 10, 11, 12], 0.0);
    wide.last_seen_ago = 50;

    let alerts = active_alerts(&[a, b, c, wide], 6);
    let ids: Vec<&str> = alerts.iter().map(|x| x.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}

#[test]
fn alert_threshold_is_inclusive() {
    let mut e = entity("e", &[1], 3.0);
    e.threshold = 10.0;
    e.last_seen_ago = 10;
    assert!(is_alert(&e, 6));
    e.last_seen_ago = 9;
    assert!(!is_alert(&e, 6));
}

#[test]
fn repeated_single_outcome_scenario() {
    let history = vec![o(1); 18];
    let mut single = entity("single", &[1], 3.0);
    let mut six = entity("six", &[2, 3, 4, 5, 6, 7], 3.0);
    assert!((single.expected_gap - 37.0).abs() < 1e-9);
    assert!((single.threshold - 111.0).abs() < 1e-9);

    let map = recompute(&history, &[single.clone(), six.clone()]);
    single.apply(map["single"].stats);
    six.apply(map["six"].stats);

    assert_eq!(single.last_seen_ago, 0);
    assert!(!is_alert(&single, 6));
    assert_eq!(six.last_seen_ago, 18);
    assert_eq!(six.longest_gap, 18);
}

fn history_strategy() -> impl Strategy<Value = Vec<Outcome>> {
    prop::collection::vec(0i64..=36, 0..=200).prop_map(|v| v.into_iter().map(o).collect())
}

proptest! {
    #[test]
    fn full_and_incremental_agree(history in history_strategy(), cut in 0usize..=200) {
        let targets = generate_lexicon();
        let full = recompute(&history, &targets);

        let cut = cut.min(history.len());
        let mut engine = IncrementalGapEngine::new();
        engine.extend(&targets, &history[..cut]);
        for chunk in history[cut..].chunks(7) {
            engine.extend(&targets, chunk);
        }

        for t in &targets {
            prop_assert_eq!(full[&t.id].stats, engine.gap_map()[&t.id].stats);
        }
    }

    #[test]
    fn longest_gap_covers_open_gap(history in history_strategy()) {
        for def in generate_lexicon().iter().take(40) {
            let stats = analyze(&map_hits(&history, def.numbers));
            prop_assert!(stats.longest_gap >= stats.last_seen_ago.min(history.len()));
            prop_assert_eq!(stats.last_seen_ago, spins_since_hit(&history, def.numbers));
            prop_assert_eq!(stats.longest_gap, longest_gap(&history, def.numbers));
        }
    }

    #[test]
    fn auto_threshold_never_decreases(
        ops in prop::collection::vec((0u8..4, 0i64..=36), 0..300),
        members in prop::collection::vec(0i64..=36, 1..6),
    ) {
        let numbers: OutcomeSet = members.into_iter().map(o).collect();
        let policy = ThresholdPolicy::default();
        let mut h = OutcomeHistory::with_capacity(50);
        let mut threshold = initial_threshold(numbers.len(), 3.0);

        for (op, value) in ops {
            match op {
                0 | 1 => h.append(o(value)),
                2 => { h.undo(); }
                _ => { h.redo(); }
            }
            if value == 36 && op == 3 {
                h.clear();
            }
            let active = h.active();
            let next = policy.adapt(threshold, longest_gap(active, numbers), active.len(), true);
            prop_assert!(next >= threshold);
            threshold = next;
        }
    }
}
