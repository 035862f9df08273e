//! End-to-end insertion and stabilization scenarios.

use gcsplice::prelude::*;
use std::collections::BTreeSet;

fn t(raw: u32) -> EpType {
    EpType::new(raw)
}

fn leaf(source: &InMemorySource, inputs: &[EpType], wiring: &[u16]) -> GeneticCode {
    GeneticCode::codon(source.next_reference(), GcGraph::leaf(inputs, wiring).expect("legal leaf"))
}

fn constant(source: &InMemorySource, typ: EpType) -> GeneticCode {
    GeneticCode::codon(source.next_reference(), GcGraph::constant(&[("1", typ)]).expect("legal constant"))
}

fn seeded(source: &InMemorySource, seed: u64) -> Stabilizer<'_, InMemorySource> {
    Stabilizer::with_config(source, StabilizerConfig::seeded(seed)).expect("valid config")
}

fn feeder(gc: &GeneticCode, row: Row, index: u16) -> Option<EndpointRef> {
    gc.graph().internal().get(&EndpointKey::destination(row, index)).and_then(|ep| ep.feeder())
}

#[test]
fn stacking_keeps_the_target_below_the_insert() {
    let source = InMemorySource::new();
    let target = leaf(&source, &[t(1)], &[0]);
    let insert = leaf(&source, &[t(1)], &[0]);

    let out = seeded(&source, 1).insert(target.clone(), insert.clone(), InsertionRow::I).expect("stack");
    let gc = &out.gc;
    assert_eq!(out.trace.cases(), vec![InsertCase::Stack]);
    assert_eq!(gc.gca(), Some(insert.reference()));
    assert_eq!(gc.gcb(), Some(target.reference()));
    assert_eq!(gc.ancestor_a(), Some(target.reference()));
    assert_eq!(gc.ancestor_b(), Some(insert.reference()));
    assert_eq!(gc.interface(), target.interface());

    // I -> A -> B -> O, with B reproducing the target's interface.
    assert_eq!(feeder(gc, Row::A, 0), Some(EndpointRef::new(Row::I, 0)));
    assert_eq!(feeder(gc, Row::B, 0), Some(EndpointRef::new(Row::A, 0)));
    assert_eq!(feeder(gc, Row::O, 0), Some(EndpointRef::new(Row::B, 0)));
    assert!(out.byproducts.is_empty());
}

#[test]
fn filling_a_keeps_the_outputs_and_is_deterministic() {
    let source = InMemorySource::new();
    let target = leaf(&source, &[t(1), t(2)], &[1, 0]);
    let insert = leaf(&source, &[t(1), t(2)], &[1]);

    // Without an A row, inserting above A or above O both fill A.
    let runs: Vec<GeneticCode> = [InsertionRow::A, InsertionRow::O]
        .into_iter()
        .flat_map(|row| (0..4).map(move |seed| (row, seed)))
        .map(|(row, seed)| {
            let out = seeded(&source, seed).insert(target.clone(), insert.clone(), row).expect("fill");
            assert_eq!(out.trace.cases(), vec![InsertCase::FillA]);
            out.gc
        })
        .collect();

    let gc = &runs[0];
    assert!(gc.is_stable());
    assert_eq!(gc.gca(), Some(insert.reference()));
    assert_eq!(gc.gcb(), None);
    assert_eq!(feeder(gc, Row::A, 0), Some(EndpointRef::new(Row::I, 0)));
    assert_eq!(feeder(gc, Row::A, 1), Some(EndpointRef::new(Row::I, 1)));
    assert_eq!(feeder(gc, Row::O, 0), Some(EndpointRef::new(Row::I, 1)));
    assert_eq!(feeder(gc, Row::O, 1), Some(EndpointRef::new(Row::I, 0)));
    // The unused output of A lands in U.
    assert_eq!(feeder(gc, Row::U, 0), Some(EndpointRef::new(Row::A, 0)));

    let signatures: BTreeSet<HashValue> = runs.iter().map(GeneticCode::signature).collect();
    assert_eq!(signatures.len(), 1);
}

/// `I(t1, t2)` selecting on `I1` between two pass-throughs of `I0`.
fn conditional(source: &InMemorySource) -> GeneticCode {
    let g = InternalGraph::new()
        .with_sources(Row::I, &[t(1), t(2)])
        .with_destinations(Row::F, &[t(2)])
        .with_destinations(Row::O, &[t(1)])
        .with_destinations(Row::P, &[t(1)])
        .connected(EndpointKey::destination(Row::F, 0), EndpointRef::new(Row::I, 1))
        .connected(EndpointKey::destination(Row::O, 0), EndpointRef::new(Row::I, 0))
        .connected(EndpointKey::destination(Row::P, 0), EndpointRef::new(Row::I, 0));
    GeneticCode::codon(source.next_reference(), GcGraph::new(g).expect("legal conditional"))
}

#[test]
fn conditional_targets_fill_b_beside_an_existing_a() {
    let source = InMemorySource::new();
    let mut stabilizer = seeded(&source, 6);
    let first = leaf(&source, &[t(1)], &[0]);
    let with_a = stabilizer
        .insert(conditional(&source), first.clone(), InsertionRow::A)
        .expect("fill a")
        .gc;
    assert!(with_a.graph().has_row(Row::F));
    assert_eq!(with_a.gca(), Some(first.reference()));

    for row in [InsertionRow::B, InsertionRow::P] {
        let insert = leaf(&source, &[t(1)], &[0]);
        let out = stabilizer.insert(with_a.clone(), insert.clone(), row).expect("fill b");
        let gc = &out.gc;
        assert_eq!(out.trace.cases(), vec![InsertCase::FillB]);
        assert!(out.byproducts.is_empty());
        assert_eq!(gc.gca(), with_a.gca());
        assert_eq!(gc.gcb(), Some(insert.reference()));
        assert_eq!(gc.interface(), with_a.interface());
        // Under a condition, B reads the inputs rather than A.
        assert_eq!(feeder(gc, Row::B, 0), Some(EndpointRef::new(Row::I, 0)));
        assert_eq!(feeder(gc, Row::F, 0), Some(EndpointRef::new(Row::I, 1)));
        assert_eq!(feeder(gc, Row::O, 0), Some(EndpointRef::new(Row::I, 0)));
        let p0 = if row == InsertionRow::P { EndpointRef::new(Row::B, 0) } else { EndpointRef::new(Row::I, 0) };
        assert_eq!(feeder(gc, Row::P, 0), Some(p0));
    }
}

#[test]
fn open_outputs_are_resolved_from_the_source() {
    let source = InMemorySource::new();
    let material = constant(&source, t(2));
    source.publish(vec![material.clone()]).expect("publish");

    let open = InternalGraph::new()
        .with_sources(Row::I, &[t(1)])
        .with_destinations(Row::O, &[t(2)]);
    let target = GeneticCode::codon(source.next_reference(), GcGraph::new(open).expect("legal"));
    assert!(!target.is_stable());

    let out = stabilize(&source, target.clone()).expect("stabilizes");
    assert!(out.gc.is_stable());
    assert_eq!(out.gc.interface(), target.interface());
    assert_eq!(out.trace.resolutions(), 1);
    assert_eq!(source.metrics().queries, 1);
    assert_eq!(source.metrics().tier_hits[MatchTier::LADDER.len() - 2], 1);

    let embryo = out.gc.gca().and_then(|r| out.byproducts.get(&r)).expect("embryo");
    assert_eq!(embryo.gca(), Some(material.reference()));
    assert_eq!(embryo.interface(), material.interface());
}

#[test]
fn every_substructure_reference_resolves_after_nested_repairs() {
    let source = InMemorySource::new();
    let lower = leaf(&source, &[t(1)], &[0]);
    let upper = leaf(&source, &[t(1)], &[0]);
    let insert = leaf(&source, &[t(5)], &[0]);
    let material = constant(&source, t(5));
    source
        .publish(vec![lower.clone(), upper.clone(), insert.clone(), material])
        .expect("publish");

    let mut stabilizer = seeded(&source, 11);
    let stacked = stabilizer
        .insert(lower, upper, InsertionRow::I)
        .expect("stack")
        .publish_to(&source)
        .expect("publish stacked");

    let out = stabilizer.insert(stacked.clone(), insert, InsertionRow::O).expect("stabilizes");
    assert!(out.trace.max_depth() >= 1);
    assert!(out.records().all(GeneticCode::is_stable));
    for gc in out.records() {
        for r in gc.gca().into_iter().chain(gc.gcb()) {
            assert!(
                out.byproducts.contains_key(&r) || source.get(r).is_some(),
                "{} names unknown record {}",
                gc.reference(),
                r
            );
        }
    }
    // Nothing superseded during the pass survives.
    let live: BTreeSet<GcRef> = out.records().map(GeneticCode::reference).collect();
    let minted: BTreeSet<GcRef> = out.trace.minted().into_iter().collect();
    let superseded: Vec<GcRef> = minted.difference(&live).copied().collect();
    assert!(!superseded.is_empty());
    assert!(out.records().all(|gc| gc.references().all(|r| !superseded.contains(&r))));

    let before = source.len();
    let records = out.byproducts.len() + 1;
    let gc = out.publish_to(&source).expect("publish");
    assert_eq!(source.len(), before + records);
    assert!(source.lineage(gc.reference()).contains(&stacked.reference()));
}

#[test]
fn an_empty_source_fails_recoverably() {
    let source = InMemorySource::new();
    let open = InternalGraph::new()
        .with_sources(Row::I, &[t(1)])
        .with_destinations(Row::O, &[t(3)]);
    let target = GeneticCode::codon(source.next_reference(), GcGraph::new(open).expect("legal"));

    let err = seeded(&source, 2).stabilize(target).unwrap_err();
    assert!(err.is_recoverable());
    assert!(matches!(err, StabilizeError::Resolution(ResolutionFailed::NoCandidate { row: Row::O, .. })));
    assert_eq!(source.metrics().misses, 1);
    assert!(source.is_empty());
}

#[test]
fn stabilized_graphs_are_fixed_points_of_normalization() {
    let source = InMemorySource::new();
    let target = leaf(&source, &[t(1), t(2)], &[0, 1]);
    let insert = leaf(&source, &[t(2)], &[0, 0]);
    let out = seeded(&source, 4).insert(target, insert, InsertionRow::A).expect("insert");

    let mut graph = out.gc.graph().clone();
    let before = graph.fingerprint();
    assert!(graph.normalize(&mut rand::thread_rng()));
    assert_eq!(graph.fingerprint(), before);
    assert!(graph.validate().is_ok());
}

#[test]
fn app_view_round_trips_through_json() {
    let source = InMemorySource::new();
    let target = GeneticCode::codon(
        source.next_reference(),
        GcGraph::constant(&[("3", t(7)), ("x", t(8))]).expect("legal"),
    );
    let insert = leaf(&source, &[t(7)], &[0]);
    let out = seeded(&source, 9).insert(target, insert, InsertionRow::O).expect("insert");

    let view = out.gc.graph().app_view().expect("stable");
    assert_eq!(view.constants.len(), 2);
    let json = serde_json::to_string(&view).expect("serialize");
    let back: AppGraph = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, view);

    let rebuilt = GcGraph::from_app(&back).expect("legal");
    assert_eq!(rebuilt.fingerprint(), out.gc.signature());
    assert_eq!(rebuilt.interface(), out.gc.interface());
    assert_eq!(rebuilt.app_view().expect("stable"), view);
}

#[test]
fn stable_targets_pass_through_unpublished() {
    let source = InMemorySource::new();
    let gc = leaf(&source, &[t(1)], &[0]);
    source.publish(vec![gc.clone()]).expect("publish");
    let out = stabilize(&source, gc.clone()).expect("stable");
    assert_eq!(out.gc, gc);
    // Nothing new: publishing the pass is a no-op rather than a duplicate.
    assert_eq!(out.publish_to(&source).expect("no-op"), gc);
    assert_eq!(source.len(), 1);
}

#[test]
fn illegal_requests_are_configuration_errors() {
    assert!(InsertionRow::try_from(Row::F).is_err());
    assert!(InsertionRow::try_from(Row::U).is_err());
    let bad = StabilizerConfig { max_steps: 0, ..StabilizerConfig::default() };
    assert!(Stabilizer::with_config(&InMemorySource::new(), bad).is_err());

    let orphan_b = InternalGraph::new()
        .with_sources(Row::I, &[t(1)])
        .with_destinations(Row::B, &[t(1)]);
    assert!(GcGraph::new(orphan_b).is_err());
}
