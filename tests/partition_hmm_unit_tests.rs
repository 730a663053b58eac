extern crate pardalote;

use std::collections::BTreeSet;

use pardalote::bubbles::graph_builder::BubbleGraphBuilder;
use pardalote::model::params::{PhaseParams, PolishParams};
use pardalote::model::reads::SequenceRead;
use pardalote::phasing::partition_hmm::{PhasingAlgorithm, ReadPartitionHmm};
use pardalote::phasing::phasing_engine::PhasingEngine;
use pardalote::phasing::profile_seq::{ProfileSeqProjector, ProfileStore, SiteReference};
use pardalote::phasing::read_attachment::ReadAttachmentEngine;
use pardalote::phasing::refinement::RefinementEngine;
use pardalote::poa::poa_graph::{Poa, PoaNode, PoaObservation};
use pardalote::rle::rle_string::RleString;

const REF_SEQ: &[u8] = b"ACGTAGCTCA";
const ALT_SEQ: &[u8] = b"ACGTATCTCA";

/// The SNP fixture of the bubble graph tests, with everything derived up to
/// the profile store: reads 0..4 are reference, reads 4..8 alternative, two
/// of each per strand.
struct PhasingFixture {
    params: PolishParams,
    poa: Poa,
    reads: Vec<SequenceRead>,
    graph: pardalote::bubbles::bubble::BubbleGraph,
    reference: SiteReference,
    store: ProfileStore,
}

impl PhasingFixture {
    fn new() -> PhasingFixture {
        let params = PolishParams::default();
        let ref_rle = RleString::from_expanded(REF_SEQ, params.use_run_length_encoding);

        let mut reads = Vec::new();
        for i in 0..4 {
            reads.push(SequenceRead::new(
                &format!("read_ref_{}", i),
                i % 2 == 0,
                RleString::from_expanded(REF_SEQ, true),
                vec![30; 10],
            ));
        }
        for i in 0..4 {
            reads.push(SequenceRead::new(
                &format!("read_alt_{}", i),
                i % 2 == 0,
                RleString::from_expanded(ALT_SEQ, true),
                vec![30; 10],
            ));
        }

        let mut nodes = Vec::new();
        for (i, &base) in REF_SEQ.iter().enumerate() {
            let mut node = PoaNode::new(base, params.alphabet.len(), params.max_repeat_count);
            if i == 5 {
                node.base_weights[params.symbol_index(b'G').unwrap()] = 10.0;
                node.base_weights[params.symbol_index(b'T').unwrap()] = 10.0;
            } else {
                node.base_weights[params.symbol_index(base).unwrap()] = 20.0;
            }
            for read_id in 0..reads.len() {
                node.observations.push(PoaObservation {
                    read_id,
                    offset: i,
                    weight: 1.0,
                });
            }
            nodes.push(node);
        }
        let poa = Poa::new(nodes, ref_rle);

        let graph = BubbleGraphBuilder::build(&poa, &reads, &params, None).unwrap();
        let profiles = ProfileSeqProjector::project(&graph, reads.len());
        let reference = SiteReference::from_bubble_graph(&graph, &params);
        let store = ProfileStore::new(reads.len(), profiles);

        PhasingFixture {
            params,
            poa,
            reads,
            graph,
            reference,
            store,
        }
    }

    fn alt_allele_index(&self) -> usize {
        1 - self.graph.bubbles[0].ref_allele_index()
    }
}

#[test]
fn profile_bytes_rank_the_supported_allele_lowest() {
    let fixture = PhasingFixture::new();
    let bubble = &fixture.graph.bubbles[0];
    let ref_idx = bubble.ref_allele_index();
    let alt_idx = fixture.alt_allele_index();

    let ref_profile = fixture.store.get(0).unwrap();
    let bytes = ref_profile.bytes_for_site(&fixture.reference, 0);
    assert!(bytes[ref_idx] < bytes[alt_idx]);

    let alt_profile = fixture.store.get(4).unwrap();
    let bytes = alt_profile.bytes_for_site(&fixture.reference, 0);
    assert!(bytes[alt_idx] < bytes[ref_idx]);
}

#[test]
fn exhaustive_cells_are_canonical() {
    let fixture = PhasingFixture::new();
    let hmm = ReadPartitionHmm::build_exhaustive(&fixture.reference, &fixture.store, None, false);
    assert_eq!(hmm.columns.len(), 1);
    let column = &hmm.columns[0];
    assert_eq!(column.active_reads, (0..8).collect::<Vec<usize>>());
    assert_eq!(column.cells.len(), 128);
    for cell in &column.cells {
        assert_eq!(cell.partition & 1, 0, "cell partitions must keep bit 0 clear");
    }
}

#[test]
fn phasing_splits_reads_by_allele() {
    let fixture = PhasingFixture::new();
    let fragment =
        PhasingAlgorithm::phase(&fixture.reference, &fixture.store, &PhaseParams::default());

    assert_eq!(fragment.length, 1);
    assert!(fragment.is_het_site(0));
    assert_ne!(fragment.hap1[0], fragment.hap2[0]);

    // the two read sets are disjoint and cover all phased reads
    assert!(fragment.reads1.is_disjoint(&fragment.reads2));
    let union: BTreeSet<usize> = fragment.reads1.union(&fragment.reads2).copied().collect();
    assert_eq!(union, (0..8).collect::<BTreeSet<usize>>());

    let ref_set: BTreeSet<usize> = (0..4).collect();
    let alt_set: BTreeSet<usize> = (4..8).collect();
    assert!(
        (fragment.reads1 == ref_set && fragment.reads2 == alt_set)
            || (fragment.reads1 == alt_set && fragment.reads2 == ref_set),
        "reads must split by carried allele, got {:?} / {:?}",
        fragment.reads1,
        fragment.reads2
    );
}

#[test]
fn empty_profile_store_yields_empty_fragment() {
    let fixture = PhasingFixture::new();
    let empty_store = ProfileStore::new(8, Vec::new());
    let fragment =
        PhasingAlgorithm::phase(&fixture.reference, &empty_store, &PhaseParams::default());
    assert!(fragment.is_empty());
    assert!(fragment.reads1.is_empty());
    assert!(fragment.reads2.is_empty());
}

#[test]
fn refinement_recovers_a_misassigned_read_in_one_round() {
    let fixture = PhasingFixture::new();
    let mut fragment =
        PhasingAlgorithm::phase(&fixture.reference, &fixture.store, &PhaseParams::default());
    let reads1_before = fragment.reads1.clone();
    let reads2_before = fragment.reads2.clone();

    // displace one read into the wrong haplotype, keeping the column
    // partition consistent with the move
    let moved = *reads1_before.iter().next().unwrap();
    fragment.reads1.remove(&moved);
    fragment.reads2.insert(moved);
    let bit = fragment.active_reads[0]
        .iter()
        .position(|id| *id == moved)
        .unwrap();
    fragment.partitions[0] ^= 1u64 << bit;

    let rounds = RefinementEngine::refine(
        &mut fragment,
        &fixture.reference,
        &fixture.store,
        10,
        true,
    );
    assert_eq!(rounds, 1);
    assert_eq!(fragment.reads1, reads1_before);
    assert_eq!(fragment.reads2, reads2_before);
}

#[test]
fn refinement_is_a_fixed_point_on_a_converged_fragment() {
    let fixture = PhasingFixture::new();
    let mut fragment =
        PhasingAlgorithm::phase(&fixture.reference, &fixture.store, &PhaseParams::default());
    let rounds = RefinementEngine::refine(
        &mut fragment,
        &fixture.reference,
        &fixture.store,
        10,
        true,
    );
    assert_eq!(rounds, 0);
}

#[test]
fn attachment_follows_het_site_support() {
    let fixture = PhasingFixture::new();
    let fragment =
        PhasingAlgorithm::phase(&fixture.reference, &fixture.store, &PhaseParams::default());
    let alt_idx = fixture.alt_allele_index();

    let result = ReadAttachmentEngine::attach(&fixture.graph, &fragment, &[4]);
    if fragment.hap1[0] == alt_idx {
        assert_eq!(result.hap1_reads, vec![4]);
        assert!(result.hap2_reads.is_empty());
    } else {
        assert_eq!(result.hap2_reads, vec![4]);
        assert!(result.hap1_reads.is_empty());
    }
    assert_eq!(result.no_score_count, 0);
}

#[test]
fn engine_phases_a_chunk_end_to_end() {
    let fixture = PhasingFixture::new();
    let engine = PhasingEngine::new(fixture.params.clone(), PhaseParams::default()).unwrap();
    let chunk = engine.phase_chunk(&fixture.poa, &fixture.reads, None).unwrap();

    assert_eq!(chunk.bubble_graph.bubble_no(), 1);
    assert_eq!(chunk.refinement_rounds, 0);

    // spliced haplotype strings are the two carried sequences, in some order
    let haplotypes = [chunk.hap1.expand(), chunk.hap2.expand()];
    assert!(haplotypes.contains(&REF_SEQ.to_vec()));
    assert!(haplotypes.contains(&ALT_SEQ.to_vec()));

    let supports = PhasingEngine::bubble_supports_json(&chunk, &fixture.reads);
    assert_eq!(supports["bubbles"].as_array().unwrap().len(), 1);
    let fragment_dump = PhasingEngine::fragment_json(&chunk, &fixture.reads);
    assert_eq!(
        fragment_dump["hap1Reads"].as_array().unwrap().len()
            + fragment_dump["hap2Reads"].as_array().unwrap().len(),
        8
    );
}

#[test]
fn attachment_counts_reads_without_het_evidence() {
    let fixture = PhasingFixture::new();
    let fragment =
        PhasingAlgorithm::phase(&fixture.reference, &fixture.store, &PhaseParams::default());

    // a read id that appears in no bubble has nothing to score against
    let result = ReadAttachmentEngine::attach(&fixture.graph, &fragment, &[99]);
    assert_eq!(result.no_score_count, 1);
    assert_eq!(result.unclassified_reads, vec![99]);
    assert!(result.hap1_reads.is_empty() && result.hap2_reads.is_empty());
}
