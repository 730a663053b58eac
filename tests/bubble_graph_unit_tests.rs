extern crate pardalote;

use pardalote::bubbles::candidate_sites::CandidateSiteFinder;
use pardalote::bubbles::graph_builder::BubbleGraphBuilder;
use pardalote::phasing::phasing_engine::PhasingEngine;
use pardalote::model::params::PolishParams;
use pardalote::model::reads::{SequenceRead, VcfEntry};
use pardalote::poa::poa_graph::{Poa, PoaNode, PoaObservation};
use pardalote::rle::rle_string::RleString;

const REF_SEQ: &[u8] = b"ACGTAGCTCA";
const ALT_SEQ: &[u8] = b"ACGTATCTCA";

/// A ten-column POA with one heterozygous SNP at column 5: reads 0..4 carry
/// the reference base, reads 4..8 the alternative, two per strand each.
struct SnpPoaFixture {
    poa: Poa,
    reads: Vec<SequenceRead>,
    params: PolishParams,
}

impl SnpPoaFixture {
    fn new() -> SnpPoaFixture {
        let params = PolishParams::default();
        let ref_rle = RleString::from_expanded(REF_SEQ, params.use_run_length_encoding);
        assert_eq!(ref_rle.len(), REF_SEQ.len());

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

        SnpPoaFixture {
            poa: Poa::new(nodes, ref_rle),
            reads,
            params,
        }
    }
}

#[test]
fn detector_marks_the_snp_and_trims_anchors() {
    let fixture = SnpPoaFixture::new();
    let sites = CandidateSiteFinder::find(&fixture.poa, &fixture.params, None);

    assert!(sites.variant_positions[5]);
    assert_eq!(sites.variant_positions.iter().filter(|v| **v).count(), 1);

    // dilation by column_anchor_trim = 2 on both sides
    let intervals = sites.bubble_intervals();
    assert_eq!(intervals, vec![(3, 5)]);
    assert!(sites.anchors[2]);
    assert!(!sites.anchors[3]);
    assert!(!sites.anchors[7]);
    assert!(sites.anchors[8]);
}

#[test]
fn graph_carries_ref_and_alt_alleles_with_full_support_matrix() {
    let fixture = SnpPoaFixture::new();
    let graph =
        BubbleGraphBuilder::build(&fixture.poa, &fixture.reads, &fixture.params, None).unwrap();

    assert_eq!(graph.bubble_no(), 1);
    let bubble = &graph.bubbles[0];
    assert_eq!(bubble.ref_start, 3);
    assert_eq!(bubble.bubble_length, 5);
    assert_eq!(bubble.allele_no(), 2);
    assert_eq!(bubble.read_no(), 8);
    assert_eq!(
        bubble.allele_read_supports.len(),
        bubble.allele_no() * bubble.read_no()
    );

    // the reference allele is always a member
    let ref_idx = bubble.ref_allele_index();
    assert!(bubble.alleles[ref_idx].eq_expanded(&bubble.ref_allele));
    assert_eq!(bubble.ref_allele.expand(), b"TAGCT".to_vec());
    let alt_idx = 1 - ref_idx;
    assert_eq!(bubble.alleles[alt_idx].expand(), b"TATCT".to_vec());
}

#[test]
fn scorer_ranks_reads_to_their_own_allele() {
    let fixture = SnpPoaFixture::new();
    let graph =
        BubbleGraphBuilder::build(&fixture.poa, &fixture.reads, &fixture.params, None).unwrap();
    let bubble = &graph.bubbles[0];
    let ref_idx = bubble.ref_allele_index();
    let alt_idx = 1 - ref_idx;

    for (read_id, expect_ref) in [(0usize, true), (3, true), (4, false), (7, false)] {
        let k = bubble.read_index(read_id).unwrap();
        let ref_support = bubble.support(ref_idx, k);
        let alt_support = bubble.support(alt_idx, k);
        if expect_ref {
            assert!(
                ref_support > alt_support,
                "read {} should favour the reference allele",
                read_id
            );
        } else {
            assert!(
                alt_support > ref_support,
                "read {} should favour the alternative allele",
                read_id
            );
        }
    }
}

#[test]
fn poa_enumeration_produces_base_substitution_products() {
    let fixture = SnpPoaFixture::new();
    let mut params = fixture.params.clone();
    params.use_read_alleles = false;
    params.use_read_alleles_in_phasing = false;

    let graph = BubbleGraphBuilder::build(&fixture.poa, &fixture.reads, &params, None).unwrap();
    assert_eq!(graph.bubble_no(), 1);
    let bubble = &graph.bubbles[0];
    assert_eq!(bubble.allele_no(), 2);
    let expanded: Vec<Vec<u8>> = bubble.alleles.iter().map(|a| a.expand()).collect();
    assert!(expanded.contains(&b"TAGCT".to_vec()));
    assert!(expanded.contains(&b"TATCT".to_vec()));
}

#[test]
fn vcf_entries_drive_bubble_construction() {
    let fixture = SnpPoaFixture::new();
    let entries = vec![VcfEntry {
        contig: "chr1".to_string(),
        ref_pos: 5,
        alleles: vec![b"G".to_vec(), b"T".to_vec()],
        gt1: 0,
        gt2: 1,
        ref_aln_start: 3,
        ref_aln_stop_incl: 7,
        raw_ref_pos_informative_only: false,
    }];

    let graph = BubbleGraphBuilder::build(
        &fixture.poa,
        &fixture.reads,
        &fixture.params,
        Some(&entries),
    )
    .unwrap();
    assert_eq!(graph.bubble_no(), 1);
    let bubble = &graph.bubbles[0];
    assert_eq!(bubble.ref_start, 3);
    assert_eq!(bubble.variant_position_offsets, vec![2]);
    assert_eq!(bubble.allele_no(), 2);
}

#[test]
fn allele_offsets_are_prefix_sums() {
    let fixture = SnpPoaFixture::new();
    let graph =
        BubbleGraphBuilder::build(&fixture.poa, &fixture.reads, &fixture.params, None).unwrap();

    let mut expected_offset = 0;
    for bubble in &graph.bubbles {
        assert_eq!(bubble.allele_offset, expected_offset);
        expected_offset += bubble.allele_no();
    }
    assert_eq!(graph.total_alleles, expected_offset);
}

#[test]
fn engine_emits_reference_haplotypes_without_candidates() {
    let fixture = SnpPoaFixture::new();
    let mut poa = fixture.poa.clone();
    let g = fixture.params.symbol_index(b'G').unwrap();
    let t = fixture.params.symbol_index(b'T').unwrap();
    poa.nodes[5].base_weights[g] = 20.0;
    poa.nodes[5].base_weights[t] = 0.0;

    let engine = PhasingEngine::new(
        fixture.params.clone(),
        pardalote::model::params::PhaseParams::default(),
    )
    .unwrap();
    let chunk = engine.phase_chunk(&poa, &fixture.reads, None).unwrap();
    assert!(chunk.fragment.is_empty());
    assert_eq!(chunk.hap1.expand(), REF_SEQ.to_vec());
    assert_eq!(chunk.hap2.expand(), REF_SEQ.to_vec());
}

#[test]
fn uniform_poa_yields_no_bubbles() {
    let fixture = SnpPoaFixture::new();
    let mut poa = fixture.poa.clone();
    // flatten column 5 back to a pure reference column
    let g = fixture.params.symbol_index(b'G').unwrap();
    let t = fixture.params.symbol_index(b'T').unwrap();
    poa.nodes[5].base_weights[g] = 20.0;
    poa.nodes[5].base_weights[t] = 0.0;

    let graph = BubbleGraphBuilder::build(&poa, &fixture.reads, &fixture.params, None).unwrap();
    assert_eq!(graph.bubble_no(), 0);
    assert_eq!(graph.total_alleles, 0);
}
