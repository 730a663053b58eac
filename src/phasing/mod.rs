pub mod genome_fragment;
pub mod partition_hmm;
pub mod phasing_engine;
pub mod profile_seq;
pub mod read_attachment;
pub mod refinement;
