pub mod pair_hmm;
