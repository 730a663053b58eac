pub mod allele_enumerator;
pub mod bubble;
pub mod bubble_scorer;
pub mod candidate_sites;
pub mod graph_builder;
