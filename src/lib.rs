#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;

pub mod bubbles;
pub mod cli;
pub mod correctness;
pub mod model;
pub mod pair_hmm;
pub mod phasing;
pub mod poa;
pub mod rle;
pub mod utils;
