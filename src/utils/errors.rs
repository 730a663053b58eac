use thiserror::Error;

#[derive(Error, Debug)]
pub enum PardaloteError {
    #[error("malformed input: {0}")]
    InputMalformed(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("allele enumeration exceeded the budget of {budget} candidate strings")]
    OverflowBudget { budget: usize },
    #[error("run length of zero at position {0}")]
    ZeroRunLength(usize),
    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
