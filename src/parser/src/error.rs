use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("genotype likelihood input file (--geno) missing")]
    MissingGenoFile,

    #[error("a position file (--pos) is required in order to filter pairs by maximum distance. \
             Either provide one, or disable distance filtering with --max-kb-dist 0")]
    MissingPositionFile,

    #[error("genotypes can only be called from likelihoods/probabilities (--probs)")]
    CallGenoWithoutProbs,

    #[error("--{arg} must lie within [0, 1] (got {value})")]
    InvalidThreshold { arg: &'static str, value: f64 },

    #[error("number of threads (--n-threads) cannot be less than 1")]
    InvalidThreadCount,

    #[error("--{arg} missing or 0")]
    EmptyDimension { arg: &'static str },
}
