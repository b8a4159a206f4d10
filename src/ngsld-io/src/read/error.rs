use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("site {site}: expected {expected} genotype likelihood fields \
             (optionally preceded by the 3 beagle marker columns), found {found}")]
    WrongArity { site: usize, expected: usize, found: usize },

    #[error("site {site}, individual {ind}: '{field}' is not a valid floating point value")]
    ParseFloat { site: usize, ind: usize, field: String },

    #[error("genotype likelihood matrix holds {found} rows, expected {expected} sites")]
    WrongSiteCount { found: usize, expected: usize },

    #[error("binary genotype likelihood matrix holds {found} values, expected {expected}")]
    WrongValueCount { found: usize, expected: usize },

    #[error("position file, line {line}: expected 'chromosome<TAB>position'")]
    PositionColumns { line: usize },

    #[error("position file, line {line}: '{field}' is not a valid position")]
    PositionParse { line: usize, field: String },

    #[error("position file, line {line}: positions are not sorted (chromosome '{chrom}' \
             reappears after another chromosome)")]
    UnsortedChromosomes { line: usize, chrom: String },

    #[error("position file, line {line}: position {pos} is lower than its predecessor {prev} \
             on chromosome '{chrom}'")]
    UnsortedPositions { line: usize, chrom: String, pos: u64, prev: u64 },

    #[error("position file holds {found} sites, expected {expected}")]
    WrongPositionCount { found: usize, expected: usize },
}
