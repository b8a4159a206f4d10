use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use ahash::AHashMap;
use log::debug;

use super::ReadError;

/// Genomic location of one site of the likelihood matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePos {
    /// Index into [`PositionArray::chrom_names`].
    pub chrom: u32,
    pub pos: u64,
    pub label: String,
}

/// Sorted genomic coordinates, one entry per site. Read-only after load;
/// only used to filter site pairs on distance and to label output records.
#[derive(Debug, Default)]
pub struct PositionArray {
    sites: Vec<SitePos>,
    chrom_names: Vec<String>,
}

impl PositionArray {
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    #[must_use]
    pub fn site(&self, index: usize) -> &SitePos {
        &self.sites[index]
    }

    #[must_use]
    pub fn label(&self, index: usize) -> &str {
        &self.sites[index].label
    }

    /// Distance in bp between two sites, `None` when they sit on different
    /// chromosomes.
    #[must_use]
    pub fn dist(&self, i: usize, j: usize) -> Option<u64> {
        let (a, b) = (self.site(i), self.site(j));
        (a.chrom == b.chrom).then(|| b.pos.abs_diff(a.pos))
    }
}

/// Read a position file: one `chromosome<TAB>position` row per site
/// (any whitespace separator is accepted). A single header row is allowed
/// and skipped. Rows must be sorted, with non-decreasing positions within
/// each chromosome.
pub fn read_positions(path: &Path, n_sites: usize) -> Result<PositionArray, ReadError> {
    let source = BufReader::new(File::open(path)?);

    let mut sites = Vec::with_capacity(n_sites);
    let mut chrom_names: Vec<String> = Vec::new();
    let mut chrom_ids: AHashMap<String, u32> = AHashMap::new();
    let mut current_chrom: Option<u32> = None;

    for (idx, line) in source.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue
        }
        let mut fields = line.split_whitespace();
        let (Some(chrom), Some(pos)) = (fields.next(), fields.next()) else {
            return Err(ReadError::PositionColumns { line: idx + 1 })
        };

        let Ok(pos) = pos.parse::<u64>() else {
            // A single leading header row is tolerated.
            if idx == 0 {
                debug!("Skipping position file header: '{line}'");
                continue
            }
            return Err(ReadError::PositionParse { line: idx + 1, field: pos.to_string() })
        };

        let chrom_id = match chrom_ids.get(chrom) {
            Some(&id) => {
                if current_chrom != Some(id) {
                    return Err(ReadError::UnsortedChromosomes { line: idx + 1, chrom: chrom.to_string() })
                }
                id
            }
            None => {
                let id = chrom_names.len() as u32;
                chrom_ids.insert(chrom.to_string(), id);
                chrom_names.push(chrom.to_string());
                id
            }
        };

        if current_chrom == Some(chrom_id) {
            let prev = sites.last().map_or(0, |site: &SitePos| site.pos);
            if pos < prev {
                return Err(ReadError::UnsortedPositions {
                    line: idx + 1,
                    chrom: chrom.to_string(),
                    pos,
                    prev,
                })
            }
        }
        current_chrom = Some(chrom_id);

        sites.push(SitePos { chrom: chrom_id, pos, label: format!("{chrom}:{pos}") });
    }

    if sites.len() != n_sites {
        return Err(ReadError::WrongPositionCount { found: sites.len(), expected: n_sites })
    }
    Ok(PositionArray { sites, chrom_names })
}
