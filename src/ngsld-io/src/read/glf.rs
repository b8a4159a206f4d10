use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use flate2::read::MultiGzDecoder;
use log::debug;

use super::ReadError;

/// Number of genotype states per (individual, site) likelihood row.
pub const N_GENO: usize = 3;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Raw genotype likelihood matrix, exactly as read from disk.
///
/// Values are packed site-major: `values[(site * n_ind + ind) * N_GENO + g]`.
/// No scale conversion or validation has happened yet; that is the job of
/// the store built on top of this.
#[derive(Debug)]
pub struct RawGlf {
    pub n_ind: usize,
    pub n_sites: usize,
    pub values: Vec<f64>,
}

/// Read a genotype likelihood matrix holding `n_sites` rows of
/// `n_ind * N_GENO` values.
///
/// Three encodings are accepted:
/// - raw little-endian doubles, detected when the file size is exactly
///   `n_sites * n_ind * N_GENO * 8` bytes;
/// - plain text, one site per row, whitespace-delimited;
/// - gzipped text, detected by magic bytes.
///
/// Text rows may carry the three leading beagle columns
/// (marker, allele1, allele2), which are skipped.
///
/// # Errors
/// Any malformed row is fatal and reported with its (site, individual)
/// coordinates.
pub fn read_glf(path: &Path, n_ind: usize, n_sites: usize) -> Result<RawGlf, ReadError> {
    let n_values = n_sites * n_ind * N_GENO;

    let mut magic = [0u8; 2];
    let mut file = File::open(path)?;
    let gzipped = match file.read(&mut magic)? {
        2 => magic == GZIP_MAGIC,
        _ => false,
    };

    let metadata = file.metadata()?;
    file = File::open(path)?; // rewind.

    if !gzipped && metadata.len() == (n_values * std::mem::size_of::<f64>()) as u64 {
        debug!("--geno file size matches a raw double matrix. Reading as binary...");
        return read_binary(file, n_ind, n_sites)
    }

    let source: Box<dyn BufRead> = match gzipped {
        true  => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        false => Box::new(BufReader::new(file)),
    };
    read_text(source, n_ind, n_sites)
}

fn read_binary(mut file: File, n_ind: usize, n_sites: usize) -> Result<RawGlf, ReadError> {
    let n_values = n_sites * n_ind * N_GENO;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let found = bytes.len() / std::mem::size_of::<f64>();
    if found != n_values || bytes.len() % std::mem::size_of::<f64>() != 0 {
        return Err(ReadError::WrongValueCount { found, expected: n_values })
    }

    let values = bytes
        .chunks_exact(std::mem::size_of::<f64>())
        .map(|chunk| f64::from_le_bytes(chunk.try_into().expect("8-byte chunk")))
        .collect();
    Ok(RawGlf { n_ind, n_sites, values })
}

fn read_text(source: Box<dyn BufRead>, n_ind: usize, n_sites: usize) -> Result<RawGlf, ReadError> {
    let expected_plain = n_ind * N_GENO;
    let mut values = Vec::with_capacity(n_sites * expected_plain);

    let mut n_rows = 0;
    for (site, line) in source.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue
        }
        if n_rows == n_sites {
            return Err(ReadError::WrongSiteCount { found: n_rows + 1, expected: n_sites })
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let skip = match fields.len() {
            n if n == expected_plain     => 0,
            n if n == expected_plain + 3 => 3, // beagle marker columns.
            n => return Err(ReadError::WrongArity { site, expected: expected_plain, found: n }),
        };

        for (idx, field) in fields[skip..].iter().enumerate() {
            let value: f64 = field.parse().map_err(|_| ReadError::ParseFloat {
                site,
                ind: idx / N_GENO,
                field: (*field).to_string(),
            })?;
            values.push(value);
        }
        n_rows += 1;
    }

    if n_rows != n_sites {
        return Err(ReadError::WrongSiteCount { found: n_rows, expected: n_sites })
    }
    Ok(RawGlf { n_ind, n_sites, values })
}
