mod error;
mod glf;
mod positions;

pub use error::ReadError;
pub use glf::{read_glf, RawGlf, N_GENO};
pub use positions::{read_positions, PositionArray, SitePos};
