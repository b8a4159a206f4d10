mod error;
pub use error::WriterError;

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// THE field separator used throughout the output stream.
pub const WRITER_SEPARATOR: &str = "\t";

/// Missing-value sentinel for undefined statistics.
pub const MISSING: &str = "NA";

/// A generic, buffered record writer.
/// - source: Boxed `BufWriter` (can either handle file-writing, or stdout).
pub struct GenericWriter<'a> {
    source: BufWriter<Box<dyn Write + 'a>>,
}

impl<'a> GenericWriter<'a> {
    /// Instantiate a new `GenericWriter`, linked to a file when a path is
    /// provided, or to stdout otherwise.
    ///
    /// # Errors
    /// If `path` is an invalid file, or the user does not have the proper
    /// permissions to write at this location.
    pub fn new(path: Option<impl AsRef<Path>>) -> Result<GenericWriter<'a>, WriterError> {
        let source: Box<dyn Write> = match path {
            Some(path) => Box::new(File::create(path)?),
            None       => Box::new(std::io::stdout()),
        };
        Ok(GenericWriter { source: BufWriter::new(source) })
    }

    /// Write the contents of a generic iterator within a file/stdout.
    /// One iteration step = one line.
    ///
    /// # Errors
    /// If any of the items within `iter` fails to get written out.
    pub fn write_iter<T, I>(&mut self, iter: T) -> Result<(), WriterError>
    where
        T: IntoIterator<Item = I>,
        I: std::fmt::Display,
    {
        for record in iter {
            writeln!(self.source, "{record}")?;
        }
        Ok(self.source.flush()?)
    }
}
