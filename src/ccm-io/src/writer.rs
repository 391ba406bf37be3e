use std::{fs::File, io::{Write, BufWriter}, path::Path};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// A generic line writer targeting either a file or stdout.
pub struct GenericWriter<'a> {
    sink: BufWriter<Box<dyn Write + 'a>>,
}

impl<'a> GenericWriter<'a> {
    /// Instantiate a new writer. `None` targets stdout.
    ///
    /// # Errors
    /// If `path` is not writable.
    pub fn new(path: Option<impl AsRef<Path>>) -> Result<GenericWriter<'a>, WriterError> {
        Ok(GenericWriter {
            sink: match path {
                Some(path) => BufWriter::new(Box::new(File::create(path)?)),
                None       => BufWriter::new(Box::new(std::io::stdout())),
            },
        })
    }

    /// Write the items of an iterator, one line each, then flush.
    pub fn write_iter<T, I>(&mut self, iter: T) -> Result<(), WriterError>
    where
        T: IntoIterator<Item = I>,
        I: std::fmt::Display,
    {
        for item in iter {
            writeln!(self.sink, "{item}")?;
        }
        Ok(self.sink.flush()?)
    }
}
