use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::warn;

/// Records one line of per-iteration statistics into a TSV trajectory file.
pub struct Monitor {
    path: PathBuf,
    writer: BufWriter<File>,
    failed: bool,
}

impl Monitor {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "iter\tfx\tgnorm\txnorm\tstep")?;
        Ok(Self { path: path.to_path_buf(), writer, failed: false })
    }

    /// Append one iteration record. Write failures are logged once and then
    /// silently ignored; a broken trajectory file must not abort a long
    /// optimization.
    pub fn record(&mut self, iter: usize, fx: f64, gnorm: f64, xnorm: f64, step: f64) {
        if self.failed {
            return;
        }
        let outcome = writeln!(
            self.writer,
            "{iter}\t{fx:.10e}\t{gnorm:.10e}\t{xnorm:.10e}\t{step:.10e}"
        )
        .and_then(|()| self.writer.flush());

        if let Err(err) = outcome {
            warn!("Stopped writing trajectory to {:?}: {err}", self.path);
            self.failed = true;
        }
    }
}
