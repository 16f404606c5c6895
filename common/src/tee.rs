use std::{
    fs::File,
    io::{self, BufWriter, Stdout, Write},
    path::Path,
};

use eyre::{Context, Result};

/// Forwards every write to stdout and to a file sink. The file handle lives
/// only as long as the `Tee`, so it is flushed and closed on every exit path.
pub struct Tee {
    term: Stdout,
    file: BufWriter<File>,
}

impl Tee {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).context(format!("create {}", path.display()))?;
        Ok(Self {
            term: io::stdout(),
            file: BufWriter::new(file),
        })
    }

    /// Flushes both sinks and closes the file.
    pub fn finish(mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.term.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.term.flush()?;
        self.file.flush()
    }
}

impl Drop for Tee {
    fn drop(&mut self) {
        _ = self.file.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_reach_the_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        let mut tee = Tee::create(&path).unwrap();
        writeln!(tee, "hello").unwrap();
        writeln!(tee, "world").unwrap();
        tee.finish().unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello\nworld\n");
    }

    #[test]
    fn file_is_flushed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        {
            let mut tee = Tee::create(&path).unwrap();
            write!(tee, "partial").unwrap();
        }
        assert_eq!(std::fs::read_to_string(path).unwrap(), "partial");
    }
}
