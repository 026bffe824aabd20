//! Tags file output

use crate::charset::Charset;
use crate::error::{ArtagsError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Whether an existing output file is replaced or extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Truncate,
    Append,
}

/// Line-oriented writer encoding every line in the output charset.
pub struct TagWriter {
    path: PathBuf,
    charset: Charset,
    out: BufWriter<File>,
    lines: usize,
}

impl TagWriter {
    /// Open (and create) the output file.
    pub fn open(path: &Path, charset: Charset, mode: WriteMode) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Truncate => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };

        let file = options.open(path).map_err(|e| ArtagsError::Output {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            charset,
            out: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Write one line plus a newline.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let mut bytes = self.charset.encode(line)?;
        bytes.extend(self.charset.encode("\n")?);
        self.out.write_all(&bytes).map_err(|e| self.output_error(e))?;
        self.lines += 1;
        Ok(())
    }

    pub fn write_records<I, S>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.write_line(line.as_ref())?;
        }
        Ok(())
    }

    /// Flush buffered output. Dropping without `finish` may lose write errors.
    pub fn finish(mut self) -> Result<usize> {
        self.out.flush().map_err(|e| self.output_error(e))?;
        Ok(self.lines)
    }

    fn output_error(&self, source: std::io::Error) -> ArtagsError {
        ArtagsError::Output {
            path: self.path.clone(),
            source,
        }
    }
}
