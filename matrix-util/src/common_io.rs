use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Field separators accepted by the table readers
pub enum Delimiter {
    Str(String),
    Chars(Vec<char>),
}

impl From<&str> for Delimiter {
    fn from(s: &str) -> Self {
        Delimiter::Str(s.to_string())
    }
}

impl From<Vec<char>> for Delimiter {
    fn from(chars: Vec<char>) -> Self {
        Delimiter::Chars(chars)
    }
}

impl<const N: usize> From<&[char; N]> for Delimiter {
    fn from(chars: &[char; N]) -> Self {
        Delimiter::Chars(chars.to_vec())
    }
}

impl Delimiter {
    fn split_line(&self, line: &str) -> Vec<Box<str>> {
        match self {
            Delimiter::Str(s) => line.split(s.as_str()).map(Box::from).collect(),
            Delimiter::Chars(chars) => line.split(chars.as_slice()).map(Box::from).collect(),
        }
    }
}

/// A delimited text table: the header words and the body rows
pub struct DelimitedTable {
    pub header: Vec<Box<str>>,
    pub rows: Vec<Vec<Box<str>>>,
}

impl DelimitedTable {
    /// Locate a header column by name
    pub fn column_index(&self, name: &str) -> anyhow::Result<usize> {
        self.header
            .iter()
            .position(|h| h.as_ref() == name)
            .ok_or_else(|| anyhow::anyhow!("column '{}' not found in the header", name))
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('%')
}

///
/// Read a delimited table with a header line. Comment lines
/// (`#`, `%`) and empty lines are skipped.
///
/// * `input_file` - file name--either gzipped or not
/// * `delim` - field delimiter
///
pub fn read_delimited_table(
    input_file: &str,
    delim: impl Into<Delimiter>,
) -> anyhow::Result<DelimitedTable> {
    let delim = delim.into();
    let buf = open_buf_reader(input_file)?;

    let mut raw_lines = vec![];
    for line in buf.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || is_comment_line(line) {
            continue;
        }
        raw_lines.push(line.to_string().into_boxed_str());
    }

    if raw_lines.is_empty() {
        return Err(anyhow::anyhow!("no header line in {}", input_file));
    }

    let header = delim.split_line(&raw_lines[0]);

    let rows: Vec<(usize, Vec<Box<str>>)> = raw_lines[1..]
        .par_iter()
        .enumerate()
        .map(|(i, s)| (i, delim.split_line(s)))
        .collect();

    let ncols = header.len();
    let rows = rows
        .into_iter()
        .map(|(i, words)| {
            if words.len() != ncols {
                Err(anyhow::anyhow!(
                    "line {} of {} has {} fields, header has {}",
                    i + 2,
                    input_file,
                    words.len(),
                    ncols
                ))
            } else {
                Ok(words)
            }
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(DelimitedTable { header, rows })
}

///
/// Write displayable items line by line
///
/// * `lines` - anything that prints as one line
/// * `output_file` - file name--either gzipped or not
///
pub fn write_lines<T>(lines: &[T], output_file: &str) -> anyhow::Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file)?;
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            }
            return Err(anyhow::anyhow!("failed to write {}: {}", output_file, e));
        }
    }
    buf.flush()?;
    Ok(())
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
///
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let file = File::open(input_file)
        .map_err(|e| anyhow::anyhow!("failed to open {}: {}", input_file, e))?;

    match extension(input_file)?.as_ref() {
        "gz" => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not; `stdout` is allowed
///
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write>> {
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    let file = File::create(output_file)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", output_file, e))?;

    match extension(output_file)?.as_ref() {
        "gz" => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

///
/// Create the parent directory of a file if needed
/// * `file` - file name
///
pub fn mkdir(file: &str) -> anyhow::Result<()> {
    match Path::new(file).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

///
/// Take the extension of a file (empty if there is none)
/// * `file` - file name
///
pub fn extension(file: &str) -> anyhow::Result<Box<str>> {
    let path = Path::new(file);
    match path.extension() {
        Some(ext) => ext
            .to_str()
            .map(Box::from)
            .ok_or_else(|| anyhow::anyhow!("non-utf8 extension: {}", file)),
        None => Ok(Box::from("")),
    }
}
