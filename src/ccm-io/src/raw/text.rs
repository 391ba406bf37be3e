//! The textual ("oldraw") parameter format.
//!
//! Layout: `L` rows of 21 tab-separated single potentials, followed by one
//! `# i j` header plus a 21 x 21 value block for every column pair `i < j`,
//! and an optional trailing `#>META> <json>` line.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use alignment::alphabet::NUM_STATES;
use alignment::counts::pair_idx;

use super::{Meta, RawError, RawPotts};

const META_PREFIX: &str = "#>META>";

pub fn read(path: &Path) -> Result<RawPotts, RawError> {
    let io_err = |source| RawError::Io { path: path.to_path_buf(), source };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);

    let mut singles: Vec<f64> = Vec::new();
    let mut pairs: Option<Vec<f64>> = None;
    let mut ncol = 0;
    let mut meta = Meta::new();

    let mut block: Option<(usize, usize)> = None;
    let mut block_row = 0;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(json) = line.strip_prefix(META_PREFIX) {
            meta = serde_json::from_str(json.trim())
                .map_err(|source| RawError::InvalidMeta { path: path.to_path_buf(), source })?;
            continue;
        }

        if let Some(header) = line.strip_prefix('#') {
            // First pair header closes the single block.
            if pairs.is_none() {
                if singles.is_empty() {
                    return Err(RawError::Empty { path: path.to_path_buf() });
                }
                ncol = singles.len() / NUM_STATES;
                pairs = Some(vec![0.0; ncol * ncol * NUM_STATES * NUM_STATES]);
            }
            let indices: Vec<usize> = header
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(|_| RawError::MalformedHeader { path: path.to_path_buf(), line: lineno + 1 })?;
            let &[i, j] = indices.as_slice() else {
                return Err(RawError::MalformedHeader { path: path.to_path_buf(), line: lineno + 1 });
            };
            if i >= ncol || j >= ncol {
                return Err(RawError::BlockOutOfRange { path: path.to_path_buf(), i, j, ncol });
            }
            if let Some((i, j)) = block {
                if block_row != NUM_STATES {
                    return Err(RawError::TruncatedBlock { path: path.to_path_buf(), i, j });
                }
            }
            block = Some((i, j));
            block_row = 0;
            continue;
        }

        let values = parse_fields(path, lineno + 1, line)?;
        match (&mut pairs, block) {
            (None, _) => singles.extend_from_slice(&values),
            (Some(pairs), Some((i, j))) => {
                let a = block_row;
                for (b, &value) in values.iter().enumerate() {
                    pairs[pair_idx(ncol, i, j, a, b)] = value;
                    pairs[pair_idx(ncol, j, i, b, a)] = value;
                }
                block_row += 1;
            }
            (Some(_), None) => {
                return Err(RawError::MalformedHeader { path: path.to_path_buf(), line: lineno + 1 })
            }
        }
    }

    if singles.is_empty() {
        return Err(RawError::Empty { path: path.to_path_buf() });
    }
    if let (Some((i, j)), true) = (block, block_row != NUM_STATES) {
        return Err(RawError::TruncatedBlock { path: path.to_path_buf(), i, j });
    }

    let ncol = if ncol == 0 { singles.len() / NUM_STATES } else { ncol };
    let pairs = pairs.unwrap_or_else(|| vec![0.0; ncol * ncol * NUM_STATES * NUM_STATES]);
    Ok(RawPotts::new(ncol, singles, pairs, meta))
}

fn parse_fields(path: &Path, line: usize, text: &str) -> Result<Vec<f64>, RawError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != NUM_STATES {
        return Err(RawError::FieldCount {
            path: path.to_path_buf(),
            line,
            expected: NUM_STATES,
            found: fields.len(),
        });
    }
    fields
        .into_iter()
        .map(|field| {
            field.parse::<f64>().map_err(|_| RawError::InvalidFloat {
                path: path.to_path_buf(),
                line,
                value: field.to_string(),
            })
        })
        .collect()
}

pub fn write(path: &Path, raw: &RawPotts) -> Result<(), RawError> {
    let io_err = |source| RawError::Io { path: path.to_path_buf(), source };
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    let ncol = raw.ncol();

    for i in 0..ncol {
        let row: Vec<String> = raw.v[i * NUM_STATES..(i + 1) * NUM_STATES]
            .iter()
            .map(|value| format!("{value:.16e}"))
            .collect();
        writeln!(writer, "{}", row.join("\t")).map_err(io_err)?;
    }

    for i in 0..ncol {
        for j in (i + 1)..ncol {
            writeln!(writer, "# {i} {j}").map_err(io_err)?;
            for a in 0..NUM_STATES {
                let row: Vec<String> = (0..NUM_STATES)
                    .map(|b| format!("{:.16e}", raw.w_at(i, j, a, b)))
                    .collect();
                writeln!(writer, "{}", row.join("\t")).map_err(io_err)?;
            }
        }
    }

    if !raw.meta.is_empty() {
        let json = serde_json::to_string(&raw.meta)
            .map_err(|source| RawError::InvalidMeta { path: path.to_path_buf(), source })?;
        writeln!(writer, "{META_PREFIX} {json}").map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}
