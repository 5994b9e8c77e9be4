/**
 * File: /src/config.rs
 * Created Date: Friday, January 26th 2024
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 5:20:14 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-18		Zihan	Keep '#' inside values
 * 2025-10-17		Zihan	KEY=VALUE run configuration
 * 2025-10-16		Zihan	Arguments are now data file, NA symbol and header counts
 */

use crate::search::{SearchOptions, WorkerOptions};
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

pub const USAGE: &str = "usage: nomiss <data_file> <na_symbol> [<num_header_rows> <num_header_cols>]";

#[derive(Debug)]
pub enum ConfigError {
    /// Wrong number of command line arguments
    Arity(usize),
    InvalidNumber { name: String, value: String },
    Io { path: String, source: io::Error },
    UnknownKey { line: usize, key: String },
    InvalidValue { line: usize, key: String, value: String },
    Syntax { line: usize, text: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Arity(n) => write!(f, "expected 2 or 4 arguments, got {}", n),
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{} must be a non-negative integer, got {:?}", name, value)
            }
            ConfigError::Io { path, source } => write!(f, "{}: {}", path, source),
            ConfigError::UnknownKey { line, key } => {
                write!(f, "line {}: unknown key {}", line, key)
            }
            ConfigError::InvalidValue { line, key, value } => {
                write!(f, "line {}: invalid value {:?} for {}", line, value, key)
            }
            ConfigError::Syntax { line, text } => {
                write!(f, "line {}: expected KEY=VALUE, got {:?}", line, text)
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Command line arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    data_file: String,
    na_symbol: String,
    num_header_rows: usize,
    num_header_cols: usize,
}

impl Config {
    /// constructor
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- data/matrix.tsv NA 1 1
    /// ```
    pub fn new(mut args: impl Iterator<Item = String>) -> Result<Config, ConfigError> {
        // args:
        // 0: program name
        // 1: data file
        // 2: NA symbol
        // 3, 4: header rows / cols (optional, default 1 / 1)
        args.next();
        let rest: Vec<String> = args.collect();
        let (data_file, na_symbol, num_header_rows, num_header_cols) = match rest.as_slice() {
            [file, na] => (file.clone(), na.clone(), 1, 1),
            [file, na, rows, cols] => (
                file.clone(),
                na.clone(),
                parse_count("num_header_rows", rows)?,
                parse_count("num_header_cols", cols)?,
            ),
            _ => return Err(ConfigError::Arity(rest.len())),
        };

        Ok(Config {
            data_file,
            na_symbol,
            num_header_rows,
            num_header_cols,
        })
    }

    pub fn get_data_file(&self) -> &str {
        &self.data_file
    }

    pub fn get_na_symbol(&self) -> &str {
        &self.na_symbol
    }

    pub fn get_num_header_rows(&self) -> usize {
        self.num_header_rows
    }

    pub fn get_num_header_cols(&self) -> usize {
        self.num_header_cols
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidNumber {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Options read from `config.cfg`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub print_summary: bool,
    pub write_stats: bool,
    /// Free cells above which workers skip refinement
    pub large_matrix: usize,
    pub num_workers: usize,
    pub scratch_dir: String,
    pub resume: bool,
    pub worker_refine: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism().map_or(2, |n| n.get());
        Self {
            print_summary: true,
            write_stats: false,
            large_matrix: 1_000_000,
            num_workers: cores.saturating_sub(1).max(1),
            scratch_dir: "scratch".to_string(),
            resume: true,
            worker_refine: true,
        }
    }
}

impl RunConfig {
    /// Defaults with a warning when `path` does not exist.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found, using default settings", path.display());
            return Ok(RunConfig::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// `KEY=VALUE` lines. `#` at the start of a line or after whitespace
    /// starts a comment.
    pub fn parse(text: &str) -> Result<RunConfig, ConfigError> {
        let mut config = RunConfig::default();
        for (n, raw) in text.lines().enumerate() {
            let line = n + 1;
            let content = strip_comment(raw).trim();
            if content.is_empty() {
                continue;
            }
            let (key, value) = match content.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => {
                    return Err(ConfigError::Syntax {
                        line,
                        text: raw.to_string(),
                    })
                }
            };
            let invalid = || ConfigError::InvalidValue {
                line,
                key: key.to_string(),
                value: value.to_string(),
            };
            match key {
                "PRINT_SUMMARY" => config.print_summary = parse_bool(value).ok_or_else(invalid)?,
                "WRITE_STATS" => config.write_stats = parse_bool(value).ok_or_else(invalid)?,
                "LARGE_MATRIX" => config.large_matrix = value.parse().map_err(|_| invalid())?,
                "NUM_WORKERS" => {
                    config.num_workers = match value.parse::<usize>() {
                        Ok(n) if n > 0 => n,
                        _ => return Err(invalid()),
                    }
                }
                "SCRATCH_DIR" if !value.is_empty() => config.scratch_dir = value.to_string(),
                "SCRATCH_DIR" => return Err(invalid()),
                "RESUME" => config.resume = parse_bool(value).ok_or_else(invalid)?,
                "WORKER_REFINE" => config.worker_refine = parse_bool(value).ok_or_else(invalid)?,
                _ => {
                    return Err(ConfigError::UnknownKey {
                        line,
                        key: key.to_string(),
                    })
                }
            }
        }
        Ok(config)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            num_workers: self.num_workers,
            resume: self.resume,
            worker: WorkerOptions {
                refine: self.worker_refine,
                large_matrix: self.large_matrix,
            },
        }
    }
}

/// Drop a `#` comment that starts the line or follows whitespace.
fn strip_comment(line: &str) -> &str {
    let mut prev_is_space = true;
    for (i, c) in line.char_indices() {
        if c == '#' && prev_is_space {
            return &line[..i];
        }
        prev_is_space = c.is_whitespace();
    }
    line
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_cli_arity() {
        let c = Config::new(args(&["nomiss", "data.tsv", "NA"])).unwrap();
        assert_eq!(c.get_data_file(), "data.tsv");
        assert_eq!(c.get_na_symbol(), "NA");
        assert_eq!((c.get_num_header_rows(), c.get_num_header_cols()), (1, 1));

        let c = Config::new(args(&["nomiss", "data.tsv", "-", "0", "2"])).unwrap();
        assert_eq!((c.get_num_header_rows(), c.get_num_header_cols()), (0, 2));

        assert!(matches!(
            Config::new(args(&["nomiss", "data.tsv"])),
            Err(ConfigError::Arity(1))
        ));
        assert!(matches!(
            Config::new(args(&["nomiss", "data.tsv", "NA", "1"])),
            Err(ConfigError::Arity(3))
        ));
        assert!(matches!(
            Config::new(args(&["nomiss", "data.tsv", "NA", "x", "1"])),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_run_config_parse() {
        let text = "\
# settings
PRINT_SUMMARY=false
WRITE_STATS = 1
NUM_WORKERS=3   # three workers
LARGE_MATRIX=500

SCRATCH_DIR=/tmp/nomiss
RESUME=no
WORKER_REFINE=true
";
        let c = RunConfig::parse(text).unwrap();
        assert!(!c.print_summary);
        assert!(c.write_stats);
        assert_eq!(c.num_workers, 3);
        assert_eq!(c.large_matrix, 500);
        assert_eq!(c.scratch_dir, "/tmp/nomiss");
        assert!(!c.resume);

        let options = c.search_options();
        assert_eq!(options.num_workers, 3);
        assert_eq!(options.worker.large_matrix, 500);
    }

    #[test]
    fn test_hash_inside_value_is_kept() {
        let c = RunConfig::parse("SCRATCH_DIR=/data/run#2 # second run").unwrap();
        assert_eq!(c.scratch_dir, "/data/run#2");
        let c = RunConfig::parse("SCRATCH_DIR=tmp#a#b").unwrap();
        assert_eq!(c.scratch_dir, "tmp#a#b");
        assert_eq!(strip_comment("RESUME=1\t# tab comment"), "RESUME=1\t");
    }

    #[test]
    fn test_run_config_errors() {
        assert!(matches!(
            RunConfig::parse("COLOR=red"),
            Err(ConfigError::UnknownKey { line: 1, .. })
        ));
        assert!(matches!(
            RunConfig::parse("\nNUM_WORKERS=0"),
            Err(ConfigError::InvalidValue { line: 2, .. })
        ));
        assert!(matches!(
            RunConfig::parse("PRINT_SUMMARY"),
            Err(ConfigError::Syntax { .. })
        ));
        assert_eq!(RunConfig::parse("").unwrap(), RunConfig::default());
        assert!(matches!(
            RunConfig::parse("#NUM_WORKERS=0\n  # note"),
            Ok(c) if c == RunConfig::default()
        ));
        assert_eq!(
            RunConfig::from_file("/nonexistent/config.cfg").unwrap(),
            RunConfig::default()
        );
    }
}
