//! Quartet files and inference rule tables.
//!
//! A quartet file holds the taxon count on its first line, a blank line,
//! then one quartet per line as four integers `l1 l2 r1 r2`. A rule table
//! has a free-form header line, the rule count, then one rule per line:
//! `[(a b|c d), (e f|g h)] -> [(i j|k l)]`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::inference::InferenceRule;
use crate::quartet::Quartet;
use crate::Taxon;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A line does not have the expected shape.
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: quartet {quartet} is not valid for {taxon_count} taxa")]
    InvalidQuartet {
        line: usize,
        quartet: Quartet,
        taxon_count: usize,
    },

    /// The input ended early.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: String },
}

fn syntax(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        line,
        message: message.into(),
    }
}

/// Contents of a quartet file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuartetSet {
    pub taxon_count: usize,
    pub quartets: Vec<Quartet>,
}

/// Read a quartet file. Every quartet must have four distinct taxa below
/// the declared count.
pub fn read_quartets<R: BufRead>(reader: R) -> Result<QuartetSet, ParseError> {
    let mut lines = reader.lines().enumerate();
    let taxon_count = loop {
        let Some((k, line)) = lines.next() else {
            return Err(ParseError::UnexpectedEnd {
                expected: "taxon count".into(),
            });
        };
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        break text
            .parse::<usize>()
            .map_err(|_| syntax(k + 1, format!("invalid taxon count `{text}`")))?;
    };

    let mut quartets = Vec::new();
    for (k, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let taxa = line
            .split_whitespace()
            .map(|t| t.parse::<Taxon>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| syntax(k + 1, e.to_string()))?;
        let &[l1, l2, r1, r2] = taxa.as_slice() else {
            return Err(syntax(k + 1, format!("expected 4 taxa, found {}", taxa.len())));
        };
        let quartet = Quartet::new(l1, l2, r1, r2);
        if !quartet.is_valid() || quartet.max_taxon() >= taxon_count {
            return Err(ParseError::InvalidQuartet {
                line: k + 1,
                quartet,
                taxon_count,
            });
        }
        quartets.push(quartet);
    }
    tracing::debug!(taxon_count, quartets = quartets.len(), "quartet file read");
    Ok(QuartetSet {
        taxon_count,
        quartets,
    })
}

pub fn read_quartet_file(path: impl AsRef<Path>) -> Result<QuartetSet, ParseError> {
    read_quartets(BufReader::new(File::open(path)?))
}

pub fn write_quartets<W: Write>(
    mut writer: W,
    taxon_count: usize,
    quartets: &[Quartet],
) -> io::Result<()> {
    writeln!(writer, "{taxon_count}")?;
    writeln!(writer)?;
    for q in quartets {
        let [l1, l2, r1, r2] = q.taxa();
        writeln!(writer, "{l1} {l2} {r1} {r2}")?;
    }
    writer.flush()
}

pub fn write_quartet_file(
    path: impl AsRef<Path>,
    taxon_count: usize,
    quartets: &[Quartet],
) -> io::Result<()> {
    write_quartets(io::BufWriter::new(File::create(path)?), taxon_count, quartets)
}

/// Read a rule table. The header line is skipped; exactly the declared
/// number of rules must follow, blank lines aside.
pub fn read_rules<R: BufRead>(reader: R) -> Result<Vec<InferenceRule>, ParseError> {
    let mut lines = reader
        .lines()
        .enumerate()
        .map(|(k, line)| line.map(|l| (k + 1, l)));
    let end = |expected: &str| ParseError::UnexpectedEnd {
        expected: expected.into(),
    };

    lines.next().ok_or_else(|| end("header line"))??;
    let (k, count_line) = lines.next().ok_or_else(|| end("rule count"))??;
    let count: usize = count_line
        .trim()
        .parse()
        .map_err(|_| syntax(k, format!("invalid rule count `{}`", count_line.trim())))?;

    let mut rules = Vec::with_capacity(count);
    for line in lines {
        let (k, text) = line?;
        if text.trim().is_empty() {
            continue;
        }
        if rules.len() == count {
            return Err(syntax(k, format!("more rules than the declared {count}")));
        }
        rules.push(parse_rule(&text).map_err(|message| syntax(k, message))?);
    }
    if rules.len() < count {
        return Err(end(&format!("{count} rules, found {}", rules.len())));
    }
    tracing::debug!(rules = rules.len(), "rule table read");
    Ok(rules)
}

pub fn read_rule_file(path: impl AsRef<Path>) -> Result<Vec<InferenceRule>, ParseError> {
    read_rules(BufReader::new(File::open(path)?))
}

/// `[(a b|c d), ...] -> [(e f|g h)]`
fn parse_rule(text: &str) -> Result<InferenceRule, String> {
    let (inputs, output) = text
        .split_once("->")
        .ok_or_else(|| "missing `->`".to_string())?;
    let inputs = parse_list(inputs)?;
    let outputs = parse_list(output)?;
    let output = match outputs.as_slice() {
        [q] => *q,
        other => return Err(format!("expected one output quartet, found {}", other.len())),
    };
    for q in inputs.iter().chain(std::iter::once(&output)) {
        if !q.is_valid() {
            return Err(format!("pattern {q} repeats a placeholder"));
        }
    }
    Ok(InferenceRule::new(inputs, output))
}

/// `[(a b|c d), (e f|g h)]`
fn parse_list(text: &str) -> Result<Vec<Quartet>, String> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or_else(|| format!("expected `[...]`, found `{}`", text.trim()))?;
    let mut quartets = Vec::new();
    let mut rest = inner;
    while let Some(open) = rest.find('(') {
        let close = rest[open..]
            .find(')')
            .map(|c| open + c)
            .ok_or_else(|| "unclosed `(`".to_string())?;
        let quartet = rest[open..=close]
            .parse::<Quartet>()
            .map_err(|e| e.to_string())?;
        quartets.push(quartet);
        rest = &rest[close + 1..];
    }
    Ok(quartets)
}
