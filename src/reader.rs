// Readers for the four plain-text artifacts an LDA estimator leaves behind:
//
//   wordmap.txt      N, then N lines of `<word> <index>` in any order
//   docmap.txt       N, then N document identifiers in index order
//   <model>.phi      one line per topic, one probability per vocabulary word
//   <model>.theta    one line per document, one probability per topic
//
// Every reader fails the whole file on the first malformed line; nothing is skipped.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use flate2::read::GzDecoder;
use ndarray::Array2;
use ndarray_stats::{errors::MinMaxError, QuantileExt};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{LdaError, LdaResult};
use crate::KEY_SEPARATOR;


fn read_lines(path: &Path) -> LdaResult<Vec<String>> {

    let f = File::open(path).map_err(|e| LdaError::io(path, e))?;
    let reader: Box<dyn BufRead> = match path.extension() {
        Some(ext) if ext == "gz" => Box::new(BufReader::new(GzDecoder::new(f))),
        _ => Box::new(BufReader::new(f)),
    };

    let mut lines = reader
        .lines()
        .collect::<Result<Vec<String>, io::Error>>()
        .map_err(|e| LdaError::io(path, e))?;

    // trailing blank lines are tolerated, blank lines elsewhere are not
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    Ok(lines)
}

fn parse_count(line: &str) -> Option<usize> {
    line.trim().parse::<usize>().ok()
}

fn check_separator(entry: &str, path: &Path, line: usize) -> LdaResult<()> {
    if entry.contains(KEY_SEPARATOR) {
        return Err(LdaError::KeySeparatorCollision {
            entry: entry.to_string(),
            context: format!("{}:{}", path.display(), line),
        });
    }
    Ok(())
}


/// Reads `wordmap.txt` into a vocabulary where position `i` holds the word with id `i`.
pub fn read_vocabulary(path: &Path) -> LdaResult<Vec<String>> {

    let malformed = |line: usize, reason: String| LdaError::MalformedVocabularyFile {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let lines = read_lines(path)?;
    let (header, data) = lines
        .split_first()
        .ok_or_else(|| malformed(1, "missing word count".to_string()))?;
    let n = parse_count(header)
        .ok_or_else(|| malformed(1, format!("word count '{}' is not a non-negative integer", header.trim())))?;

    // checked before sizing anything by the header
    if n > data.len() {
        return Err(malformed(lines.len() + 1, format!("expected {} words, found {} lines", n, data.len())));
    }

    let mut slots: Vec<Option<String>> = vec![None; n];
    let mut seen: HashSet<&str> = HashSet::with_capacity(n);

    for (k, line) in data.iter().enumerate() {

        // line 1 is the header
        let line_no = k + 2;
        let mut tokens = line.split_whitespace();
        let (word, index) = match (tokens.next(), tokens.next()) {
            (Some(word), Some(index)) => (word, index),
            _ => return Err(malformed(line_no, format!("expected '<word> <index>', found '{}'", line))),
        };

        let index = match index.parse::<usize>() {
            Ok(index) if index < n => index,
            Ok(index) => return Err(malformed(line_no, format!("index {} is outside [0, {})", index, n))),
            Err(_) => return Err(malformed(line_no, format!("index '{}' is not a non-negative integer", index))),
        };

        check_separator(word, path, line_no)?;
        if !seen.insert(word) {
            return Err(malformed(line_no, format!("word '{}' appears more than once", word)));
        }

        let slot = &mut slots[index];
        if let Some(previous) = slot {
            return Err(malformed(line_no, format!("index {} already holds '{}'", index, previous)));
        }
        *slot = Some(word.to_string());
    }

    debug!(path = %path.display(), words = n, "read vocabulary");
    Ok(slots.into_iter().flatten().collect())
}


/// Reads `docmap.txt`; the identifier on data line `k` gets document id `k`.
pub fn read_document_list(path: &Path) -> LdaResult<Vec<String>> {

    let malformed = |line: usize, reason: String| LdaError::MalformedDocumentFile {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let lines = read_lines(path)?;
    let (header, data) = lines
        .split_first()
        .ok_or_else(|| malformed(1, "missing document count".to_string()))?;
    let n = parse_count(header)
        .ok_or_else(|| malformed(1, format!("document count '{}' is not a non-negative integer", header.trim())))?;

    if n > data.len() {
        return Err(malformed(lines.len() + 1, format!("expected {} documents, found {} lines", n, data.len())));
    }

    let mut documents: Vec<String> = Vec::with_capacity(n);
    let mut seen: HashSet<&str> = HashSet::with_capacity(n);

    for (k, line) in data.iter().enumerate() {

        let line_no = k + 2;
        if documents.len() == n {
            return Err(malformed(line_no, format!("more than {} document identifiers", n)));
        }

        let id = line.trim();
        if id.is_empty() {
            return Err(malformed(line_no, "empty document identifier".to_string()));
        }
        check_separator(id, path, line_no)?;
        if !seen.insert(id) {
            return Err(malformed(line_no, format!("document '{}' appears more than once", id)));
        }
        documents.push(id.to_string());
    }

    debug!(path = %path.display(), documents = n, "read document list");
    Ok(documents)
}


fn parse_row(line: &str, width: Option<usize>) -> Result<Vec<f64>, String> {

    // trailing blank lines are already gone, any left is inside the file
    if line.trim().is_empty() {
        return Err("blank line inside the matrix".to_string());
    }

    let row = line
        .split_whitespace()
        .map(|tok| tok.parse::<f64>().map_err(|_| format!("'{}' is not a floating-point number", tok)))
        .collect::<Result<Vec<f64>, String>>()?;

    match width {
        Some(width) if row.len() != width => Err(format!("expected {} values, found {}", width, row.len())),
        _ => Ok(row),
    }
}

fn read_rows(path: &Path, width: Option<usize>) -> LdaResult<Vec<Vec<f64>>> {

    let lines = read_lines(path)?;

    // rows share nothing, parse them in parallel and report the first bad line in file order
    let rows: Vec<Result<Vec<f64>, String>> = lines
        .par_iter()
        .map(|line| parse_row(line, width))
        .collect();

    rows.into_iter()
        .enumerate()
        .map(|(k, row)| row.map_err(|reason| LdaError::MalformedMatrixFile {
            path: path.to_path_buf(),
            line: k + 1,
            reason,
        }))
        .collect()
}

fn into_matrix(path: &Path, rows: Vec<Vec<f64>>, width: usize) -> LdaResult<Array2<f64>> {

    let n_rows = rows.len();
    let values: Vec<f64> = rows.into_iter().flatten().collect();
    let found = values.len();
    let matrix = Array2::from_shape_vec((n_rows, width), values).map_err(|_| LdaError::MatrixShapeMismatch {
        context: format!("cells in {}", path.display()),
        expected: n_rows * width,
        found,
    })?;

    check_probabilities(path, &matrix);
    Ok(matrix)
}

// Nothing downstream validates the estimator's output, but `most_likely_topic`
// assumes no value sits below its -1 sentinel, so oddities are at least logged.
fn check_probabilities(path: &Path, matrix: &Array2<f64>) {
    match matrix.min() {
        Ok(min) if *min < 0.0 => warn!(path = %path.display(), min = *min, "matrix holds negative probabilities"),
        Err(MinMaxError::UndefinedOrder) => warn!(path = %path.display(), "matrix holds NaN values"),
        _ => {}
    }
}


/// Reads `<model>.phi`: a topics x vocabulary matrix. The topic count is the number of lines.
pub fn read_word_topic_matrix(path: &Path, vocabulary_size: usize) -> LdaResult<Array2<f64>> {

    let rows = read_rows(path, Some(vocabulary_size))?;
    let matrix = into_matrix(path, rows, vocabulary_size)?;

    debug!(path = %path.display(), topics = matrix.nrows(), words = matrix.ncols(), "read word-topic matrix");
    Ok(matrix)
}


/// Reads `<model>.theta`: a documents x topics matrix whose width must equal `topic_count`.
pub fn read_topic_doc_matrix(path: &Path, topic_count: usize) -> LdaResult<Array2<f64>> {

    let rows = read_rows(path, None)?;
    let width = rows.first().map_or(topic_count, Vec::len);

    for (k, row) in rows.iter().enumerate().skip(1) {
        if row.len() != width {
            return Err(LdaError::MalformedMatrixFile {
                path: path.to_path_buf(),
                line: k + 1,
                reason: format!("expected {} values like line 1, found {}", width, row.len()),
            });
        }
    }

    if width != topic_count {
        return Err(LdaError::MatrixShapeMismatch {
            context: format!("topic columns in {} vs topics in word-topic matrix", path.display()),
            expected: topic_count,
            found: width,
        });
    }

    let matrix = into_matrix(path, rows, width)?;
    debug!(path = %path.display(), documents = matrix.nrows(), topics = matrix.ncols(), "read topic-document matrix");
    Ok(matrix)
}
