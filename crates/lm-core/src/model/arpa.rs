//! Count format: ARPA layout with raw counts instead of log probabilities.
//!
//! ```text
//! \data\
//! ngram 1=<distinct unigrams>
//! ngram 2=<distinct bigrams>
//!
//! \1-grams:
//! <count> [<time>] <word>
//!
//! \2-grams:
//! <count> [<time>] <word1> <word2>
//!
//! \end\
//! ```

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, debug_span, warn};

use super::{DynamicLanguageModel, NGramEntry};
use crate::error::LmError;
use crate::vocab::{Vocabulary, WordId, CONTROL_WORDS};

/// Load hooks beyond the public model surface.
pub(crate) trait ArpaSink: DynamicLanguageModel {
    fn vocabulary_mut(&mut self) -> &mut Vocabulary;

    /// Distinct n-grams of length `level + 1`, as checked against the header.
    fn num_ngrams(&self, level: usize) -> usize;

    /// Bring an n-gram's count up to `count` and stamp its time.
    fn load_ngram(&mut self, wids: &[WordId], count: u32, time: Option<u32>)
        -> Result<(), LmError>;

    /// Called once after a successful load.
    fn finish_load(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Begin,
    Counts,
    NGramsHead,
    NGrams,
    Done,
}

struct Unigram {
    word: String,
    count: u32,
    time: Option<u32>,
}

/// Replace the model's contents. Any failure leaves it cleared.
pub(crate) fn load<M: ArpaSink + ?Sized>(
    model: &mut M,
    reader: &mut dyn BufRead,
) -> Result<(), LmError> {
    let _span = debug_span!("load").entered();
    model.clear();
    match read_model(model, reader) {
        Ok(()) => {
            model.finish_load();
            debug!(
                order = model.order(),
                words = model.vocabulary().len(),
                "model loaded"
            );
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "load failed, model cleared");
            model.clear();
            Err(e)
        }
    }
}

fn read_model<M: ArpaSink + ?Sized>(model: &mut M, reader: &mut dyn BufRead) -> Result<(), LmError> {
    let mut state = State::Begin;
    let mut declared: Vec<usize> = Vec::new();
    let mut order = 0;
    let mut level = 0;
    let mut unigrams: Vec<Unigram> = Vec::new();

    let mut buf = Vec::new();
    let mut line_number = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;
        let line = std::str::from_utf8(&buf).map_err(|_| LmError::Encoding { line: line_number })?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&first) = tokens.first() else {
            continue;
        };

        if state == State::NGrams {
            if !first.starts_with('\\') {
                let expected = level + 1;
                if tokens.len() < expected {
                    return Err(LmError::NumTokens {
                        line: line_number,
                        level,
                        found: tokens.len(),
                        expected,
                    });
                }
                let count = parse_number(first, line_number, "count")?;
                let (time, words) = if tokens.len() >= level + 2 {
                    (
                        Some(parse_number(tokens[1], line_number, "time")?),
                        &tokens[2..],
                    )
                } else {
                    (None, &tokens[1..])
                };
                let words = &words[..level];
                if level == 1 {
                    unigrams.push(Unigram {
                        word: words[0].to_string(),
                        count,
                        time,
                    });
                } else {
                    let wids = resolve(model.vocabulary_mut(), words)?;
                    model.load_ngram(&wids, count, time)?;
                }
                continue;
            }

            // End of section.
            if level == 1 {
                set_unigrams(model, std::mem::take(&mut unigrams))?;
            }
            let expected = declared.get(level - 1).copied().unwrap_or(0);
            let read = model.num_ngrams(level - 1);
            if read != expected {
                return Err(LmError::Count {
                    level,
                    expected,
                    read,
                });
            }
            state = State::NGramsHead;
        } else if state == State::Begin {
            if first.starts_with("\\data\\") {
                state = State::Counts;
            }
        } else if state == State::Counts {
            if first == "ngram" {
                let (n, count) = parse_count_line(&tokens, line_number)?;
                order = order.max(n);
                if declared.len() < order {
                    declared.resize(order, 0);
                }
                declared[n - 1] = count;
            } else {
                if let Some(max) = model.max_order() {
                    if order > max {
                        return Err(LmError::OrderUnsupported {
                            requested: order,
                            max,
                        });
                    }
                }
                model.set_order(order)?;
                if let Some(&n) = declared.first() {
                    unigrams.try_reserve_exact(n)?;
                }
                state = State::NGramsHead;
            }
        }

        if state == State::NGramsHead {
            if let Some(n) = section_level(first) {
                if n < 1 || n > order {
                    return Err(LmError::OrderUnexpected { level: n, order });
                }
                level = n;
                state = State::NGrams;
            } else if first.starts_with("\\end\\") {
                state = State::Done;
                break;
            }
        }
    }

    if state == State::Done {
        Ok(())
    } else {
        Err(LmError::UnexpectedEof)
    }
}

fn parse_number(token: &str, line: usize, what: &str) -> Result<u32, LmError> {
    token.parse().map_err(|_| LmError::Header {
        line,
        reason: format!("invalid {what} {token:?}"),
    })
}

/// `ngram N=C`
fn parse_count_line(tokens: &[&str], line: usize) -> Result<(usize, usize), LmError> {
    let malformed = || LmError::Header {
        line,
        reason: format!("expected \"ngram N=C\", got {:?}", tokens.join(" ")),
    };
    let field = tokens.get(1).ok_or_else(malformed)?;
    let (n, count) = field.split_once('=').ok_or_else(malformed)?;
    let n: usize = n.trim().parse().map_err(|_| malformed())?;
    let count: usize = count.trim().parse().map_err(|_| malformed())?;
    if n == 0 {
        return Err(malformed());
    }
    Ok((n, count))
}

/// Level of a `\N-grams:` section header.
fn section_level(token: &str) -> Option<usize> {
    token
        .strip_prefix('\\')?
        .split_once("-grams")
        .and_then(|(n, _)| n.parse().ok())
}

fn resolve(vocabulary: &mut Vocabulary, words: &[&str]) -> Result<Vec<WordId>, LmError> {
    words
        .iter()
        .map(|w| match vocabulary.word_to_id(w) {
            Some(id) => Ok(id),
            None => vocabulary.add_word(w),
        })
        .collect()
}

/// Bulk-insert the buffered unigrams, then count them.
fn set_unigrams<M: ArpaSink + ?Sized>(model: &mut M, unigrams: Vec<Unigram>) -> Result<(), LmError> {
    let words: Vec<&str> = unigrams.iter().map(|u| u.word.as_str()).collect();
    model.vocabulary_mut().set_words(&words)?;
    for u in &unigrams {
        let wid = resolve(model.vocabulary_mut(), &[u.word.as_str()])?;
        model.load_ngram(&wid, u.count, u.time)?;
    }
    Ok(())
}

/// Read only the header of a saved model and return its order.
pub fn read_order(path: &Path) -> Result<usize, LmError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut order = 0;
    let mut in_counts = false;
    let mut line = String::new();
    let mut line_number = 0;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(LmError::UnexpectedEof);
        }
        line_number += 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&first) = tokens.first() else {
            continue;
        };
        if !in_counts {
            in_counts = first.starts_with("\\data\\");
        } else if first == "ngram" {
            order = order.max(parse_count_line(&tokens, line_number)?.0);
        } else {
            return Ok(order);
        }
    }
}

/// Write the model in count format.
pub(crate) fn save<M: DynamicLanguageModel + ?Sized>(
    model: &M,
    writer: &mut dyn Write,
) -> Result<(), LmError> {
    let _span = debug_span!("save").entered();
    let order = model.order();
    let counts = model.counts();
    let vocabulary = model.vocabulary();

    writeln!(writer)?;
    writeln!(writer, "\\data\\")?;
    for (i, c) in counts.iter().enumerate() {
        writeln!(writer, "ngram {}={}", i + 1, c.ngrams)?;
    }
    for level in 1..=order {
        writeln!(writer)?;
        writeln!(writer, "\\{level}-grams:")?;
        for entry in model.ngrams().filter(|e| e.ngram.len() == level) {
            write_entry(writer, vocabulary, &entry)?;
        }
    }
    writeln!(writer)?;
    writeln!(writer, "\\end\\")?;
    writer.flush()?;
    debug!(order, "model saved");
    Ok(())
}

fn write_entry(
    writer: &mut dyn Write,
    vocabulary: &Vocabulary,
    entry: &NGramEntry,
) -> io::Result<()> {
    write!(writer, "{}", entry.count)?;
    if let Some(time) = entry.time {
        write!(writer, " {time}")?;
    }
    for &wid in &entry.ngram {
        let word = vocabulary.id_to_word(wid).unwrap_or(CONTROL_WORDS[0]);
        write!(writer, " {word}")?;
    }
    writeln!(writer)
}

/// Write through a temporary file and rename it into place.
pub(crate) fn save_atomic(
    path: &Path,
    write: impl FnOnce(&mut dyn Write) -> Result<(), LmError>,
) -> Result<(), LmError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("tmp");
    let mut writer = BufWriter::new(File::create(&tmp_path)?);
    let result = write(&mut writer).and_then(|()| {
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        Ok(())
    });
    match result {
        Ok(()) => {
            fs::rename(&tmp_path, path)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}
