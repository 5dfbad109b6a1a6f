//! Core-spec grammar.
//!
//! `all | <n> | <a>:<b> | <n>(,<n>)+` — shared by the `-c` command line
//! argument and the session's `:e` / `:c` / `:d` commands. Parsing is pure
//! classification; applying the result to a configuration happens at the
//! caller.

use crate::MAX_CORES;
use crate::core_set::CoreSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreSpec {
    /// Sticky "every core the device has" selection, resolved against the
    /// device core count at use time.
    All,
    Set(CoreSet),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("'{0}' is not a core index")]
    InvalidIndex(String),
    #[error("core {0} is outside the supported range of {max} cores", max = MAX_CORES)]
    OutOfRange(usize),
    #[error("range {0}:{1} is inverted")]
    InvertedRange(usize, usize),
    #[error("empty core specification")]
    Empty,
}

pub fn parse_core_spec(input: &str) -> Result<CoreSpec, SpecError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SpecError::Empty);
    }
    if input.eq_ignore_ascii_case("all") {
        return Ok(CoreSpec::All);
    }
    if input.contains(',') {
        let mut set = CoreSet::EMPTY;
        for token in input.split(',') {
            set.insert(parse_index(token)?);
        }
        return Ok(CoreSpec::Set(set));
    }
    if let Some((from, to)) = input.split_once(':') {
        let from = parse_index(from)?;
        let to = parse_index(to)?;
        if from > to {
            return Err(SpecError::InvertedRange(from, to));
        }
        return Ok(CoreSpec::Set(CoreSet::range(from, to)));
    }
    Ok(CoreSpec::Set(CoreSet::single(parse_index(input)?)))
}

fn parse_index(token: &str) -> Result<usize, SpecError> {
    let token = token.trim();
    let index: usize = token
        .parse()
        .map_err(|_| SpecError::InvalidIndex(token.to_string()))?;
    if index >= MAX_CORES {
        return Err(SpecError::OutOfRange(index));
    }
    Ok(index)
}
