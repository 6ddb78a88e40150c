//! Combination of multiple ranked lists
//!
//! Combines multiple ranked lists into a single one using the Dowdall rule
//! (a Borda count variant): each listing contributes the reciprocal of its
//! rank, and the contributions per value are summed.

use std::io::{BufRead, Write};
use thiserror::Error;

/// Errors that can occur during rank combination
#[derive(Debug, Error)]
pub enum RankError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read line <{line}>: {reason}")]
    Malformed { line: String, reason: String },
}

/// Result type for rank combination
pub type RankResult<T> = Result<T, RankError>;

/// Fast combination of multiple ranked lists where ranks are given and the
/// concatenated lists are sorted by value.
///
/// The highest rank must be 1 and the rank field is expected to be the
/// first field of a line. A malformed line aborts with an error carrying
/// the offending line.
pub fn combine_sorted_with_rank<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    separator: char,
) -> RankResult<()> {
    let mut last_value: Option<String> = None;
    let mut combined_rank = 0f64;

    for line in input.lines() {
        let line = line?;
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        let (rank, value) = parse_line(line, separator)?;

        if Some(value) == last_value.as_deref() {
            combined_rank += 1.0 / f64::from(rank);
        } else {
            if let Some(last) = last_value.take() {
                writeln!(output, "{}{}{}", format_rank(combined_rank), separator, last)?;
            }
            combined_rank = 1.0 / f64::from(rank);
            last_value = Some(value.to_string());
        }
    }

    if let Some(last) = last_value {
        writeln!(output, "{}{}{}", format_rank(combined_rank), separator, last)?;
    }

    Ok(())
}

fn parse_line(line: &str, separator: char) -> RankResult<(u32, &str)> {
    let (rank, value) = line.split_once(separator).ok_or_else(|| RankError::Malformed {
        line: line.to_string(),
        reason: format!("missing separator `{separator}`"),
    })?;

    let rank: u32 = rank.parse().map_err(|e| RankError::Malformed {
        line: line.to_string(),
        reason: format!("{e}"),
    })?;
    if rank == 0 {
        return Err(RankError::Malformed {
            line: line.to_string(),
            reason: "rank must be >= 1".to_string(),
        });
    }

    Ok((rank, value))
}

/// Formats a combined rank the way the published lists carry them:
/// integral values keep a trailing `.0`.
fn format_rank(rank: f64) -> String {
    if rank.fract() == 0.0 {
        format!("{rank:.1}")
    } else {
        format!("{rank}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combine(input: &str) -> String {
        let mut output = Vec::new();
        combine_sorted_with_rank(input.as_bytes(), &mut output, ',').unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn combines_two_listings_of_the_same_value() {
        assert_eq!(combine("1,example.com\n2,example.com\n"), "1.5,example.com\n");
    }

    #[test]
    fn single_listing_keeps_reciprocal_rank() {
        assert_eq!(combine("1,example.com\n"), "1.0,example.com\n");
        assert_eq!(combine("4,example.com\n"), "0.25,example.com\n");
    }

    #[test]
    fn combines_runs_per_value() {
        let output = combine("1,a.example\n1,b.example\n2,b.example\n3,c.example\n");
        assert_eq!(
            output,
            "1.0,a.example\n1.5,b.example\n0.3333333333333333,c.example\n"
        );
    }

    #[test]
    fn handles_crlf_input() {
        assert_eq!(combine("1,example.com\r\n2,example.com\r\n"), "1.5,example.com\n");
    }

    #[test]
    fn value_may_contain_the_separator() {
        // Only the first separator splits rank from value.
        assert_eq!(combine("1,example.com,extra\n"), "1.0,example.com,extra\n");
    }

    #[test]
    fn empty_input_produces_empty_output() {
        assert_eq!(combine(""), "");
    }

    #[test]
    fn missing_separator_is_reported_with_the_line() {
        let mut output = Vec::new();
        let err = combine_sorted_with_rank("nonsense\n".as_bytes(), &mut output, ',').unwrap_err();
        match err {
            RankError::Malformed { line, .. } => assert_eq!(line, "nonsense"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_rank_is_reported() {
        let mut output = Vec::new();
        let err =
            combine_sorted_with_rank("high,example.com\n".as_bytes(), &mut output, ',').unwrap_err();
        assert!(matches!(err, RankError::Malformed { .. }));
    }

    #[test]
    fn zero_rank_is_rejected() {
        let mut output = Vec::new();
        let err =
            combine_sorted_with_rank("0,example.com\n".as_bytes(), &mut output, ',').unwrap_err();
        assert!(matches!(err, RankError::Malformed { .. }));
    }

    #[test]
    fn alternative_separator() {
        let mut output = Vec::new();
        combine_sorted_with_rank("1\texample.com\n2\texample.com\n".as_bytes(), &mut output, '\t')
            .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "1.5\texample.com\n");
    }
}
