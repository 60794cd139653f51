//! Textual match format.
//!
//! One line per match, fields separated by a delimiter (default `|`),
//! each field a one-based team number. Parsing shifts to zero-based ids
//! and emitting shifts back, so a [`Schedule`] round-trips losslessly.
//!
//! ```text
//! 1|2|3|4
//! 5|6|7|8
//! ```

use crate::error::{Result, ScheduleError};
use crate::schedule::{Match, ProtoRound, Schedule};

/// Default field delimiter.
pub const DEFAULT_SEPARATOR: &str = "|";

/// Splits text into raw per-match labels, skipping blank lines.
///
/// Labels are trimmed but otherwise untouched; this is what the
/// validator consumes.
pub fn parse_labels(text: &str, separator: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split(separator)
                .map(|field| field.trim().to_string())
                .collect()
        })
        .collect()
}

/// Parses one-based team numbers into a zero-based schedule.
pub fn parse(text: &str, separator: &str) -> Result<Schedule> {
    let mut matches = Vec::new();
    for (ix, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        matches.push(parse_match(ix + 1, line, separator)?);
    }
    Ok(Schedule::new(matches))
}

fn parse_match(line_no: usize, line: &str, separator: &str) -> Result<Match> {
    line.split(separator)
        .map(|field| {
            let field = field.trim();
            let team: usize = field.parse().map_err(|_| ScheduleError::Format {
                line: line_no,
                message: format!("team {field:?} is not a number"),
            })?;
            team.checked_sub(1).ok_or_else(|| ScheduleError::Format {
                line: line_no,
                message: "team numbers are one-based, found 0".into(),
            })
        })
        .collect()
}

/// Parses an explicit proto-round override.
pub fn parse_proto_round(text: &str, separator: &str) -> Result<ProtoRound> {
    ProtoRound::new(parse(text, separator)?.into_matches())
}

/// Emits one line per match with one-based team numbers.
pub fn emit(schedule: &Schedule, separator: &str) -> String {
    let mut out = String::new();
    for m in schedule.matches() {
        let fields: Vec<String> = m.iter().map(|t| (t + 1).to_string()).collect();
        out.push_str(&fields.join(separator));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shifts_to_zero_based() {
        let schedule = parse("1|2|3\n4|5|6\n", DEFAULT_SEPARATOR).unwrap();
        assert_eq!(schedule.matches(), &[vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn test_round_trip() {
        let text = "3|1\n2|4\n";
        let schedule = parse(text, "|").unwrap();
        assert_eq!(emit(&schedule, "|"), text);
    }

    #[test]
    fn test_custom_separator_and_blank_lines() {
        let schedule = parse(" 1, 2 \n\n3,4\n", ",").unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.matches()[0], vec![0, 1]);
    }

    #[test]
    fn test_rejects_non_numeric() {
        let err = parse("1|2\n3|x\n", "|").unwrap_err();
        match err {
            ScheduleError::Format { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_zero() {
        assert!(parse("0|1\n", "|").is_err());
    }

    #[test]
    fn test_parse_labels_keeps_raw_text() {
        let labels = parse_labels("a|b\n1|2\n", "|");
        assert_eq!(labels, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_parse_proto_round() {
        let proto = parse_proto_round("2|1\n3|4\n", "|").unwrap();
        assert_eq!(proto.matches(), &[vec![0, 1], vec![2, 3]]);
        assert!(parse_proto_round("1|4000000000000\n2|3", "|").is_err());
    }
}
