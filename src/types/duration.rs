// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Parser for Go-style duration strings as used in CRD interval fields.

use std::time::Duration;

use crate::error::{Result, WeftError};

/// Parse a duration string composed of one or more `<number><unit>` parts,
/// e.g. `10m`, `90s`, `1h30m` or `1.5s`. Supported units: `ms`, `s`, `m`, `h`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(invalid(input));
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| invalid(input))?;
        if number_len == 0 {
            return Err(invalid(input));
        }

        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number.parse().map_err(|_| invalid(input))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        let seconds = match unit {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return Err(invalid(input)),
        };

        total += Duration::from_secs_f64(seconds);
        rest = next;
    }

    Ok(total)
}

fn invalid(input: &str) -> WeftError {
    WeftError::InvalidDuration(input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn test_parse_milliseconds() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_unknown_unit() {
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn test_parse_missing_unit() {
        assert!(parse_duration("10").is_err());
    }

    #[test]
    fn test_parse_missing_number() {
        assert!(parse_duration("m5").is_err());
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_duration("").is_err());
    }
}
