// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Target selection by exact and regular-expression matchers.

use std::collections::BTreeSet;

use regex::Regex;

/// Result of a [`filter`] call. Both lists are sorted ascending so that
/// repeated cycles produce stable status diffs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterResult {
    /// Candidates selected for reconciliation
    pub matched: Vec<String>,
    /// Exact include matchers that did not correspond to any candidate
    pub missed: Vec<String>,
}

/// Filter candidate names using include and exclude matchers.
///
/// With no include matchers the whole candidate set is included. Regular
/// expressions use substring semantics; they do not have to match the whole
/// name. Excludes run after includes: exact excludes remove entries from both
/// the matched and missed sets, exclude patterns likewise. A single
/// unparseable pattern fails the whole call.
pub fn filter(
    all: &[String],
    include_exact: &[String],
    include_regex: &[String],
    exclude_exact: &[String],
    exclude_regex: &[String],
) -> Result<FilterResult, regex::Error> {
    let include_patterns = compile(include_regex)?;
    let exclude_patterns = compile(exclude_regex)?;

    let candidates: BTreeSet<&str> = all.iter().map(String::as_str).collect();
    let mut matched: BTreeSet<&str> = BTreeSet::new();
    let mut missed: BTreeSet<&str> = BTreeSet::new();

    if include_exact.is_empty() && include_patterns.is_empty() {
        matched = candidates.clone();
    } else {
        for entry in include_exact {
            if candidates.contains(entry.as_str()) {
                matched.insert(entry.as_str());
            } else {
                missed.insert(entry.as_str());
            }
        }

        for pattern in &include_patterns {
            for candidate in &candidates {
                if pattern.is_match(candidate) {
                    matched.insert(*candidate);
                }
            }
        }
    }

    for entry in exclude_exact {
        matched.remove(entry.as_str());
        missed.remove(entry.as_str());
    }

    matched.retain(|name| !exclude_patterns.iter().any(|p| p.is_match(name)));
    missed.retain(|name| !exclude_patterns.iter().any(|p| p.is_match(name)));

    Ok(FilterResult {
        matched: matched.into_iter().map(String::from).collect(),
        missed: missed.into_iter().map(String::from).collect(),
    })
}

fn compile(expressions: &[String]) -> Result<Vec<Regex>, regex::Error> {
    expressions.iter().map(|e| Regex::new(e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_no_matchers_returns_all_sorted() {
        let result = filter(&names(&["b", "d", "a", "c"]), &[], &[], &[], &[]).unwrap();

        assert_eq!(result.matched, names(&["a", "b", "c", "d"]));
        assert!(result.missed.is_empty());
    }

    #[test]
    fn test_no_candidates_no_results() {
        let result = filter(&[], &[], &[], &[], &[]).unwrap();

        assert!(result.matched.is_empty());
        assert!(result.missed.is_empty());
    }

    #[test]
    fn test_exact_matchers_report_misses_sorted() {
        let result = filter(
            &names(&["b", "d", "a", "c"]),
            &names(&["y", "c", "a", "x"]),
            &[],
            &[],
            &[],
        )
        .unwrap();

        assert_eq!(result.matched, names(&["a", "c"]));
        assert_eq!(result.missed, names(&["x", "y"]));
    }

    #[test]
    fn test_regex_matchers() {
        let result = filter(
            &names(&[
                "app-operator",
                "trivy",
                "observability-bundle",
                "trivy-operator",
                "operator-zero",
            ]),
            &[],
            &names(&["trivy.*", ".*-operator"]),
            &[],
            &[],
        )
        .unwrap();

        assert_eq!(
            result.matched,
            names(&["app-operator", "trivy", "trivy-operator"])
        );
        assert!(result.missed.is_empty());
    }

    #[test]
    fn test_regex_uses_substring_semantics() {
        let result = filter(
            &names(&["a", "aa", "aab", "aabaa", "abababa", "abca", "cbbacab"]),
            &[],
            &names(&["[b]+[a]{1,2}"]),
            &[],
            &[],
        )
        .unwrap();

        assert_eq!(result.matched, names(&["aabaa", "abababa", "cbbacab"]));
    }

    #[test]
    fn test_anchored_group_matcher() {
        let result = filter(
            &names(&[
                "chart-operator",
                "app-exporter",
                "observability-bundle",
                "app-asd-qwe",
                "app-operator",
                "chart-app-controller",
            ]),
            &[],
            &names(&["^app-([a-zA-Z]+)$"]),
            &[],
            &[],
        )
        .unwrap();

        assert_eq!(result.matched, names(&["app-exporter", "app-operator"]));
    }

    #[test]
    fn test_invalid_include_regex_poisons_the_whole_filter() {
        let result = filter(
            &names(&["apple", "pear", "blueberry"]),
            &[],
            &names(&[".*p.*", "$^*.a-z\\"]),
            &[],
            &[],
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_exclude_regex_poisons_the_whole_filter() {
        let result = filter(
            &names(&["apple", "pear"]),
            &[],
            &[],
            &[],
            &names(&["$^*.a-z\\"]),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_exact_excludes_with_include_all() {
        let result = filter(
            &names(&["a", "c", "x", "y", "z", "b", "d"]),
            &[],
            &[],
            &names(&["x", "b"]),
            &[],
        )
        .unwrap();

        assert_eq!(result.matched, names(&["a", "c", "d", "y", "z"]));
    }

    #[test]
    fn test_regex_excludes_with_include_all() {
        let result = filter(
            &names(&["123", "456", "789", "64"]),
            &[],
            &[],
            &[],
            &names(&["[4-6]{3}"]),
        )
        .unwrap();

        assert_eq!(result.matched, names(&["123", "64", "789"]));
    }

    #[test]
    fn test_combined_include_and_exclude_matchers() {
        let result = filter(
            &names(&["a", "123", "aa", "456", "a24", "789", "123456", "c12", "3245"]),
            &names(&["aa"]),
            &names(&["\\d+"]),
            &[],
            &names(&["\\d{6}", "24"]),
        )
        .unwrap();

        assert_eq!(result.matched, names(&["123", "456", "789", "aa", "c12"]));
    }

    #[test]
    fn test_excludes_remove_missed_entries_too() {
        let result = filter(
            &names(&["a", "aa", "aab", "b", "d", "c", "aaa", "dd"]),
            &names(&["dd", "cc", "d"]),
            &names(&["^[a]*$"]),
            &names(&["aa"]),
            &names(&["d.+"]),
        )
        .unwrap();

        assert_eq!(result.matched, names(&["a", "aaa", "d"]));
        assert_eq!(result.missed, names(&["cc"]));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let all = names(&["a", "b", "c", "ab"]);
        let include_regex = names(&["a.*"]);

        let first = filter(&all, &[], &include_regex, &[], &[]).unwrap();
        let second = filter(&all, &[], &include_regex, &[], &[]).unwrap();

        assert_eq!(first, second);
    }
}
