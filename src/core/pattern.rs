//! Purpose: Resolve table-name selections (exact names and `*` globs) against a catalog.
//! Exports: `resolve`, `unmatched`, `glob_match`.
//! Role: Turns caller selections into a concrete, ordered, deduplicated table list.
//! Invariants: Output order follows `universe`, never pattern order.
//! Invariants: Matching is case-sensitive; only `*` is special.
use std::collections::HashSet;

use crate::core::error::{Error, ErrorKind};

const WILDCARD: char = '*';

/// Empty `patterns` selects the whole universe. A pattern that matches
/// nothing contributes nothing.
pub fn resolve<S: AsRef<str>>(patterns: &[S], universe: &[String]) -> Result<Vec<String>, Error> {
    for pattern in patterns {
        check_pattern(pattern.as_ref())?;
    }

    let mut seen = HashSet::with_capacity(universe.len());
    let mut selected = Vec::new();
    for name in universe {
        let wanted = patterns.is_empty()
            || patterns
                .iter()
                .any(|pattern| matches(pattern.as_ref(), name));
        if wanted && seen.insert(name.as_str()) {
            selected.push(name.clone());
        }
    }
    Ok(selected)
}

/// Patterns that select no table in `universe`, in the order given.
pub fn unmatched<S: AsRef<str>>(patterns: &[S], universe: &[String]) -> Vec<String> {
    let mut dead = Vec::new();
    for pattern in patterns {
        let pattern: &str = pattern.as_ref();
        if !universe.iter().any(|name| matches(pattern, name)) {
            dead.push(pattern.to_string());
        }
    }
    dead
}

fn matches(pattern: &str, name: &str) -> bool {
    if pattern.contains(WILDCARD) {
        glob_match(pattern, name)
    } else {
        pattern == name
    }
}

fn check_pattern(pattern: &str) -> Result<(), Error> {
    if pattern.chars().any(char::is_control) {
        return Err(Error::new(ErrorKind::InvalidPattern)
            .with_message(format!("table pattern {pattern:?} contains control characters"))
            .with_hint("Use plain table names, optionally with `*` wildcards."));
    }
    Ok(())
}

/// Anchored single-segment glob where `*` matches any run of characters.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && pattern[p] == WILDCARD {
            backtrack = Some((p, n));
            p += 1;
        } else if p < pattern.len() && pattern[p] == name[n] {
            p += 1;
            n += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            n = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|ch| *ch == WILDCARD)
}

#[cfg(test)]
mod tests {
    use super::{glob_match, resolve, unmatched};
    use crate::core::error::ErrorKind;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn star_selects_everything_in_order() {
        let universe = names(&["Config", "Events", "AreaNames"]);
        assert_eq!(resolve(&["*"], &universe).expect("resolve"), universe);
    }

    #[test]
    fn empty_selection_is_everything() {
        let universe = names(&["Config", "Events"]);
        let empty: [&str; 0] = [];
        assert_eq!(resolve(&empty, &universe).expect("resolve"), universe);
    }

    #[test]
    fn exact_names_are_case_sensitive() {
        let universe = names(&["Config", "Events"]);
        assert_eq!(resolve(&["Config"], &universe).expect("resolve"), names(&["Config"]));
        assert!(resolve(&["config"], &universe).expect("resolve").is_empty());
        assert!(resolve(&["Nope"], &names(&["Config"])).expect("resolve").is_empty());
    }

    #[test]
    fn overlapping_patterns_keep_universe_order_without_duplicates() {
        let universe = names(&["GeniSysZones", "Config", "GeniSysPanels"]);
        let selected = resolve(&["GeniSysPanels", "GeniSys*", "Config"], &universe).expect("resolve");
        assert_eq!(selected, names(&["GeniSysZones", "Config", "GeniSysPanels"]));
    }

    #[test]
    fn empty_pattern_matches_only_an_empty_name() {
        let universe = names(&["Config"]);
        assert!(resolve(&[""], &universe).expect("resolve").is_empty());
    }

    #[test]
    fn control_characters_are_invalid() {
        let err = resolve(&["Con\u{0}fig"], &names(&["Config"])).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::InvalidPattern);
    }

    #[test]
    fn glob_semantics() {
        assert!(glob_match("Geni*", "GeniSysPanels"));
        assert!(glob_match("*Panels", "GeniSysPanels"));
        assert!(glob_match("G*S*s", "GeniSysPanels"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a**b", "ab"));
        assert!(!glob_match("Geni*", "genisys"));
        assert!(!glob_match("*Zones", "GeniSysPanels"));
        assert!(glob_match("Area?*", "Area?Names"));
        assert!(!glob_match("Area?*", "AreaNames"));
    }

    #[test]
    fn unmatched_reports_dead_patterns() {
        let universe = names(&["Config", "Events"]);
        assert_eq!(unmatched(&["Config", "Nope*", "X"], &universe), names(&["Nope*", "X"]));
    }
}
