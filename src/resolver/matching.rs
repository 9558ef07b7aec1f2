//! Name matching strategies
//!
//! Each matcher picks one candidate for a requested name or gives up. A
//! chain runs its matchers in order and the first hit wins.

use regex::Regex;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("valid token regex"));

/// A named matching step
#[derive(Clone, Copy)]
pub struct NameMatcher {
    /// Name used in logs
    pub name: &'static str,
    /// Pick a candidate for the requested name
    pub find: fn(&str, &[String]) -> Option<String>,
}

impl std::fmt::Debug for NameMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NameMatcher").field(&self.name).finish()
    }
}

/// Chain used when resolving a logical name against listed entity sets
pub const RESOLVE_CHAIN: &[NameMatcher] = &[
    NameMatcher {
        name: "exact",
        find: exact_ignore_case,
    },
    NameMatcher {
        name: "suffix",
        find: suffix,
    },
    NameMatcher {
        name: "all_tokens",
        find: all_tokens,
    },
    NameMatcher {
        name: "any_token",
        find: any_token,
    },
];

/// Chain used when a record query by name came back not found
pub const FALLBACK_CHAIN: &[NameMatcher] = &[
    NameMatcher {
        name: "exact",
        find: exact_ignore_case,
    },
    NameMatcher {
        name: "plural_toggle",
        find: plural_toggle,
    },
    NameMatcher {
        name: "all_tokens",
        find: all_tokens,
    },
    NameMatcher {
        name: "any_token",
        find: any_token,
    },
];

/// Run a chain and return the winning matcher name with its candidate
pub fn match_name(
    chain: &[NameMatcher],
    requested: &str,
    candidates: &[String],
) -> Option<(&'static str, String)> {
    if requested.trim().is_empty() {
        return None;
    }
    chain
        .iter()
        .find_map(|m| (m.find)(requested, candidates).map(|c| (m.name, c)))
}

/// Lower-case alphanumeric tokens of a name
pub fn tokens(name: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(&name.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Plural spellings of a singular name (lower-case)
pub fn plural_forms(name: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    let mut forms = vec![format!("{lower}s"), format!("{lower}es")];
    if let Some(stem) = lower.strip_suffix('y') {
        forms.push(format!("{stem}ies"));
    }
    forms
}

/// Singular spellings of a plural name (lower-case)
pub fn singular_forms(name: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    let mut forms = Vec::new();
    if let Some(stem) = lower.strip_suffix("ies") {
        forms.push(format!("{stem}y"));
    }
    if let Some(stem) = lower.strip_suffix("es") {
        forms.push(stem.to_string());
    }
    if let Some(stem) = lower.strip_suffix('s') {
        forms.push(stem.to_string());
    }
    forms.retain(|f| !f.is_empty());
    forms
}

fn exact_ignore_case(requested: &str, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .find(|c| c.eq_ignore_ascii_case(requested))
        .cloned()
}

/// Candidate ending with the requested name or one of its plural forms
fn suffix(requested: &str, candidates: &[String]) -> Option<String> {
    let mut wanted = vec![requested.to_lowercase()];
    wanted.extend(plural_forms(requested));

    candidates
        .iter()
        .filter(|c| {
            let lower = c.to_lowercase();
            wanted.iter().any(|w| lower.ends_with(w.as_str()))
        })
        .min_by_key(|c| c.len())
        .cloned()
}

fn plural_toggle(requested: &str, candidates: &[String]) -> Option<String> {
    let forms = if requested.to_lowercase().ends_with('s') {
        singular_forms(requested)
    } else {
        plural_forms(requested)
    };

    forms.iter().find_map(|form| {
        candidates
            .iter()
            .find(|c| c.eq_ignore_ascii_case(form))
            .cloned()
    })
}

/// Shortest candidate containing every token
fn all_tokens(requested: &str, candidates: &[String]) -> Option<String> {
    let wanted = tokens(requested);
    if wanted.is_empty() {
        return None;
    }

    candidates
        .iter()
        .filter(|c| {
            let lower = c.to_lowercase();
            wanted.iter().all(|t| lower.contains(t.as_str()))
        })
        .min_by_key(|c| c.len())
        .cloned()
}

/// Candidate containing the most tokens, shortest first on ties
fn any_token(requested: &str, candidates: &[String]) -> Option<String> {
    let wanted = tokens(requested);
    if wanted.is_empty() {
        return None;
    }

    candidates
        .iter()
        .filter_map(|c| {
            let lower = c.to_lowercase();
            let hits = wanted.iter().filter(|t| lower.contains(t.as_str())).count();
            (hits > 0).then_some((hits, c))
        })
        .min_by_key(|(hits, c)| (std::cmp::Reverse(*hits), c.len()))
        .map(|(_, c)| c.clone())
}
