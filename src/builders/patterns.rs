use serde::Serialize;
use std::fmt;

use crate::builders::selector::{AttrOperator, AttributeSelector, CompoundSelector, SelectorList};

/// Rule prefix selecting folders whose name starts with the value.
pub const STARTS_WITH_PREFIX: &str = "startswith::";
/// Rule prefix selecting folders whose path ends with the value.
pub const ENDS_WITH_PREFIX: &str = "endswith::";

/// Class the file explorer puts on a folder's title row.
pub const FOLDER_TITLE_CLASS: &str = "nav-folder-title";
/// Attribute holding the vault-relative path of a folder title row.
pub const PATH_ATTRIBUTE: &str = "data-path";

/// An enum that defines how the value of a rule is compared against a folder path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RuleKind {
    /// The folder's own name equals the value. Matches both nested folders
    /// (`.../value`) and root-level folders (`value`).
    Exact,
    /// The folder's name starts with the value. Written as `startsWith::value`.
    StartsWith,
    /// The folder's path ends with the value, regardless of segment
    /// boundaries. Written as `endsWith::value`.
    EndsWith,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Exact => write!(f, "exact"),
            RuleKind::StartsWith => write!(f, "startsWith"),
            RuleKind::EndsWith => write!(f, "endsWith"),
        }
    }
}

/// A parsed folder rule.
///
/// Rules are stored as raw strings in the settings (one per line of the
/// settings text area) and parsed on every use, so a `FolderRule` never
/// outlives the settings it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRule {
    /// How `value` is compared against a folder path.
    pub kind: RuleKind,
    /// The trimmed folder name (or name fragment) with the prefix removed.
    pub value: String,
}

/// The `PatternMatcher` trait turns a rule into the two representations the
/// plugin hands to the host: a selector for the rendered file tree and an
/// entry for the host's ignore list.
pub trait PatternMatcher {
    /// Builds the selector matching the title rows of every folder this rule hides.
    ///
    /// # Arguments
    /// * `case_insensitive`: Whether attribute comparisons carry the ` i` flag.
    ///
    /// # Returns
    /// A `SelectorList`; empty (matching nothing) for inert rules.
    fn selector(&self, case_insensitive: bool) -> SelectorList;

    /// Builds the `/regex/` entry that excludes the same folders from the
    /// host's search and indexing.
    ///
    /// # Arguments
    /// * `case_insensitive`: Whether letters are expanded into `[xX]` classes.
    ///
    /// # Returns
    /// `None` for inert rules, the entry otherwise.
    fn ignore_regex(&self, case_insensitive: bool) -> Option<String>;
}

impl FolderRule {
    /// Parses a raw rule string.
    ///
    /// The prefix is recognised case-insensitively (`startsWith::`,
    /// `STARTSWITH::` and `startswith::` are all the same), and the value is
    /// trimmed after the prefix has been stripped. Anything without a known
    /// prefix is an `Exact` rule, including strings like `foo::bar`.
    ///
    /// # Arguments
    /// * `raw`: One line of the configured rule list.
    ///
    /// # Returns
    /// The parsed rule. Parsing never fails; a blank value yields an inert rule.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_start();

        if let Some(rest) = strip_prefix_ignore_ascii_case(trimmed, STARTS_WITH_PREFIX) {
            return Self {
                kind: RuleKind::StartsWith,
                value: rest.trim().to_string(),
            };
        }
        if let Some(rest) = strip_prefix_ignore_ascii_case(trimmed, ENDS_WITH_PREFIX) {
            return Self {
                kind: RuleKind::EndsWith,
                value: rest.trim().to_string(),
            };
        }

        Self {
            kind: RuleKind::Exact,
            value: trimmed.trim().to_string(),
        }
    }

    /// An inert rule has nothing left after trimming and matches nothing.
    pub fn is_inert(&self) -> bool {
        self.value.is_empty()
    }

    /// Builds the selector for this rule against an arbitrary element class
    /// and path attribute.
    ///
    /// The file explorer uses `.nav-folder-title[data-path]`, but companion
    /// plugins render folders with their own conventions and reuse the same
    /// rule semantics through this method.
    ///
    /// # Arguments
    /// * `class`: The class every matched element must carry, if any.
    /// * `attribute`: The attribute holding the folder's vault path.
    /// * `case_insensitive`: Whether comparisons ignore ASCII case.
    pub fn selector_for(
        &self,
        class: Option<&str>,
        attribute: &str,
        case_insensitive: bool,
    ) -> SelectorList {
        if self.is_inert() {
            return SelectorList::default();
        }

        let compound = |operator: AttrOperator, value: String| {
            let mut compound = CompoundSelector::default();
            if let Some(class) = class {
                compound.classes.push(class.to_string());
            }
            compound.attributes.push(AttributeSelector {
                name: attribute.to_string(),
                operator,
                value,
                case_insensitive,
            });
            compound
        };

        let compounds = match self.kind {
            // A nested folder's path ends with `/name`, a root-level folder's
            // path is exactly `name`.
            RuleKind::Exact => vec![
                compound(AttrOperator::Suffix, format!("/{}", self.value)),
                compound(AttrOperator::Equals, self.value.clone()),
            ],
            // Root-level folders start with the value; nested ones contain
            // `/value`. The substring form also matches an intermediate
            // segment starting with the value, which is kept as-is.
            RuleKind::StartsWith => vec![
                compound(AttrOperator::Prefix, self.value.clone()),
                compound(AttrOperator::Substring, format!("/{}", self.value)),
            ],
            RuleKind::EndsWith => vec![compound(AttrOperator::Suffix, self.value.clone())],
        };

        SelectorList::new(compounds)
    }
}

impl PatternMatcher for FolderRule {
    fn selector(&self, case_insensitive: bool) -> SelectorList {
        self.selector_for(Some(FOLDER_TITLE_CLASS), PATH_ATTRIBUTE, case_insensitive)
    }

    fn ignore_regex(&self, case_insensitive: bool) -> Option<String> {
        if self.is_inert() {
            return None;
        }

        let value = regex_literal(&self.value, case_insensitive);
        let body = match self.kind {
            RuleKind::EndsWith => format!(r"{value}(\/|$)"),
            RuleKind::StartsWith => format!(r"(^|\/){value}"),
            RuleKind::Exact => format!(r"(^|\/){value}(\/|$)"),
        };

        Some(format!("/{body}/"))
    }
}

/// Convenience wrapper returning the selector string for a raw rule.
pub fn build_selector(raw: &str, case_insensitive: bool) -> String {
    FolderRule::parse(raw).selector(case_insensitive).to_string()
}

/// Convenience wrapper returning the ignore-list entry for a raw rule.
pub fn build_ignore_regex(raw: &str, case_insensitive: bool) -> Option<String> {
    FolderRule::parse(raw).ignore_regex(case_insensitive)
}

fn strip_prefix_ignore_ascii_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

/// Escapes `value` for use inside a `/.../` ignore-list entry.
///
/// The host's ignore-list format has no case-insensitivity flag, so in
/// case-insensitive mode every cased character becomes a two-member class.
fn regex_literal(value: &str, case_insensitive: bool) -> String {
    let mut out = String::with_capacity(value.len() * 4);

    for ch in value.chars() {
        if case_insensitive && let Some((lower, upper)) = simple_case_pair(ch) {
            out.push('[');
            out.push(lower);
            out.push(upper);
            out.push(']');
            continue;
        }

        if ch == '/' {
            out.push_str(r"\/");
        } else {
            let mut buf = [0u8; 4];
            out.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
        }
    }

    out
}

/// Returns the lower/upper pair of a character whose case mapping is one
/// character each way; `None` for uncased characters and multi-character
/// mappings such as `ß`.
fn simple_case_pair(ch: char) -> Option<(char, char)> {
    let mut lower = ch.to_lowercase();
    let mut upper = ch.to_uppercase();

    let (l, u) = (lower.next()?, upper.next()?);
    if lower.next().is_some() || upper.next().is_some() || l == u {
        return None;
    }
    Some((l, u))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn compile(entry: &str) -> Regex {
        let body = entry
            .strip_prefix('/')
            .and_then(|e| e.strip_suffix('/'))
            .expect("entry is wrapped in slashes");
        Regex::new(body).unwrap()
    }

    #[test]
    fn test_parse_prefixes() {
        assert_eq!(
            FolderRule::parse("attachments"),
            FolderRule { kind: RuleKind::Exact, value: "attachments".to_string() }
        );
        assert_eq!(
            FolderRule::parse("startsWith::_"),
            FolderRule { kind: RuleKind::StartsWith, value: "_".to_string() }
        );
        assert_eq!(
            FolderRule::parse("ENDSWITH::  _files "),
            FolderRule { kind: RuleKind::EndsWith, value: "_files".to_string() }
        );
    }

    #[test]
    fn test_unknown_prefix_is_exact() {
        let rule = FolderRule::parse("contains::foo");
        assert_eq!(rule.kind, RuleKind::Exact);
        assert_eq!(rule.value, "contains::foo");
    }

    #[test]
    fn test_prefix_shorter_than_input_does_not_panic() {
        // multi-byte characters around the prefix length must not split a char
        let rule = FolderRule::parse("aéééééé");
        assert_eq!(rule.kind, RuleKind::Exact);
    }

    #[test]
    fn test_inert_rules_match_nothing() {
        for raw in ["", "   ", "startsWith::", "endsWith::   "] {
            let rule = FolderRule::parse(raw);
            assert!(rule.is_inert(), "{raw:?} should be inert");
            assert!(rule.selector(true).is_empty());
            assert_eq!(rule.selector(true).to_string(), "");
            assert_eq!(rule.ignore_regex(true), None);
        }
    }

    #[test]
    fn test_selector_strings() {
        assert_eq!(
            build_selector("attachments", true),
            r#".nav-folder-title[data-path$="/attachments" i], .nav-folder-title[data-path="attachments" i]"#
        );
        assert_eq!(
            build_selector("startsWith::_", false),
            r#".nav-folder-title[data-path^="_"], .nav-folder-title[data-path*="/_"]"#
        );
        assert_eq!(
            build_selector("endsWith::/media", false),
            r#".nav-folder-title[data-path$="/media"]"#
        );
    }

    #[test]
    fn test_selector_escapes_quotes() {
        assert_eq!(
            build_selector(r#"say "hi""#, false),
            r#".nav-folder-title[data-path$="/say \"hi\""], .nav-folder-title[data-path="say \"hi\""]"#
        );
    }

    #[test]
    fn test_exact_regex_is_bounded_by_separators() {
        let entry = build_ignore_regex("reports", true).unwrap();
        assert_eq!(entry, r"/(^|\/)[rR][eE][pP][oO][rR][tT][sS](\/|$)/");

        let re = compile(&entry);
        assert!(re.is_match("Reports"));
        assert!(re.is_match("work/REPORTS/2024.md"));
        assert!(!re.is_match("work/old-reports"));
        assert!(!re.is_match("reportsArchive"));
    }

    #[test]
    fn test_starts_with_regex() {
        let re = compile(&build_ignore_regex("startsWith::tmp", false).unwrap());
        assert!(re.is_match("tmp-1"));
        assert!(re.is_match("a/tmp-1/file.md"));
        assert!(!re.is_match("a/xtmp"));
        assert!(!re.is_match("TMP"));
    }

    #[test]
    fn test_ends_with_regex() {
        let re = compile(&build_ignore_regex("endsWith::_files", false).unwrap());
        assert!(re.is_match("notes/page_files"));
        assert!(re.is_match("notes/page_files/img.png"));
        assert!(!re.is_match("notes/page_files_old"));
    }

    #[test]
    fn test_regex_escapes_metacharacters() {
        let entry = build_ignore_regex("a.b/c", false).unwrap();
        assert_eq!(entry, r"/(^|\/)a\.b\/c(\/|$)/");
        let re = compile(&entry);
        assert!(re.is_match("x/a.b/c"));
        assert!(!re.is_match("x/aXb/c"));
    }

    #[test]
    fn test_case_expansion_skips_uncased_characters() {
        let entry = build_ignore_regex("v2_ß", true).unwrap();
        assert_eq!(entry, r"/(^|\/)[vV]2_ß(\/|$)/");
    }
}
