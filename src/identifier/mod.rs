// SPDX-License-Identifier: AGPL-3.0-or-later

//! Conversion of translated phrases into relational-safe identifiers.
//!
//! `to_identifier` is pure and deterministic: re-resolving a field's column
//! name with the same inputs always reproduces the same identifier. Resolved
//! names are additionally persisted on the field row at definition time so
//! the hot submission path never resolves anything.
use once_cell::sync::Lazy;
use regex::Regex;

/// PostgreSQL limits identifiers to 63 bytes, names are truncated to leave
/// room for the uniqueness suffix before hitting it.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Length of the hex hash suffix derived from the owning entity's id.
const HASH_SUFFIX_LENGTH: usize = 4;

/// Token prefixed when the normalized body would be empty, start with a
/// digit or shadow a reserved word.
const SAFE_PREFIX: &str = "f_";

/// Reserved words of the target engine which may never appear as a bare
/// identifier body.
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc",
    "asymmetric", "authorization", "between", "binary", "both", "case",
    "cast", "check", "collate", "column", "constraint", "create", "cross",
    "current_date", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "for", "foreign", "freeze", "from", "full", "grant",
    "group", "having", "ilike", "in", "index", "initially", "inner",
    "intersect", "into", "is", "isnull", "join", "lateral", "leading",
    "left", "like", "limit", "localtime", "localtimestamp", "natural",
    "not", "notnull", "null", "offset", "on", "only", "or", "order",
    "outer", "overlaps", "placing", "primary", "references", "returning",
    "right", "select", "session_user", "similar", "some", "symmetric",
    "table", "then", "to", "trailing", "true", "union", "unique", "user",
    "using", "variadic", "verbose", "when", "where", "window", "with",
];

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// What kind of identifier is being generated. Tables are disambiguated
/// against the whole schema, columns only within their table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdentifierKind {
    Table,
    Column,
}

/// Converts a translated phrase into a normalized, length-bounded,
/// uniqueness-suffixed relational identifier.
///
/// The phrase is lower-cased and reduced to `[a-z0-9_]` runs, the owning
/// entity's id contributes a short hash suffix so two fields translating to
/// the same English phrase still end up with distinct columns. Should the
/// result collide with a name in `existing` anyway, a numeric disambiguator
/// is appended.
pub fn to_identifier(
    phrase: &str,
    owner_id: &str,
    kind: IdentifierKind,
    existing: &[String],
) -> String {
    let body = normalize(phrase);
    let suffix = short_hash(owner_id);

    let mut attempt: u64 = 0;
    loop {
        let candidate = assemble(&body, &suffix, attempt);
        if !existing.iter().any(|name| name == &candidate) {
            log::trace!("Resolved {:?} identifier '{}' for '{}'", kind, candidate, phrase);
            return candidate;
        }
        attempt += 1;
    }
}

/// Normalizes a phrase into a bare identifier body without suffix.
fn normalize(phrase: &str) -> String {
    let lowered = phrase.to_lowercase();
    let replaced = NON_ALNUM.replace_all(&lowered, "_");
    let body = replaced.trim_matches('_').to_string();

    let needs_prefix = body.is_empty()
        || body.as_bytes()[0].is_ascii_digit()
        || RESERVED_WORDS.contains(&body.as_str());

    if needs_prefix {
        format!("{}{}", SAFE_PREFIX, body)
    } else {
        body
    }
}

/// Joins body, hash suffix and optional numeric disambiguator, truncating
/// the body so the result never exceeds the identifier limit.
fn assemble(body: &str, suffix: &str, attempt: u64) -> String {
    let tail = if attempt == 0 {
        format!("_{}", suffix)
    } else {
        format!("_{}_{}", suffix, attempt + 1)
    };

    let room = MAX_IDENTIFIER_LENGTH - tail.len();
    let truncated: String = body.chars().take(room).collect();
    let truncated = truncated.trim_end_matches('_');

    format!("{}{}", truncated, tail)
}

/// Short stable content hash, `HASH_SUFFIX_LENGTH` lowercase hex chars.
///
/// FNV-1a rather than the std hasher so the value never changes between
/// compiler releases, persisted identifiers depend on it.
pub(crate) fn short_hash(input: &str) -> String {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    let mut hex = format!("{:x}", hash);
    hex.truncate(HASH_SUFFIX_LENGTH);
    while hex.len() < HASH_SUFFIX_LENGTH {
        hex.push('0');
    }
    hex
}

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;
    use regex::Regex;
    use rstest::rstest;

    use super::{to_identifier, IdentifierKind, MAX_IDENTIFIER_LENGTH};

    static VALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

    #[test]
    fn is_deterministic() {
        let first = to_identifier("Full Name", "field-1", IdentifierKind::Column, &[]);
        let second = to_identifier("Full Name", "field-1", IdentifierKind::Column, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn same_phrase_different_owners_diverge() {
        let table = to_identifier("full name", "form-a", IdentifierKind::Table, &[]);
        let column = to_identifier("full name", "field-b", IdentifierKind::Column, &[]);
        assert_ne!(table, column);
        assert!(table.starts_with("full_name_"));
        assert!(column.starts_with("full_name_"));
    }

    #[rstest]
    #[case("Full Name")]
    #[case("  spaced   out  phrase  ")]
    #[case("UPPER-case/slash.dot")]
    #[case("1 starts with digit")]
    #[case("select")]
    #[case("")]
    #[case("ประเภท")]
    fn output_is_always_well_formed(#[case] phrase: &str) {
        let name = to_identifier(phrase, "owner-1", IdentifierKind::Column, &[]);
        assert!(VALID.is_match(&name), "invalid identifier: {}", name);
        assert!(name.len() <= MAX_IDENTIFIER_LENGTH);
    }

    #[test]
    fn long_phrases_are_truncated_to_limit() {
        let phrase = "very ".repeat(40) + "long phrase";
        let name = to_identifier(&phrase, "owner-1", IdentifierKind::Table, &[]);
        assert!(name.len() <= MAX_IDENTIFIER_LENGTH);
        assert!(VALID.is_match(&name));
    }

    #[test]
    fn reserved_words_are_prefixed() {
        let name = to_identifier("user", "owner-1", IdentifierKind::Column, &[]);
        assert!(name.starts_with("f_user"));
        let name = to_identifier("order", "owner-1", IdentifierKind::Column, &[]);
        assert!(name.starts_with("f_order"));
    }

    #[test]
    fn collisions_get_numeric_disambiguator() {
        let first = to_identifier("name", "owner-1", IdentifierKind::Column, &[]);
        let second = to_identifier("name", "owner-1", IdentifierKind::Column, &[first.clone()]);
        assert_ne!(first, second);
        assert!(second.ends_with("_2"));

        let third = to_identifier(
            "name",
            "owner-1",
            IdentifierKind::Column,
            &[first.clone(), second.clone()],
        );
        assert_ne!(third, first);
        assert_ne!(third, second);
        assert!(third.ends_with("_3"));
    }

    #[test]
    fn disambiguated_names_stay_within_limit() {
        let phrase = "x".repeat(100);
        let taken = to_identifier(&phrase, "owner-1", IdentifierKind::Column, &[]);
        let name = to_identifier(&phrase, "owner-1", IdentifierKind::Column, &[taken]);
        assert!(name.len() <= MAX_IDENTIFIER_LENGTH);
        assert!(VALID.is_match(&name));
    }
}
