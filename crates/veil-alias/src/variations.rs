//! Variation generation.
//!
//! Expands a canonical identity value into the alternate renderings a user
//! is likely to type: concatenated, dotted, initialed and re-cased names,
//! dotted vs. concatenated email local parts, and the common phone layouts.
//!
//! Every function here is pure. Output order is stable (first rendering
//! first, the trimmed original always leads) and free of duplicates.

use serde::Serialize;
use std::collections::BTreeMap;
use veil_common::{AliasProfile, IdentityData, PiiType, ProfileVariations};

/// Ordered, duplicate-free accumulator.
#[derive(Default)]
struct Variants(Vec<String>);

impl Variants {
    fn add(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() && !self.0.contains(&value) {
            self.0.push(value);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Upper-case the first character, lower-case the rest.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Upper-case only the first character.
fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn first_char(word: &str) -> String {
    word.chars().next().map(String::from).unwrap_or_default()
}

/// Name renderings: "Greg Barker" → "GregBarker", "gbarker", "G. Barker",
/// "greg.barker", "GREG_BARKER", ...
pub fn generate_name_variations(name: &str) -> Vec<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut out = Variants::default();
    out.add(trimmed);

    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.len() == 1 {
        let word = parts[0];
        out.add(word.to_lowercase());
        out.add(capitalize(word));
        out.add(word.to_uppercase());
        return out.into_vec();
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    let has_middle = parts.len() > 2;
    let spaced = parts.join(" ");
    let joined = parts.concat();
    let initial = first_char(first);

    out.add(spaced.clone());
    out.add(joined.clone());
    out.add(joined.to_lowercase());
    out.add(spaced.to_lowercase());

    let title: Vec<String> = parts.iter().map(|p| capitalize(p)).collect();
    out.add(title.join(" "));
    out.add(title.concat());

    // First initial + last name
    out.add(format!("{}{}", initial.to_lowercase(), last.to_lowercase()));
    out.add(format!("{}{}", initial.to_uppercase(), last.to_lowercase()));
    out.add(format!("{}{}", initial.to_lowercase(), last));
    out.add(format!("{}{}", initial.to_uppercase(), last));
    out.add(format!("{}. {}", initial.to_uppercase(), last));
    out.add(format!("{}.{}", initial.to_uppercase(), last));

    if has_middle {
        out.add(format!("{} {}", first, last));
        out.add(format!("{}{}", first, last));
        out.add(format!("{}{}", first.to_lowercase(), last.to_lowercase()));
    }

    out.add(spaced.to_uppercase());
    out.add(joined.to_uppercase());

    for sep in ["_", "-", "."] {
        let separated = parts.join(sep);
        out.add(separated.to_lowercase());
        if sep == "_" {
            out.add(separated.to_uppercase());
        } else {
            out.add(separated);
        }
    }

    out.into_vec()
}

/// Email renderings. The domain is kept exactly; only the local part varies.
/// Input without an `@` yields nothing.
pub fn generate_email_variations(email: &str) -> Vec<String> {
    let trimmed = email.trim().to_lowercase();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return Vec::new();
    };

    let mut out = Variants::default();
    out.add(trimmed.clone());
    out.add(format!("{}@{}", local.replace('.', ""), domain));

    if local.contains('.') {
        let mut segments = local.split('.');
        let head = segments.next().unwrap_or_default();
        let camel: String = std::iter::once(head.to_string())
            .chain(segments.map(upper_first))
            .collect();
        out.add(format!("{}@{}", camel, domain));
        out.add(format!("{}@{}", local.replace('.', "_"), domain));
    }
    if local.contains('_') {
        out.add(format!("{}@{}", local.replace('_', "."), domain));
    }
    out.add(format!("{}@{}", upper_first(local), domain));

    out.into_vec()
}

/// Phone renderings. Ten-digit and eleven-digit (leading 1) numbers get the
/// North American layouts; anything else gets digits-only.
pub fn generate_phone_variations(phone: &str) -> Vec<String> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut out = Variants::default();
    out.add(trimmed);

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return out.into_vec();
    }
    out.add(digits.clone());

    let local = match digits.len() {
        10 => Some(&digits[..]),
        11 if digits.starts_with('1') => Some(&digits[1..]),
        _ => None,
    };

    if let Some(local) = local {
        let (area, prefix, line) = (&local[0..3], &local[3..6], &local[6..10]);
        if digits.len() == 10 {
            out.add(format!("({}) {}-{}", area, prefix, line));
            out.add(format!("{}-{}-{}", area, prefix, line));
            out.add(format!("{}.{}.{}", area, prefix, line));
            out.add(format!("{} {} {}", area, prefix, line));
        } else {
            out.add(format!("+{}", digits));
        }
        out.add(format!("+1 {} {} {}", area, prefix, line));
        out.add(format!("+1-{}-{}-{}", area, prefix, line));
        out.add(format!("1-{}-{}-{}", area, prefix, line));
        if digits.len() == 11 {
            out.add(format!("({}) {}-{}", area, prefix, line));
        }
    }

    out.into_vec()
}

/// Case variants only, for company, address, job title and custom fields.
pub fn generate_generic_variations(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut out = Variants::default();
    out.add(trimmed);
    out.add(trimmed.to_lowercase());
    out.add(trimmed.to_uppercase());
    let title: Vec<String> = trimmed.split_whitespace().map(capitalize).collect();
    out.add(title.join(" "));
    out.into_vec()
}

/// Variations for one field value, dispatched on its type.
pub fn generate_field_variations(pii_type: PiiType, value: &str) -> Vec<String> {
    match pii_type {
        PiiType::Name => generate_name_variations(value),
        PiiType::Email => generate_email_variations(value),
        PiiType::Phone | PiiType::CellPhone => generate_phone_variations(value),
        PiiType::Address | PiiType::Company | PiiType::JobTitle | PiiType::Custom => {
            generate_generic_variations(value)
        }
    }
}

/// Fan out across every populated field. Custom fields are pooled under
/// `PiiType::Custom`.
pub fn generate_identity_variations(identity: &IdentityData) -> BTreeMap<PiiType, Vec<String>> {
    let mut map = BTreeMap::new();
    for (pii_type, value) in identity.fields() {
        let variations = generate_field_variations(pii_type, value);
        if !variations.is_empty() {
            map.insert(pii_type, variations);
        }
    }

    let mut custom = Variants::default();
    for key in identity.custom.keys() {
        if let Some(value) = identity.custom_field(key) {
            for v in generate_generic_variations(value) {
                custom.add(v);
            }
        }
    }
    let custom = custom.into_vec();
    if !custom.is_empty() {
        map.insert(PiiType::Custom, custom);
    }
    map
}

/// Case-insensitive substring check against any variation.
pub fn contains_variation(text: &str, variations: &[String]) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    variations
        .iter()
        .filter(|v| !v.is_empty())
        .any(|v| lower.contains(&v.to_lowercase()))
}

/// Every variation present in `text` (case-insensitive substring).
pub fn find_variations<'a>(text: &str, variations: &'a [String]) -> Vec<&'a str> {
    if text.is_empty() {
        return Vec::new();
    }
    let lower = text.to_lowercase();
    variations
        .iter()
        .filter(|v| !v.is_empty() && lower.contains(&v.to_lowercase()))
        .map(String::as_str)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationStats {
    pub total_variations: usize,
    pub by_field: BTreeMap<PiiType, usize>,
}

pub fn variation_stats(variations: &BTreeMap<PiiType, Vec<String>>) -> VariationStats {
    let by_field: BTreeMap<PiiType, usize> =
        variations.iter().map(|(k, v)| (*k, v.len())).collect();
    VariationStats {
        total_variations: by_field.values().sum(),
        by_field,
    }
}

/// Strings (lower-cased) generated on both sides. A non-empty result means
/// matching would not be bidirectional for those strings.
pub fn variation_overlaps(real: &[String], alias: &[String]) -> Vec<String> {
    let alias_lower: Vec<String> = alias.iter().map(|a| a.to_lowercase()).collect();
    let mut out = Variants::default();
    for r in real {
        let lower = r.to_lowercase();
        if alias_lower.contains(&lower) {
            out.add(lower);
        }
    }
    out.into_vec()
}

/// Fill the generated variations of both sides of a profile. User custom
/// and disabled entries are kept.
pub fn build_profile_variations(profile: &mut AliasProfile) {
    let variations = profile
        .variations
        .get_or_insert_with(ProfileVariations::default);
    variations.real.generated = generate_identity_variations(&profile.real);
    variations.alias.generated = generate_identity_variations(&profile.alias);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_variations_two_parts() {
        let v = generate_name_variations("Greg Barker");
        assert_eq!(v[0], "Greg Barker");
        for expected in [
            "GregBarker",
            "gregbarker",
            "greg barker",
            "gbarker",
            "GBarker",
            "G. Barker",
            "G.Barker",
            "GREG BARKER",
            "GREGBARKER",
            "greg_barker",
            "GREG_BARKER",
            "greg-barker",
            "Greg-Barker",
            "greg.barker",
            "Greg.Barker",
        ] {
            assert!(v.contains(&expected.to_string()), "missing {expected}");
        }
        let mut sorted = v.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), v.len(), "duplicates in {v:?}");
    }

    #[test]
    fn test_name_variations_single_word() {
        let v = generate_name_variations("  madonna ");
        assert_eq!(v, vec!["madonna", "Madonna", "MADONNA"]);
    }

    #[test]
    fn test_name_variations_middle_name() {
        let v = generate_name_variations("Mary Ann Lee");
        assert!(v.contains(&"Mary Lee".to_string()));
        assert!(v.contains(&"MaryLee".to_string()));
        assert!(v.contains(&"marylee".to_string()));
    }

    #[test]
    fn test_name_variations_empty() {
        assert!(generate_name_variations("   ").is_empty());
    }

    #[test]
    fn test_email_variations_keep_domain() {
        let v = generate_email_variations("Greg.Barker@Example.com");
        assert_eq!(v[0], "greg.barker@example.com");
        assert!(v.contains(&"gregbarker@example.com".to_string()));
        assert!(v.contains(&"gregBarker@example.com".to_string()));
        assert!(v.contains(&"greg_barker@example.com".to_string()));
        assert!(v.contains(&"Greg.barker@example.com".to_string()));
        assert!(v.iter().all(|e| e.ends_with("@example.com")));
    }

    #[test]
    fn test_email_underscore_to_dot() {
        let v = generate_email_variations("jo_ann@x.org");
        assert!(v.contains(&"jo.ann@x.org".to_string()));
        assert!(v.contains(&"Jo_ann@x.org".to_string()));
    }

    #[test]
    fn test_email_without_at() {
        assert!(generate_email_variations("not-an-email").is_empty());
    }

    #[test]
    fn test_phone_ten_digits() {
        let v = generate_phone_variations("(555) 123-4567");
        for expected in [
            "(555) 123-4567",
            "5551234567",
            "555-123-4567",
            "555.123.4567",
            "555 123 4567",
            "+1 555 123 4567",
            "+1-555-123-4567",
            "1-555-123-4567",
        ] {
            assert!(v.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_phone_eleven_digits() {
        let v = generate_phone_variations("+1 555 123 4567");
        assert!(v.contains(&"15551234567".to_string()));
        assert!(v.contains(&"+15551234567".to_string()));
        assert!(v.contains(&"(555) 123-4567".to_string()));
        assert!(!v.contains(&"555.123.4567".to_string()));
    }

    #[test]
    fn test_phone_other_lengths() {
        assert_eq!(generate_phone_variations("12-34"), vec!["12-34", "1234"]);
        assert_eq!(generate_phone_variations("ext"), vec!["ext"]);
    }

    #[test]
    fn test_generic_variations() {
        let v = generate_generic_variations("acme corp");
        assert_eq!(v, vec!["acme corp", "ACME CORP", "Acme Corp"]);
    }

    #[test]
    fn test_identity_variations_and_stats() {
        let mut identity = IdentityData {
            name: Some("John Smith".into()),
            company: Some("Acme".into()),
            ..Default::default()
        };
        identity.custom.insert("badge".into(), "b-12".into());
        let map = generate_identity_variations(&identity);
        assert!(map.contains_key(&PiiType::Name));
        assert!(map.contains_key(&PiiType::Company));
        assert!(map.contains_key(&PiiType::Custom));
        assert!(!map.contains_key(&PiiType::Email));

        let stats = variation_stats(&map);
        assert_eq!(
            stats.total_variations,
            map.values().map(Vec::len).sum::<usize>()
        );
        assert_eq!(stats.by_field[&PiiType::Company], 3);
    }

    #[test]
    fn test_contains_and_find() {
        let v = generate_name_variations("John Smith");
        assert!(contains_variation("ping JSMITH today", &v));
        assert!(!contains_variation("nobody here", &v));
        let found = find_variations("mail john.smith now", &v);
        assert!(found.contains(&"john.smith"));
    }

    #[test]
    fn test_overlaps() {
        let real = generate_name_variations("Ann Lee");
        let alias = generate_name_variations("Ann Kim");
        assert!(variation_overlaps(&real, &alias).is_empty());

        let real = generate_name_variations("Lee Ann");
        let alias = generate_name_variations("Lou Ann");
        // Same initial and last name
        let overlaps = variation_overlaps(&real, &alias);
        assert!(overlaps.contains(&"lann".to_string()));
    }

    #[test]
    fn test_build_profile_variations_keeps_custom() {
        let mut profile = AliasProfile::new(
            "p",
            "p",
            IdentityData {
                name: Some("John Smith".into()),
                ..Default::default()
            },
            IdentityData {
                name: Some("Alex Johnson".into()),
                ..Default::default()
            },
        );
        let mut existing = ProfileVariations::default();
        existing
            .real
            .disabled
            .insert(PiiType::Name, vec!["jsmith".into()]);
        profile.variations = Some(existing);

        build_profile_variations(&mut profile);
        let variations = profile.variations.unwrap();
        assert!(variations.real.generated[&PiiType::Name].contains(&"jsmith".to_string()));
        assert!(!variations.real.active(PiiType::Name).contains(&"jsmith"));
        assert!(variations.alias.generated[&PiiType::Name].contains(&"ajohnson".to_string()));
    }
}
