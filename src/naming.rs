//! Reading-file name parsing.
//!
//! HOBO exports are named `<prefix>_<site_code>_<file_number>[_<variant>]`,
//! e.g. `BT_TCCB08_2210_a`. Names without a trailing tag belong to the
//! primary logger.

use crate::error::{QaqcError, Result};
use crate::models::{GroupKey, ParsedName, Variant};
use std::path::Path;

/// Parse a reading-file basename, with or without its extension
pub fn parse_file_name(name: &str) -> Result<ParsedName> {
    let source_name = strip_extension(name);
    let parts: Vec<&str> = source_name.split('_').collect();

    if parts.len() < 3 {
        return Err(QaqcError::malformed_name(
            name,
            format!(
                "expected <prefix>_<site>_<file number>[_<variant>], found {} field(s)",
                parts.len()
            ),
        ));
    }

    let site_code = parts[1].trim();
    let file_number = parts[2].trim();
    if site_code.is_empty() {
        return Err(QaqcError::malformed_name(name, "empty site code"));
    }
    if file_number.is_empty() {
        return Err(QaqcError::malformed_name(name, "empty file number"));
    }

    // A trailing underscore with nothing after it still names the primary logger
    let variant = match parts.last() {
        Some(tag) if parts.len() > 3 && !tag.is_empty() => parse_variant_tag(name, tag)?,
        _ => Variant::A,
    };

    Ok(ParsedName {
        prefix: parts[0].to_string(),
        key: GroupKey::new(site_code, file_number),
        variant,
        source_name: source_name.to_string(),
    })
}

/// Parse the file name component of a path
pub fn parse_file_path(path: &Path) -> Result<ParsedName> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| QaqcError::malformed_name(path.display().to_string(), "not valid UTF-8"))?;
    parse_file_name(name)
}

fn parse_variant_tag(name: &str, tag: &str) -> Result<Variant> {
    tag.parse::<Variant>().map_err(|_| {
        QaqcError::malformed_name(
            name,
            format!("unknown variant tag '{}', expected one of a, b, c, d", tag),
        )
    })
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("csv") => stem,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_fields_default_to_primary() {
        let parsed = parse_file_name("BT_TCSR41_2210.csv").unwrap();

        assert_eq!(parsed.prefix, "BT");
        assert_eq!(parsed.key, GroupKey::new("TCSR41", "2210"));
        assert_eq!(parsed.variant, Variant::A);
        assert_eq!(parsed.source_name, "BT_TCSR41_2210");
    }

    #[test]
    fn test_variant_taken_from_last_field() {
        assert_eq!(parse_file_name("BT_TCCB08_2210_b").unwrap().variant, Variant::B);
        assert_eq!(parse_file_name("BT_TCCB08_2210_c.csv").unwrap().variant, Variant::C);
        assert_eq!(parse_file_name("BT_TCCB08_2210_D").unwrap().variant, Variant::D);
    }

    #[test]
    fn test_trailing_underscore_is_primary() {
        let parsed = parse_file_name("BT_TCBKIT_2310_.csv").unwrap();
        assert_eq!(parsed.variant, Variant::A);
        assert_eq!(parsed.source_name, "BT_TCBKIT_2310_");
    }

    #[test]
    fn test_too_few_fields_is_malformed() {
        let result = parse_file_name("BT_TCSR41.csv");
        assert!(matches!(result, Err(QaqcError::MalformedName { .. })));

        let result = parse_file_name("notes.csv");
        assert!(matches!(result, Err(QaqcError::MalformedName { .. })));
    }

    #[test]
    fn test_unknown_variant_is_malformed() {
        let result = parse_file_name("BT_TCSR41_2210_x.csv");
        match result {
            Err(QaqcError::MalformedName { name, reason }) => {
                assert_eq!(name, "BT_TCSR41_2210_x.csv");
                assert!(reason.contains("'x'"));
            }
            other => panic!("Expected MalformedName, got {:?}", other),
        }

        // "merged" is derived, never a file tag
        assert!(parse_file_name("BT_TCSR41_2210_merged").is_err());
    }

    #[test]
    fn test_empty_site_code_is_malformed() {
        assert!(parse_file_name("BT__2210_a").is_err());
        assert!(parse_file_name("BT_TCSR41__a").is_err());
    }

    #[test]
    fn test_parse_file_path_uses_basename() {
        let parsed = parse_file_path(Path::new("/data/working/BT_TCMERI_2301_b.csv")).unwrap();
        assert_eq!(parsed.key.site_code, "TCMERI");
        assert_eq!(parsed.variant, Variant::B);
    }
}
