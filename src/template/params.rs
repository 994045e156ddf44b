//! Parameters some element kinds take from their template labels.

use std::str::FromStr;

use serde::Serialize;

use crate::template::kind::{CaseSymbol, ReferenceId, ReferenceTarget};
use crate::type_code::TypeCode;

/// Parse an integer written in decimal, `0x` hex or `$` hex, with an optional sign.
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .or_else(|| digits.strip_prefix('$'))
    {
        u64::from_str_radix(hex, 16).ok()?
    } else {
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u64>().ok()?
    };

    if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        // Hex constants fill the whole 64 bits.
        Some(magnitude as i64)
    }
}

/// `Name=Value`, splitting at the last `=`.
pub fn parse_case(label: &str) -> Result<CaseSymbol, String> {
    let (name, value) = label
        .rsplit_once('=')
        .ok_or_else(|| "expected `Name=Value`".to_string())?;
    let value = parse_int(value).ok_or_else(|| format!("`{}` is not an integer", value.trim()))?;
    Ok(CaseSymbol {
        name: name.trim().to_string(),
        value,
    })
}

/// The repetition count of a static counter: `Name=N`, or a label ending in an integer.
pub fn parse_static_count(label: &str) -> Result<(String, usize), String> {
    let (name, count) = match label.rsplit_once('=') {
        Some((name, count)) => (name.trim(), count.trim()),
        None => match label.trim_end().rsplit_once(char::is_whitespace) {
            Some((name, count)) => (name.trim(), count),
            None => ("", label.trim()),
        },
    };

    let count = parse_int(count)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| "expected a repetition count (`Name=N`)".to_string())?;

    let name = if name.is_empty() { label.trim() } else { name };
    Ok((name.to_string(), count))
}

/// `[Name=]'TYPE' ID`, where `ID` is an integer, `id`, `id+N` or `id-N`.
pub fn parse_reference(label: &str) -> Result<(String, ReferenceTarget), String> {
    const SYNTAX: &str = "expected `[Name=]'TYPE' ID`";

    let open = label.find('\'').ok_or_else(|| SYNTAX.to_string())?;
    let name = label[..open].trim();
    let name = name.strip_suffix('=').unwrap_or(name).trim();

    let quoted = &label[open + 1..];
    let close = quoted.find('\'').ok_or_else(|| SYNTAX.to_string())?;
    let record_type = TypeCode::from_str(&quoted[..close]).map_err(|e| e.to_string())?;

    let id = quoted[close + 1..].trim();
    let id = if let Some(delta) = id.strip_prefix("id") {
        let delta = delta.trim();
        if delta.is_empty() {
            ReferenceId::Relative(0)
        } else if delta.starts_with('+') || delta.starts_with('-') {
            let compact: String = delta.chars().filter(|c| !c.is_whitespace()).collect();
            ReferenceId::Relative(
                parse_int(&compact).ok_or_else(|| format!("bad id offset `{delta}`"))?,
            )
        } else {
            return Err(format!("bad id offset `{delta}`"));
        }
    } else {
        ReferenceId::Fixed(parse_int(id).ok_or_else(|| format!("bad record id `{id}`"))?)
    };

    let name = if name.is_empty() {
        label.trim().to_string()
    } else {
        name.to_string()
    };

    Ok((name, ReferenceTarget { record_type, id }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectorItem {
    Value(i64),
    Range(i64, i64),
    Default,
}

/// The keys a keyed section applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct KeySelector {
    items: Vec<SelectorItem>,
}

impl KeySelector {
    pub fn new(items: Vec<SelectorItem>) -> Self {
        KeySelector { items }
    }

    pub fn value(key: i64) -> Self {
        KeySelector::new(vec![SelectorItem::Value(key)])
    }

    /// Parse a `KEYB` label: comma-separated integers, `lo..hi` ranges, names of the keyed
    /// element's cases, or `default`/`*`.
    pub fn parse(label: &str, cases: &[CaseSymbol]) -> Result<Self, String> {
        let mut items = Vec::new();

        for part in label.split(',').map(str::trim) {
            if part.is_empty() {
                continue;
            }
            if part == "*" || part.eq_ignore_ascii_case("default") {
                items.push(SelectorItem::Default);
            } else if let Some((lo, hi)) = part.split_once("..") {
                let lo = resolve_key(lo, cases)?;
                let hi = resolve_key(hi, cases)?;
                items.push(SelectorItem::Range(lo.min(hi), lo.max(hi)));
            } else {
                items.push(SelectorItem::Value(resolve_key(part, cases)?));
            }
        }

        if items.is_empty() {
            return Err("section selector is empty".to_string());
        }
        Ok(KeySelector { items })
    }

    pub fn items(&self) -> &[SelectorItem] {
        &self.items
    }

    pub fn matches(&self, key: i64) -> bool {
        self.items.iter().any(|item| match *item {
            SelectorItem::Value(v) => v == key,
            SelectorItem::Range(lo, hi) => (lo..=hi).contains(&key),
            SelectorItem::Default => false,
        })
    }

    pub fn is_default(&self) -> bool {
        self.items.contains(&SelectorItem::Default)
    }

    /// A key that selects this section, used when a section is picked without one.
    pub fn representative_key(&self) -> Option<i64> {
        self.items.iter().find_map(|item| match *item {
            SelectorItem::Value(v) => Some(v),
            SelectorItem::Range(lo, _) => Some(lo),
            SelectorItem::Default => None,
        })
    }
}

fn resolve_key(token: &str, cases: &[CaseSymbol]) -> Result<i64, String> {
    let token = token.trim();
    if let Some(case) = cases.iter().find(|c| c.name == token) {
        return Ok(case.value);
    }
    parse_int(token).ok_or_else(|| format!("`{token}` is neither an integer nor a case name"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_variants() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int(" -7 "), Some(-7));
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("$ff"), Some(255));
        assert_eq!(parse_int("-0x10"), Some(-16));
        assert_eq!(parse_int("0xFFFFFFFFFFFFFFFF"), Some(-1));
        assert_eq!(parse_int("12a"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn test_parse_case() {
        assert_eq!(
            parse_case("Circle = 1").unwrap(),
            CaseSymbol {
                name: "Circle".to_string(),
                value: 1
            }
        );
        assert!(parse_case("Circle").is_err());
        assert!(parse_case("Circle=one").is_err());
    }

    #[test]
    fn test_parse_static_count() {
        assert_eq!(
            parse_static_count("Items=3").unwrap(),
            ("Items".to_string(), 3)
        );
        assert_eq!(
            parse_static_count("Four corners 4").unwrap(),
            ("Four corners".to_string(), 4)
        );
        assert_eq!(parse_static_count("5").unwrap(), ("5".to_string(), 5));
        assert!(parse_static_count("Items").is_err());
        assert!(parse_static_count("Items=-1").is_err());
    }

    #[test]
    fn test_parse_reference() {
        let (name, target) = parse_reference("Icon='ICN#' 128").unwrap();
        assert_eq!(name, "Icon");
        assert_eq!(target.record_type, TypeCode::new(*b"ICN#"));
        assert_eq!(target.id, ReferenceId::Fixed(128));

        let (name, target) = parse_reference("'PNT ' id+2").unwrap();
        assert_eq!(name, "'PNT ' id+2");
        assert_eq!(target.record_type, TypeCode::new(*b"PNT "));
        assert_eq!(target.id.resolve(100), 102);

        let (_, target) = parse_reference("Next='STR#' id - 1").unwrap();
        assert_eq!(target.id, ReferenceId::Relative(-1));
        assert_eq!(
            parse_reference("'STR#' id").unwrap().1.id,
            ReferenceId::Relative(0)
        );

        assert!(parse_reference("Icon 128").is_err());
        assert!(parse_reference("'ICN#' idx").is_err());
    }

    #[test]
    fn test_selector() {
        let cases = vec![
            CaseSymbol {
                name: "Circle".to_string(),
                value: 1,
            },
            CaseSymbol {
                name: "Square".to_string(),
                value: 2,
            },
        ];

        let sel = KeySelector::parse("Circle, 5..3, 0x10", &cases).unwrap();
        assert!(sel.matches(1));
        assert!(sel.matches(4));
        assert!(sel.matches(16));
        assert!(!sel.matches(2));
        assert_eq!(sel.representative_key(), Some(1));

        let sel = KeySelector::parse("default", &cases).unwrap();
        assert!(sel.is_default());
        assert!(!sel.matches(1));

        assert!(KeySelector::parse("Triangle", &cases).is_err());
        assert!(KeySelector::parse(" , ", &cases).is_err());
    }
}
