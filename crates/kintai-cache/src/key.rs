//! Deterministic cache-key construction.

/// Split a comma-separated parameter, trim each element, drop empties and
/// sort, so `"b, a"` and `"a,b"` normalize identically. Duplicates are kept.
pub fn normalize_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    items.sort();
    items
}

/// Build a key from named list parameters: `name=v1,v2&name2=w1`.
///
/// Parameters are ordered by name and each value is normalized with
/// [`normalize_list`]. Parameters that normalize to nothing are omitted.
pub fn params_key<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut parts: Vec<(String, String)> = params
        .into_iter()
        .map(|(name, raw)| (name.trim().to_string(), normalize_list(raw).join(",")))
        .filter(|(_, joined)| !joined.is_empty())
        .collect();
    parts.sort();
    parts
        .into_iter()
        .map(|(name, joined)| format!("{name}={joined}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_sorts() {
        assert_eq!(
            normalize_list(" 2026-02 ,2025-12,, 2026-01"),
            vec!["2025-12", "2026-01", "2026-02"]
        );
    }

    #[test]
    fn normalize_empty_input() {
        assert!(normalize_list("").is_empty());
        assert!(normalize_list(" , ,").is_empty());
    }

    #[test]
    fn key_ignores_parameter_and_value_order() {
        let a = params_key([("sources", "b,a"), ("keywords", "rust")]);
        let b = params_key([("keywords", "rust"), ("sources", "a,b")]);
        assert_eq!(a, b);
        assert_eq!(a, "keywords=rust&sources=a,b");
    }

    #[test]
    fn key_skips_empty_parameters() {
        assert_eq!(params_key([("months", "2026-02"), ("filters", "")]), "months=2026-02");
    }
}
