//! Case-insensitive handling of datasource and table names

use std::collections::BTreeMap;

/// Sort ascending ignoring ASCII case, dropping case-insensitive duplicates.
///
/// The first spelling seen for a name wins.
pub fn normalize<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for name in names {
        seen.entry(name.to_ascii_lowercase()).or_insert(name);
    }
    seen.into_values().collect()
}

/// Split candidates into those present in `available` and those not.
///
/// Kept names take the spelling used in `available`; the returned list is
/// normalized.
pub fn restrict<I>(available: &[String], candidates: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for candidate in candidates {
        match available
            .iter()
            .find(|name| name.eq_ignore_ascii_case(&candidate))
        {
            Some(name) => kept.push(name.clone()),
            None => dropped.push(candidate),
        }
    }
    (normalize(kept), normalize(dropped))
}

/// Names present in every list
pub fn intersect(lists: &[Vec<String>]) -> Vec<String> {
    let Some((first, rest)) = lists.split_first() else {
        return Vec::new();
    };
    let common = first.iter().filter(|name| {
        rest.iter()
            .all(|other| other.iter().any(|o| o.eq_ignore_ascii_case(name)))
    });
    normalize(common.cloned())
}

/// Trailing decimal index of a name (`t_order_12` -> 12)
pub fn suffix_index(name: &str) -> Option<u64> {
    let digits = name
        .bytes()
        .rev()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    name[name.len() - digits..].parse().ok()
}
