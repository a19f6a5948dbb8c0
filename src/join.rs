//! The sign-ordered merge join performed inside one reduce group.
//!
//! Within a group every `Sign::Small` record precedes every `Sign::Large` record. The join
//! buffers the SMALL payloads, and each LARGE payload is then paired with every buffered one.
//! A group that does not open with a SMALL record has no reference side and yields nothing.
//! Duplicate SMALL records are not collapsed: each pairs with every LARGE record.

use crate::error::Error;
use crate::tuple::{Sign, SignedKey};

/// Calls `on_match(small, large)` for every SMALL/LARGE pair of the group, in delivery order.
/// Returns the number of matches.
pub fn merge_join<'a, V, F>(group: &'a [(SignedKey, V)], mut on_match: F) -> Result<usize, Error>
where
    F: FnMut(&'a V, &'a V),
{
    match group.first() {
        Some((key, _)) if key.sign == Sign::Small => {}
        _ => return Ok(0),
    }

    let mut buffer = Vec::new();
    let mut probing = false;
    let mut matches = 0;
    for (key, value) in group {
        match key.sign {
            Sign::Small if probing => return Err(out_of_order(key)),
            Sign::Small => buffer.push(value),
            Sign::Large => {
                probing = true;
                for &small in &buffer {
                    on_match(small, value);
                }
                matches += buffer.len();
            }
        }
    }
    Ok(matches)
}

/// The number of matches `merge_join` would report, without visiting payload pairs.
pub fn count_join<V>(group: &[(SignedKey, V)]) -> Result<u64, Error> {
    match group.first() {
        Some((key, _)) if key.sign == Sign::Small => {}
        _ => return Ok(0),
    }

    let mut smalls = 0u64;
    let mut count = 0u64;
    let mut probing = false;
    for (key, _) in group {
        match key.sign {
            Sign::Small if probing => return Err(out_of_order(key)),
            Sign::Small => smalls += 1,
            Sign::Large => {
                probing = true;
                count += smalls;
            }
        }
    }
    Ok(count)
}

fn out_of_order(key: &SignedKey) -> Error { Error::SignOrder { key: key.key.to_string() } }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::PatternTuple;

    fn group(signs: &[(Sign, u64)]) -> Vec<(SignedKey, u64)> {
        let key = PatternTuple::pair(1, 2);
        signs.iter().map(|&(sign, v)| (SignedKey { key, sign }, v)).collect()
    }

    #[test]
    fn pairs_each_large_with_each_small() {
        let group = group(&[(Sign::Small, 1), (Sign::Small, 2), (Sign::Large, 10), (Sign::Large, 20)]);
        let mut pairs = Vec::new();
        let matches = merge_join(&group, |s, l| pairs.push((*s, *l))).unwrap();
        assert_eq!(matches, 4);
        assert_eq!(pairs, vec![(1, 10), (2, 10), (1, 20), (2, 20)]);
        assert_eq!(count_join(&group).unwrap(), 4);
    }

    #[test]
    fn no_reference_side_no_output() {
        let group = group(&[(Sign::Large, 10), (Sign::Large, 20)]);
        assert_eq!(merge_join(&group, |_, _| panic!("no match expected")).unwrap(), 0);
        assert_eq!(count_join(&group).unwrap(), 0);
        assert_eq!(count_join::<u64>(&[]).unwrap(), 0);
    }

    #[test]
    fn reference_without_candidates_is_silent() {
        let group = group(&[(Sign::Small, 1)]);
        assert_eq!(merge_join(&group, |_, _| panic!("no match expected")).unwrap(), 0);
    }

    #[test]
    fn duplicate_references_join_independently() {
        let group = group(&[(Sign::Small, 1), (Sign::Small, 1), (Sign::Large, 10)]);
        let mut pairs = Vec::new();
        merge_join(&group, |s, l| pairs.push((*s, *l))).unwrap();
        assert_eq!(pairs, vec![(1, 10), (1, 10)]);
    }

    #[test]
    fn small_after_large_is_an_error() {
        let group = group(&[(Sign::Small, 1), (Sign::Large, 10), (Sign::Small, 2)]);
        assert!(matches!(merge_join(&group, |_, _| {}), Err(Error::SignOrder { .. })));
        assert!(matches!(count_join(&group), Err(Error::SignOrder { .. })));
    }
}
