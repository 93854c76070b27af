use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Qualifiers in ascending order; the empty string stands for a plain release.
const QUALIFIERS: [&str; 7] = ["alpha", "beta", "milestone", "rc", "snapshot", "", "sp"];
const RELEASE_VERSION_INDEX: &str = "5";

/// A version string with Maven's generic ordering: `1.0-alpha-1 < 1.0-SNAPSHOT < 1.0 == 1.0.0 < 1.0-sp`.
///
/// Numbers compare numerically and are never bounded in size, strings compare by qualifier rank
///  (unknown qualifiers sort after all known ones, lexically among themselves), and trailing
///  'null' items (`0`, `ga`, `final`, `release`) are ignored.
#[derive(Debug, Clone)]
pub struct ComparableVersion {
    value: String,
    items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// decimal digits without leading zeros
    Int(String),
    Str(String),
    List(Vec<Item>),
}

impl ComparableVersion {
    pub fn new(version: &str) -> ComparableVersion {
        ComparableVersion {
            value: version.to_string(),
            items: parse(version),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl Display for ComparableVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl PartialEq for ComparableVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for ComparableVersion {}

impl PartialOrd for ComparableVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComparableVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_lists(&self.items, &other.items)
    }
}

fn parse(version: &str) -> Vec<Item> {
    let version = version.to_lowercase();
    let chars: Vec<char> = version.chars().collect();

    // path of indices from the root list to the list currently being filled
    let mut root: Vec<Item> = Vec::new();
    let mut path: Vec<usize> = Vec::new();

    let mut is_digit = false;
    let mut start = 0;

    for (i, &c) in chars.iter().enumerate() {
        if c == '.' {
            let item = if i == start { Item::Int("0".to_string()) } else { parse_item(is_digit, &chars[start..i]) };
            current(&mut root, &path).push(item);
            start = i + 1;
        }
        else if c == '-' {
            let item = if i == start { Item::Int("0".to_string()) } else { parse_item(is_digit, &chars[start..i]) };
            current(&mut root, &path).push(item);
            start = i + 1;
            open_sublist(&mut root, &mut path);
        }
        else if c.is_ascii_digit() {
            if !is_digit && i > start {
                current(&mut root, &path).push(string_item(&chars[start..i], true));
                start = i;
                open_sublist(&mut root, &mut path);
            }
            is_digit = true;
        }
        else {
            if is_digit && i > start {
                current(&mut root, &path).push(parse_item(true, &chars[start..i]));
                start = i;
                open_sublist(&mut root, &mut path);
            }
            is_digit = false;
        }
    }

    if chars.len() > start {
        current(&mut root, &path).push(parse_item(is_digit, &chars[start..]));
    }

    normalize(&mut root);
    root
}

fn current<'a>(root: &'a mut Vec<Item>, path: &[usize]) -> &'a mut Vec<Item> {
    let mut list = root;
    for &idx in path {
        list = match &mut list[idx] {
            Item::List(inner) => inner,
            _ => unreachable!("version parser path always points at lists"),
        };
    }
    list
}

fn open_sublist(root: &mut Vec<Item>, path: &mut Vec<usize>) {
    let list = current(root, path);
    list.push(Item::List(Vec::new()));
    let idx = list.len() - 1;
    path.push(idx);
}

fn parse_item(is_digit: bool, chars: &[char]) -> Item {
    if is_digit {
        let digits: String = chars.iter().collect();
        let trimmed = digits.trim_start_matches('0');
        Item::Int(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
    }
    else {
        string_item(chars, false)
    }
}

fn string_item(chars: &[char], followed_by_digit: bool) -> Item {
    let value: String = chars.iter().collect();
    let value = if followed_by_digit && value.len() == 1 {
        match value.as_str() {
            "a" => "alpha".to_string(),
            "b" => "beta".to_string(),
            "m" => "milestone".to_string(),
            _ => value,
        }
    }
    else {
        value
    };

    let value = match value.as_str() {
        "ga" | "final" | "release" => String::new(),
        "cr" => "rc".to_string(),
        _ => value,
    };
    Item::Str(value)
}

/// Removes trailing null items, innermost lists first. A non-null nested list does not stop the
///  scan, so `1.0-1` normalizes to `[1, [1]]`.
fn normalize(list: &mut Vec<Item>) {
    for item in list.iter_mut() {
        if let Item::List(inner) = item {
            normalize(inner);
        }
    }

    let mut i = list.len();
    while i > 0 {
        i -= 1;
        if is_null(&list[i]) {
            list.remove(i);
        }
        else if !matches!(list[i], Item::List(_)) {
            break;
        }
    }
}

fn is_null(item: &Item) -> bool {
    match item {
        Item::Int(v) => v == "0",
        Item::Str(v) => comparable_qualifier(v) == RELEASE_VERSION_INDEX,
        Item::List(l) => l.is_empty(),
    }
}

fn comparable_qualifier(qualifier: &str) -> String {
    match QUALIFIERS.iter().position(|q| *q == qualifier) {
        Some(idx) => idx.to_string(),
        None => format!("{}-{}", QUALIFIERS.len(), qualifier),
    }
}

fn compare_ints(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_items(item: &Item, other: Option<&Item>) -> Ordering {
    match (item, other) {
        (Item::Int(v), None) => if v == "0" { Ordering::Equal } else { Ordering::Greater },
        (Item::Int(a), Some(Item::Int(b))) => compare_ints(a, b),
        (Item::Int(_), Some(_)) => Ordering::Greater,

        (Item::Str(v), None) => comparable_qualifier(v).as_str().cmp(RELEASE_VERSION_INDEX),
        (Item::Str(_), Some(Item::Int(_))) => Ordering::Less,
        (Item::Str(a), Some(Item::Str(b))) => comparable_qualifier(a).cmp(&comparable_qualifier(b)),
        (Item::Str(_), Some(Item::List(_))) => Ordering::Less,

        (Item::List(l), None) => match l.first() {
            None => Ordering::Equal,
            Some(first) => compare_items(first, None),
        },
        (Item::List(_), Some(Item::Int(_))) => Ordering::Less,
        (Item::List(_), Some(Item::Str(_))) => Ordering::Greater,
        (Item::List(a), Some(Item::List(b))) => compare_lists(a, b),
    }
}

fn compare_lists(left: &[Item], right: &[Item]) -> Ordering {
    let len = left.len().max(right.len());
    for i in 0..len {
        let result = match (left.get(i), right.get(i)) {
            (None, None) => Ordering::Equal,
            (None, Some(r)) => compare_items(r, None).reverse(),
            (Some(l), r) => compare_items(l, r),
        };
        if result != Ordering::Equal {
            return result;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[rstest]
    #[case::alpha_beta("1-alpha", "1-beta")]
    #[case::beta_milestone("1-beta", "1-milestone")]
    #[case::milestone_rc("1-milestone", "1-rc")]
    #[case::rc_snapshot("1-rc", "1-SNAPSHOT")]
    #[case::snapshot_release("1.0-SNAPSHOT", "1.0")]
    #[case::release_sp("1", "1-sp")]
    #[case::sp_unknown_qualifier("1-sp", "1-foo")]
    #[case::numeric_not_lexical("1.2", "1.10")]
    #[case::longer_is_newer("2.0", "2.0.1")]
    #[case::alpha_number("1.0-alpha-1", "1.0-alpha-2")]
    #[case::big_numbers("1.99999999999999999999", "1.100000000000000000000")]
    #[case::short_qualifier("1a1", "1b1")]
    #[case::pre_release_before_release("1.0-alpha-1", "1.0")]
    fn test_ordering(#[case] lower: &str, #[case] higher: &str) {
        let lower = ComparableVersion::new(lower);
        let higher = ComparableVersion::new(higher);
        assert!(lower < higher, "{} < {}", lower, higher);
        assert!(higher > lower, "{} > {}", higher, lower);
    }

    #[rstest]
    #[case("1", "1.0")]
    #[case("1", "1.0.0")]
    #[case("1", "1-ga")]
    #[case("1", "1-final")]
    #[case("1.0-cr1", "1.0-rc1")]
    #[case("1a1", "1-alpha-1")]
    #[case("1.0-SNAPSHOT", "1-snapshot")]
    fn test_equality(#[case] a: &str, #[case] b: &str) {
        assert_eq!(ComparableVersion::new(a), ComparableVersion::new(b));
    }

    #[test]
    fn test_keeps_original_text() {
        assert_eq!(ComparableVersion::new("1.0-SNAPSHOT").to_string(), "1.0-SNAPSHOT");
    }
}
