//! Comparators over bookmark nodes.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::bookmarks::BookmarkNode;
use crate::options::{CompareBy, SortOrder};
use crate::url_factor::UrlFactors;

impl SortOrder {
    /// Apply the direction to an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Locale-style text comparison.
///
/// Letters compare by base letter first, ignoring accents and case
/// (`école` < `zebra`). Ties are broken by accents, unaccented first
/// (`resume` < `résumé`), then by case at the first position that differs
/// only by case, lowercase first (`apple` < `Apple` < `banana`).
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| accented_letters(a).cmp(accented_letters(b)))
        .then_with(|| case_order(a, b))
}

/// Decomposed, lowercased letters with accents removed.
fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().filter(|c| !is_combining_mark(*c)).flat_map(char::to_lowercase)
}

/// Decomposed, lowercased letters with accents kept.
fn accented_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}

fn case_order(a: &str, b: &str) -> Ordering {
    for (ca, cb) in a.nfd().zip(b.nfd()) {
        if ca != cb {
            return match (ca.is_lowercase(), cb.is_lowercase()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => ca.cmp(&cb),
            };
        }
    }
    a.nfd().count().cmp(&b.nfd().count()).then_with(|| a.cmp(b))
}

pub fn compare_by_title(a: &BookmarkNode, b: &BookmarkNode, order: SortOrder) -> Ordering {
    order.apply(locale_compare(&a.title, &b.title))
}

pub fn compare_by_url(a: &BookmarkNode, b: &BookmarkNode, order: SortOrder) -> Ordering {
    let a_url = a.url.as_deref().unwrap_or("");
    let b_url = b.url.as_deref().unwrap_or("");
    order.apply(locale_compare(a_url, b_url))
}

/// Service comparison of two nodes. Extracts the factors on every call; the
/// engine precomputes them and uses [`compare_factors`] instead.
pub fn compare_by_service(a: &BookmarkNode, b: &BookmarkNode, order: SortOrder) -> Ordering {
    let af = UrlFactors::extract(a.url.as_deref());
    let bf = UrlFactors::extract(b.url.as_deref());
    compare_factors(af.as_ref(), bf.as_ref(), order)
}

/// Compare factor tuples field by field.
///
/// Unparsable URLs (`None`) always sort after parsable ones, in both
/// directions; the direction only applies between two parsable URLs.
pub fn compare_factors(a: Option<&UrlFactors>, b: Option<&UrlFactors>, order: SortOrder) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(af), Some(bf)) => {
            let ordering = locale_compare(&af.protocol, &bf.protocol)
                .then_with(|| locale_compare(&af.domain, &bf.domain))
                .then_with(|| locale_compare(&af.subdomain_reversed, &bf.subdomain_reversed))
                .then_with(|| af.port.cmp(&bf.port))
                .then_with(|| locale_compare(&af.tail, &bf.tail));
            order.apply(ordering)
        }
    }
}

/// Comparator for leaves selected by `compare_by`.
pub fn comparator_for(compare_by: CompareBy) -> fn(&BookmarkNode, &BookmarkNode, SortOrder) -> Ordering {
    match compare_by {
        CompareBy::Title => compare_by_title,
        CompareBy::Url => compare_by_url,
        CompareBy::UrlSimple => compare_by_service,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf(title: &str, url: &str) -> BookmarkNode {
        BookmarkNode::bookmark(title, title, url)
    }

    #[test]
    fn test_locale_compare_case() {
        assert_eq!(locale_compare("apple", "Apple"), Ordering::Less);
        assert_eq!(locale_compare("Apple", "banana"), Ordering::Less);
        assert_eq!(locale_compare("cherry", "Banana"), Ordering::Greater);
        assert_eq!(locale_compare("same", "same"), Ordering::Equal);
        assert_eq!(locale_compare("abc", "abcd"), Ordering::Less);
    }

    #[test]
    fn test_locale_compare_accents() {
        assert_eq!(locale_compare("école", "zebra"), Ordering::Less);
        assert_eq!(locale_compare("Émile", "Frank"), Ordering::Less);
        assert_eq!(locale_compare("Ångström", "Bohr"), Ordering::Less);
        assert_eq!(locale_compare("resume", "résumé"), Ordering::Less);
        assert_eq!(locale_compare("résumé", "resumes"), Ordering::Less);
        assert_eq!(locale_compare("élan", "Élan"), Ordering::Less);
        // Composed and decomposed forms sort together.
        assert_eq!(locale_compare("caf\u{e9}", "cafe\u{301}"), locale_compare("cafe\u{301}", "caf\u{e9}").reverse());
        assert_eq!(locale_compare("caf\u{e9}", "cafz"), Ordering::Less);
    }

    #[test]
    fn test_title_sort_with_accents() {
        let mut nodes = vec![leaf("zebra", ""), leaf("Émile", ""), leaf("école", ""), leaf("Frank", "")];
        nodes.sort_by(|a, b| compare_by_title(a, b, SortOrder::Asc));
        let titles: Vec<_> = nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["école", "Émile", "Frank", "zebra"]);
    }

    #[test]
    fn test_title_desc_locale_aware() {
        let mut nodes = vec![leaf("Banana", ""), leaf("Apple", ""), leaf("cherry", "")];
        nodes.sort_by(|a, b| compare_by_title(a, b, SortOrder::Desc));
        let titles: Vec<_> = nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["cherry", "Banana", "Apple"]);
    }

    #[test]
    fn test_url_missing_treated_as_empty() {
        let folder = BookmarkNode::folder("f", "Folder", vec![]);
        let a = leaf("a", "https://a.com/");
        assert_eq!(compare_by_url(&folder, &a, SortOrder::Asc), Ordering::Less);
        assert_eq!(compare_by_url(&folder, &a, SortOrder::Desc), Ordering::Greater);
    }

    #[test]
    fn test_service_example_order() {
        let mut nodes = vec![
            leaf("x", "https://a.example.com/x"),
            leaf("y", "http://b.example.com/y"),
            leaf("z", "https://example.com/z"),
        ];
        nodes.sort_by(|a, b| compare_by_service(a, b, SortOrder::Asc));
        let titles: Vec<_> = nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["z", "x", "y"]);
    }

    #[test]
    fn test_service_groups_http_and_https() {
        let a = leaf("a", "http://example.com/page");
        let b = leaf("b", "https://example.com/page");
        assert_eq!(compare_by_service(&a, &b, SortOrder::Asc), Ordering::Equal);
    }

    #[test]
    fn test_service_port_numeric() {
        let a = leaf("a", "https://example.com:9000/");
        let b = leaf("b", "https://example.com:10000/");
        assert_eq!(compare_by_service(&a, &b, SortOrder::Asc), Ordering::Less);
    }

    #[test]
    fn test_service_unparsable_trails_in_both_directions() {
        let good = leaf("good", "https://example.com/");
        let bad = leaf("bad", "not a url");
        let worse = leaf("worse", "");

        for order in [SortOrder::Asc, SortOrder::Desc] {
            assert_eq!(compare_by_service(&good, &bad, order), Ordering::Less);
            assert_eq!(compare_by_service(&bad, &good, order), Ordering::Greater);
            assert_eq!(compare_by_service(&bad, &worse, order), Ordering::Equal);
        }
    }

    #[test]
    fn test_comparator_for() {
        let a = leaf("zzz", "https://a.com/");
        let b = leaf("aaa", "https://b.com/");
        assert_eq!(comparator_for(CompareBy::Title)(&a, &b, SortOrder::Asc), Ordering::Greater);
        assert_eq!(comparator_for(CompareBy::Url)(&a, &b, SortOrder::Asc), Ordering::Less);
        assert_eq!(comparator_for(CompareBy::UrlSimple)(&a, &b, SortOrder::Asc), Ordering::Less);
    }

    proptest! {
        #[test]
        fn prop_locale_compare_antisymmetric(a in "[a-zA-Zéèàü ]{0,8}", b in "[a-zA-ZÉéèàü ]{0,8}") {
            prop_assert_eq!(locale_compare(&a, &b), locale_compare(&b, &a).reverse());
        }

        #[test]
        fn prop_desc_reverses_title(a in "[a-zA-Z]{1,8}", b in "[a-zA-Z]{1,8}") {
            let na = leaf(&a, "");
            let nb = leaf(&b, "");
            prop_assert_eq!(
                compare_by_title(&na, &nb, SortOrder::Desc),
                compare_by_title(&na, &nb, SortOrder::Asc).reverse()
            );
        }

        #[test]
        fn prop_service_antisymmetric(
            sub_a in "[a-z]{0,4}",
            sub_b in "[a-z]{0,4}",
            path_a in "[a-z/]{0,6}",
            path_b in "[a-z/]{0,6}",
            desc in any::<bool>(),
        ) {
            let host = |sub: &str| if sub.is_empty() { "example.com".to_string() } else { format!("{}.example.com", sub) };
            let a = leaf("a", &format!("https://{}/{}", host(&sub_a), path_a));
            let b = leaf("b", &format!("https://{}/{}", host(&sub_b), path_b));
            let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
            prop_assert_eq!(compare_by_service(&a, &b, order), compare_by_service(&b, &a, order).reverse());
        }
    }
}
