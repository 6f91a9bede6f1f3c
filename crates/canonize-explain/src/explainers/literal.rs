//! String literals that differ in spelling only

use std::sync::LazyLock;

use canonize_props::idioms::Site;
use canonize_syntax::visit::find_exprs;
use canonize_syntax::{Expr, Module};
use regex::Regex;

use crate::context::ExplainContext;
use crate::difference::{DifferenceType, PropertyDifference, TransformationHints};

/// Bracketed classes and the backslash shorthands
static CLASS_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?:\\.|[^\]\\])*\]|\\[dDwWsS]").expect("character class pattern is valid")
});

/// Text string literals of every top-level function, as `(site, value)`
fn string_literals(module: &Module) -> Vec<(Site, String)> {
    module
        .functions()
        .flat_map(|def| {
            find_exprs(&def.body, |e| matches!(e, Expr::Str(_)))
                .into_iter()
                .enumerate()
                .filter_map(move |(i, e)| match e {
                    Expr::Str(lit) if !lit.bytes => {
                        Some((Site::new(def.name.clone(), i), lit.value.clone()))
                    }
                    _ => None,
                })
        })
        .collect()
}

/// ASCII characters a class token matches, `None` if it does not compile
fn class_members(token: &str) -> Option<Vec<bool>> {
    let class = Regex::new(&format!("^(?:{token})$")).ok()?;
    Some(
        (0u8..128)
            .map(|b| class.is_match(char::from(b).encode_utf8(&mut [0; 4])))
            .collect(),
    )
}

/// Both patterns use classes at the same places around identical literal
/// text, and each differing pair of classes matches the same characters
fn is_class_variant(ours: &str, theirs: &str) -> bool {
    let classes = |s: &str| -> Vec<String> {
        CLASS_TOKEN
            .find_iter(s)
            .map(|m| m.as_str().to_string())
            .collect()
    };
    let (a, b) = (classes(ours), classes(theirs));
    if a.is_empty() || a.len() != b.len() || a == b {
        return false;
    }
    let same_layout = CLASS_TOKEN.split(ours).eq(CLASS_TOKEN.split(theirs));
    same_layout
        && a.iter().zip(&b).all(|(x, y)| {
            x == y
                || matches!(
                    (class_members(x), class_members(y)),
                    (Some(p), Some(q)) if p == q
                )
        })
}

/// First literal whose value differs between two otherwise aligned modules
pub(super) fn literal_difference(ctx: &ExplainContext<'_>) -> Option<PropertyDifference> {
    let ours = string_literals(ctx.candidate.module);
    let theirs = string_literals(ctx.canon.module);
    if ours.len() != theirs.len() {
        return None;
    }
    let (site, from, to) = ours
        .into_iter()
        .zip(theirs)
        .find_map(|((site, a), (_, b))| (a != b).then_some((site, a, b)))?;

    let (difference_type, explanation) = if is_class_variant(&from, &to) {
        (
            DifferenceType::RegexCharacterClassVariant,
            "patterns spell the same character class differently",
        )
    } else {
        (
            DifferenceType::StringLiteralVariant,
            "candidate and canon spell a string literal differently",
        )
    };
    Some(
        PropertyDifference::new(
            difference_type,
            TransformationHints::LiteralAlignment {
                site,
                from: from.clone(),
                to: to.clone(),
            },
        )
        .with_explanation(explanation)
        .with_details(format!("{from:?}"), format!("{to:?}")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainers::testing::Pair;
    use pretty_assertions::assert_eq;

    #[test]
    fn class_variants() {
        assert!(is_class_variant(r"^[0-9]+$", r"^\d+$"));
        assert!(is_class_variant(r"[a-zA-Z0-9_]+", r"\w+"));
        assert!(!is_class_variant(r"^\d+$", r"^\d*$"));
        assert!(!is_class_variant("abc", "abd"));
    }

    #[test]
    fn different_character_sets_are_not_class_variants() {
        assert!(!is_class_variant("[a-z]", r"\d"));
        assert!(!is_class_variant(r"^[0-9]x$", r"^x\d$"));
        assert!(!is_class_variant("[0-9]", "[0-8]"));
        assert!(is_class_variant("[0-9][a-z]", r"\d[a-z]"));
    }

    #[test]
    fn unrelated_class_literal_is_a_plain_variant() {
        let pair = Pair::new(
            "def f(s):\n    return s.count('[a-z]')\n",
            "def f(s):\n    return s.count('\\\\d')\n",
        );
        let diff = literal_difference(&pair.context()).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::StringLiteralVariant);
    }

    #[test]
    fn regex_class_literal() {
        let pair = Pair::new(
            "def f(s):\n    return re.match(r'^[0-9]+$', s)\n",
            "def f(s):\n    return re.match(r'^\\d+$', s)\n",
        );
        let diff = literal_difference(&pair.context()).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::RegexCharacterClassVariant);
        assert_eq!(
            diff.hints,
            TransformationHints::LiteralAlignment {
                site: Site::new("f", 0),
                from: "^[0-9]+$".to_string(),
                to: r"^\d+$".to_string(),
            }
        );
    }

    #[test]
    fn plain_literal() {
        let pair = Pair::new(
            "def f():\n    return 'hello'\n",
            "def f():\n    return 'hi'\n",
        );
        let diff = literal_difference(&pair.context()).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::StringLiteralVariant);
    }

    #[test]
    fn misaligned_literals_are_not_compared() {
        let pair = Pair::new(
            "def f():\n    return 'a' + 'b'\n",
            "def f():\n    return 'ab'\n",
        );
        assert!(literal_difference(&pair.context()).is_none());
    }
}
