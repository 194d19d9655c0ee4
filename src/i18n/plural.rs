//! Plural category selection.
//!
//! Covers the rule families needed by the registry's languages. Languages not
//! listed fall back to the English-style one/other split.

use crate::i18n::Language;

/// CLDR plural category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub const ALL: [PluralCategory; 6] = [
        PluralCategory::Zero,
        PluralCategory::One,
        PluralCategory::Two,
        PluralCategory::Few,
        PluralCategory::Many,
        PluralCategory::Other,
    ];

    /// Key used for this category in a bundle node.
    pub fn key(&self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }

    pub fn from_key(key: &str) -> Option<PluralCategory> {
        PluralCategory::ALL.into_iter().find(|c| c.key() == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleFamily {
    /// one for 1, other otherwise
    OneOther,
    /// one for 0 and 1
    ZeroOneAsOne,
    /// No plural distinction
    NoPlural,
    Arabic,
    Slavic,
    Czech,
    Polish,
}

fn family(language: Language) -> RuleFamily {
    match language.code() {
        "fr" | "pt" | "hi" | "bn" | "am" | "fa" => RuleFamily::ZeroOneAsOne,
        "zh" | "ja" | "ko" | "vi" | "th" | "id" | "ms" | "yo" => RuleFamily::NoPlural,
        "ar" => RuleFamily::Arabic,
        "ru" | "hr" | "sr" => RuleFamily::Slavic,
        "cs" | "sk" => RuleFamily::Czech,
        "pl" => RuleFamily::Polish,
        _ => RuleFamily::OneOther,
    }
}

/// Category for an integer count in `language`.
pub fn category(language: Language, count: i64) -> PluralCategory {
    let n = count.unsigned_abs();
    let mod10 = n % 10;
    let mod100 = n % 100;

    match family(language) {
        RuleFamily::OneOther => {
            if n == 1 {
                PluralCategory::One
            } else {
                PluralCategory::Other
            }
        }
        RuleFamily::ZeroOneAsOne => {
            if n <= 1 {
                PluralCategory::One
            } else {
                PluralCategory::Other
            }
        }
        RuleFamily::NoPlural => PluralCategory::Other,
        RuleFamily::Arabic => match n {
            0 => PluralCategory::Zero,
            1 => PluralCategory::One,
            2 => PluralCategory::Two,
            _ if (3..=10).contains(&mod100) => PluralCategory::Few,
            _ if (11..=99).contains(&mod100) => PluralCategory::Many,
            _ => PluralCategory::Other,
        },
        RuleFamily::Slavic => {
            if mod10 == 1 && mod100 != 11 {
                PluralCategory::One
            } else if (2..=4).contains(&mod10) && !(12..=14).contains(&mod100) {
                PluralCategory::Few
            } else {
                PluralCategory::Many
            }
        }
        RuleFamily::Czech => match n {
            1 => PluralCategory::One,
            2..=4 => PluralCategory::Few,
            _ => PluralCategory::Other,
        },
        RuleFamily::Polish => {
            if n == 1 {
                PluralCategory::One
            } else if (2..=4).contains(&mod10) && !(12..=14).contains(&mod100) {
                PluralCategory::Few
            } else {
                PluralCategory::Many
            }
        }
    }
}

/// True when `key` names a plural category.
pub fn is_category_key(key: &str) -> bool {
    PluralCategory::from_key(key).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str) -> Language {
        Language::from_code(code).unwrap()
    }

    #[test]
    fn test_english_one_other() {
        assert_eq!(category(Language::ENGLISH, 1), PluralCategory::One);
        assert_eq!(category(Language::ENGLISH, 0), PluralCategory::Other);
        assert_eq!(category(Language::ENGLISH, 2), PluralCategory::Other);
        assert_eq!(category(Language::ENGLISH, -1), PluralCategory::One);
    }

    #[test]
    fn test_french_zero_is_singular() {
        assert_eq!(category(Language::FRENCH, 0), PluralCategory::One);
        assert_eq!(category(Language::FRENCH, 1), PluralCategory::One);
        assert_eq!(category(Language::FRENCH, 2), PluralCategory::Other);
    }

    #[test]
    fn test_arabic_categories() {
        let cases = [
            (0, PluralCategory::Zero),
            (1, PluralCategory::One),
            (2, PluralCategory::Two),
            (5, PluralCategory::Few),
            (103, PluralCategory::Few),
            (11, PluralCategory::Many),
            (99, PluralCategory::Many),
            (100, PluralCategory::Other),
        ];
        for (n, expected) in cases {
            assert_eq!(category(Language::ARABIC, n), expected, "n = {}", n);
        }
    }

    #[test]
    fn test_russian_categories() {
        let ru = lang("ru");
        assert_eq!(category(ru, 1), PluralCategory::One);
        assert_eq!(category(ru, 21), PluralCategory::One);
        assert_eq!(category(ru, 11), PluralCategory::Many);
        assert_eq!(category(ru, 3), PluralCategory::Few);
        assert_eq!(category(ru, 13), PluralCategory::Many);
        assert_eq!(category(ru, 5), PluralCategory::Many);
    }

    #[test]
    fn test_polish_and_czech() {
        assert_eq!(category(lang("pl"), 22), PluralCategory::Few);
        assert_eq!(category(lang("pl"), 21), PluralCategory::Many);
        assert_eq!(category(lang("cs"), 3), PluralCategory::Few);
        assert_eq!(category(lang("cs"), 5), PluralCategory::Other);
    }

    #[test]
    fn test_east_asian_has_no_plural() {
        for n in [0, 1, 2, 100] {
            assert_eq!(category(lang("ja"), n), PluralCategory::Other);
        }
    }

    #[test]
    fn test_category_keys() {
        assert_eq!(PluralCategory::from_key("few"), Some(PluralCategory::Few));
        assert!(is_category_key("other"));
        assert!(!is_category_key("title"));
    }
}
