//! Locale-style string collation for sorting.
//!
//! [`Collator`] compares strings in three levels, the way locale-aware collators do:
//!
//! 1. **primary** - base letters, ignoring case and accents. Punctuation and spaces
//!    come before digits, digits before letters. With `numeric` enabled, runs of ASCII
//!    digits compare by their numeric value (`"2" < "10"`).
//! 2. **accent** - unaccented before accented letters.
//! 3. **case** - lower case first by default, upper case first with [`CaseFirst::Upper`].
//!
//! [`Sensitivity`] selects which of levels 2 and 3 are consulted. When a level is not
//! consulted, strings that differ only there compare equal, which lets a stable sort
//! keep their input order or fall through to the next sort key.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Which differences between strings are significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Only base letters differ: `a = A = á`.
    Base,
    /// Base letters and accents: `a = A`, `a != á`.
    Accent,
    /// Base letters and case: `a != A`, `a = á`.
    Case,
    /// Every difference counts.
    #[default]
    Variant,
}

impl Sensitivity {
    /// Returns the wire name of this sensitivity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::Base => "base",
            Sensitivity::Accent => "accent",
            Sensitivity::Case => "case",
            Sensitivity::Variant => "variant",
        }
    }

    /// Parses a wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "base" => Some(Sensitivity::Base),
            "accent" => Some(Sensitivity::Accent),
            "case" => Some(Sensitivity::Case),
            "variant" => Some(Sensitivity::Variant),
            _ => None,
        }
    }

    fn accents(&self) -> bool {
        matches!(self, Sensitivity::Accent | Sensitivity::Variant)
    }

    fn case(&self) -> bool {
        matches!(self, Sensitivity::Case | Sensitivity::Variant)
    }
}

/// Which case variant sorts first when strings differ only by case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseFirst {
    /// `aab < aaB < Aab`.
    #[default]
    Lower,
    /// `AAB < AAb < aAB`.
    Upper,
}

impl CaseFirst {
    /// Returns the wire name of this case ordering.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseFirst::Lower => "lower",
            CaseFirst::Upper => "upper",
        }
    }

    /// Parses a wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "lower" => Some(CaseFirst::Lower),
            "upper" => Some(CaseFirst::Upper),
            _ => None,
        }
    }
}

/// A configurable string comparator.
///
/// # Example
///
/// ```ignore
/// use docquery_core::collation::Collator;
///
/// let natural = Collator::new().numeric(true);
/// assert!(natural.compare("file2", "file10").is_lt());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Collator {
    numeric: bool,
    sensitivity: Sensitivity,
    case_first: CaseFirst,
}

#[derive(Debug, Clone, Copy)]
enum Element<'a> {
    Digits(&'a str),
    Char(char),
}

impl Collator {
    /// Creates a collator with variant sensitivity, lower case first, and no numeric ordering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables numeric ordering of digit runs.
    pub fn numeric(mut self, numeric: bool) -> Self {
        self.numeric = numeric;
        self
    }

    /// Sets which differences are significant.
    pub fn sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Sets which case variant sorts first.
    pub fn case_first(mut self, case_first: CaseFirst) -> Self {
        self.case_first = case_first;
        self
    }

    /// Compares two strings.
    pub fn compare(&self, left: &str, right: &str) -> Ordering {
        let left = self.elements(left);
        let right = self.elements(right);

        let primary = compare_primary(&left, &right);
        if primary != Ordering::Equal {
            return primary;
        }

        if self.sensitivity.accents() {
            let accents = left
                .iter()
                .map(|element| accent_weight(*element))
                .cmp(right.iter().map(|element| accent_weight(*element)));
            if accents != Ordering::Equal {
                return accents;
            }
        }

        if self.sensitivity.case() {
            return left
                .iter()
                .map(|element| self.case_weight(*element))
                .cmp(right.iter().map(|element| self.case_weight(*element)));
        }

        Ordering::Equal
    }

    fn elements<'a>(&self, value: &'a str) -> Vec<Element<'a>> {
        let mut elements = Vec::with_capacity(value.len());
        let mut chars = value.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            if self.numeric && c.is_ascii_digit() {
                let mut end = start + c.len_utf8();
                while let Some((index, next)) = chars.peek().copied() {
                    if !next.is_ascii_digit() {
                        break;
                    }
                    end = index + next.len_utf8();
                    chars.next();
                }
                elements.push(Element::Digits(&value[start..end]));
            } else {
                elements.push(Element::Char(c));
            }
        }

        elements
    }

    fn case_weight(&self, element: Element<'_>) -> u8 {
        let Element::Char(c) = element else {
            return 0;
        };

        match (self.case_first, c.is_uppercase(), c.is_lowercase()) {
            (CaseFirst::Lower, true, _) | (CaseFirst::Upper, _, true) => 1,
            _ => 0,
        }
    }
}

fn compare_primary(left: &[Element<'_>], right: &[Element<'_>]) -> Ordering {
    for (a, b) in left.iter().zip(right.iter()) {
        let ordering = match (a, b) {
            (Element::Digits(a), Element::Digits(b)) => compare_digits(a, b),
            _ => primary_weight(*a).cmp(&primary_weight(*b)),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    left.len().cmp(&right.len())
}

fn compare_digits(left: &str, right: &str) -> Ordering {
    let left = left.trim_start_matches('0');
    let right = right.trim_start_matches('0');

    left.len()
        .cmp(&right.len())
        .then_with(|| left.cmp(right))
}

fn primary_weight(element: Element<'_>) -> (u8, char) {
    match element {
        Element::Digits(_) => (1, '0'),
        Element::Char(c) => {
            let base = base_letter(fold_case(c));
            let class = if !c.is_alphanumeric() {
                0
            } else if c.is_numeric() {
                1
            } else {
                2
            };
            (class, base)
        }
    }
}

fn accent_weight(element: Element<'_>) -> bool {
    match element {
        Element::Digits(_) => false,
        Element::Char(c) => {
            let folded = fold_case(c);
            base_letter(folded) != folded
        }
    }
}

fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Strips the diacritic from a lower-case Latin letter.
fn base_letter(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ĥ' | 'ħ' => 'h',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' | 'ŧ' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}
