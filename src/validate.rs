//! Plate grammars and OCR confusion repair.
//!
//! A plate is valid when it matches one of the grammars in [`GRAMMARS`]. Text
//! that does not match is uppercased and, when it has the right length, the
//! letters OCR commonly reads in place of digits are swapped back at the
//! positions a grammar requires to be numeric.

use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;

use std::fmt;

pub const PLATE_LEN: usize = 7;

/// Letters mistaken for digits and the digit they stand for.
pub const DIGIT_CONFUSIONS: [(char, char); 6] = [
    ('O', '0'),
    ('I', '1'),
    ('Z', '2'),
    ('S', '5'),
    ('G', '6'),
    ('B', '8'),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateFormat {
    /// `ABC1234`
    Legacy,
    /// `ABC1D23`
    Mercosul,
}

impl fmt::Display for PlateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlateFormat::Legacy => write!(f, "legacy"),
            PlateFormat::Mercosul => write!(f, "mercosul"),
        }
    }
}

pub struct Grammar {
    pub format: PlateFormat,
    pattern: Regex,
    /// 0-indexed positions that must hold a digit
    numeric_positions: &'static [usize],
}

impl Grammar {
    fn new(format: PlateFormat, pattern: &str, numeric_positions: &'static [usize]) -> Self {
        let pattern = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("Failed to compile plate pattern {}: {}", pattern, e));
        Self { format, pattern, numeric_positions }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Swap confusable letters at this grammar's numeric positions.
    /// Returns the repaired text and the number of swaps made.
    fn repair(&self, chars: &[char]) -> (String, usize) {
        let mut swaps = 0;
        let repaired = chars.iter().enumerate().map(|(i, c)| {
            if !self.numeric_positions.contains(&i) {
                return *c;
            }
            match DIGIT_CONFUSIONS.iter().find(|(letter, _)| letter == c) {
                Some((_, digit)) => {
                    swaps += 1;
                    *digit
                }
                None => *c,
            }
        }).collect();
        (repaired, swaps)
    }
}

/// Known plate grammars, in order of preference.
pub static GRAMMARS: Lazy<[Grammar; 2]> = Lazy::new(|| {
    [
        Grammar::new(PlateFormat::Legacy, r"^[A-Z]{3}[0-9]{4}$", &[3, 4, 5, 6]),
        Grammar::new(PlateFormat::Mercosul, r"^[A-Z]{3}[0-9][A-Z][0-9]{2}$", &[3, 5, 6]),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid {
        plate: String,
        format: PlateFormat,
        corrected: bool,
    },
    Invalid,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid { .. })
    }
}

pub fn match_format(text: &str) -> Option<PlateFormat> {
    GRAMMARS.iter().find(|g| g.matches(text)).map(|g| g.format)
}

/// Validate `text`, repairing it when possible.
///
/// Each grammar's repair is applied in turn to the uppercased text, legacy
/// first, and the first repaired string that matches any grammar is kept.
pub fn validate(text: &str) -> Validation {
    if text.is_empty() {
        return Validation::Invalid;
    }
    if let Some(format) = match_format(text) {
        return Validation::Valid { plate: text.to_string(), format, corrected: false };
    }

    let chars: Vec<char> = text.to_uppercase().chars().collect();
    if chars.len() != PLATE_LEN {
        debug!("{:?} cannot be a plate, length {}", text, chars.len());
        return Validation::Invalid;
    }

    for grammar in GRAMMARS.iter() {
        let (candidate, swaps) = grammar.repair(&chars);
        if let Some(format) = match_format(&candidate) {
            debug!("repaired {:?} into {} plate {} with {} {} swaps", text, format, candidate, swaps, grammar.format);
            return Validation::Valid { plate: candidate, format, corrected: true };
        }
    }
    Validation::Invalid
}
