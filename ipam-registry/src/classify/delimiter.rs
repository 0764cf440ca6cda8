//! Field separator detection

use super::strip_bom;

/// Candidate field separators, in tie-break preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Semicolon,
    Comma,
    Tab,
}

impl Delimiter {
    /// Preference order used to break count ties
    pub const CANDIDATES: [Delimiter; 3] = [Delimiter::Semicolon, Delimiter::Comma, Delimiter::Tab];

    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Semicolon => ';',
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
        }
    }

    pub fn as_byte(&self) -> u8 {
        self.as_char() as u8
    }
}

/// Infer the field separator from one representative line
///
/// The candidate with the most occurrences wins. Ties go to the earlier
/// candidate (semicolon, then comma, then tab), and a line without any
/// candidate yields semicolon.
pub fn detect_delimiter(line: &str) -> Delimiter {
    let line = strip_bom(line).trim_end_matches(&['\r', '\n'][..]);

    let mut detected = Delimiter::Semicolon;
    let mut max_count = 0usize;
    for candidate in Delimiter::CANDIDATES {
        let count = line.matches(candidate.as_char()).count();
        if count > max_count {
            max_count = count;
            detected = candidate;
        }
    }

    detected
}
