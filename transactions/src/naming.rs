//! Canonical and reduced forms of registered names.
//!
//! A name must already be in canonical form to be accepted: no zero-width
//! characters, no leading or trailing whitespace, and single spaces between
//! words. The reduced form is what uniqueness is checked against: lowercase,
//! with control characters stripped and common look-alike characters folded
//! onto one representative.

const ZERO_WIDTH: [char; 5] = ['\u{200b}', '\u{200c}', '\u{200d}', '\u{2060}', '\u{feff}'];

/// Look-alike folding applied after lowercasing.
const HOMOGLYPHS: &[(char, char)] = &[
    ('0', 'o'),
    ('1', 'l'),
    ('i', 'l'),
    ('|', 'l'),
    ('5', 's'),
    ('\u{0430}', 'a'), // Cyrillic a
    ('\u{0435}', 'e'), // Cyrillic ie
    ('\u{043e}', 'o'), // Cyrillic o
    ('\u{0440}', 'p'), // Cyrillic er
    ('\u{0441}', 'c'), // Cyrillic es
    ('\u{0445}', 'x'), // Cyrillic ha
    ('\u{0443}', 'y'), // Cyrillic u
    ('\u{03bf}', 'o'), // Greek omicron
    ('\u{03b1}', 'a'), // Greek alpha
];

/// Canonical form: zero-width characters removed, whitespace trimmed and collapsed.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for c in input.chars().filter(|c| !ZERO_WIDTH.contains(c)) {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}

pub fn is_normalized(input: &str) -> bool {
    normalize(input) == input
}

/// Reduced form used for uniqueness checks.
pub fn reduce(input: &str) -> String {
    normalize(input)
        .chars()
        .filter(|c| !c.is_control())
        .flat_map(char::to_lowercase)
        .map(|c| {
            HOMOGLYPHS
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect()
}

/// True when the UTF-8 length of `s` lies within `min..=max` bytes.
pub fn utf8_len_within(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  cairn   test\tname "), "cairn test name");
        assert_eq!(normalize("zero\u{200b}width"), "zerowidth");
        assert!(is_normalized("already fine"));
        assert!(!is_normalized(" padded"));
    }

    #[test]
    fn reduce_folds_case_and_lookalikes() {
        assert_eq!(reduce("Cairn"), reduce("cairn"));
        assert_eq!(reduce("B0B"), reduce("bob"));
        assert_eq!(reduce("\u{0441}airn"), "cairn".replace('i', "l"));
        assert_ne!(reduce("alice"), reduce("bob"));
    }

    #[test]
    fn length_is_measured_in_bytes() {
        assert!(utf8_len_within("abc", 3, 3));
        assert!(!utf8_len_within("\u{00e9}", 1, 1));
        assert!(!utf8_len_within("", 1, 10));
    }
}
