//! ISBN normalization and checksum validation.

/// Strip hyphens and spaces and upper-case a trailing `x`.
///
/// Returns `None` unless what remains is shaped like an ISBN-10 (nine digits
/// plus a digit or `X`) or an ISBN-13 (thirteen digits). The checksum is not
/// checked here.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if !cleaned.is_ascii() {
        return None;
    }

    let shaped = match cleaned.len() {
        10 => {
            cleaned[..9].chars().all(|c| c.is_ascii_digit())
                && cleaned[9..].chars().all(|c| c.is_ascii_digit() || c == 'X')
        }
        13 => cleaned.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    };

    shaped.then_some(cleaned)
}

/// Whether `raw` is a well-formed ISBN-10 or ISBN-13 with a correct check digit.
pub fn is_valid(raw: &str) -> bool {
    let Some(isbn) = normalize(raw) else {
        return false;
    };

    if isbn.len() == 10 {
        let sum: u32 = isbn
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let value = if c == 'X' { 10 } else { c.to_digit(10).unwrap_or(0) };
                value * (10 - i as u32)
            })
            .sum();
        sum % 11 == 0
    } else {
        let sum: u32 = isbn
            .chars()
            .filter_map(|c| c.to_digit(10))
            .enumerate()
            .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
            .sum();
        sum % 10 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_hyphenated_isbn13() {
        assert_eq!(
            normalize("978-0-7432-7356-5").as_deref(),
            Some("9780743273565")
        );
    }

    #[test]
    fn normalizes_lowercase_check_character() {
        assert_eq!(normalize("0-8044-2957-x").as_deref(), Some("080442957X"));
    }

    #[test]
    fn rejects_non_isbn_shapes() {
        assert_eq!(normalize("gatsby"), None);
        assert_eq!(normalize("12345"), None);
        assert_eq!(normalize("97807432735X5"), None);
    }

    #[test]
    fn multibyte_text_is_not_an_isbn() {
        assert_eq!(normalize("12345678é"), None);
        assert_eq!(normalize("123456789é"), None);
        assert!(!is_valid("12345678é"));
    }

    #[test]
    fn validates_checksums() {
        assert!(is_valid("9780743273565"));
        assert!(is_valid("0743273567"));
        assert!(is_valid("080442957X"));
        assert!(!is_valid("9780743273566"));
        assert!(!is_valid("0743273568"));
    }
}
