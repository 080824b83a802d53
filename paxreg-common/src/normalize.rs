//! Identity field normalization
//!
//! Pure functions that canonicalize free-text identity fields so that
//! cosmetic variants (script, case, spacing) compare equal. None of them can
//! fail: every input maps to a normalized string, possibly empty.

/// Sentinel written by upstream sources for "field not collected"
pub const PLACEHOLDER: &str = "not presented";

/// True if `value` is the placeholder sentinel (any casing, surrounding space ignored)
pub fn is_placeholder(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(PLACEHOLDER)
}

/// Normalize a personal name
///
/// Cyrillic letters are transliterated to Latin, the result is upper-cased
/// and whitespace runs collapse to a single space. Empty and placeholder
/// input yields `""`.
pub fn normalize_name(name: &str) -> String {
    if name.trim().is_empty() || is_placeholder(name) {
        return String::new();
    }

    let transliterated = transliterate(name);
    transliterated
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Normalize a document-style identifier (passport, ticket, loyalty number, PNR)
///
/// All whitespace is removed and the result is upper-cased. Empty and
/// placeholder input yields `""`.
pub fn normalize_document(doc: &str) -> String {
    if doc.trim().is_empty() || is_placeholder(doc) {
        return String::new();
    }

    doc.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Normalize a loyalty/membership number
///
/// Normalized as a document, then a leading program code is dropped when
/// the rest is numeric: `"SU 777"`, `"su777"`, `"SU-777"` and `"777"` all
/// yield `"777"`. Alphanumeric numbers without a code prefix are kept.
pub fn normalize_loyalty(number: &str) -> String {
    let doc = normalize_document(number);
    let digits_at = doc
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(doc.len());
    let rest = doc[digits_at..].trim_start_matches('-');

    if digits_at > 0 && !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
        rest.to_string()
    } else {
        doc
    }
}

/// Normalize a free-text set token (city, meal, seat, notes, ...)
///
/// Returns `None` for empty or placeholder values. Commas are replaced with
/// `;` so a token never splits when the set is serialized comma-joined.
pub fn normalize_token(value: &str) -> Option<String> {
    if is_placeholder(value) {
        return None;
    }

    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    Some(collapsed.replace(',', ";"))
}

/// Transliterate Cyrillic characters to Latin; other characters pass through
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match cyrillic_to_latin(c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

fn cyrillic_to_latin(c: char) -> Option<&'static str> {
    let latin = match c {
        'А' => "A", 'Б' => "B", 'В' => "V", 'Г' => "G", 'Д' => "D",
        'Е' => "E", 'Ё' => "YO", 'Ж' => "ZH", 'З' => "Z", 'И' => "I",
        'Й' => "Y", 'К' => "K", 'Л' => "L", 'М' => "M", 'Н' => "N",
        'О' => "O", 'П' => "P", 'Р' => "R", 'С' => "S", 'Т' => "T",
        'У' => "U", 'Ф' => "F", 'Х' => "KH", 'Ц' => "TS", 'Ч' => "CH",
        'Ш' => "SH", 'Щ' => "SHCH", 'Ъ' => "", 'Ы' => "Y", 'Ь' => "",
        'Э' => "E", 'Ю' => "YU", 'Я' => "YA",
        'а' => "a", 'б' => "b", 'в' => "v", 'г' => "g", 'д' => "d",
        'е' => "e", 'ё' => "yo", 'ж' => "zh", 'з' => "z", 'и' => "i",
        'й' => "y", 'к' => "k", 'л' => "l", 'м' => "m", 'н' => "n",
        'о' => "o", 'п' => "p", 'р' => "r", 'с' => "s", 'т' => "t",
        'у' => "u", 'ф' => "f", 'х' => "kh", 'ц' => "ts", 'ч' => "ch",
        'ш' => "sh", 'щ' => "shch", 'ъ' => "", 'ы' => "y", 'ь' => "",
        'э' => "e", 'ю' => "yu", 'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_transliterates_and_upcases() {
        assert_eq!(normalize_name("Иванов"), "IVANOV");
        assert_eq!(normalize_name("щукин"), "SHCHUKIN");
        assert_eq!(normalize_name("Юрьев"), "YUREV");
        assert_eq!(normalize_name("john"), "JOHN");
    }

    #[test]
    fn test_normalize_name_collapses_whitespace() {
        assert_eq!(normalize_name("  anna   maria \t smith "), "ANNA MARIA SMITH");
    }

    #[test]
    fn test_placeholder_and_empty_names() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
        assert_eq!(normalize_name("Not Presented"), "");
        assert_eq!(normalize_name("NOT PRESENTED"), "");
    }

    #[test]
    fn test_normalize_document() {
        assert_eq!(normalize_document("ab 123456"), "AB123456");
        assert_eq!(normalize_document("\tcd 99 9\n"), "CD999");
        assert_eq!(normalize_document("not presented"), "");
        assert_eq!(normalize_document(""), "");
    }

    #[test]
    fn test_normalize_loyalty_drops_program_code() {
        assert_eq!(normalize_loyalty("SU 777"), "777");
        assert_eq!(normalize_loyalty("su777"), "777");
        assert_eq!(normalize_loyalty("SU-777"), "777");
        assert_eq!(normalize_loyalty(" 777 "), "777");
        assert_eq!(normalize_loyalty("AF 9"), "9");
    }

    #[test]
    fn test_normalize_loyalty_keeps_other_shapes() {
        assert_eq!(normalize_loyalty("12 345"), "12345");
        assert_eq!(normalize_loyalty("FB12AB"), "FB12AB");
        assert_eq!(normalize_loyalty("GOLD"), "GOLD");
        assert_eq!(normalize_loyalty("Not Presented"), "");
        assert_eq!(normalize_loyalty(""), "");
    }

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("  Moscow  "), Some("Moscow".to_string()));
        assert_eq!(normalize_token("Window, rear"), Some("Window; rear".to_string()));
        assert_eq!(normalize_token("Not presented"), None);
        assert_eq!(normalize_token("  "), None);
    }

    #[test]
    fn test_latin_passes_through_transliteration() {
        assert_eq!(transliterate("O'Brien-Smith 3"), "O'Brien-Smith 3");
    }
}
