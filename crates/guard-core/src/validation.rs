//! Input sanitization and validation for user-supplied text

use email_address::EmailAddress;

/// Characters removed from both ends of the input
const TRIM_CHARS: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

/// Strip markup, trim and HTML-escape user input (UTF-8)
///
/// Existing character references such as `&amp;` are left alone, so running
/// the output through `sanitize` again yields the same string.
pub fn sanitize(input: &str) -> String {
    let stripped = strip_tags(input);
    escape_html(stripped.trim_matches(TRIM_CHARS))
}

/// RFC 5322 address grammar check, without any DNS or MX lookup
pub fn is_valid_email(candidate: &str) -> bool {
    EmailAddress::is_valid(candidate)
}

/// Remove `<...>` markup. A `<` followed by whitespace or at the end of input
/// is plain text; an unterminated tag swallows the rest of the input.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            Some(next) if !next.is_whitespace() => {}
            _ => {
                out.push(c);
                continue;
            }
        }

        let mut quote: Option<char> = None;
        for inner in chars.by_ref() {
            match (quote, inner) {
                (None, '>') => break,
                (None, '"') | (None, '\'') => quote = Some(inner),
                (Some(q), _) if q == inner => quote = None,
                _ => {}
            }
        }
    }

    out
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for (idx, c) in input.char_indices() {
        match c {
            '&' if starts_with_reference(&input[idx + 1..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }

    out
}

/// Longest reference name recognized between `&` and `;`
const MAX_REFERENCE_LEN: usize = 32;

/// Whether the text after an `&` forms a character reference (`name;`, `#123;`, `#x1F;`)
///
/// Only the next `MAX_REFERENCE_LEN + 1` bytes are inspected, which keeps
/// `sanitize` linear in the input length.
fn starts_with_reference(after_amp: &str) -> bool {
    let window = &after_amp.as_bytes()[..after_amp.len().min(MAX_REFERENCE_LEN + 1)];
    let Some(end) = window.iter().position(|&b| b == b';') else {
        return false;
    };
    let name = &after_amp[..end];

    if let Some(numeric) = name.strip_prefix('#') {
        return match numeric.strip_prefix(|c: char| c == 'x' || c == 'X') {
            Some(hex) => {
                !hex.is_empty() && hex.len() <= 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
            }
            None => {
                !numeric.is_empty()
                    && numeric.len() <= 7
                    && numeric.chars().all(|c| c.is_ascii_digit())
            }
        };
    }

    name.len() <= MAX_REFERENCE_LEN
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}
