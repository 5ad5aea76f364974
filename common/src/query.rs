/// Returns the value of the first `key` in the query part of `uri`.
pub fn query_param(uri: &str, key: &str) -> Option<String> {
    let query = uri.split_once('?')?.1;
    let query = query.split_once('#').map_or(query, |(query, _)| query);
    query_value(query, key)
}

/// Looks `key` up in a raw `a=1&b=2` query string. A pair without `=` carries
/// no value and is skipped, so `?pin&state=1` has no `pin`.
pub fn query_value(query: &str, key: &str) -> Option<String> {
    for pair in query.split('&') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        if decode_component(name) == key {
            return Some(decode_component(value));
        }
    }

    None
}

/// Lenient integer parse: optional leading whitespace and sign, then as many
/// decimal digits as are present. Anything unparsable yields 0.
pub fn coerce_int(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(byte - b'0'));
    }

    if negative {
        -value
    } else {
        value
    }
}

fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            other => out.push(other),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_params_in_any_order() {
        let uri = "/gpio?state=1&pin=33";
        assert_eq!(query_param(uri, "pin").as_deref(), Some("33"));
        assert_eq!(query_param(uri, "state").as_deref(), Some("1"));
        assert_eq!(query_param(uri, "other"), None);
    }

    #[test]
    fn missing_query_has_no_params() {
        assert_eq!(query_param("/gpio", "pin"), None);
        assert_eq!(query_param("/gpio?", "pin"), None);
    }

    #[test]
    fn bare_key_without_value_is_absent() {
        assert_eq!(query_param("/gpio?pin&state=1", "pin"), None);
        assert_eq!(query_param("/gpio?pin&state=1", "state").as_deref(), Some("1"));
        assert_eq!(query_param("/gpio?pin&pin=33", "pin").as_deref(), Some("33"));
    }

    #[test]
    fn empty_value_is_present() {
        assert_eq!(query_param("/gpio?pin=&state=1", "pin").as_deref(), Some(""));
    }

    #[test]
    fn first_occurrence_wins() {
        assert_eq!(query_param("/gpio?pin=14&pin=33", "pin").as_deref(), Some("14"));
    }

    #[test]
    fn decodes_escapes() {
        assert_eq!(query_param("/x?a=%31%34", "a").as_deref(), Some("14"));
        assert_eq!(query_param("/x?a=b+c", "a").as_deref(), Some("b c"));
        assert_eq!(query_param("/x?a=100%", "a").as_deref(), Some("100%"));
        assert_eq!(query_param("/x?a=%zz", "a").as_deref(), Some("%zz"));
    }

    #[test]
    fn raw_query_lookup() {
        assert_eq!(query_value("pin=14&state=0", "state").as_deref(), Some("0"));
        assert_eq!(query_value("", "pin"), None);
    }

    #[test]
    fn ignores_fragment() {
        assert_eq!(query_param("/x?pin=14#top", "pin").as_deref(), Some("14"));
    }

    #[test]
    fn coerces_leniently() {
        assert_eq!(coerce_int("1"), 1);
        assert_eq!(coerce_int("0"), 0);
        assert_eq!(coerce_int("14"), 14);
        assert_eq!(coerce_int(" 33"), 33);
        assert_eq!(coerce_int("1abc"), 1);
        assert_eq!(coerce_int("abc"), 0);
        assert_eq!(coerce_int(""), 0);
        assert_eq!(coerce_int("-1"), -1);
        assert_eq!(coerce_int("+7"), 7);
        assert_eq!(coerce_int("true"), 0);
        assert_eq!(coerce_int("99999999999999999999999"), i64::MAX);
    }
}
