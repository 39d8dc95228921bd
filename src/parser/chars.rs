//! バイト分類 (RFC 9110 / RFC 3986)

/// RFC 9110 token 文字か確認
pub(crate) fn is_token_char(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'0'..=b'9' | b'A'..=b'Z' | b'^' | b'_' | b'`' | b'a'..=b'z' | b'|' | b'~'
    )
}

/// RFC 3986 で除外されている文字 (request-target で許可されない)
const RFC3986_EXCLUDED: &[u8] = b"\"#<>\\^`{|}";

/// request-target に許容される文字か確認
///
/// 制御文字 (0x00-0x20, 0x7F) と RFC 3986 除外文字を拒否し、
/// VCHAR の残りと obs-text (0x80-0xFF) を許可する。
pub(crate) fn is_url_char(b: u8) -> bool {
    if b <= 0x20 || b == 0x7F {
        return false;
    }
    !RFC3986_EXCLUDED.contains(&b)
}

/// ヘッダー値に許容される文字か確認 (RFC 9110 Section 5.5)
///
/// field-vchar = VCHAR / obs-text、field-content の一部として
/// SP (0x20) と HTAB (0x09) も許可される。
pub(crate) fn is_field_vchar(b: u8) -> bool {
    matches!(b, 0x09 | 0x20..=0x7E | 0x80..=0xFF)
}

/// 16 進数字の値を取得 (大文字小文字を区別しない)
pub(crate) fn hex_value(b: u8) -> Option<u64> {
    match b {
        b'0'..=b'9' => Some(u64::from(b - b'0')),
        b'a'..=b'f' => Some(u64::from(b - b'a' + 10)),
        b'A'..=b'F' => Some(u64::from(b - b'A' + 10)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_chars() {
        assert!(is_token_char(b'a'));
        assert!(is_token_char(b'Z'));
        assert!(is_token_char(b'-'));
        assert!(!is_token_char(b' '));
        assert!(!is_token_char(b':'));
        assert!(!is_token_char(b'\r'));
    }

    #[test]
    fn url_chars() {
        assert!(is_url_char(b'/'));
        assert!(is_url_char(b'?'));
        assert!(is_url_char(b'%'));
        assert!(is_url_char(0x80));
        assert!(!is_url_char(b' '));
        assert!(!is_url_char(b'<'));
        assert!(!is_url_char(0x7F));
    }

    #[test]
    fn hex_values() {
        assert_eq!(hex_value(b'0'), Some(0));
        assert_eq!(hex_value(b'f'), Some(15));
        assert_eq!(hex_value(b'F'), Some(15));
        assert_eq!(hex_value(b'g'), None);
    }
}
