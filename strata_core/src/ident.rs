//! Identifier validation.

/// Whether `name` is a valid field identifier: an ASCII letter or underscore
/// followed by ASCII letters, digits or underscores.
#[must_use]
pub fn is_valid_ident(name: &[u8]) -> bool {
    let Some(&first) = name.first() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return false;
    }
    name[1..]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_idents() {
        assert!(is_valid_ident(b"x"));
        assert!(is_valid_ident(b"_private"));
        assert!(is_valid_ident(b"num_params"));
        assert!(is_valid_ident(b"Block0"));
    }

    #[test]
    fn test_invalid_idents() {
        assert!(!is_valid_ident(b""));
        assert!(!is_valid_ident(b"0start"));
        assert!(!is_valid_ident(b"has space"));
        assert!(!is_valid_ident(b"dash-ed"));
        assert!(!is_valid_ident(b"\xffbytes"));
    }
}
