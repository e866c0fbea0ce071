//! Input validation for the public surface.

const MIN_PASSWORD_LEN: usize = 8;

/// Shallow email shape check: one `@`, non-empty local part, a dotted
/// domain, no whitespace. Deliverability is the notification pipeline's
/// problem.
pub fn validate_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(|c| c.is_whitespace()) {
        return false;
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if local.is_empty() || domain.is_empty() {
        return false;
    }

    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

pub fn validate_password(password: &str) -> bool {
    password.len() >= MIN_PASSWORD_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_email_shapes() {
        assert!(validate_email("user@example.com"));
        assert!(validate_email("user+tag@example.co.uk"));
        assert!(validate_email("a@b.co"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!validate_email(""));
        assert!(!validate_email("userexample.com"));
        assert!(!validate_email("user@"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("user@example"));
        assert!(!validate_email("user@domain@example.com"));
        assert!(!validate_email("user @example.com"));
        assert!(!validate_email("user@.com"));
        assert!(!validate_email("user@example."));
    }

    #[test]
    fn password_length_boundary() {
        assert!(!validate_password("1234567"));
        assert!(validate_password("12345678"));
        assert!(validate_password("correct horse battery staple"));
    }
}
