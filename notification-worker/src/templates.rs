//! Body rendering for the known email templates. Each template produces an
//! HTML part and a plain-text alternative from the message's data map.

use anyhow::{bail, Result};
use event_schema::{TEMPLATE_PASSWORD_RESET, TEMPLATE_VERIFY_EMAIL};
use serde_json::Value;
use std::collections::HashMap;

pub struct Rendered {
    pub html: String,
    pub text: String,
}

pub fn render(template: &str, data: &HashMap<String, Value>) -> Result<Rendered> {
    match template {
        TEMPLATE_VERIFY_EMAIL => Ok(render_verify_email(data)),
        TEMPLATE_PASSWORD_RESET => Ok(render_password_reset(data)),
        other => bail!("unknown template {other}"),
    }
}

fn field<'a>(data: &'a HashMap<String, Value>, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

fn render_verify_email(data: &HashMap<String, Value>) -> Rendered {
    let code = field(data, "code");

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <h2>Confirm your email</h2>
    <p>Use this code to confirm your OrderHub email address:</p>
    <p style="font-size: 24px; font-weight: bold; letter-spacing: 2px;">{code}</p>
    <p style="color: #999; font-size: 12px;">
        The code expires in 24 hours. If you did not create an OrderHub account, ignore this email.
    </p>
</body>
</html>"#
    );

    let text = format!(
        "Use this code to confirm your OrderHub email address:\n\n{code}\n\n\
         The code expires in 24 hours. If you did not create an OrderHub account, ignore this email.",
    );

    Rendered { html, text }
}

fn render_password_reset(data: &HashMap<String, Value>) -> Rendered {
    let code = field(data, "code");

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <h2>Password reset</h2>
    <p>We received a request to reset your OrderHub password. Your code:</p>
    <p style="font-size: 24px; font-weight: bold; letter-spacing: 2px;">{code}</p>
    <p style="color: #999; font-size: 12px;">
        The code expires in 1 hour. If you did not request a reset, ignore this email or contact support.
    </p>
</body>
</html>"#
    );

    let text = format!(
        "We received a request to reset your OrderHub password. Your code:\n\n{code}\n\n\
         The code expires in 1 hour. If you did not request a reset, ignore this email or contact support.",
    );

    Rendered { html, text }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_with_code(code: &str) -> HashMap<String, Value> {
        let mut data = HashMap::new();
        data.insert("code".to_string(), Value::String(code.to_string()));
        data
    }

    #[test]
    fn verify_email_renders_both_parts_with_code() {
        let rendered = render(TEMPLATE_VERIFY_EMAIL, &data_with_code("a1b2c3d4e5")).unwrap();
        assert!(rendered.html.contains("a1b2c3d4e5"));
        assert!(rendered.text.contains("a1b2c3d4e5"));
        assert!(rendered.html.contains("<html>"));
        assert!(!rendered.text.contains("<html>"));
    }

    #[test]
    fn password_reset_renders_both_parts_with_code() {
        let rendered = render(TEMPLATE_PASSWORD_RESET, &data_with_code("abc123")).unwrap();
        assert!(rendered.html.contains("abc123"));
        assert!(rendered.text.contains("abc123"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        assert!(render("marketing_blast", &HashMap::new()).is_err());
    }
}
