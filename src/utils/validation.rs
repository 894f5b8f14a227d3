use crate::post::post_model::PostForm;
use crate::utils::error::CustomError;
use regex::Regex;
use std::sync::OnceLock;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
    })
}

pub fn validate_password(password: &str) -> Result<(), CustomError> {
    // Check password length
    let length = password.chars().count();
    if !(8..=20).contains(&length) {
        return Err(CustomError::ValidationError(
            "Password must be between 8 and 20 characters long.".into(),
        ));
    }

    // Check for at least one lowercase letter, one uppercase letter, and one digit
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_lowercase || !has_uppercase || !has_digit {
        return Err(CustomError::ValidationError("Password must include at least one uppercase letter, one lowercase letter, and one number.".into()));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), CustomError> {
    if !email_pattern().is_match(email.trim()) {
        return Err(CustomError::ValidationError(
            "Please enter a valid email address.".into(),
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), CustomError> {
    if username.trim().is_empty() {
        return Err(CustomError::ValidationError("Username is required.".into()));
    }
    Ok(())
}

/// Both fields of the post form are required.
pub fn validate_post_form(form: &PostForm) -> Result<(), CustomError> {
    if form.title.trim().is_empty() {
        return Err(CustomError::ValidationError("Title is required.".into()));
    }
    if form.content.trim().is_empty() {
        return Err(CustomError::ValidationError("Content is required.".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_policy() {
        assert!(validate_password("Secret123").is_ok());
        assert!(validate_password("short1A").is_err());
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
        assert!(validate_password("WayTooLongPassword12345").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("m@example.com").is_ok());
        assert!(validate_email("  m@example.com ").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn post_form_requires_both_fields() {
        let blank_title = PostForm {
            title: "   ".into(),
            content: "body".into(),
        };
        assert_eq!(
            validate_post_form(&blank_title),
            Err(CustomError::ValidationError("Title is required.".into()))
        );

        let blank_content = PostForm {
            title: "Title".into(),
            content: String::new(),
        };
        assert!(validate_post_form(&blank_content).is_err());

        let ok = PostForm {
            title: "Title".into(),
            content: "body".into(),
        };
        assert!(validate_post_form(&ok).is_ok());
    }
}
