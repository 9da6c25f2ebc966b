use crate::error::{Error, Result};

const MAX_PANTRY_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_ITEM_NAME_LEN: usize = 100;
const MAX_ITEM_FIELD_LEN: usize = 64;
const MAX_EMAIL_LEN: usize = 254;

fn validate_text(value: &str, entity: &str, max_len: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{entity} cannot be empty")));
    }
    if trimmed.chars().count() > max_len {
        return Err(Error::Validation(format!(
            "{entity} cannot exceed {max_len} characters"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(Error::Validation(format!(
            "{entity} cannot contain control characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Blank optional text collapses to `None`.
fn validate_optional_text(
    value: Option<&str>,
    entity: &str,
    max_len: usize,
) -> Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => validate_text(v, entity, max_len).map(Some),
    }
}

pub fn validate_pantry_name(name: &str) -> Result<String> {
    validate_text(name, "Pantry name", MAX_PANTRY_NAME_LEN)
}

pub fn validate_description(description: Option<&str>) -> Result<Option<String>> {
    match description.map(str::trim) {
        None | Some("") => Ok(None),
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(Error::Validation(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        ))),
        Some(d) => Ok(Some(d.to_string())),
    }
}

pub fn validate_item_name(name: &str) -> Result<String> {
    validate_text(name, "Item name", MAX_ITEM_NAME_LEN)
}

pub fn validate_item_field(value: Option<&str>, entity: &str) -> Result<Option<String>> {
    validate_optional_text(value, entity, MAX_ITEM_FIELD_LEN)
}

pub fn validate_amount(value: Option<f64>, entity: &str) -> Result<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() => Err(Error::Validation(format!(
            "{entity} must be a valid number"
        ))),
        Some(v) if v < 0.0 => Err(Error::Validation(format!("{entity} cannot be negative"))),
        other => Ok(other),
    }
}

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::Validation("Email cannot be empty".to_string()));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(Error::Validation(format!(
            "Email cannot exceed {MAX_EMAIL_LEN} characters"
        )));
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(Error::Validation(format!("Invalid email address: {email}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pantry_name_is_trimmed() {
        assert_eq!(validate_pantry_name("  Kitchen ").unwrap(), "Kitchen");
    }

    #[test]
    fn test_blank_pantry_name_rejected() {
        assert!(matches!(validate_pantry_name("   "), Err(Error::Validation(_))));
        assert!(matches!(validate_pantry_name(""), Err(Error::Validation(_))));
    }

    #[test]
    fn test_long_pantry_name_rejected() {
        let name = "a".repeat(101);
        assert!(validate_pantry_name(&name).is_err());
    }

    #[test]
    fn test_blank_optional_fields_become_none() {
        assert_eq!(validate_description(Some("  ")).unwrap(), None);
        assert_eq!(validate_item_field(Some(""), "Unit").unwrap(), None);
        assert_eq!(
            validate_item_field(Some(" Fridge "), "Location").unwrap(),
            Some("Fridge".to_string())
        );
    }

    #[test]
    fn test_amounts() {
        assert_eq!(validate_amount(Some(1.5), "Quantity").unwrap(), Some(1.5));
        assert_eq!(validate_amount(None, "Quantity").unwrap(), None);
        assert!(validate_amount(Some(-1.0), "Quantity").is_err());
        assert!(validate_amount(Some(f64::NAN), "Price").is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a b@x.com").is_err());
    }
}
