use std::borrow::Cow;
use validator::ValidationError;

/// 字段不能为空或只包含空白
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::from("字段不能为空"));
        return Err(error);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_blank() {
        assert!(not_blank("https://push.example.com/1").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank(" \t\n").is_err());
    }
}
