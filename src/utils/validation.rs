use crate::utils::error::{ApiError, FieldError};
use chrono::{DateTime, NaiveDate, Utc};

/// Acumula erros de campos obrigatórios antes de responder `VALIDATION_ERROR`
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_str(&mut self, field: &str, value: &Option<String>) -> &mut Self {
        if value.as_deref().map(str::trim).unwrap_or("").is_empty() {
            self.errors.push(FieldError::new(field, format!("{} is required", field)));
        }
        self
    }

    pub fn require<T>(&mut self, field: &str, value: &Option<T>) -> &mut Self {
        if value.is_none() {
            self.errors.push(FieldError::new(field, format!("{} is required", field)));
        }
        self
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_failed(std::mem::take(&mut self.errors)))
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || email.chars().any(char::is_whitespace) || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Escapa metacaracteres antes de montar um `$regex` a partir de input do usuário
pub fn escape_regex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if ".*+?^${}()|[]\\".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Aceita RFC 3339 ou apenas a data (`YYYY-MM-DD`, meia-noite UTC); retorna epoch ms
pub fn parse_datetime_ms(input: &str) -> Option<i64> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Filtro de data opcional vindo da query string
pub fn parse_date_param(value: Option<&str>, field: &str) -> Result<Option<i64>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_datetime_ms(v)
            .map(Some)
            .ok_or_else(|| ApiError::validation_failed(vec![FieldError::new(field, "Invalid date format")])),
    }
}

pub fn parse_bool(value: Option<&str>) -> Option<bool> {
    value.map(|v| v == "true" || v == "1")
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_param() {
        assert_eq!(parse_date_param(None, "startDate").unwrap(), None);
        assert_eq!(parse_date_param(Some(" "), "startDate").unwrap(), None);
        assert_eq!(parse_date_param(Some("1970-01-02"), "startDate").unwrap(), Some(86_400_000));
        assert_eq!(parse_date_param(Some("yesterday"), "startDate").unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_validator_collects_missing_fields() {
        let err = Validator::new()
            .require_str("companyId", &None)
            .require_str("companyName", &Some("  ".into()))
            .require_str("code", &Some("IAS".into()))
            .finish()
            .unwrap_err();

        match err {
            ApiError::Validation { details, .. } => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["companyId", "companyName"]);
                assert_eq!(details[0].message, "companyId is required");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("budi@ias.co.id"));
        assert!(!is_valid_email("budi@ias"));
        assert!(!is_valid_email("budi ias@ias.co.id"));
        assert!(!is_valid_email("@ias.co.id"));
        assert!(!is_valid_email("budi.ias.co.id"));
    }

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("a.b*(c)"), "a\\.b\\*\\(c\\)");
        assert_eq!(escape_regex("plain"), "plain");
    }

    #[test]
    fn test_parse_datetime() {
        assert_eq!(parse_datetime_ms("1970-01-01T00:00:01Z"), Some(1000));
        assert_eq!(parse_datetime_ms("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_datetime_ms("2024-01-15T09:00:00+07:00"), parse_datetime_ms("2024-01-15T02:00:00Z"));
        assert_eq!(parse_datetime_ms("not a date"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(Some("true")), Some(true));
        assert_eq!(parse_bool(Some("1")), Some(true));
        assert_eq!(parse_bool(Some("false")), Some(false));
        assert_eq!(parse_bool(None), None);
    }
}
