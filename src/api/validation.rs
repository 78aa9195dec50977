use super::ApiError;

/// Parses an optional positive integer query parameter.
pub fn parse_positive(field: &str, raw: Option<&str>, default: u64) -> Result<u64, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };

    match raw.parse::<u64>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(ApiError::bad_request(
            field,
            format!("{field} must be a positive integer"),
        )),
    }
}

pub fn parse_optional_positive(field: &str, raw: Option<&str>) -> Result<Option<u64>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_positive(field, Some(raw), 1).map(Some),
    }
}

pub fn validate_search_query(field: &str, query: Option<&str>) -> Result<String, ApiError> {
    let trimmed = query.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(
            field,
            "Search query cannot be empty",
        ));
    }
    Ok(trimmed.to_string())
}
