use crate::utils::error::{EngineError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EngineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EngineError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EngineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(EngineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// Finite and strictly greater than zero; fractional values are fine.
pub fn validate_positive_float(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EngineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be a finite number greater than 0".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EngineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_lat_lng(field_name: &str, lat: f64, lng: f64) -> Result<()> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err(EngineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{},{}", lat, lng),
            reason: "Coordinates must be finite numbers".to_string(),
        });
    }
    validate_range(&format!("{}.lat", field_name), lat, -90.0, 90.0)?;
    validate_range(&format!("{}.lng", field_name), lng, -180.0, 180.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("routing.endpoint", "https://router.example.com").is_ok());
        assert!(validate_url("routing.endpoint", "http://localhost:5000").is_ok());
        assert!(validate_url("routing.endpoint", "").is_err());
        assert!(validate_url("routing.endpoint", "invalid-url").is_err());
        assert!(validate_url("routing.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("cluster.radius_px", 40, 1).is_ok());
        assert!(validate_positive_number("cluster.radius_px", 0, 1).is_err());
    }

    #[test]
    fn test_validate_positive_float() {
        assert!(validate_positive_float("cluster.radius_px", 0.5).is_ok());
        assert!(validate_positive_float("cluster.radius_px", 40.0).is_ok());
        assert!(validate_positive_float("cluster.radius_px", 0.0).is_err());
        assert!(validate_positive_float("cluster.radius_px", -3.0).is_err());
        assert!(validate_positive_float("cluster.radius_px", f64::NAN).is_err());
        assert!(validate_positive_float("cluster.radius_px", f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_lat_lng() {
        assert!(validate_lat_lng("reference_point", 25.03, 121.56).is_ok());
        assert!(validate_lat_lng("reference_point", 91.0, 0.0).is_err());
        assert!(validate_lat_lng("reference_point", 0.0, -180.5).is_err());
        assert!(validate_lat_lng("reference_point", f64::NAN, 0.0).is_err());
    }
}
