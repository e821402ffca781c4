use crate::domain::model::LatLng;

pub const EARTH_RADIUS_KM: f64 = 6371.0088;

pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

pub fn rad_to_deg(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// Great-circle distance in kilometres.
///
/// Uses the haversine form with `atan2`, which stays accurate for both tiny
/// separations and antipodal points. Coordinate differences are taken as
/// absolute values so the result is bit-for-bit symmetric.
pub fn haversine_distance_km(lat_a: f64, lng_a: f64, lat_b: f64, lng_b: f64) -> f64 {
    let phi_a = deg_to_rad(lat_a);
    let phi_b = deg_to_rad(lat_b);
    let d_phi = deg_to_rad((lat_b - lat_a).abs());
    let d_lambda = deg_to_rad((lng_b - lng_a).abs());

    let h = (d_phi / 2.0).sin().powi(2) + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn distance_between(a: LatLng, b: LatLng) -> f64 {
    haversine_distance_km(a.lat, a.lng, b.lat, b.lng)
}

/// `"USD 1,234,567.5"`: currency code, a space, then the amount with comma
/// thousands separators. The fractional part is printed exactly as the
/// shortest representation of the input, without rounding.
pub fn format_price(amount: f64, currency_code: &str) -> String {
    if !amount.is_finite() {
        return format!("{} {}", currency_code, amount);
    }

    let digits = amount.abs().to_string();
    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (digits.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{} {}{}.{}", currency_code, sign, grouped, fraction),
        None => format!("{} {}{}", currency_code, sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_points_are_zero() {
        assert_eq!(haversine_distance_km(25.03, 121.56, 25.03, 121.56), 0.0);
        assert_eq!(haversine_distance_km(-90.0, 0.0, -90.0, 0.0), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let points = [
            (25.0478, 121.5170),
            (-33.8688, 151.2093),
            (51.5074, -0.1278),
            (0.0, 179.9999),
            (0.0, -179.9999),
            (89.9, 45.0),
        ];
        for &(lat_a, lng_a) in &points {
            for &(lat_b, lng_b) in &points {
                assert_eq!(
                    haversine_distance_km(lat_a, lng_a, lat_b, lng_b),
                    haversine_distance_km(lat_b, lng_b, lat_a, lng_a)
                );
            }
        }
    }

    #[test]
    fn test_known_distance() {
        // London to Paris is roughly 343.5 km
        let d = haversine_distance_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((d - 343.5).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_antipodal_and_tiny_separations() {
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_KM;
        let d = haversine_distance_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - half_circumference).abs() < 1e-6);

        let pole_to_pole = haversine_distance_km(90.0, 0.0, -90.0, 0.0);
        assert!((pole_to_pole - half_circumference).abs() < 1e-6);

        // about 1.1 cm apart
        let tiny = haversine_distance_km(10.0, 10.0, 10.0000001, 10.0);
        assert!(tiny > 0.0 && tiny < 0.00002, "got {}", tiny);
    }

    #[test]
    fn test_degree_radian_conversion() {
        assert!((deg_to_rad(180.0) - std::f64::consts::PI).abs() < 1e-12);
        assert!((rad_to_deg(std::f64::consts::FRAC_PI_2) - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.0, "USD"), "USD 0");
        assert_eq!(format_price(450.0, "USD"), "USD 450");
        assert_eq!(format_price(1200.0, "EUR"), "EUR 1,200");
        assert_eq!(format_price(1234567.25, "TWD"), "TWD 1,234,567.25");
        assert_eq!(format_price(999999.0, "USD"), "USD 999,999");
        assert_eq!(format_price(-1500.5, "USD"), "USD -1,500.5");
        assert_eq!(format_price(0.125, "USD"), "USD 0.125");
    }
}
