//! Display formatting: unit conversion, separators, placeholders.
//!
//! Telemetry is carried in feet / knots / feet-per-minute everywhere and only
//! converted here, at the edge where text is produced.

use crate::history::Channel;
use crate::prefs::{AltitudeUnit, Preferences, SpeedUnit};

/// Shown for any field the snapshot does not carry.
pub const PLACEHOLDER: &str = "--";

const FEET_TO_METERS: f64 = 0.3048;
const KNOTS_TO_KMH: f64 = 1.852;

pub fn convert_altitude(ft: f64, unit: AltitudeUnit) -> f64 {
    match unit {
        AltitudeUnit::Feet => ft,
        AltitudeUnit::Meters => ft * FEET_TO_METERS,
    }
}

pub fn convert_speed(kts: f64, unit: SpeedUnit) -> f64 {
    match unit {
        SpeedUnit::Knots => kts,
        SpeedUnit::Kmh => kts * KNOTS_TO_KMH,
    }
}

/// Round to an integer and group thousands when the magnitude is at least 1000.
pub fn thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as i64);
    let sign = if rounded < 0.0 { "-" } else { "" };
    if rounded.abs() < 1000.0 {
        return format!("{sign}{digits}");
    }
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{sign}{out}")
}

/// Unit suffix for a channel under the current preferences.
pub fn unit_suffix(channel: Channel, prefs: &Preferences) -> &'static str {
    match channel {
        Channel::Altitude => match prefs.altitude_unit {
            AltitudeUnit::Feet => "ft",
            AltitudeUnit::Meters => "m",
        },
        Channel::Speed => match prefs.speed_unit {
            SpeedUnit::Knots => "kts",
            SpeedUnit::Kmh => "km/h",
        },
        Channel::Heading => "°",
        Channel::VerticalRate => "fpm",
    }
}

/// Convert a stored channel value into display units.
pub fn to_display(channel: Channel, value: f64, prefs: &Preferences) -> f64 {
    match channel {
        Channel::Altitude => convert_altitude(value, prefs.altitude_unit),
        Channel::Speed => convert_speed(value, prefs.speed_unit),
        Channel::Heading | Channel::VerticalRate => value,
    }
}

/// Format a value that is already in display units, with its suffix.
pub fn format_display(channel: Channel, value: f64, prefs: &Preferences) -> String {
    let suffix = unit_suffix(channel, prefs);
    match channel {
        Channel::Heading => format!("{}{suffix}", value.round().rem_euclid(360.0) as i64),
        Channel::VerticalRate if value.round() > 0.0 => {
            format!("+{} {suffix}", thousands(value))
        }
        _ => format!("{} {suffix}", thousands(value)),
    }
}

/// Format a stored (raw unit) channel value, or the placeholder.
pub fn format_channel(channel: Channel, value: Option<f64>, prefs: &Preferences) -> String {
    match value {
        Some(v) => format_display(channel, to_display(channel, v, prefs), prefs),
        None => PLACEHOLDER.to_string(),
    }
}

/// Flight level from feet (`35000` → `FL350`).
pub fn flight_level(altitude_ft: Option<f64>) -> String {
    match altitude_ft {
        Some(ft) if ft >= 0.0 => format!("FL{:03}", (ft / 100.0).round() as i64),
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn distance_km(km: Option<f64>) -> String {
    match km {
        Some(v) => format!("{v:.1} km"),
        None => PLACEHOLDER.to_string(),
    }
}

/// Text or placeholder for an optional string field.
pub fn or_placeholder(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => PLACEHOLDER,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0.0), "0");
        assert_eq!(thousands(999.4), "999");
        assert_eq!(thousands(1000.0), "1,000");
        assert_eq!(thousands(35000.0), "35,000");
        assert_eq!(thousands(1234567.0), "1,234,567");
        assert_eq!(thousands(-2500.0), "-2,500");
        assert_eq!(thousands(-12.0), "-12");
    }

    #[test]
    fn test_format_channel_units() {
        let mut prefs = Preferences::default();
        assert_eq!(
            format_channel(Channel::Altitude, Some(35000.0), &prefs),
            "35,000 ft"
        );
        assert_eq!(format_channel(Channel::Speed, Some(480.0), &prefs), "480 kts");
        assert_eq!(
            format_channel(Channel::VerticalRate, Some(1200.0), &prefs),
            "+1,200 fpm"
        );
        assert_eq!(
            format_channel(Channel::VerticalRate, Some(-800.0), &prefs),
            "-800 fpm"
        );
        assert_eq!(format_channel(Channel::Heading, Some(359.6), &prefs), "0°");

        prefs.altitude_unit = AltitudeUnit::Meters;
        prefs.speed_unit = SpeedUnit::Kmh;
        assert_eq!(
            format_channel(Channel::Altitude, Some(10000.0), &prefs),
            "3,048 m"
        );
        assert_eq!(format_channel(Channel::Speed, Some(100.0), &prefs), "185 km/h");
    }

    #[test]
    fn test_placeholders() {
        let prefs = Preferences::default();
        assert_eq!(format_channel(Channel::Speed, None, &prefs), PLACEHOLDER);
        assert_eq!(flight_level(None), PLACEHOLDER);
        assert_eq!(or_placeholder(Some("  ")), PLACEHOLDER);
        assert_eq!(or_placeholder(Some("SFO")), "SFO");
    }

    #[test]
    fn test_flight_level() {
        assert_eq!(flight_level(Some(35000.0)), "FL350");
        assert_eq!(flight_level(Some(4500.0)), "FL045");
    }
}
