//! Display preferences shared by every open surface.
//!
//! Values travel through the keyed store as strings. A surface applies an
//! incoming value only if it validates; otherwise the prior value stays.

use serde::{Deserialize, Serialize};

use crate::types::{FlightwallError, Result};

pub const RANGE_MIN_NM: u8 = 1;
pub const RANGE_MAX_NM: u8 = 50;
pub const RANGE_DEFAULT_NM: u8 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AltitudeUnit {
    #[default]
    Feet,
    Meters,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Knots,
    Kmh,
}

/// Whether labels show codes (`SFO`, `B789`) or full names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelVerbosity {
    #[default]
    Codes,
    Full,
}

/// Storage keys recognized by every surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKey {
    Range,
    AltitudeUnit,
    SpeedUnit,
    LabelVerbosity,
}

impl PrefKey {
    pub const ALL: [PrefKey; 4] = [
        PrefKey::Range,
        PrefKey::AltitudeUnit,
        PrefKey::SpeedUnit,
        PrefKey::LabelVerbosity,
    ];

    pub fn storage_key(self) -> &'static str {
        match self {
            PrefKey::Range => "flightwall.range",
            PrefKey::AltitudeUnit => "flightwall.altitudeUnit",
            PrefKey::SpeedUnit => "flightwall.speedUnit",
            PrefKey::LabelVerbosity => "flightwall.labelVerbosity",
        }
    }

    /// Map a storage key back to a preference. Unrecognized keys return `None`.
    pub fn from_storage_key(key: &str) -> Option<PrefKey> {
        PrefKey::ALL.into_iter().find(|k| k.storage_key() == key)
    }
}

/// The process-wide preference set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub range_nm: u8,
    pub altitude_unit: AltitudeUnit,
    pub speed_unit: SpeedUnit,
    pub label_verbosity: LabelVerbosity,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            range_nm: RANGE_DEFAULT_NM,
            altitude_unit: AltitudeUnit::default(),
            speed_unit: SpeedUnit::default(),
            label_verbosity: LabelVerbosity::default(),
        }
    }
}

fn invalid(key: PrefKey, raw: &str) -> FlightwallError {
    FlightwallError::InvalidPreference {
        key: key.storage_key(),
        value: raw.to_string(),
    }
}

/// Parse a range value: an integer in `[1, 50]`, nothing else.
pub fn parse_range(raw: &str) -> Option<u8> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .filter(|v| (RANGE_MIN_NM..=RANGE_MAX_NM).contains(v))
}

impl Preferences {
    /// Validate and apply one stored value.
    ///
    /// Returns `Ok(true)` when the value changed, `Ok(false)` when it was
    /// already current. Invalid values leave `self` untouched.
    pub fn apply(&mut self, key: PrefKey, raw: &str) -> Result<bool> {
        let before = *self;
        let value = raw.trim();
        match key {
            PrefKey::Range => {
                self.range_nm = parse_range(value).ok_or_else(|| invalid(key, raw))?;
            }
            PrefKey::AltitudeUnit => {
                self.altitude_unit = match value {
                    "ft" | "feet" => AltitudeUnit::Feet,
                    "m" | "meters" | "metres" => AltitudeUnit::Meters,
                    _ => return Err(invalid(key, raw)),
                };
            }
            PrefKey::SpeedUnit => {
                self.speed_unit = match value {
                    "kts" | "knots" => SpeedUnit::Knots,
                    "kmh" | "km/h" => SpeedUnit::Kmh,
                    _ => return Err(invalid(key, raw)),
                };
            }
            PrefKey::LabelVerbosity => {
                self.label_verbosity = match value {
                    "codes" => LabelVerbosity::Codes,
                    "full" => LabelVerbosity::Full,
                    _ => return Err(invalid(key, raw)),
                };
            }
        }
        Ok(*self != before)
    }

    /// Apply a value addressed by raw storage key.
    pub fn apply_storage(&mut self, key: &str, raw: &str) -> Result<bool> {
        let pref = PrefKey::from_storage_key(key)
            .ok_or_else(|| FlightwallError::UnknownPreference(key.to_string()))?;
        self.apply(pref, raw)
    }

    /// String form written to the store.
    pub fn encode(&self, key: PrefKey) -> String {
        match key {
            PrefKey::Range => self.range_nm.to_string(),
            PrefKey::AltitudeUnit => match self.altitude_unit {
                AltitudeUnit::Feet => "ft".into(),
                AltitudeUnit::Meters => "m".into(),
            },
            PrefKey::SpeedUnit => match self.speed_unit {
                SpeedUnit::Knots => "kts".into(),
                SpeedUnit::Kmh => "kmh".into(),
            },
            PrefKey::LabelVerbosity => match self.label_verbosity {
                LabelVerbosity::Codes => "codes".into(),
                LabelVerbosity::Full => "full".into(),
            },
        }
    }

    /// Build from whatever the store holds; missing or invalid entries keep defaults.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut prefs = Preferences::default();
        for (key, value) in entries {
            if let Err(e) = prefs.apply_storage(key, value) {
                tracing::debug!("ignoring stored preference: {e}");
            }
        }
        prefs
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
