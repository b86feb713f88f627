//! Typed display lookup tables: operators, aircraft types, flight numbers.
//!
//! Every table is a finite `&'static` slice. Missing keys never coerce to an
//! empty string: the airline directory resolves through an explicit
//! [`AirlineFallback`] rule and reports how it matched.

// ---------------------------------------------------------------------------
// Airlines
// ---------------------------------------------------------------------------

/// Display metadata for one operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Airline {
    pub icao: &'static str,
    pub iata: &'static str,
    pub name: &'static str,
    pub logo: &'static str,
}

const fn airline(icao: &'static str, iata: &'static str, name: &'static str) -> Airline {
    Airline {
        icao,
        iata,
        name,
        logo: icao,
    }
}

/// Known operators keyed by ICAO three-letter designator.
pub const AIRLINES: &[Airline] = &[
    airline("AAL", "AA", "American Airlines"),
    airline("DAL", "DL", "Delta Air Lines"),
    airline("UAL", "UA", "United Airlines"),
    airline("SWA", "WN", "Southwest Airlines"),
    airline("JBU", "B6", "JetBlue Airways"),
    airline("NKS", "NK", "Spirit Airlines"),
    airline("FFT", "F9", "Frontier Airlines"),
    airline("ASA", "AS", "Alaska Airlines"),
    airline("HAL", "HA", "Hawaiian Airlines"),
    airline("SKW", "OO", "SkyWest Airlines"),
    airline("RPA", "YX", "Republic Airways"),
    airline("ENY", "MQ", "Envoy Air"),
    airline("EDV", "9E", "Endeavor Air"),
    airline("ACA", "AC", "Air Canada"),
    airline("WJA", "WS", "WestJet"),
    airline("BAW", "BA", "British Airways"),
    airline("DLH", "LH", "Lufthansa"),
    airline("AFR", "AF", "Air France"),
    airline("KLM", "KL", "KLM"),
    airline("UAE", "EK", "Emirates"),
    airline("QFA", "QF", "Qantas"),
    airline("ANA", "NH", "All Nippon Airways"),
    airline("JAL", "JL", "Japan Airlines"),
    airline("CPA", "CX", "Cathay Pacific"),
    airline("SIA", "SQ", "Singapore Airlines"),
    airline("FDX", "FX", "FedEx Express"),
    airline("UPS", "5X", "UPS Airlines"),
];

/// How an operator lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirlineMatch {
    /// Callsign starts with a known ICAO designator.
    Icao,
    /// Callsign starts with a known IATA designator.
    Iata,
    /// Nothing matched; the fallback rule supplied the display values.
    Fallback,
}

/// Resolved operator display values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirlineDisplay {
    pub code: String,
    pub name: String,
    pub logo: String,
    pub matched: AirlineMatch,
}

/// Rule applied when no table entry matches a callsign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirlineFallback {
    /// Number of leading callsign characters used as the display code.
    pub code_len: usize,
    pub name: &'static str,
    pub logo: &'static str,
}

impl Default for AirlineFallback {
    fn default() -> Self {
        AirlineFallback {
            code_len: 3,
            name: "Unknown operator",
            logo: "generic",
        }
    }
}

/// Airline table plus its fallback rule.
#[derive(Debug, Clone)]
pub struct AirlineDirectory {
    entries: &'static [Airline],
    fallback: AirlineFallback,
}

impl Default for AirlineDirectory {
    fn default() -> Self {
        AirlineDirectory::new(AIRLINES, AirlineFallback::default())
    }
}

impl AirlineDirectory {
    pub fn new(entries: &'static [Airline], fallback: AirlineFallback) -> Self {
        AirlineDirectory { entries, fallback }
    }

    /// Exact ICAO designator lookup.
    pub fn get(&self, icao: &str) -> Option<&'static Airline> {
        let entries: &'static [Airline] = self.entries;
        entries.iter().find(|a| a.icao.eq_ignore_ascii_case(icao))
    }

    /// Resolve a callsign to operator display values.
    ///
    /// ICAO prefix first, then IATA prefix (only when followed by a digit,
    /// so "DALxxx" never matches IATA "DL"), then the fallback rule.
    /// Returns `None` for blank callsigns.
    pub fn resolve(&self, callsign: &str) -> Option<AirlineDisplay> {
        let cs = callsign.trim().to_ascii_uppercase();
        if cs.is_empty() {
            return None;
        }

        if let Some(a) = cs.get(..3).and_then(|p| self.get(p)) {
            return Some(AirlineDisplay {
                code: a.icao.to_string(),
                name: a.name.to_string(),
                logo: a.logo.to_string(),
                matched: AirlineMatch::Icao,
            });
        }

        let iata_hit = cs.get(..2).filter(|_| {
            cs.as_bytes()
                .get(2)
                .is_some_and(|b| b.is_ascii_digit())
        });
        if let Some(prefix) = iata_hit {
            if let Some(a) = self.entries.iter().find(|a| a.iata == prefix) {
                return Some(AirlineDisplay {
                    code: a.icao.to_string(),
                    name: a.name.to_string(),
                    logo: a.logo.to_string(),
                    matched: AirlineMatch::Iata,
                });
            }
        }

        let code: String = cs.chars().take(self.fallback.code_len).collect();
        Some(AirlineDisplay {
            code,
            name: self.fallback.name.to_string(),
            logo: self.fallback.logo.to_string(),
            matched: AirlineMatch::Fallback,
        })
    }
}

/// Convert an ICAO-style callsign to an IATA flight number (`AAL839` → `AA839`).
///
/// Unknown prefixes are returned unchanged.
pub fn callsign_to_flight_number(callsign: &str) -> String {
    let cs = callsign.trim().to_ascii_uppercase();
    match cs.get(..3).and_then(|p| AirlineDirectory::default().get(p)) {
        Some(a) => format!("{}{}", a.iata, &cs[3..]),
        None => cs,
    }
}

// ---------------------------------------------------------------------------
// Aircraft types
// ---------------------------------------------------------------------------

/// ICAO type designator → full name.
const AIRCRAFT_TYPES: &[(&str, &str)] = &[
    ("A20N", "Airbus A320neo"),
    ("A21N", "Airbus A321neo"),
    ("A319", "Airbus A319"),
    ("A320", "Airbus A320"),
    ("A321", "Airbus A321"),
    ("A332", "Airbus A330-200"),
    ("A333", "Airbus A330-300"),
    ("A339", "Airbus A330-900neo"),
    ("A359", "Airbus A350-900"),
    ("A35K", "Airbus A350-1000"),
    ("A388", "Airbus A380-800"),
    ("B712", "Boeing 717-200"),
    ("B737", "Boeing 737-700"),
    ("B738", "Boeing 737-800"),
    ("B739", "Boeing 737-900"),
    ("B38M", "Boeing 737 MAX 8"),
    ("B39M", "Boeing 737 MAX 9"),
    ("B744", "Boeing 747-400"),
    ("B748", "Boeing 747-8"),
    ("B752", "Boeing 757-200"),
    ("B763", "Boeing 767-300"),
    ("B772", "Boeing 777-200"),
    ("B77L", "Boeing 777-200LR"),
    ("B77W", "Boeing 777-300ER"),
    ("B788", "Boeing 787-8"),
    ("B789", "Boeing 787-9"),
    ("B78X", "Boeing 787-10"),
    ("CRJ2", "Bombardier CRJ-200"),
    ("CRJ7", "Bombardier CRJ-700"),
    ("CRJ9", "Bombardier CRJ-900"),
    ("E170", "Embraer E170"),
    ("E175", "Embraer E175"),
    ("E190", "Embraer E190"),
    ("E195", "Embraer E195"),
    ("E75L", "Embraer E175 Long"),
    ("DH8D", "Dash 8-400"),
    ("AT72", "ATR 72-200"),
    ("AT76", "ATR 72-600"),
    ("MD11", "McDonnell Douglas MD-11"),
    ("C208", "Cessna Caravan"),
    ("C525", "Cessna CitationJet"),
    ("PC12", "Pilatus PC-12"),
    ("GLF5", "Gulfstream G-V"),
    ("GLEX", "Bombardier Global Express"),
    ("CL35", "Bombardier Challenger 350"),
    ("LJ45", "Learjet 45"),
];

/// Full aircraft name for a type designator.
pub fn aircraft_type_name(code: &str) -> Option<&'static str> {
    let code = code.trim();
    AIRCRAFT_TYPES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_icao_prefix() {
        let dir = AirlineDirectory::default();
        let a = dir.resolve("ual839").unwrap();
        assert_eq!(a.name, "United Airlines");
        assert_eq!(a.code, "UAL");
        assert_eq!(a.matched, AirlineMatch::Icao);
    }

    #[test]
    fn test_resolve_iata_prefix() {
        let dir = AirlineDirectory::default();
        let a = dir.resolve("DL1234").unwrap();
        assert_eq!(a.name, "Delta Air Lines");
        assert_eq!(a.code, "DAL");
        assert_eq!(a.matched, AirlineMatch::Iata);
    }

    #[test]
    fn test_resolve_fallback() {
        let dir = AirlineDirectory::default();
        let a = dir.resolve("N12345").unwrap();
        assert_eq!(a.matched, AirlineMatch::Fallback);
        assert_eq!(a.code, "N12");
        assert_eq!(a.name, "Unknown operator");
        assert_eq!(a.logo, "generic");
    }

    #[test]
    fn test_resolve_custom_fallback_rule() {
        let dir = AirlineDirectory::new(
            AIRLINES,
            AirlineFallback {
                code_len: 2,
                name: "Private",
                logo: "ga",
            },
        );
        let a = dir.resolve("XYZ1").unwrap();
        assert_eq!(a.code, "XY");
        assert_eq!(a.name, "Private");
    }

    #[test]
    fn test_resolve_blank() {
        assert!(AirlineDirectory::default().resolve("   ").is_none());
    }

    #[test]
    fn test_flight_number() {
        assert_eq!(callsign_to_flight_number("AAL839"), "AA839");
        assert_eq!(callsign_to_flight_number("ups12 "), "5X12");
        assert_eq!(callsign_to_flight_number("N123AB"), "N123AB");
    }

    #[test]
    fn test_aircraft_type_name() {
        assert_eq!(aircraft_type_name("b789"), Some("Boeing 787-9"));
        assert_eq!(aircraft_type_name("ZZZZ"), None);
    }
}
