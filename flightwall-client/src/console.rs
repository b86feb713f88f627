//! Line commands for the interactive wall.
//!
//! Each line on stdin is one command. Keys stand in for the on-screen
//! controls: `f` full screen, `n` next surface, `s` settings panel, and
//! `enter`/`leave` for the pointer moving over the panel.

use flightwall_core::controls::{ControlInput, SurfaceKind};
use flightwall_core::prefs::PrefKey;
use flightwall_core::types::{FlightwallError, Icao24, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Control(ControlInput),
    Select(Option<Icao24>),
    SetPreference { key: PrefKey, value: String },
    Quit,
}

pub const HELP: &str = "\
commands:
  f                     toggle full screen
  n                     next surface
  show map|ticker|detail
  s                     toggle settings panel
  enter | leave         pointer over the settings panel
  select <icao>|none    select an aircraft on the map
  set <key> <value>     range, altitude, speed, labels
  q                     quit";

/// Short names (`range`, `speed`, ...) or full storage keys.
pub fn pref_key(name: &str) -> Option<PrefKey> {
    match name {
        "range" => Some(PrefKey::Range),
        "altitude" | "alt" => Some(PrefKey::AltitudeUnit),
        "speed" => Some(PrefKey::SpeedUnit),
        "labels" | "verbosity" => Some(PrefKey::LabelVerbosity),
        other => PrefKey::from_storage_key(other),
    }
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let unknown = || FlightwallError::Config(format!("unknown command: {}", line.trim()));

    let command = match head {
        "q" | "quit" | "exit" => ConsoleCommand::Quit,
        "f" | "fullscreen" => ConsoleCommand::Control(ControlInput::ToggleFullscreen),
        "n" | "next" => ConsoleCommand::Control(ControlInput::NextSurface),
        "s" | "settings" => ConsoleCommand::Control(ControlInput::ToggleSettings),
        "enter" => ConsoleCommand::Control(ControlInput::PointerEnterSettings),
        "leave" => ConsoleCommand::Control(ControlInput::PointerLeaveSettings),
        "show" => {
            let kind: SurfaceKind = words
                .next()
                .ok_or_else(unknown)?
                .parse()
                .map_err(FlightwallError::Config)?;
            ConsoleCommand::Control(ControlInput::ShowSurface(kind))
        }
        "select" => match words.next() {
            None | Some("none") => ConsoleCommand::Select(None),
            Some(raw) => ConsoleCommand::Select(Some(raw.parse()?)),
        },
        "set" => {
            let name = words.next().ok_or_else(unknown)?;
            let key = pref_key(name).ok_or_else(|| FlightwallError::UnknownPreference(name.to_string()))?;
            let value = words.next().ok_or_else(unknown)?.to_string();
            ConsoleCommand::SetPreference { key, value }
        }
        _ => return Err(unknown()),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controls() {
        assert_eq!(
            parse_line("n").unwrap(),
            Some(ConsoleCommand::Control(ControlInput::NextSurface))
        );
        assert_eq!(
            parse_line("  show ticker ").unwrap(),
            Some(ConsoleCommand::Control(ControlInput::ShowSurface(SurfaceKind::Ticker)))
        );
        assert_eq!(parse_line("").unwrap(), None);
        assert!(parse_line("show radar").is_err());
        assert!(parse_line("dance").is_err());
    }

    #[test]
    fn test_select() {
        assert_eq!(
            parse_line("select A1B2C3").unwrap(),
            Some(ConsoleCommand::Select(Some("a1b2c3".parse().unwrap())))
        );
        assert_eq!(parse_line("select none").unwrap(), Some(ConsoleCommand::Select(None)));
        assert!(parse_line("select zzz").is_err());
    }

    #[test]
    fn test_set_preference() {
        assert_eq!(
            parse_line("set range 25").unwrap(),
            Some(ConsoleCommand::SetPreference {
                key: PrefKey::Range,
                value: "25".into()
            })
        );
        assert_eq!(
            parse_line("set flightwall.speedUnit kmh").unwrap(),
            Some(ConsoleCommand::SetPreference {
                key: PrefKey::SpeedUnit,
                value: "kmh".into()
            })
        );
        assert!(matches!(
            parse_line("set colour red"),
            Err(FlightwallError::UnknownPreference(_))
        ));
    }
}
