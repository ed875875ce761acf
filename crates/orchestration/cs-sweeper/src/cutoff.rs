//! Cutoff instant parsing.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use cs_error::{Result, SweepError};

/// Timezone used to interpret calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffZone {
    /// The system's local timezone
    Local,
    /// UTC
    Utc,
    /// An IANA timezone such as `Asia/Shanghai`
    Named(Tz),
}

impl CutoffZone {
    /// Parse `local`, `UTC`, or an IANA name. `None` means local.
    pub fn parse(name: Option<&str>) -> Result<Self> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(Self::Local);
        };

        if name.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if name.eq_ignore_ascii_case("utc") || name == "Z" {
            return Ok(Self::Utc);
        }

        name.parse::<Tz>().map(Self::Named).map_err(|_| {
            SweepError::Config(format!(
                "Unknown timezone '{name}'. Use an IANA name such as Asia/Shanghai, UTC, or local"
            ))
        })
    }

    fn resolve(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Local => to_utc(&Local, naive),
            Self::Utc => to_utc(&Utc, naive),
            Self::Named(tz) => to_utc(tz, naive),
        }
    }
}

// Ambiguous local times (DST fall-back) resolve to the earlier instant
fn to_utc<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a cutoff instant.
///
/// Supported formats:
/// - Date only: `2024-01-15` (midnight in `timezone`)
/// - Date and time: `2024-01-15 08:30:00` (in `timezone`)
/// - RFC 3339: `2024-01-15T10:30:00+08:00` (offset taken from the string)
/// - Relative: `-24h`, `-7d`, `-2w` (before now)
///
/// `timezone` is an IANA name, `UTC`, or `local`; `None` means local.
pub fn parse_cutoff(input: &str, timezone: Option<&str>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let zone = CutoffZone::parse(timezone)?;

    if input.starts_with('-') {
        return parse_relative(input).map_err(SweepError::Config);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .or_else(|| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S").ok())
        .ok_or_else(|| {
            SweepError::Config(format!(
                "Invalid cutoff '{input}'. Expected a date (2024-01-15), \
                 a timestamp (2024-01-15T10:30:00Z), or relative (-24h, -7d, -2w)"
            ))
        })?;

    zone.resolve(naive).ok_or_else(|| {
        SweepError::Config(format!(
            "Cutoff '{input}' does not exist in timezone {}",
            timezone.unwrap_or("local")
        ))
    })
}

fn parse_relative(input: &str) -> std::result::Result<DateTime<Utc>, String> {
    let body = input.trim_start_matches('-');

    let Some(unit) = body.chars().last() else {
        return Err("Empty relative cutoff".to_string());
    };
    let number = &body[..body.len() - unit.len_utf8()];

    let amount: i64 = number
        .parse()
        .map_err(|_| format!("Invalid number in relative cutoff: '{input}'"))?;

    let offset = match unit.to_ascii_lowercase() {
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        'w' => Duration::try_weeks(amount),
        _ => {
            return Err(format!(
                "Invalid relative cutoff unit in '{input}'. Use 'h' (hours), 'd' (days), or 'w' (weeks)"
            ));
        }
    };

    offset
        .and_then(|offset| Utc::now().checked_sub_signed(offset))
        .ok_or_else(|| format!("Relative cutoff out of range: '{input}'"))
}
