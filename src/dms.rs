//! Degrees/minutes/seconds input and conversion to decimal degrees.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoordError;

/// Which coordinate a DMS value describes; decides the degree range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    pub fn max_degrees(&self) -> u16 {
        match self {
            Axis::Latitude => 90,
            Axis::Longitude => 180,
        }
    }

    fn hemispheres(&self) -> (char, char) {
        match self {
            Axis::Latitude => ('N', 'S'),
            Axis::Longitude => ('E', 'W'),
        }
    }
}

/// An angle in degrees, minutes and seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dms {
    pub degrees: u16,
    pub minutes: u8,
    pub seconds: f64,
    /// South or west of the origin
    #[serde(default)]
    pub negative: bool,
}

/// `deg + min/60 + sec/3600`, no validation
pub fn dms_to_dd(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

impl Dms {
    /// Validated constructor for a northern/eastern value
    pub fn new(axis: Axis, degrees: u16, minutes: u8, seconds: f64) -> Result<Self, CoordError> {
        let dms = Self {
            degrees,
            minutes,
            seconds,
            negative: false,
        };
        dms.validate(axis)?;
        Ok(dms)
    }

    pub fn validate(&self, axis: Axis) -> Result<(), CoordError> {
        let max = axis.max_degrees();
        if self.degrees > max {
            return Err(CoordError::OutOfRange {
                field: "degrees",
                value: self.degrees as f64,
                min: 0.0,
                max: max as f64,
            });
        }
        if self.minutes > 59 {
            return Err(CoordError::OutOfRange {
                field: "minutes",
                value: self.minutes as f64,
                min: 0.0,
                max: 59.0,
            });
        }
        if !self.seconds.is_finite() || self.seconds < 0.0 || self.seconds >= 60.0 {
            return Err(CoordError::Seconds(self.seconds));
        }
        // 90°0'0" is fine, 90°0'1" is not
        if self.to_decimal().abs() > max as f64 {
            return Err(CoordError::OutOfRange {
                field: "degrees",
                value: self.to_decimal(),
                min: 0.0,
                max: max as f64,
            });
        }
        Ok(())
    }

    pub fn to_decimal(&self) -> f64 {
        let dd = dms_to_dd(self.degrees as f64, self.minutes as f64, self.seconds);
        if self.negative {
            -dd
        } else {
            dd
        }
    }

    /// Split a decimal value into DMS, seconds rounded to 1/100
    pub fn from_decimal(value: f64) -> Self {
        let negative = value < 0.0;
        let total = (value.abs() * 360_000.0).round() as u64;
        let hundredths = total % 6000;
        let minutes_total = total / 6000;

        Self {
            degrees: (minutes_total / 60) as u16,
            minutes: (minutes_total % 60) as u8,
            seconds: hundredths as f64 / 100.0,
            negative,
        }
    }

    /// Parse forms like `25°2'53"N`, `25 2 53.5`, `121d35m4sE`, `-25 2 53`.
    ///
    /// Minutes and seconds are optional; two bare numbers are degrees and
    /// minutes. A hemisphere letter that does not belong to `axis` is
    /// rejected.
    pub fn parse(axis: Axis, text: &str) -> Result<Self, CoordError> {
        let caps = dms_regex()
            .captures(text.trim())
            .ok_or_else(|| CoordError::Malformed(text.to_string()))?;

        let malformed = || CoordError::Malformed(text.to_string());

        let degrees: u16 = caps[2].parse().map_err(|_| malformed())?;
        let minutes: u8 = match caps.get(3) {
            Some(m) => m.as_str().parse().map_err(|_| malformed())?,
            None => 0,
        };
        let seconds: f64 = match caps.get(5) {
            Some(s) => s.as_str().parse().map_err(|_| malformed())?,
            None => 0.0,
        };

        let mut negative = caps.get(1).is_some();
        // Two numbers and a letter (`121 35E`) put the letter after minutes
        if let Some(h) = caps.get(6).or_else(|| caps.get(4)) {
            let letter = h.as_str().chars().next().map(|c| c.to_ascii_uppercase());
            let (pos, neg) = axis.hemispheres();
            match letter {
                Some(c) if c == pos => {}
                Some(c) if c == neg => negative = !negative,
                _ => return Err(malformed()),
            }
        }

        let dms = Self {
            degrees,
            minutes,
            seconds,
            negative,
        };
        dms.validate(axis)?;
        Ok(dms)
    }

    /// Render as `25°2'53.00"N`
    pub fn display(&self, axis: Axis) -> String {
        let (pos, neg) = axis.hemispheres();
        format!(
            "{}°{}'{:.2}\"{}",
            self.degrees,
            self.minutes,
            self.seconds,
            if self.negative { neg } else { pos }
        )
    }
}

fn dms_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(-)?\s*(\d{1,3})\s*(?:°|º|d|\s|$)\s*(?:(\d{1,2})\s*(?:'|′|m|\s|$|([NSEWnsew])$)\s*)?(?:(\d{1,2}(?:\.\d+)?)\s*(?:"|″|''|s)?\s*)?([NSEWnsew])?$"#,
        )
        .expect("DMS pattern is valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dms_to_dd() {
        let dd = dms_to_dd(25.0, 7.0, 24.0);
        assert!((dd - 25.123_333_333).abs() < 1e-6);
    }

    #[test]
    fn test_new_validates_ranges() {
        assert!(Dms::new(Axis::Latitude, 90, 0, 0.0).is_ok());
        assert!(Dms::new(Axis::Latitude, 91, 0, 0.0).is_err());
        assert!(Dms::new(Axis::Latitude, 90, 0, 1.0).is_err());
        assert!(Dms::new(Axis::Longitude, 180, 0, 0.0).is_ok());
        assert!(Dms::new(Axis::Longitude, 121, 60, 0.0).is_err());
        assert_eq!(
            Dms::new(Axis::Longitude, 121, 35, 60.0),
            Err(CoordError::Seconds(60.0))
        );
        assert!(Dms::new(Axis::Longitude, 121, 35, 59.999).is_ok());
    }

    #[test]
    fn test_parse_symbols() {
        let dms = Dms::parse(Axis::Latitude, "25°2'53\"N").unwrap();
        assert_eq!(dms.degrees, 25);
        assert_eq!(dms.minutes, 2);
        assert_eq!(dms.seconds, 53.0);
        assert!(!dms.negative);
        assert!((dms.to_decimal() - 25.048_055_6).abs() < 1e-6);
    }

    #[test]
    fn test_parse_spaces_and_letters() {
        let a = Dms::parse(Axis::Longitude, "121 35 4.5").unwrap();
        assert_eq!((a.degrees, a.minutes), (121, 35));
        assert_eq!(a.seconds, 4.5);

        let b = Dms::parse(Axis::Longitude, "121d35m4sE").unwrap();
        assert_eq!((b.degrees, b.minutes, b.seconds), (121, 35, 4.0));

        let c = Dms::parse(Axis::Latitude, "25°").unwrap();
        assert_eq!(c.to_decimal(), 25.0);

        let d = Dms::parse(Axis::Latitude, "25").unwrap();
        assert_eq!(d.to_decimal(), 25.0);
    }

    #[test]
    fn test_parse_degrees_and_minutes_only() {
        let a = Dms::parse(Axis::Longitude, "121 35").unwrap();
        assert_eq!((a.degrees, a.minutes, a.seconds), (121, 35, 0.0));
        assert!((a.to_decimal() - 121.583_333).abs() < 1e-5);

        let b = Dms::parse(Axis::Latitude, "25°30'").unwrap();
        assert_eq!((b.degrees, b.minutes, b.seconds), (25, 30, 0.0));
        assert_eq!(b.to_decimal(), 25.5);

        let c = Dms::parse(Axis::Latitude, "25 30S").unwrap();
        assert_eq!((c.degrees, c.minutes), (25, 30));
        assert!(c.negative);

        let d = Dms::parse(Axis::Longitude, "121 35 E").unwrap();
        assert_eq!((d.degrees, d.minutes, d.seconds), (121, 35, 0.0));
        assert!(!d.negative);
    }

    #[test]
    fn test_parse_negative_hemispheres() {
        let s = Dms::parse(Axis::Latitude, "33°52'4\"S").unwrap();
        assert!(s.negative);
        assert!(s.to_decimal() < 0.0);

        let w = Dms::parse(Axis::Longitude, "-70 40 0").unwrap();
        assert!(w.to_decimal() < 0.0);
    }

    #[test]
    fn test_parse_rejects_wrong_axis_letter() {
        assert!(matches!(
            Dms::parse(Axis::Latitude, "25°2'53\"E"),
            Err(CoordError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Dms::parse(Axis::Latitude, "north-ish").is_err());
        assert!(Dms::parse(Axis::Latitude, "").is_err());
        assert!(Dms::parse(Axis::Latitude, "95 0 0").is_err());
    }

    #[test]
    fn test_from_decimal() {
        let dms = Dms::from_decimal(25.048_055_6);
        assert_eq!(dms.degrees, 25);
        assert_eq!(dms.minutes, 2);
        assert!((dms.seconds - 53.0).abs() < 0.01);
        assert_eq!(dms.display(Axis::Latitude), "25°2'53.00\"N");

        let west = Dms::from_decimal(-121.5);
        assert!(west.negative);
        assert_eq!(west.display(Axis::Longitude), "121°30'0.00\"W");
    }
}
