use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::{Value, ValueKind};

/// Legacy astronomical metadata triple. Values stay textual; interpretation
/// happens only when a keyword is adopted as a typed property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitsKeyword {
    pub name: String,
    pub value: String,
    pub comment: String,
}

impl FitsKeyword {
    pub fn new(name: &str, value: &str, comment: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            comment: comment.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordMapping {
    pub property_id: &'static str,
    pub kind: ValueKind,
    /// value arrives in millimeters and is stored in meters
    pub millimeters: bool,
}

static KEYWORD_MAP: Lazy<FxHashMap<&'static str, KeywordMapping>> = Lazy::new(|| {
    const S: ValueKind = ValueKind::String;
    const F32: ValueKind = ValueKind::Float32;
    const F64: ValueKind = ValueKind::Float64;
    const I32: ValueKind = ValueKind::Int32;
    const T: ValueKind = ValueKind::TimePoint;

    let entries: &[(&str, &str, ValueKind, bool)] = &[
        ("OBSERVER", "Observer:Name", S, false),
        ("RADECSYS", "Observation:CelestialReferenceSystem", S, false),
        ("CRVAL1", "Observation:Center:Dec", F64, false),
        ("CRVAL2", "Observation:Center:RA", F64, false),
        ("CRPIX1", "Observation:Center:X", F64, false),
        ("CRPIX2", "Observation:Center:Y", F64, false),
        ("EQUINOX", "Observation:Equinox", F64, false),
        ("SITELAT", "Observation:Location:Latitude", F64, false),
        ("SITELONG", "Observation:Location:Longitude", F64, false),
        ("OBJECT", "Observation:Object:Name", S, false),
        ("DEC", "Observation:Object:Dec", F64, false),
        ("RA", "Observation:Object:RA", F64, false),
        ("DATE-OBS", "Observation:Time:Start", T, false),
        ("DATE-END", "Observation:Time:End", T, false),
        ("GAIN", "Instrument:Camera:Gain", F32, false),
        ("ISOSPEED", "Instrument:Camera:ISOSpeed", I32, false),
        ("INSTRUME", "Instrument:Camera:Name", S, false),
        ("ROTATANG", "Instrument:Camera:Rotation", F32, false),
        ("XBINNING", "Instrument:Camera:XBinning", I32, false),
        ("YBINNING", "Instrument:Camera:YBinning", I32, false),
        ("EXPTIME", "Instrument:ExposureTime", F32, false),
        ("FILTER", "Instrument:Filter:Name", S, false),
        ("FOCUSPOS", "Instrument:Focuser:Position", F32, false),
        ("CCD-TEMP", "Instrument:Sensor:Temperature", F32, false),
        ("APTDIA", "Instrument:Telescope:Aperture", F32, true),
        ("FOCALLEN", "Instrument:Telescope:FocalLength", F32, true),
        ("TELESCOP", "Instrument:Telescope:Name", S, false),
    ];

    let mut map = FxHashMap::default();
    for &(name, property_id, kind, millimeters) in entries {
        map.insert(
            name,
            KeywordMapping {
                property_id,
                kind,
                millimeters,
            },
        );
    }
    map
});

/// Property mapping for a FITS keyword name, if it has one.
pub fn keyword_mapping(name: &str) -> Option<&'static KeywordMapping> {
    KEYWORD_MAP.get(name)
}

/// Interpret the keyword's textual value per the mapped target type.
/// Strings shed their FITS single quotes; `DATE-OBS`-style timestamps may
/// omit the `Z` suffix or carry fractional seconds.
pub(crate) fn parse_keyword_value(mapping: &KeywordMapping, raw: &str) -> Result<Value> {
    let text = raw.trim();
    match mapping.kind {
        ValueKind::String => Ok(Value::String(unquote(text).to_string())),
        ValueKind::Float32 => {
            let mut v: f32 = parse(text)?;
            if mapping.millimeters {
                v /= 1000.0;
            }
            Ok(Value::Float32(v))
        }
        ValueKind::Float64 => Ok(Value::Float64(parse(text)?)),
        ValueKind::Int32 => Ok(Value::Int32(parse(text)?)),
        ValueKind::TimePoint => parse_fits_time(unquote(text)).map(Value::TimePoint),
        other => Err(Error::InvalidValue(format!(
            "unsupported FITS target type {}",
            other.name()
        ))),
    }
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .map(str::trim)
        .unwrap_or(text)
}

fn parse<T: std::str::FromStr>(text: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    text.parse::<T>()
        .map_err(|e| Error::InvalidValue(format!("bad FITS value {text:?}: {e}")))
}

fn parse_fits_time(text: &str) -> Result<crate::value::TimePoint> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(Error::InvalidValue(format!("bad FITS timestamp {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_names_resolve() {
        let m = keyword_mapping("TELESCOP").unwrap();
        assert_eq!(m.property_id, "Instrument:Telescope:Name");
        assert_eq!(m.kind, ValueKind::String);

        let m = keyword_mapping("CRVAL1").unwrap();
        assert_eq!(m.property_id, "Observation:Center:Dec");
        assert_eq!(m.kind, ValueKind::Float64);

        assert!(keyword_mapping("NAXIS").is_none());
    }

    #[test]
    fn millimeter_keywords_store_meters() {
        let m = keyword_mapping("FOCALLEN").unwrap();
        assert!(m.millimeters);
        assert_eq!(
            parse_keyword_value(m, "650.0").unwrap(),
            Value::Float32(0.65)
        );

        let m = keyword_mapping("APTDIA").unwrap();
        assert_eq!(parse_keyword_value(m, "130").unwrap(), Value::Float32(0.13));
    }

    #[test]
    fn string_keywords_shed_fits_quotes() {
        let m = keyword_mapping("OBJECT").unwrap();
        assert_eq!(
            parse_keyword_value(m, "'M 31   '").unwrap(),
            Value::String("M 31".to_string())
        );
        assert_eq!(
            parse_keyword_value(m, "M 31").unwrap(),
            Value::String("M 31".to_string())
        );
    }

    #[test]
    fn date_obs_accepts_fits_timestamp_shapes() {
        let m = keyword_mapping("DATE-OBS").unwrap();
        for text in [
            "2023-06-01T12:30:45Z",
            "2023-06-01T12:30:45",
            "'2023-06-01T12:30:45.250'",
        ] {
            let v = parse_keyword_value(m, text).unwrap();
            assert!(matches!(v, Value::TimePoint(_)), "{text}");
        }
        assert!(parse_keyword_value(m, "yesterday").is_err());
    }
}
