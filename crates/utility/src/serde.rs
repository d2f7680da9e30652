//! Deserialisation helpers for the loosely typed upstream feeds, which
//! encode missing values as empty strings and numbers as text.

pub mod date_time {
    use chrono::{DateTime, FixedOffset};
    use serde::{de::Error, Deserialize as _, Deserializer};

    /// RFC 3339 timestamp (`2024-08-14T16:41:48+08:00`). An empty or
    /// missing string deserialises to `None`.
    pub fn deserialize_fixed_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        match s.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(s).map(Some).map_err(Error::custom),
        }
    }
}

pub mod lenient {
    use core::fmt;

    use serde::{
        de::{self, Visitor},
        Deserializer,
    };

    /// Accepts `1.3`, `"1.3"`, `""` and `null`; the latter two become `None`.
    pub fn deserialize_f64_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FloatVisitor;

        impl<'de> Visitor<'de> for FloatVisitor {
            type Value = Option<f64>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a number, a numeric string or an empty string")
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Some(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Some(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Some(value as f64))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                let value = value.trim();
                if value.is_empty() {
                    return Ok(None);
                }
                value
                    .parse()
                    .map(Some)
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(value), &self))
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }
        }

        deserializer.deserialize_any(FloatVisitor)
    }

    /// Accepts `12`, `"12"`; anything negative or unparsable is an error.
    pub fn deserialize_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CountVisitor;

        impl<'de> Visitor<'de> for CountVisitor {
            type Value = u32;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a non-negative integer or a numeric string")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                u32::try_from(value)
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Unsigned(value), &self))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                u32::try_from(value)
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Signed(value), &self))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                value
                    .trim()
                    .parse()
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(value), &self))
            }
        }

        deserializer.deserialize_any(CountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "super::date_time::deserialize_fixed_option", default)]
        at: Option<DateTime<FixedOffset>>,
        #[serde(deserialize_with = "super::lenient::deserialize_f64_option", default)]
        latitude: Option<f64>,
        #[serde(deserialize_with = "super::lenient::deserialize_u32")]
        count: u32,
    }

    #[test]
    fn parses_populated_values() {
        let row: Row = serde_json::from_str(
            r#"{"at": "2024-08-14T16:41:48+08:00", "latitude": "1.316748", "count": "7"}"#,
        )
        .unwrap();
        assert_eq!(
            row.at.unwrap().to_rfc3339(),
            "2024-08-14T16:41:48+08:00"
        );
        assert_eq!(row.latitude, Some(1.316748));
        assert_eq!(row.count, 7);
    }

    #[test]
    fn empty_strings_become_none() {
        let row: Row =
            serde_json::from_str(r#"{"at": "", "latitude": "", "count": 0}"#).unwrap();
        assert!(row.at.is_none());
        assert!(row.latitude.is_none());
    }

    #[test]
    fn missing_optional_fields_default() {
        let row: Row = serde_json::from_str(r#"{"count": 3}"#).unwrap();
        assert!(row.at.is_none());
        assert!(row.latitude.is_none());
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(serde_json::from_str::<Row>(r#"{"count": -1}"#).is_err());
    }
}
