//! JSON boundary encoding for store numbers.
//!
//! The backing store keeps every number in exact decimal form. On the wire,
//! integral values must appear as JSON integers and non-integral values as
//! floats: a remaining-count of 3 serializes as `3`, never `3.0`.

use std::fmt;

use rust_decimal::prelude::{Decimal, ToPrimitive};
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

pub fn one() -> Decimal {
    Decimal::ONE
}

fn is_integral(d: &Decimal) -> bool {
    d.fract() == Decimal::ZERO
}

/// Serde `with`-module for a single `Decimal` field.
pub mod decimal {
    use super::*;

    pub fn serialize<S>(d: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if is_integral(d) {
            if let Some(i) = d.to_i64() {
                return serializer.serialize_i64(i);
            }
        }
        serializer.serialize_f64(d.to_f64().unwrap_or(0.0))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DecimalVisitor)
    }
}

/// Serde `with`-module for `Vec<Decimal>` fields.
pub mod decimal_seq {
    use super::*;
    use serde::de::SeqAccess;
    use serde::ser::SerializeSeq;

    pub fn serialize<S>(values: &[Decimal], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for d in values {
            seq.serialize_element(&Wire(*d))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SeqVisitor;

        impl<'de> Visitor<'de> for SeqVisitor {
            type Value = Vec<Decimal>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a sequence of numbers")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(Wire(d)) = seq.next_element()? {
                    out.push(d);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_seq(SeqVisitor)
    }
}

/// Wrapper applying the boundary rule to one element of a sequence.
struct Wire(Decimal);

impl serde::Serialize for Wire {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        decimal::serialize(&self.0, serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Wire {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        decimal::deserialize(deserializer).map(Wire)
    }
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        Decimal::from_f64_retain(v)
            .ok_or_else(|| E::custom(format!("value {v} is not representable as a decimal")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        v.parse()
            .map_err(|_| E::custom(format!("invalid decimal string {v:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "crate::num::decimal")]
        value: Decimal,
        #[serde(with = "crate::num::decimal_seq")]
        values: Vec<Decimal>,
    }

    #[test]
    fn integral_decimals_serialize_as_integers() {
        let h = Holder {
            value: Decimal::from(3),
            values: vec![Decimal::from(9), Decimal::new(30, 1)], // 9, 3.0
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"value":3,"values":[9,3]}"#);
    }

    #[test]
    fn fractional_decimals_serialize_as_floats() {
        let h = Holder {
            value: Decimal::new(25, 1), // 2.5
            values: vec![Decimal::new(-15, 1)],
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"value":2.5,"values":[-1.5]}"#);
    }

    #[test]
    fn deserializes_integers_floats_and_strings() {
        let h: Holder =
            serde_json::from_str(r#"{"value":"2.5","values":[3,0.5,-1]}"#).unwrap();
        assert_eq!(h.value, Decimal::new(25, 1));
        assert_eq!(
            h.values,
            vec![Decimal::from(3), Decimal::new(5, 1), Decimal::from(-1)]
        );
    }

    #[test]
    fn negative_remaining_counts_stay_integral() {
        // Decrements are unguarded, so -1 must still render as an integer.
        let h = Holder {
            value: Decimal::from(-1),
            values: vec![],
        };
        assert_eq!(serde_json::to_string(&h).unwrap(), r#"{"value":-1,"values":[]}"#);
    }
}
