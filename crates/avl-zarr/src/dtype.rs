use serde_json::Value;

use avl_core::DataType;

use crate::errors::{ZarrError, ZarrResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
    NotApplicable,
}

impl ByteOrder {
    fn symbol(self) -> char {
        match self {
            ByteOrder::Little => '<',
            ByteOrder::Big => '>',
            ByteOrder::NotApplicable => '|',
        }
    }
}

/// A numpy-style type string such as `<f8`, `|u1` or `<M8[s]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZarrDtype {
    pub data_type: DataType,
    pub byte_order: ByteOrder,
    /// Unit suffix of datetime and timedelta types, e.g. `s` or `ns`.
    pub unit: Option<String>,
}

impl ZarrDtype {
    /// Little-endian encoding used when writing.
    pub fn little_endian(data_type: DataType) -> Self {
        let byte_order = if data_type.size() > 1 {
            ByteOrder::Little
        } else {
            ByteOrder::NotApplicable
        };
        let unit = matches!(data_type, DataType::DateTime64 | DataType::TimeDelta64)
            .then(|| "s".to_string());
        Self {
            data_type,
            byte_order,
            unit,
        }
    }

    pub fn parse(value: &str) -> ZarrResult<Self> {
        let unsupported = || ZarrError::UnsupportedDtype(value.to_string());
        let mut chars = value.chars();
        let byte_order = match chars.next() {
            Some('<') => ByteOrder::Little,
            Some('>') => ByteOrder::Big,
            Some('|') | Some('=') => ByteOrder::NotApplicable,
            _ => return Err(unsupported()),
        };
        let kind = chars.next().ok_or_else(unsupported)?;
        let rest = chars.as_str();
        let (size, unit) = match rest.split_once('[') {
            Some((size, unit)) => (size, Some(unit.trim_end_matches(']').to_string())),
            None => (rest, None),
        };
        let size: usize = match (kind, size) {
            ('O', "") => 0,
            (_, size) => size.parse().map_err(|_| unsupported())?,
        };

        let data_type = match (kind, size) {
            ('b', 1) => DataType::Bool,
            ('i', 1) => DataType::Int8,
            ('i', 2) => DataType::Int16,
            ('i', 4) => DataType::Int32,
            ('i', 8) => DataType::Int64,
            ('u', 1) => DataType::UInt8,
            ('u', 2) => DataType::UInt16,
            ('u', 4) => DataType::UInt32,
            ('u', 8) => DataType::UInt64,
            ('f', 4) => DataType::Float32,
            ('f', 8) => DataType::Float64,
            ('M', 8) => DataType::DateTime64,
            ('m', 8) => DataType::TimeDelta64,
            ('S' | 'U' | 'O', _) => DataType::String,
            _ => return Err(unsupported()),
        };

        Ok(Self {
            data_type,
            byte_order,
            unit,
        })
    }

    pub fn encode(&self) -> ZarrResult<String> {
        let kind = match self.data_type {
            DataType::Bool => 'b',
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => 'i',
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => 'u',
            DataType::Float32 | DataType::Float64 => 'f',
            DataType::DateTime64 => 'M',
            DataType::TimeDelta64 => 'm',
            DataType::String => {
                return Err(ZarrError::UnsupportedDtype(self.data_type.to_string()));
            }
        };
        let mut encoded = format!("{}{}{}", self.byte_order.symbol(), kind, self.data_type.size());
        if let Some(unit) = &self.unit {
            encoded.push_str(&format!("[{unit}]"));
        }
        Ok(encoded)
    }
}

/// Decode a `fill_value` entry; `null` means no fill value.
pub fn parse_fill_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => match text.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

/// Encode a fill value the way Zarr v2 metadata expects it.
pub fn encode_fill_value(fill_value: Option<f64>, data_type: DataType) -> Value {
    let Some(value) = fill_value else {
        return Value::Null;
    };
    if value.is_nan() {
        return Value::from("NaN");
    }
    if value.is_infinite() {
        return Value::from(if value > 0.0 { "Infinity" } else { "-Infinity" });
    }
    match data_type {
        DataType::Bool => Value::from(value != 0.0),
        DataType::Float32 | DataType::Float64 => Value::from(value),
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            Value::from(value as u64)
        }
        _ => Value::from(value as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_type_strings() {
        let dtype = ZarrDtype::parse("<f8").unwrap();
        assert_eq!(dtype.data_type, DataType::Float64);
        assert_eq!(dtype.byte_order, ByteOrder::Little);

        let dtype = ZarrDtype::parse("|u1").unwrap();
        assert_eq!(dtype.data_type, DataType::UInt8);

        let dtype = ZarrDtype::parse("<M8[ns]").unwrap();
        assert_eq!(dtype.data_type, DataType::DateTime64);
        assert_eq!(dtype.unit.as_deref(), Some("ns"));

        assert_eq!(ZarrDtype::parse("<U12").unwrap().data_type, DataType::String);
        assert_eq!(ZarrDtype::parse("|O").unwrap().data_type, DataType::String);
        assert!(ZarrDtype::parse("<c16").is_err());
    }

    #[test]
    fn encodes_little_endian() {
        assert_eq!(
            ZarrDtype::little_endian(DataType::UInt16).encode().unwrap(),
            "<u2"
        );
        assert_eq!(
            ZarrDtype::little_endian(DataType::Bool).encode().unwrap(),
            "|b1"
        );
        assert_eq!(
            ZarrDtype::little_endian(DataType::DateTime64).encode().unwrap(),
            "<M8[s]"
        );
    }

    #[test]
    fn fill_values_follow_json_conventions() {
        assert!(parse_fill_value(&Value::from("NaN")).unwrap().is_nan());
        assert_eq!(parse_fill_value(&Value::Null), None);
        assert_eq!(
            encode_fill_value(Some(f64::NAN), DataType::Float32),
            Value::from("NaN")
        );
        assert_eq!(encode_fill_value(Some(0.0), DataType::UInt16), Value::from(0u64));
        assert_eq!(encode_fill_value(None, DataType::Float64), Value::Null);
    }
}
