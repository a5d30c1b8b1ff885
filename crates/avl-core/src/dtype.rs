use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Element type of an array variable, named after the numpy type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Date-times stored as 64-bit integer counts.
    DateTime64,
    /// Durations stored as 64-bit integer counts.
    TimeDelta64,
    /// Fixed-length or object strings; metadata only, never decoded.
    String,
}

impl DataType {
    /// Size of one element in bytes, `0` for strings.
    pub fn size(self) -> usize {
        match self {
            DataType::String => 0,
            DataType::Bool | DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64
            | DataType::UInt64
            | DataType::Float64
            | DataType::DateTime64
            | DataType::TimeDelta64 => 8,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, DataType::String)
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::DateTime64 => "datetime64",
            DataType::TimeDelta64 => "timedelta64",
            DataType::String => "str",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let dtype = match value {
            "bool" => DataType::Bool,
            "int8" => DataType::Int8,
            "int16" => DataType::Int16,
            "int32" => DataType::Int32,
            "int64" => DataType::Int64,
            "uint8" => DataType::UInt8,
            "uint16" => DataType::UInt16,
            "uint32" => DataType::UInt32,
            "uint64" => DataType::UInt64,
            "float32" => DataType::Float32,
            "float64" => DataType::Float64,
            "datetime64" => DataType::DateTime64,
            "timedelta64" => DataType::TimeDelta64,
            "str" => DataType::String,
            other => return Err(Error::Unsupported(format!("data type '{other}'"))),
        };
        Ok(dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numpy_names() {
        assert_eq!("float32".parse::<DataType>().unwrap(), DataType::Float32);
        assert_eq!("uint16".parse::<DataType>().unwrap(), DataType::UInt16);
        assert!("complex128".parse::<DataType>().is_err());
    }

    #[test]
    fn reports_element_sizes() {
        assert_eq!(DataType::UInt16.size(), 2);
        assert_eq!(DataType::DateTime64.size(), 8);
    }
}
