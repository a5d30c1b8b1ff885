use std::ffi::{CString, c_void};
use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use serde_json::{Map, Value};

use avl_core::DataType;

use crate::dtype::{ByteOrder, ZarrDtype};
use crate::errors::{ZarrError, ZarrResult};
use crate::metadata::CompressorConfig;

/// Stored value of a missing datetime or timedelta ("not a time").
pub const NAT: i64 = i64::MIN;

/// Bytes c-blosc may add to an incompressible buffer.
const BLOSC_MAX_OVERHEAD: usize = 16;

const BLOSC_SHUFFLE: i32 = 1;
const BLOSC_BITSHUFFLE: i32 = 2;
const BLOSC_AUTOSHUFFLE: i32 = -1;

/// Chunk compressors understood by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compressor {
    Zlib { level: u32 },
    Gzip { level: u32 },
    Zstd { level: i32 },
    /// numcodecs `blosc`; `shuffle` is -1 (auto), 0 (none), 1 (byte) or 2 (bit).
    Blosc {
        cname: String,
        clevel: i32,
        shuffle: i32,
        blocksize: usize,
    },
}

impl Default for Compressor {
    fn default() -> Self {
        Compressor::Zlib { level: 1 }
    }
}

impl Compressor {
    pub fn from_config(config: &CompressorConfig) -> ZarrResult<Self> {
        let level = config.params.get("level").and_then(Value::as_i64);
        match config.id.as_str() {
            "zlib" => Ok(Compressor::Zlib {
                level: level.unwrap_or(1).clamp(0, 9) as u32,
            }),
            "gzip" => Ok(Compressor::Gzip {
                level: level.unwrap_or(1).clamp(0, 9) as u32,
            }),
            "zstd" => Ok(Compressor::Zstd {
                level: level.unwrap_or(1) as i32,
            }),
            "blosc" => {
                let param = |name: &str| config.params.get(name).and_then(Value::as_i64);
                let cname = config
                    .params
                    .get("cname")
                    .and_then(Value::as_str)
                    .unwrap_or("lz4");
                if !matches!(cname, "blosclz" | "lz4" | "lz4hc" | "zlib" | "zstd") {
                    return Err(ZarrError::UnsupportedCodec(format!("blosc/{cname}")));
                }
                Ok(Compressor::Blosc {
                    cname: cname.to_string(),
                    clevel: param("clevel").unwrap_or(5).clamp(0, 9) as i32,
                    shuffle: param("shuffle").unwrap_or(1).clamp(-1, 2) as i32,
                    blocksize: param("blocksize").unwrap_or(0).max(0) as usize,
                })
            }
            other => Err(ZarrError::UnsupportedCodec(other.to_string())),
        }
    }

    pub fn to_config(&self) -> CompressorConfig {
        let mut params = Map::new();
        let id = match self {
            Compressor::Zlib { level } => {
                params.insert("level".to_string(), Value::from(*level));
                "zlib"
            }
            Compressor::Gzip { level } => {
                params.insert("level".to_string(), Value::from(*level));
                "gzip"
            }
            Compressor::Zstd { level } => {
                params.insert("level".to_string(), Value::from(*level));
                "zstd"
            }
            Compressor::Blosc {
                cname,
                clevel,
                shuffle,
                blocksize,
            } => {
                params.insert("cname".to_string(), Value::from(cname.as_str()));
                params.insert("clevel".to_string(), Value::from(*clevel));
                params.insert("shuffle".to_string(), Value::from(*shuffle));
                params.insert("blocksize".to_string(), Value::from(*blocksize));
                "blosc"
            }
        };
        CompressorConfig {
            id: id.to_string(),
            params,
        }
    }

    /// Compress a chunk whose elements are `typesize` bytes wide.
    pub fn encode(&self, data: &[u8], typesize: usize) -> ZarrResult<Vec<u8>> {
        match self {
            Compressor::Zlib { level } => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(*level));
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Compressor::Gzip { level } => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::new(*level));
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Compressor::Zstd { level } => Ok(zstd::encode_all(data, *level)?),
            Compressor::Blosc {
                cname,
                clevel,
                shuffle,
                blocksize,
            } => blosc_encode(data, cname, *clevel, *shuffle, *blocksize, typesize),
        }
    }

    pub fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let mut decoded = Vec::new();
        match self {
            Compressor::Zlib { .. } => {
                ZlibDecoder::new(data).read_to_end(&mut decoded)?;
            }
            Compressor::Gzip { .. } => {
                GzDecoder::new(data).read_to_end(&mut decoded)?;
            }
            Compressor::Zstd { .. } => {
                decoded = zstd::decode_all(data)?;
            }
            Compressor::Blosc { .. } => {
                decoded = blosc_decode(data)?;
            }
        }
        Ok(decoded)
    }
}

fn blosc_encode(
    data: &[u8],
    cname: &str,
    clevel: i32,
    shuffle: i32,
    blocksize: usize,
    typesize: usize,
) -> ZarrResult<Vec<u8>> {
    let typesize = typesize.max(1);
    let shuffle = match shuffle {
        BLOSC_AUTOSHUFFLE if typesize == 1 => BLOSC_BITSHUFFLE,
        BLOSC_AUTOSHUFFLE => BLOSC_SHUFFLE,
        other => other,
    };
    let cname = CString::new(cname)
        .map_err(|_| ZarrError::UnsupportedCodec(format!("blosc/{cname}")))?;
    let mut dest = vec![0u8; data.len() + BLOSC_MAX_OVERHEAD];

    // SAFETY: `data` and `dest` are valid for the lengths passed and do not
    // overlap; `cname` is NUL-terminated and outlives the call.
    let written = unsafe {
        blosc_src::blosc_compress_ctx(
            clevel as _,
            shuffle as _,
            typesize as _,
            data.len() as _,
            data.as_ptr().cast::<c_void>(),
            dest.as_mut_ptr().cast::<c_void>(),
            dest.len() as _,
            cname.as_ptr(),
            blocksize as _,
            1,
        )
    };
    if written <= 0 {
        return Err(ZarrError::Codec(format!(
            "blosc compression failed with code {written}"
        )));
    }
    dest.truncate(written as usize);
    Ok(dest)
}

fn blosc_decode(data: &[u8]) -> ZarrResult<Vec<u8>> {
    let mut nbytes = 0;
    // SAFETY: `data` is valid for `data.len()` bytes; the header is
    // validated against that length before anything is decompressed.
    let valid = unsafe {
        blosc_src::blosc_cbuffer_validate(
            data.as_ptr().cast::<c_void>(),
            data.len() as _,
            &mut nbytes,
        )
    };
    if valid != 0 {
        return Err(ZarrError::Codec("invalid blosc buffer".to_string()));
    }

    let mut dest = vec![0u8; nbytes as usize];
    // SAFETY: `dest` holds exactly the decompressed size announced by the
    // validated header.
    let read = unsafe {
        blosc_src::blosc_decompress_ctx(
            data.as_ptr().cast::<c_void>(),
            dest.as_mut_ptr().cast::<c_void>(),
            dest.len() as _,
            1,
        )
    };
    if read < 0 {
        return Err(ZarrError::Codec(format!(
            "blosc decompression failed with code {read}"
        )));
    }
    dest.truncate(read as usize);
    Ok(dest)
}

macro_rules! read_elements {
    ($bytes:expr, $ty:ty, $order:expr) => {{
        const SIZE: usize = std::mem::size_of::<$ty>();
        $bytes
            .chunks_exact(SIZE)
            .map(|chunk| {
                let mut raw = [0u8; SIZE];
                raw.copy_from_slice(chunk);
                let value = match $order {
                    ByteOrder::Big => <$ty>::from_be_bytes(raw),
                    _ => <$ty>::from_le_bytes(raw),
                };
                value as f64
            })
            .collect::<Vec<f64>>()
    }};
}

macro_rules! write_elements {
    ($values:expr, $ty:ty, $order:expr, $out:expr) => {{
        for value in $values {
            let value = *value as $ty;
            match $order {
                ByteOrder::Big => $out.extend_from_slice(&value.to_be_bytes()),
                _ => $out.extend_from_slice(&value.to_le_bytes()),
            }
        }
    }};
}

/// Decode raw (uncompressed) chunk bytes into `f64` values.
pub fn decode_elements(bytes: &[u8], dtype: &ZarrDtype) -> ZarrResult<Vec<f64>> {
    let size = dtype.data_type.size();
    if size == 0 {
        return Err(ZarrError::UnsupportedDtype(dtype.data_type.to_string()));
    }
    if bytes.len() % size != 0 {
        return Err(ZarrError::MisalignedChunk {
            len: bytes.len(),
            size,
        });
    }

    let order = dtype.byte_order;
    let values: Vec<f64> = match dtype.data_type {
        DataType::Bool => bytes
            .iter()
            .map(|byte| if *byte != 0 { 1.0 } else { 0.0 })
            .collect(),
        DataType::Int8 => read_elements!(bytes, i8, order),
        DataType::Int16 => read_elements!(bytes, i16, order),
        DataType::Int32 => read_elements!(bytes, i32, order),
        DataType::Int64 => read_elements!(bytes, i64, order),
        DataType::DateTime64 | DataType::TimeDelta64 => decode_exact_elements(bytes, dtype)?
            .into_iter()
            .map(|value| value.map_or(f64::NAN, |value| value as f64))
            .collect(),
        DataType::UInt8 => read_elements!(bytes, u8, order),
        DataType::UInt16 => read_elements!(bytes, u16, order),
        DataType::UInt32 => read_elements!(bytes, u32, order),
        DataType::UInt64 => read_elements!(bytes, u64, order),
        DataType::Float32 => read_elements!(bytes, f32, order),
        DataType::Float64 => read_elements!(bytes, f64, order),
        DataType::String => {
            return Err(ZarrError::UnsupportedDtype(dtype.data_type.to_string()));
        }
    };
    Ok(values)
}

/// Whether values of `data_type` are kept as exact 64-bit integers.
pub fn is_exact(data_type: DataType) -> bool {
    matches!(
        data_type,
        DataType::Int64 | DataType::DateTime64 | DataType::TimeDelta64
    )
}

/// Decode raw chunk bytes of a 64-bit integer, datetime or timedelta array.
///
/// Datetimes and timedeltas equal to [`NAT`] decode as `None`.
pub fn decode_exact_elements(bytes: &[u8], dtype: &ZarrDtype) -> ZarrResult<Vec<Option<i64>>> {
    if !is_exact(dtype.data_type) {
        return Err(ZarrError::UnsupportedDtype(dtype.data_type.to_string()));
    }
    if bytes.len() % 8 != 0 {
        return Err(ZarrError::MisalignedChunk {
            len: bytes.len(),
            size: 8,
        });
    }
    let nat = dtype.data_type != DataType::Int64;
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            let value = match dtype.byte_order {
                ByteOrder::Big => i64::from_be_bytes(raw),
                _ => i64::from_le_bytes(raw),
            };
            (!(nat && value == NAT)).then_some(value)
        })
        .collect())
}

/// Encode exact 64-bit values into raw chunk bytes; `None` is stored as [`NAT`].
pub fn encode_exact_elements(values: &[Option<i64>], dtype: &ZarrDtype) -> ZarrResult<Vec<u8>> {
    if !is_exact(dtype.data_type) {
        return Err(ZarrError::UnsupportedDtype(dtype.data_type.to_string()));
    }
    let mut out = Vec::with_capacity(values.len() * 8);
    for value in values {
        let value = value.unwrap_or(NAT);
        match dtype.byte_order {
            ByteOrder::Big => out.extend_from_slice(&value.to_be_bytes()),
            _ => out.extend_from_slice(&value.to_le_bytes()),
        }
    }
    Ok(out)
}

/// Encode `f64` values into raw chunk bytes; out-of-range values saturate.
pub fn encode_elements(values: &[f64], dtype: &ZarrDtype) -> ZarrResult<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * dtype.data_type.size());
    let order = dtype.byte_order;
    match dtype.data_type {
        DataType::Bool => out.extend(values.iter().map(|value| u8::from(*value != 0.0))),
        DataType::Int8 => write_elements!(values, i8, order, out),
        DataType::Int16 => write_elements!(values, i16, order, out),
        DataType::Int32 => write_elements!(values, i32, order, out),
        DataType::Int64 | DataType::DateTime64 | DataType::TimeDelta64 => {
            write_elements!(values, i64, order, out)
        }
        DataType::UInt8 => write_elements!(values, u8, order, out),
        DataType::UInt16 => write_elements!(values, u16, order, out),
        DataType::UInt32 => write_elements!(values, u32, order, out),
        DataType::UInt64 => write_elements!(values, u64, order, out),
        DataType::Float32 => write_elements!(values, f32, order, out),
        DataType::Float64 => write_elements!(values, f64, order, out),
        DataType::String => {
            return Err(ZarrError::UnsupportedDtype(dtype.data_type.to_string()));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_big_endian_integers() {
        let dtype = ZarrDtype::parse(">i2").unwrap();
        let values = decode_elements(&[0x00, 0x01, 0xff, 0xfe], &dtype).unwrap();
        assert_eq!(values, vec![1.0, -2.0]);
    }

    #[test]
    fn rejects_partial_elements() {
        let dtype = ZarrDtype::parse("<f4").unwrap();
        assert!(decode_elements(&[0, 0, 0], &dtype).is_err());
    }

    #[test]
    fn compressors_invert_each_other() {
        let dtype = ZarrDtype::parse("<f8").unwrap();
        let raw = encode_elements(&[0.5, 1.5, -3.25], &dtype).unwrap();
        for compressor in [
            Compressor::Zlib { level: 5 },
            Compressor::Gzip { level: 1 },
            Compressor::Zstd { level: 3 },
            Compressor::Blosc {
                cname: "lz4".to_string(),
                clevel: 5,
                shuffle: 1,
                blocksize: 0,
            },
        ] {
            let packed = compressor.encode(&raw, 8).unwrap();
            assert_eq!(compressor.decode(&packed).unwrap(), raw);
        }
    }

    #[test]
    fn unknown_codecs_are_rejected() {
        let config = CompressorConfig {
            id: "lzma".to_string(),
            params: Map::new(),
        };
        let err = Compressor::from_config(&config).unwrap_err();
        assert!(matches!(err, ZarrError::UnsupportedCodec(id) if id == "lzma"));
    }

    #[test]
    fn blosc_config_follows_numcodecs() {
        let config: CompressorConfig = serde_json::from_value(serde_json::json!({
            "id": "blosc",
            "cname": "zstd",
            "clevel": 3,
            "shuffle": 2,
            "blocksize": 0
        }))
        .unwrap();
        let compressor = Compressor::from_config(&config).unwrap();
        assert_eq!(
            compressor,
            Compressor::Blosc {
                cname: "zstd".to_string(),
                clevel: 3,
                shuffle: 2,
                blocksize: 0,
            }
        );
        assert_eq!(compressor.to_config(), config);

        let values: Vec<f64> = (0..1000).map(f64::from).collect();
        let raw = encode_elements(&values, &ZarrDtype::parse("<f8").unwrap()).unwrap();
        let packed = compressor.encode(&raw, 8).unwrap();
        assert!(packed.len() < raw.len());
        assert_eq!(compressor.decode(&packed).unwrap(), raw);
    }

    #[test]
    fn corrupt_blosc_buffers_are_errors() {
        let compressor = Compressor::Blosc {
            cname: "lz4".to_string(),
            clevel: 5,
            shuffle: -1,
            blocksize: 0,
        };
        assert!(matches!(
            compressor.decode(&[1, 2, 3]),
            Err(ZarrError::Codec(_))
        ));
    }

    #[test]
    fn nat_decodes_as_missing() {
        let dtype = ZarrDtype::parse("<M8[ns]").unwrap();
        let base = 1_700_000_000_000_000_000i64;
        let raw = encode_exact_elements(&[Some(base), None, Some(base + 1)], &dtype).unwrap();
        assert_eq!(&raw[8..16], &NAT.to_le_bytes());
        assert_eq!(
            decode_exact_elements(&raw, &dtype).unwrap(),
            vec![Some(base), None, Some(base + 1)]
        );

        let floats = decode_elements(&raw, &dtype).unwrap();
        assert!(floats[1].is_nan());

        let int64 = ZarrDtype::parse("<i8").unwrap();
        assert_eq!(
            decode_exact_elements(&NAT.to_le_bytes(), &int64).unwrap(),
            vec![Some(NAT)]
        );
    }
}
