//! Zarr v2 storage for AVL datasets.
//!
//! Reads groups from local directories, zip archives or S3 buckets
//! (consolidated metadata first, directory listing otherwise) and writes
//! datasets to local directory or zip stores.

pub mod codec;
pub mod dtype;
pub mod errors;
pub mod location;
pub mod metadata;
pub mod read;
pub mod store;
pub mod write;

pub use codec::{Compressor, NAT};
pub use dtype::{ByteOrder, ZarrDtype};
pub use errors::{ZarrError, ZarrResult};
pub use location::{Location, open_store};
pub use metadata::{ArrayMetadata, CompressorConfig, ConsolidatedMetadata};
pub use read::{OpenOptions, open_dataset};
pub use store::{
    FilesystemStore, Listing, PrefixStore, S3Options, S3Store, Store, ZipStore, ZipStoreWriter,
    is_zip_path,
};
pub use write::{WriteOptions, WriteSummary, write_dataset};
