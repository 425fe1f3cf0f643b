//! Compression registry and bundled codecs for the stowage block pipeline.
//!
//! Block stores never name a compression algorithm directly. They carry a
//! [`CompressionTag`](stowage_types::CompressionTag) next to each compressed
//! payload and ask a [`CompressionRegistry`] to resolve it, so data written
//! under one configuration stays readable under another as long as the tag
//! is registered.
//!
//! # Bundled codecs
//!
//! - [`ZstdCodec`] -- general purpose, min / default / max levels
//! - [`Lz4Codec`] -- fastest decode, single level
//! - [`DeflateCodec`] -- raw DEFLATE, min / default / max levels
//!
//! Tag 0 is reserved for uncompressed storage and never maps to a codec.

pub mod codec;
pub mod config;
pub mod deflate_codec;
pub mod error;
pub mod lz4_codec;
pub mod registry;
pub mod tags;
pub mod zstd_codec;

pub use codec::CompressionCodec;
pub use config::{CompressionConfig, LevelSet};
pub use deflate_codec::DeflateCodec;
pub use error::{CompressionError, CompressionResult};
pub use lz4_codec::Lz4Codec;
pub use registry::CompressionRegistry;
pub use tags::{tag_for_name, Algorithm, CatalogEntry, LevelVariant};
pub use zstd_codec::ZstdCodec;
