//! Streaming decrypt-and-inflate for password-protected ZIP entries.
//!
//! ```no_run
//! use std::fs::File;
//!
//! use zipcrypt_rs::entry::{CompressionMethod, Encryption, EntryDescriptor};
//! use zipcrypt_rs::extract::{StreamOptions, extract_to};
//!
//! # fn main() -> zipcrypt_rs::error::ZipResult<()> {
//! let entry = EntryDescriptor::new("notes.txt", CompressionMethod::Deflate, 1234, 4096)
//!     .with_encryption(Encryption::Standard)
//!     .with_password("secret")
//!     .with_data_pos(64)
//!     .with_crc(0x1c291ca3);
//! let file = File::open("archive.zip")?;
//! let mut out = Vec::new();
//! extract_to(file, &entry, &StreamOptions::default(), &mut out)?;
//! # Ok(())
//! # }
//! ```

pub mod crc32;
pub mod crypto;
pub mod decompress;
pub mod entry;
pub mod error;
pub mod extract;
pub mod part;
pub mod source;

pub use decompress::EntryStream;
pub use error::{ZipError, ZipResult};
