//! Decode and randomly access shapefile index files.
//!
//! The [header] module decodes the 100-byte header shared by shapefile main and index files. The
//! [index] module reads the record table of an index (`.shx`) file to locate records in the main
//! (`.shp`) file.
//!
//! # Status
//!
//! `shapeidx-storage` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

pub mod header;
pub mod index;
