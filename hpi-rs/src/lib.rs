//! # hpi-rs
//!
//! `hpi-rs` is a pure Rust reader for Total Annihilation's HPI archive
//! format and its TDF configuration files. It enables listing, resolving,
//! and extracting the game's bundled assets, and parsing the hierarchical
//! metadata that describes maps, units, and features.
//!
//! ## Features
//! - Read and parse HPI archives (`.hpi`, `.ufo`, `.ccx`, `.gpf`, ...)
//! - Merge many archives into one case-insensitive catalogue, with the
//!   game's overlay precedence and "first eight archives" quirk
//! - Extract files through both of the format's compression schemes
//! - Parse TDF text into a tree and cache parsed trees in a binary format
//! - No external dependencies on the original game's tooling
//!
//! ## Usage
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! hpi-rs = "0.1"
//! ```
//!
//! ### Example: Resolving and Extracting Map Files
//! ```no_run
//! use hpi_rs::hpi_catalogue::{ArchiveLimit, HpiCatalogue};
//! use hpi_rs::tdf_file::TdfFile;
//!
//! // Merge every archive in the game directory.
//! let catalogue =
//!     HpiCatalogue::new("path/to/ta", "*.hpi;*.ufo;*.ccx", ArchiveLimit::All).unwrap();
//!
//! // List the merged maps namespace.
//! for (path, entry) in catalogue.subtree("maps").unwrap().iter() {
//!     println!("{path} ({} bytes)", entry.file.size);
//! }
//!
//! // Load a map description and read its metadata.
//! if let Some(entry) = catalogue.resolve("maps/Coast To Coast.ota").unwrap() {
//!     let bytes = catalogue.load(&entry).unwrap();
//!     let ota = TdfFile::parse(&String::from_utf8_lossy(&bytes), 10);
//!     for (_, header) in &ota.children {
//!         println!("{} players", header.get_value("numplayers", "?"));
//!     }
//! }
//! ```

mod archive_header;
mod chunk_decoder;
mod chunk_header;
mod directory_record;
pub mod compression_scheme;
pub mod directory_tree;
pub mod error;
pub mod file_descriptor;
pub mod hpi_archive;
pub mod hpi_catalogue;
pub mod key_schedule;
pub mod tdf_cache;
pub mod tdf_file;
