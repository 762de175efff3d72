//! # pagecodec
//!
//! Image conversion and resizing engine for a comic/book page server. It
//! produces thumbnails and format-normalized covers and pages from
//! arbitrary raster images.
//!
//! # Flow
//!
//! ```text
//! startup    CodecRegistry::new(providers, config)   one provider per media type
//! request    can_convert(from, to)?                  pure lookup
//!            ImageConverter::convert / resize_*      probe → decode → resample → encode
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Codec registry, prober, transparency analysis, converter and resizer |
//! | [`config`] | `config.toml` loading, validation and merging |
//! | [`batch`] | Parallel thumbnail generation over a directory tree |
//! | [`output`] | CLI output formatting for inventories and per-file results |
//!
//! # Design Decisions
//!
//! ## Explicit Provider List
//!
//! Codec providers are enumerated up front
//! ([`imaging::builtin_providers`]) instead of being discovered at runtime.
//! When two providers claim the same media type the registry keeps the one
//! named in `[registry.preferred]` and deregisters the rest. A conflict
//! nobody configured is a startup error rather than a silent pick.
//!
//! ## Never Upscale, Never Re-encode Needlessly
//!
//! Resizes probe the headers first. An image that already fits is returned
//! byte-for-byte. An image that does not fit is shrunk to the limit, and the
//! limit is always clamped to the decoded size.
//!
//! ## Flatten Only When Forced
//!
//! Alpha is composited onto white only when the target format cannot store
//! it. Whether the raster was actually transparent is reported through
//! `tracing` and never changes the output.
//!
//! ## Startup Barrier
//!
//! [`imaging::registry::init_global`] builds the registry once. After that
//! it is read-only, so any number of threads can convert concurrently
//! without locks.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
