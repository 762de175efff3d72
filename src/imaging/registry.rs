//! Codec registry: one active provider per media type.
//!
//! Built once at startup from an explicit provider list. Every media type
//! claimed by more than one provider is resolved to a single winner, per
//! direction (decode and encode are resolved independently):
//!
//! 1. A configured preferred identity among the competitors wins.
//! 2. Otherwise a single competitor with the strictly lowest
//!    [`rank`](super::provider::CodecProvider::rank) wins.
//! 3. Otherwise initialization fails with
//!    [`ImagingError::ProviderConflict`]; an operator has to name a
//!    preference in `config.toml`.
//!
//! Losers are deactivated for that media type only. After construction the
//! registry is immutable and safe to share across threads.

use super::media::format_names;
use super::provider::{CodecProvider, ImagingError};
use super::rust_providers::builtin_providers;
use crate::config::RegistryConfig;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Which side of a codec a claim is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Decode,
    Encode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Decode => "decode",
            Direction::Encode => "encode",
        })
    }
}

/// A provider that lost a tie-break and was deactivated for one media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deactivation {
    pub media_type: String,
    pub direction: Direction,
    pub identity: String,
    /// Identity of the provider that stayed active.
    pub kept: String,
}

type ProviderMap = BTreeMap<String, Arc<dyn CodecProvider>>;

/// Resolved codec capabilities.
pub struct CodecRegistry {
    decoders: ProviderMap,
    encoders: ProviderMap,
    readable_formats: Vec<String>,
    readable_media_types: Vec<String>,
    writable_formats: Vec<String>,
    writable_media_types: Vec<String>,
    deactivated: Vec<Deactivation>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("readable_media_types", &self.readable_media_types)
            .field("writable_media_types", &self.writable_media_types)
            .field("deactivated", &self.deactivated)
            .finish()
    }
}

/// Group providers by the media types they claim in one direction.
fn group_claims(
    providers: &[Arc<dyn CodecProvider>],
    direction: Direction,
) -> BTreeMap<String, Vec<Arc<dyn CodecProvider>>> {
    let mut groups: BTreeMap<String, Vec<Arc<dyn CodecProvider>>> = BTreeMap::new();
    for provider in providers {
        let claims = match direction {
            Direction::Decode => provider.decodes(),
            Direction::Encode => provider.encodes(),
        };
        for media_type in claims {
            let group = groups.entry(media_type.to_ascii_lowercase()).or_default();
            if !group.iter().any(|p| p.identity() == provider.identity()) {
                group.push(Arc::clone(provider));
            }
        }
    }
    groups
}

/// Pick the winner among competing providers for one media type.
fn pick_winner(
    media_type: &str,
    competitors: &[Arc<dyn CodecProvider>],
    config: &RegistryConfig,
) -> Result<usize, ImagingError> {
    if let Some(preferred) = config.preferred.get(media_type) {
        if let Some(idx) = competitors.iter().position(|p| p.identity() == preferred) {
            return Ok(idx);
        }
    }

    let best = competitors.iter().filter_map(|p| p.rank()).min();
    if let Some(best) = best {
        let mut at_best = competitors
            .iter()
            .enumerate()
            .filter(|(_, p)| p.rank() == Some(best));
        if let (Some((idx, _)), None) = (at_best.next(), at_best.next()) {
            return Ok(idx);
        }
    }

    Err(ImagingError::ProviderConflict {
        media_type: media_type.to_string(),
        providers: competitors
            .iter()
            .map(|p| p.identity().to_string())
            .collect(),
    })
}

/// Resolve every media type in one direction to a single provider.
fn resolve(
    providers: &[Arc<dyn CodecProvider>],
    direction: Direction,
    config: &RegistryConfig,
    deactivated: &mut Vec<Deactivation>,
) -> Result<ProviderMap, ImagingError> {
    let mut active = ProviderMap::new();

    for (media_type, mut competitors) in group_claims(providers, direction) {
        if competitors.len() > 1 {
            let identities: Vec<&str> = competitors.iter().map(|p| p.identity()).collect();
            debug!(%media_type, %direction, providers = ?identities, "competing codec providers");

            let idx = pick_winner(&media_type, &competitors, config)?;
            let winner = competitors.swap_remove(idx);
            for loser in &competitors {
                debug!(
                    %media_type,
                    %direction,
                    provider = loser.identity(),
                    kept = winner.identity(),
                    "deregister provider"
                );
                deactivated.push(Deactivation {
                    media_type: media_type.clone(),
                    direction,
                    identity: loser.identity().to_string(),
                    kept: winner.identity().to_string(),
                });
            }
            active.insert(media_type, winner);
        } else if let Some(only) = competitors.pop() {
            active.insert(media_type, only);
        }
    }

    Ok(active)
}

fn formats_of(map: &ProviderMap) -> Vec<String> {
    let mut formats: Vec<String> = map
        .keys()
        .flat_map(|m| format_names(m).iter().map(|f| f.to_string()))
        .collect();
    formats.sort();
    formats.dedup();
    formats
}

impl CodecRegistry {
    /// Build a registry from an explicit provider list.
    pub fn new(
        providers: Vec<Arc<dyn CodecProvider>>,
        config: &RegistryConfig,
    ) -> Result<Self, ImagingError> {
        let mut deactivated = Vec::new();
        let decoders = resolve(&providers, Direction::Decode, config, &mut deactivated)?;
        let encoders = resolve(&providers, Direction::Encode, config, &mut deactivated)?;

        let registry = Self {
            readable_formats: formats_of(&decoders),
            readable_media_types: decoders.keys().cloned().collect(),
            writable_formats: formats_of(&encoders),
            writable_media_types: encoders.keys().cloned().collect(),
            decoders,
            encoders,
            deactivated,
        };

        info!(formats = ?registry.readable_formats, "supported read formats");
        info!(media_types = ?registry.readable_media_types, "supported read media types");
        info!(formats = ?registry.writable_formats, "supported write formats");
        info!(media_types = ?registry.writable_media_types, "supported write media types");

        Ok(registry)
    }

    /// Registry over the built-in providers.
    pub fn builtin(config: &RegistryConfig) -> Result<Self, ImagingError> {
        Self::new(builtin_providers(), config)
    }

    pub fn readable_formats(&self) -> &[String] {
        &self.readable_formats
    }

    pub fn readable_media_types(&self) -> &[String] {
        &self.readable_media_types
    }

    pub fn writable_formats(&self) -> &[String] {
        &self.writable_formats
    }

    pub fn writable_media_types(&self) -> &[String] {
        &self.writable_media_types
    }

    /// Tie-break decisions taken during construction.
    pub fn deactivated(&self) -> &[Deactivation] {
        &self.deactivated
    }

    pub fn decoder_for(&self, media_type: &str) -> Option<&Arc<dyn CodecProvider>> {
        self.decoders.get(&media_type.to_ascii_lowercase())
    }

    pub fn encoder_for(&self, media_type: &str) -> Option<&Arc<dyn CodecProvider>> {
        self.encoders.get(&media_type.to_ascii_lowercase())
    }

    /// True iff `from` can be read and `to` can be written.
    pub fn can_convert(&self, from: &str, to: &str) -> bool {
        self.decoder_for(from).is_some() && self.encoder_for(to).is_some()
    }
}

static GLOBAL: OnceLock<CodecRegistry> = OnceLock::new();

/// Build the process-wide registry over the built-in providers.
///
/// Only the first successful call builds; later calls return the same
/// instance and ignore their `config`. Call this before serving any
/// conversion traffic.
pub fn init_global(config: &RegistryConfig) -> Result<&'static CodecRegistry, ImagingError> {
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }
    let built = CodecRegistry::builtin(config)?;
    Ok(GLOBAL.get_or_init(|| built))
}

/// The process-wide registry, if [`init_global`] has run.
pub fn global() -> Option<&'static CodecRegistry> {
    GLOBAL.get()
}
