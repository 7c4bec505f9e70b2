//! Backend payloads.
//!
//! Every response type maps all known casing variants of a field onto one
//! canonical name at deserialization time; nothing past this module sees a
//! raw backend field name.

pub mod loose;
mod agenda;
mod catalog;
mod import;

pub use agenda::*;
pub use catalog::*;
pub use import::*;

use serde::{Deserialize, Serialize};

/// A response either wrapped in `{ sucesso, dados, mensagem }` or bare.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ApiEnvelope<T> {
    Wrapped {
        sucesso: bool,
        #[serde(default)]
        dados: Option<T>,
        #[serde(default)]
        mensagem: Option<String>,
    },
    Bare(T),
}

impl<T> ApiEnvelope<T> {
    /// Payload, or the backend's message when it reports `sucesso: false`.
    pub fn into_result(self) -> Result<Option<T>, String> {
        match self {
            ApiEnvelope::Wrapped {
                sucesso: false,
                mensagem,
                ..
            } => Err(mensagem.unwrap_or_else(|| "request rejected by backend".to_string())),
            ApiEnvelope::Wrapped { dados, .. } => Ok(dados),
            ApiEnvelope::Bare(data) => Ok(Some(data)),
        }
    }
}
