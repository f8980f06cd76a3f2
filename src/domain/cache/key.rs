//! Content-hash key derivation for analysis requests

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Log preprocessing settings that shaped the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessingDescriptor {
    pub max_tokens: u32,
    pub safety_margin: u32,
    pub tail_count: u32,
}

impl PreprocessingDescriptor {
    pub fn new(max_tokens: u32, safety_margin: u32, tail_count: u32) -> Self {
        Self {
            max_tokens,
            safety_margin,
            tail_count,
        }
    }
}

/// Semantic parts of an analysis request that identify a cached result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParts {
    /// Result kind, e.g. "summary" or "root-cause"
    pub namespace: String,
    pub model: String,
    pub system_prompt_version: String,
    pub preprocessing: Option<PreprocessingDescriptor>,
    pub prompt: String,
    /// Per-request TTL override in milliseconds; not part of the hash
    pub ttl_override_ms: Option<u64>,
}

impl KeyParts {
    pub fn new(
        namespace: impl Into<String>,
        model: impl Into<String>,
        system_prompt_version: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            model: model.into(),
            system_prompt_version: system_prompt_version.into(),
            preprocessing: None,
            prompt: prompt.into(),
            ttl_override_ms: None,
        }
    }

    pub fn with_preprocessing(mut self, preprocessing: PreprocessingDescriptor) -> Self {
        self.preprocessing = Some(preprocessing);
        self
    }

    pub fn with_ttl_override(mut self, ttl_ms: u64) -> Self {
        self.ttl_override_ms = Some(ttl_ms);
        self
    }

    /// Canonical, field-labeled representation in fixed order
    pub fn canonical(&self) -> String {
        let pre = match &self.preprocessing {
            Some(p) => format!("{}|{}|{}", p.max_tokens, p.safety_margin, p.tail_count),
            None => "-".to_string(),
        };

        format!(
            "ns={}|model={}|spv={}|pre={}|prompt={}",
            self.namespace, self.model, self.system_prompt_version, pre, self.prompt
        )
    }
}

/// Lowercase hex SHA-256 of arbitrary text
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Computes the content hash used as the cache key for a request
pub fn compute_key_hash(parts: &KeyParts) -> String {
    sha256_hex(&parts.canonical())
}

/// Returns true if `hash` has the shape of a content hash
pub fn is_key_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
