//! The narrative source file: reading, validity checks, placeholder seeding.

use std::path::{Path, PathBuf};
use ragcall_config::KnowledgeConfig;
use ragcall_core::error::KnowledgeError;
use ragcall_core::persona::PersonaProfile;

/// Raw content of the knowledge file, read once.
#[derive(Debug, Clone)]
pub struct KnowledgeSource {
    pub path: PathBuf,
    pub content: String,
    /// Size on disk, in bytes
    pub size_bytes: u64,
}

impl KnowledgeSource {
    /// Read the source at `path`. Invalid UTF-8 is replaced, not rejected.
    pub fn read(path: &Path) -> Result<Self, KnowledgeError> {
        if !path.exists() {
            return Err(KnowledgeError::Missing(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|e| KnowledgeError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            size_bytes: bytes.len() as u64,
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Rules a source must pass before an index is built from it.
#[derive(Debug, Clone)]
pub struct SourcePolicy {
    pub min_bytes: u64,
    pub placeholder_marker: String,
    pub placeholder_scan_chars: usize,
}

impl SourcePolicy {
    pub fn from_config(config: &KnowledgeConfig) -> Self {
        Self {
            min_bytes: config.min_bytes,
            placeholder_marker: config.placeholder_marker.clone(),
            placeholder_scan_chars: config.placeholder_scan_chars,
        }
    }

    /// Check a source. The placeholder marker disqualifies a source whatever its size.
    pub fn validate(&self, source: &KnowledgeSource) -> Result<(), KnowledgeError> {
        if self.looks_like_placeholder(&source.content) {
            return Err(KnowledgeError::Placeholder(source.path.clone()));
        }

        if source.size_bytes < self.min_bytes {
            return Err(KnowledgeError::TooSmall {
                path: source.path.clone(),
                size: source.size_bytes,
                min: self.min_bytes,
            });
        }

        Ok(())
    }

    /// True when the marker appears within the leading scan window (in characters).
    pub fn looks_like_placeholder(&self, content: &str) -> bool {
        let head: String = content.chars().take(self.placeholder_scan_chars).collect();
        head.contains(&self.placeholder_marker)
    }
}

impl Default for SourcePolicy {
    fn default() -> Self {
        Self::from_config(&KnowledgeConfig::default())
    }
}

/// Read and validate a source without building anything.
pub fn preflight(path: &Path, policy: &SourcePolicy) -> Result<KnowledgeSource, KnowledgeError> {
    let source = KnowledgeSource::read(path)?;
    policy.validate(&source)?;
    Ok(source)
}

/// Text written in place of a missing narrative.
pub fn placeholder_text(file_name: &str, profile: &PersonaProfile) -> String {
    format!(
        "# Placeholder for {file_name}\n\
         This is a placeholder file. CRITICAL: Please replace its content with the actual {label}.\n\
         The narrative should cover:\n\
         - Introduction and Rapport Building (Greeting, Agent Intro as {name} from {org})\n\
         - Product Value Explanation ({brand} programs, addressing education gap)\n\
         - Pricing and Payment Options (Full Payment, No-Cost EMI via NBFCs)\n\
         - Detailed No-Cost EMI explanation (Benefits, partner NBFCs like Varthana, Bajaj Finserv etc.)\n\
         - KYC and Co-applicant details (Documents, consent video)\n\
         - Comprehensive Resistance Handling for various objections (e.g. {brand} stability, funding details)\n\
         - Closing, Urgency Hooks, and clear CTAs (including {web} and {phone})\n",
        label = profile.knowledge_label,
        name = profile.spoken_name,
        org = profile.organization,
        brand = profile.brand,
        web = profile.website_cta,
        phone = profile.phone_cta,
    )
}

/// Write the placeholder narrative, creating the parent directory.
pub fn write_placeholder(path: &Path, profile: &PersonaProfile) -> Result<(), KnowledgeError> {
    let io_err = |e: std::io::Error| KnowledgeError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    std::fs::write(path, placeholder_text(&file_name, profile)).map_err(io_err)
}
