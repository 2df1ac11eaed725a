//! Template bank persistence via bincode.

use std::path::Path;

use parrot_dtw::TemplateSet;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized template set.
#[derive(serde::Serialize, serde::Deserialize)]
struct BankEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of digits with templates.
    n_labels: usize,
    /// Total number of templates.
    n_templates: usize,
    /// Shared frame dimension, `None` for an empty bank.
    dim: Option<usize>,
    /// The templates.
    templates: TemplateSet,
}

/// Save `templates` to a binary file.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::EncodeBank`] | bincode encoding failed |
/// | [`IoError::WriteFile`] | file write failed |
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn save_templates(path: impl AsRef<Path>, templates: &TemplateSet) -> Result<(), IoError> {
    let path = path.as_ref();

    let envelope = BankEnvelope {
        format_version: FORMAT_VERSION,
        n_labels: templates.n_labels(),
        n_templates: templates.len(),
        dim: templates.dim(),
        templates: templates.clone(),
    };

    let bytes = bincode::serialize(&envelope).map_err(|e| IoError::EncodeBank { source: e })?;

    std::fs::write(path, &bytes).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(
        size_bytes = bytes.len(),
        n_templates = templates.len(),
        "template bank saved"
    );
    Ok(())
}

/// Load a template set from a binary file.
///
/// Templates are re-validated while decoding.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | file read failed |
/// | [`IoError::DecodeBank`] | bincode decoding or template validation failed |
/// | [`IoError::IncompatibleBankVersion`] | format version mismatch |
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_templates(path: impl AsRef<Path>) -> Result<TemplateSet, IoError> {
    let path = path.as_ref();

    let bytes = std::fs::read(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;

    let envelope: BankEnvelope =
        bincode::deserialize(&bytes).map_err(|e| IoError::DecodeBank {
            path: path.to_path_buf(),
            source: e,
        })?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(IoError::IncompatibleBankVersion {
            path: path.to_path_buf(),
            expected: FORMAT_VERSION,
            found: envelope.format_version,
        });
    }

    debug!(
        n_labels = envelope.n_labels,
        n_templates = envelope.n_templates,
        dim = ?envelope.dim,
        "template bank loaded"
    );
    Ok(envelope.templates)
}
