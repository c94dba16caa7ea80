//! Export specification canonicalisation and fingerprinting.
//!
//! An incoming export request (format, quality, ordered filter stack,
//! variant) is normalised into an [`ExportSpec`] whose `spec_blob` is a
//! canonical byte sequence: the same logical request always produces the
//! same blob, and any semantic difference (filter order included) produces
//! a different one. The blob plus `(clip_id, created_by, format, variant)`
//! identifies an artifact; adding the clip's `updated_at` snapshot gives
//! the reuse fingerprint, dropping it gives the pending fingerprint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// MP4 container output.
pub const FORMAT_MP4: &str = "mp4";

/// WebM container output.
pub const FORMAT_WEBM: &str = "webm";

/// Animated GIF output.
pub const FORMAT_GIF: &str = "gif";

/// Valid output formats.
const VALID_FORMATS: &[&str] = &[FORMAT_MP4, FORMAT_WEBM, FORMAT_GIF];

/// Whole-frame variant.
pub const VARIANT_FULL: &str = "full";

/// Whole video with the clip's crop applied.
pub const VARIANT_CROPPED: &str = "cropped";

/// Prefix selecting one named crop: `crop:<id>`.
pub const VARIANT_CROP_PREFIX: &str = "crop:";

/// Filter type of the synthetic crop entry prepended for `crop:<id>` variants.
pub const FILTER_TYPE_CROP: &str = "crop";

// ---------------------------------------------------------------------------
// Request / filter types
// ---------------------------------------------------------------------------

/// One entry in the ordered filter stack.
///
/// `params` is an opaque JSON object forwarded to the encoder. Order within
/// the stack is semantically significant and is preserved end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFilter {
    #[serde(rename = "type")]
    pub filter_type: String,
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl ExportFilter {
    /// The synthetic crop filter prepended for `crop:<id>` variants.
    pub fn crop(crop_id: DbId) -> Self {
        Self {
            filter_type: FILTER_TYPE_CROP.to_string(),
            params: serde_json::json!({ "crop_id": crop_id }),
        }
    }
}

/// Raw request body for `POST /api/clips/{id}/export`.
///
/// Every field is optional at the boundary; [`ExportSpec::canonicalise`]
/// applies defaults and validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportRequest {
    pub format: Option<String>,
    pub quality: Option<String>,
    #[serde(default)]
    pub filters: Vec<ExportFilter>,
    pub variant: Option<String>,
}

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Parsed `variant` selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportVariant {
    Full,
    Cropped,
    Crop(DbId),
}

impl ExportVariant {
    /// Parse a trimmed variant string. Empty input means [`Full`](Self::Full).
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == VARIANT_FULL {
            return Ok(Self::Full);
        }
        if trimmed == VARIANT_CROPPED {
            return Ok(Self::Cropped);
        }
        if let Some(suffix) = trimmed.strip_prefix(VARIANT_CROP_PREFIX) {
            if suffix.is_empty() {
                return Err(CoreError::Validation(
                    "Variant 'crop:' requires a crop id".into(),
                ));
            }
            let crop_id: DbId = suffix.parse().map_err(|_| {
                CoreError::Validation(format!("Invalid crop id '{suffix}' in variant"))
            })?;
            return Ok(Self::Crop(crop_id));
        }
        Err(CoreError::Validation(format!(
            "Invalid variant '{trimmed}'. Must be 'full', 'cropped', or 'crop:<id>'"
        )))
    }

    /// The canonical string stored in `clip_exports.variant`.
    pub fn as_str(&self) -> String {
        match self {
            Self::Full => VARIANT_FULL.to_string(),
            Self::Cropped => VARIANT_CROPPED.to_string(),
            Self::Crop(id) => format!("{VARIANT_CROP_PREFIX}{id}"),
        }
    }

    /// The crop id for `crop:<id>` variants.
    pub fn crop_id(&self) -> Option<DbId> {
        match self {
            Self::Crop(id) => Some(*id),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical spec
// ---------------------------------------------------------------------------

/// Canonical serialisation shape for `spec_blob`.
///
/// Struct fields serialise in declaration order; filter `params` objects are
/// `serde_json` maps, which keep their keys sorted. Together with compact
/// output this makes the blob byte-stable for logically identical requests.
#[derive(Serialize)]
struct CanonicalSpec<'a> {
    format: &'a str,
    quality: &'a Option<String>,
    filters: &'a [ExportFilter],
}

/// A validated, canonicalised export specification.
#[derive(Debug, Clone)]
pub struct ExportSpec {
    pub format: String,
    pub quality: Option<String>,
    pub variant: ExportVariant,
    /// Full filter stack, including the synthetic crop prefix when present.
    pub filters: Vec<ExportFilter>,
    /// Canonical serialisation of `{format, quality, filters}`.
    pub spec_blob: String,
    /// Hex SHA-256 of `spec_blob`; keeps the pending-slot index narrow.
    pub spec_blob_hash: String,
}

impl ExportSpec {
    /// Canonicalise a raw request.
    ///
    /// Rules, in order:
    /// 1. Trim `format` and `variant`; empty format defaults to `mp4`,
    ///    empty variant to `full`.
    /// 2. Reject unknown formats and malformed variants.
    /// 3. For `crop:<id>` variants, prepend a synthetic crop filter so the
    ///    encoder applies the crop before any user filters. The prepend
    ///    happens before fingerprinting -- a `crop:<id>` request and a `full`
    ///    request with otherwise identical filters must never share a blob.
    /// 4. Serialise to the canonical blob and hash it.
    pub fn canonicalise(request: &ExportRequest) -> Result<Self, CoreError> {
        let format = request
            .format
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(FORMAT_MP4)
            .to_string();

        if !VALID_FORMATS.contains(&format.as_str()) {
            return Err(CoreError::Validation(format!(
                "Invalid format '{format}'. Must be one of: {VALID_FORMATS:?}"
            )));
        }

        let variant = ExportVariant::parse(request.variant.as_deref().unwrap_or(""))?;

        let mut filters = Vec::with_capacity(request.filters.len() + 1);
        if let Some(crop_id) = variant.crop_id() {
            filters.push(ExportFilter::crop(crop_id));
        }
        filters.extend(request.filters.iter().cloned());

        for filter in &filters {
            if filter.filter_type.trim().is_empty() {
                return Err(CoreError::Validation(
                    "Filter entries require a non-empty type".into(),
                ));
            }
            if !filter.params.is_object() {
                return Err(CoreError::Validation(format!(
                    "Filter '{}' params must be a JSON object",
                    filter.filter_type
                )));
            }
        }

        let quality = request.quality.clone();

        let spec_blob = serde_json::to_string(&CanonicalSpec {
            format: &format,
            quality: &quality,
            filters: &filters,
        })
        .map_err(|e| CoreError::Internal(format!("Failed to serialise export spec: {e}")))?;

        let spec_blob_hash = hex_sha256(spec_blob.as_bytes());

        Ok(Self {
            format,
            quality,
            variant,
            filters,
            spec_blob,
            spec_blob_hash,
        })
    }
}

/// Hex-encoded SHA-256 digest.
fn hex_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
