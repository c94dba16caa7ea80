//! Download filename convention for export artifacts.
//!
//! Generates deterministic attachment filenames from the owning clip's
//! title, the crop in play (if any), and the export id.

/// Fallback stem when a clip has no usable title.
const FALLBACK_STEM: &str = "clip";

/// Fallback crop segment when a crop has no usable name.
const FALLBACK_CROP: &str = "cropped";

/// Generate the attachment filename for an export download.
///
/// Convention: `{title}{-crop}{-id}.{ext}`
///
/// - `title` = sanitised clip title, or `"clip"` when empty
/// - `-crop` = sanitised crop name (or `"cropped"`) for non-full variants,
///   omitted for full exports
/// - `-id` = the export's database id, keeping concurrent downloads of
///   sibling exports distinct
///
/// # Examples
///
/// ```
/// use rewind_core::naming::export_filename;
///
/// assert_eq!(export_filename("Goal Replay", None, 12, "mp4"), "goal-replay-12.mp4");
/// assert_eq!(export_filename("Goal Replay", Some("Keeper Cam"), 12, "webm"),
///            "goal-replay-keeper-cam-12.webm");
/// assert_eq!(export_filename("  ", Some(""), 3, "gif"), "clip-cropped-3.gif");
/// ```
pub fn export_filename(
    clip_title: &str,
    crop_name: Option<&str>,
    export_id: i64,
    extension: &str,
) -> String {
    let mut name = sanitise_segment(clip_title, FALLBACK_STEM);

    if let Some(crop) = crop_name {
        name.push('-');
        name.push_str(&sanitise_segment(crop, FALLBACK_CROP));
    }

    name.push('-');
    name.push_str(&export_id.to_string());
    name.push('.');
    name.push_str(extension);
    name
}

/// Lowercase a segment, map whitespace and separators to `-`, keep only
/// alphanumerics and dashes, collapse runs. Falls back when nothing is left.
fn sanitise_segment(raw: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = true; // suppress a leading dash

    for c in raw.trim().chars() {
        let mapped = if c.is_ascii_alphanumeric() {
            Some(c.to_ascii_lowercase())
        } else if c.is_whitespace() || c == '-' || c == '_' || c == '.' {
            Some('-')
        } else {
            None
        };
        match mapped {
            Some('-') => {
                if !last_dash {
                    out.push('-');
                    last_dash = true;
                }
            }
            Some(c) => {
                out.push(c);
                last_dash = false;
            }
            None => {}
        }
    }

    while out.ends_with('-') {
        out.pop();
    }

    if out.is_empty() {
        fallback.to_string()
    } else {
        out
    }
}
