//! Object key derivation.

/// Key for a project's published render.
///
/// Fixed per project so re-running a job overwrites its previous artifact
/// instead of accumulating duplicates.
pub fn render_key(project_id: &str) -> String {
    format!("renders/{}/final.mp4", project_id)
}

/// Content type for an uploaded artifact, by file extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    if lower.ends_with(".mp4") {
        "video/mp4"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".srt") {
        "application/x-subrip"
    } else {
        "application/octet-stream"
    }
}
