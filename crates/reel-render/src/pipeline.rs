//! The five-stage render pipeline.
//!
//! Control flows strictly downstream: acquisition, partitioning, chunk
//! rendering (bounded fan-out, fan-in by index), concatenation/muxing,
//! publishing. The caller observes the job only through the progress
//! channel, which always ends with exactly one terminal event.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use reel_media::timeline::{partition, Chunk, TimedImage};
use reel_media::{
    blend_overlay, burn_subtitles, compose_chunk, concat_segments, fetch_all, fetch_to_file,
    mux_audio,
};
use reel_models::{format_srt, parse_srt, JobId, RenderRequest, Stage, Timeline};
use reel_storage::render_key;

use crate::batch::run_batched;
use crate::context::RenderContext;
use crate::error::RenderResult;

/// Local paths of a job's acquired assets.
struct JobAssets {
    audio: PathBuf,
    images: Vec<PathBuf>,
    /// Absent when the overlay is disabled or its download failed
    overlay: Option<PathBuf>,
}

/// Run a render job to completion, emitting exactly one terminal event.
///
/// Validation happens before any scratch space is allocated, so a rejected
/// request leaves no trace on disk.
pub async fn execute(ctx: RenderContext, request: RenderRequest) {
    if let Err(e) = request.validate() {
        warn!(project_id = %request.project_id, error = %e, "Rejecting render request");
        ctx.progress.error(e.to_string());
        return;
    }

    let job_id = JobId::new();
    info!(
        job_id = %job_id,
        project_id = %request.project_id,
        title = request.project_title.as_deref().unwrap_or("untitled"),
        images = request.image_urls.len(),
        "Starting render job"
    );
    metrics::counter!("reel_render_jobs_total").increment(1);
    let started = Instant::now();

    match run_job(&ctx, &job_id, &request).await {
        Ok((url, size)) => {
            metrics::counter!("reel_render_jobs_completed_total").increment(1);
            info!(
                job_id = %job_id,
                size,
                elapsed_secs = started.elapsed().as_secs(),
                "Render job complete"
            );
            ctx.progress.complete(url, size);
        }
        Err(e) => {
            metrics::counter!("reel_render_jobs_failed_total").increment(1);
            error!(job_id = %job_id, error = %e, "Render job failed");
            ctx.progress.error(e.caller_message());
        }
    }
}

/// Scratch-directory lifecycle around the stages.
async fn run_job(
    ctx: &RenderContext,
    job_id: &JobId,
    request: &RenderRequest,
) -> RenderResult<(String, u64)> {
    tokio::fs::create_dir_all(&ctx.config.work_root).await?;
    let scratch = tempfile::Builder::new()
        .prefix(&format!("job-{}-", job_id))
        .tempdir_in(&ctx.config.work_root)?;

    let outcome = run_stages(ctx, request, scratch.path()).await;

    // Drop would remove the directory too; the explicit close lets a
    // cleanup failure be logged instead of vanishing.
    if let Err(e) = scratch.close() {
        warn!(job_id = %job_id, error = %e, "Failed to remove scratch directory");
    }

    outcome
}

async fn run_stages(
    ctx: &RenderContext,
    request: &RenderRequest,
    dir: &Path,
) -> RenderResult<(String, u64)> {
    let timeline = request.timeline();

    let assets = download_assets(ctx, &timeline, dir).await?;
    let prepared = prepare_chunks(ctx, &timeline, &assets, dir).await?;
    let segments = render_chunks(ctx, prepared, assets.overlay.as_deref(), dir).await?;
    let final_path = assemble(ctx, &segments, &assets, timeline.srt_content.as_deref(), dir).await?;
    publish(ctx, &request.project_id, &final_path).await
}

/// Stage 1: fetch audio and images; the overlay alone may fail quietly.
async fn download_assets(
    ctx: &RenderContext,
    timeline: &Timeline,
    dir: &Path,
) -> RenderResult<JobAssets> {
    let audio = dir.join(format!("audio.{}", asset_extension(&timeline.audio_url, "mp3")));
    let images: Vec<PathBuf> = timeline
        .images
        .iter()
        .enumerate()
        .map(|(i, seg)| dir.join(format!("image_{:04}.{}", i, asset_extension(&seg.url, "jpg"))))
        .collect();

    let mut downloads = vec![(timeline.audio_url.clone(), audio.clone())];
    downloads.extend(
        timeline
            .images
            .iter()
            .zip(&images)
            .map(|(seg, path)| (seg.url.clone(), path.clone())),
    );

    let total = downloads.len();
    ctx.progress
        .stage(Stage::Downloading, 0.0, format!("Downloading {total} assets..."));

    let progress = ctx.progress.clone();
    fetch_all(&ctx.http, downloads, ctx.config.download_parallel, move |done| {
        progress.stage(
            Stage::Downloading,
            done as f64 / total as f64,
            format!("Downloaded {done}/{total} assets"),
        );
    })
    .await?;

    let overlay = download_overlay(ctx, dir).await;

    Ok(JobAssets {
        audio,
        images,
        overlay,
    })
}

/// Best-effort overlay acquisition: failure disables the blend pass for the
/// whole job and is never surfaced to the caller.
async fn download_overlay(ctx: &RenderContext, dir: &Path) -> Option<PathBuf> {
    if !ctx.config.overlay_enabled {
        return None;
    }
    let url = ctx.config.overlay_url.as_deref()?;
    let dest = dir.join("overlay.mp4");

    match fetch_to_file(&ctx.http, url, &dest).await {
        Ok(_) => Some(dest),
        Err(e) => {
            warn!(error = %e, "Overlay download failed, continuing without blend pass");
            None
        }
    }
}

/// Stage 2: floor durations, partition, write concat manifests.
async fn prepare_chunks(
    ctx: &RenderContext,
    timeline: &Timeline,
    assets: &JobAssets,
    dir: &Path,
) -> RenderResult<Vec<(Chunk, PathBuf)>> {
    let images: Vec<TimedImage> = timeline
        .images
        .iter()
        .zip(&assets.images)
        .map(|(seg, path)| TimedImage::new(path, seg.start_seconds, seg.end_seconds))
        .collect();

    let chunks = partition(images, ctx.config.images_per_chunk);
    let mut prepared = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let manifest = chunk.write_manifest(dir).await?;
        prepared.push((chunk, manifest));
    }

    ctx.progress.stage(
        Stage::Preparing,
        1.0,
        format!(
            "Partitioned {} images into {} chunks",
            timeline.images.len(),
            prepared.len()
        ),
    );

    Ok(prepared)
}

/// Stage 3: render chunks in bounded batches, collect by index.
async fn render_chunks(
    ctx: &RenderContext,
    prepared: Vec<(Chunk, PathBuf)>,
    overlay: Option<&Path>,
    dir: &Path,
) -> RenderResult<Vec<PathBuf>> {
    let total = prepared.len();
    let completed = AtomicUsize::new(0);
    let completed = &completed;

    ctx.progress
        .stage(Stage::Rendering, 0.0, format!("Rendering {total} chunks..."));

    run_batched(
        prepared,
        ctx.config.parallel_chunk_renders,
        |_, (chunk, manifest)| render_one_chunk(ctx, chunk, manifest, overlay, dir, completed, total),
    )
    .await
}

/// Two-pass transform for one chunk.
///
/// Pass-1 failure is fatal; pass-2 failure or timeout degrades to the
/// unblended segment. The overlay is cosmetic and must never sink a job.
async fn render_one_chunk(
    ctx: &RenderContext,
    chunk: Chunk,
    manifest: PathBuf,
    overlay: Option<&Path>,
    dir: &Path,
    completed: &AtomicUsize,
    total: usize,
) -> RenderResult<PathBuf> {
    let started = Instant::now();
    let raw = dir.join(format!("chunk_{:03}_raw.mp4", chunk.index));
    let final_path = dir.join(format!("chunk_{:03}.mp4", chunk.index));

    compose_chunk(&manifest, &raw).await?;

    match overlay {
        Some(overlay) => {
            match blend_overlay(
                &raw,
                overlay,
                &final_path,
                ctx.config.overlay_timeout.as_secs(),
            )
            .await
            {
                Ok(()) => {
                    // Scratch disk, not CPU, bounds large jobs; drop the
                    // intermediate as soon as the blend lands.
                    if let Err(e) = tokio::fs::remove_file(&raw).await {
                        warn!(chunk = chunk.index, error = %e, "Failed to remove intermediate segment");
                    }
                }
                Err(e) => {
                    warn!(
                        chunk = chunk.index,
                        error = %e,
                        "Overlay blend failed, falling back to unblended segment"
                    );
                    promote_raw(&raw, &final_path).await?;
                }
            }
        }
        None => promote_raw(&raw, &final_path).await?,
    }

    metrics::histogram!("reel_chunk_render_seconds").record(started.elapsed().as_secs_f64());

    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
    ctx.progress.stage(
        Stage::Rendering,
        done as f64 / total as f64,
        format!("Rendered chunk {done}/{total}"),
    );
    debug!(chunk = chunk.index, elapsed_ms = started.elapsed().as_millis() as u64, "Chunk rendered");

    Ok(final_path)
}

/// Use the pass-1 segment as the chunk's final output.
async fn promote_raw(raw: &Path, final_path: &Path) -> RenderResult<()> {
    tokio::fs::rename(raw, final_path).await?;
    Ok(())
}

/// Stage 4: concatenate in index order, optionally burn captions, mux audio.
async fn assemble(
    ctx: &RenderContext,
    segments: &[PathBuf],
    assets: &JobAssets,
    srt_content: Option<&str>,
    dir: &Path,
) -> RenderResult<PathBuf> {
    ctx.progress
        .stage(Stage::Concatenating, 0.0, "Concatenating chunks...");

    let silent = dir.join("video.mp4");
    concat_segments(segments, &dir.join("segments.txt"), &silent).await?;

    ctx.progress.stage(
        Stage::Concatenating,
        1.0,
        format!("Concatenated {} chunks", segments.len()),
    );

    let video = maybe_burn_subtitles(ctx, silent, srt_content, dir).await?;

    ctx.progress.stage(Stage::Muxing, 0.0, "Muxing audio track...");
    let final_path = dir.join("final.mp4");
    mux_audio(&video, &assets.audio, &final_path).await?;
    ctx.progress.stage(Stage::Muxing, 1.0, "Audio track muxed");

    Ok(final_path)
}

/// Burn captions when enabled and present; otherwise pass the video through.
async fn maybe_burn_subtitles(
    ctx: &RenderContext,
    video: PathBuf,
    srt_content: Option<&str>,
    dir: &Path,
) -> RenderResult<PathBuf> {
    if !ctx.config.burn_subtitles {
        return Ok(video);
    }
    let Some(srt_content) = srt_content else {
        return Ok(video);
    };

    let captions = parse_srt(srt_content);
    if captions.is_empty() {
        debug!("SRT content parsed to zero captions, skipping burn pass");
        return Ok(video);
    }

    let srt_path = dir.join("captions.srt");
    tokio::fs::write(&srt_path, format_srt(&captions)).await?;

    let subbed = dir.join("video_sub.mp4");
    burn_subtitles(&video, &srt_path, &subbed).await?;
    Ok(subbed)
}

/// Stage 5: streaming upload with heartbeat progress, then resolve the
/// public URL.
async fn publish(
    ctx: &RenderContext,
    project_id: &str,
    final_path: &Path,
) -> RenderResult<(String, u64)> {
    let key = render_key(project_id);
    let size = tokio::fs::metadata(final_path).await?.len();

    ctx.progress.stage(
        Stage::Uploading,
        0.0,
        format!("Uploading final video ({} bytes)...", size),
    );

    let upload = ctx.store.upload_file(final_path, &key, "video/mp4");
    tokio::pin!(upload);

    // Large uploads produce no intrinsic progress; synthetic heartbeats keep
    // the caller's connection from looking stalled. They creep toward, but
    // never reach, the top of the band.
    let mut ticker = tokio::time::interval(ctx.config.upload_heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    let mut beats = 0u32;
    loop {
        tokio::select! {
            result = &mut upload => {
                result?;
                break;
            }
            _ = ticker.tick() => {
                beats += 1;
                let fraction = (f64::from(beats) * 0.05).min(0.95);
                ctx.progress.stage(Stage::Uploading, fraction, "Uploading final video...");
            }
        }
    }

    let url = ctx.store.public_url(&key).await?;
    ctx.progress.stage(Stage::Uploading, 1.0, "Upload complete");

    Ok((url, size))
}

/// File extension from a URL path, falling back when it has none or an
/// implausible one.
fn asset_extension(url: &str, default: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= 4
                && !ext.contains('/')
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_lowercase()
        }
        _ => default.to_string(),
    }
}
