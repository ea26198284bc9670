//! Locating the video a render produced.
//!
//! The engine is told where to write (`outputPath` / `LOOPLABS_OUTPUT_PATH`).
//! Engines that ignore that contract print the path they chose instead, so
//! stdout is scanned for absolute video paths as a fallback.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tokio::fs;
use tracing::{debug, info};

use crate::error::EngineResult;
use crate::fs_utils::move_file;

/// File extensions recognized as rendered video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "webm", "mkv"];

fn video_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // An absolute path starts a line or follows whitespace, a quote, `:`
        // or `=`; it may contain spaces and runs up to the first video
        // extension.
        let pattern = format!(
            r#"(?m)(?:^|[\s'"=:(\[])(/[^\r\n'"`]*?\.(?:{}))\b"#,
            VIDEO_EXTENSIONS.join("|")
        );
        Regex::new(&pattern).expect("static regex")
    })
}

/// Absolute video paths mentioned in engine output, in order of appearance.
pub fn reported_video_paths(output: &str) -> Vec<PathBuf> {
    video_path_regex()
        .captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .map(|m| PathBuf::from(m.as_str()))
        .collect()
}

/// Find the rendered video and make sure it lives inside `job_dir`.
///
/// Returns the final path, or `None` when the engine produced nothing we can
/// find. A move failure is returned as an error so the caller can decide how
/// to degrade.
pub async fn collect_video(
    expected: &Path,
    job_dir: &Path,
    stdout: &str,
) -> EngineResult<Option<PathBuf>> {
    if is_file(expected).await {
        debug!("Render engine wrote the expected output {}", expected.display());
        return Ok(Some(expected.to_path_buf()));
    }

    let mut reported = None;
    for candidate in reported_video_paths(stdout).into_iter().rev() {
        if is_file(&candidate).await {
            reported = Some(candidate);
            break;
        }
    }
    let Some(reported) = reported else {
        return Ok(None);
    };

    if reported.parent() == Some(job_dir) {
        return Ok(Some(reported));
    }

    let extension = reported
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");
    let destination = job_dir.join(format!("video.{extension}"));

    info!(
        "Relocating reported video {} -> {}",
        reported.display(),
        destination.display()
    );
    move_file(&reported, &destination).await?;
    Ok(Some(destination))
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scrapes_engine_banner() {
        let out = "MoviePy - Writing video\n\n✅ Video generated: /srv/output/looplabs_20240101_120000.mp4\n";
        assert_eq!(
            reported_video_paths(out),
            vec![PathBuf::from("/srv/output/looplabs_20240101_120000.mp4")]
        );
    }

    #[test]
    fn test_scrapes_paths_with_spaces_and_quotes() {
        let out = "Video: /Users/me/VS Code Repositories/out/loop.mp4\nsaved to '/tmp/a b/clip.webm'\n";
        assert_eq!(
            reported_video_paths(out),
            vec![
                PathBuf::from("/Users/me/VS Code Repositories/out/loop.mp4"),
                PathBuf::from("/tmp/a b/clip.webm"),
            ]
        );
    }

    #[test]
    fn test_ignores_fractions_and_other_files() {
        let out = "frame 50/100\nCaption: /srv/out/caption.txt\nt:  42%|####   | 50/120 [00:01<00:02]\n";
        assert!(reported_video_paths(out).is_empty());
    }

    #[test]
    fn test_every_video_extension_is_reported() {
        for ext in VIDEO_EXTENSIONS {
            let stdout = format!("Video generated: /tmp/out/clip.{}\n", ext);
            assert_eq!(
                reported_video_paths(&stdout),
                vec![PathBuf::from(format!("/tmp/out/clip.{}", ext))],
                "extension {}",
                ext
            );
        }
        assert!(reported_video_paths("Video generated: /tmp/out/clip.avi\n").is_empty());
    }

    #[tokio::test]
    async fn test_expected_output_wins() {
        let dir = TempDir::new().unwrap();
        let expected = dir.path().join("video.mp4");
        fs::write(&expected, b"v").await.unwrap();

        let found = collect_video(&expected, dir.path(), "").await.unwrap();
        assert_eq!(found, Some(expected));
    }

    #[tokio::test]
    async fn test_reported_video_is_moved_into_job_dir() {
        let scratch = TempDir::new().unwrap();
        let job_dir = scratch.path().join("job_1");
        fs::create_dir_all(&job_dir).await.unwrap();
        let rendered = scratch.path().join("looplabs_1.mov");
        fs::write(&rendered, b"v").await.unwrap();

        let stdout = format!("✅ Video generated: {}\n", rendered.display());
        let found = collect_video(&job_dir.join("video.mp4"), &job_dir, &stdout)
            .await
            .unwrap();

        assert_eq!(found, Some(job_dir.join("video.mov")));
        assert!(!rendered.exists());
    }

    #[tokio::test]
    async fn test_last_existing_report_is_used() {
        let scratch = TempDir::new().unwrap();
        let job_dir = scratch.path().join("job_1");
        fs::create_dir_all(&job_dir).await.unwrap();
        let real = scratch.path().join("real.mp4");
        fs::write(&real, b"v").await.unwrap();

        let stdout = format!(
            "Video: {}\nVideo: {}\n",
            real.display(),
            scratch.path().join("ghost.mp4").display()
        );
        let found = collect_video(&job_dir.join("video.mp4"), &job_dir, &stdout)
            .await
            .unwrap();
        assert_eq!(found, Some(job_dir.join("video.mp4")));
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let dir = TempDir::new().unwrap();
        let found = collect_video(&dir.path().join("video.mp4"), dir.path(), "all done\n")
            .await
            .unwrap();
        assert_eq!(found, None);
    }
}
