//! End-to-end pipeline scenarios against fake external tools.

#![cfg(unix)]

mod common;

use std::time::Duration;

use common::{
    Harness, FFMPEG, FFMPEG_NO_AUDIO, FFMPEG_NO_MP4, FFMPEG_STUCK, FFPROBE, TRANS_NO_SPANISH,
    WHISPER,
};
use vf_pipeline::{FileQueue, FileState};
use vf_wire::{LogEvent, ProgressStatus, QueueMonitor};

#[tokio::test]
async fn hls_and_mp4_without_preview_or_subtitles() {
    let mut h = Harness::new(&[("ffmpeg", FFMPEG), ("ffprobe", FFPROBE)]);
    h.config.resolutions = vec![1080, 720];
    h.config.stages.mp4 = true;
    h.config.stages.webp = false;
    h.config.stages.transcribe = false;

    let mut queue = FileQueue::create([&h.source], false);
    let summary = h.runner().run(&mut queue).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);

    let dest = h.destination();
    assert!(dest.is_dir());
    assert!(dest.join("1080p/1080p.m3u8").exists());
    assert!(dest.join("720p/720p.m3u8").exists());
    assert!(dest.join("video.mp4").exists());
    assert!(!dest.join("video.webp").exists());
    assert!(!dest.join("en.srt").exists());

    let manifest = std::fs::read_to_string(dest.join("main.m3u8")).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 2 * 2 + 2);
    assert_eq!(lines[0], "#EXTM3U");
    assert_eq!(lines[1], "#EXT-X-VERSION:3");
    assert_eq!(lines[3], "1080p/1080p.m3u8");
    assert_eq!(lines[5], "720p/720p.m3u8");
    assert!(lines[4].contains("RESOLUTION=1280x720"), "{manifest}");

    // File-level progress brackets the run.
    let file_progress: Vec<ProgressStatus> = h
        .events()
        .into_iter()
        .filter_map(|e| match e {
            LogEvent::Progress(p) if p.file == "movie.mp4" => Some(p.status),
            _ => None,
        })
        .collect();
    assert_eq!(file_progress.first(), Some(&ProgressStatus::Queued));
    assert_eq!(file_progress.last(), Some(&ProgressStatus::Done));
}

#[tokio::test]
async fn missing_audio_skips_transcription_but_finishes() {
    let mut h = Harness::new(&[
        ("ffmpeg", FFMPEG_NO_AUDIO),
        ("ffprobe", FFPROBE),
        ("whisper", WHISPER),
        ("trans", TRANS_NO_SPANISH),
    ]);
    h.config.resolutions = vec![720];
    h.config.stages.transcribe = true;
    h.config.transcription.translate_to = vec!["fr".into()];

    let mut queue = FileQueue::create([&h.source], false);
    let summary = h.runner().run(&mut queue).await.unwrap();

    assert_eq!(summary.completed, 1);
    let report = &summary.files[0];
    assert_eq!(report.state, FileState::Done);
    assert_eq!(report.failed_stages, ["audio"]);

    let dest = h.destination();
    assert!(dest.join("main.m3u8").exists());
    assert!(dest.join("video.mp4").exists());
    assert!(dest.join("video.webp").exists());
    assert!(!dest.join("en.srt").exists());
    assert!(!dest.join("fr.srt").exists());

    let processes: Vec<String> = h
        .events()
        .into_iter()
        .filter_map(|e| match e {
            LogEvent::Step(s) if s.status == ProgressStatus::Working => Some(s.process),
            _ => None,
        })
        .collect();
    assert!(!processes.iter().any(|p| p == "transcribe" || p == "translate"));
    assert!(processes.iter().any(|p| p == "cleanup"));
}

#[tokio::test]
async fn one_failed_translation_keeps_the_others() {
    let mut h = Harness::new(&[
        ("ffmpeg", FFMPEG),
        ("ffprobe", FFPROBE),
        ("whisper", WHISPER),
        ("trans", TRANS_NO_SPANISH),
    ]);
    h.config.resolutions = vec![480];
    h.config.stages.webp = false;
    h.config.transcription.translate_to = vec!["es".into(), "fr".into()];

    let mut queue = FileQueue::create([&h.source], false);
    let summary = h.runner().run(&mut queue).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert!(summary.files[0].failed_stages.is_empty());

    let dest = h.destination();
    assert!(dest.join("en.srt").exists());
    assert!(dest.join("fr.srt").exists());
    assert!(!dest.join("es.srt").exists());
    // The extracted audio is cleaned up once subtitles exist.
    assert!(!dest.join("audio.mp4").exists());
}

#[tokio::test]
async fn unsupported_inputs_shrink_the_batch() {
    let h = Harness::new(&[("ffmpeg", FFMPEG), ("ffprobe", FFPROBE)]);
    let notes = h.dir.path().join("notes.txt");
    std::fs::write(&notes, b"").unwrap();

    let queue = FileQueue::create([&h.source, &notes], false);
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn missing_output_fails_before_any_file() {
    let mut h = Harness::new(&[("ffmpeg", FFMPEG)]);
    h.config.output = None;
    let reporter = vf_wire::Reporter::with_writer(vf_core::config::ReportFormat::Json, h.out.clone());
    assert!(vf_pipeline::Runner::new(h.config.clone(), h.tools(), reporter).is_err());
    assert!(h.out.lines().is_empty());
}

#[tokio::test]
async fn monitor_agrees_with_runner_for_an_input_named_like_an_artifact() {
    let mut h = Harness::new(&[("ffmpeg", FFMPEG_NO_MP4), ("ffprobe", FFPROBE)]);
    h.config.resolutions = vec![720];
    h.config.stages.webp = false;
    h.config.stages.transcribe = false;
    let source = h.dir.path().join("video.mp4");
    std::fs::write(&source, b"not really video").unwrap();

    let mut queue = FileQueue::create([&source], false);
    let summary = h.runner().run(&mut queue).await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.files[0].failed_stages, ["compress"]);

    let mut monitor = QueueMonitor::new();
    for event in h.events() {
        monitor.apply(&event);
    }
    assert_eq!(monitor.completed(), 1);
    assert_eq!(monitor.failed(), 0);
    let view = monitor.file("video.mp4").unwrap();
    assert_eq!(view.status, ProgressStatus::Done);
    assert_eq!(
        view.artifact("video.mp4").map(|a| a.status),
        Some(ProgressStatus::Error)
    );
}

#[tokio::test]
async fn same_file_name_from_two_folders_is_counted_twice() {
    let mut h = Harness::new(&[("ffmpeg", FFMPEG), ("ffprobe", FFPROBE)]);
    h.config.resolutions = vec![480];
    h.config.stages.mp4 = false;
    h.config.stages.webp = false;
    h.config.stages.transcribe = false;

    let mut sources = Vec::new();
    for folder in ["a", "b"] {
        let dir = h.dir.path().join(folder);
        std::fs::create_dir_all(&dir).unwrap();
        let source = dir.join("clip.mp4");
        std::fs::write(&source, b"not really video").unwrap();
        sources.push(source);
    }

    let mut queue = FileQueue::create(&sources, true);
    let summary = h.runner().run(&mut queue).await.unwrap();
    assert_eq!(summary.completed, 2);

    let mut monitor = QueueMonitor::new();
    for event in h.events() {
        monitor.apply(&event);
    }
    assert_eq!(monitor.files().len(), 2);
    assert_eq!(monitor.completed(), 2);
}

#[tokio::test]
async fn cancelled_file_is_not_counted_as_completed() {
    let mut h = Harness::new(&[("ffmpeg", FFMPEG_STUCK), ("ffprobe", FFPROBE)]);
    h.config.resolutions = vec![720];
    h.config.stages.transcribe = true;

    let runner = h.runner();
    let handle = runner.handle();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.cancel();
    });

    let mut queue = FileQueue::create([&h.source], false);
    let summary = tokio::time::timeout(Duration::from_secs(20), runner.run(&mut queue))
        .await
        .expect("cancel should stop the stuck encoder")
        .unwrap();
    canceller.await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.failed, 1);
    let report = &summary.files[0];
    assert_eq!(report.state, FileState::Failed);
    assert_eq!(report.failed_stages, ["transcode"]);
    assert!(report.artifacts.playlists.is_empty());
    assert!(report.artifacts.compressed.is_none());
}
