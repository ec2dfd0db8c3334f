//! End-to-end playback scenarios through the public API
//!
//! Each test drives a headless player/engine pair: commands go through the
//! real lock-free queue and blocks are pulled the way an output stream
//! callback would.

use std::sync::mpsc::Receiver;

use stemset_core::engine::{command_channel, BlockOutcome, MixEngine, PlayerEngine, Transport};
use stemset_core::export::{mixdown, ExportProgress};
use stemset_core::{StemId, StemMap, StereoBuffer, Track, DEFAULT_SAMPLE_RATE};

const BLOCK: usize = 512;

/// Four stems of distinct constant levels, `secs` seconds long
fn stems_secs(secs: usize) -> StemMap {
    let frames = DEFAULT_SAMPLE_RATE as usize * secs;
    StemMap {
        vocals: StereoBuffer::from_mono(&vec![0.1; frames]),
        drums: StereoBuffer::from_mono(&vec![0.2; frames]),
        bass: StereoBuffer::from_mono(&vec![0.3; frames]),
        other: StereoBuffer::from_mono(&vec![0.4; frames]),
    }
}

fn drain_until_terminal(rx: Receiver<ExportProgress>) -> ExportProgress {
    loop {
        let msg = rx.recv().expect("export channel closed without terminal");
        if msg.is_terminal() {
            return msg;
        }
    }
}

#[test]
fn muting_a_stem_removes_it_from_the_mix() {
    let (mut tx, rx) = command_channel();
    let mut engine = PlayerEngine::new(DEFAULT_SAMPLE_RATE, rx);

    let track = Track::new(stems_secs(10), DEFAULT_SAMPLE_RATE).unwrap();
    tx.push(stemset_core::engine::EngineCommand::LoadTrack(Box::new(track)))
        .unwrap();
    tx.push(stemset_core::engine::EngineCommand::SetStemMuted {
        stem: StemId::Drums,
        muted: true,
    })
    .unwrap();
    tx.push(stemset_core::engine::EngineCommand::Play).unwrap();

    let mut out = StereoBuffer::silence(BLOCK);
    engine.process(&mut out);

    // 0.1 + 0.3 + 0.4, drums gone
    for frame in out.as_slice() {
        assert!((frame.left - 0.8).abs() < 1e-6);
        assert!((frame.right - 0.8).abs() < 1e-6);
    }
}

#[test]
fn seek_past_end_clamps_and_stops_after_the_tail() {
    let track = Track::new(stems_secs(1), DEFAULT_SAMPLE_RATE).unwrap();
    let len = track.len_frames();

    let mut transport = Transport::new(len);
    let mut mixer = MixEngine::new(DEFAULT_SAMPLE_RATE);
    transport.play();
    transport.seek(len * 10);

    // Clamped to the last valid frame, still playing
    assert_eq!(transport.position(), len - 1);
    assert!(transport.is_playing());

    // The next block is the one-frame tail plus silence padding
    let mut out = StereoBuffer::silence(BLOCK);
    let outcome = mixer.mix_block(&track, &mut transport, 1.0, &mut out);
    assert_eq!(outcome, BlockOutcome::Ended);
    assert!((out[0].left - 1.0).abs() < 1e-6);
    assert_eq!(out[1].left, 0.0);
    assert_eq!(transport.position(), len);
    assert!(!transport.is_playing());
}

#[test]
fn double_tempo_consumes_source_twice_as_fast() {
    let track = Track::new(stems_secs(10), DEFAULT_SAMPLE_RATE).unwrap();
    let mut transport = Transport::new(track.len_frames());
    let mut mixer = MixEngine::new(DEFAULT_SAMPLE_RATE);
    mixer.set_tempo(2.0);
    transport.play();

    // One second of output blocks
    let blocks = DEFAULT_SAMPLE_RATE as usize / BLOCK;
    let mut out = StereoBuffer::silence(BLOCK);
    for _ in 0..blocks {
        mixer.mix_block(&track, &mut transport, 1.0, &mut out);
    }

    let expected = blocks * BLOCK * 2;
    assert_eq!(transport.position(), expected);
}

#[test]
fn playback_runs_to_the_end_and_pins() {
    let track = Track::new(stems_secs(1), DEFAULT_SAMPLE_RATE).unwrap();
    let len = track.len_frames();
    let mut transport = Transport::new(len);
    let mut mixer = MixEngine::new(DEFAULT_SAMPLE_RATE);
    transport.play();

    let mut out = StereoBuffer::silence(BLOCK);
    let mut ended = false;
    for _ in 0..(len / BLOCK + 2) {
        if mixer.mix_block(&track, &mut transport, 1.0, &mut out) == BlockOutcome::Ended {
            ended = true;
            break;
        }
    }

    assert!(ended);
    assert_eq!(transport.position(), len);
    assert!(!transport.is_playing());

    // Further blocks are silence, position stays pinned
    mixer.mix_block(&track, &mut transport, 1.0, &mut out);
    assert_eq!(out.peak(), 0.0);
    assert_eq!(transport.position(), len);
}

#[test]
fn seek_then_mix_starts_at_the_target_frame() {
    // A single one-frame spike marks the seek target
    let frames = DEFAULT_SAMPLE_RATE as usize;
    let target = 10_000;
    let mut vocals = vec![0.0f32; frames];
    vocals[target] = 0.75;

    let map = StemMap {
        vocals: StereoBuffer::from_mono(&vocals),
        drums: StereoBuffer::silence(frames),
        bass: StereoBuffer::silence(frames),
        other: StereoBuffer::silence(frames),
    };
    let track = Track::new(map, DEFAULT_SAMPLE_RATE).unwrap();

    let mut transport = Transport::new(track.len_frames());
    let mut mixer = MixEngine::new(DEFAULT_SAMPLE_RATE);
    transport.seek(target);
    transport.play();

    let mut out = StereoBuffer::silence(BLOCK);
    mixer.mix_block(&track, &mut transport, 1.0, &mut out);

    assert!((out[0].left - 0.75).abs() < 1e-6);
    assert_eq!(out[1].left, 0.0);
}

#[test]
fn repeated_identity_mixes_are_deterministic() {
    let track = Track::new(stems_secs(2), DEFAULT_SAMPLE_RATE).unwrap();
    let mut mixer = MixEngine::new(DEFAULT_SAMPLE_RATE);

    let render = |mixer: &mut MixEngine| {
        let mut transport = Transport::new(track.len_frames());
        transport.play();
        let mut out = StereoBuffer::silence(BLOCK);
        let mut collected = Vec::new();
        for _ in 0..8 {
            mixer.mix_block(&track, &mut transport, 1.0, &mut out);
            collected.extend_from_slice(out.as_slice());
        }
        collected
    };

    let first = render(&mut mixer);
    let second = render(&mut mixer);
    assert_eq!(first, second);
}

#[test]
fn mixdown_matches_live_identity_mix() {
    let mut track = Track::new(stems_secs(1), DEFAULT_SAMPLE_RATE).unwrap();
    track.stem_mut(StemId::Bass).set_soloed(true);
    track.stem_mut(StemId::Vocals).set_gain(1.5);

    let offline = mixdown(&track, 0.5);

    let mut transport = Transport::new(track.len_frames());
    let mut mixer = MixEngine::new(DEFAULT_SAMPLE_RATE);
    transport.play();
    let mut live = StereoBuffer::silence(BLOCK);
    mixer.mix_block(&track, &mut transport, 0.5, &mut live);

    for i in 0..BLOCK {
        assert!((offline[i].left - live[i].left).abs() < 1e-6);
        assert!((offline[i].right - live[i].right).abs() < 1e-6);
    }
}

#[test]
fn export_service_writes_the_current_mix() {
    let (tx, rx) = command_channel();
    let mut engine = PlayerEngine::new(DEFAULT_SAMPLE_RATE, rx);
    let mut player = stemset_core::StemPlayer::from_parts(
        stemset_core::audio::CommandSender::from_producer(tx),
        engine.shared(),
        DEFAULT_SAMPLE_RATE,
    );

    player.load(stems_secs(1)).unwrap();
    player.set_stem_muted(StemId::Other, true).unwrap();
    player.play().unwrap();

    let mut out = StereoBuffer::silence(BLOCK);
    engine.process(&mut out);
    // Live block is the unmuted sum: 0.1 + 0.2 + 0.3
    assert!((out[0].left - 0.6).abs() < 1e-6);

    let path = std::env::temp_dir().join("stemset_playback_mix.wav");
    let progress = player.export_mixdown(&path).unwrap();
    let terminal = drain_until_terminal(progress);
    assert!(matches!(
        terminal,
        ExportProgress::Complete {
            jobs_exported: 1,
            ..
        }
    ));

    let mut reader = hound::WavReader::open(&path).unwrap();
    let first: f32 = reader.samples::<f32>().next().unwrap().unwrap();
    assert!((first - 0.6).abs() < 1e-6);
    let _ = std::fs::remove_file(&path);
}
