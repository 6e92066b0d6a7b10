//! End-to-end rendering: scheduling totals, WAV output and the ring sink

use ym2149_synth::regdump;
use ym2149_synth::{MemorySink, RefreshRate, Register, Synth, SynthConfig, WavSink};

#[test]
fn test_three_seconds_at_50hz_is_exact() {
    let sink = MemorySink::new(1).with_buffer_size(512);
    let mut synth = Synth::new(&SynthConfig::default(), sink).unwrap();
    for _ in 0..150 {
        synth.run_period(RefreshRate::from(50)).unwrap();
    }
    assert_eq!(synth.samples_written(), 3 * 44_100);
}

#[test]
fn test_ntsc_rate_carries_fractions() {
    let mut synth = Synth::new(&SynthConfig::default(), MemorySink::new(1)).unwrap();
    let rate = RefreshRate::new(60_000, 1001).unwrap();
    for _ in 0..1001 {
        synth.run_period(rate).unwrap();
    }
    // 1001 periods of 1001/60000 s.
    let expected = 44_100.0 * 1001.0 * 1001.0 / 60_000.0;
    let written = synth.samples_written() as f64;
    assert!((written - expected).abs() <= 1.0, "{written} vs {expected}");
}

#[test]
fn test_changing_rate_mid_stream_loses_nothing() {
    let mut synth = Synth::new(&SynthConfig::default(), MemorySink::new(1)).unwrap();
    for _ in 0..50 {
        synth.run_period(RefreshRate::from(50)).unwrap();
    }
    for _ in 0..200 {
        synth.run_period(RefreshRate::from(200)).unwrap();
    }
    assert_eq!(synth.samples_written(), 2 * 44_100);
}

#[test]
fn test_dump_renders_to_wav() {
    let dir = tempfile::tempdir().unwrap();
    let dump_path = dir.path().join("tune.regs");
    let wav_path = dir.path().join("tune.wav");

    let mut frame = [0u8; 16];
    frame[0] = 0x1C;
    frame[1] = 0x01;
    frame[7] = 0x3E;
    frame[8] = 0x0F;
    frame[13] = 0xFF;
    std::fs::write(&dump_path, regdump::to_bytes(&vec![frame; 25])).unwrap();

    let frames = regdump::load(&dump_path).unwrap();
    let config = SynthConfig::default();
    let sink = WavSink::create(&wav_path, 44_100, 1).unwrap();
    let mut synth = Synth::new(&config, sink).unwrap();
    let written = synth.play_frames(&frames, RefreshRate::from(50)).unwrap();
    synth.flush().unwrap();
    synth.into_sink().finalize().unwrap();
    assert_eq!(written, 22_050);

    let mut reader = hound::WavReader::open(&wav_path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), 22_050);
    let max = samples.iter().copied().max().unwrap();
    let min = samples.iter().copied().min().unwrap();
    assert!(max as i32 - min as i32 > 10_000, "440 Hz tone at full level");
}

#[test]
fn test_flags_off_silences_channel() {
    let mut synth = Synth::new(&SynthConfig::default(), MemorySink::new(1)).unwrap();
    let chip = synth.chip();
    chip.set(Register::ToneALo, 0x1C);
    chip.set(Register::ToneAHi, 0x01);
    chip.set(Register::MixerCtrl, 0x3E);
    chip.set(Register::LevelA, 0x0F);
    chip.flags_off(0);
    synth.run_period(RefreshRate::from(50)).unwrap();
    let samples = &synth.sink().samples;
    let first = samples[0];
    assert!(samples.iter().all(|&s| (s - first).abs() < 1e-3));
}

#[cfg(feature = "streaming")]
#[test]
fn test_ring_sink_feeds_consumer_thread() {
    use ym2149_synth::{RingSink, StreamConfig};

    let sink = RingSink::new(StreamConfig::low_latency(44_100)).unwrap();
    let ring = sink.buffer();
    let consumer = std::thread::spawn(move || {
        let mut total = 0;
        let mut chunk = [0.0f32; 512];
        while total < 44_100 {
            total += ring.read(&mut chunk);
            std::thread::yield_now();
        }
        total
    });

    let mut synth = Synth::new(&SynthConfig::default(), sink).unwrap();
    synth.chip().set(Register::LevelA, 0x0F);
    for _ in 0..50 {
        synth.run_period(RefreshRate::from(50)).unwrap();
    }
    assert_eq!(consumer.join().unwrap(), 44_100);
    assert_eq!(synth.sink().stats().samples_queued, 44_100);
}
