//! Block-size independence of the whole pipeline
//!
//! The same register script rendered with one block per period and with many
//! small blocks per period must give the same band-limited output.

use approx::assert_abs_diff_eq;
use ym2149_synth::{
    MemorySink, MinBlockRateTimer, RefreshRate, SimpleTimer, Synth, SynthConfig, Timer,
};

/// Tone, noise and a retriggered envelope across all three channels.
fn script() -> Vec<[u8; 16]> {
    (0..40u8)
        .map(|i| {
            let mut frame = [0u8; 16];
            frame[0] = 0x1C + i;
            frame[1] = 0x01;
            frame[2] = 0x77;
            frame[4] = 0x40;
            frame[5] = 0x02;
            frame[6] = 0x03 + (i % 5);
            frame[7] = 0b0010_0000 | if i % 4 == 0 { 0x08 } else { 0x00 };
            frame[8] = 0x0F;
            frame[9] = 0x10;
            frame[10] = 0x0B;
            frame[11] = 0x20;
            frame[13] = if i % 10 == 0 { 0x0E } else { 0xFF };
            frame
        })
        .collect()
}

fn render(config: &SynthConfig, timer: Box<dyn Timer>) -> Vec<f32> {
    render_with(config, timer, |_| {})
}

fn render_with(
    config: &SynthConfig,
    timer: Box<dyn Timer>,
    setup: impl Fn(&Synth<MemorySink>),
) -> Vec<f32> {
    let sink = MemorySink::new(config.output_channels());
    let mut synth = Synth::with_timer(config, sink, timer).unwrap();
    setup(&synth);
    synth.play_frames(&script(), RefreshRate::from(50)).unwrap();
    synth.into_sink().samples
}

fn assert_same(a: &[f32], b: &[f32]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert_abs_diff_eq!(x, y, epsilon = 2.0);
    }
}

#[test]
fn test_block_size_does_not_change_output() {
    let config = SynthConfig::default();
    let whole = render(&config, Box::new(SimpleTimer::new(config.naive_rate())));
    let split = render(
        &config,
        Box::new(MinBlockRateTimer::new(config.naive_rate(), 1_700)),
    );
    assert_eq!(whole.len(), 40 * 882);
    assert_same(&whole, &split);
}

#[test]
fn test_stereo_block_size_does_not_change_output() {
    let config = SynthConfig {
        stereo: true,
        ..SynthConfig::default()
    };
    let whole = render(&config, Box::new(SimpleTimer::new(config.naive_rate())));
    let split = render(
        &config,
        Box::new(MinBlockRateTimer::new(config.naive_rate(), 333)),
    );
    assert_eq!(whole.len(), 2 * 40 * 882);
    assert_same(&whole, &split);
}

#[test]
fn test_underclocked_render_matches_split() {
    let config = SynthConfig {
        underclock: 4,
        ..SynthConfig::default()
    };
    let whole = render(&config, Box::new(SimpleTimer::new(config.naive_rate())));
    let split = render(
        &config,
        Box::new(MinBlockRateTimer::new(config.naive_rate(), 900)),
    );
    assert_eq!(whole.len(), 40 * 882);
    assert_same(&whole, &split);
}

#[test]
fn test_timer_synth_matches_split() {
    // Prescaler 4, data 96: 384 MFP ticks, 312.5 naive frames per step.
    let timer_on_c = |synth: &Synth<MemorySink>| synth.chip().set_timer_synth(2, 1, 96);
    let config = SynthConfig::default();
    let whole = render_with(
        &config,
        Box::new(SimpleTimer::new(config.naive_rate())),
        timer_on_c,
    );
    let split = render_with(
        &config,
        Box::new(MinBlockRateTimer::new(config.naive_rate(), 1_333)),
        timer_on_c,
    );
    assert_eq!(whole.len(), 40 * 882);
    assert_same(&whole, &split);
    let plain = render(&config, Box::new(SimpleTimer::new(config.naive_rate())));
    assert!(
        whole.iter().zip(&plain).any(|(a, b)| (a - b).abs() > 100.0),
        "timer synth must change channel C"
    );
}
