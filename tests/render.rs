//! Integration tests for the CLI output path.
#![cfg(feature = "cli")]

use resonator_core::audio::{render, RenderOptions, WavOutput, NORMALIZED_PEAK};
use resonator_core::{ControlParams, Simulation, SimulationConfig};

#[test]
fn test_render_to_wav() {
    let path = std::env::temp_dir().join(format!("resonator-render-{}.wav", std::process::id()));

    let config = SimulationConfig::new().with_pipe_length(0.3);
    let controls = ControlParams::new(&config);
    let mut sim = Simulation::with_config(16000.0, config).unwrap();
    let options = RenderOptions {
        duration: 0.25,
        ..RenderOptions::default()
    };

    let mut sink = WavOutput::create(&path, 16000).expect("Failed to create WAV");
    let stats = render(&mut sim, &controls, &options, &mut sink).expect("Render failed");
    assert_eq!(stats.samples, 4000);

    let mut reader = hound::WavReader::open(&path).expect("Failed to reopen WAV");
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);

    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), 4000);
    assert!(samples.iter().all(|v| v.abs() <= NORMALIZED_PEAK));
    assert!(samples.iter().any(|&v| v != 0.0));

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_wav_create_fails_for_missing_directory() {
    let path = std::env::temp_dir()
        .join("resonator-no-such-dir")
        .join("nested")
        .join("out.wav");
    assert!(WavOutput::create(&path, 48000).is_err());
}
