// tests/test_trial.rs — Sampling trials against a scripted runtime.

mod common;

use std::fs;

use common::{single_gpu, write_kernel, BROKEN_KERNEL, GOOD_KERNEL};
use sampler_probe::addressing::AddressingMode;
use sampler_probe::error::{RuntimeError, TrialError};
use sampler_probe::probe::{output_len, INPUT_SAMPLES};
use sampler_probe::trial::SamplingTrial;

#[test]
fn every_mode_yields_full_length_output() {
    let dir = tempfile::tempdir().unwrap();
    let trial = SamplingTrial::new(write_kernel(&dir, "k.cl", GOOD_KERNEL));
    let runtime = single_gpu();
    let device = runtime.device(0, 0);

    for mode in AddressingMode::ALL {
        let data = trial.run(&runtime, &device, mode).unwrap();
        assert_eq!(data.samples.len(), output_len(INPUT_SAMPLES.len()));
        assert_eq!(data.coords.len(), 21);
    }
    assert_eq!(*runtime.calls.borrow(), AddressingMode::ALL.to_vec());
}

#[test]
fn coordinates_are_identical_across_modes() {
    let dir = tempfile::tempdir().unwrap();
    let trial = SamplingTrial::new(write_kernel(&dir, "k.cl", GOOD_KERNEL));
    let runtime = single_gpu();
    let device = runtime.device(0, 0);

    let coords: Vec<Vec<f32>> = AddressingMode::ALL
        .iter()
        .map(|&mode| trial.run(&runtime, &device, mode).unwrap().coords)
        .collect();
    assert!(coords.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn build_failure_prints_log_and_returns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let trial = SamplingTrial::new(write_kernel(&dir, "k.cl", BROKEN_KERNEL));
    let runtime = single_gpu();
    let device = runtime.device(0, 0);

    let mut coords = vec![0.25];
    let mut out = Vec::new();
    let samples = trial
        .run_into(&runtime, &device, AddressingMode::Clamp, &mut coords, &mut out)
        .unwrap();

    assert!(samples.is_empty());
    assert_eq!(coords, vec![0.25]);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "kernel build failed (-11), build info:\n\
         fake gpu0:\n\
         error: no kernel named 'sampler_test'\n"
    );
}

#[test]
fn successful_trial_replaces_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let trial = SamplingTrial::new(write_kernel(&dir, "k.cl", GOOD_KERNEL));
    let runtime = single_gpu();
    let device = runtime.device(0, 0);

    let mut coords = vec![0.25];
    let mut out = Vec::new();
    let samples = trial
        .run_into(&runtime, &device, AddressingMode::Repeat, &mut coords, &mut out)
        .unwrap();
    assert_eq!(samples.len(), 21);
    assert_eq!(coords.len(), 21);
    assert!(out.is_empty());
}

#[test]
fn runtime_failure_reports_code() {
    let dir = tempfile::tempdir().unwrap();
    let trial = SamplingTrial::new(write_kernel(&dir, "k.cl", GOOD_KERNEL));
    let runtime = single_gpu().failing(AddressingMode::MirroredRepeat);
    let device = runtime.device(0, 0);

    let err = trial.run(&runtime, &device, AddressingMode::MirroredRepeat).unwrap_err();
    match &err {
        TrialError::Runtime(e) => assert_eq!(e.code(), Some(-5)),
        other => panic!("unexpected {other:?}"),
    }

    let mut coords = Vec::new();
    let mut out = Vec::new();
    trial
        .run_into(&runtime, &device, AddressingMode::MirroredRepeat, &mut coords, &mut out)
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "clEnqueueNDRangeKernel (-5)\n");
}

#[test]
fn short_output_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let trial = SamplingTrial::new(write_kernel(&dir, "k.cl", GOOD_KERNEL));
    let mut runtime = single_gpu();
    runtime.short_output = true;
    let device = runtime.device(0, 0);

    let err = trial.run(&runtime, &device, AddressingMode::Repeat).unwrap_err();
    assert!(matches!(err, TrialError::Runtime(RuntimeError::Validation(_))), "{err:?}");
}

#[test]
fn kernel_is_reread_for_every_trial() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_kernel(&dir, "k.cl", GOOD_KERNEL);
    let trial = SamplingTrial::new(&path);
    let runtime = single_gpu();
    let device = runtime.device(0, 0);

    assert!(trial.run(&runtime, &device, AddressingMode::Repeat).is_ok());
    fs::write(&path, BROKEN_KERNEL).unwrap();
    let err = trial.run(&runtime, &device, AddressingMode::Repeat).unwrap_err();
    assert!(matches!(err, TrialError::Build { code: Some(-11), .. }));
}

#[test]
fn missing_kernel_file() {
    let dir = tempfile::tempdir().unwrap();
    let trial = SamplingTrial::new(dir.path().join("nope.cl"));
    let runtime = single_gpu();
    let device = runtime.device(0, 0);

    let err = trial.run(&runtime, &device, AddressingMode::Clamp).unwrap_err();
    assert!(matches!(err, TrialError::Source { .. }));
    // The runtime is never asked to compile anything.
    assert!(runtime.calls.borrow().is_empty());
}

#[test]
fn custom_input_changes_output_length() {
    let dir = tempfile::tempdir().unwrap();
    let trial = SamplingTrial::new(write_kernel(&dir, "k.cl", GOOD_KERNEL))
        .with_input(vec![7.0, 8.0, 9.0, 10.0]);
    let runtime = single_gpu();
    let device = runtime.device(0, 0);

    let data = trial.run(&runtime, &device, AddressingMode::ClampToEdge).unwrap();
    assert_eq!(data.samples.len(), 9);
    // Probes start N/2 = 2 texels left of the image.
    assert_eq!(data.samples[..3], [7.0, 7.0, 7.0]);
    assert_eq!(data.samples[8], 10.0);
}
