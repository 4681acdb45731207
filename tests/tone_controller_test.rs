use variotone::config::{CurveKind, ToneConfig, VarioConfig};
use variotone::constants::{MAX_CYCLE_MS, MIN_CYCLE_MS, MIN_PULSE_MS};
use variotone::tone::{ToneController, ToneState};

fn transitions(controller: &mut ToneController, values: &[f64]) -> usize {
    let mut count = 0;
    let mut state = controller.state();
    for &v in values {
        controller.update(v).unwrap();
        if controller.state() != state {
            count += 1;
            state = controller.state();
        }
    }
    count
}

#[test]
fn test_no_chatter_inside_hysteresis_band() {
    let mut controller = ToneController::new(&ToneConfig::default(), 48000).unwrap();

    // Enter climb once, then wobble between the on and off thresholds
    let mut values = vec![0.25];
    values.extend((0..200).map(|i| if i % 2 == 0 { 0.16 } else { 0.19 }));
    assert_eq!(transitions(&mut controller, &values), 1);
    assert_eq!(controller.state(), ToneState::Climbing);

    let mut controller = ToneController::new(&ToneConfig::default(), 48000).unwrap();
    let mut values = vec![-2.2];
    values.extend((0..200).map(|i| if i % 2 == 0 { -1.85 } else { -1.95 }));
    assert_eq!(transitions(&mut controller, &values), 1);
    assert_eq!(controller.state(), ToneState::Sinking);
}

#[test]
fn test_ramp_through_all_states() {
    let mut controller = ToneController::new(&ToneConfig::default(), 48000).unwrap();
    let up: Vec<f64> = (-50..=50).map(|i| i as f64 * 0.1).collect();
    let mut states = Vec::new();
    for v in &up {
        controller.update(*v).unwrap();
        if states.last() != Some(&controller.state()) {
            states.push(controller.state());
        }
    }
    assert_eq!(
        states,
        vec![ToneState::Sinking, ToneState::Silent, ToneState::Climbing]
    );
}

#[test]
fn test_every_preset_stays_in_audio_limits() {
    for curve in [CurveKind::Table, CurveKind::Polynomial, CurveKind::Fixed] {
        for sample_rate in [44100, 48000] {
            let config = ToneConfig {
                curve,
                ..ToneConfig::default()
            };
            let mut controller = ToneController::new(&config, sample_rate).unwrap();
            for i in 0..=300 {
                let spec = controller.update(i as f64 * 0.05).unwrap();
                if controller.state() != ToneState::Climbing {
                    continue;
                }
                assert!(spec.pulse_length_ms >= MIN_PULSE_MS);
                assert!((MIN_CYCLE_MS..=MAX_CYCLE_MS).contains(&spec.cycle_ms()));
                assert!(spec.frequency_hz < sample_rate as f64 / 2.0);
                assert!(spec.amplitude > 0.0 && spec.amplitude <= 1.0);
            }
        }
    }
}

#[test]
fn test_mapping_from_toml() {
    let config = VarioConfig::from_toml_str(
        r#"
        [tone]
        volume = 0.5

        [tone.mapping.frequency]
        type = "table"
        points = [[0.0, 400.0], [4.0, 1200.0]]

        [tone.mapping.cycle_ms]
        type = "table"
        points = [[0.0, 600.0], [4.0, 200.0]]

        [tone.mapping.duty]
        type = "fixed"
        value = 0.25
        "#,
    )
    .unwrap();

    let mut controller = ToneController::new(&config.tone, config.audio.sample_rate).unwrap();
    let spec = controller.update(2.0).unwrap();

    assert!((spec.frequency_hz - 800.0).abs() < 1e-9);
    assert_eq!(spec.cycle_ms(), 400);
    assert_eq!(spec.pulse_length_ms, 100);
    assert_eq!(spec.silence_length_ms, 300);
    assert_eq!(spec.amplitude, 0.5);

    // Beyond the table the curve is held flat
    let spec = controller.update(9.0).unwrap();
    assert!((spec.frequency_hz - 1200.0).abs() < 1e-9);
    assert_eq!(spec.cycle_ms(), 200);
}

#[test]
fn test_empty_table_in_config_is_rejected() {
    let config = VarioConfig::from_toml_str(
        r#"
        [tone.mapping.frequency]
        type = "table"
        points = []

        [tone.mapping.cycle_ms]
        type = "fixed"
        value = 300.0

        [tone.mapping.duty]
        type = "fixed"
        value = 0.5
        "#,
    )
    .unwrap();

    assert!(ToneController::new(&config.tone, 48000).is_err());
}
