use chromatune_core::tuning::semitone_index;
use chromatune_core::{
    NoteName, TunerError, closest_note, frequency_to_note, instrument_profile, note_to_frequency,
};
use pretty_assertions::assert_eq;

const REFERENCES: [f32; 5] = [420.0, 432.0, 440.0, 442.0, 460.0];

#[test]
fn every_note_round_trips_under_every_reference() {
    for reference in REFERENCES {
        for octave in 0..=8 {
            for name in NoteName::ALL {
                let freq = note_to_frequency(name.as_str(), octave, reference).unwrap();
                let note = frequency_to_note(freq, reference).unwrap();
                assert_eq!(
                    (note.name, note.octave, note.cents),
                    (name, octave, 0),
                    "{name}{octave} at A4 = {reference}"
                );
            }
        }
    }
}

#[test]
fn semitone_index_never_decreases_with_frequency() {
    for reference in REFERENCES {
        let mut previous = i32::MIN;
        let mut freq = 20.0_f32;
        while freq < 5000.0 {
            let n = semitone_index(freq, reference).unwrap();
            assert!(n >= previous, "{freq} Hz: {n} < {previous}");
            previous = n;
            freq *= 1.001;
        }
    }
}

#[test]
fn cents_stay_within_half_a_semitone() {
    for reference in REFERENCES {
        let mut freq = 16.0_f32;
        while freq < 8000.0 {
            let note = frequency_to_note(freq, reference).unwrap();
            assert!((-50..=50).contains(&note.cents), "{freq} Hz: {}", note.cents);

            let closest = closest_note(freq, reference).unwrap();
            assert_eq!(closest.cents, note.cents);
            freq *= 1.0037;
        }
    }
}

#[test]
fn halfway_frequencies_sit_on_the_cents_boundary() {
    // Within float precision of the midpoint between A4 and A#4: whichever
    // side it lands on, the deviation is reported as a full half semitone.
    let midpoint = 440.0 * 2.0_f64.powf(0.5 / 12.0) as f32;
    let note = frequency_to_note(midpoint, 440.0).unwrap();
    match note.name {
        NoteName::A => assert_eq!(note.cents, 50),
        NoteName::ASharp => assert_eq!(note.cents, -50),
        other => panic!("midpoint mapped to {other}"),
    }

    let just_above = frequency_to_note(midpoint * 1.0001, 440.0).unwrap();
    assert_eq!((just_above.name, just_above.cents), (NoteName::ASharp, -50));
}

#[test]
fn closest_note_composes_both_directions() {
    let note = closest_note(261.0, 440.0).unwrap();
    assert_eq!((note.name, note.octave), (NoteName::C, 4));
    assert_eq!(
        note.exact_frequency,
        note_to_frequency("C", 4, 440.0).unwrap()
    );
    assert!(note.cents < 0);
}

#[test]
fn invalid_note_name_is_a_hard_error() {
    assert_eq!(
        note_to_frequency("Cb", 4, 440.0),
        Err(TunerError::InvalidNoteName("Cb".to_string()))
    );
}

#[test]
fn guitar_profile_lists_standard_tuning() {
    let guitar = instrument_profile("guitar").unwrap();
    let expected = [
        (NoteName::E, 2),
        (NoteName::A, 2),
        (NoteName::D, 3),
        (NoteName::G, 3),
        (NoteName::B, 3),
        (NoteName::E, 4),
    ];
    let actual: Vec<(NoteName, i32)> = guitar.strings.iter().map(|s| (s.name, s.octave)).collect();
    assert_eq!(actual, expected.to_vec());
    assert!(instrument_profile("unknown").is_none());
}
