use std::f64::consts::PI;

use approx::assert_relative_eq;
use exg_filters::filters::design::{notch_coefficients, sections_to_transfer_function};
use exg_filters::{
    CascadeFilter, DirectFormFilter, FilterChain, FilterError, FilterFactory, FilterKind,
    FilterSpec, LiveFilter, Representation, StreamFilter,
};

const FS: f64 = 256.0;

fn sine(frequency: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| (2.0 * PI * frequency * i as f64 / FS).sin())
        .collect()
}

fn run(filter: &mut impl LiveFilter, input: &[f64]) -> Vec<f64> {
    input.iter().map(|&x| filter.update(x)).collect()
}

fn peak(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0f64, |m, v| m.max(v.abs()))
}

fn biopotential(representation: Representation, include_notch: bool) -> StreamFilter {
    FilterFactory::default()
        .biopotential(4, [1.0, 30.0], FS, representation, include_notch)
        .unwrap()
}

const REPRESENTATIONS: [Representation; 2] =
    [Representation::SecondOrderSections, Representation::DirectForm];

#[test]
fn slow_drift_is_strongly_attenuated() {
    for representation in REPRESENTATIONS {
        let mut filter = biopotential(representation, false);
        let out = run(&mut filter, &sine(0.1, 256));
        let leaked = peak(&out[128..]);
        assert!(leaked < 0.1, "{}: 0.1 Hz leaked {}", representation, leaked);
    }
}

#[test]
fn alpha_band_passes_near_unity() {
    for representation in REPRESENTATIONS {
        let mut filter = biopotential(representation, false);
        let out = run(&mut filter, &sine(10.0, 256));
        let amplitude = peak(&out[128..]);
        assert!(
            (0.9..=1.1).contains(&amplitude),
            "{}: 10 Hz amplitude {}",
            representation,
            amplitude
        );
    }
}

#[test]
fn constant_input_decays_to_zero() {
    let factory = FilterFactory::default();
    let filters = [
        biopotential(Representation::SecondOrderSections, false),
        factory
            .highpass(4, 1.0, FS, Representation::SecondOrderSections)
            .unwrap(),
        factory.highpass(2, 1.0, FS, Representation::DirectForm).unwrap(),
    ];

    for mut filter in filters {
        let out = run(&mut filter, &vec![1.0; 2048]);
        let last = out[out.len() - 1];
        assert!(last.abs() < 0.01, "{} kept DC: {}", filter.topology(), last);
    }
}

#[test]
fn cascade_matches_expanded_direct_form() {
    let sos = [
        [0.2, 0.4, 0.2, 1.0, -0.5, 0.25],
        [1.0, -2.0, 1.0, 1.0, -1.2, 0.5],
        [0.5, 0.0, -0.5, 1.0, 0.1, 0.3],
    ];
    let (b, a) = sections_to_transfer_function(&sos);
    let mut cascade = CascadeFilter::new(&sos).unwrap();
    let mut direct = DirectFormFilter::new(b, a).unwrap();

    let input: Vec<f64> = (0..500)
        .map(|i| (i as f64 * 0.37).sin() + 0.5 * (i as f64 * 0.05).cos() + 0.1)
        .collect();
    for x in input {
        let (c, d) = (cascade.update(x), direct.update(x));
        assert_relative_eq!(c, d, epsilon = 1e-9, max_relative = 1e-6);
    }
}

#[test]
fn missing_samples_leave_no_trace() {
    let input = sine(10.0, 300);
    let mut gapped = Vec::new();
    for (i, &x) in input.iter().enumerate() {
        if i % 7 == 3 {
            gapped.push(f64::NAN);
        }
        gapped.push(x);
    }

    // sections plus the direct-form notch stage
    let mut clean = biopotential(Representation::SecondOrderSections, true);
    let mut with_gaps = biopotential(Representation::SecondOrderSections, true);

    let expected = run(&mut clean, &input);
    let got: Vec<f64> = run(&mut with_gaps, &gapped)
        .into_iter()
        .zip(&gapped)
        .filter(|(_, x)| !x.is_nan())
        .map(|(y, _)| y)
        .collect();
    assert_eq!(got, expected);
}

#[test]
fn chain_equals_manual_composition() {
    let factory = FilterFactory::default();
    let highpass = factory
        .highpass(2, 0.5, FS, Representation::SecondOrderSections)
        .unwrap();
    let lowpass = factory
        .build(&FilterSpec {
            kind: FilterKind::Lowpass,
            order: 3,
            cutoff: vec![40.0],
            sampling_rate: FS,
            representation: Representation::DirectForm,
            include_notch: false,
        })
        .unwrap();

    let mut chain = FilterChain::new(vec![highpass.clone(), lowpass.clone()]).unwrap();
    let (mut first, mut second) = (highpass, lowpass);

    for x in sine(7.0, 200) {
        assert_eq!(chain.update(x), second.update(first.update(x)));
    }
}

#[test]
fn notch_removes_mains_and_keeps_signal() {
    let notch = || notch_coefficients(50.0, 30.0, FS).unwrap().into_filter().unwrap();

    let hum = run(&mut notch(), &sine(50.0, 2048));
    assert!(peak(&hum[1024..]) < 0.01, "50 Hz leaked: {}", peak(&hum[1024..]));

    let alpha = run(&mut notch(), &sine(10.0, 2048));
    assert_relative_eq!(peak(&alpha[1024..]), 1.0, epsilon = 0.01);
}

#[test]
fn biopotential_chain_starts_with_the_mains_notch() {
    for representation in REPRESENTATIONS {
        let full = biopotential(representation, true);
        let StreamFilter::Chain(chain) = &full else {
            panic!("{}: expected a chain, got {}", representation, full.topology());
        };
        assert_eq!(chain.len(), 2);
        let mut front = chain.stages()[0].clone();
        assert_eq!(front.topology(), "direct-form");

        let mut reference = notch_coefficients(50.0, 30.0, FS).unwrap().into_filter().unwrap();
        let input: Vec<f64> = sine(50.0, 256)
            .iter()
            .zip(sine(10.0, 256))
            .map(|(hum, alpha)| hum + alpha)
            .collect();
        assert_eq!(run(&mut front, &input), run(&mut reference, &input));

        let mut full = full;
        let hum = run(&mut full, &sine(50.0, 2048));
        let leaked = peak(&hum[1024..]);
        assert!(leaked < 0.01, "{}: 50 Hz leaked {}", representation, leaked);

        full.reset();
        let alpha = run(&mut full, &sine(10.0, 2048));
        let amplitude = peak(&alpha[1024..]);
        assert!(
            (0.9..=1.1).contains(&amplitude),
            "{}: 10 Hz through notch and band-pass {}",
            representation,
            amplitude
        );
    }
}

#[test]
fn invalid_specifications_fail_to_build() {
    let factory = FilterFactory::default();
    for (order, cutoff) in [(0, [1.0, 30.0]), (4, [30.0, 1.0])] {
        let result =
            factory.biopotential(order, cutoff, FS, Representation::SecondOrderSections, false);
        assert!(matches!(result, Err(FilterError::InvalidSpecification(_))));
    }
    assert_eq!(
        "zpk".parse::<Representation>(),
        Err(FilterError::UnsupportedRepresentation("zpk".to_string()))
    );
}
