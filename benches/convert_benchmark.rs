use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sleeppod::{level_to_temp, temp_to_level, PresenceEstimator, PresenceSample, TemperatureUnit};

fn benchmark_unit_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("unit_conversion");

    group.bench_function("level_to_temp_full_sweep", |b| {
        b.iter(|| {
            for level in -100..=100 {
                black_box(level_to_temp(black_box(level), TemperatureUnit::Celsius));
            }
        })
    });

    group.bench_function("temp_to_level_full_sweep", |b| {
        b.iter(|| {
            let mut temp = 13.0;
            while temp <= 45.0 {
                black_box(temp_to_level(black_box(temp), TemperatureUnit::Celsius));
                temp += 0.25;
            }
        })
    });

    group.finish();
}

fn benchmark_presence_update(c: &mut Criterion) {
    // A night's worth of telemetry at one sample per minute
    let levels: Vec<i32> = (0..480)
        .map(|i| ((i * 37) % 110) - 30) // deterministic pseudo-noise over the level range
        .collect();

    c.bench_function("presence_full_night", |b| {
        b.iter(|| {
            let mut estimator = PresenceEstimator::default();
            for window in levels.windows(4) {
                let history = [window[3], window[2], window[1], window[0]];
                estimator.update(&PresenceSample {
                    level: history[0],
                    target: Some(10),
                    now_heating: false,
                    now_cooling: false,
                    history: &history,
                    cooling_capable: true,
                });
            }
            black_box(estimator.is_present())
        })
    });
}

criterion_group!(benches, benchmark_unit_conversion, benchmark_presence_update);
criterion_main!(benches);
