//! Benchmarks for the fingerprinting pipeline and matcher
//!
//! Run with: cargo bench -p echomark-fingerprint

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use num_complex::Complex;

use echomark_core::{CatalogStore, MemoryCatalog, SampleBuffer};
use echomark_fingerprint::{
    peaks::{AdaptiveBand, PeakExtractor, UniformDensity},
    FingerprintConfig, Fingerprinter, MatchConfig, MatchEngine, SpectralTransform,
    SpectrogramBuilder,
};

const SAMPLE_RATE: u32 = 11025;

fn generate_complex_audio(sample_rate: u32, duration_secs: f32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            // Melody-like frequency movement over a fixed bass line
            let melody = 440.0 + 220.0 * (2.0 * std::f32::consts::PI * 0.5 * t).sin();
            0.5 * (2.0 * std::f32::consts::PI * melody * t).sin()
                + 0.3 * (2.0 * std::f32::consts::PI * 110.0 * t).sin()
                + 0.2 * (2.0 * std::f32::consts::PI * 1760.0 * t).sin()
        })
        .collect()
}

// ============================================================================
// FFT Benchmarks
// ============================================================================

fn bench_fft_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("FFT Size");
    let samples = generate_complex_audio(SAMPLE_RATE, 2.0);

    for size in [512, 1024, 2048, 4096, 16384].iter() {
        let transform = SpectralTransform::new(*size).unwrap();
        let input: Vec<Complex<f32>> = samples
            .iter()
            .take(*size)
            .map(|&s| Complex::new(s, 0.0))
            .collect();

        group.bench_with_input(BenchmarkId::new("Radix-2", size), &input, |b, input| {
            b.iter(|| black_box(transform.forward(black_box(input)).unwrap()));
        });
    }

    group.finish();
}

// ============================================================================
// Spectrogram and Peak Benchmarks
// ============================================================================

fn bench_spectrogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("Spectrogram");

    for duration in [1.0f32, 5.0, 10.0].iter() {
        let samples = generate_complex_audio(SAMPLE_RATE, *duration);
        let builder = SpectrogramBuilder::new(1024, 512).unwrap();

        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("Build", format!("{}s", duration)),
            &samples,
            |b, samples| {
                b.iter(|| black_box(builder.build(samples, SAMPLE_RATE).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_peak_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("Peak Extraction");
    let samples = generate_complex_audio(SAMPLE_RATE, 5.0);
    let spectrogram = SpectrogramBuilder::new(1024, 512)
        .unwrap()
        .build(&samples, SAMPLE_RATE)
        .unwrap();

    let strategies: Vec<Arc<dyn PeakExtractor>> = vec![
        Arc::new(UniformDensity::default()),
        Arc::new(AdaptiveBand::default()),
    ];
    for extractor in strategies {
        group.bench_function(extractor.name(), |b| {
            b.iter(|| black_box(extractor.extract(&spectrogram)));
        });
    }

    group.finish();
}

// ============================================================================
// Fingerprint Benchmarks
// ============================================================================

fn bench_fingerprint_duration(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fingerprint Duration");
    let fingerprinter = Fingerprinter::new(FingerprintConfig::default()).unwrap();

    for duration in [1.0f32, 5.0, 10.0, 30.0].iter() {
        let buffer = SampleBuffer::new(generate_complex_audio(SAMPLE_RATE, *duration), SAMPLE_RATE);

        group.bench_with_input(
            BenchmarkId::new("Fingerprint", format!("{}s", duration)),
            &buffer,
            |b, buffer| {
                b.iter(|| black_box(fingerprinter.fingerprint(buffer, "bench").unwrap()));
            },
        );
    }

    group.finish();
}

// ============================================================================
// Matching Benchmarks
// ============================================================================

fn bench_matching(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let fingerprinter = Fingerprinter::new(FingerprintConfig::default()).unwrap();
    let store = Arc::new(MemoryCatalog::new());

    runtime.block_on(async {
        for (i, duration) in [20.0f32, 25.0, 30.0, 35.0].iter().enumerate() {
            let buffer =
                SampleBuffer::new(generate_complex_audio(SAMPLE_RATE + i as u32 * 7, *duration), SAMPLE_RATE);
            let records = fingerprinter.fingerprint(&buffer, &format!("track-{}", i)).unwrap();
            store.insert(&records).await.unwrap();
        }
    });

    let clip = SampleBuffer::new(generate_complex_audio(SAMPLE_RATE, 5.0), SAMPLE_RATE);
    let query = fingerprinter.fingerprint(&clip, "query").unwrap();
    let engine = MatchEngine::new(store, MatchConfig::default()).unwrap();

    c.bench_function("Match 5s Clip", |b| {
        b.iter(|| black_box(runtime.block_on(engine.find_matches(&query)).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_fft_sizes,
    bench_spectrogram,
    bench_peak_strategies,
    bench_fingerprint_duration,
    bench_matching,
);

criterion_main!(benches);
