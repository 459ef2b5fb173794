use criterion::{black_box, criterion_group, criterion_main, Criterion};

use augury::ops::builtin::standard_registry;
use augury::score::{chi_squared_english, entropy, ngram_score, Crib};
use augury::{ByteBuffer, Magic, MagicConfig};

fn bench_scorekit(c: &mut Criterion) {
    let text: Vec<u8> = "the quick brown fox jumps over the lazy dog "
        .bytes()
        .cycle()
        .take(1024 * 1024)
        .collect();
    let buf = ByteBuffer::new(text);
    let crib = Crib::new();

    c.bench_function("entropy_1mb", |b| b.iter(|| entropy(black_box(&buf))));
    c.bench_function("chi_squared_1mb", |b| {
        b.iter(|| chi_squared_english(black_box(&buf)))
    });
    c.bench_function("ngram_1mb", |b| b.iter(|| ngram_score(black_box(&buf), &crib)));
}

fn bench_analyze(c: &mut Criterion) {
    let magic = Magic::new().unwrap();
    let registry = standard_registry().unwrap();

    let hex: Vec<String> = b"a moderately sized plaintext payload for the search to chew on"
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    let hex = hex.join(" ").into_bytes();

    c.bench_function("analyze_hex_default", |b| {
        b.iter(|| {
            magic
                .analyze(black_box(&hex), &registry, &MagicConfig::default())
                .unwrap()
        })
    });

    let intensive = MagicConfig { intensive: true, ..Default::default() };
    c.bench_function("analyze_hex_intensive", |b| {
        b.iter(|| magic.analyze(black_box(&hex), &registry, &intensive).unwrap())
    });
}

criterion_group!(benches, bench_scorekit, bench_analyze);
criterion_main!(benches);
