use docket_bench::{mark_comments, sample_source, tokenize};
use docket_core::TokenizerConfig;
use docket_tokenizer::{LineBoundsMode, Tokenizer};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Benchmark splitting source text into tokens and lines.
fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    let config = TokenizerConfig::default();

    for functions in [100, 1000] {
        let source = sample_source(functions);
        group.bench_function(format!("{functions}_functions"), |b| {
            b.iter(|| {
                let tokenizer = tokenize(black_box(&source), &config);
                assert!(tokenizer.token_count() > functions);
            });
        });
    }

    group.finish();
}

/// Benchmark walking every token forward, then every line with its bounds
/// and indent.
fn bench_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk");
    let tokenizer = Tokenizer::new(sample_source(1000));

    group.bench_function("tokens", |b| {
        b.iter(|| {
            let mut it = tokenizer.first_token();
            let mut bytes = 0;
            while it.is_in_bounds() {
                bytes += it.raw_text_length();
                it.next();
            }
            assert_eq!(bytes, tokenizer.raw_text().len());
        });
    });

    group.bench_function("lines_with_indent", |b| {
        b.iter(|| {
            let mut line = tokenizer.first_line();
            let mut indent = 0;
            while line.is_in_bounds() {
                indent += line.indent(LineBoundsMode::ExcludeWhitespace);
                black_box(line.text(LineBoundsMode::ExcludeWhitespace));
                line.next();
            }
            black_box(indent);
        });
    });

    group.finish();
}

/// Benchmark a comment pass that reclassifies tokens and searches within
/// lines. Each iteration tokenizes afresh so reclassification starts clean.
fn bench_comment_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("comment_pass");
    let source = sample_source(1000);
    let config = TokenizerConfig::default();

    group.bench_function("1000_functions", |b| {
        b.iter(|| {
            let tokenizer = tokenize(&source, &config);
            let titles = mark_comments(&tokenizer);
            assert_eq!(titles.len(), 1000);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_walk, bench_comment_pass);
criterion_main!(benches);
