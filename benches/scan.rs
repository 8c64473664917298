use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fairline::config::AppConfig;
use fairline::scanner::Scanner;
use fairline::types::{AmericanOdds, Market};

fn markets(n: usize) -> Vec<Market> {
    let books = ["pinnacle", "circa", "bookmaker", "fanduel", "draftkings", "betmgm"];
    (0..n)
        .map(|i| {
            let mut market = Market::new(format!("m{i}"), "prop", "over", "under");
            for (j, book) in books.iter().enumerate() {
                let shade = ((i + j) % 15) as i32;
                market = market
                    .with_quote(book, "over", AmericanOdds::new(-118 + shade).unwrap())
                    .with_quote(book, "under", AmericanOdds::new(-102 - shade).unwrap());
            }
            market
        })
        .collect()
}

fn bench_scan(c: &mut Criterion) {
    let scanner = Scanner::new(&AppConfig::default_config().unwrap());
    let batch = markets(1_000);
    c.bench_function("scan_1000_markets", |b| {
        b.iter(|| scanner.scan(black_box(&batch)))
    });
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
