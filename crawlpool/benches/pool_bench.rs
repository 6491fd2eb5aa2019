//! Benchmarks for pool throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crawlpool::http::Request;
use crawlpool::testing::MockFetcher;
use crawlpool::Crawler;
use std::sync::Arc;

const ITEMS: u64 = 200;

async fn crawl(size: usize) -> i64 {
    let crawler = Crawler::builder(size)
        .with_fetcher(Arc::new(MockFetcher::ok()))
        .build()
        .expect("valid pool");
    crawler.start().await;

    let producer = {
        let crawler = crawler.clone();
        tokio::spawn(async move {
            for n in 0..ITEMS {
                let request = Request::get(format!("http://bench.local/{n}")).expect("valid target");
                crawler.queue().push_request(request).await.expect("queue open");
            }
        })
    };
    for _ in 0..ITEMS {
        black_box(crawler.queue().pop_response().await);
    }
    producer.await.expect("producer finished");

    crawler.stop().await;
    crawler.wait().await;
    crawler.tracker().responses().size()
}

fn pool_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("pool");
    group.throughput(Throughput::Elements(ITEMS));

    for size in [1, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.to_async(&runtime).iter(|| crawl(size));
        });
    }
    group.finish();
}

criterion_group!(benches, pool_benchmark);
criterion_main!(benches);
