use std::collections::HashMap;
use std::hint::black_box;

use catalog::CatalogItem;
use common::ItemId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{OrderItemRequest, normalize, price_order, request_hash};

fn requests(n: i64) -> Vec<OrderItemRequest> {
    // Every id appears twice to exercise merging
    (1..=n)
        .chain(1..=n)
        .map(|id| OrderItemRequest::new(id, id % 7 + 1))
        .collect()
}

fn snapshots(n: i64) -> HashMap<ItemId, CatalogItem> {
    (1..=n)
        .map(|id| {
            (
                ItemId::new(id),
                CatalogItem {
                    id: ItemId::new(id),
                    title: format!("Title {id}"),
                    author: format!("Author {id}"),
                    description: String::new(),
                    price: format!("{}.{:02}", id % 50 + 1, id % 100),
                    active: true,
                },
            )
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let items = requests(50);

    c.bench_function("order/normalize_100_items", |b| {
        b.iter(|| normalize(black_box(&items)).unwrap());
    });
}

fn bench_request_hash(c: &mut Criterion) {
    let request = normalize(&requests(50)).unwrap();

    c.bench_function("order/request_hash_50_items", |b| {
        b.iter(|| request_hash(black_box(&request)).unwrap());
    });
}

fn bench_price_order(c: &mut Criterion) {
    let request = normalize(&requests(50)).unwrap();
    let snapshots = snapshots(50);

    c.bench_function("order/price_50_lines", |b| {
        b.iter(|| price_order(black_box(&request), black_box(&snapshots)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_normalize,
    bench_request_hash,
    bench_price_order
);
criterion_main!(benches);
