//! FILENAME: ranking-engine/benches/order_computation.rs
//! Benchmarks the full filter/group/sort pass over synthetic rows.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ranking_engine::{compute_order, LocalTable};
use ranking_model::{Column, ColumnDesc, DataValue, NumberFilter, Ranking, SortCriterion};

const ROWS: usize = 10_000;

fn synthetic_table() -> LocalTable {
    let categories = ["alpha", "beta", "gamma", "delta"];
    let rows: Vec<Vec<DataValue>> = (0..ROWS)
        .map(|i| {
            vec![
                DataValue::Text(format!("row {}", i)),
                DataValue::Number(((i * 7919) % 1000) as f64 / 10.0),
                DataValue::Text(categories[i % categories.len()].to_string()),
            ]
        })
        .collect();
    LocalTable::with_rows(["name", "score", "kind"], rows)
}

fn synthetic_ranking() -> Ranking {
    let mut r = Ranking::new("bench");
    r.push(Column::from_desc("name", &ColumnDesc::string("Name", 0)).unwrap());
    r.push(
        Column::from_desc("score", &ColumnDesc::number("Score", 1).with_domain(0.0, 100.0))
            .unwrap(),
    );
    r.push(
        Column::from_desc(
            "kind",
            &ColumnDesc::categorical("Kind", 2, ["alpha", "beta", "gamma", "delta"]),
        )
        .unwrap(),
    );
    r
}

fn bench_sort_only(c: &mut Criterion) {
    let table = synthetic_table();
    let mut ranking = synthetic_ranking();
    ranking.set_sort_criteria(vec![
        SortCriterion::new("score", false),
        SortCriterion::new("name", true),
    ]);
    c.bench_function("sort 10k rows, two criteria", |b| {
        b.iter(|| black_box(compute_order(&ranking, &table)))
    });
}

fn bench_filter_group_sort(c: &mut Criterion) {
    let table = synthetic_table();
    let mut ranking = synthetic_ranking();
    ranking.set_number_filter("score", Some(NumberFilter::range(10.0, 90.0)));
    ranking.group_by("kind");
    ranking.set_sort_criteria(vec![SortCriterion::new("score", false)]);
    ranking.set_group_sort_criteria(vec![SortCriterion::new("rank", false)]);
    c.bench_function("filter + group + sort 10k rows", |b| {
        b.iter(|| black_box(compute_order(&ranking, &table)))
    });
}

criterion_group!(benches, bench_sort_only, bench_filter_group_sort);
criterion_main!(benches);
