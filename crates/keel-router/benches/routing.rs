//! Routing benchmarks.
//!
//! Run with: `cargo bench -p keel-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use keel_router::{RouteRegistrar, RouteTable};

fn build_table(num_routes: usize) -> RouteTable {
    let mut routes = RouteRegistrar::new();

    // Static routes
    for i in 0..num_routes / 3 {
        routes.get(&format!("/api/v1/resource{i}"), "ResourceController@index");
    }

    // Param routes
    for i in 0..num_routes / 3 {
        routes
            .get(&format!("/api/v1/resource{i}/{{id}}"), "ResourceController@show")
            .where_number(&["id"]);
    }

    // Nested routes with a trailing optional segment
    for i in 0..num_routes / 3 {
        routes.get(
            &format!("/api/v1/org/{{org}}/resource{i}/{{page?}}"),
            "OrgResourceController@index",
        );
    }

    routes.build().expect("benchmark routes are valid")
}

fn bench_static_match(c: &mut Criterion) {
    let table = build_table(100);

    c.bench_function("static_match", |b| {
        b.iter(|| black_box(table.match_route(&Method::GET, "/api/v1/resource20")));
    });
}

fn bench_param_match(c: &mut Criterion) {
    let table = build_table(100);

    c.bench_function("param_match", |b| {
        b.iter(|| black_box(table.match_route(&Method::GET, "/api/v1/resource25/12345")));
    });
}

fn bench_optional_match(c: &mut Criterion) {
    let table = build_table(100);

    c.bench_function("optional_match", |b| {
        b.iter(|| black_box(table.match_route(&Method::GET, "/api/v1/org/acme/resource10")));
    });
}

fn bench_miss(c: &mut Criterion) {
    let table = build_table(100);

    c.bench_function("miss", |b| {
        b.iter(|| black_box(table.match_route(&Method::GET, "/api/v1/nonexistent/path")));
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for num_routes in [10, 50, 100, 500, 1000] {
        let table = build_table(num_routes);

        group.bench_with_input(
            BenchmarkId::new("param_match", num_routes),
            &num_routes,
            |b, &n| {
                let path = format!("/api/v1/resource{}/12345", n / 6);
                b.iter(|| black_box(table.match_route(&Method::GET, &path)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_static_match,
    bench_param_match,
    bench_optional_match,
    bench_miss,
    bench_scaling
);
criterion_main!(benches);
