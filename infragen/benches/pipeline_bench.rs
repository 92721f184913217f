//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use infragen::prelude::*;
use infragen::testing::PassThroughStage;

const DESCRIPTION: &str = "3 web servers behind a load balancer, a postgres database, \
    a redis cache and an s3 bucket in a vpc";

fn pass_through(stages: usize) -> Pipeline<u64> {
    let pipeline = Pipeline::new("bench");
    for i in 0..stages {
        pipeline.add_stage(Arc::new(PassThroughStage::new(format!("stage-{i}"))));
    }
    pipeline
}

fn spawn_overhead_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let ctx = RunContext::new();

    for stages in [1, 8, 32] {
        let pipeline = pass_through(stages);
        c.bench_function(&format!("pass_through_{stages}_stages"), |b| {
            b.iter(|| rt.block_on(pipeline.execute(&ctx, black_box(7))))
        });
    }
}

fn coordinator_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let ctx = RunContext::new();
    let coordinator = Coordinator::new();

    for format in ["terraform", "crossplane"] {
        let config = RunConfig::new()
            .with_description(DESCRIPTION)
            .with_format(format);
        c.bench_function(&format!("generate_{format}"), |b| {
            b.iter(|| rt.block_on(coordinator.run(&ctx, black_box(&config))))
        });
    }
}

criterion_group!(benches, spawn_overhead_benchmark, coordinator_benchmark);
criterion_main!(benches);
