//! Benchmarks for stackforge assembly and emission.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stackforge::core::config::{parse_config, ClusterConfig, NetworkConfig};
use stackforge::core::graph::ResourceNode;
use stackforge::core::naming::Tier;
use stackforge::core::resolver::creation_order;
use stackforge::core::template::Template;
use stackforge::core::types::ResourceKind;
use stackforge::stacks::{app_cluster, network, Payloads};

fn payloads() -> Payloads {
    Payloads::new()
        .with(Tier::Spa, "#!/bin/bash\necho spa\n")
        .with(Tier::Api, "#!/bin/bash\necho api\n")
}

fn bench_assemble(c: &mut Criterion) {
    let cluster = ClusterConfig::default();
    let net = NetworkConfig::default();
    let payloads = payloads();

    let mut group = c.benchmark_group("assemble");
    group.bench_function("network", |b| {
        b.iter(|| black_box(network::assemble(black_box(&net)).unwrap()));
    });
    group.bench_function("app_cluster", |b| {
        b.iter(|| black_box(app_cluster::assemble(black_box(&cluster), &payloads).unwrap()));
    });
    group.finish();
}

fn bench_emit(c: &mut Criterion) {
    let template = app_cluster::assemble(&ClusterConfig::default(), &payloads()).unwrap();
    let doc = template.emit().unwrap();

    let mut group = c.benchmark_group("emit");
    group.bench_function("app_cluster", |b| {
        b.iter(|| black_box(template.emit().unwrap()));
    });
    group.bench_function("to_json", |b| {
        b.iter(|| black_box(doc.to_json().unwrap()));
    });
    group.bench_function("fingerprint", |b| {
        b.iter(|| black_box(doc.fingerprint()));
    });
    group.finish();
}

fn bench_config_parse(c: &mut Criterion) {
    let yaml = r#"
app_domain: example.org
host_separator: "-"
tiers:
  - tier: spa
    label: SPA
    ami: ami-1
    tags:
      env-file: [.env.dev, .env.prod]
      repo-branch: main
  - tier: api
    label: API
    ami: ami-2
    listener_priority: 1
    database_access: true
"#;
    c.bench_function("config_parse", |b| {
        b.iter(|| black_box(parse_config::<ClusterConfig>(black_box(yaml)).unwrap()));
    });
}

fn bench_creation_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("creation_order");
    for n in [10, 50, 100, 500] {
        // Chain: r0 <- r1 <- ... <- r(n-1)
        let mut t = Template::new("chain");
        let mut prev = t
            .add_node(ResourceNode::new("r0", ResourceKind::Gateway))
            .unwrap();
        for i in 1..n {
            prev = t
                .add_node(
                    ResourceNode::new(&format!("r{}", i), ResourceKind::Route)
                        .with("GatewayId", &prev),
                )
                .unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &t, |b, t| {
            b.iter(|| black_box(creation_order(black_box(&t.graph)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_assemble,
    bench_emit,
    bench_config_parse,
    bench_creation_order
);
criterion_main!(benches);
