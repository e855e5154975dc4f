use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use tfcost::config::UsageDefaults;
use tfcost::services::terraform::resources_from_hcl;
use tfcost::services::{CostEstimator, PricingService};

/// A small but varied stack: counted instances, an ASG on a launch
/// template, storage, networking, and a database.
const STACK_TF: &str = r#"
variable "web_type" {
  default = "m5.large"
}

locals {
  replicas = 4
}

resource "aws_instance" "web" {
  count         = local.replicas
  instance_type = var.web_type

  root_block_device {
    volume_type = "gp3"
    volume_size = 50
  }
}

resource "aws_launch_template" "workers" {
  instance_type = "c5.large"
}

resource "aws_autoscaling_group" "workers" {
  desired_capacity = 6
  launch_template {
    id = aws_launch_template.workers.id
  }
}

resource "aws_db_instance" "main" {
  engine            = "postgres"
  instance_class    = "db.m5.large"
  allocated_storage = 200
  multi_az          = true
}

resource "aws_nat_gateway" "nat" {}
resource "aws_eip" "nat" {}
resource "aws_lb" "front" {
  load_balancer_type = "application"
}
resource "aws_s3_bucket" "assets" {}
resource "aws_iam_role" "app" {}
"#;

fn benchmark_estimate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to start runtime");
    let files = vec![STACK_TF.to_string()];

    let mut group = c.benchmark_group("estimate");

    group.bench_function("scan_hcl", |b| {
        b.iter(|| resources_from_hcl(black_box(&files)))
    });

    // Warm cache after the first iteration, so this measures the pricing
    // fan-out and aggregation rather than catalog lookups.
    let estimator = CostEstimator::new(Arc::new(PricingService::offline()), UsageDefaults::default());
    group.bench_function("estimate_hcl_stack", |b| {
        b.iter(|| {
            let resources = resources_from_hcl(black_box(&files));
            rt.block_on(estimator.estimate(resources, "us-east-1"))
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_estimate);
criterion_main!(benches);
