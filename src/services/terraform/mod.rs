// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Terraform inputs: plan JSON and raw `.tf` sources.

pub mod hcl;
pub mod plan;
pub mod resolve;

pub use hcl::{parse_hcl_files, HclModule};
pub use plan::{managed_changes, parse_plan, parse_plan_value, PlanError};
pub use resolve::{is_unresolved_reference, link_launch_templates, resolve_references};

use crate::models::plan::ResourceChange;

/// Scan `.tf` sources and return resources with references resolved and
/// launch templates linked to their autoscaling groups.
pub fn resources_from_hcl(files: &[String]) -> Vec<ResourceChange> {
    let HclModule {
        mut resources,
        variables,
        locals,
    } = parse_hcl_files(files);
    resolve_references(&mut resources, &variables, &locals);
    link_launch_templates(&mut resources);
    resources
}
