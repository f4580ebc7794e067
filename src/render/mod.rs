use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

pub const REMOTE_BUILDING: &str = include_str!("../../templates/remote_building.tera");
pub const LEAF: &str = include_str!("../../templates/leaf.tera");
pub const COMPUTE_LEAF: &str = include_str!("../../templates/compute_leaf.tera");
pub const SPINE: &str = include_str!("../../templates/spine.tera");

/// Render a configlet template with the plan's fields as its context
pub fn render_configlet<P: Serialize>(name: &str, template: &str, plan: &P) -> Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template(name, template)
        .map_err(|e| anyhow::anyhow!("Invalid template {}: {}", name, e))?;

    let context = Context::from_serialize(plan)
        .map_err(|e| anyhow::anyhow!("Plan for {} is not a template context: {}", name, e))?;

    tera.render(name, &context)
        .map_err(|e| anyhow::anyhow!("Template rendering failed for {}: {}", name, e))
}
