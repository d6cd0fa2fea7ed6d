//! Resource extraction from Terraform plan and state JSON.
//!
//! Pricing lives elsewhere; this parser only lists the managed resources a
//! payload describes so they can be handed on.
use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use crate::project::{Resource, UsageMap};

/// Turns one payload into `(past_resources, resources)`.
pub trait ResourceParser {
    fn parse_json(&self, payload: &[u8], usage: &UsageMap) -> Result<ParsedResources>;
}

/// `(past_resources, resources)`
pub type ParsedResources = (Vec<Resource>, Vec<Resource>);

#[derive(Debug, Default, Clone, Copy)]
pub struct TerraformJsonParser;

impl ResourceParser for TerraformJsonParser {
    fn parse_json(&self, payload: &[u8], usage: &UsageMap) -> Result<ParsedResources> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Err(anyhow!("empty JSON payload"));
        }
        let doc: Value = serde_json::from_slice(payload).context("decode payload")?;
        if !doc.is_object() {
            return Err(anyhow!("payload is not a JSON object"));
        }

        // Plan JSON carries the prior state and the planned values; state
        // JSON only has `values`.
        let (past_root, current_root) = if doc.get("planned_values").is_some() {
            (
                doc.pointer("/prior_state/values/root_module"),
                doc.pointer("/planned_values/root_module"),
            )
        } else {
            (None, doc.pointer("/values/root_module"))
        };

        let mut past = Vec::new();
        if let Some(module) = past_root {
            collect_module(module, usage, &mut past)?;
        }
        let mut current = Vec::new();
        if let Some(module) = current_root {
            collect_module(module, usage, &mut current)?;
        }
        Ok((past, current))
    }
}

fn collect_module(module: &Value, usage: &UsageMap, out: &mut Vec<Resource>) -> Result<()> {
    if let Some(resources) = module.get("resources").and_then(Value::as_array) {
        for raw in resources {
            if raw.get("mode").and_then(Value::as_str) == Some("data") {
                continue;
            }
            out.push(to_resource(raw, usage)?);
        }
    }
    if let Some(children) = module.get("child_modules").and_then(Value::as_array) {
        for child in children {
            collect_module(child, usage, out)?;
        }
    }
    Ok(())
}

fn to_resource(raw: &Value, usage: &UsageMap) -> Result<Resource> {
    let field = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
    let address = field("address").ok_or_else(|| anyhow!("resource without address"))?;
    let usage = usage
        .get(&address)
        .or_else(|| usage.get(&strip_index(&address)))
        .cloned();
    Ok(Resource {
        kind: field("type").unwrap_or_default(),
        name: field("name").unwrap_or_default(),
        values: raw.get("values").cloned().unwrap_or(Value::Null),
        usage,
        address,
    })
}

/// `aws_instance.web[0]` and `aws_instance.web["a"]` share usage keyed by
/// `aws_instance.web[*]`.
fn strip_index(address: &str) -> String {
    match address.rfind('[') {
        Some(idx) if address.ends_with(']') => format!("{}[*]", &address[..idx]),
        _ => address.to_string(),
    }
}
