use crate::page::Page;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use weave_runtime::node_key::is_list_item;
use weave_runtime::{MemorySurface, NodeKey, RenderSurface};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Recorded page (tree + per-instance tables)
    pub page: PathBuf,

    /// List every resolved key, not only problems
    #[arg(short, long)]
    pub verbose: bool,
}

/// One key of a page table that does not resolve on the tree
#[derive(Debug, PartialEq)]
pub struct Unresolved {
    pub instance: String,
    pub owner: String,
    pub key: String,
}

pub fn check(args: CheckArgs, _cwd: &str) -> Result<()> {
    println!("🔍 {} {}", "Checking".green().bold(), args.page.display());

    let page = Page::load(&args.page)?;
    let surface = MemorySurface::from_roots(page.tree.clone());
    let (resolved, problems) = check_page(&page, &surface);

    if args.verbose {
        for key in &resolved {
            println!("  {} {}", "✓".green(), key);
        }
    }
    for problem in &problems {
        println!(
            "  {} [{}] {} → {} not found",
            "✗".red(),
            problem.instance,
            problem.owner,
            problem.key.bright_white()
        );
    }

    println!();
    println!("   Instances: {}", page.instances.len());
    println!("   Keys resolved: {}", resolved.len());

    if !problems.is_empty() {
        return Err(anyhow::anyhow!("{} unresolved keys", problems.len()));
    }
    println!("   {} No issues found!", "✓".green());
    Ok(())
}

/// Resolve every dependency key and external-child slot against `surface`.
///
/// List items are skipped since they only exist once their anchor is written.
pub fn check_page(page: &Page, surface: &MemorySurface) -> (Vec<String>, Vec<Unresolved>) {
    let mut resolved = Vec::new();
    let mut problems = Vec::new();

    for instance in &page.instances {
        let mut record = |owner: &str, key: String, found: bool| {
            if found {
                resolved.push(key);
            } else {
                problems.push(Unresolved {
                    instance: instance.id.to_string(),
                    owner: owner.to_string(),
                    key,
                });
            }
        };
        let lookup = |element: &str| {
            let key = NodeKey::new(element, &instance.id);
            let found = surface.locate(&key).is_some();
            (key.to_string(), found)
        };

        for (name, variable) in instance.variables.iter() {
            for element in variable.dependencies.keys() {
                if !is_list_item(element) {
                    let (key, found) = lookup(element);
                    record(name, key, found);
                }
            }
        }

        for registration in instance.external_children.registrations() {
            let owner = format!("external {}", registration.object_id);
            let (key, found) = lookup(&registration.slot_id);
            record(&owner, key, found);
            for element in &registration.condition {
                let (key, found) = lookup(element);
                record(&owner, key, found);
            }
            let tagged = NodeKey::new(registration.object_id.as_str(), &instance.id);
            let found = !surface.locate_external(&tagged).is_empty();
            if !found {
                record(&owner, format!("ext {tagged}"), false);
            }
        }
    }

    (resolved, problems)
}
