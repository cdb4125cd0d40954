use crate::utils;
use colored::Colorize;
use skiff_cloud_gce::GceProvider;

const STEPS: usize = 3;

/// Delete instance, then disk, then firewall rule
///
/// The disk cannot be deleted while the instance still holds it, so the
/// instance goes first. Absent resources count as deleted. Every step runs
/// even if an earlier one failed; the first failure is returned.
pub async fn handle(provider: &GceProvider, name: &str) -> anyhow::Result<()> {
    println!("{}", format!("Tearing down {}", name).bold());
    let mut failures = Vec::new();

    utils::step(1, STEPS, "Deleting instance");
    match provider.delete_instance(name).await {
        Ok(()) => utils::done(&format!("instance {}", name)),
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            failures.push(e);
        }
    }

    utils::step(2, STEPS, "Deleting disk");
    match provider.delete_disk(name).await {
        Ok(()) => utils::done(&format!("disk {}", name)),
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            failures.push(e);
        }
    }

    utils::step(3, STEPS, "Deleting firewall rule");
    match provider.delete_firewall(name).await {
        Ok(()) => utils::done(&format!("firewall {}", name)),
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            failures.push(e);
        }
    }

    println!();
    match failures.into_iter().next() {
        None => {
            println!("{}", format!("✓ {} is down", name).green().bold());
            Ok(())
        }
        Some(e) => Err(e.into()),
    }
}
