use crate::utils;
use colored::Colorize;
use skiff_cloud_gce::{GceProvider, metadata_fingerprint};

const STEPS: usize = 5;

pub async fn handle(provider: &GceProvider, name: &str, platform: &str) -> anyhow::Result<()> {
    // fail on a missing SSH key before anything is created
    let metadata = provider.instance_metadata()?;

    println!("{}", format!("Provisioning {} ({})", name, platform).bold());

    utils::step(1, STEPS, "Resolving image");
    let image = provider.resolve_latest_image(platform).await?;
    utils::done(&image.name);

    utils::step(2, STEPS, "Creating disk");
    let disk = provider.create_disk(name, Some(&image)).await?;
    utils::done(&format!("disk {}", name));

    utils::step(3, STEPS, "Creating instance");
    let instance = provider.create_instance(name, &disk).await?;
    utils::done(&format!("instance {}", name));

    utils::step(4, STEPS, "Setting metadata");
    let fingerprint = metadata_fingerprint(&instance)
        .ok_or_else(|| anyhow::anyhow!("instance {} has no metadata fingerprint", name))?;
    provider
        .set_instance_metadata(name, &fingerprint, &metadata)
        .await?;
    utils::done(&format!("{} metadata items", metadata.len()));

    utils::step(5, STEPS, "Creating firewall rule");
    provider.create_firewall(name).await?;
    utils::done(&format!("firewall {}", name));

    println!();
    println!("{}", format!("✓ {} is up", name).green().bold());
    println!("  {} skiff down {}", "teardown:".dimmed(), name);
    Ok(())
}
