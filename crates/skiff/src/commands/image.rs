use colored::Colorize;
use skiff_cloud_gce::GceProvider;

pub async fn handle(provider: &GceProvider, platform: &str) -> anyhow::Result<()> {
    let image = provider.resolve_latest_image(platform).await?;

    println!("{}", image.name.green().bold());
    if let Some(family) = &image.family {
        println!("  family:  {}", family);
    }
    if let Some(created) = &image.creation_timestamp {
        println!("  created: {}", created.to_rfc3339());
    }
    if let Some(link) = &image.self_link {
        println!("  link:    {}", link.dimmed());
    }
    Ok(())
}
