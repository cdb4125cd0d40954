use crate::DiskCommands;
use crate::utils;
use colored::Colorize;
use skiff_cloud_gce::GceProvider;

pub async fn handle(provider: &GceProvider, command: DiskCommands) -> anyhow::Result<()> {
    match command {
        DiskCommands::Create { name, image } => {
            let image = match image {
                Some(platform) => Some(provider.resolve_latest_image(&platform).await?),
                None => None,
            };
            println!("{}", format!("Creating disk {}...", name).yellow());
            let disk = provider.create_disk(&name, image.as_ref()).await?;
            utils::done(&format!(
                "disk {} ready ({} GB)",
                name,
                disk.str_field("sizeGb").unwrap_or("?")
            ));
        }
        DiskCommands::Delete { name } => {
            println!("{}", format!("Deleting disk {}...", name).yellow());
            provider.delete_disk(&name).await?;
            utils::done(&format!("disk {} deleted", name));
        }
        DiskCommands::List => {
            utils::print_documents("disks", &provider.list_disks().await?);
        }
    }
    Ok(())
}
