use crate::InstanceCommands;
use crate::utils;
use colored::Colorize;
use skiff_cloud_gce::GceProvider;

pub async fn handle(provider: &GceProvider, command: InstanceCommands) -> anyhow::Result<()> {
    match command {
        InstanceCommands::Create { name, platform } => {
            let image = provider.resolve_latest_image(&platform).await?;
            println!("{}", format!("Creating boot disk {}...", name).yellow());
            let disk = provider.create_disk(&name, Some(&image)).await?;
            println!("{}", format!("Creating instance {}...", name).yellow());
            provider.create_instance(&name, &disk).await?;
            utils::done(&format!("instance {} running {}", name, image.name));
        }
        InstanceCommands::Delete { name } => {
            println!("{}", format!("Deleting instance {}...", name).yellow());
            provider.delete_instance(&name).await?;
            utils::done(&format!("instance {} deleted", name));
        }
        InstanceCommands::List => {
            utils::print_documents("instances", &provider.list_instances().await?);
        }
    }
    Ok(())
}
