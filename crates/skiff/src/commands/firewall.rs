use crate::FirewallCommands;
use crate::utils;
use colored::Colorize;
use skiff_cloud_gce::GceProvider;

pub async fn handle(provider: &GceProvider, command: FirewallCommands) -> anyhow::Result<()> {
    match command {
        FirewallCommands::Create { name } => {
            println!("{}", format!("Creating firewall rule {}...", name).yellow());
            provider.create_firewall(&name).await?;
            let ports: Vec<String> = provider
                .settings()
                .firewall_ports
                .iter()
                .map(u16::to_string)
                .collect();
            utils::done(&format!("firewall {} open on tcp/{}", name, ports.join(",")));
        }
        FirewallCommands::Delete { name } => {
            println!("{}", format!("Deleting firewall rule {}...", name).yellow());
            provider.delete_firewall(&name).await?;
            utils::done(&format!("firewall {} deleted", name));
        }
        FirewallCommands::List => {
            utils::print_documents("firewall rules", &provider.list_firewalls().await?);
        }
    }
    Ok(())
}
