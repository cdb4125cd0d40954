use colored::Colorize;
use skiff_cloud::Document;

/// Print a listing as `name  status  zone`
pub fn print_documents(kind: &str, documents: &[Document]) {
    if documents.is_empty() {
        println!("{}", format!("No {} found", kind).dimmed());
        return;
    }

    println!("{}", format!("{} ({}):", kind, documents.len()).bold());
    for doc in documents {
        let name = doc.name().unwrap_or("<unnamed>");
        let status = doc.str_field("status").unwrap_or("-");
        let zone = doc
            .str_field("zone")
            .map(skiff_cloud::api::last_segment)
            .unwrap_or("global");
        println!("  • {:<40} {:<12} {}", name.cyan(), status, zone.dimmed());
    }
}

/// Print the step header used by multi-step commands
pub fn step(index: usize, total: usize, message: &str) {
    println!();
    println!("{}", format!("[{}/{}] {}", index, total, message).blue().bold());
}

pub fn done(message: &str) {
    println!("  {} {}", "✓".green(), message);
}
