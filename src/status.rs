// System status display — shows which artifacts exist, their age and size.

use anyhow::Result;

use crate::artifacts::{ArtifactKind, ArtifactStore};

/// Display artifact status to the terminal.
pub fn show(store: &ArtifactStore) -> Result<()> {
    println!("Artifacts directory: {}", store.dir().display());

    let mut missing = 0;
    for kind in ArtifactKind::ALL {
        let path = store.path(kind);
        if !store.exists(kind) {
            println!("  {:<12} not found", kind.as_str());
            missing += 1;
            continue;
        }

        let size = std::fs::metadata(&path)
            .map(|m| format_bytes(m.len()))
            .unwrap_or_else(|_| "unknown".to_string());
        match store.header(kind) {
            Ok((version, created_at)) => println!(
                "  {:<12} {} (schema v{}, written {})",
                kind.as_str(),
                size,
                version,
                created_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            Err(e) => println!("  {:<12} {} (unreadable: {})", kind.as_str(), size, e),
        }
    }

    if missing > 0 {
        println!("\nRun `medtag train` to produce the missing artifacts.");
        return Ok(());
    }

    match store.load_label_space() {
        Ok(labels) => println!("Labels: {}", labels.value.classes().join(", ")),
        Err(e) => println!("Labels: {e}"),
    }
    match store.load_evaluation() {
        Ok(eval) => println!(
            "Last run: {} train / {} test rows, test micro F1 {:.3}",
            eval.value.split.train, eval.value.split.test, eval.value.test_report.micro_avg.f1_score
        ),
        Err(e) => println!("Last run: {e}"),
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_show_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        show(&ArtifactStore::new(dir.path())).unwrap();
    }
}
