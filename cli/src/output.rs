//! Table formatting helpers for CLI output.

use std::time::Duration;

use comfy_table::{ContentArrangement, Table};

use imgstack_core::{PipelineOutcome, PipelineState};

/// Create a styled table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Format a duration as `1h02m`, `3m05s` or `4.2s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Status column text for one build.
pub fn format_status(exit_code: i32) -> String {
    if exit_code == 0 {
        "ok".to_string()
    } else {
        format!("failed (exit {exit_code})")
    }
}

/// Print one row per executed build, then the run's final state.
pub fn print_summary(outcome: &PipelineOutcome) {
    let mut table = new_table(&["STAGE", "PLATFORM", "TAG", "STATUS", "TIME"]);
    for stage in &outcome.stages {
        for build in &stage.builds {
            table.add_row(vec![
                stage.stage.clone(),
                build.platform.clone().unwrap_or_else(|| "host".to_string()),
                build.tag.clone(),
                format_status(build.exit_code),
                format_duration(build.elapsed),
            ]);
        }
    }

    if !outcome.stages.is_empty() {
        println!();
        println!("{table}");
    }

    match &outcome.state {
        PipelineState::Completed => {
            let count = outcome.produced_tags().len();
            println!("\nFinished building {count} image(s).");
        }
        PipelineState::Aborted { stage, .. } => {
            println!("\nStage '{stage}' FAILED. Exiting.");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(4200)), "4.2s");
        assert_eq!(format_duration(Duration::from_secs(185)), "3m05s");
        assert_eq!(format_duration(Duration::from_secs(3720)), "1h02m");
    }

    #[test]
    fn test_format_status() {
        assert_eq!(format_status(0), "ok");
        assert_eq!(format_status(127), "failed (exit 127)");
    }

    #[test]
    fn test_new_table_renders_headers() {
        let table = new_table(&["STAGE", "TAG"]);
        let rendered = table.to_string();
        assert!(rendered.contains("STAGE"));
        assert!(rendered.contains("TAG"));
    }
}
