//! Check external tool availability.

use mangarecap_common::config::{config_file_path, AppConfig};
use mangarecap_pipeline::{Collaborators, DocumentKind};
use mangarecap_render_engine::probe::command_exists;

/// One line of the check report.
#[derive(Debug)]
struct BackendStatus {
    name: String,
    available: bool,
    purpose: &'static str,
    required: bool,
}

/// Availability of every backend the configuration selects.
///
/// Rasterizers are optional one by one; at least one of them must work.
fn backend_statuses(config: &AppConfig) -> Vec<BackendStatus> {
    let pdf = Collaborators::from_config(config, DocumentKind::Pdf);
    let images = Collaborators::from_config(config, DocumentKind::ImageDir);

    let mut statuses = vec![
        BackendStatus {
            name: pdf.muxer.name().to_string(),
            available: pdf.muxer.is_available(),
            purpose: "video assembly",
            required: true,
        },
        BackendStatus {
            name: pdf.synthesizer.name().to_string(),
            available: pdf.synthesizer.is_available(),
            purpose: "narration audio",
            required: true,
        },
        // Duration probing has no backend trait of its own.
        BackendStatus {
            name: "ffprobe".to_string(),
            available: command_exists("ffprobe"),
            purpose: "audio duration measurement",
            required: true,
        },
    ];

    for (rasterizer, purpose) in [
        (&pdf.rasterizer, "PDF rasterization"),
        (&images.rasterizer, "page images (--images)"),
    ] {
        statuses.push(BackendStatus {
            name: rasterizer.name().to_string(),
            available: rasterizer.is_available(),
            purpose,
            required: false,
        });
    }

    if let Some(program) = config
        .narration
        .caption_command
        .as_ref()
        .and_then(|c| c.first())
    {
        statuses.push(BackendStatus {
            name: program.clone(),
            available: command_exists(program),
            purpose: "configured caption program",
            required: true,
        });
    }

    statuses
}

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Manga Recap System Check");
    println!("{}", "=".repeat(50));

    let statuses = backend_statuses(config);
    for status in &statuses {
        report(status);
    }
    if config.narration.caption_command.is_none() {
        println!("[--] No caption program configured; using built-in templates");
    }

    let required_ok = statuses.iter().all(|s| s.available || !s.required)
        && statuses.iter().any(|s| !s.required && s.available);

    println!();
    println!("Config file: {}", config_file_path().display());
    println!("Work dir:    {}", config.work_dir.display());
    println!("Outputs:     {}", config.outputs_dir.display());

    println!();
    if required_ok {
        println!("All required tools are available. Manga Recap is ready.");
    } else {
        println!("Some required tools are missing. Install them and re-run the check.");
    }

    Ok(())
}

fn report(status: &BackendStatus) {
    let tag = if status.available { "OK" } else { "MISSING" };
    println!("[{tag}] {}: {}", status.name, status.purpose);
}
