//! Preview narration, timeline and subtitles without audio or muxing.

use std::path::PathBuf;

use mangarecap_common::config::AppConfig;
use mangarecap_narration::planner::{DurationPolicy, NarrationPlanner};
use mangarecap_narration::subtitles::{format_srt_time, save_subtitles};
use mangarecap_page_model::page::PageStore;
use mangarecap_pipeline::{Collaborators, DocumentKind};
use mangarecap_render_engine::raster::Rasterizer;
use mangarecap_timeline::builder::build_timeline;

pub async fn run(
    config: AppConfig,
    images_dir: PathBuf,
    srt: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let collaborators = Collaborators::from_config(&config, DocumentKind::ImageDir);

    let pages = collaborators
        .rasterizer
        .rasterize(&images_dir, &images_dir)
        .await?;
    let store = PageStore::from_pages(pages)?;

    let planner = NarrationPlanner::new(
        collaborators.captioner.clone(),
        DurationPolicy::from(&config.narration),
        config.timeouts.caption(),
    );
    let segments = planner.plan(store.pages()).await?;
    let timeline = build_timeline(&segments)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
    } else {
        println!("Narration plan for {}", images_dir.display());
        println!("{}", "=".repeat(50));
        for (entry, page) in timeline.entries.iter().zip(store.pages()) {
            println!(
                "{:>4}  {} --> {}  {}",
                entry.page_number,
                format_srt_time(entry.start_secs),
                format_srt_time(entry.end_secs),
                page.image_path.display()
            );
            println!("      {}", entry.text);
        }
        println!();
        println!(
            "{} pages, {:.1}s total",
            timeline.len(),
            timeline.total_duration_secs
        );
    }

    if let Some(path) = srt {
        save_subtitles(&timeline.entries, &path).await?;
        eprintln!("Subtitles written to {}", path.display());
    }

    Ok(())
}
