//! CLI tool to run a saved hall-of-honor screenshot through the vision pipeline.
//! Usage: cargo run -p hoh-vision --features cli --bin analyze_popup -- <screenshot> [output_dir] [templates_dir]

use anyhow::{Context, Result};
use hoh_capture::{crop_rect, load_screenshot};
use hoh_data::DEFAULT_TEMPLATE_BORDER;
use hoh_vision::{
    classify_icons, locate_popup, prepare_value_crop, segment_icons, DigitReader,
    ReferenceLibrary, ValueCrop, VisionConfig,
};
use std::path::PathBuf;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <screenshot> [output_dir] [templates_dir]",
            args[0]
        );
        std::process::exit(1);
    }

    let input_path = PathBuf::from(&args[1]);
    let output_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./debug_output"));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let config = VisionConfig::default();
    let crop = ValueCrop::default();

    println!("Loading image: {}", input_path.display());
    let img = load_screenshot(&input_path)?;
    println!("Image size: {}x{}", img.width(), img.height());

    println!("\n=== Popup ===");
    let Some(popup) = locate_popup(&img, &config) else {
        println!("Popup: NOT FOUND");
        return Ok(());
    };
    println!("Popup size: {}x{}", popup.width(), popup.height());
    popup
        .save(output_dir.join("popup.png"))
        .context("Failed to save popup")?;

    println!("\n=== Icons ===");
    let regions = segment_icons(&popup, &config);
    println!("Icon regions: {}", regions.len());
    for (i, region) in regions.iter().enumerate() {
        let b = &region.bounds;
        println!(
            "  Icon {}: x={} y={} w={} h={} area={:.0}",
            i, b.x, b.y, b.width, b.height, region.area
        );
        let _ = crop_rect(&popup, b).save(output_dir.join(format!("icon_{}.png", i)));
        let value = prepare_value_crop(&popup, b, &crop);
        let _ = value.save(output_dir.join(format!("value_{}.png", i)));
    }

    let Some(templates_dir) = args.get(3).map(PathBuf::from) else {
        println!("\nDebug images saved to: {}", output_dir.display());
        return Ok(());
    };

    println!("\n=== Classification ===");
    let library = ReferenceLibrary::load(&templates_dir, DEFAULT_TEMPLATE_BORDER, &config)?;
    println!("Reference icons: {}", library.icon_count());

    let reader = DigitReader::new(&crop.whitelist);
    for (i, icon) in classify_icons(&popup, &library, &config).iter().enumerate() {
        match icon.classification.troop_type {
            Some(troop) => {
                let value = if reader.is_available() {
                    let prepared = prepare_value_crop(&popup, &icon.region.bounds, &crop);
                    format!("{:?}", reader.read_count(&prepared))
                } else {
                    "OCR unavailable".to_string()
                };
                println!(
                    "  Icon {}: {} ({} matches) value: {}",
                    i, troop, icon.classification.matches, value
                );
            }
            None => println!("  Icon {}: unclassified", i),
        }
    }

    println!("\nDebug images saved to: {}", output_dir.display());
    Ok(())
}
