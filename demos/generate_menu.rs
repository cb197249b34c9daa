use std::path::PathBuf;

use anyhow::Context;
use futures::StreamExt;
use menu_photographer::{
    EncodedImage, GeminiClient, GeminiConfig, PhotoStyle, Studio, StudioEvent,
};
use tracing_subscriber::EnvFilter;

/// Generates a photo for every dish on a menu and writes them to disk.
///
/// Usage: generate_menu [menu.txt] [style] [out_dir] [edit prompt]
///
/// Without a menu file the built-in sample menu is used. `style` is one of
/// `rustic-dark`, `bright-modern` or `social-media`. When an edit prompt is
/// given it is applied to the first successful image.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("menu_photographer=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let menu_path = args.next().filter(|p| p != "-");
    let style: PhotoStyle = args
        .next()
        .as_deref()
        .unwrap_or("bright-modern")
        .parse()?;
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "menu-photos".to_string()));
    let edit_prompt = args.next();

    let studio = Studio::new(GeminiClient::new(GeminiConfig::from_env()?));
    let count = match &menu_path {
        Some(path) => studio.load_menu_file(path)?,
        None => studio.load_menu(menu_photographer::menu::DEFAULT_MENU)?,
    };
    studio.select_style(style);

    println!("Generating {} photos in {} style...", count, style);

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;

    let mut run = studio.start_batch()?;
    while let Some(event) = run.next().await {
        match event {
            StudioEvent::ItemLoading { item, .. } => println!("  ... {}", item.dish_name),
            StudioEvent::ItemReady { item, .. } => {
                let image = EncodedImage::from_data_uri(&item.image_data)?;
                let file = out_dir.join(format!("{}.{}", slug(&item.dish_name), image.extension()));
                std::fs::write(&file, image.decode()?)?;
                println!("  ok  {} -> {}", item.dish_name, file.display());
            }
            StudioEvent::ItemFailed { item, .. } => {
                println!(
                    "  err {}: {}",
                    item.dish_name,
                    item.error_message.unwrap_or_default()
                );
            }
            StudioEvent::BatchCompleted { summary } => {
                println!(
                    "\n{}/{} generated in {:.1}s",
                    summary.succeeded,
                    summary.total,
                    summary.duration_ms as f64 / 1000.0
                );
            }
            StudioEvent::BatchStarted { .. } => {}
        }
    }

    if let Some(global) = studio.snapshot().global_error {
        eprintln!("Last error: {}", global);
    }

    if let Some(prompt) = edit_prompt {
        let snapshot = studio.snapshot();
        let Some(item) = snapshot.items.iter().find(|i| i.has_image()) else {
            anyhow::bail!("no image available to edit");
        };
        println!("\nEditing {} with \"{}\"...", item.dish_name, prompt);

        let outcome = studio.request_edit(&item.id, &prompt).await?;
        let image = EncodedImage::from_data_uri(&outcome.image_data)?;
        let file = out_dir.join(format!(
            "{}-edited.{}",
            slug(&item.dish_name),
            image.extension()
        ));
        std::fs::write(&file, image.decode()?)?;
        println!("  ok  {}", file.display());
    }

    Ok(())
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}
