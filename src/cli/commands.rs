use crate::app::{AppContext, Result};
use crate::store::Store;
use crate::sync::RunOutcome;

pub async fn sync(ctx: &AppContext) -> Result<()> {
    match ctx.job.run().await? {
        RunOutcome::Completed(mirrored) => {
            if mirrored.is_empty() {
                println!("Already up to date");
            } else {
                println!("Mirrored {} new pictures:", mirrored.len());
                for picture in mirrored {
                    println!("  {} ({})", picture.file_name(), picture.published_at);
                }
            }
        }
        RunOutcome::Skipped => {
            println!("A sync is already in progress");
        }
    }

    Ok(())
}

pub fn list(ctx: &AppContext) -> Result<()> {
    let pictures = ctx.store.all_pictures()?;

    if pictures.is_empty() {
        println!("No pictures mirrored yet");
        return Ok(());
    }

    for picture in &pictures {
        println!(
            "{:>10}  {}  {}",
            picture.external_id,
            picture.published_at.format("%Y-%m-%d %H:%M:%S"),
            picture.link
        );
    }
    println!("{} pictures in {}", pictures.len(), ctx.storage_dir.display());

    Ok(())
}
