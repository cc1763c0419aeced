use image::{ImageFormat, Rgb, RgbImage};
use image_catalog_search::domain::embedding::l2_norm;
use image_catalog_search::infra::config::AppConfig;
use image_catalog_search::infra::encoder::{ClipEncoder, ImageEncoder};
use image_catalog_search::storage::products::{PgProductStore, ProductStore};
use std::io::Cursor;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--skip-db] [--skip-model]\n\
         \n\
         Reads the same env vars as api_server (see .env):\n\
           DATABASE_URL (or POSTGRES_*), UPLOAD_DIR, CLIP_MODEL_PATH, EMBEDDING_DIMS, ...\n"
    );
    std::process::exit(2);
}

/// Small synthetic gradient, so the check needs no fixture file.
fn sample_image() -> anyhow::Result<Vec<u8>> {
    let img = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 128]));
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let skip_db = args.iter().any(|a| a == "--skip-db");
    let skip_model = args.iter().any(|a| a == "--skip-model");

    let config = AppConfig::from_env()?;

    println!("> Preflight:");
    println!("  BIND_ADDR={}", config.bind_addr);
    println!("  UPLOAD_DIR={}", config.upload_dir.display());
    println!("  MAX_UPLOAD_BYTES={}", config.max_upload_bytes);
    println!("  CLIP_MODEL_PATH={}", config.encoder.model_path.display());
    println!("  EMBEDDING_DIMS={}", config.encoder.dims);
    println!("  SEARCH_LIMIT={}", config.search_limit);

    // Upload directory writable
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let check_path = config.upload_dir.join(".preflight");
    tokio::fs::write(&check_path, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("UPLOAD_DIR is not writable: {}", e))?;
    tokio::fs::remove_file(&check_path).await?;
    println!("  Upload directory is writable.");

    if skip_db {
        println!("  Skipping database checks.");
    } else {
        let store = PgProductStore::connect(&config.database).await?;
        store.ping().await?;
        let count = store.embedded_candidates().await?.len();
        println!("  Database reachable, products table ready ({} embedded products).", count);
    }

    if skip_model {
        println!("  Skipping model checks.");
    } else {
        let encoder = ClipEncoder::new(config.encoder.clone());
        let png = sample_image()?;
        let embedding = tokio::task::spawn_blocking(move || encoder.encode(&png)).await??;
        let norm = l2_norm(embedding.as_slice());
        if embedding.dims() != config.encoder.dims || (norm - 1.0).abs() > 1e-3 {
            return Err(anyhow::anyhow!(
                "Encoder produced {} dims with norm {:.6}, expected {} dims with norm 1.0",
                embedding.dims(),
                norm,
                config.encoder.dims
            ));
        }
        println!(
            "  Model loads and yields a {}-dim unit vector (norm {:.6}).",
            embedding.dims(),
            norm
        );
    }

    println!("> Preflight OK.");
    Ok(())
}
