// src/rank_benchmark.rs
// Measures brute-force similarity ranking over randomly generated embeddings.
use rand::Rng;
use std::time::Instant;

use image_catalog_search::domain::search::{rank, Candidate, DEFAULT_SEARCH_LIMIT};
use image_catalog_search::domain::UnitVector;

const DIMS: usize = 512;

fn random_unit(rng: &mut impl Rng) -> anyhow::Result<UnitVector> {
    let raw: Vec<f32> = (0..DIMS).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    Ok(UnitVector::normalize(raw)?)
}

fn main() -> anyhow::Result<()> {
    let num_items: usize = std::env::args()
        .nth(1)
        .map(|v| v.parse::<usize>())
        .transpose()?
        .unwrap_or(10_000);
    let rounds = 20;
    println!(
        "--- Ranking benchmark: {} candidates x {} dims, {} queries ---",
        num_items, DIMS, rounds
    );

    let mut rng = rand::thread_rng();
    let candidates = (0..num_items)
        .map(|i| {
            Ok(Candidate {
                id: i as i32 + 1,
                name: format!("product_{}", i),
                embedding: Some(random_unit(&mut rng)?.into_inner()),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let start_time = Instant::now();
    let mut best = 0.0f32;
    for _ in 0..rounds {
        let query = random_unit(&mut rng)?;
        let hits = rank(&query, &candidates, DEFAULT_SEARCH_LIMIT)?;
        if let Some(top) = hits.first() {
            best = best.max(top.score);
        }
    }
    let duration = start_time.elapsed();
    let avg_ms = duration.as_secs_f64() * 1000.0 / rounds as f64;

    println!("\n--- Results ---");
    println!("Best score seen: {:.4}", best);
    println!("Total time for {} queries: {} ms", rounds, duration.as_millis());
    println!("Average time per query: {:.3} ms", avg_ms);
    println!(
        "Throughput: {:.0} comparisons/s",
        (num_items * rounds) as f64 / duration.as_secs_f64().max(f64::EPSILON)
    );
    Ok(())
}
