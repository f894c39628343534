//! Tiled search demo: streams shards into the engine and steps a search
//! run the way a cooperative host would, printing partial top-k updates.
//!
//! ```bash
//! cargo run --example tiled_search
//! ```

use rand::prelude::*;

use quiver::provider::{ShardMetadata, ShardSource, TitleTable};
use quiver::{Codebook, SearchConfig, SearchEngine, SearchObserver, StepState, TimingInfo};

const M: usize = 16;
const K: usize = 64;
const DSUB: usize = 8;
const SHARD_ROWS: usize = 50_000;
const SHARDS: usize = 4;

/// Stands in for the column-table shard files a real host would fetch
/// and decode.
struct RandomShards {
    rng: StdRng,
}

impl ShardSource for RandomShards {
    fn load(&mut self, shard_index: usize) -> quiver::Result<(Vec<u8>, Box<dyn ShardMetadata>)> {
        let codes: Vec<u8> = (0..SHARD_ROWS * M)
            .map(|_| self.rng.gen_range(0..K) as u8)
            .collect();
        let titles = TitleTable::new(
            (0..SHARD_ROWS)
                .map(|row| format!("Article {}", shard_index * SHARD_ROWS + row))
                .collect(),
        );
        Ok((codes, Box::new(titles)))
    }
}

struct PrintObserver {
    reranks: usize,
}

impl SearchObserver for PrintObserver {
    fn top_k(&mut self, indices: &[u32], timing: &TimingInfo) {
        self.reranks += 1;
        let dist_us: u64 = timing.distance_us.iter().sum();
        println!(
            "rerank {:>2}: top {:?} ({} tiles, {} us of distance work)",
            self.reranks,
            &indices[..indices.len().min(5)],
            timing.distance_us.len(),
            dist_us,
        );
    }
}

fn main() -> quiver::Result<()> {
    tracing_subscriber::fmt::init();

    let mut rng = StdRng::seed_from_u64(7);
    let nested: Vec<Vec<Vec<f32>>> = (0..M)
        .map(|_| {
            (0..K)
                .map(|_| (0..DSUB).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect())
                .collect()
        })
        .collect();
    let codebook = Codebook::from_nested(&nested)?;

    let mut engine = SearchEngine::with_config(
        codebook,
        SearchConfig {
            tile_size: 10_000,
            ..SearchConfig::default()
        },
    );
    engine.set_k(10)?;

    let query: Vec<f32> = (0..M * DSUB).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect();
    let mut observer = PrintObserver { reranks: 0 };
    let mut source = RandomShards { rng };

    for shard in 0..SHARDS {
        let (codes, titles) = source.load(shard)?;
        let index = engine.append_shard(codes, titles)?;

        // First shard gets a full search; later shards only top up.
        let mut run = if shard == 0 {
            engine.begin_search(query.clone())?
        } else {
            engine.begin_extend(index)?
        };

        // Step loop: a real host would service its event queue between
        // yields. Here we just count them.
        let mut yields = 0;
        loop {
            match engine.step(&mut run, &mut observer)? {
                StepState::Yielded => yields += 1,
                StepState::Completed => break,
                StepState::Cancelled => unreachable!("nothing invalidates this run"),
            }
        }
        println!(
            "shard {index} done ({} vectors total, {yields} yields)",
            engine.store().len()
        );
    }

    let top = engine.rerank_only()?;
    println!("\nfinal top-{}:", top.len());
    for &idx in &top {
        println!(
            "  #{idx}: {} (distance {:.3})",
            engine.store().title(idx as usize).unwrap_or("?"),
            engine.store().distances()[idx as usize],
        );
    }
    Ok(())
}
