//! Subcommand implementations. Each returns the text to print on success.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use relief_config::{Config, SampleArgs};
use relief_ingest::{IngestError, IngestOptions, Manifest, zoom_key};
use relief_terrain::grid_file::GridFileError;
use relief_terrain::{
    AsyncHeightGenerator, ChunkCoord, DemHeightProvider, GenerationError, HeightProvider,
    HeightTask, ProceduralHeightProvider, ProceduralParams, ProviderError,
};
use thiserror::Error;

/// How long `sample` waits for the worker pool.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures surfaced to the operator.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Ingestion could not run.
    #[error(transparent)]
    Ingest(#[from] IngestError),
    /// A merged grid could not be loaded.
    #[error(transparent)]
    Grid(#[from] GridFileError),
    /// A height source could not be built.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The worker pool could not start.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The worker pool refused the chunk.
    #[error("height generator queue is full")]
    QueueFull,
    /// No result arrived in time.
    #[error("timed out waiting for chunk {0:?}")]
    Timeout(ChunkCoord),
}

/// `relief ingest`
pub fn ingest(config: &Config) -> Result<String, CommandError> {
    let options = IngestOptions {
        manifest_path: config.manifest_path(),
        area: config.ingest.area.clone(),
        merge_all_zooms: config.ingest.merge_all_zooms,
        ..IngestOptions::new(&config.ingest.tiles_dir, &config.ingest.output_dir)
    };
    let report = relief_ingest::run(&options)?;

    let mut out = String::new();
    for (area_id, area) in &report.areas {
        let _ = writeln!(out, "{area_id} ({})", area.name);
        for (zoom, summary) in &area.zooms {
            let _ = write!(
                out,
                "  {zoom}: {}/{} tiles decoded",
                summary.decoded_count, summary.tile_count
            );
            if let Some(stats) = &summary.statistics {
                let _ = write!(
                    out,
                    ", {:.1}..{:.1} m, mean {:.1} m, water {:.1}%",
                    stats.min,
                    stats.max,
                    stats.mean,
                    stats.water_fraction * 100.0
                );
            }
            if let Some(merged) = &summary.merged {
                let _ = write!(
                    out,
                    ", merged {}x{} -> {}",
                    merged.width, merged.height, merged.file
                );
            }
            out.push('\n');
            for issue in &summary.issues {
                let _ = writeln!(out, "    ! {}: {}", issue.subject, issue.message);
            }
        }
    }
    let _ = writeln!(
        out,
        "report written to {}",
        options.output_dir.join(relief_ingest::REPORT_FILE_NAME).display()
    );
    Ok(out)
}

/// `relief areas`
pub fn areas(config: &Config) -> Result<String, CommandError> {
    let manifest = Manifest::load(&config.manifest_path())?;
    let mut out = String::new();
    for (id, area) in &manifest.areas {
        let zooms: Vec<String> = area.zooms().iter().map(|(z, _)| zoom_key(*z)).collect();
        let _ = writeln!(
            out,
            "{id}\t{} ({:.4}, {:.4}) [{}]",
            area.name,
            area.lat,
            area.lon,
            zooms.join(", ")
        );
    }
    Ok(out)
}

/// Heights reported by `relief sample`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResult {
    /// Kind of height source sampled.
    pub source: &'static str,
    /// Direct point query.
    pub point: f32,
    /// Chunk containing the position.
    pub chunk: ChunkCoord,
    /// Interpolated from the chunk grid built by the worker pool.
    pub chunk_height: f32,
}

/// Sample one position through the point API and through a worker-built chunk grid.
pub fn sample_heights(config: &Config, args: &SampleArgs) -> Result<SampleResult, CommandError> {
    let provider: Box<dyn HeightProvider> = match (&args.grid, args.meters_per_pixel) {
        (Some(grid), Some(mpp)) => {
            Box::new(DemHeightProvider::load(grid, mpp)?.with_origin(args.origin_x, args.origin_z))
        }
        _ => Box::new(ProceduralHeightProvider::new(ProceduralParams {
            seed: config.world.seed,
            ..Default::default()
        })?),
    };
    let point = provider.height_at(args.x, args.z);

    let world = &config.world;
    let provider_config = provider.config();
    let generator = if world.worker_threads == 0 {
        AsyncHeightGenerator::with_defaults(&provider_config)?
    } else {
        AsyncHeightGenerator::new(&provider_config, world.worker_threads, world.max_in_flight, 4)?
    };

    let chunk = ChunkCoord::containing(args.x, args.z, world.chunk_size);
    generator
        .submit(HeightTask {
            chunk,
            chunk_size: world.chunk_size,
            segments: world.segments,
        })
        .map_err(|_| CommandError::QueueFull)?;

    let deadline = Instant::now() + GENERATION_TIMEOUT;
    loop {
        if let Some(done) = generator.drain_results().into_iter().find(|r| r.chunk == chunk) {
            tracing::debug!(
                chunk = ?chunk,
                micros = done.generation_time_us,
                "chunk heights ready"
            );
            return Ok(SampleResult {
                source: provider_config.kind(),
                point,
                chunk,
                chunk_height: done.grid.height_at_world(args.x, args.z),
            });
        }
        if Instant::now() >= deadline {
            return Err(CommandError::Timeout(chunk));
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// `relief sample`
pub fn sample(config: &Config, args: &SampleArgs) -> Result<String, CommandError> {
    let result = sample_heights(config, args)?;
    Ok(format!(
        "{} height at ({}, {}): {:.3} m\nchunk ({}, {}) grid height: {:.3} m\n",
        result.source,
        args.x,
        args.z,
        result.point,
        result.chunk.x,
        result.chunk.z,
        result.chunk_height
    ))
}
