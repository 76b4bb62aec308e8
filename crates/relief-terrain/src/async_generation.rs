//! Background chunk height generation on a worker pool.
//!
//! Each worker owns a height provider rebuilt from a [`ProviderConfig`]
//! snapshot, so no raster is shared across threads. Completed grids are
//! delivered through a bounded channel and drained on the caller's thread.
//!
//! Every submission gets its own id. Only the latest live submission for a
//! chunk is ever delivered: resubmitting a chunk supersedes the earlier task,
//! and a result whose id no longer matches the active entry is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;

use crate::chunk_heights::{ChunkCoord, ChunkHeightGrid};
use crate::provider::{HeightProvider, ProviderConfig, ProviderError};

/// A request to generate heights for one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightTask {
    /// Chunk to generate.
    pub chunk: ChunkCoord,
    /// Chunk edge length in world units.
    pub chunk_size: f32,
    /// Lattice segments per chunk edge.
    pub segments: u32,
}

/// A completed chunk height grid.
#[derive(Debug)]
pub struct GeneratedHeights {
    /// The chunk matching the original task.
    pub chunk: ChunkCoord,
    /// The generated heights.
    pub grid: ChunkHeightGrid,
    /// Generation time in microseconds.
    pub generation_time_us: u64,
    task_id: u64,
}

/// Errors starting a generator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The provider snapshot could not be rebuilt.
    #[error("invalid height provider config: {0}")]
    Provider(#[from] ProviderError),
    /// A worker thread could not be spawned.
    #[error("failed to spawn height worker: {0}")]
    Spawn(#[source] std::io::Error),
}

struct QueuedTask {
    id: u64,
    task: HeightTask,
    cancelled: Arc<AtomicBool>,
}

/// The live submission for a chunk.
struct ActiveTask {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

/// Generates chunk height grids across a thread pool.
pub struct AsyncHeightGenerator {
    task_sender: Sender<QueuedTask>,
    result_receiver: Receiver<GeneratedHeights>,
    active_tasks: Arc<DashMap<ChunkCoord, ActiveTask>>,
    next_id: AtomicU64,
    in_flight: Arc<AtomicU64>,
    max_in_flight: u64,
    kind: &'static str,
}

impl AsyncHeightGenerator {
    /// Start `thread_count` workers, each with its own provider built from
    /// `config`.
    ///
    /// At most `max_in_flight` tasks may be queued or executing at once;
    /// further submissions are rejected. `result_capacity` bounds the number
    /// of undrained results before workers block.
    pub fn new(
        config: &ProviderConfig,
        thread_count: usize,
        max_in_flight: usize,
        result_capacity: usize,
    ) -> Result<Self, GenerationError> {
        let thread_count = thread_count.max(1);
        let providers = (0..thread_count)
            .map(|_| config.build())
            .collect::<Result<Vec<_>, _>>()?;

        let (task_sender, task_receiver) = bounded::<QueuedTask>(max_in_flight.max(1));
        let (result_sender, result_receiver) = bounded::<GeneratedHeights>(result_capacity.max(1));
        let in_flight = Arc::new(AtomicU64::new(0));

        for (index, provider) in providers.into_iter().enumerate() {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);

            std::thread::Builder::new()
                .name(format!("height-worker-{index}"))
                .spawn(move || worker_loop(provider, receiver, sender, in_flight))
                .map_err(GenerationError::Spawn)?;
        }

        tracing::info!(
            provider = config.kind(),
            threads = thread_count,
            max_in_flight,
            "height generator started"
        );

        Ok(Self {
            task_sender,
            result_receiver,
            active_tasks: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
            in_flight,
            max_in_flight: max_in_flight as u64,
            kind: config.kind(),
        })
    }

    /// Start a generator sized to the machine, leaving two cores for the
    /// caller.
    pub fn with_defaults(config: &ProviderConfig) -> Result<Self, GenerationError> {
        let cpus = num_cpus::get().max(2);
        let threads = (cpus - 2).max(1);
        Self::new(config, threads, 64, 128)
    }

    /// Kind of provider the workers sample.
    pub fn provider_kind(&self) -> &'static str {
        self.kind
    }

    /// Queue a chunk for generation.
    ///
    /// A pending task for the same chunk is superseded: it is skipped if not
    /// yet started and its grid is never delivered. Returns the task back if
    /// the generator is at capacity.
    pub fn submit(&self, task: HeightTask) -> Result<(), HeightTask> {
        if self.in_flight.load(Ordering::Acquire) >= self.max_in_flight {
            return Err(task);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancelled = Arc::new(AtomicBool::new(false));
        let active = ActiveTask {
            id,
            cancelled: Arc::clone(&cancelled),
        };
        let superseded = self.active_tasks.insert(task.chunk, active);
        self.in_flight.fetch_add(1, Ordering::AcqRel);

        match self.task_sender.try_send(QueuedTask { id, task, cancelled }) {
            Ok(()) => {
                if let Some(old) = superseded {
                    old.cancelled.store(true, Ordering::Release);
                }
                Ok(())
            }
            Err(e) => {
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                let queued = e.into_inner();
                let chunk = queued.task.chunk;
                if self.active_tasks.remove_if(&chunk, |_, a| a.id == id).is_some()
                    && let Some(old) = superseded
                {
                    self.active_tasks.insert(chunk, old);
                }
                Err(queued.task)
            }
        }
    }

    /// Cancel the pending task for `chunk`.
    ///
    /// A task that has not started is skipped. A task that is already running
    /// finishes its grid, which is then discarded. No-op for unknown chunks.
    pub fn cancel(&self, chunk: &ChunkCoord) {
        if let Some((_, active)) = self.active_tasks.remove(chunk) {
            active.cancelled.store(true, Ordering::Release);
        }
    }

    /// Take every completed grid available right now.
    ///
    /// Grids from cancelled or superseded submissions are dropped here.
    pub fn drain_results(&self) -> Vec<GeneratedHeights> {
        let mut results = Vec::new();
        while let Ok(done) = self.result_receiver.try_recv() {
            let id = done.task_id;
            if self.active_tasks.remove_if(&done.chunk, |_, a| a.id == id).is_some() {
                results.push(done);
            } else {
                tracing::trace!(chunk = ?done.chunk, "dropping stale chunk heights");
            }
        }
        results
    }

    /// Number of tasks queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether a task for `chunk` is submitted and not yet drained or cancelled.
    pub fn is_pending(&self, chunk: &ChunkCoord) -> bool {
        self.active_tasks.contains_key(chunk)
    }
}

fn worker_loop(
    provider: Box<dyn HeightProvider>,
    receiver: Receiver<QueuedTask>,
    sender: Sender<GeneratedHeights>,
    in_flight: Arc<AtomicU64>,
) {
    while let Ok(queued) = receiver.recv() {
        if queued.cancelled.load(Ordering::Acquire) {
            in_flight.fetch_sub(1, Ordering::AcqRel);
            continue;
        }

        let task = queued.task;
        let start = std::time::Instant::now();
        let grid = provider.height_data(task.chunk, task.chunk_size, task.segments);
        let generation_time_us = start.elapsed().as_micros() as u64;

        if queued.cancelled.load(Ordering::Acquire) {
            tracing::trace!(chunk = ?task.chunk, "discarding cancelled chunk heights");
        } else if sender
            .send(GeneratedHeights {
                chunk: task.chunk,
                grid,
                generation_time_us,
                task_id: queued.id,
            })
            .is_err()
        {
            in_flight.fetch_sub(1, Ordering::AcqRel);
            break;
        }

        in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedural::ProceduralParams;
    use std::time::{Duration, Instant};

    fn procedural_config(seed: i64) -> ProviderConfig {
        ProviderConfig::Procedural(ProceduralParams {
            seed,
            ..Default::default()
        })
    }

    fn task(x: i32, z: i32) -> HeightTask {
        HeightTask {
            chunk: ChunkCoord::new(x, z),
            chunk_size: 64.0,
            segments: 16,
        }
    }

    fn collect(generator: &AsyncHeightGenerator, expected: usize) -> Vec<GeneratedHeights> {
        let mut results = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(30);
        while results.len() < expected && Instant::now() < deadline {
            results.extend(generator.drain_results());
            if results.len() < expected {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        results
    }

    /// Drain until every queued task has been processed.
    fn drain_until_idle(generator: &AsyncHeightGenerator) -> Vec<GeneratedHeights> {
        let mut results = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(30);
        while generator.in_flight_count() > 0 && Instant::now() < deadline {
            results.extend(generator.drain_results());
            std::thread::sleep(Duration::from_millis(5));
        }
        results.extend(generator.drain_results());
        results
    }
    #[test]
    fn test_results_match_synchronous_generation() {
        let config = procedural_config(77);
        let generator = AsyncHeightGenerator::new(&config, 3, 64, 64).unwrap();
        let reference = config.build().unwrap();

        let mut submitted = 0;
        for x in -2..2 {
            for z in -2..2 {
                generator.submit(task(x, z)).unwrap();
                submitted += 1;
            }
        }

        let results = collect(&generator, submitted);
        assert_eq!(results.len(), submitted, "got {}/{submitted}", results.len());
        for done in results {
            let t = task(done.chunk.x, done.chunk.z);
            let expected = reference.height_data(t.chunk, t.chunk_size, t.segments);
            assert_eq!(done.grid, expected, "mismatch for {:?}", done.chunk);
        }
    }

    #[test]
    fn test_dem_workers_own_their_raster() {
        let heights: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let config = ProviderConfig::Dem {
            width: 4,
            height: 4,
            meters_per_pixel: 10.0,
            origin_x: 0.0,
            origin_z: 0.0,
            buffer: bytemuck::cast_slice::<f32, u8>(&heights).to_vec(),
        };
        let generator = AsyncHeightGenerator::new(&config, 2, 8, 8).unwrap();
        assert_eq!(generator.provider_kind(), "dem");

        generator.submit(task(-1, -1)).unwrap();
        let results = collect(&generator, 1);
        assert_eq!(results.len(), 1);

        let reference = config.build().unwrap();
        assert_eq!(results[0].grid, reference.height_data(ChunkCoord::new(-1, -1), 64.0, 16));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ProviderConfig::Procedural(ProceduralParams {
            octaves: 0,
            ..Default::default()
        });
        assert!(matches!(
            AsyncHeightGenerator::new(&config, 2, 8, 8),
            Err(GenerationError::Provider(ProviderError::ZeroOctaves))
        ));
    }

    #[test]
    fn test_submit_rejected_at_capacity() {
        let generator = AsyncHeightGenerator::new(&procedural_config(1), 1, 0, 8).unwrap();
        let rejected = generator.submit(task(0, 0)).unwrap_err();
        assert_eq!(rejected, task(0, 0));
        assert!(!generator.is_pending(&ChunkCoord::new(0, 0)));
        assert_eq!(generator.in_flight_count(), 0);
    }

    #[test]
    fn test_cancelled_task_not_delivered() {
        let generator = AsyncHeightGenerator::new(&procedural_config(2), 2, 64, 64).unwrap();
        let chunk = ChunkCoord::new(50, 50);
        generator.submit(task(50, 50)).unwrap();
        assert!(generator.is_pending(&chunk));

        generator.cancel(&chunk);
        assert!(!generator.is_pending(&chunk));

        let results = drain_until_idle(&generator);
        assert_eq!(generator.in_flight_count(), 0);
        assert!(
            results.iter().all(|r| r.chunk != chunk),
            "cancelled chunk was delivered"
        );
    }

    #[test]
    fn test_resubmitted_then_cancelled_chunk_never_delivered() {
        let generator = AsyncHeightGenerator::new(&procedural_config(4), 1, 64, 64).unwrap();
        let busy = ChunkCoord::new(9, 9);
        generator
            .submit(HeightTask {
                chunk: busy,
                chunk_size: 64.0,
                segments: 256,
            })
            .unwrap();

        let chunk = ChunkCoord::new(1, 1);
        generator.submit(task(1, 1)).unwrap();
        generator.submit(task(1, 1)).unwrap();
        generator.cancel(&chunk);
        assert!(!generator.is_pending(&chunk));

        let results = drain_until_idle(&generator);
        assert!(
            results.iter().all(|r| r.chunk != chunk),
            "cancelled chunk was delivered"
        );
        assert!(results.iter().any(|r| r.chunk == busy), "busy chunk missing");
        assert!(!generator.is_pending(&chunk));
    }

    #[test]
    fn test_resubmitted_chunk_delivered_once() {
        let generator = AsyncHeightGenerator::new(&procedural_config(5), 2, 64, 64).unwrap();
        let chunk = ChunkCoord::new(3, -2);
        generator.submit(task(3, -2)).unwrap();
        generator.submit(task(3, -2)).unwrap();

        let results = drain_until_idle(&generator);
        let delivered = results.iter().filter(|r| r.chunk == chunk).count();
        assert_eq!(delivered, 1, "expected exactly one grid for {chunk:?}");
        assert!(!generator.is_pending(&chunk));
    }

    #[test]
    fn test_in_flight_count_drains_to_zero() {
        let generator = AsyncHeightGenerator::new(&procedural_config(3), 1, 64, 64).unwrap();
        assert_eq!(generator.in_flight_count(), 0);

        for i in 0..5 {
            generator.submit(task(i, 0)).unwrap();
        }
        assert!(generator.in_flight_count() > 0 || !generator.drain_results().is_empty());

        drain_until_idle(&generator);
        assert_eq!(generator.in_flight_count(), 0);
    }
}
