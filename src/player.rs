use crate::engine::SceneRenderer;
use crate::engine::scheduler::Scheduler;
use crate::model::config::SchedulerConfig;
use crate::model::mapper::PositionMapper;
use crate::model::song::{NoteEvent, Song};
use anyhow::{anyhow, bail};
use log::{debug, error, info, warn};
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

enum ControlMsg {
    Stop,
}

/// Drives a `Scheduler` in real time on a worker thread and hands every
/// spawn/move/retire to the renderer.
#[derive(Debug)]
pub struct Player<R: SceneRenderer, M: PositionMapper> {
    fps: u32,
    delay: u64,
    config: SchedulerConfig,
    renderer: Arc<R>,
    mapper: Arc<M>,
    schedule: Mutex<Vec<NoteEvent>>,
    control_tx: Mutex<Option<Sender<ControlMsg>>>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<R: SceneRenderer + 'static, M: PositionMapper + 'static> Player<R, M> {
    pub fn new(
        renderer: R,
        mapper: Arc<M>,
        config: SchedulerConfig,
        fps: u32,
        delay: u64,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        if fps == 0 {
            bail!("fps must be greater than 0..!");
        }

        Ok(Self {
            fps,
            delay,
            config,
            renderer: Arc::new(renderer),
            mapper,
            schedule: Mutex::new(Vec::new()),
            control_tx: Mutex::new(None),
            worker_handle: Mutex::new(None),
        })
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn load_song(&self, song: Song) -> anyhow::Result<()> {
        let sorted = song.is_sorted();
        let length = song.length_secs();
        let mut events = song.events;

        if !sorted {
            warn!("Song events were not in start time order, sorting them..!");
            events.sort_by(|a, b| a.start_time().total_cmp(&b.start_time()));
        }

        let Ok(mut schedule_lock) = self.schedule.lock() else {
            bail!("Failed to lock the schedule..!");
        };
        *schedule_lock = events;

        info!(
            "Loaded song: '{}' with {} scheduled notes, {:.3}s long..!",
            song.metadata.title.unwrap_or(String::from("No Title")),
            schedule_lock.len(),
            length
        );

        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.worker_handle
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    pub fn play(&self, join: bool) -> anyhow::Result<()> {
        if self.is_playing() {
            bail!("Playback already running..!")
        }

        let Ok(schedule) = self.schedule.lock() else {
            bail!("Failed to lock schedule..!")
        };

        let schedule = schedule.clone();

        if schedule.is_empty() {
            bail!("No song loaded..!")
        }

        let mut scheduler = Scheduler::new(self.config)?;
        let renderer = Arc::clone(&self.renderer);
        let mapper = Arc::clone(&self.mapper);
        let (tx, rx) = mpsc::channel::<ControlMsg>();

        {
            let Ok(mut ctl) = self.control_tx.lock() else {
                bail!("Failed to lock control_tx..!")
            };

            *ctl = Some(tx);
        }

        let delay = self.delay;
        let frame = Duration::from_secs_f64(1.0 / self.fps as f64);
        let handle = thread::spawn(move || {
            let ctrl_rx = rx;
            let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);

            if delay > 0 {
                info!("Starting playback in {} seconds..!", delay);
                sleeper.sleep(Duration::from_secs(delay));
            }

            let clock = Instant::now();
            if let Err(why) = scheduler.start(schedule, mapper, 0.0) {
                error!("Failed to start the song: {}", why);
                return;
            }

            let mut next_frame = clock;
            let mut skipped = 0usize;
            loop {
                if ctrl_rx.try_recv().is_ok() {
                    let dropped = scheduler.abort();
                    if let Err(why) = renderer.clear() {
                        warn!("Failed to clear the scene: {:?}", why);
                    }
                    warn!(
                        "Playback stopped via control message after {:.3} seconds, dropped {} live notes..!",
                        clock.elapsed().as_secs_f64(),
                        dropped.len()
                    );
                    return;
                }

                let now = clock.elapsed().as_secs_f64();
                let report = match scheduler.tick(now) {
                    Ok(report) => report,
                    Err(why) => {
                        error!("Scheduler refused to tick at {:.3}s: {}", now, why);
                        return;
                    }
                };

                skipped += report.spawn_errors.len();
                for action in &report.actions {
                    if let Err(why) = renderer.apply(action) {
                        warn!("Render error for note {} at {:.3}s | why: {:?}", action.index(), now, why);
                    }
                }

                if report.is_complete() {
                    if let Err(why) = renderer.song_complete() {
                        warn!("Render error on song completion: {:?}", why);
                    }
                    break;
                }

                next_frame += frame;
                let wake = Instant::now();
                if next_frame > wake {
                    sleeper.sleep(next_frame - wake);
                } else {
                    // running behind, don't try to catch up with a burst of ticks
                    next_frame = wake;
                }
            }

            if skipped > 0 {
                warn!("Skipped {} notes that could not be placed..!", skipped);
            }
            info!("Playback thread finished all notes..!");
        });

        if join {
            handle
                .join()
                .map_err(|_| anyhow!("Playback thread panicked..!"))?;
            debug!("Playback thread joined..!");
        } else {
            let Ok(mut wh) = self.worker_handle.lock() else {
                bail!("Failed to lock worker handle..!")
            };

            *wh = Some(handle);
        }

        Ok(())
    }

    pub fn stop(&self) -> anyhow::Result<()> {
        let tx = {
            let Ok(mut lock) = self.control_tx.lock() else {
                bail!("Failed to lock control_tx..!")
            };
            lock.take()
        };

        if let Some(tx) = tx {
            let _ = tx.send(ControlMsg::Stop);
        } else {
            bail!("No worker is running playback..!")
        }

        let Ok(mut lock) = self.worker_handle.lock() else {
            bail!("Failed to lock worker_handle..!")
        };

        if let Some(handle) = lock.take() {
            if let Err(why) = handle.join() {
                warn!("Playback thread panicked: {:?}", why);
                bail!("Playback thread panicked..!");
            }
            debug!("Playback thread joined..!");
            info!("Stopped playback thread..!");
        }

        Ok(())
    }
}
