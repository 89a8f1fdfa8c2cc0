use crate::engine::SceneRenderer;
use crate::engine::scheduler::{NoteKind, SpawnedNote};
use anyhow::bail;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Renders notes as log lines. Handy for dry runs and for checking timing
/// without a scene to draw into.
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    verbose: bool,
    tokens: Mutex<BTreeMap<usize, String>>,
}

impl ConsoleRenderer {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            tokens: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of tokens currently on screen.
    pub fn live_tokens(&self) -> usize {
        self.tokens.lock().map(|tokens| tokens.len()).unwrap_or(0)
    }
}

impl SceneRenderer for ConsoleRenderer {
    fn spawn(&self, note: &SpawnedNote) -> anyhow::Result<()> {
        let Ok(mut tokens) = self.tokens.lock() else {
            bail!("Failed to lock the token table..!");
        };

        let label = format!(
            "{} {}",
            match note.kind {
                NoteKind::Natural => "natural",
                NoteKind::Sharp => "sharp",
            },
            note.pitch
        );

        if self.verbose {
            info!(
                "{:14} | note {:>5} | x: {:>8.3} | front: {:>8.3} | length: {:>6.3}",
                label, note.index, note.lateral_offset, note.front_edge, note.length
            );
        }

        if tokens.insert(note.index, label).is_some() {
            warn!("Note {} was spawned over an existing token..!", note.index);
        }

        Ok(())
    }

    fn move_to(&self, index: usize, front_edge: f64, center: f64) -> anyhow::Result<()> {
        debug!(
            "Note {} front: {:.3} center: {:.3}",
            index, front_edge, center
        );
        Ok(())
    }

    fn retire(&self, index: usize) -> anyhow::Result<()> {
        let Ok(mut tokens) = self.tokens.lock() else {
            bail!("Failed to lock the token table..!");
        };

        match tokens.remove(&index) {
            Some(label) if self.verbose => info!("{:14} | note {:>5} | hit", label, index),
            Some(_) => {}
            None => bail!("No token for note {}..!", index),
        }

        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        let Ok(mut tokens) = self.tokens.lock() else {
            bail!("Failed to lock the token table..!");
        };

        if !tokens.is_empty() {
            info!("Clearing {} notes from the scene..!", tokens.len());
        }
        tokens.clear();

        Ok(())
    }

    fn song_complete(&self) -> anyhow::Result<()> {
        info!("Song complete..!");
        Ok(())
    }
}
