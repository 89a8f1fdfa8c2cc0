use crate::engine::scheduler::{NoteAction, SpawnedNote};

pub mod console;
pub mod note;
pub mod scheduler;

pub type DefaultRenderer = console::ConsoleRenderer;

/// The scene layer that owns the visual note tokens.
///
/// Implementations are shared with the playback thread, so every method takes `&self`.
pub trait SceneRenderer: Send + Sync + Sized {
    /// Create a token for a freshly spawned note.
    fn spawn(&self, note: &SpawnedNote) -> anyhow::Result<()>;

    /// Reposition an existing token along the direction of travel.
    fn move_to(&self, index: usize, front_edge: f64, center: f64) -> anyhow::Result<()>;

    /// Destroy the token of a note whose trailing edge passed the hit line.
    fn retire(&self, index: usize) -> anyhow::Result<()>;

    /// Destroy every token still on screen. Called when playback is stopped early.
    fn clear(&self) -> anyhow::Result<()>;

    fn song_complete(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn apply(&self, action: &NoteAction) -> anyhow::Result<()> {
        match action {
            NoteAction::Spawn(note) => self.spawn(note),
            NoteAction::Move {
                index,
                front_edge,
                center,
            } => self.move_to(*index, *front_edge, *center),
            NoteAction::Retire { index } => self.retire(*index),
        }
    }
}
