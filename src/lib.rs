#![allow(non_snake_case)]

mod engine;
mod error;
mod midi_importer;
mod model;
mod util;
mod player;

pub use engine::*;
pub use engine::console::*;
pub use engine::note::*;
pub use engine::scheduler::*;
pub use error::*;
pub use midi_importer::*;
pub use model::config::*;
pub use model::mapper::*;
pub use model::pitch::*;
pub use model::song::*;
pub use util::*;
pub use player::*;
