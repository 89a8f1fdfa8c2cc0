use PIANO_PLANE::{
    Args, DefaultRenderer, Pitch, Player, PositionMapper, Song, build_mapper, import_midi_file,
    lateral_offset, note_length,
};
use anyhow::Result;
use clap::Parser;
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.scheduler_config();
    config.validate()?;

    let mapper = Arc::new(build_mapper(&args.mappings, args.octave_size));
    if !mapper.is_fully_mapped() {
        warn!("Unmapped pitch classes: {:?}", mapper.unmapped());
    }

    let song = match &args.midi {
        Some(path) => {
            info!("Importing MIDI file: '{}'...", path.display());
            import_midi_file(path, args.transpose, args.clip_range())?
        }
        None => {
            info!("No MIDI file given, playing the demo phrase..!");
            Song::demo()
        }
    };

    debug!(
        "Imported song '{}' with {} events..!",
        song.metadata
            .title
            .clone()
            .unwrap_or_else(|| "<unknown>".into()),
        song.events.len()
    );

    if args.dry_run {
        info!("Previewing at most {} events..!", args.dry_run_max);
        for (i, ev) in song.events.iter().enumerate() {
            if i >= args.dry_run_max {
                break;
            }

            let offset = Pitch::parse(ev.name())
                .and_then(|pitch| lateral_offset(&pitch, &*mapper, mapper.octave_size()))
                .map(|x| format!("{:.3}", x))
                .unwrap_or_else(|why| format!("<{}>", why));

            info!(
                "Event {}: note={} start={:.3}s dur={:.3}s x={} length={:.3}",
                i,
                ev.name(),
                ev.start_time(),
                ev.duration(),
                offset,
                note_length(ev.duration(), &config)
            );
        }
        return Ok(());
    }

    let player = Player::new(
        DefaultRenderer::new(args.verbose),
        mapper,
        config,
        args.fps,
        args.delay_start,
    )?;

    player.load_song(song)?;
    let player_arc = Arc::new(player);
    let player = Arc::clone(&player_arc);
    let player_for_handler = Arc::clone(&player_arc);

    ctrlc::set_handler(move || {
        warn!("Ctrl-C received, stopping playback..!");
        let _ = player_for_handler.stop();
    })?;

    player.play(false)?;
    while player.is_playing() {
        thread::sleep(Duration::from_millis(50));
    }
    info!("Playback finished, exiting..!");

    Ok(())
}
