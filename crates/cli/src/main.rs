use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossbeam_channel::Receiver;

use playrec_core::capture::domain::still_image_encoder::StillImageFormat;
use playrec_core::playback::domain::player_event::PlayerEvent;
use playrec_core::playback::domain::player_state::PlayerState;
use playrec_core::playback::infrastructure::channel_event_sink::ChannelEventSink;
use playrec_core::playback::infrastructure::player_factory::create_player;
use playrec_core::playback::playback_controller::PlaybackController;
use playrec_core::shared::config::PlayerConfig;

/// Frames rendered while waiting for a seek to land before giving up.
const MAX_SEEK_TICKS: usize = 2_000;

/// Play, capture and re-encode video from files, URLs and test patterns.
#[derive(Parser)]
#[command(name = "playrec")]
struct Cli {
    /// Config file (defaults to the per-user config).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a source, printing player events as JSON lines.
    Play {
        /// File path, URL or testsrc:// locator.
        source: String,

        /// Playback rate, e.g. 0.5 or 2.
        #[arg(long)]
        speed: Option<f64>,

        /// Restart from the beginning when the end is reached.
        #[arg(long = "loop")]
        loop_playback: bool,

        /// Start position in seconds.
        #[arg(long)]
        seek: Option<f64>,

        /// Stop after this many seconds of wall time.
        #[arg(long)]
        max_seconds: Option<f64>,
    },

    /// Save the frame shown at a position as PNG or JPEG.
    Capture {
        source: String,

        /// Output image; the extension picks the format.
        output: PathBuf,

        /// Position in seconds.
        #[arg(long, default_value = "0")]
        at: f64,

        /// Print the image as base64 instead of writing the file.
        #[arg(long)]
        base64: bool,
    },

    /// Play a source and re-encode the rendered frames into a video file.
    Record {
        source: String,

        /// Output video (generated in the recordings folder if omitted).
        output: Option<PathBuf>,

        /// Seconds to record; records until the end when omitted.
        #[arg(long)]
        seconds: Option<f64>,

        /// Playback rate while recording.
        #[arg(long)]
        speed: Option<f64>,

        /// Start position in seconds.
        #[arg(long)]
        seek: Option<f64>,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PlayerConfig::load_from(path)?,
        None => PlayerConfig::load(),
    };

    match cli.command {
        Command::Play {
            source,
            speed,
            loop_playback,
            seek,
            max_seconds,
        } => run_play(config, &source, speed, loop_playback, seek, max_seconds),
        Command::Capture {
            source,
            output,
            at,
            base64,
        } => run_capture(config, &source, &output, at, base64),
        Command::Record {
            source,
            output,
            seconds,
            speed,
            seek,
        } => run_record(config, &source, output.as_deref(), seconds, speed, seek),
    }
}

fn run_play(
    config: PlayerConfig,
    source: &str,
    speed: Option<f64>,
    loop_playback: bool,
    seek: Option<f64>,
    max_seconds: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let limit = parse_seconds("--max-seconds", max_seconds)?;
    parse_seconds("--seek", seek)?;
    let (mut player, events) = build_player(config);
    player.set_loop(loop_playback || player.is_loop_enabled());
    apply_speed(&mut player, speed)?;

    player.load(source);
    print_events(&events)?;
    if let Some(position) = seek {
        player.seek(position);
    }
    if player.state() == PlayerState::Ready {
        player.play();
    }

    drive(&mut player, &events, limit, |p| p.state().is_terminal())?;
    ensure_not_failed(&player)
}

fn run_capture(
    mut config: PlayerConfig,
    source: &str,
    output: &Path,
    at: f64,
    base64: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    parse_seconds("--at", Some(at))?;
    config.autoplay = false;
    if let Some(ext) = output.extension().and_then(|e| e.to_str()) {
        config.capture.image_format = StillImageFormat::from_extension(ext);
    }

    let (mut player, events) = build_player(config);
    player.load(source);
    print_events(&events)?;
    ensure_not_failed(&player)?;

    player.seek(at);
    let mut ticks = 0;
    while !seek_settled(&player) || player.capture_frame().is_err() {
        if ticks >= MAX_SEEK_TICKS || player.state() == PlayerState::Failed {
            ensure_not_failed(&player)?;
            return Err(format!("No frame rendered at {at}s").into());
        }
        player.tick();
        ticks += 1;
    }
    print_events(&events)?;

    let image = player.capture_frame_as_image()?;
    if base64 {
        println!("{}", image.to_base64());
        return Ok(());
    }
    std::fs::write(output, &image.bytes)?;
    log::info!(
        "Captured {}x{} {} to {}",
        image.width,
        image.height,
        image.format,
        output.display()
    );
    Ok(())
}

fn run_record(
    mut config: PlayerConfig,
    source: &str,
    output: Option<&Path>,
    seconds: Option<f64>,
    speed: Option<f64>,
    seek: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let limit = parse_seconds("--seconds", seconds)?;
    parse_seconds("--seek", seek)?;
    config.autoplay = true;

    let (mut player, events) = build_player(config);
    apply_speed(&mut player, speed)?;
    player.load(source);
    print_events(&events)?;
    ensure_not_failed(&player)?;
    if let Some(position) = seek {
        player.seek(position);
    }

    let requested = output.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
    let path = player.try_start_recording(&requested)?;
    print_events(&events)?;

    drive(&mut player, &events, limit, |p| p.state().is_terminal())?;

    let handle = player.stop_recording()?;
    print_events(&events)?;
    let summary = handle.wait()?;
    log::info!(
        "Recorded {} frames ({:.2}s) to {}",
        summary.frame_count,
        summary.duration.as_secs_f64(),
        path.display()
    );
    println!("{}", summary.output_path.display());
    Ok(())
}

fn build_player(config: PlayerConfig) -> (PlaybackController, Receiver<PlayerEvent>) {
    let (sink, events) = ChannelEventSink::unbounded();
    (create_player(config, Arc::new(sink)), events)
}

/// Ticks the player at its configured cadence until `done` holds or the
/// wall-clock limit passes.
fn drive(
    player: &mut PlaybackController,
    events: &Receiver<PlayerEvent>,
    limit: Option<Duration>,
    done: impl Fn(&PlaybackController) -> bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ticker = player.time_source().subscribe();
    let started = Instant::now();
    while !done(player) {
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        ticker.recv()?;
        player.tick();
        print_events(events)?;
    }
    Ok(())
}

fn print_events(events: &Receiver<PlayerEvent>) -> Result<(), Box<dyn std::error::Error>> {
    for event in events.try_iter() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}

fn seek_settled(player: &PlaybackController) -> bool {
    player
        .session()
        .is_some_and(|s| s.pending_seek_rate.is_none())
}

fn ensure_not_failed(player: &PlaybackController) -> Result<(), Box<dyn std::error::Error>> {
    if player.state() == PlayerState::Failed {
        let source = player.session().map(|s| s.source.as_str()).unwrap_or("");
        return Err(format!("Playback of '{source}' failed").into());
    }
    Ok(())
}

fn apply_speed(
    player: &mut PlaybackController,
    speed: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    match speed {
        Some(rate) if !rate.is_finite() || rate <= 0.0 => {
            Err(format!("Speed must be a positive number, got {rate}").into())
        }
        Some(rate) => {
            player.set_speed(rate);
            Ok(())
        }
        None => Ok(()),
    }
}

/// Rejects values that do not fit in a `Duration`.
fn parse_seconds(
    flag: &str,
    value: Option<f64>,
) -> Result<Option<Duration>, Box<dyn std::error::Error>> {
    let Some(v) = value else {
        return Ok(None);
    };
    match Duration::try_from_secs_f64(v) {
        Ok(duration) => Ok(Some(duration)),
        Err(_) => Err(format!("{flag} must be a non-negative number of seconds, got {v}").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("--seek", None).unwrap(), None);
        assert_eq!(
            parse_seconds("--seek", Some(1.5)).unwrap(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(parse_seconds("--at", Some(0.0)).unwrap(), Some(Duration::ZERO));
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(1e20)]
    #[case(f64::MAX)]
    fn test_parse_seconds_rejects(#[case] value: f64) {
        let err = parse_seconds("--seconds", Some(value)).unwrap_err();
        assert!(err.to_string().starts_with("--seconds must be"));
    }
}
