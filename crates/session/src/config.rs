use std::path::PathBuf;

use scrub_core::playback::PlaybackSpeed;
use scrub_core::review::MatchId;
use scrub_core::types::{
    CoordinateSpace, FrameRate, DEFAULT_FPS, DEFAULT_NATIVE_HEIGHT, DEFAULT_NATIVE_WIDTH,
};
use scrub_core::CoreError;

/// Session configuration loaded from environment variables.
///
/// Every field has a default matching the bundled sample data.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Frames per second used to turn occurrence counts into durations.
    pub fps: FrameRate,
    /// Native coordinate space of the bounding boxes.
    pub space: CoordinateSpace,
    pub frames_path: PathBuf,
    pub matches_path: PathBuf,
    /// Match opened by the binary.
    pub match_id: MatchId,
    pub playback_speed: PlaybackSpeed,
    /// When set, every rendered frame is written here as a PNG.
    pub output_dir: Option<PathBuf>,
}

impl SessionConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default             |
    /// |------------------------|---------------------|
    /// | `SCRUB_FPS`            | `6`                 |
    /// | `SCRUB_NATIVE_WIDTH`   | `560`               |
    /// | `SCRUB_NATIVE_HEIGHT`  | `280`               |
    /// | `SCRUB_FRAMES_PATH`    | `data/frames.json`  |
    /// | `SCRUB_MATCHES_PATH`   | `data/matches.json` |
    /// | `SCRUB_MATCH_ID`       | `1`                 |
    /// | `SCRUB_PLAYBACK_SPEED` | `1`                 |
    /// | `SCRUB_OUTPUT_DIR`     | unset               |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let fps = FrameRate::new(parse_or(&lookup, "SCRUB_FPS", DEFAULT_FPS)?)?;

        let space = CoordinateSpace::new(
            parse_or(&lookup, "SCRUB_NATIVE_WIDTH", DEFAULT_NATIVE_WIDTH)?,
            parse_or(&lookup, "SCRUB_NATIVE_HEIGHT", DEFAULT_NATIVE_HEIGHT)?,
        )?;

        let frames_path = lookup("SCRUB_FRAMES_PATH")
            .unwrap_or_else(|| "data/frames.json".into())
            .into();

        let matches_path = lookup("SCRUB_MATCHES_PATH")
            .unwrap_or_else(|| "data/matches.json".into())
            .into();

        let match_id = parse_or(&lookup, "SCRUB_MATCH_ID", 1)?;

        let playback_speed = match lookup("SCRUB_PLAYBACK_SPEED") {
            Some(raw) => PlaybackSpeed::parse(&raw)?,
            None => PlaybackSpeed::default(),
        };

        let output_dir = lookup("SCRUB_OUTPUT_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            fps,
            space,
            frames_path,
            matches_path,
            match_id,
            playback_speed,
            output_dir,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, CoreError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{key} has invalid value '{raw}'"))),
    }
}
