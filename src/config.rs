//! Command-line configuration for the `stagehand` binary.

use std::path::PathBuf;

pub const USAGE: &str = "\
usage: stagehand <scene.json> [options]

options:
  --root <id>      build from this node instead of the document's rootId
  --frames <n>     headless frames to drive (default 120)
  --fps <n>        simulated frame rate for headless runs (default 60)
  --list           print every built node name
  --window         run the frame loop from a window's event loop (input,
                   animation, LOD); the built-in renderer draws nothing
  --size <WxH>     window size (default 1280x720)";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing scene file argument")]
    MissingScenePath,
    #[error("option '{0}' needs a value")]
    MissingValue(String),
    #[error("invalid value '{value}' for '{flag}'")]
    InvalidValue { flag: String, value: String },
    #[error("unknown option '{0}'")]
    UnknownFlag(String),
    #[error("help requested")]
    HelpRequested,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub scene_path: PathBuf,
    pub root: Option<String>,
    pub frames: u32,
    pub fps: f32,
    pub list: bool,
    pub windowed: bool,
    pub window_size: (u32, u32),
}

impl AppConfig {
    pub fn new(scene_path: impl Into<PathBuf>) -> Self {
        Self {
            scene_path: scene_path.into(),
            root: None,
            frames: 120,
            fps: 60.0,
            list: false,
            windowed: false,
            window_size: (1280, 720),
        }
    }

    /// Parses arguments without the program name.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let mut scene_path = None;
        let mut config = Self::new(PathBuf::new());

        while let Some(arg) = args.next() {
            let mut value_for = |flag: &str| {
                args.next()
                    .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
            };
            match arg.as_str() {
                "-h" | "--help" => return Err(ConfigError::HelpRequested),
                "--root" => config.root = Some(value_for("--root")?),
                "--frames" => config.frames = parse_value("--frames", value_for("--frames")?)?,
                "--fps" => {
                    let fps: f32 = parse_value("--fps", value_for("--fps")?)?;
                    if !(fps.is_finite() && fps > 0.0) {
                        return Err(ConfigError::InvalidValue {
                            flag: "--fps".to_string(),
                            value: fps.to_string(),
                        });
                    }
                    config.fps = fps;
                }
                "--list" => config.list = true,
                "--window" => config.windowed = true,
                "--size" => config.window_size = parse_size(&value_for("--size")?)?,
                flag if flag.starts_with("--") => {
                    return Err(ConfigError::UnknownFlag(flag.to_string()));
                }
                _ if scene_path.is_none() => scene_path = Some(PathBuf::from(arg)),
                _ => return Err(ConfigError::UnknownFlag(arg)),
            }
        }

        config.scene_path = scene_path.ok_or(ConfigError::MissingScenePath)?;
        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value,
    })
}

fn parse_size(value: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        flag: "--size".to_string(),
        value: value.to_string(),
    };
    let (w, h) = value.split_once(['x', 'X']).ok_or_else(invalid)?;
    let w: u32 = w.trim().parse().map_err(|_| invalid())?;
    let h: u32 = h.trim().parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}
