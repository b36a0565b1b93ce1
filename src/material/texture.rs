use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::scene::TextureDescriptor;

/// Highest explicit mip level accepted from a texture record.
pub const MAX_MIP_LEVEL: usize = 7;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogv", "mov"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Linear,
    Srgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSource {
    pub path: PathBuf,
    /// Id of the hidden playback element the renderer creates for it.
    pub element_id: String,
    pub autoplay: bool,
    pub looped: bool,
    pub muted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    Image(PathBuf),
    Video(VideoSource),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MipImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MipState {
    Pending,
    Ready(MipImage),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MipLevel {
    pub level: u32,
    pub path: PathBuf,
    pub state: MipState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mipmaps {
    /// The renderer generates the chain.
    Automatic { min_filter: Filter, mag_filter: Filter },
    /// Explicit levels filled in by [`TextureStore::poll_pending`].
    Manual(Vec<MipLevel>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub key: String,
    pub source: TextureSource,
    pub anisotropy: u32,
    pub color_space: ColorSpace,
    pub mipmaps: Mipmaps,
}

/// Texture record after table building: paths checked for a video
/// extension, mip chain truncated at the first gap.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub id: String,
    pub filepath: PathBuf,
    pub is_video: bool,
    pub anisotropy: u32,
    pub mipmaps: Vec<PathBuf>,
}

impl TextureInfo {
    pub fn from_descriptor(descriptor: &TextureDescriptor) -> Self {
        let mut mipmaps: Vec<PathBuf> = Vec::new();
        for path in descriptor.mipmaps.iter().take(MAX_MIP_LEVEL + 1) {
            if path.is_empty() {
                break;
            }
            mipmaps.push(PathBuf::from(path));
        }
        if descriptor.mipmaps.len() > MAX_MIP_LEVEL + 1 {
            log::warn!(
                "Texture '{}' declares {} mip levels; keeping the first {}",
                descriptor.id,
                descriptor.mipmaps.len(),
                MAX_MIP_LEVEL + 1
            );
        }
        Self {
            id: descriptor.id.clone(),
            filepath: PathBuf::from(&descriptor.filepath),
            is_video: is_video_path(Path::new(&descriptor.filepath)),
            anisotropy: descriptor.anisotropy.max(1),
            mipmaps,
        }
    }
}

pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|video| ext.eq_ignore_ascii_case(video))
        })
        .unwrap_or(false)
}

#[derive(Debug, thiserror::Error)]
pub enum TextureLoadError {
    #[error("failed to load image at {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingMip {
    texture: TextureId,
    slot: usize,
}

/// Owns every texture created while resolving materials. Textures are shared
/// per texture record; explicit mip levels load lazily in bounded batches.
#[derive(Debug, Default)]
pub struct TextureStore {
    textures: Vec<Texture>,
    by_key: HashMap<String, TextureId>,
    pending: VecDeque<PendingMip>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the texture for a texture record, creating it on first use.
    pub fn acquire(&mut self, info: &TextureInfo) -> TextureId {
        if let Some(id) = self.by_key.get(&info.id) {
            return *id;
        }
        let id = TextureId(self.textures.len());
        let source = if info.is_video {
            TextureSource::Video(VideoSource {
                path: info.filepath.clone(),
                element_id: info.id.clone(),
                autoplay: true,
                looped: true,
                muted: true,
            })
        } else {
            TextureSource::Image(info.filepath.clone())
        };
        let color_space = if info.is_video {
            ColorSpace::Srgb
        } else {
            ColorSpace::Linear
        };
        let mipmaps = if info.mipmaps.is_empty() {
            Mipmaps::Automatic {
                min_filter: Filter::LinearMipmapLinear,
                mag_filter: Filter::Nearest,
            }
        } else {
            for slot in 0..info.mipmaps.len() {
                self.pending.push_back(PendingMip { texture: id, slot });
            }
            Mipmaps::Manual(
                info.mipmaps
                    .iter()
                    .enumerate()
                    .map(|(level, path)| MipLevel {
                        level: level as u32,
                        path: path.clone(),
                        state: MipState::Pending,
                    })
                    .collect(),
            )
        };
        self.textures.push(Texture {
            key: info.id.clone(),
            source,
            anisotropy: info.anisotropy,
            color_space,
            mipmaps,
        });
        self.by_key.insert(info.id.clone(), id);
        id
    }

    /// Plain image texture keyed by its path, used by the skybox faces.
    pub fn acquire_image(&mut self, path: &str) -> TextureId {
        let key = format!("image:{path}");
        if let Some(id) = self.by_key.get(&key) {
            return *id;
        }
        let id = TextureId(self.textures.len());
        self.textures.push(Texture {
            key: key.clone(),
            source: TextureSource::Image(PathBuf::from(path)),
            anisotropy: 1,
            color_space: ColorSpace::Srgb,
            mipmaps: Mipmaps::Automatic {
                min_filter: Filter::LinearMipmapLinear,
                mag_filter: Filter::Linear,
            },
        });
        self.by_key.insert(key, id);
        id
    }

    /// Loads up to `budget` queued mip levels. A failed level is logged and
    /// marked; the texture stays usable. Returns how many levels were
    /// processed.
    pub fn poll_pending(&mut self, budget: usize) -> usize {
        let mut processed = 0;
        while processed < budget {
            let Some(pending) = self.pending.pop_front() else {
                break;
            };
            processed += 1;
            let Some(texture) = self.textures.get_mut(pending.texture.0) else {
                continue;
            };
            let Mipmaps::Manual(levels) = &mut texture.mipmaps else {
                continue;
            };
            let Some(level) = levels.get_mut(pending.slot) else {
                continue;
            };
            level.state = match load_mip_image(&level.path) {
                Ok(image) => {
                    log::debug!(
                        "Loaded mip level {} of '{}' ({}x{})",
                        level.level,
                        texture.key,
                        image.width,
                        image.height
                    );
                    MipState::Ready(image)
                }
                Err(err) => {
                    log::error!(
                        "Unable to load the image {} as mipmap level {}: {err}",
                        level.path.display(),
                        level.level
                    );
                    MipState::Failed(err.to_string())
                }
            };
        }
        processed
    }
}

fn load_mip_image(path: &Path) -> Result<MipImage, TextureLoadError> {
    let decoded = image::open(path).map_err(|source| TextureLoadError::Image {
        path: path.display().to_string(),
        source,
    })?;
    let rgba = decoded.to_rgba8();
    Ok(MipImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str, filepath: &str, mipmaps: &[&str]) -> TextureDescriptor {
        TextureDescriptor {
            id: id.to_string(),
            filepath: filepath.to_string(),
            anisotropy: 4,
            mipmaps: mipmaps.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("stagehand_{}_{}_{}", std::process::id(), nonce, name))
    }

    #[test]
    fn video_detection_uses_the_extension() {
        assert!(is_video_path(Path::new("clips/intro.mp4")));
        assert!(is_video_path(Path::new("clips/intro.WEBM")));
        assert!(!is_video_path(Path::new("textures/mp4.png")));
        assert!(!is_video_path(Path::new("noextension")));
    }

    #[test]
    fn mip_chain_stops_at_first_gap() {
        let info = TextureInfo::from_descriptor(&descriptor("t", "a.png", &["m0.png", "m1.png", "", "m3.png"]));
        assert_eq!(info.mipmaps, vec![PathBuf::from("m0.png"), PathBuf::from("m1.png")]);
        assert!(!info.is_video);
    }

    #[test]
    fn textures_are_shared_per_record() {
        let mut store = TextureStore::new();
        let info = TextureInfo::from_descriptor(&descriptor("wood", "wood.png", &[]));
        let a = store.acquire(&info);
        let b = store.acquire(&info);
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        match &store.get(a).unwrap().mipmaps {
            Mipmaps::Automatic { min_filter, mag_filter } => {
                assert_eq!(*min_filter, Filter::LinearMipmapLinear);
                assert_eq!(*mag_filter, Filter::Nearest);
            }
            other => panic!("Expected automatic mipmaps, got {other:?}"),
        }
    }

    #[test]
    fn video_textures_are_srgb_and_looping() {
        let mut store = TextureStore::new();
        let id = store.acquire(&TextureInfo::from_descriptor(&descriptor("tv", "clip.mp4", &[])));
        let texture = store.get(id).unwrap();
        assert_eq!(texture.color_space, ColorSpace::Srgb);
        match &texture.source {
            TextureSource::Video(video) => {
                assert_eq!(video.element_id, "tv");
                assert!(video.autoplay && video.looped && video.muted);
            }
            other => panic!("Expected video source, got {other:?}"),
        }
    }

    #[test]
    fn poll_pending_respects_budget_and_survives_failures() {
        let good = temp_path("mip0.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]))
            .save(&good)
            .unwrap();
        let missing = temp_path("missing.png");

        let mut store = TextureStore::new();
        let id = store.acquire(&TextureInfo {
            id: "checker".to_string(),
            filepath: good.clone(),
            is_video: false,
            anisotropy: 1,
            mipmaps: vec![good.clone(), missing],
        });
        assert_eq!(store.pending_len(), 2);

        assert_eq!(store.poll_pending(1), 1);
        assert_eq!(store.pending_len(), 1);
        assert_eq!(store.poll_pending(10), 1);
        assert_eq!(store.poll_pending(10), 0);

        match &store.get(id).unwrap().mipmaps {
            Mipmaps::Manual(levels) => {
                match &levels[0].state {
                    MipState::Ready(image) => {
                        assert_eq!((image.width, image.height), (4, 2));
                        assert_eq!(image.rgba.len(), 4 * 2 * 4);
                    }
                    other => panic!("Expected ready level, got {other:?}"),
                }
                assert!(matches!(levels[1].state, MipState::Failed(_)));
            }
            other => panic!("Expected manual mipmaps, got {other:?}"),
        }

        let _ = std::fs::remove_file(good);
    }
}
