//! Background panorama loading.
//!
//! Reading and decoding a panorama takes long enough to stall a frame, so each
//! fetch runs on its own worker thread. Finished images are collected on the
//! render thread and uploaded there.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use image::RgbaImage;

use crate::error::{TextureLoadError, TextureLoadReason};
use crate::texture::{Sampling, Texture, fit_within};
use crate::tour::graph::panorama_path;
use crate::tour::{SceneId, TextureSource};

/// Read and decode the image at `path`, downscaling it so neither side
/// exceeds `max_dimension`.
pub fn decode_image(path: &Path, max_dimension: Option<u32>) -> Result<RgbaImage, TextureLoadReason> {
    let bytes = std::fs::read(path)?;
    let image = image::load_from_memory(&bytes)?.to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(TextureLoadReason::Empty);
    }

    if let Some(max) = max_dimension {
        if let Cow::Owned(fitted) = fit_within(&image, max) {
            return Ok(fitted);
        }
    }
    Ok(image)
}

struct Job {
    scene: SceneId,
    path: PathBuf,
    handle: JoinHandle<Result<RgbaImage, TextureLoadReason>>,
}

type FetchResult = (SceneId, Result<RgbaImage, TextureLoadError>);

/// Decodes panorama images off the render thread.
#[derive(Default)]
pub struct ImageFetcher {
    jobs: Vec<Job>,
    /// Requests whose worker could not be started.
    failed: Vec<FetchResult>,
    /// Largest width or height handed back; bigger images are downscaled.
    max_dimension: Option<u32>,
}

impl ImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = Some(max);
        self
    }

    /// Start decoding `path` for `scene`.
    ///
    /// If no worker can be started the failure is reported on the next poll.
    pub fn request(&mut self, scene: SceneId, path: PathBuf) {
        let worker_path = path.clone();
        let max_dimension = self.max_dimension;
        let spawned = thread::Builder::new()
            .name("panorama-fetch".to_string())
            .spawn(move || decode_image(&worker_path, max_dimension));

        match spawned {
            Ok(handle) => self.jobs.push(Job {
                scene,
                path,
                handle,
            }),
            Err(err) => {
                let error = TextureLoadError {
                    scene: scene.clone(),
                    path,
                    reason: TextureLoadReason::Io(err),
                };
                self.failed.push((scene, Err(error)));
            }
        }
    }

    /// Jobs that finished since the last call, in request order.
    pub fn poll(&mut self) -> Vec<FetchResult> {
        let mut results = std::mem::take(&mut self.failed);
        let (done, running): (Vec<Job>, Vec<Job>) = self
            .jobs
            .drain(..)
            .partition(|job| job.handle.is_finished());
        self.jobs = running;

        results.extend(done.into_iter().map(|job| {
            let result = job
                .handle
                .join()
                .unwrap_or(Err(TextureLoadReason::WorkerGone))
                .map_err(|reason| TextureLoadError {
                    scene: job.scene.clone(),
                    path: job.path,
                    reason,
                });
            (job.scene, result)
        }));
        results
    }

    /// Number of fetches still running.
    pub fn in_flight(&self) -> usize {
        self.jobs.len() + self.failed.len()
    }
}

/// Fetches panoramas from disk and uploads them to the GPU.
pub struct GpuTextureSource {
    fetcher: ImageFetcher,
    device: wgpu::Device,
    queue: wgpu::Queue,
    image_directory: Option<PathBuf>,
}

impl GpuTextureSource {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, image_directory: Option<PathBuf>) -> Self {
        let max = device.limits().max_texture_dimension_2d;
        Self {
            fetcher: ImageFetcher::new().with_max_dimension(max),
            device,
            queue,
            image_directory,
        }
    }
}

impl TextureSource for GpuTextureSource {
    type Texture = Texture;

    fn fetch(&mut self, scene: &SceneId) {
        let path = panorama_path(self.image_directory.as_deref(), scene);
        log::debug!("Decoding {}", path.display());
        self.fetcher.request(scene.clone(), path);
    }

    fn poll(&mut self) -> Vec<(SceneId, Result<Texture, TextureLoadError>)> {
        self.fetcher
            .poll()
            .into_iter()
            .map(|(scene, result)| {
                let texture = result.map(|image| {
                    Texture::from_image(
                        &self.device,
                        &self.queue,
                        &image,
                        Sampling::Wrap,
                        &format!("Panorama {}", scene),
                    )
                });
                (scene, texture)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("panotour-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn wait_for(fetcher: &mut ImageFetcher) -> Vec<FetchResult> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut results = Vec::new();
        while fetcher.in_flight() > 0 {
            assert!(Instant::now() < deadline, "fetch did not finish");
            results.extend(fetcher.poll());
            thread::sleep(Duration::from_millis(5));
        }
        results.extend(fetcher.poll());
        results
    }

    #[test]
    fn decodes_images_in_the_background() {
        let dir = scratch_dir("decode");
        let path = dir.join("pano_1.png");
        RgbaImage::from_pixel(8, 4, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut fetcher = ImageFetcher::new();
        fetcher.request(SceneId::new("pano_1"), path);
        let results = wait_for(&mut fetcher);

        assert_eq!(results.len(), 1);
        let (scene, result) = &results[0];
        assert_eq!(scene.as_str(), "pano_1");
        let image = result.as_ref().unwrap();
        assert_eq!(image.dimensions(), (8, 4));
        assert_eq!(image.get_pixel(3, 2).0, [10, 20, 30, 255]);
    }

    #[test]
    fn oversized_images_are_downscaled_before_upload() {
        let dir = scratch_dir("oversized");
        let path = dir.join("wide.png");
        RgbaImage::from_pixel(64, 32, image::Rgba([200, 100, 50, 255]))
            .save(&path)
            .unwrap();

        let mut fetcher = ImageFetcher::new().with_max_dimension(16);
        fetcher.request(SceneId::new("wide"), path);
        let results = wait_for(&mut fetcher);

        let image = results[0].1.as_ref().unwrap();
        assert_eq!(image.dimensions(), (16, 8));
        let pixel = image.get_pixel(8, 4).0;
        for (got, want) in pixel.iter().zip([200u8, 100, 50, 255]) {
            assert!(got.abs_diff(want) <= 1, "{pixel:?}");
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = scratch_dir("missing");
        let mut fetcher = ImageFetcher::new();
        fetcher.request(SceneId::new("nowhere"), dir.join("nowhere.jpg"));

        let results = wait_for(&mut fetcher);
        let Err(err) = &results[0].1 else {
            panic!("expected a failure");
        };
        assert_eq!(err.scene.as_str(), "nowhere");
        assert!(matches!(err.reason, TextureLoadReason::Io(_)));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = scratch_dir("garbage");
        let path = dir.join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let mut fetcher = ImageFetcher::new();
        fetcher.request(SceneId::new("broken"), path);

        let results = wait_for(&mut fetcher);
        assert!(matches!(
            &results[0].1,
            Err(TextureLoadError {
                reason: TextureLoadReason::Decode(_),
                ..
            })
        ));
    }
}
