mod source;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use slide_model::Slide;
use tracing::{debug, info};

use crate::error::{LoadError, SliderError};

pub use source::{UrlImageSource, decode_rgba8_apply_exif, fit_within};

/// CPU-side RGBA8 pixels ready for upload.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Fetches and decodes the bytes behind an image URL.
pub trait ImageSource: Send + Sync {
    fn load(&self, url: &str) -> BoxFuture<'static, Result<DecodedImage, LoadError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// Clamp-to-edge slide image.
    Slide,
    /// Tiles on both axes so a small pattern covers the full quad.
    Displacement,
}

/// Turns decoded pixels into whatever the renderer binds.
pub trait TextureFactory: Send + Sync {
    type Texture: Send + Sync + 'static;

    fn create(
        &self,
        label: &str,
        image: &DecodedImage,
        kind: TextureKind,
    ) -> Result<Self::Texture, LoadError>;
}

pub type SharedLoad<T> = Shared<BoxFuture<'static, Result<Arc<T>, LoadError>>>;

/// Slide textures, index-aligned with the slide list.
pub struct TextureSet<T>(Vec<Arc<T>>);

impl<T> TextureSet<T> {
    pub fn get(&self, index: usize) -> Option<&Arc<T>> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct LoadedAssets<T> {
    pub textures: TextureSet<T>,
    pub displacement: Arc<T>,
}

/// URL-keyed displacement textures plus the loads still outstanding.
pub struct DisplacementCache<T> {
    ready: HashMap<String, Arc<T>>,
    in_flight: HashMap<String, SharedLoad<T>>,
}

impl<T> Default for DisplacementCache<T> {
    fn default() -> Self {
        Self {
            ready: HashMap::new(),
            in_flight: HashMap::new(),
        }
    }
}

impl<T> DisplacementCache<T> {
    /// Finished texture for `url`, promoting a completed in-flight load.
    /// A failed load is evicted so the next request fetches again.
    fn lookup(&mut self, url: &str) -> Option<Arc<T>> {
        if let Some(texture) = self.ready.get(url) {
            return Some(texture.clone());
        }
        let outcome = self.in_flight.get(url)?.peek().cloned()?;
        self.in_flight.remove(url);
        match outcome {
            Ok(texture) => {
                self.ready.insert(url.to_string(), texture.clone());
                Some(texture)
            }
            Err(err) => {
                debug!(url, error = %err, "evicting failed displacement load");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty() && self.in_flight.is_empty()
    }

    fn clear(&mut self) -> usize {
        let released = self.ready.len();
        self.ready.clear();
        self.in_flight.clear();
        released
    }
}

/// Owns the displacement cache of one slideshow instance.
pub struct ResourceLoader<T: Send + Sync + 'static> {
    source: Arc<dyn ImageSource>,
    factory: Arc<dyn TextureFactory<Texture = T>>,
    cache: DisplacementCache<T>,
}

impl<T: Send + Sync + 'static> ResourceLoader<T> {
    pub fn new(
        source: Arc<dyn ImageSource>,
        factory: Arc<dyn TextureFactory<Texture = T>>,
    ) -> Self {
        Self {
            source,
            factory,
            cache: DisplacementCache::default(),
        }
    }

    /// Load every slide image and the default displacement map concurrently.
    pub async fn load_all(
        &mut self,
        slides: &[Slide],
        default_map: &str,
    ) -> Result<LoadedAssets<T>, SliderError> {
        if slides.is_empty() {
            return Err(SliderError::InvalidConfiguration(
                "no slides to load".to_string(),
            ));
        }
        let slide_loads = future::try_join_all(
            slides
                .iter()
                .map(|slide| self.fetch(&slide.image_url, TextureKind::Slide)),
        );
        let default_load = self.load_displacement(default_map);
        let (textures, displacement) = futures::try_join!(slide_loads, default_load)?;
        if textures.is_empty() {
            return Err(SliderError::InvalidConfiguration(
                "slide texture set is empty".to_string(),
            ));
        }
        self.cache.lookup(default_map.trim());
        info!(slides = textures.len(), "slide textures loaded");
        Ok(LoadedAssets {
            textures: TextureSet(textures),
            displacement,
        })
    }

    /// Cached displacement texture for `url`, or a shared handle on its load.
    ///
    /// Concurrent callers for the same URL share a single fetch.
    pub fn load_displacement(&mut self, url: &str) -> SharedLoad<T> {
        let url = url.trim();
        if let Some(texture) = self.cache.lookup(url) {
            debug!(url, "displacement cache hit");
            return future::ready(Ok(texture)).boxed().shared();
        }
        if let Some(pending) = self.cache.in_flight.get(url) {
            debug!(url, "joining in-flight displacement load");
            return pending.clone();
        }
        debug!(url, "displacement cache miss");
        let load = self.fetch(url, TextureKind::Displacement).shared();
        self.cache.in_flight.insert(url.to_string(), load.clone());
        load
    }

    pub fn cached_displacements(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached texture and abandon outstanding loads.
    pub fn dispose(&mut self) -> usize {
        let released = self.cache.clear();
        debug!(released, "displacement cache cleared");
        released
    }

    fn fetch(&self, url: &str, kind: TextureKind) -> BoxFuture<'static, Result<Arc<T>, LoadError>> {
        let load = self.source.load(url);
        let factory = self.factory.clone();
        let url = url.to_string();
        async move {
            let image = load.await?;
            let texture = factory.create(&url, &image, kind)?;
            Ok(Arc::new(texture))
        }
        .boxed()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::LoadErrorKind;

    /// In-memory source that counts fetches and can delay or fail URLs.
    #[derive(Default)]
    pub struct MemorySource {
        pub fetches: Mutex<HashMap<String, usize>>,
        pub failing: Mutex<HashSet<String>>,
        pub delay: Mutex<Duration>,
    }

    impl MemorySource {
        pub fn fail(&self, url: &str) {
            self.failing.lock().unwrap().insert(url.to_string());
        }

        pub fn recover(&self, url: &str) {
            self.failing.lock().unwrap().remove(url);
        }

        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = delay;
        }

        pub fn fetch_count(&self, url: &str) -> usize {
            self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    impl ImageSource for MemorySource {
        fn load(&self, url: &str) -> BoxFuture<'static, Result<DecodedImage, LoadError>> {
            *self
                .fetches
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default() += 1;
            let fail = self.failing.lock().unwrap().contains(url);
            let delay = *self.delay.lock().unwrap();
            let url = url.to_string();
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if fail {
                    return Err(LoadError::new(url, LoadErrorKind::Fetch, "not found"));
                }
                Ok(DecodedImage {
                    width: 2,
                    height: 2,
                    pixels: vec![255; 16],
                })
            }
            .boxed()
        }
    }

    #[derive(Debug)]
    pub struct FakeTexture {
        pub label: String,
        pub kind: TextureKind,
        drops: Arc<AtomicUsize>,
    }

    impl Drop for FakeTexture {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Counts textures created and dropped.
    #[derive(Default)]
    pub struct CountingFactory {
        pub created: AtomicUsize,
        pub drops: Arc<AtomicUsize>,
    }

    impl CountingFactory {
        pub fn created(&self) -> usize {
            self.created.load(Ordering::SeqCst)
        }

        pub fn dropped(&self) -> usize {
            self.drops.load(Ordering::SeqCst)
        }
    }

    impl TextureFactory for CountingFactory {
        type Texture = FakeTexture;

        fn create(
            &self,
            label: &str,
            _image: &DecodedImage,
            kind: TextureKind,
        ) -> Result<FakeTexture, LoadError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(FakeTexture {
                label: label.to_string(),
                kind,
                drops: self.drops.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::{CountingFactory, FakeTexture, MemorySource};
    use super::*;

    fn loader() -> (
        ResourceLoader<FakeTexture>,
        Arc<MemorySource>,
        Arc<CountingFactory>,
    ) {
        let source = Arc::new(MemorySource::default());
        let factory = Arc::new(CountingFactory::default());
        (
            ResourceLoader::new(source.clone(), factory.clone()),
            source,
            factory,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_share_one_fetch() {
        let (mut loader, source, factory) = loader();
        source.set_delay(Duration::from_millis(50));

        let first = loader.load_displacement("/maps/fluid.jpg");
        let second = loader.load_displacement("/maps/fluid.jpg");
        let (a, b) = futures::join!(first, second);
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.fetch_count("/maps/fluid.jpg"), 1);
        assert_eq!(factory.created(), 1);
        assert_eq!(a.kind, TextureKind::Displacement);

        let third = loader.load_displacement("/maps/fluid.jpg").await.unwrap();
        assert!(Arc::ptr_eq(&a, &third));
        assert_eq!(source.fetch_count("/maps/fluid.jpg"), 1);
        assert_eq!(loader.cached_displacements(), 1);
    }

    #[tokio::test]
    async fn failed_load_is_retried_on_next_request() {
        let (mut loader, source, _factory) = loader();
        source.fail("/maps/broken.jpg");
        assert!(loader.load_displacement("/maps/broken.jpg").await.is_err());

        source.recover("/maps/broken.jpg");
        assert!(loader.load_displacement("/maps/broken.jpg").await.is_ok());
        assert_eq!(source.fetch_count("/maps/broken.jpg"), 2);
    }

    #[tokio::test]
    async fn load_all_is_index_aligned_and_caches_default_map() {
        let (mut loader, source, _factory) = loader();
        let slides = vec![Slide::new("/a.jpg"), Slide::new("/b.jpg"), Slide::new("/c.jpg")];
        let assets = loader.load_all(&slides, "/maps/fluid.jpg").await.unwrap();

        assert_eq!(assets.textures.len(), 3);
        assert_eq!(assets.textures.get(1).unwrap().label, "/b.jpg");
        assert_eq!(assets.textures.get(2).unwrap().kind, TextureKind::Slide);
        assert_eq!(loader.cached_displacements(), 1);

        let again = loader.load_displacement("/maps/fluid.jpg").await.unwrap();
        assert!(Arc::ptr_eq(&again, &assets.displacement));
        assert_eq!(source.fetch_count("/maps/fluid.jpg"), 1);
    }

    #[tokio::test]
    async fn load_all_fails_when_any_slide_fails() {
        let (mut loader, source, _factory) = loader();
        source.fail("/b.jpg");
        let slides = vec![Slide::new("/a.jpg"), Slide::new("/b.jpg")];
        let err = loader.load_all(&slides, "/maps/fluid.jpg").await.err().unwrap();
        match err {
            SliderError::ResourceLoad(load) => assert_eq!(load.url, "/b.jpg"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_all_rejects_empty_slide_list() {
        let (mut loader, _source, _factory) = loader();
        let err = loader.load_all(&[], "/maps/fluid.jpg").await.err().unwrap();
        assert!(matches!(err, SliderError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn dispose_releases_cached_textures() {
        let (mut loader, _source, factory) = loader();
        let texture = loader.load_displacement("/maps/a.jpg").await.unwrap();
        loader.load_displacement("/maps/b.jpg").await.unwrap();
        // promote /maps/b.jpg
        loader.load_displacement("/maps/b.jpg").await.unwrap();
        drop(texture);

        drop(loader.load_displacement("/maps/a.jpg"));
        assert_eq!(loader.dispose(), 2);
        assert_eq!(factory.dropped(), 2);
        assert_eq!(loader.dispose(), 0);
    }
}
