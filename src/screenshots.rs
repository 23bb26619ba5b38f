use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
    time::SystemTime,
};

pub const SCREENSHOT_URI_SCHEME: &str = "screenshot://";

/// Captures kept before the oldest one is dropped
pub const DEFAULT_SCREENSHOT_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct StoredScreenshot {
    pub name: String,
    pub png: Vec<u8>,
    pub full_page: bool,
    pub captured_at: SystemTime,
    sequence: u64,
}

impl StoredScreenshot {
    pub fn uri(&self) -> String {
        screenshot_uri(&self.name)
    }
}

/// Resource URI for a screenshot name. The name is percent-encoded.
pub fn screenshot_uri(name: &str) -> String {
    format!("{SCREENSHOT_URI_SCHEME}{}", urlencoding::encode(name))
}

#[derive(Default)]
struct Shots {
    by_name: BTreeMap<String, StoredScreenshot>,
    next_sequence: u64,
}

/// In-memory store of named screenshots. Saving under an existing name
/// replaces the earlier capture. Once `capacity` names are held, a new name
/// evicts the oldest capture.
pub struct ScreenshotStore {
    shots: RwLock<Shots>,
    capacity: usize,
}

impl Default for ScreenshotStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SCREENSHOT_CAPACITY)
    }
}

impl ScreenshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            shots: RwLock::new(Shots::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&self, name: &str, png: Vec<u8>, full_page: bool) {
        let mut shots = self.shots.write().unwrap_or_else(PoisonError::into_inner);

        if !shots.by_name.contains_key(name) && shots.by_name.len() >= self.capacity {
            let oldest = shots
                .by_name
                .values()
                .min_by_key(|shot| (shot.captured_at, shot.sequence))
                .map(|shot| shot.name.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Screenshot store full, dropping '{}'", oldest);
                shots.by_name.remove(&oldest);
            }
        }

        let sequence = shots.next_sequence;
        shots.next_sequence += 1;
        shots.by_name.insert(
            name.to_string(),
            StoredScreenshot {
                name: name.to_string(),
                png,
                full_page,
                captured_at: SystemTime::now(),
                sequence,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<StoredScreenshot> {
        self.shots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_name
            .get(name)
            .cloned()
    }

    /// Look a screenshot up by its `screenshot://<name>` URI.
    pub fn get_by_uri(&self, uri: &str) -> Option<StoredScreenshot> {
        let encoded = uri.strip_prefix(SCREENSHOT_URI_SCHEME)?;
        let name = urlencoding::decode(encoded).ok()?;
        self.get(&name)
    }

    /// All stored screenshots, ordered by name.
    pub fn list(&self) -> Vec<StoredScreenshot> {
        self.shots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_name
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_name
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_by_name() {
        let store = ScreenshotStore::new();
        store.insert("home", vec![1], true);
        store.insert("home", vec![2, 3], false);
        assert_eq!(store.len(), 1);
        let shot = store.get("home").unwrap();
        assert_eq!(shot.png, vec![2, 3]);
        assert!(!shot.full_page);
    }

    #[test]
    fn lookup_by_uri() {
        let store = ScreenshotStore::new();
        store.insert("login page", vec![9], true);
        assert_eq!(store.list()[0].uri(), "screenshot://login%20page");
        assert!(store.get_by_uri("screenshot://login%20page").is_some());
        assert!(store.get_by_uri("console://logs").is_none());
    }

    #[test]
    fn uri_escapes_reserved_characters() {
        assert_eq!(screenshot_uri("home"), "screenshot://home");
        assert_eq!(screenshot_uri("a/b?c#d"), "screenshot://a%2Fb%3Fc%23d");
    }

    #[test]
    fn oldest_capture_is_evicted_when_full() {
        let store = ScreenshotStore::with_capacity(2);
        store.insert("first", vec![1], true);
        store.insert("second", vec![2], true);
        store.insert("first", vec![3], true);
        assert_eq!(store.len(), 2);

        store.insert("third", vec![4], true);
        assert_eq!(store.len(), 2);
        assert!(store.get("second").is_none());
        assert_eq!(store.get("first").unwrap().png, vec![3]);
        assert!(store.get("third").is_some());
    }
}
