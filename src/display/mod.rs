//! Decoded view of the current snapshot.
//!
//! The slot owns at most one decoded image. Showing a different snapshot
//! drops the previous decode, so memory does not grow with the history.

use image::DynamicImage;

use crate::geometry::Size;
use crate::history::{image_size, Snapshot, SnapshotResult};

#[derive(Debug)]
pub struct LoadedSnapshot {
    snapshot: Snapshot,
    image: DynamicImage,
    natural: Size,
}

impl LoadedSnapshot {
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Natural dimensions, measured once when the snapshot was loaded.
    pub fn natural_size(&self) -> Size {
        self.natural
    }
}

#[derive(Debug, Default)]
pub struct DisplaySlot {
    loaded: Option<LoadedSnapshot>,
    loads: u64,
}

impl DisplaySlot {
    pub const fn new() -> Self {
        Self {
            loaded: None,
            loads: 0,
        }
    }

    /// Decodes `snapshot` unless it is already shown. On failure the slot
    /// keeps whatever it showed before.
    pub fn show(&mut self, snapshot: &Snapshot) -> SnapshotResult<&LoadedSnapshot> {
        let loaded = match self.loaded.take() {
            Some(loaded) if loaded.snapshot.same_as(snapshot) => loaded,
            previous => {
                let image = match snapshot.decode() {
                    Ok(image) => image,
                    Err(err) => {
                        self.loaded = previous;
                        return Err(err);
                    }
                };
                drop(previous);
                let natural = image_size(&image);
                tracing::debug!(
                    name = snapshot.name(),
                    width = natural.width,
                    height = natural.height,
                    "snapshot loaded for display"
                );
                self.loads = self.loads.saturating_add(1);
                LoadedSnapshot {
                    snapshot: snapshot.clone(),
                    image,
                    natural,
                }
            }
        };
        Ok(self.loaded.insert(loaded))
    }

    pub fn release(&mut self) {
        self.loaded = None;
    }

    pub fn loaded(&self) -> Option<&LoadedSnapshot> {
        self.loaded.as_ref()
    }

    pub fn natural_size(&self) -> Option<Size> {
        self.loaded.as_ref().map(LoadedSnapshot::natural_size)
    }

    pub fn image(&self) -> Option<&DynamicImage> {
        self.loaded.as_ref().map(LoadedSnapshot::image)
    }

    /// Number of decodes performed so far.
    pub fn load_count(&self) -> u64 {
        self.loads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_png;

    #[test]
    fn show_captures_natural_size_once_per_snapshot() {
        let mut slot = DisplaySlot::new();
        let snapshot = test_png(12, 9, "a.png");

        let natural = slot.show(&snapshot).unwrap().natural_size();
        assert_eq!(natural, Size::new(12, 9));
        slot.show(&snapshot.clone()).unwrap();
        assert_eq!(slot.load_count(), 1);
    }

    #[test]
    fn showing_another_snapshot_replaces_the_decode() {
        let mut slot = DisplaySlot::new();
        slot.show(&test_png(4, 4, "a.png")).unwrap();
        let next = test_png(8, 2, "b.png");
        slot.show(&next).unwrap();

        assert_eq!(slot.natural_size(), Some(Size::new(8, 2)));
        assert!(slot.loaded().unwrap().snapshot().same_as(&next));
        assert_eq!(slot.load_count(), 2);
    }

    #[test]
    fn failed_decode_keeps_previous_image() {
        let mut slot = DisplaySlot::new();
        slot.show(&test_png(4, 4, "a.png")).unwrap();
        let broken = Snapshot::new(b"garbage".to_vec(), "image/png", "broken.png");

        assert!(slot.show(&broken).is_err());
        assert_eq!(slot.natural_size(), Some(Size::new(4, 4)));
    }

    #[test]
    fn release_empties_the_slot() {
        let mut slot = DisplaySlot::new();
        slot.show(&test_png(1, 1, "a.png")).unwrap();
        slot.release();
        assert!(slot.loaded().is_none());
        assert!(slot.image().is_none());
    }
}
