//! Named style images (icons referenced by symbol layers).

use tracing::{debug, warn};

use super::widget::MapWidget;
use super::{lock, map_key, SharedMap};

/// Adds an image on attach and removes it on detach. Failures are logged
/// and otherwise ignored; a missing icon does not break the page.
pub struct MapImage<W: MapWidget> {
    id: String,
    url: String,
    map: Option<SharedMap<W>>,
}

impl<W: MapWidget> MapImage<W> {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        MapImage {
            id: id.into(),
            url: url.into(),
            map: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sync(&mut self, map: Option<&SharedMap<W>>) {
        if self.map.as_ref().map(map_key) == map.map(map_key) {
            return;
        }
        self.detach();
        let Some(map) = map else {
            return;
        };
        {
            let mut widget = lock(map);
            if !widget.has_image(&self.id) {
                if let Err(e) = widget.add_image(&self.id, &self.url) {
                    warn!(image = %self.id, error = %e, "failed to add map image");
                }
            }
        }
        self.map = Some(SharedMap::clone(map));
    }

    pub fn detach(&mut self) {
        let Some(map) = self.map.take() else {
            return;
        };
        let mut widget = lock(&map);
        if widget.has_image(&self.id) {
            if let Err(e) = widget.remove_image(&self.id) {
                debug!(image = %self.id, error = %e, "image teardown failed");
            }
        }
    }
}

impl<W: MapWidget> Drop for MapImage<W> {
    fn drop(&mut self) {
        self.detach();
    }
}
