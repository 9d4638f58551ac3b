//! Sites file schema.

use restabot_core::Restaurant;
use serde::{Deserialize, Serialize};

/// Root of the sites YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitesFile {
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
}

impl SitesFile {
    pub fn find(&self, id: &str) -> Option<&Restaurant> {
        self.restaurants.iter().find(|r| r.id == id)
    }
}
