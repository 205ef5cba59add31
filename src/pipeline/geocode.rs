use crate::config::GeocodeConfig;
use crate::types::Coordinates;

/// Approximate geocoding against a static table of neighborhood and venue names.
#[derive(Debug, Clone)]
pub struct Geocoder {
    // lower-cased keys, longest first so "brooklyn children's museum" beats "brooklyn"
    table: Vec<(String, Coordinates)>,
}

impl Geocoder {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Coordinates)>,
        S: AsRef<str>,
    {
        let mut table: Vec<(String, Coordinates)> = entries
            .into_iter()
            .map(|(name, coords)| (name.as_ref().trim().to_lowercase(), coords))
            .filter(|(name, _)| !name.is_empty())
            .collect();
        table.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { table }
    }

    pub fn from_config(config: &GeocodeConfig) -> Self {
        Self::new(
            config
                .neighborhoods
                .iter()
                .map(|(name, [lat, lng])| (name, Coordinates { lat: *lat, lng: *lng })),
        )
    }

    /// Unknown locations get no coordinates.
    pub fn lookup(&self, location: &str) -> Option<Coordinates> {
        let location = location.to_lowercase();
        self.table
            .iter()
            .find(|(name, _)| location.contains(name.as_str()))
            .map(|(_, coords)| *coords)
    }
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::from_config(&GeocodeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitive_substrings() {
        let geocoder = Geocoder::default();
        let coords = geocoder.lookup("Sculpture show, PROSPECT PARK, Brooklyn").unwrap();
        assert_eq!(coords, Coordinates { lat: 40.6627, lng: -73.9700 });
    }

    #[test]
    fn longest_name_wins() {
        let geocoder = Geocoder::new([
            ("park", Coordinates { lat: 1.0, lng: 1.0 }),
            ("park slope", Coordinates { lat: 2.0, lng: 2.0 }),
        ]);
        assert_eq!(geocoder.lookup("Park Slope Library").unwrap().lat, 2.0);
        assert_eq!(geocoder.lookup("Some Park").unwrap().lat, 1.0);
    }

    #[test]
    fn unknown_locations_have_no_coordinates() {
        let geocoder = Geocoder::default();
        assert_eq!(geocoder.lookup("Brooklyn, NY"), None);
        assert_eq!(geocoder.lookup(""), None);
    }
}
