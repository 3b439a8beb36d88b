use reverse_geocoder::ReverseGeocoder;
use tracing::info;

use crate::app::ports::CountryLookup;
use crate::error::LookupError;

/// Offline nearest-place lookup backed by the bundled GeoNames dataset.
pub struct ReverseGeocoderLookup {
    geocoder: ReverseGeocoder,
}

impl ReverseGeocoderLookup {
    /// Loads the dataset and builds the search tree; do this once per process.
    pub fn new() -> Self {
        let geocoder = ReverseGeocoder::new();
        info!("Reverse geocoder dataset loaded");
        Self { geocoder }
    }
}

impl Default for ReverseGeocoderLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl CountryLookup for ReverseGeocoderLookup {
    fn country(&self, lat: f64, lon: f64) -> Result<String, LookupError> {
        let result = self.geocoder.search((lat, lon));
        let name = result.record.name.trim();
        if name.is_empty() {
            return Err(LookupError::Service(format!(
                "no place name near ({lat}, {lon})"
            )));
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_in_madrid_has_a_place_name() {
        let lookup = ReverseGeocoderLookup::new();
        let name = lookup.country(40.4, -3.7).unwrap();
        assert!(!name.is_empty());
        assert_eq!(name, name.trim());
    }

    #[test]
    fn test_open_ocean_still_resolves_to_nearest_place() {
        let lookup = ReverseGeocoderLookup::default();
        assert!(lookup.country(0.0, -30.0).is_ok());
    }
}
