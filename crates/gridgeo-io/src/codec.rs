//! Opaque coordinate blob used by stores to persist line paths.

use gridgeo_core::{Coordinate, GeoError, GeoResult};

/// Encode an ordered coordinate sequence.
pub fn encode_coordinates(coordinates: &[Coordinate]) -> GeoResult<String> {
    serde_json::to_string(coordinates).map_err(GeoError::from)
}

/// Decode a blob written by [`encode_coordinates`], preserving order.
///
/// An empty blob is an empty sequence.
pub fn decode_coordinates(blob: &str) -> GeoResult<Vec<Coordinate>> {
    if blob.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(blob)
        .map_err(|err| GeoError::Serialization(format!("invalid coordinate blob: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_preserves_order() {
        let coords = vec![
            Coordinate::new(3.0, 1.0),
            Coordinate::new(1.0, 2.0),
            Coordinate::new(2.0, 3.0),
        ];
        let blob = encode_coordinates(&coords).unwrap();
        assert_eq!(decode_coordinates(&blob).unwrap(), coords);
    }

    #[test]
    fn corrupt_blob_is_a_serialization_error() {
        let err = decode_coordinates("[{\"lat\": 1.0,").unwrap_err();
        assert!(matches!(err, GeoError::Serialization(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn empty_blob_is_empty_path() {
        assert!(decode_coordinates("").unwrap().is_empty());
    }
}
