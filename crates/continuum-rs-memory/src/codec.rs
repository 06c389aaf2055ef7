//! Conversion between embedding vectors and the store's in-band vector token.
//!
//! Vectors are packed as little-endian 32-bit floats and base64 encoded. The
//! store receives the token as a blob parameter wrapped by `vector32(?)`.

use crate::error::MemoryError;
use crate::store::SqlValue;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Encodes and decodes embedding vectors for a namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VectorCodec {
    /// Established dimensionality, if known.
    dimensions: Option<usize>,
}

impl VectorCodec {
    /// Codec that accepts any non-empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec that rejects vectors of any other length.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: Some(dimensions),
        }
    }

    /// Expected dimensionality, if established.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Encode a vector into an opaque text-safe token.
    pub fn encode(&self, vector: &[f32]) -> Result<String, MemoryError> {
        self.check_len(vector.len())?;
        if let Some(index) = vector.iter().position(|value| !value.is_finite()) {
            return Err(MemoryError::Encoding(format!(
                "non-finite component at index {index}"
            )));
        }
        let mut bytes = Vec::with_capacity(vector.len() * F32_BYTES);
        for value in vector {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        Ok(STANDARD.encode(bytes))
    }

    /// Decode a token produced by [`VectorCodec::encode`].
    pub fn decode(&self, token: &str) -> Result<Vec<f32>, MemoryError> {
        let bytes = STANDARD
            .decode(token)
            .map_err(|err| MemoryError::Encoding(format!("invalid vector token: {err}")))?;
        if bytes.len() % F32_BYTES != 0 {
            return Err(MemoryError::Encoding(format!(
                "vector token length {} is not a multiple of {F32_BYTES}",
                bytes.len()
            )));
        }
        let vector: Vec<f32> = bytes
            .chunks_exact(F32_BYTES)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        self.check_len(vector.len())?;
        Ok(vector)
    }

    /// Encode a vector as a blob statement parameter.
    pub fn to_param(&self, vector: &[f32]) -> Result<SqlValue, MemoryError> {
        Ok(SqlValue::blob(self.encode(vector)?))
    }

    fn check_len(&self, len: usize) -> Result<(), MemoryError> {
        if len == 0 {
            return Err(MemoryError::Encoding("empty vector".to_string()));
        }
        match self.dimensions {
            Some(expected) if expected != len => Err(MemoryError::Encoding(format!(
                "dimension mismatch (expected={expected}, got={len})"
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::VectorCodec;
    use crate::error::MemoryError;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip_preserves_components() {
        let codec = VectorCodec::with_dimensions(5);
        let vector = vec![0.0, -1.5, 3.25e-7, f32::MAX, f32::MIN_POSITIVE];
        let decoded = codec.decode(&codec.encode(&vector).expect("encode")).expect("decode");
        assert_eq!(decoded.len(), vector.len());
        for (left, right) in decoded.iter().zip(&vector) {
            assert!((left - right).abs() <= 1e-6 * right.abs().max(1.0));
        }
    }

    #[test]
    fn encoding_is_little_endian_f32() {
        let token = VectorCodec::new().encode(&[1.0]).expect("encode");
        // 1.0f32 == 0x3f800000, little endian bytes 00 00 80 3f.
        assert_eq!(token, "AACAPw==");
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let codec = VectorCodec::with_dimensions(3);
        let err = codec.encode(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, MemoryError::Encoding(message) if message.contains("expected=3")));
    }

    #[test]
    fn rejects_empty_and_non_finite_vectors() {
        let codec = VectorCodec::new();
        assert!(codec.encode(&[]).is_err());
        assert!(codec.encode(&[1.0, f32::NAN]).is_err());
    }

    #[test]
    fn rejects_truncated_tokens() {
        let codec = VectorCodec::new();
        assert!(codec.decode("AACA").is_err());
        assert!(codec.decode("not base64!").is_err());
    }
}
