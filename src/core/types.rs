//! Annotrack Core Type Definitions
//!
//! Defines fundamental types used throughout the engine.

// =============================================================================
// ID Types
// =============================================================================

/// Tracked-object unique identifier (ULID)
pub type ObjectId = String;

/// Generates a new unique tracked-object ID
pub fn generate_object_id() -> ObjectId {
    ulid::Ulid::new().to_string()
}

// =============================================================================
// Frame Addressing
// =============================================================================

/// Frame index within a sequence (0-based)
///
/// Unsigned on purpose: negative frame numbers are a programming error
/// in every operation of this engine, so they are unrepresentable
/// rather than checked at runtime.
pub type FrameNumber = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_object_id_unique() {
        let a = generate_object_id();
        let b = generate_object_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 26); // ULID canonical form
    }
}
