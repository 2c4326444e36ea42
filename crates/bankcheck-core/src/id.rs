// Row id generation.

/// Generate a unique row id (21 characters).
pub fn generate_id() -> String {
    nanoid::nanoid!()
}

/// Generate an id with a custom length.
pub fn generate_id_with_length(len: usize) -> String {
    nanoid::nanoid!(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_length() {
        assert_eq!(generate_id().len(), 21);
        assert_eq!(generate_id_with_length(12).len(), 12);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(generate_id(), generate_id());
    }
}
