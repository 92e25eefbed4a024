// Adapters layer: concrete backlink providers speaking each vendor's wire format.

pub mod ahrefs;
pub mod dataforseo;

pub use ahrefs::AhrefsProvider;
pub use dataforseo::DataForSeoProvider;

/// Percent-encodes a target for use as a single query-string value
/// (`:` becomes `%3A`, `/` becomes `%2F`).
pub fn encode_target(target: &str) -> String {
    url::form_urlencoded::byte_serialize(target.trim().as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_target_escapes_scheme_and_path() {
        assert_eq!(
            encode_target("https://example.com/blog/"),
            "https%3A%2F%2Fexample.com%2Fblog%2F"
        );
        assert_eq!(encode_target("  example.com "), "example.com");
        assert_eq!(
            encode_target("https://a.com/?q=1&r=2"),
            "https%3A%2F%2Fa.com%2F%3Fq%3D1%26r%3D2"
        );
    }
}
