/// Rewrites stored media references (avatars, post images) into absolute
/// URLs on the external media host.
#[derive(Debug, Clone)]
pub struct MediaUrls {
    base_url: String,
}

impl MediaUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url }
    }

    /// References that are already absolute URLs pass through unchanged.
    pub fn resolve(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return reference.to_string();
        }
        format!("{}{}", self.base_url, reference.trim_start_matches('/'))
    }

    pub fn resolve_opt(&self, reference: Option<&str>) -> Option<String> {
        reference.filter(|r| !r.is_empty()).map(|r| self.resolve(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_references_are_joined_to_the_base() {
        let media = MediaUrls::new("https://media.example.com/trips");
        assert_eq!(
            media.resolve("/avatars/an.png"),
            "https://media.example.com/trips/avatars/an.png"
        );
        assert_eq!(
            media.resolve("sapa.jpg"),
            "https://media.example.com/trips/sapa.jpg"
        );
    }

    #[test]
    fn absolute_urls_and_empty_references() {
        let media = MediaUrls::new("https://media.example.com/");
        assert_eq!(media.resolve("http://cdn.test/x.png"), "http://cdn.test/x.png");
        assert_eq!(media.resolve_opt(Some("")), None);
        assert_eq!(media.resolve_opt(None), None);
    }
}
