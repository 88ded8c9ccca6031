//! API-version contract constants, mirroring `core/contracts.py`.

pub const API_VERSION_HEADER: &str = "X-API-Version";
pub const API_VERSION_V1: &str = "v1";
pub const DEFAULT_API_VERSION: &str = API_VERSION_V1;
pub const SUPPORTED_API_VERSIONS: &[&str] = &[API_VERSION_V1];

/// Maximum accepted request body size for public verify endpoints.
pub const MAX_VERIFY_BODY_BYTES: usize = 262_144;

/// Resolve an incoming `X-API-Version` header value against the supported set.
pub fn resolve_api_version(version_header: Option<&str>) -> Result<&'static str, String> {
    let Some(raw) = version_header else {
        return Ok(DEFAULT_API_VERSION);
    };
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return Err("API version header is empty".to_string());
    }
    SUPPORTED_API_VERSIONS
        .iter()
        .find(|v| **v == normalized)
        .copied()
        .ok_or_else(|| format!("Unsupported API version: {normalized}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_absent() {
        assert_eq!(resolve_api_version(None).unwrap(), "v1");
    }

    #[test]
    fn accepts_v1_case_insensitive() {
        assert_eq!(resolve_api_version(Some("V1")).unwrap(), "v1");
    }

    #[test]
    fn rejects_unsupported() {
        assert!(resolve_api_version(Some("v2")).is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(resolve_api_version(Some("   ")).is_err());
    }
}
