use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Environment attributes collected by the kiosk client. Every field is
/// explicit; the fingerprint is only as stable as these values.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceAttributes {
    #[schema(example = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")]
    pub user_agent: String,
    /// "widthxheightxdepth"
    #[schema(example = "1920x1080x24")]
    pub screen: String,
    #[schema(example = "America/Mexico_City")]
    pub timezone: String,
    #[schema(example = "es-MX")]
    pub language: String,
    #[schema(example = "Linux x86_64")]
    pub platform: String,
    #[schema(example = 8)]
    pub hardware_concurrency: u32,
    /// Reported memory hint in GB; not all browsers expose it.
    #[schema(example = json!(8.0), nullable = true)]
    pub device_memory: Option<f64>,
    #[schema(example = 24)]
    pub color_depth: u32,
    #[schema(example = json!(1.0))]
    pub pixel_ratio: f64,
    /// Serialized offscreen-bitmap rendering probe (data URL).
    pub canvas: String,
}

impl DeviceAttributes {
    /// Canonical concatenation of every contributing attribute. Field order
    /// is fixed; changing it would silently re-key every enrolled device.
    pub fn canonical_string(&self) -> String {
        let device_memory = self
            .device_memory
            .map(|m| m.to_string())
            .unwrap_or_default();
        format!(
            "ua:{}|screen:{}|tz:{}|lang:{}|platform:{}|cores:{}|mem:{}|depth:{}|dpr:{}|canvas:{}",
            self.user_agent,
            self.screen,
            self.timezone,
            self.language,
            self.platform,
            self.hardware_concurrency,
            device_memory,
            self.color_depth,
            self.pixel_ratio,
            self.canvas,
        )
    }
}

/// SHA-256 of the canonical attribute string, as lowercase hex. Stable across
/// sessions on an unchanged environment; a heuristic identifier, not a
/// hardware certificate.
pub fn derive(attrs: &DeviceAttributes) -> String {
    let digest = Sha256::digest(attrs.canonical_string().as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Truncated form shown to users so they can relay the id to an admin
/// without reading out 64 hex chars.
pub fn short_id(fingerprint: &str) -> String {
    let head: String = fingerprint.chars().take(12).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeviceAttributes {
        DeviceAttributes {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64)".into(),
            screen: "1920x1080x24".into(),
            timezone: "America/Mexico_City".into(),
            language: "es-MX".into(),
            platform: "Linux x86_64".into(),
            hardware_concurrency: 8,
            device_memory: Some(8.0),
            color_depth: 24,
            pixel_ratio: 1.0,
            canvas: "data:image/png;base64,AAAA".into(),
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let attrs = sample();
        let a = derive(&attrs);
        let b = derive(&attrs.clone());
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn any_attribute_change_changes_the_id() {
        let base = derive(&sample());

        let mut changed = sample();
        changed.language = "en-US".into();
        assert_ne!(derive(&changed), base);

        let mut changed = sample();
        changed.pixel_ratio = 2.0;
        assert_ne!(derive(&changed), base);

        let mut changed = sample();
        changed.canvas = "data:image/png;base64,BBBB".into();
        assert_ne!(derive(&changed), base);
    }

    #[test]
    fn missing_memory_hint_is_distinct_from_zero() {
        let mut without = sample();
        without.device_memory = None;
        let mut zeroed = sample();
        zeroed.device_memory = Some(0.0);
        assert_ne!(derive(&without), derive(&zeroed));
    }

    #[test]
    fn short_id_truncates_for_display() {
        let fp = derive(&sample());
        let short = short_id(&fp);
        assert_eq!(short.len(), 15); // 12 hex chars + "..."
        assert!(fp.starts_with(short.trim_end_matches('.')));
    }
}
