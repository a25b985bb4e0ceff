use serde::{Deserialize, Serialize};
use url::Url;

/// Raw attachment record as the server sends it. Field presence varies by
/// endpoint, so everything is optional and normalization fills the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentPayload {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Normalized attachment ready for the gallery: display name, absolute URL,
/// inferred MIME type and a human-readable size label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAttachment {
    pub id: Option<i64>,
    pub name: String,
    pub url: Option<String>,
    pub mime_type: String,
    pub size_label: String,
}

impl TicketAttachment {
    /// Builds a normalized attachment from a raw record, resolving relative
    /// URLs against `api_base`.
    pub fn normalize(raw: &AttachmentPayload, api_base: &str) -> Self {
        let location = raw.url.clone().or_else(|| raw.path.clone());

        let name = raw
            .name
            .clone()
            .or_else(|| raw.file_name.clone())
            .or_else(|| {
                location
                    .as_deref()
                    .and_then(|loc| loc.rsplit('/').next())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "attachment".to_string());

        let url = location.map(|loc| resolve_url(&loc, api_base));

        let mime_type = raw
            .mime_type
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });

        Self {
            id: raw.id,
            name,
            url,
            mime_type,
            size_label: raw.size.map(human_size).unwrap_or_default(),
        }
    }

    /// De-duplication identity, falling back `id -> url -> name`.
    pub fn identity_key(&self) -> String {
        if let Some(id) = self.id {
            return format!("id:{id}");
        }
        if let Some(url) = &self.url {
            return format!("url:{url}");
        }
        format!("name:{}", self.name)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Leaves absolute URLs alone, otherwise joins the location onto the API base.
fn resolve_url(location: &str, api_base: &str) -> String {
    if Url::parse(location).is_ok() {
        return location.to_string();
    }
    let base = api_base.trim_end_matches('/');
    let rel = location.trim_start_matches('/');
    format!("{base}/{rel}")
}

/// One-decimal size label in the largest fitting unit.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
