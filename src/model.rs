use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FieldError;

/// The two managed collections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Jobs,
    Popups,
}

impl ResourceKind {
    /// Collection path segment on the gateway.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Jobs => "jobs",
            ResourceKind::Popups => "popup",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Jobs => "Job",
            ResourceKind::Popups => "Popup",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Jobs => "jobs",
            ResourceKind::Popups => "popups",
        }
    }
}

/// Server-assigned identity. The gateway emits numbers or strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ResourceId {
    Num(i64),
    Text(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Num(n) => write!(f, "{}", n),
            ResourceId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ResourceId {
    fn from(value: i64) -> Self {
        ResourceId::Num(value)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        match value.parse::<i64>() {
            Ok(n) => ResourceId::Num(n),
            Err(_) => ResourceId::Text(value.to_string()),
        }
    }
}

/// A record type the console can list, edit and search.
///
/// Field names are the gateway's wire names so that search queries, form
/// edits and JSON bodies all speak the same vocabulary.
pub trait Resource:
    Clone + Default + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: ResourceKind;
    /// Every editable field, in form order.
    const FIELDS: &'static [&'static str];
    /// Fields that must be non-empty before submit.
    const REQUIRED: &'static [&'static str];
    /// Fields the search engine matches against.
    const SEARCHABLE: &'static [&'static str];
    /// Field that receives uploaded image URLs.
    const IMAGE_FIELD: &'static str;

    fn id(&self) -> Option<&ResourceId>;

    fn field(&self, name: &str) -> Option<&str>;

    fn set_field(&mut self, name: &str, value: String) -> Result<(), FieldError>;

    /// Required fields that are empty or whitespace.
    fn missing_required(&self) -> Vec<&'static str> {
        Self::REQUIRED
            .iter()
            .copied()
            .filter(|name| self.field(name).map_or(true, |v| v.trim().is_empty()))
            .collect()
    }

    /// Body sent on create/update. Identity travels in the path, not the body.
    fn to_body(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut body = serde_json::to_value(self)?;
        if let Some(obj) = body.as_object_mut() {
            obj.remove("id");
        }
        Ok(body)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobPosting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(rename = "companyname", default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Points separated by `#`.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub apply_link: Option<String>,
    #[serde(default)]
    pub image_link: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
}

impl JobPosting {
    /// Description split into trimmed, non-empty bullet points.
    pub fn description_points(&self) -> Vec<&str> {
        self.description
            .as_deref()
            .map(|d| d.split('#').map(str::trim).filter(|p| !p.is_empty()).collect())
            .unwrap_or_default()
    }

    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        Some(match name {
            "companyname" => &mut self.company_name,
            "title" => &mut self.title,
            "description" => &mut self.description,
            "apply_link" => &mut self.apply_link,
            "image_link" => &mut self.image_link,
            "url" => &mut self.url,
            "salary" => &mut self.salary,
            "location" => &mut self.location,
            "job_type" => &mut self.job_type,
            "experience" => &mut self.experience,
            "batch" => &mut self.batch,
            _ => return None,
        })
    }
}

impl Resource for JobPosting {
    const KIND: ResourceKind = ResourceKind::Jobs;
    const FIELDS: &'static [&'static str] = &[
        "companyname",
        "title",
        "description",
        "apply_link",
        "image_link",
        "url",
        "salary",
        "location",
        "job_type",
        "experience",
        "batch",
    ];
    const REQUIRED: &'static [&'static str] =
        &["companyname", "title", "description", "apply_link", "image_link", "url"];
    const SEARCHABLE: &'static [&'static str] = &["companyname", "title", "description"];
    const IMAGE_FIELD: &'static str = "image_link";

    fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }

    fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "companyname" => &self.company_name,
            "title" => &self.title,
            "description" => &self.description,
            "apply_link" => &self.apply_link,
            "image_link" => &self.image_link,
            "url" => &self.url,
            "salary" => &self.salary,
            "location" => &self.location,
            "job_type" => &self.job_type,
            "experience" => &self.experience,
            "batch" => &self.batch,
            _ => return None,
        };
        Some(value.as_deref().unwrap_or(""))
    }

    fn set_field(&mut self, name: &str, value: String) -> Result<(), FieldError> {
        let slot = self.slot(name).ok_or_else(|| FieldError(name.to_string()))?;
        *slot = Some(value);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PopupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(rename = "popup_heading", default)]
    pub heading: Option<String>,
    #[serde(rename = "popup_text", default)]
    pub body_text: Option<String>,
    #[serde(rename = "popup_link", default)]
    pub image_link: Option<String>,
    #[serde(rename = "popup_routing_link", default)]
    pub routing_link: Option<String>,
    #[serde(rename = "popup_belowtext", default)]
    pub below_text: Option<String>,
}

impl Resource for PopupConfig {
    const KIND: ResourceKind = ResourceKind::Popups;
    const FIELDS: &'static [&'static str] = &[
        "popup_heading",
        "popup_text",
        "popup_link",
        "popup_routing_link",
        "popup_belowtext",
    ];
    const REQUIRED: &'static [&'static str] = Self::FIELDS;
    const SEARCHABLE: &'static [&'static str] = &["popup_heading", "popup_text"];
    const IMAGE_FIELD: &'static str = "popup_link";

    fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }

    fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "popup_heading" => &self.heading,
            "popup_text" => &self.body_text,
            "popup_link" => &self.image_link,
            "popup_routing_link" => &self.routing_link,
            "popup_belowtext" => &self.below_text,
            _ => return None,
        };
        Some(value.as_deref().unwrap_or(""))
    }

    fn set_field(&mut self, name: &str, value: String) -> Result<(), FieldError> {
        let slot = match name {
            "popup_heading" => &mut self.heading,
            "popup_text" => &mut self.body_text,
            "popup_link" => &mut self.image_link,
            "popup_routing_link" => &mut self.routing_link,
            "popup_belowtext" => &mut self.below_text,
            _ => return Err(FieldError(name.to_string())),
        };
        *slot = Some(value);
        Ok(())
    }
}
