//! The three record families a submission or imported row is routed into.
//!
//! All families share the enriched `responses` array and the request
//! metadata; they differ in the derived top-level fields they carry.
//! Records are a one-time snapshot: nothing here re-derives them later.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{DbId, Timestamp};

/// `fieldType` recorded for submitted ids that are not in the schema.
pub const UNKNOWN_FIELD_TYPE: &str = "unknown";

// ---------------------------------------------------------------------------
// Target collection
// ---------------------------------------------------------------------------

/// Storage collection a record is routed into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetCollection {
    #[default]
    Lead,
    #[serde(alias = "swayamsevak")]
    Volunteer,
    Generic,
}

impl TargetCollection {
    /// Return the collection name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Volunteer => "volunteer",
            Self::Generic => "generic",
        }
    }

    /// Parse a collection name. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lead" | "leads" => Some(Self::Lead),
            "volunteer" | "volunteers" | "swayamsevak" => Some(Self::Volunteer),
            "generic" | "response" | "responses" => Some(Self::Generic),
            _ => None,
        }
    }

    /// All valid collection values.
    pub const ALL: &'static [&'static str] = &["lead", "volunteer", "generic"];
}

impl std::fmt::Display for TargetCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Follow-up state of a lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "new" => Some(Self::New),
            "contacted" => Some(Self::Contacted),
            "qualified" => Some(Self::Qualified),
            "converted" => Some(Self::Converted),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] = &["new", "contacted", "qualified", "converted", "lost"];
}

/// Onboarding state of a volunteer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolunteerStatus {
    #[default]
    Pending,
    Active,
    Inactive,
}

impl VolunteerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] = &["pending", "active", "inactive"];
}

// ---------------------------------------------------------------------------
// Shared parts
// ---------------------------------------------------------------------------

/// A submitted value with its schema metadata attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedEntry {
    pub field_id: String,
    pub field_type: String,
    pub field_label: String,
    pub value: Value,
}

/// Organisational unit names, top level first. Empty when not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub region: String,
    pub district: String,
    pub block: String,
    pub unit: String,
}

impl Hierarchy {
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
            && self.district.is_empty()
            && self.block.is_empty()
            && self.unit.is_empty()
    }
}

/// Where a record came from and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub form_id: Option<DbId>,
    /// `form:<slug>` for interactive submissions, the job's source tag for imports.
    pub source: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub submitted_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Families
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub hierarchy: Hierarchy,
    pub lead_score: i32,
    pub status: LeadStatus,
    pub whatsapp_opt_in: bool,
    pub volunteer_opt_in: bool,
    pub responses: Vec<EnrichedEntry>,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub hierarchy: Hierarchy,
    pub status: VolunteerStatus,
    pub responses: Vec<EnrichedEntry>,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericRecord {
    pub responses: Vec<EnrichedEntry>,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

/// A record ready to be persisted in its family's collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection", rename_all = "lowercase")]
pub enum RoutedRecord {
    Lead(LeadRecord),
    Volunteer(VolunteerRecord),
    Generic(GenericRecord),
}

impl RoutedRecord {
    pub fn collection(&self) -> TargetCollection {
        match self {
            Self::Lead(_) => TargetCollection::Lead,
            Self::Volunteer(_) => TargetCollection::Volunteer,
            Self::Generic(_) => TargetCollection::Generic,
        }
    }

    pub fn responses(&self) -> &[EnrichedEntry] {
        match self {
            Self::Lead(r) => &r.responses,
            Self::Volunteer(r) => &r.responses,
            Self::Generic(r) => &r.responses,
        }
    }

    pub fn meta(&self) -> &RecordMeta {
        match self {
            Self::Lead(r) => &r.meta,
            Self::Volunteer(r) => &r.meta,
            Self::Generic(r) => &r.meta,
        }
    }

    /// Contact email, where the family carries one.
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Lead(r) => Some(r.email.as_str()),
            Self::Volunteer(r) => Some(r.email.as_str()),
            Self::Generic(_) => None,
        }
        .filter(|e| !e.is_empty())
    }
}
