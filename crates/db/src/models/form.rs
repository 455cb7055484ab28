//! Form rows.

use formflow_core::form::{Form, FormStatus};
use formflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `forms` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormRow {
    pub id: DbId,
    pub title: String,
    pub internal_name: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub status: String,
    pub sections: serde_json::Value,
    pub theme: serde_json::Value,
    pub settings: serde_json::Value,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FormRow {
    /// Rebuild the schema document from the stored JSON columns.
    pub fn to_form(&self) -> Result<Form, serde_json::Error> {
        Ok(Form {
            title: self.title.clone(),
            internal_name: self.internal_name.clone(),
            description: self.description.clone(),
            sections: serde_json::from_value(self.sections.clone())?,
            theme: self.theme.clone(),
            settings: serde_json::from_value(self.settings.clone())?,
            status: self.form_status(),
        })
    }

    pub fn form_status(&self) -> FormStatus {
        FormStatus::from_str(&self.status).unwrap_or_default()
    }
}

/// DTO for inserting or replacing a form's content.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveForm {
    pub title: String,
    pub internal_name: Option<String>,
    pub description: Option<String>,
    pub sections: serde_json::Value,
    pub theme: serde_json::Value,
    pub settings: serde_json::Value,
}

impl SaveForm {
    /// Serialize a validated schema for storage.
    pub fn from_form(form: &Form) -> Result<Self, serde_json::Error> {
        Ok(Self {
            title: form.title.clone(),
            internal_name: form.internal_name.clone(),
            description: form.description.clone(),
            sections: serde_json::to_value(&form.sections)?,
            theme: form.theme.clone(),
            settings: serde_json::to_value(&form.settings)?,
        })
    }
}
