//! Build a routed record for a target collection from enriched entries.
//!
//! Both interactive submissions and imported rows end up here, so the two
//! paths classify and score identically.

use serde::Serialize;

use crate::classify::{
    clamp_lead_score, classify, detect_opt_ins, has_interest, score_lead, LeadSignals, OptIns,
};
use crate::records::{
    EnrichedEntry, GenericRecord, LeadRecord, LeadStatus, RecordMeta, RoutedRecord,
    TargetCollection, VolunteerRecord, VolunteerStatus,
};

/// Values that were supplied directly (import columns named `name`,
/// `email`, `leadScore`, ...) and take precedence over the heuristics.
///
/// `Some("")` is a deliberate blank: the column was present but empty, so
/// no heuristic fills that slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordOverrides {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub lead_score: Option<i64>,
    pub status: Option<String>,
    pub whatsapp_opt_in: Option<bool>,
    pub volunteer_opt_in: Option<bool>,
}

/// A record plus the consent flags surfaced alongside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedOutcome {
    pub record: RoutedRecord,
    pub opt_ins: OptIns,
}

/// Classify `entries` and shape them into the family for `target`.
pub fn build_record(
    target: TargetCollection,
    entries: Vec<EnrichedEntry>,
    meta: RecordMeta,
    overrides: RecordOverrides,
) -> RoutedOutcome {
    let mut contact = classify(&entries, target == TargetCollection::Lead);
    if let Some(name) = overrides.name {
        contact.name = name.trim().to_string();
    }
    if let Some(email) = overrides.email {
        contact.email = email.trim().to_string();
    }
    if let Some(phone) = overrides.phone {
        contact.phone = phone.trim().to_string();
    }

    let mut opt_ins = detect_opt_ins(&entries);
    opt_ins.whatsapp |= overrides.whatsapp_opt_in.unwrap_or(false);
    opt_ins.volunteer |= overrides.volunteer_opt_in.unwrap_or(false);

    let record = match target {
        TargetCollection::Lead => {
            let lead_score = match overrides.lead_score {
                Some(explicit) => clamp_lead_score(explicit),
                None => score_lead(LeadSignals {
                    has_email: !contact.email.is_empty(),
                    has_phone: !contact.phone.is_empty(),
                    has_name: !contact.name.is_empty(),
                    has_interest: has_interest(&entries),
                    has_consent: opt_ins.any(),
                }),
            };
            RoutedRecord::Lead(LeadRecord {
                name: contact.name,
                email: contact.email,
                phone: contact.phone,
                hierarchy: contact.hierarchy,
                lead_score,
                status: overrides
                    .status
                    .as_deref()
                    .and_then(LeadStatus::from_str)
                    .unwrap_or_default(),
                whatsapp_opt_in: opt_ins.whatsapp,
                volunteer_opt_in: opt_ins.volunteer,
                responses: entries,
                meta,
            })
        }
        TargetCollection::Volunteer => RoutedRecord::Volunteer(VolunteerRecord {
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            hierarchy: contact.hierarchy,
            status: overrides
                .status
                .as_deref()
                .and_then(VolunteerStatus::from_str)
                .unwrap_or_default(),
            responses: entries,
            meta,
        }),
        TargetCollection::Generic => RoutedRecord::Generic(GenericRecord {
            responses: entries,
            meta,
        }),
    };

    RoutedOutcome { record, opt_ins }
}
