//! Knowledge articles filtered by subject

use super::client::DataverseClient;
use crate::error::Result;
use crate::types::{as_guid, odata_string, Record};
use tracing::{debug, info};

/// Subject lookup columns tried before any discovery, as `_<name>_value`
const SUBJECT_LOOKUP_GUESSES: &[&str] = &[
    "e365_subject",
    "e365_knowledgearticlesubject",
    "e365_subjectid",
    "subjectid",
];

/// Text columns tried for a subject given by name
const SUBJECT_TEXT_GUESSES: &[&str] = &["e365_subject", "e365_subjectname", "subject"];

/// Filter expressions to try, in order, for a subject
///
/// A GUID subject is matched against lookup columns; anything else against
/// text columns.
pub fn subject_filters(subject: &str) -> Vec<String> {
    match as_guid(subject) {
        Some(guid) => SUBJECT_LOOKUP_GUESSES
            .iter()
            .map(|attr| lookup_filter(attr, guid))
            .collect(),
        None => SUBJECT_TEXT_GUESSES
            .iter()
            .map(|field| format!("{field} eq {}", odata_string(subject)))
            .collect(),
    }
}

fn lookup_filter(attribute: &str, guid: &str) -> String {
    format!("_{attribute}_value eq {guid}")
}

impl DataverseClient {
    /// Up to `limit` knowledge articles for a subject
    ///
    /// Each filter guess is a full request; the first non-empty result wins.
    /// A GUID subject that none of the guesses match is retried against the
    /// article's lookup attributes, best-ranked first. Nothing matching gives
    /// an empty list.
    pub async fn get_knowledge_articles_by_subject(
        &self,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Ok(Vec::new());
        }

        let set = self.resolver.resolve(&self.settings.article_entity).await?;

        for filter in subject_filters(subject) {
            if let Some(records) = self.try_filter(&set, &filter, limit).await {
                return Ok(records);
            }
        }

        let Some(guid) = as_guid(subject) else {
            return Ok(Vec::new());
        };

        let ranked = self
            .lookups
            .rank_lookup_attributes(&self.settings.article_entity, &self.settings.subject_target)
            .await;
        for attribute in ranked
            .iter()
            .filter(|a| !SUBJECT_LOOKUP_GUESSES.contains(&a.as_str()))
        {
            if let Some(records) = self.try_filter(&set, &lookup_filter(attribute, guid), limit).await
            {
                return Ok(records);
            }
        }

        debug!("No articles found for subject {}", subject);
        Ok(Vec::new())
    }

    async fn try_filter(&self, set: &str, filter: &str, limit: usize) -> Option<Vec<Record>> {
        match self.query_records(set, filter, limit).await {
            Ok(records) if !records.is_empty() => {
                info!("{} matched {} articles with {}", set, records.len(), filter);
                Some(records)
            }
            Ok(_) => {
                debug!("{} returned nothing for {}", set, filter);
                None
            }
            Err(e) => {
                debug!("{} rejected {}: {}", set, filter, e);
                None
            }
        }
    }
}
