//! Duplicate resolver over external identifiers.
//!
//! Checks run per field in a fixed order: VNDB release id, DLsite code,
//! VNDB work id, then title. Release ids and DLsite codes identify one
//! edition and are non-repeatable; a match on either is hard. Work ids are
//! shared across editions of the same work, so every holder is reported and
//! the match stays soft, as does a title or alias match.

use std::collections::HashSet;

use tracing::debug;

use galdex_core::defaults::WORK_ID_MATCH_LIMIT;
use galdex_core::{
    DuplicateQuery, DuplicateReport, EntryLookup, EntryRef, MatchCandidate, MatchedField, Result,
};

/// Stateless resolver over an entry lookup backend.
pub struct DuplicateResolver<'a> {
    lookup: &'a dyn EntryLookup,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl<'a> DuplicateResolver<'a> {
    pub fn new(lookup: &'a dyn EntryLookup) -> Self {
        Self { lookup }
    }

    /// Run every applicable check and collect a report.
    ///
    /// A query with no usable fields yields an empty report. Matches are
    /// de-duplicated by slug in first-seen order; `matched_fields` records
    /// each field that produced at least one match, in check order.
    pub async fn resolve(&self, query: &DuplicateQuery) -> Result<DuplicateReport> {
        let mut report = DuplicateReport::default();
        let mut seen = HashSet::new();

        if let Some(release_id) = non_blank(&query.vndb_release_id) {
            // Stored ids are lowercase r-numbers; fold input to match.
            let release_id = release_id.to_ascii_lowercase();
            if let Some(entry) = self.lookup.find_by_release_id(&release_id).await? {
                self.record(&mut report, &mut seen, MatchedField::VndbReleaseId, vec![entry]);
            }
        }

        if let Some(code) = non_blank(&query.dlsite_code) {
            let code = code.to_ascii_uppercase();
            if let Some(entry) = self.lookup.find_by_dlsite_code(&code).await? {
                self.record(&mut report, &mut seen, MatchedField::DlsiteCode, vec![entry]);
            }
        }

        if let Some(work_id) = non_blank(&query.vndb_work_id) {
            let work_id = work_id.to_ascii_lowercase();
            let entries = self
                .lookup
                .find_all_by_work_id(&work_id, WORK_ID_MATCH_LIMIT)
                .await?;
            if !entries.is_empty() {
                self.record(&mut report, &mut seen, MatchedField::VndbWorkId, entries);
            }
        }

        if let Some(title) = non_blank(&query.title) {
            if let Some(entry) = self.lookup.find_by_title_or_alias(title).await? {
                self.record(&mut report, &mut seen, MatchedField::Title, vec![entry]);
            }
        }

        debug!(
            subsystem = "pipeline",
            component = "resolver",
            match_count = report.matches.len(),
            "duplicate check complete"
        );
        Ok(report)
    }

    fn record(
        &self,
        report: &mut DuplicateReport,
        seen: &mut HashSet<String>,
        field: MatchedField,
        entries: Vec<EntryRef>,
    ) {
        report.matched_fields.push(field);
        for entry in entries {
            if report.first_slug.is_none() {
                report.first_slug = Some(entry.slug.clone());
            }
            if seen.insert(entry.slug.clone()) {
                report.matches.push(MatchCandidate {
                    slug: entry.slug,
                    title: entry.title,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use galdex_core::MatchStrength;

    /// In-memory lookup over a fixed entry set.
    struct FixedEntries {
        entries: Vec<FixedEntry>,
    }

    struct FixedEntry {
        id: i64,
        slug: &'static str,
        title: &'static str,
        vndb_work_id: Option<&'static str>,
        vndb_release_id: Option<&'static str>,
        dlsite_code: Option<&'static str>,
        aliases: Vec<&'static str>,
    }

    impl FixedEntry {
        fn to_ref(&self) -> EntryRef {
            EntryRef {
                id: self.id,
                slug: self.slug.to_string(),
                title: self.title.to_string(),
            }
        }
    }

    #[async_trait]
    impl EntryLookup for FixedEntries {
        async fn find_by_release_id(&self, release_id: &str) -> Result<Option<EntryRef>> {
            Ok(self
                .entries
                .iter()
                .find(|e| e.vndb_release_id == Some(release_id))
                .map(FixedEntry::to_ref))
        }

        async fn find_by_dlsite_code(&self, code: &str) -> Result<Option<EntryRef>> {
            Ok(self
                .entries
                .iter()
                .find(|e| e.dlsite_code == Some(code))
                .map(FixedEntry::to_ref))
        }

        async fn find_all_by_work_id(&self, work_id: &str, limit: i64) -> Result<Vec<EntryRef>> {
            Ok(self
                .entries
                .iter()
                .filter(|e| e.vndb_work_id == Some(work_id))
                .take(limit as usize)
                .map(FixedEntry::to_ref)
                .collect())
        }

        async fn find_by_title_or_alias(&self, title: &str) -> Result<Option<EntryRef>> {
            let needle = title.to_lowercase();
            Ok(self
                .entries
                .iter()
                .find(|e| {
                    e.title.to_lowercase() == needle
                        || e.aliases.iter().any(|a| a.to_lowercase() == needle)
                })
                .map(FixedEntry::to_ref))
        }
    }

    fn catalog() -> FixedEntries {
        FixedEntries {
            entries: vec![
                FixedEntry {
                    id: 1,
                    slug: "aaaa1111",
                    title: "Moonlit Garden",
                    vndb_work_id: Some("v100"),
                    vndb_release_id: Some("r200"),
                    dlsite_code: Some("RJ111111"),
                    aliases: vec!["Tsukiniwa"],
                },
                FixedEntry {
                    id: 2,
                    slug: "bbbb2222",
                    title: "Moonlit Garden HD",
                    vndb_work_id: Some("v100"),
                    vndb_release_id: Some("r201"),
                    dlsite_code: None,
                    aliases: vec![],
                },
                FixedEntry {
                    id: 3,
                    slug: "cccc3333",
                    title: "Starfall",
                    vndb_work_id: Some("v300"),
                    vndb_release_id: None,
                    dlsite_code: Some("RJ333333"),
                    aliases: vec![],
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_empty_query_yields_empty_report() {
        let catalog = catalog();
        let resolver = DuplicateResolver::new(&catalog);
        let report = resolver.resolve(&DuplicateQuery::default()).await.unwrap();
        assert!(report.is_empty());
        assert!(report.first_slug.is_none());
        assert!(report.matched_fields.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_identifiers_yield_empty_report() {
        let catalog = catalog();
        let resolver = DuplicateResolver::new(&catalog);
        let report = resolver
            .resolve(&DuplicateQuery {
                vndb_work_id: Some("v999".to_string()),
                vndb_release_id: Some("r999".to_string()),
                dlsite_code: Some("RJ999999".to_string()),
                title: Some("No Such Game".to_string()),
            })
            .await
            .unwrap();
        assert!(report.is_empty());
        assert!(!report.has_hard_match());
    }

    #[tokio::test]
    async fn test_dlsite_code_match_is_hard() {
        let catalog = catalog();
        let resolver = DuplicateResolver::new(&catalog);
        let report = resolver
            .resolve(&DuplicateQuery {
                dlsite_code: Some("rj333333".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(report.matched_fields, vec![MatchedField::DlsiteCode]);
        assert!(report.has_hard_match());
        assert_eq!(report.first_slug.as_deref(), Some("cccc3333"));
    }

    #[tokio::test]
    async fn test_work_id_reports_all_editions_and_stays_soft() {
        let catalog = catalog();
        let resolver = DuplicateResolver::new(&catalog);
        let report = resolver
            .resolve(&DuplicateQuery {
                vndb_work_id: Some("v100".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(report.matched_fields, vec![MatchedField::VndbWorkId]);
        assert_eq!(MatchedField::VndbWorkId.strength(), MatchStrength::Soft);
        assert!(!report.has_hard_match());
        let slugs: Vec<_> = report.matches.iter().map(|m| m.slug.as_str()).collect();
        assert_eq!(slugs, vec!["aaaa1111", "bbbb2222"]);
    }

    #[tokio::test]
    async fn test_title_matches_through_aliases_case_insensitively() {
        let catalog = catalog();
        let resolver = DuplicateResolver::new(&catalog);
        let report = resolver
            .resolve(&DuplicateQuery {
                title: Some("TSUKINIWA".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(report.matched_fields, vec![MatchedField::Title]);
        assert_eq!(report.first_slug.as_deref(), Some("aaaa1111"));
    }

    #[tokio::test]
    async fn test_one_entry_matching_several_fields_is_reported_once() {
        let catalog = catalog();
        let resolver = DuplicateResolver::new(&catalog);
        let query = DuplicateQuery {
            vndb_work_id: Some("v100".to_string()),
            vndb_release_id: Some("r200".to_string()),
            dlsite_code: Some("RJ111111".to_string()),
            title: Some("moonlit garden".to_string()),
        };
        let report = resolver.resolve(&query).await.unwrap();
        assert_eq!(
            report.matched_fields,
            vec![
                MatchedField::VndbReleaseId,
                MatchedField::DlsiteCode,
                MatchedField::VndbWorkId,
                MatchedField::Title,
            ]
        );
        // aaaa1111 matched four ways but appears once; bbbb2222 via work id.
        let slugs: Vec<_> = report.matches.iter().map(|m| m.slug.as_str()).collect();
        assert_eq!(slugs, vec!["aaaa1111", "bbbb2222"]);
        assert_eq!(report.first_slug.as_deref(), Some("aaaa1111"));
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_over_unchanged_state() {
        let catalog = catalog();
        let resolver = DuplicateResolver::new(&catalog);
        let query = DuplicateQuery {
            vndb_work_id: Some("v100".to_string()),
            title: Some("Starfall".to_string()),
            ..Default::default()
        };
        let first = resolver.resolve(&query).await.unwrap();
        let second = resolver.resolve(&query).await.unwrap();
        assert_eq!(first.matches, second.matches);
        assert_eq!(first.matched_fields, second.matched_fields);
        assert_eq!(first.first_slug, second.first_slug);
    }

    #[tokio::test]
    async fn test_vndb_ids_match_regardless_of_input_case() {
        let catalog = catalog();
        let resolver = DuplicateResolver::new(&catalog);
        let report = resolver
            .resolve(&DuplicateQuery {
                vndb_work_id: Some("V100".to_string()),
                vndb_release_id: Some("R200".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            report.matched_fields,
            vec![MatchedField::VndbReleaseId, MatchedField::VndbWorkId]
        );
        assert_eq!(report.first_slug.as_deref(), Some("aaaa1111"));
    }

    #[tokio::test]
    async fn test_blank_fields_are_skipped() {
        let catalog = catalog();
        let resolver = DuplicateResolver::new(&catalog);
        let report = resolver
            .resolve(&DuplicateQuery {
                vndb_work_id: Some("  ".to_string()),
                title: Some(String::new()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(report.is_empty());
    }
}
