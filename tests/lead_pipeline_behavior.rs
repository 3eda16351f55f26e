//! Behaviour tests for the lead pipeline
//!
//! These tests verify collection over a date window, validation against the
//! known-company set, officer enrichment with per-company failure isolation,
//! and the run orchestrator's export and notification contract.

mod support;

use std::collections::BTreeSet;
use std::sync::Arc;

use regtrack_core::{
    CompanyRecord, EnrichmentStage, FailureCategory, HttpError, HttpResponse, KnownIdentifierSet,
    LeadCollector, LeadRun, LeadSink, LeadValidator, OfficerQuery, PipelineError, RunLog,
    RunLogKey, SearchFilters, TrackerConfig, LOG_COLUMNS,
};
use support::{
    company_in_path, id, json_ok, officers, profile, registry_client, search_page, status,
    MemorySink, RecordingNotifier, ScriptedHttpClient,
};
use time::macros::date;

fn record(number: &str) -> CompanyRecord {
    CompanyRecord::new(id(number), format!("COMPANY {number} LTD"))
}

fn records(numbers: &[&str]) -> Vec<CompanyRecord> {
    numbers.iter().map(|number| record(number)).collect()
}

fn ids(records: &[CompanyRecord]) -> Vec<String> {
    records.iter().map(|record| record.id().to_string()).collect()
}

fn strike_off() -> BTreeSet<String> {
    BTreeSet::from([String::from("active-proposal-to-strike-off")])
}

// =============================================================================
// Collection
// =============================================================================

#[tokio::test(start_paused = true)]
async fn a_day_without_incorporations_is_skipped() {
    // Given: The first day answers 404 and the second returns two companies
    let http = ScriptedHttpClient::new(|request| match request.query_value("incorporated_from") {
        Some("2024-01-15") => Ok(HttpResponse::new(404, "")),
        Some("2024-01-14") => Ok(HttpResponse::ok_json(
            search_page(&[("001", "A LTD"), ("002", "B LTD")]).to_string(),
        )),
        other => panic!("unexpected day {other:?}"),
    });
    let client = registry_client(http.clone());
    let mut log = RunLog::start();

    // When: The collector runs over both days
    let collected = LeadCollector::new(&client, 5000)
        .collect(
            &[date!(2024 - 01 - 15), date!(2024 - 01 - 14)],
            &SearchFilters::restaurants(),
            &mut log,
        )
        .await
        .expect("collect");

    // Then: Only the second day's records are returned and logged
    assert_eq!(ids(&collected), ["001", "002"]);
    assert_eq!(http.count(), 2);
    assert_eq!(log.count(RunLogKey::CompaniesCollected), Some(2));
    assert!(log.get(RunLogKey::DataCollectionDone).is_some());
}

#[tokio::test(start_paused = true)]
async fn collection_keeps_cross_day_duplicates_for_validation_to_resolve() {
    let http = ScriptedHttpClient::new(|_| {
        Ok(HttpResponse::ok_json(search_page(&[("001", "A LTD")]).to_string()))
    });
    let client = registry_client(http);
    let mut log = RunLog::start();

    let collected = LeadCollector::new(&client, 5000)
        .collect(
            &[date!(2024 - 01 - 15), date!(2024 - 01 - 14)],
            &SearchFilters::restaurants(),
            &mut log,
        )
        .await
        .expect("collect");

    assert_eq!(ids(&collected), ["001", "001"]);
}

#[tokio::test(start_paused = true)]
async fn a_search_item_without_a_name_does_not_lose_the_page() {
    // Given: One item lacks its name and another lacks its number
    let http = ScriptedHttpClient::new(|_| {
        Ok(HttpResponse::ok_json(
            r#"{"items":[
                {"company_number":"001","company_name":"A LTD"},
                {"company_number":"002"},
                {"company_name":"NO NUMBER LTD"}
            ]}"#,
        ))
    });
    let client = registry_client(http);
    let mut log = RunLog::start();

    // When: The collector searches one day
    let collected = LeadCollector::new(&client, 5000)
        .collect(&[date!(2024 - 01 - 15)], &SearchFilters::restaurants(), &mut log)
        .await
        .expect("collect");

    // Then: Both numbered items survive and only the numberless one is dropped
    assert_eq!(ids(&collected), ["001", "002"]);
    assert_eq!(collected[1].company_name, "");
    assert_eq!(log.count(RunLogKey::CompaniesCollected), Some(2));
}

#[tokio::test(start_paused = true)]
async fn a_fatal_search_status_stops_collection() {
    let http = ScriptedHttpClient::sequence(vec![status(401)]);
    let client = registry_client(http.clone());
    let mut log = RunLog::start();

    let error = LeadCollector::new(&client, 5000)
        .collect(
            &[date!(2024 - 01 - 15), date!(2024 - 01 - 14)],
            &SearchFilters::restaurants(),
            &mut log,
        )
        .await
        .expect_err("unauthorized");

    assert_eq!(error.category(), FailureCategory::Unauthorized);
    assert_eq!(http.count(), 1);
    assert_eq!(log.count(RunLogKey::CompaniesCollected), None);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn known_companies_are_dropped_and_new_ones_kept() {
    // Given: "001" is already tracked
    let http = ScriptedHttpClient::sequence(Vec::new());
    let client = registry_client(http.clone());
    let excluded = strike_off();
    let known = KnownIdentifierSet::from_raw(["001"]);
    let mut log = RunLog::start();

    // When: Both are validated without the detailed status check
    let valid = LeadValidator::new(&client, &excluded)
        .validate(records(&["001", "002"]), &known, false, &mut log)
        .await
        .expect("validate");

    // Then: Only "002" remains and no profile was fetched
    assert_eq!(ids(&valid), ["002"]);
    assert_eq!(http.count(), 0);
    assert_eq!(log.count(RunLogKey::ValidatedCompanies), Some(1));
    assert!(log.get(RunLogKey::ValidationDone).is_some());
}

#[tokio::test(start_paused = true)]
async fn with_nothing_known_and_no_status_check_every_record_passes_without_calls() {
    let http = ScriptedHttpClient::sequence(Vec::new());
    let client = registry_client(http.clone());
    let excluded = strike_off();
    let mut log = RunLog::start();

    let valid = LeadValidator::new(&client, &excluded)
        .validate(
            records(&["001", "002", "003"]),
            &KnownIdentifierSet::new(),
            false,
            &mut log,
        )
        .await
        .expect("validate");

    assert_eq!(ids(&valid), ["001", "002", "003"]);
    assert_eq!(http.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn validation_output_is_unique_and_disjoint_from_known_ids() {
    let http = ScriptedHttpClient::sequence(Vec::new());
    let client = registry_client(http);
    let excluded = strike_off();
    let known = KnownIdentifierSet::from_raw(["002", "005"]);
    let mut log = RunLog::start();

    let valid = LeadValidator::new(&client, &excluded)
        .validate(
            records(&["001", "002", "003", "001", "004", "005", "003"]),
            &known,
            false,
            &mut log,
        )
        .await
        .expect("validate");

    assert_eq!(ids(&valid), ["001", "003", "004"]);
    assert!(valid.iter().all(|record| !known.contains(record.id())));
}

#[tokio::test(start_paused = true)]
async fn validating_twice_gives_the_same_result() {
    // Given: A detailed-status check where "003" is being struck off
    let http = ScriptedHttpClient::new(|request| {
        let number = company_in_path(request).expect("profile path");
        let detail = (number == "003").then_some("active-proposal-to-strike-off");
        Ok(HttpResponse::ok_json(profile(&number, detail).to_string()))
    });
    let client = registry_client(http);
    let excluded = strike_off();
    let known = KnownIdentifierSet::from_raw(["001"]);
    let validator = LeadValidator::new(&client, &excluded);

    // When: The output is validated again with the same known set
    let mut log = RunLog::start();
    let once = validator
        .validate(records(&["001", "002", "003", "004"]), &known, true, &mut log)
        .await
        .expect("first pass");
    let twice = validator
        .validate(once.clone(), &known, true, &mut log)
        .await
        .expect("second pass");

    // Then: Nothing changes
    assert_eq!(once, twice);
    assert_eq!(ids(&once), ["002", "004"]);
}

#[tokio::test(start_paused = true)]
async fn detailed_status_check_excludes_strike_off_and_keeps_absent_details() {
    // Given: "003" is being struck off, "004" has no detail, "005" has no profile
    let http = ScriptedHttpClient::new(|request| {
        match company_in_path(request).expect("profile path").as_str() {
            "003" => Ok(HttpResponse::ok_json(
                profile("003", Some("active-proposal-to-strike-off")).to_string(),
            )),
            "004" => Ok(HttpResponse::ok_json(profile("004", None).to_string())),
            "005" => Ok(HttpResponse::new(404, "")),
            other => panic!("unexpected profile lookup {other}"),
        }
    });
    let client = registry_client(http.clone());
    let excluded = strike_off();
    let known = KnownIdentifierSet::from_raw(["001"]);
    let mut log = RunLog::start();

    // When: Validation runs with the detailed check on
    let valid = LeadValidator::new(&client, &excluded)
        .validate(records(&["001", "003", "004", "005"]), &known, true, &mut log)
        .await
        .expect("validate");

    // Then: Only the strike-off company is dropped; the known one is never looked up
    assert_eq!(ids(&valid), ["004", "005"]);
    assert_eq!(http.paths(), ["/company/003", "/company/004", "/company/005"]);
}

#[tokio::test(start_paused = true)]
async fn when_every_record_is_known_validation_fails_with_no_valid_leads() {
    let http = ScriptedHttpClient::sequence(Vec::new());
    let client = registry_client(http);
    let excluded = strike_off();
    let known = KnownIdentifierSet::from_raw(["001", "002"]);
    let mut log = RunLog::start();

    let error = LeadValidator::new(&client, &excluded)
        .validate(records(&["001", "002"]), &known, false, &mut log)
        .await
        .expect_err("nothing new");

    assert!(matches!(error, PipelineError::NoValidLeads { collected: 2 }));
    assert_eq!(error.category(), FailureCategory::NoValidLeads);
}

// =============================================================================
// Enrichment
// =============================================================================

#[tokio::test(start_paused = true)]
async fn officers_are_summarised_as_role_and_name() {
    let http = ScriptedHttpClient::sequence(vec![json_ok(officers(&[("director", "Jane Doe")]))]);
    let client = registry_client(http);
    let notifier = RecordingNotifier::default();
    let query = OfficerQuery::default();
    let mut log = RunLog::start();

    let outcome = EnrichmentStage::new(&client, &query, &notifier)
        .enrich(records(&["001"]), &mut log)
        .await
        .expect("enrich");

    assert_eq!(
        outcome.records[0].officer_summary.as_deref(),
        Some("director: Jane Doe")
    );
    assert!(outcome.problem_ids.is_empty());
    assert!(notifier.messages().is_empty());
    assert!(log.get(RunLogKey::FollowUpDone).is_some());
}

#[tokio::test(start_paused = true)]
async fn one_failing_company_does_not_affect_the_others() {
    // Given: "002" returns a malformed body, "004" has no officer record
    // and "005" keeps dropping the connection
    let http = ScriptedHttpClient::new(|request| {
        match company_in_path(request).expect("officers path").as_str() {
            "002" => Ok(HttpResponse::ok_json(r#"{"errors": [{"error": "x"}]}"#)),
            "004" => Ok(HttpResponse::new(404, "")),
            "005" => Err(HttpError::new("connection failed: reset")),
            _ => Ok(HttpResponse::ok_json(
                officers(&[("director", "Jane Doe")]).to_string(),
            )),
        }
    });
    let client = registry_client(http);
    let notifier = RecordingNotifier::default();
    let query = OfficerQuery::default();
    let mut log = RunLog::start();

    // When: Five companies are enriched
    let outcome = EnrichmentStage::new(&client, &query, &notifier)
        .enrich(records(&["001", "002", "003", "004", "005"]), &mut log)
        .await
        .expect("enrich");

    // Then: Healthy companies are enriched and the failures reported once
    let summaries: Vec<&str> = outcome
        .records
        .iter()
        .map(|record| record.officer_summary.as_deref().unwrap_or("<none>"))
        .collect();
    assert_eq!(
        summaries,
        ["director: Jane Doe", "", "director: Jane Doe", "", ""]
    );
    assert_eq!(outcome.problem_ids, vec![id("002"), id("004"), id("005")]);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].ends_with("002,004,005"));
}

#[tokio::test(start_paused = true)]
async fn run_level_officer_failures_propagate() {
    let http = ScriptedHttpClient::sequence(vec![
        json_ok(officers(&[("director", "Jane Doe")])),
        status(503),
    ]);
    let client = registry_client(http);
    let notifier = RecordingNotifier::default();
    let query = OfficerQuery::default();
    let mut log = RunLog::start();

    let error = EnrichmentStage::new(&client, &query, &notifier)
        .enrich(records(&["001", "002", "003"]), &mut log)
        .await
        .expect_err("upstream down");

    assert_eq!(error.category(), FailureCategory::UpstreamUnavailable);
    assert!(notifier.messages().is_empty());
}

// =============================================================================
// Orchestration
// =============================================================================

fn two_day_config() -> TrackerConfig {
    let mut config = TrackerConfig::default();
    config.registry.api_key = String::from(support::API_KEY);
    config.search.max_age_days = 2;
    config
}

fn healthy_registry() -> Arc<ScriptedHttpClient> {
    ScriptedHttpClient::new(|request| {
        if request.url.ends_with("/advanced-search/companies") {
            let page = search_page(&[("001", "OLD LTD"), ("002", "NEW LTD")]);
            return Ok(HttpResponse::ok_json(page.to_string()));
        }
        Ok(HttpResponse::ok_json(
            officers(&[("director", "Jane Doe")]).to_string(),
        ))
    })
}

#[tokio::test(start_paused = true)]
async fn a_completed_run_exports_leads_then_officers_then_the_log() {
    // Given: "001" is already tracked and both days return "001" and "002"
    let http = healthy_registry();
    let notifier = Arc::new(RecordingNotifier::default());
    let run = LeadRun::new(registry_client(http.clone()), two_day_config(), notifier.clone());
    let mut sink = MemorySink::with_known(&["001"]);

    // When: The run executes
    let report = run.run_and_notify(&mut sink).await.expect("run");

    // Then: "002" is stored once, stamped with the run start and enriched
    assert_eq!(ids(&report.leads), ["002"]);
    assert!(sink.tables_created);
    assert_eq!(sink.leads.len(), 1);
    let lead = &sink.leads[0];
    assert_eq!(lead.company_number, id("002"));
    assert_eq!(lead.company_officer_names, "director: Jane Doe");
    assert_eq!(lead.address_string, "1 High Street, London");
    assert_eq!(
        lead.run_added_ts,
        regtrack_core::format_timestamp(report.log.started_at())
    );

    // And: One log row with every column and non-decreasing stage order
    assert_eq!(sink.log_rows.len(), 1);
    let row = &sink.log_rows[0];
    assert_eq!(row.len(), LOG_COLUMNS.len());
    assert_eq!(row[0], lead.run_added_ts);
    assert_eq!(row[1], "4");
    assert_eq!(row[3], "1");
    assert!(row.iter().all(|cell| !cell.is_empty()));

    // And: Exactly one summary notification
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Lead run finished with 1 new lead(s)."));
    assert!(messages[0].contains("run_finished_ts: "));

    // And: Two searches and one officer lookup went out
    assert_eq!(
        http.paths(),
        [
            "/advanced-search/companies",
            "/advanced-search/companies",
            "/company/002/officers"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn a_second_run_finds_nothing_new() {
    let http = healthy_registry();
    let notifier = Arc::new(RecordingNotifier::default());
    let run = LeadRun::new(registry_client(http), two_day_config(), notifier.clone());
    let mut sink = MemorySink::default();

    run.execute(&mut sink).await.expect("first run");
    let error = run.run_and_notify(&mut sink).await.expect_err("second run");

    assert!(matches!(error, PipelineError::NoValidLeads { collected: 4 }));
    assert_eq!(sink.leads.len(), 2);
    assert_eq!(sink.log_rows.len(), 1);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("no-valid-leads: "));
}

#[tokio::test(start_paused = true)]
async fn a_fatal_status_sends_exactly_one_notification_naming_the_category() {
    // Given: The API key is rejected
    let http = ScriptedHttpClient::new(|_| Ok(HttpResponse::new(401, "")));
    let notifier = Arc::new(RecordingNotifier::default());
    let run = LeadRun::new(registry_client(http.clone()), two_day_config(), notifier.clone());
    let mut sink = MemorySink::default();

    // When: The run executes
    let error = run.run_and_notify(&mut sink).await.expect_err("unauthorized");

    // Then: The run stops at the first search and the operator hears once
    assert_eq!(error.category(), FailureCategory::Unauthorized);
    assert_eq!(http.count(), 1);
    assert!(sink.leads.is_empty());
    assert!(sink.log_rows.is_empty());
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("unauthorized: "));
}

#[tokio::test(start_paused = true)]
async fn a_failing_sink_aborts_the_run_before_enrichment() {
    let http = healthy_registry();
    let notifier = Arc::new(RecordingNotifier::default());
    let run = LeadRun::new(registry_client(http.clone()), two_day_config(), notifier.clone());
    let mut sink = MemorySink {
        fail_appends: true,
        ..MemorySink::default()
    };

    let error = run.run_and_notify(&mut sink).await.expect_err("sink failure");

    assert_eq!(error.category(), FailureCategory::Sink);
    assert!(http.paths().iter().all(|path| !path.ends_with("/officers")));
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("sink: "));
}

#[test]
fn sink_tables_are_only_created_once() {
    let mut sink = MemorySink::default();
    assert!(sink.ensure_tables().expect("first").leads_created);
    assert!(!sink.ensure_tables().expect("second").leads_created);
}
