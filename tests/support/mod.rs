//! Shared fakes for the behaviour tests: a scripted HTTP transport, a
//! recording notifier and an in-memory lead sink.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use regtrack_core::{
    CompanyNumber, HttpClient, HttpError, HttpRequest, HttpResponse, KnownIdentifierSet, LeadRow,
    LeadSink, NotifyError, Notifier, RateBudget, RegistryClient, SinkError, TableSetup,
};
use serde_json::json;
use tokio::time::Instant;

pub const BASE_URL: &str = "https://registry.test";
pub const API_KEY: &str = "test-key";

type Handler = Box<dyn FnMut(&HttpRequest) -> Result<HttpResponse, HttpError> + Send>;

/// Answers every request through a handler and records what was sent and when.
pub struct ScriptedHttpClient {
    handler: Mutex<Handler>,
    sent: Mutex<Vec<(Instant, HttpRequest)>>,
}

impl ScriptedHttpClient {
    pub fn new(
        handler: impl FnMut(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Mutex::new(Box::new(handler)),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Replays `responses` in order; running out fails the test.
    pub fn sequence(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        let mut queue = VecDeque::from(responses);
        Self::new(move |request| {
            queue
                .pop_front()
                .unwrap_or_else(|| panic!("no scripted response left for {}", request.url))
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.sent
            .lock()
            .expect("lock")
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn request_times(&self) -> Vec<Instant> {
        self.sent.lock().expect("lock").iter().map(|(at, _)| *at).collect()
    }

    /// URL paths relative to [`BASE_URL`], in send order.
    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| request.url.trim_start_matches(BASE_URL).to_owned())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().expect("lock").len()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = {
            let mut handler = self.handler.lock().expect("lock");
            (*handler)(&request)
        };
        self.sent
            .lock()
            .expect("lock")
            .push((Instant::now(), request));
        Box::pin(async move { response })
    }
}

/// Client with a 1ms call spacing, so backoff and cooldown timings are exact.
pub fn registry_client(http: Arc<ScriptedHttpClient>) -> RegistryClient {
    RegistryClient::new(http, BASE_URL, API_KEY)
        .with_rate_budget(RateBudget::new(1_000, Duration::from_secs(1)))
}

pub fn id(value: &str) -> CompanyNumber {
    CompanyNumber::parse(value).expect("valid company number")
}

pub fn status(code: u16) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::new(code, ""))
}

pub fn json_ok(body: serde_json::Value) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::ok_json(body.to_string()))
}

/// Search page with one item per `(number, name)`.
pub fn search_page(companies: &[(&str, &str)]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = companies
        .iter()
        .map(|(number, name)| {
            json!({
                "company_number": number,
                "company_name": name,
                "company_status": "active",
                "company_type": "ltd",
                "date_of_creation": "2024-01-15",
                "registered_office_address": {
                    "address_line_1": "1 High Street",
                    "locality": "London"
                },
                "sic_codes": ["56101"]
            })
        })
        .collect();
    json!({ "hits": items.len(), "items": items })
}

pub fn officers(entries: &[(&str, &str)]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = entries
        .iter()
        .map(|(role, name)| json!({ "officer_role": role, "name": name }))
        .collect();
    json!({ "items": items, "total_results": items.len() })
}

pub fn profile(number: &str, status_detail: Option<&str>) -> serde_json::Value {
    match status_detail {
        Some(detail) => json!({
            "company_number": number,
            "company_status": "active",
            "company_status_detail": detail
        }),
        None => json!({ "company_number": number, "company_status": "active" }),
    }
}

/// Company number of a `/company/{id}` or `/company/{id}/officers` request.
pub fn company_in_path(request: &HttpRequest) -> Option<String> {
    let path = request.url.trim_start_matches(BASE_URL);
    let rest = path.strip_prefix("/company/")?;
    Some(rest.split('/').next().unwrap_or(rest).to_owned())
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify<'a>(
        &'a self,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>> {
        self.messages.lock().expect("lock").push(message.to_owned());
        Box::pin(async { Ok(()) })
    }
}

/// In-memory table store.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub known: Vec<String>,
    pub leads: Vec<LeadRow>,
    pub log_rows: Vec<Vec<String>>,
    pub tables_created: bool,
    pub fail_appends: bool,
}

impl MemorySink {
    pub fn with_known(known: &[&str]) -> Self {
        Self {
            known: known.iter().map(|value| (*value).to_owned()).collect(),
            ..Self::default()
        }
    }
}

impl LeadSink for MemorySink {
    fn ensure_tables(&mut self) -> Result<TableSetup, SinkError> {
        let created = !self.tables_created;
        self.tables_created = true;
        Ok(TableSetup {
            leads_created: created,
            log_created: created,
        })
    }

    fn known_identifiers(&self) -> Result<KnownIdentifierSet, SinkError> {
        let stored = self.leads.iter().map(|row| row.company_number.to_string());
        Ok(KnownIdentifierSet::from_raw(self.known.iter().cloned().chain(stored)))
    }

    fn append_leads(&mut self, rows: &[LeadRow]) -> Result<(), SinkError> {
        if self.fail_appends {
            return Err(SinkError::new("leads table is read-only"));
        }
        self.leads.extend_from_slice(rows);
        Ok(())
    }

    fn update_officer_summaries(
        &mut self,
        run_added_ts: &str,
        summaries: &[(CompanyNumber, String)],
    ) -> Result<(), SinkError> {
        for (company, summary) in summaries {
            for row in self
                .leads
                .iter_mut()
                .filter(|row| row.run_added_ts == run_added_ts && &row.company_number == company)
            {
                row.company_officer_names = summary.clone();
            }
        }
        Ok(())
    }

    fn append_log(&mut self, row: &[String]) -> Result<(), SinkError> {
        self.log_rows.push(row.to_vec());
        Ok(())
    }
}
