use time::{Date, Duration};
use tracing::{debug, info, warn};

use crate::domain::{CompanyRecord, RunLog, RunLogKey};
use crate::error::ApiError;
use crate::registry::{format_day, Lookup, RegistryClient, SearchFilters};

/// `today, today - 1, ..., today - (days - 1)`.
pub fn date_window(today: Date, days: u32) -> Vec<Date> {
    (0..i64::from(days))
        .map_while(|offset| today.checked_sub(Duration::days(offset)))
        .collect()
}

/// Runs one incorporation-day search per date and flattens the results.
pub struct LeadCollector<'a> {
    client: &'a RegistryClient,
    page_size: u32,
}

impl<'a> LeadCollector<'a> {
    pub fn new(client: &'a RegistryClient, page_size: u32) -> Self {
        Self { client, page_size }
    }

    /// Records are kept in date order then result order, duplicates included.
    /// A 404 for a day contributes nothing; any fatal error ends collection.
    pub async fn collect(
        &self,
        dates: &[Date],
        filters: &SearchFilters,
        log: &mut RunLog,
    ) -> Result<Vec<CompanyRecord>, ApiError> {
        let mut records = Vec::new();

        for day in dates {
            match self.client.search(filters, *day, self.page_size, None).await? {
                Lookup::Found(page) => {
                    if let Some(hits) = page.hits {
                        if hits > page.items.len() as u64 {
                            warn!(
                                day = %format_day(*day),
                                hits,
                                returned = page.items.len(),
                                "search page truncated; raise the page size"
                            );
                        }
                    }
                    debug!(day = %format_day(*day), count = page.items.len(), "collected day");
                    records.extend(page.items);
                }
                Lookup::NotFound => {
                    debug!(day = %format_day(*day), "no companies incorporated");
                }
            }
        }

        log.record_count(RunLogKey::CompaniesCollected, records.len());
        log.record_timestamp(RunLogKey::DataCollectionDone);
        info!(days = dates.len(), collected = records.len(), "data collection done");
        Ok(records)
    }
}
