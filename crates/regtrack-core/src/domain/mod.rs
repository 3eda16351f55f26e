//! # Domain Models
//!
//! Typed records that flow through the lead pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CompanyNumber`] | Validated registry number, the unique key of a lead |
//! | [`KnownIdentifierSet`] | Registry numbers already tracked at run start |
//! | [`CompanyRecord`] | Search result, progressively enriched |
//! | [`CompanyProfile`] | Profile lookup carrying the status detail |
//! | [`OfficerList`] | Officers of a company |
//! | [`RunLog`] | Per-run stage timestamps and counters |

mod company;
mod company_number;
mod run_log;

pub use company::{
    CompanyProfile, CompanyRecord, Officer, OfficerList, RegisteredAddress, SearchPage,
};
pub use company_number::{CompanyNumber, KnownIdentifierSet};
pub use run_log::{format_timestamp, RunLog, RunLogKey, RunLogValue};
