//! Implements the `LedgerReader` and `LedgerWriter` traits against the Firefly III REST API.

use crate::api::{LedgerReader, LedgerWriter};
use crate::error::Secret;
use crate::model::{Account, Amount, Label, Status, Transaction, TransactionType};
use crate::Result;
use anyhow::{bail, Context};
use chrono::{DateTime, Days, Local, NaiveDate};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// The media type Firefly III expects in the `Accept` header.
const JSON_API: &str = "application/vnd.api+json";

/// Talks to a Firefly III instance, e.g. `https://firefly.example/api/v1`.
pub(crate) struct FireflyClient {
    base_url: String,
    token: Secret,
    client: reqwest::Client,
}

impl FireflyClient {
    pub(crate) fn new(base_url: &str, token: Secret, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            bail!("The Firefly III URL is required");
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self {
            base_url: base_url.to_string(),
            token,
            client,
        })
    }

    fn get(&self, path_and_query: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path_and_query}", self.base_url))
            .bearer_auth(self.token.expose())
            .header(reqwest::header::ACCEPT, JSON_API)
    }

    /// Sends a GET and decodes a `200 OK` body as `T`.
    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        debug!("GET {path_and_query}");
        let response = self
            .get(path_and_query)
            .send()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("Request for {path_and_query} failed"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Unable to read the response for {path_and_query}"))?;
        trace!("Firefly responded with {status}: {body}");
        if status != StatusCode::OK {
            bail!("Unexpected status code {} for {path_and_query}: {body}", status.as_u16());
        }
        serde_json::from_str(&body)
            .with_context(|| format!("Unable to decode the response for {path_and_query}"))
    }

    /// Follows `meta.pagination.total_pages` and returns the `data` of every page in order.
    async fn get_all_pages<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<Vec<T>> {
        let separator = if path_and_query.contains('?') { '&' } else { '?' };
        let mut data = Vec::new();
        let mut page = 1u32;
        loop {
            let page_path = format!("{path_and_query}{separator}page={page}");
            let response: Page<T> = self.get_json(&page_path).await?;
            data.extend(response.data);
            if page >= response.meta.pagination.total_pages {
                break;
            }
            page += 1;
        }
        Ok(data)
    }

    async fn get_labels(&self, path: &str) -> Result<Vec<Label>> {
        let resources: Vec<Resource<NameAttributes>> = self.get_all_pages(path).await?;
        Ok(resources
            .into_iter()
            .map(|r| Label::new(r.id, r.attributes.name))
            .collect())
    }
}

#[async_trait::async_trait]
impl LedgerReader for FireflyClient {
    async fn get_accounts(&self) -> Result<Vec<Account>> {
        let resources: Vec<Resource<NameAttributes>> =
            self.get_all_pages("/accounts?type=asset").await?;
        Ok(resources
            .into_iter()
            .map(|r| Account::new(r.id, r.attributes.name, r.attributes.r#type))
            .collect())
    }

    async fn get_recent_transactions(
        &self,
        account_id: &str,
        days_offset: u32,
    ) -> Result<Vec<Transaction>> {
        let (start, end) = window(Local::now().date_naive(), days_offset)?;
        let path = format!(
            "/accounts/{account_id}/transactions?start={}&end={}",
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        );
        let groups: Vec<Resource<GroupAttributes>> = self.get_all_pages(&path).await?;
        let transactions: Vec<Transaction> = groups
            .into_iter()
            .flat_map(|g| g.attributes.transactions)
            .filter_map(LedgerSplit::into_transaction)
            .collect();
        debug!(
            "Fetched {} existing transactions for account {account_id}",
            transactions.len()
        );
        Ok(transactions)
    }

    async fn get_budgets(&self) -> Result<Vec<Label>> {
        self.get_labels("/budgets").await
    }

    async fn get_categories(&self) -> Result<Vec<Label>> {
        self.get_labels("/categories").await
    }
}

#[async_trait::async_trait]
impl LedgerWriter for FireflyClient {
    async fn store_transaction(&self, transaction: &Transaction) -> Result<()> {
        let body = StoreRequest::from(transaction);
        let response = self
            .client
            .post(format!("{}/transactions", self.base_url))
            .bearer_auth(self.token.expose())
            .header(reqwest::header::ACCEPT, JSON_API)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Request to store a transaction failed")?;
        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(());
        }
        let text = response
            .text()
            .await
            .context("Unable to read the response body")?;
        bail!("Unexpected status code {}: {text}", status.as_u16())
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The inclusive `[start, end]` window ending on `today`.
fn window(today: NaiveDate, days_offset: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = today
        .checked_sub_days(Days::new(u64::from(days_offset)))
        .with_context(|| format!("A lookback of {days_offset} days is out of range"))?;
    Ok((start, today))
}

/// Truncates an ISO-8601 timestamp such as `2024-01-15T00:00:00+01:00` to its calendar date in the
/// timestamp's own offset. A bare `YYYY-MM-DD` is accepted as is.
fn truncate_date(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(value, DATE_FORMAT))
        .ok()
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct Resource<A> {
    #[serde(default)]
    id: String,
    attributes: A,
}

#[derive(Debug, Default, Deserialize)]
struct NameAttributes {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    r#type: String,
}

#[derive(Debug, Default, Deserialize)]
struct GroupAttributes {
    #[serde(default)]
    transactions: Vec<LedgerSplit>,
}

/// One split of a Firefly transaction group. Firefly sends amounts as strings.
#[derive(Debug, Default, Deserialize)]
struct LedgerSplit {
    #[serde(default)]
    date: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    amount: String,
    #[serde(default, rename = "type")]
    r#type: String,
    #[serde(default)]
    source_name: String,
    #[serde(default)]
    destination_name: String,
}

impl LedgerSplit {
    /// `None` when the amount or date cannot be read, in which case the split is left out of the
    /// snapshot.
    fn into_transaction(self) -> Option<Transaction> {
        let amount = match Amount::from_str(&self.amount) {
            Ok(amount) => amount,
            Err(e) => {
                warn!(
                    "Skipping existing transaction '{}' with amount {:?}: {e}",
                    self.description, self.amount
                );
                return None;
            }
        };
        let date = match truncate_date(&self.date) {
            Some(date) => date,
            None => {
                warn!(
                    "Skipping existing transaction '{}' with date {:?}",
                    self.description, self.date
                );
                return None;
            }
        };
        Some(
            Transaction::new(
                date.format(DATE_FORMAT).to_string(),
                self.description,
                amount,
                TransactionType::new(&self.r#type),
            )
            .with_counterparties(self.source_name, self.destination_name)
            .with_status(Status::Added),
        )
    }
}

#[derive(Debug, Serialize)]
struct StoreRequest<'a> {
    transactions: Vec<StoreSplit<'a>>,
}

#[derive(Debug, Serialize)]
struct StoreSplit<'a> {
    date: &'a str,
    description: &'a str,
    amount: String,
    #[serde(rename = "type")]
    r#type: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    source_name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    source_id: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    destination_name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    destination_id: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    budget_name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    category_name: &'a str,
}

impl<'a> From<&'a Transaction> for StoreRequest<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            transactions: vec![StoreSplit {
                date: tx.date(),
                description: tx.description(),
                amount: tx.amount().to_string(),
                r#type: tx.r#type().as_str(),
                source_name: tx.source_name(),
                source_id: tx.source_id(),
                destination_name: tx.destination_name(),
                destination_id: tx.destination_id(),
                budget_name: tx.budget_name(),
                category_name: tx.category_name(),
            }],
        }
    }
}
