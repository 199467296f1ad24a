use super::client::StoreClient;
use super::message::StoreRequest;
use crate::model::{Country, CountryError};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// An in-memory country table.
///
/// The actor owns the table and processes requests one at a time, so neither map needs
/// a lock. Ids come from `next_id` unless a create request carries its own.
pub struct StoreActor {
    name: &'static str,
    receiver: mpsc::Receiver<StoreRequest>,
    countries: HashMap<u64, Country>,
    by_code: HashMap<String, u64>,
    next_id: u64,
}

impl StoreActor {
    /// Creates a table called `name` and the client that talks to it.
    pub fn new(name: &'static str, buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            name,
            receiver,
            countries: HashMap::new(),
            by_code: HashMap::new(),
            next_id: 1,
        };
        (actor, StoreClient::new(sender))
    }

    /// Processes requests until every client is dropped.
    pub async fn run(mut self) {
        let store = self.name;
        info!(store, "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Create {
                    country,
                    id,
                    respond_to,
                } => {
                    debug!(store, ?country, ?id, "Create");
                    let result = self.insert(country, id);
                    match &result {
                        Ok(created) => info!(store, id = ?created.id, size = self.countries.len(), "Created"),
                        Err(e) => warn!(store, error = %e, "Create failed"),
                    }
                    let _ = respond_to.send(result);
                }
                StoreRequest::Get {
                    iso2_code,
                    respond_to,
                } => {
                    let found = self
                        .by_code
                        .get(&iso2_code)
                        .and_then(|id| self.countries.get(id))
                        .cloned();
                    debug!(store, %iso2_code, found = found.is_some(), "Get");
                    let _ = respond_to.send(Ok(found));
                }
                StoreRequest::Update {
                    country,
                    respond_to,
                } => {
                    debug!(store, ?country, "Update");
                    let result = self.replace(country);
                    if let Err(e) = &result {
                        warn!(store, error = %e, "Update failed");
                    }
                    let _ = respond_to.send(result);
                }
            }
        }

        info!(store, size = self.countries.len(), "Shutdown");
    }

    fn insert(&mut self, mut country: Country, id: Option<u64>) -> Result<Country, CountryError> {
        if self.by_code.contains_key(&country.iso2_code) {
            return Err(CountryError::DuplicateCode(country.iso2_code));
        }

        // The sequence stops at u64::MAX; a create after that hits the duplicate check.
        let id = id.unwrap_or(self.next_id);
        if self.countries.contains_key(&id) {
            return Err(CountryError::DuplicateId(id));
        }
        self.next_id = self.next_id.max(id.saturating_add(1));

        country.id = Some(id);
        self.by_code.insert(country.iso2_code.clone(), id);
        self.countries.insert(id, country.clone());
        Ok(country)
    }

    fn replace(&mut self, country: Country) -> Result<Country, CountryError> {
        let id = country
            .id
            .ok_or_else(|| CountryError::MissingId(country.iso2_code.clone()))?;
        let previous = self
            .countries
            .get(&id)
            .ok_or_else(|| CountryError::NotFound(id.to_string()))?;

        if previous.iso2_code != country.iso2_code {
            if self.by_code.contains_key(&country.iso2_code) {
                return Err(CountryError::DuplicateCode(country.iso2_code));
            }
            self.by_code.remove(&previous.iso2_code);
            self.by_code.insert(country.iso2_code.clone(), id);
        }

        self.countries.insert(id, country.clone());
        Ok(country)
    }
}
