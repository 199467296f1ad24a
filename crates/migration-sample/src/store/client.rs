use super::message::StoreRequest;
use crate::model::{Country, CountryError};
use tokio::sync::{mpsc, oneshot};

/// Cloneable handle to a [`StoreActor`](super::StoreActor).
#[derive(Debug, Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    pub async fn create(&self, country: Country, id: Option<u64>) -> Result<Country, CountryError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Create {
                country,
                id,
                respond_to,
            })
            .await
            .map_err(|_| CountryError::StoreClosed)?;
        response.await.map_err(|_| CountryError::StoreDropped)?
    }

    pub async fn get(&self, iso2_code: &str) -> Result<Option<Country>, CountryError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Get {
                iso2_code: iso2_code.to_string(),
                respond_to,
            })
            .await
            .map_err(|_| CountryError::StoreClosed)?;
        response.await.map_err(|_| CountryError::StoreDropped)?
    }

    pub async fn update(&self, country: Country) -> Result<Country, CountryError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Update {
                country,
                respond_to,
            })
            .await
            .map_err(|_| CountryError::StoreClosed)?;
        response.await.map_err(|_| CountryError::StoreDropped)?
    }
}
