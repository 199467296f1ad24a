use crate::model::{Country, CountryError};
use tokio::sync::oneshot;

/// One-shot channel a [`StoreActor`](super::StoreActor) answers on.
pub type Response<T> = oneshot::Sender<Result<T, CountryError>>;

/// Requests understood by a country table.
#[derive(Debug)]
pub enum StoreRequest {
    /// Inserts `country`. With `id` set, the table uses it instead of its own sequence.
    Create {
        country: Country,
        id: Option<u64>,
        respond_to: Response<Country>,
    },
    Get {
        iso2_code: String,
        respond_to: Response<Option<Country>>,
    },
    /// Replaces the stored country with the same id.
    Update {
        country: Country,
        respond_to: Response<Country>,
    },
}
