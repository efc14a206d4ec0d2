// db/store.rs
use super::{activitydb::ActivityExt, chatdb::ChatExt, providerdb::ProviderExt, requestdb::RequestExt};

/// Everything the engines need from durable storage.
pub trait Store: RequestExt + ProviderExt + ChatExt + ActivityExt + std::fmt::Debug + Send + Sync {}

impl<T> Store for T where
    T: RequestExt + ProviderExt + ChatExt + ActivityExt + std::fmt::Debug + Send + Sync
{
}
