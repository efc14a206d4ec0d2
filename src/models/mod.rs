pub mod chatmodels;
pub mod providermodel;
pub mod requestmodel;
