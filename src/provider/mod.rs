//! Reconciliation-facing adapters
//!
//! Map the flat attribute record a controller holds onto the SFTP client,
//! for both the managed resource and the read-only data source.

pub mod data_source;
pub mod model;
pub mod resource;

pub use data_source::RemoteFileDataSource;
pub use model::RemoteFileModel;
pub use resource::RemoteFileResource;
