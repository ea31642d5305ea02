pub mod bioportal;
pub mod clock;
pub mod nmdc_client;

pub use bioportal::BioPortalClient;
pub use clock::SystemClock;
pub use nmdc_client::ReqwestNmdcApi;
