pub mod config;
pub mod export;
pub mod find;
pub mod model;

pub use config::GetConfigInfoParams;
pub use export::ExportLeadsParams;
pub use find::FindLeadsParams;
pub use model::SwitchModelParams;
