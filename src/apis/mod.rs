pub mod ipea;
pub mod rscript;

pub use ipea::IpeaClient;
pub use rscript::RscriptRuntime;
