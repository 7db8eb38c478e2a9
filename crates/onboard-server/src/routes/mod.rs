pub mod clients;
pub mod deliverables;
pub mod documents;
pub mod engagements;
pub mod events;
pub mod functions;
pub mod risks;
pub mod signatures;
pub mod stats;
pub mod steps;
pub mod storage;
pub mod ui_state;
pub mod universal;
