// Gateway module for the conversational pipeline
// Stage machine, processors and the turn orchestrator

mod artifacts;
mod council;
mod interrogator;
mod kpi;
mod ontology;
mod orchestrator;
mod processor;
mod reflector;
mod scanner;
mod stage;
mod turn;

pub use artifacts::{
    Deliberation, DomainOntology, EntitySchema, Kpi, OptimizationDirection, RelationshipSchema,
};
pub use council::CouncilDeliberation;
pub use interrogator::SocraticInterrogator;
pub use kpi::KpiFabricator;
pub use ontology::OntologyArchitect;
pub use orchestrator::PipelineOrchestrator;
pub use processor::{StageProcessor, StageSet};
pub use reflector::Reflector;
pub use scanner::{lexical_ambiguity, AmbiguityScanner};
pub use stage::{next_stage, Signals, Stage};
pub use turn::{validate_session_id, TurnRequest, TurnResponse};
