//! External system contracts (spec §6): every boundary the analysis and
//! Ask-AI pipelines cross but do not own an implementation of. Grounded on
//! the teacher's `embeddings::provider::EmbeddingProvider` trait shape —
//! `Send + Sync`, `#[async_trait]`, narrow required methods plus
//! `Result`-returning default methods built on them.

pub mod capability_registry;
pub mod deployment;
pub mod embedding;
pub mod llm;
pub mod ner;
pub mod notifier;

pub use capability_registry::CapabilityRegistry;
pub use deployment::DeploymentPublisher;
pub use embedding::EmbeddingProvider;
pub use llm::DescriptionGenerator;
pub use ner::EntityExtractor;
pub use notifier::NotificationPublisher;
